//! Row mapping engine and query execution pipeline for rowmap
//!
//! Rows produced by a forward-only cursor are mapped onto scalars, positional
//! tuples or named structs. Queries bind parameters once and run through an
//! [`Executor`] that owns the connection lifecycle of each execution.

pub mod command;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod materialize;
pub mod memory;
pub mod model;
pub mod options;
pub mod query;
pub mod row;
pub mod schema;
pub mod shape;
pub mod table;
pub mod value;

pub use command::*;
pub use connection::*;
pub use error::*;
pub use executor::*;
pub use materialize::FromRow;
pub use model::*;
pub use options::*;
pub use query::*;
pub use row::*;
pub use schema::*;
pub use shape::*;
pub use table::*;
pub use value::*;
