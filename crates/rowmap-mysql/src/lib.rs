//! MySQL driver for rowmap built on sqlx
//!
//! [`MySqlProvider`] hands out [`MySqlConnection`]s that execute rowmap
//! commands and return eagerly fetched [`MySqlCursor`]s.

pub mod connection;
pub mod cursor;
pub mod decode;
mod helper;

pub use connection::*;
pub use cursor::*;
