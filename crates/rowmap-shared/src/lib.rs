//! Configuration and observability shared by rowmap drivers

pub mod config;
pub mod observability;

pub use self::config::*;
pub use self::observability::*;
