//! `rowmap`: convenience facade that re-exports `rowmap-core` and `rowmap-derive`.

#![deny(missing_docs)]

/// Re-export **everything** from rowmap-core at the crate root, so users can `use rowmap::*;`.
#[doc(inline)]
pub use rowmap_core::*;

/// Also expose rowmap-core as a nested module; derived code refers to `rowmap::core::...`.
pub use rowmap_core as core;

/// Re-export the derive macros so downstream crates can `#[derive(FromRow, SqlEnum)]`
/// after depending only on `rowmap` (with feature `derive` enabled).
#[cfg(feature = "derive")]
#[doc(inline)]
pub use rowmap_derive::{FromRow, SqlEnum};
