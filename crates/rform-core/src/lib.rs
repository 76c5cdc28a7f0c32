#![forbid(unsafe_code)]

//! Core: the dynamic value model, field paths, and unit identity shared by
//! the runtime and form crates.

pub mod path;
pub mod value;

pub use path::{FieldPath, PathSegment, UnitId};
pub use value::{FileRef, Value, ValueKind, ValueMap};

/// Re-exported so downstream crates can name dates without a direct dependency.
pub use time::Date;
