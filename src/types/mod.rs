//! Type mapping between host buffers and engine row types.

mod mapping;

pub use mapping::{BindType, HostType, RowType, SqlType, TypeMapper};

/// Buffer length or indicator value (`SQLLEN`).
pub type Len = isize;

/// Indicator value marking a null.
pub const NULL_DATA: Len = -1;

/// Length sentinel for a null-terminated string.
pub const NTS: Len = -3;
