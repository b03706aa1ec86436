//! Query engine boundary.
//!
//! This module defines the traits the statement core consumes from the
//! underlying row-oriented query engine, and the value types exchanged with it.
//! The engine owns parsing, planning and the wire protocol; the core only
//! prepares, binds, executes, fetches and reads the current row.
//!
//! # Architecture
//!
//! - `QueryEngine` - per-connection factory for prepared engine statements
//! - `EngineStatement` - one prepared query and its current result position
//! - `scan` - placeholder counting over query text
//! - `memory` - in-memory engine driven by JSON fixtures

pub mod memory;
pub mod scan;

use crate::error::EngineError;
use crate::types::RowType;

pub use memory::{ColumnInfo, Execution, Fixture, MemoryEngine, MemoryStatement};
pub use scan::count_placeholders;

/// Kind of an executed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Data modification or definition; produces an affected-row count
    Dml,
    /// Row-returning query
    Select,
}

/// Outcome of advancing the engine cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A row is available
    Row,
    /// End of the result set
    NoData,
    /// The engine failed to produce the next row
    Error(EngineError),
}

/// A single parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Nil,
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    Int(i64),
    /// Unsigned integer value
    UInt(u64),
    /// Single-precision float
    Float(f32),
    /// Double-precision float
    Double(f64),
    /// Text bytes (not necessarily UTF-8)
    Str(Vec<u8>),
    /// Binary data
    Bin(Vec<u8>),
}

impl Value {
    /// Row type of this value.
    pub fn row_type(&self) -> RowType {
        match self {
            Value::Nil => RowType::Nil,
            Value::Bool(_) => RowType::Boolean,
            Value::Int(_) => RowType::Integer,
            Value::UInt(_) => RowType::Unsigned,
            Value::Float(_) => RowType::Float,
            Value::Double(_) => RowType::Double,
            Value::Str(_) => RowType::String,
            Value::Bin(_) => RowType::Binary,
        }
    }

    /// Stored length in bytes: the payload for text and binary, the
    /// storage width otherwise.
    pub fn len(&self) -> usize {
        match self {
            Value::Nil => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::UInt(_) | Value::Double(_) => 8,
            Value::Float(_) => 4,
            Value::Str(b) | Value::Bin(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bin(value)
    }
}

/// Per-connection query engine.
///
/// Preparing only copies the query text, so the only failure is allocation.
pub trait QueryEngine: Send + Sync {
    /// Prepare a statement for `sql`.
    ///
    /// # Returns
    ///
    /// The engine statement, or `None` when the query text could not be copied.
    fn prepare(&self, sql: &str) -> Option<Box<dyn EngineStatement>>;
}

/// One prepared engine statement.
///
/// Column indices are 0-based. Column accessors describe the current result
/// and, for values, the current row. The statement is exclusively owned by
/// the driver statement that prepared it.
pub trait EngineStatement: Send {
    /// Query text recorded at prepare time.
    fn query(&self) -> Option<String>;

    /// Attach parameter values for the next execution.
    fn bind_parameters(&mut self, params: Vec<Value>);

    /// Execute the statement.
    ///
    /// # Errors
    ///
    /// Returns the engine's native code and message on failure.
    fn execute(&mut self) -> Result<(), EngineError>;

    /// Advance to the next row.
    fn fetch(&mut self) -> FetchOutcome;

    /// Kind of the executed query.
    fn query_kind(&self) -> QueryKind;

    /// Rows affected by a data-modification statement.
    fn affected_rows(&self) -> u64;

    /// Rows received so far for a row-returning statement.
    fn prefetched_rows(&self) -> u64;

    /// Whether the engine has answered an execution.
    fn has_reply(&self) -> bool;

    /// Whether the reply carries a result description.
    fn has_field_names(&self) -> bool;

    /// Whether a row is positioned after a successful fetch.
    fn has_current_row(&self) -> bool;

    fn column_count(&self) -> usize;

    fn column_name(&self, column: usize) -> String;

    fn column_type(&self, column: usize) -> RowType;

    /// Length of the column value in the current row.
    fn column_len(&self, column: usize) -> usize;

    fn column_is_null(&self, column: usize) -> bool;

    /// Value of the column in the current row.
    fn column_value(&self, column: usize) -> Value;
}
