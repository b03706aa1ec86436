//! Error types for odbc-stmt-rs.
//!
//! This module defines the statement error taxonomy, the error record kept on
//! every statement, the fixed engine-code mapping, and the ODBC return codes
//! that every operation result can be reduced to.

use std::fmt;
use thiserror::Error;

/// Kind of a statement diagnostic.
///
/// Each kind maps to a five-character SQLSTATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The handle does not identify a live statement
    InvalidHandle,
    /// Operation not valid in the current cursor state
    InvalidCursorState,
    /// Column or parameter index out of range
    InvalidDescriptorIndex,
    /// Host buffer type has no mapping
    InvalidBufferType,
    /// Negative or otherwise unusable buffer length
    InvalidBufferLength,
    /// Required buffer or slot was not supplied
    InvalidNullPointer,
    /// Allocation failed
    MemoryAllocation,
    /// Null value fetched without an indicator slot
    IndicatorRequired,
    /// Value could not be converted to the requested host type
    InvalidCast,
    /// More data is available than the buffer held (informational)
    Truncation,
    /// Fetch orientation other than next
    UnsupportedOrientation,
    /// Optional feature not implemented
    OptionalFeature,
    /// Function or attribute not supported by the driver
    NotImplemented,
    /// Operation invoked out of order
    SequenceError,
    /// Prepared statement does not describe a row set
    NotCursorSpecification,
    /// Attempt to replace an implementation descriptor
    InvalidDescriptorUse,
    /// Failure reported by the query engine
    Engine { sqlstate: &'static str },
}

impl ErrorKind {
    /// SQLSTATE for this kind.
    pub fn sqlstate(&self) -> &'static str {
        match self {
            ErrorKind::InvalidHandle => "HY000",
            ErrorKind::InvalidCursorState => "24000",
            ErrorKind::InvalidDescriptorIndex => "07009",
            ErrorKind::InvalidBufferType => "HY003",
            ErrorKind::InvalidBufferLength => "HY090",
            ErrorKind::InvalidNullPointer => "HY009",
            ErrorKind::MemoryAllocation => "HY001",
            ErrorKind::IndicatorRequired => "22002",
            ErrorKind::InvalidCast => "22018",
            ErrorKind::Truncation => "01004",
            ErrorKind::UnsupportedOrientation => "HY106",
            ErrorKind::OptionalFeature => "HYC00",
            ErrorKind::NotImplemented => "IM001",
            ErrorKind::SequenceError => "HY010",
            ErrorKind::NotCursorSpecification => "07005",
            ErrorKind::InvalidDescriptorUse => "HY017",
            ErrorKind::Engine { sqlstate } => *sqlstate,
        }
    }

    /// Whether this kind reports an unsupported operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedOrientation
                | ErrorKind::OptionalFeature
                | ErrorKind::NotImplemented
        )
    }

    /// Whether this kind is informational rather than a failure.
    pub fn is_warning(&self) -> bool {
        self.sqlstate().starts_with("01")
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sqlstate())
    }
}

/// Error record attached to a statement.
///
/// Holds the kind, a human-readable message, the ODBC function that produced
/// it and, for engine failures, the native code and reported message length.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{kind}] {message} ({function})")]
pub struct StatementError {
    /// Diagnostic kind
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Originating operation, e.g. `SQLGetData`
    pub function: &'static str,
    /// Engine-specific error code
    pub native_code: Option<i32>,
    /// Message length as reported by the engine
    pub message_len: Option<usize>,
}

impl StatementError {
    /// Create a driver-side error record.
    pub fn new(kind: ErrorKind, message: impl Into<String>, function: &'static str) -> Self {
        Self {
            kind,
            message: message.into(),
            function,
            native_code: None,
            message_len: None,
        }
    }

    /// Create a record from an engine failure, translating its code.
    pub fn from_engine(err: &EngineError, function: &'static str) -> Self {
        let message = err
            .message
            .clone()
            .unwrap_or_else(|| "Unknown error state".to_string());
        Self {
            kind: engine_error_kind(err.code),
            message,
            function,
            native_code: Some(err.code),
            message_len: Some(err.message_len()),
        }
    }

    /// SQLSTATE of this record.
    pub fn sqlstate(&self) -> &'static str {
        self.kind.sqlstate()
    }
}

/// Failure reported by the underlying query engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("engine error {code}: {}", .message.as_deref().unwrap_or("<no message>"))]
pub struct EngineError {
    /// Engine-specific error code
    pub code: i32,
    /// Engine-supplied message, if any
    pub message: Option<String>,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Length of the engine message in bytes.
    pub fn message_len(&self) -> usize {
        self.message.as_ref().map_or(0, String::len)
    }
}

/// Error codes reported by the query engine.
///
/// Client-side codes are negative; server-side codes are positive.
pub mod engine_codes {
    pub const UNKNOWN: i32 = 0;
    pub const ILLEGAL_PARAMS: i32 = 1;
    pub const MEMORY_ISSUE: i32 = 2;
    pub const TUPLE_FOUND: i32 = 3;
    pub const UNSUPPORTED: i32 = 5;
    pub const READONLY: i32 = 7;
    pub const NO_SUCH_SPACE: i32 = 36;
    pub const NO_SUCH_FIELD: i32 = 37;
    pub const ACCESS_DENIED: i32 = 42;
    pub const SQL_SYNTAX: i32 = 171;
    pub const TYPE_MISMATCH: i32 = 176;

    pub const CLIENT_FAIL: i32 = -1;
    pub const CLIENT_MEMORY: i32 = -2;
    pub const CLIENT_SYSTEM: i32 = -3;
    pub const CLIENT_TIMEOUT: i32 = -7;
    pub const CLIENT_BAD_VALUE: i32 = -8;
}

/// Engine code to error kind.
const ENGINE_ERROR_MAP: &[(i32, ErrorKind)] = &[
    (engine_codes::ILLEGAL_PARAMS, ErrorKind::Engine { sqlstate: "07002" }),
    (engine_codes::MEMORY_ISSUE, ErrorKind::MemoryAllocation),
    (engine_codes::TUPLE_FOUND, ErrorKind::Engine { sqlstate: "23000" }),
    (engine_codes::UNSUPPORTED, ErrorKind::OptionalFeature),
    (engine_codes::READONLY, ErrorKind::Engine { sqlstate: "25000" }),
    (engine_codes::NO_SUCH_SPACE, ErrorKind::Engine { sqlstate: "42S02" }),
    (engine_codes::NO_SUCH_FIELD, ErrorKind::Engine { sqlstate: "42S22" }),
    (engine_codes::ACCESS_DENIED, ErrorKind::Engine { sqlstate: "42000" }),
    (engine_codes::SQL_SYNTAX, ErrorKind::Engine { sqlstate: "42000" }),
    (engine_codes::TYPE_MISMATCH, ErrorKind::InvalidCast),
    (engine_codes::CLIENT_MEMORY, ErrorKind::MemoryAllocation),
    (engine_codes::CLIENT_SYSTEM, ErrorKind::Engine { sqlstate: "08S01" }),
    (engine_codes::CLIENT_TIMEOUT, ErrorKind::Engine { sqlstate: "HYT00" }),
    (engine_codes::CLIENT_BAD_VALUE, ErrorKind::Engine { sqlstate: "HY024" }),
];

/// Translate an engine error code into the driver taxonomy.
///
/// Total: codes without an entry map to the generic `HY000` engine kind.
pub fn engine_error_kind(code: i32) -> ErrorKind {
    ENGINE_ERROR_MAP
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Engine { sqlstate: "HY000" })
}

/// ODBC return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum SqlReturn {
    Success = 0,
    SuccessWithInfo = 1,
    NoData = 100,
    Error = -1,
    InvalidHandle = -2,
}

impl SqlReturn {
    /// Numeric value as seen by ODBC callers.
    pub fn code(self) -> i16 {
        self as i16
    }

    /// Reduce an operation result to its return code.
    pub fn from_result<T: Into<SqlReturn> + Copy>(result: &Result<T, StatementError>) -> Self {
        match result {
            Ok(value) => (*value).into(),
            Err(err) => err.into(),
        }
    }
}

impl From<()> for SqlReturn {
    fn from(_: ()) -> Self {
        SqlReturn::Success
    }
}

impl From<&StatementError> for SqlReturn {
    fn from(err: &StatementError) -> Self {
        match err.kind {
            ErrorKind::InvalidHandle => SqlReturn::InvalidHandle,
            _ => SqlReturn::Error,
        }
    }
}

impl fmt::Display for SqlReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlReturn::Success => write!(f, "SQL_SUCCESS"),
            SqlReturn::SuccessWithInfo => write!(f, "SQL_SUCCESS_WITH_INFO"),
            SqlReturn::NoData => write!(f, "SQL_NO_DATA"),
            SqlReturn::Error => write!(f, "SQL_ERROR"),
            SqlReturn::InvalidHandle => write!(f, "SQL_INVALID_HANDLE"),
        }
    }
}

/// Errors from parsing driver configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed connection string
    #[error("Failed to parse connection string: {0}")]
    ParseError(String),

    /// Invalid value for a recognised key
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },
}
