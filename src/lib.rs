//! # odbc-stmt-rs
//!
//! Prepared-statement execution and result materialization for an ODBC
//! driver over a row-oriented query engine.
//!
//! The crate implements the statement side of the driver: preparing a query,
//! binding host buffers to parameters and result columns, executing,
//! fetching rows into bound buffers, chunked retrieval with `get_data`,
//! and the metadata and attribute calls. The engine itself sits behind the
//! [`engine::QueryEngine`] trait.
//!
//! ## Example
//!
//! ```
//! # use odbc_stmt_rs::*;
//! # use odbc_stmt_rs::engine::ColumnInfo;
//! # use odbc_stmt_rs::types::{HostType, RowType};
//! # use std::cell::Cell;
//! # use std::sync::Arc;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = MemoryEngine::new().with_rows(
//!     "SELECT id FROM t WHERE id > ?",
//!     vec![ColumnInfo::new("id", RowType::Integer)],
//!     vec![vec![serde_json::json!(7)], vec![serde_json::json!(9)]],
//! );
//!
//! let mut param = 5i64.to_ne_bytes();
//! let mut out = [0u8; 8];
//! let out = statement::as_cells(&mut out);
//! let out_len = Cell::new(0);
//!
//! let mut stmt = Statement::new(Arc::new(engine));
//! stmt.prepare("SELECT id FROM t WHERE id > ?")?;
//! stmt.bind_input(1, HostType::SBigInt, Some(statement::as_cells(&mut param)), 8, None)?;
//! stmt.bind_output(1, HostType::SBigInt, Some(out), 8, Some(&out_len))?;
//! stmt.execute()?;
//!
//! let mut ids = Vec::new();
//! while stmt.fetch()? != Status::NoData {
//!     let bytes: Vec<u8> = out.iter().map(Cell::get).collect();
//!     ids.push(i64::from_ne_bytes(bytes.try_into().unwrap()));
//! }
//! assert_eq!(ids, [7, 9]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// Module declarations
pub mod connection;
pub mod engine;
pub mod error;
pub mod logging;
pub mod statement;
pub mod types;

// Re-export public API
pub use connection::{Connection, DriverParams, StatementId};
pub use engine::{MemoryEngine, QueryEngine};
pub use error::{ConfigError, EngineError, ErrorKind, SqlReturn, StatementError};
pub use statement::{FetchOrientation, FreeOption, Statement, StatementState, Status};
pub use types::{BindType, HostType, RowType, TypeMapper};
