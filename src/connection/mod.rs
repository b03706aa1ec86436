//! Connection-level statement management.
//!
//! A `Connection` owns the engine shared by its statements, the driver
//! parameters it was opened with, and a registry of allocated statements
//! addressed by `StatementId`.
//!
//! # Example
//!
//! ```
//! # use odbc_stmt_rs::connection::Connection;
//! # use odbc_stmt_rs::engine::MemoryEngine;
//! # use std::sync::Arc;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = MemoryEngine::new().with_affected("DELETE FROM t", 3);
//! let mut connection = Connection::from_connection_string(Arc::new(engine), "DSN=test")?;
//!
//! let id = connection.allocate_statement();
//! let stmt = connection.statement(id)?;
//! stmt.prepare("DELETE FROM t")?;
//! stmt.execute()?;
//! assert_eq!(stmt.affected_rows()?, 3);
//!
//! connection.free_statement(id)?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod params;

pub use params::{DriverParams, DriverParamsBuilder, LogLevel};

use crate::engine::QueryEngine;
use crate::error::{ConfigError, ErrorKind, StatementError};
use crate::statement::Statement;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Handle of a statement allocated on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(u32);

impl StatementId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stmt#{}", self.0)
    }
}

/// A connection and the statements allocated on it.
pub struct Connection<'b> {
    engine: Arc<dyn QueryEngine>,
    params: DriverParams,
    statements: HashMap<StatementId, Statement<'b>>,
    next_id: u32,
}

impl<'b> Connection<'b> {
    /// Create a connection over `engine`.
    pub fn new(engine: Arc<dyn QueryEngine>, params: DriverParams) -> Self {
        info!(dsn = ?params.dsn, driver = ?params.driver, "Connection opened");
        Self {
            engine,
            params,
            statements: HashMap::new(),
            next_id: 1,
        }
    }

    /// Create a connection from an ODBC connection string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the string cannot be parsed or fails
    /// validation.
    pub fn from_connection_string(
        engine: Arc<dyn QueryEngine>,
        connection_string: &str,
    ) -> Result<Self, ConfigError> {
        let params = connection_string.parse()?;
        Ok(Self::new(engine, params))
    }

    pub fn params(&self) -> &DriverParams {
        &self.params
    }

    /// Allocate a new unprepared statement (`SQLAllocHandle`).
    pub fn allocate_statement(&mut self) -> StatementId {
        let id = StatementId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.statements
            .insert(id, Statement::new(Arc::clone(&self.engine)));
        debug!(%id, "Statement allocated");
        id
    }

    /// Look up an allocated statement.
    ///
    /// # Errors
    ///
    /// Returns an invalid-handle error when `id` is not allocated.
    pub fn statement(&mut self, id: StatementId) -> Result<&mut Statement<'b>, StatementError> {
        self.statements
            .get_mut(&id)
            .ok_or_else(|| invalid_handle(id, "SQLAllocHandle"))
    }

    /// Release a statement and its bindings (`SQLFreeHandle`).
    ///
    /// # Errors
    ///
    /// Returns an invalid-handle error when `id` is not allocated.
    pub fn free_statement(&mut self, id: StatementId) -> Result<(), StatementError> {
        match self.statements.remove(&id) {
            Some(_) => {
                debug!(%id, "Statement freed");
                Ok(())
            }
            None => Err(invalid_handle(id, "SQLFreeHandle")),
        }
    }

    /// Number of currently allocated statements.
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

impl fmt::Debug for Connection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("params", &self.params)
            .field("statements", &self.statements.len())
            .finish()
    }
}

fn invalid_handle(id: StatementId, function: &'static str) -> StatementError {
    StatementError::new(
        ErrorKind::InvalidHandle,
        format!("Invalid statement handle {}", id),
        function,
    )
}
