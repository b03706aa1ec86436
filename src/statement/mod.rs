//! Statement handle: lifecycle, execution and result retrieval.
//!
//! A [`Statement`] owns one prepared engine statement at a time, the input
//! and output bind stores, the chunked-read cursor and the last diagnostic.
//! Every operation validates its arguments and the lifecycle state before
//! the engine is touched, and reports its outcome as a `Result`; the failing
//! record is also kept for [`Statement::last_error`].
//!
//! # Architecture
//!
//! - `bind` - bind descriptors, the bind store, parameter binding
//! - `convert` - value rendering and bounded copies into caller buffers
//! - `cursor` - chunked `get_data`
//! - `metadata` - column count, column description, attributes, parameters
//! - `attributes` - column and statement attribute tables
//!
//! # Example
//!
//! ```
//! use odbc_stmt_rs::engine::{ColumnInfo, MemoryEngine};
//! use odbc_stmt_rs::statement::{Statement, Status};
//! use odbc_stmt_rs::types::{HostType, RowType};
//! use std::sync::Arc;
//!
//! let engine = MemoryEngine::new().with_rows(
//!     "SELECT name FROM users",
//!     vec![ColumnInfo::new("name", RowType::String)],
//!     vec![vec![serde_json::json!("alice")]],
//! );
//! let mut stmt = Statement::new(Arc::new(engine));
//! stmt.prepare("SELECT name FROM users")?;
//! stmt.execute()?;
//! assert_eq!(stmt.fetch()?, Status::Success);
//!
//! let mut buf = [0u8; 16];
//! let mut len = 0;
//! stmt.get_data(1, HostType::Char, &mut buf, 16, Some(&mut len))?;
//! assert_eq!(&buf[..len as usize], b"alice");
//! # Ok::<(), odbc_stmt_rs::StatementError>(())
//! ```

mod attributes;
mod bind;
mod convert;
mod cursor;
mod metadata;

pub use attributes::{
    column_attr, stmt_attr, AttributeValue, DescriptorKind, StatementAttrValue, NULLABLE_UNKNOWN,
};
pub use bind::{as_cells, BindDescriptor, BindStore};
pub use cursor::ChunkCursor;
pub use metadata::{ColumnDescription, Nullability};

use crate::engine::{EngineStatement, FetchOutcome, QueryEngine, QueryKind};
use crate::error::{ErrorKind, SqlReturn, StatementError};
use crate::types::Len;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Lifecycle state of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementState {
    /// No engine statement
    #[default]
    Unprepared,
    /// Prepared, not executed
    Prepared,
    /// Executed; results may be fetched
    Executed,
}

/// Successful outcome of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Succeeded with a diagnostic, e.g. truncation
    SuccessWithInfo,
    /// End of the result set or of a chunked column
    NoData,
}

impl From<Status> for SqlReturn {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => SqlReturn::Success,
            Status::SuccessWithInfo => SqlReturn::SuccessWithInfo,
            Status::NoData => SqlReturn::NoData,
        }
    }
}

/// Fetch orientation for `fetch_scroll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrientation {
    Next,
    First,
    Last,
    Prior,
    Absolute,
    Relative,
    Bookmark,
}

impl FetchOrientation {
    /// The `SQL_FETCH_*` code.
    pub fn code(self) -> i16 {
        match self {
            FetchOrientation::Next => 1,
            FetchOrientation::First => 2,
            FetchOrientation::Last => 3,
            FetchOrientation::Prior => 4,
            FetchOrientation::Absolute => 5,
            FetchOrientation::Relative => 6,
            FetchOrientation::Bookmark => 8,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(FetchOrientation::Next),
            2 => Some(FetchOrientation::First),
            3 => Some(FetchOrientation::Last),
            4 => Some(FetchOrientation::Prior),
            5 => Some(FetchOrientation::Absolute),
            6 => Some(FetchOrientation::Relative),
            8 => Some(FetchOrientation::Bookmark),
            _ => None,
        }
    }
}

/// `SQLFreeStmt` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOption {
    /// Discard the engine statement and any results
    Close,
    /// Release every output column binding
    Unbind,
    /// Release every input parameter binding
    ResetParams,
}

/// A statement handle.
///
/// Caller buffers bound to the statement are borrowed for `'b`.
pub struct Statement<'b> {
    engine: Arc<dyn QueryEngine>,
    state: StatementState,
    handle: Option<Box<dyn EngineStatement>>,
    inputs: BindStore<'b>,
    outputs: BindStore<'b>,
    cursor: ChunkCursor,
    last_error: Option<StatementError>,
}

impl<'b> Statement<'b> {
    /// Create an unprepared statement on `engine`.
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            engine,
            state: StatementState::Unprepared,
            handle: None,
            inputs: BindStore::new(),
            outputs: BindStore::new(),
            cursor: ChunkCursor::default(),
            last_error: None,
        }
    }

    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Diagnostic recorded by the last operation, if any.
    pub fn last_error(&self) -> Option<&StatementError> {
        self.last_error.as_ref()
    }

    /// Chunked-read progress.
    pub fn chunk_cursor(&self) -> ChunkCursor {
        self.cursor
    }

    /// Prepare `sql` (`SQLPrepare`).
    ///
    /// Any previous engine statement and its results are discarded first;
    /// bindings are kept.
    ///
    /// # Errors
    ///
    /// Returns memory-allocation when the engine cannot take the query text.
    /// The statement is then unprepared.
    pub fn prepare(&mut self, sql: &str) -> Result<(), StatementError> {
        self.clear_error();
        trace!("Prepare(sql='{}')", sql);
        self.reset_execution();

        match self.engine.prepare(sql) {
            Some(handle) => {
                self.handle = Some(handle);
                self.state = StatementState::Prepared;
                Ok(())
            }
            None => self.fail(
                ErrorKind::MemoryAllocation,
                "Unable to allocate memory",
                "SQLPrepare",
            ),
        }
    }

    /// Execute the prepared statement (`SQLExecute`).
    ///
    /// Bound input parameters are read from their buffers and attached right
    /// before the engine runs the statement.
    ///
    /// # Errors
    ///
    /// Returns invalid-cursor-state unless the statement is prepared and not
    /// yet executed. Engine failures are recorded with the engine's code and
    /// message; the state is left unchanged.
    pub fn execute(&mut self) -> Result<(), StatementError> {
        const FUNCTION: &str = "SQLExecute";
        self.clear_error();

        if self.state != StatementState::Prepared {
            return self.fail(ErrorKind::InvalidCursorState, "Invalid cursor state", FUNCTION);
        }
        let Some(handle) = self.handle.as_deref_mut() else {
            return self.fail(
                ErrorKind::SequenceError,
                "ODBC statement without query/prepare",
                FUNCTION,
            );
        };

        if self.inputs.is_allocated() {
            handle.bind_parameters(bind::parameter_values(&self.inputs));
        }

        if let Err(err) = handle.execute() {
            return Err(self.record(StatementError::from_engine(&err, FUNCTION)));
        }

        let (kind, label, rows) = match handle.query_kind() {
            QueryKind::Dml => ("DML/DDL", "affected", handle.affected_rows()),
            QueryKind::Select => ("SELECT", "prefetched", handle.prefetched_rows()),
        };
        self.state = StatementState::Executed;
        info!("Execute({}) = OK  {} {} rows so far", kind, label, rows);
        Ok(())
    }

    /// Advance to the next row (`SQLFetch`).
    ///
    /// Bound output columns receive the new row. A truncated text or binary
    /// column makes the fetch return `SuccessWithInfo`.
    ///
    /// # Errors
    ///
    /// Returns invalid-cursor-state unless the statement is executed,
    /// indicator-required when a null lands in a column bound without an
    /// indicator, and the engine's error when it fails to produce a row.
    pub fn fetch(&mut self) -> Result<Status, StatementError> {
        self.clear_error();
        self.fetch_next("SQLFetch")
    }

    /// Fetch with an explicit orientation (`SQLFetchScroll`).
    ///
    /// Only forward-only fetching is supported; `offset` is ignored.
    ///
    /// # Errors
    ///
    /// Returns unsupported-orientation for anything but `Next`, without
    /// consulting the engine; otherwise as [`Statement::fetch`].
    pub fn fetch_scroll(
        &mut self,
        orientation: FetchOrientation,
        _offset: Len,
    ) -> Result<Status, StatementError> {
        const FUNCTION: &str = "SQLFetchScroll";
        self.clear_error();
        if orientation != FetchOrientation::Next {
            return self.fail(
                ErrorKind::UnsupportedOrientation,
                "Unsupported fetch orientation",
                FUNCTION,
            );
        }
        self.fetch_next(FUNCTION)
    }

    fn fetch_next(&mut self, function: &'static str) -> Result<Status, StatementError> {
        self.cursor.reset();

        let columns = match self.handle.as_deref() {
            Some(handle) if self.state == StatementState::Executed => handle.column_count(),
            _ => return self.fail(ErrorKind::InvalidCursorState, "Invalid cursor state", function),
        };
        if self.outputs.is_allocated() && self.outputs.ensure_capacity(columns).is_err() {
            return self.fail(
                ErrorKind::MemoryAllocation,
                "Unable to allocate memory for parameters",
                function,
            );
        }

        let Some(handle) = self.handle.as_deref_mut() else {
            return self.fail(ErrorKind::InvalidCursorState, "Invalid cursor state", function);
        };
        match handle.fetch() {
            FetchOutcome::Row => {
                info!("SQLFetch(OK) {} columns", handle.column_count());
                match convert::deliver_row(handle, &self.outputs) {
                    Ok(false) => Ok(Status::Success),
                    Ok(true) => Ok(self.warn(
                        ErrorKind::Truncation,
                        "String data, right truncated",
                        function,
                    )),
                    Err(kind) => self.fail(kind, convert::conversion_message(kind), function),
                }
            }
            FetchOutcome::NoData => {
                info!("SQLFetch(NO_DATA) = END_OF_DATA");
                Ok(Status::NoData)
            }
            FetchOutcome::Error(err) => {
                info!("SQLFetch(FAIL)");
                Err(self.record(StatementError::from_engine(&err, function)))
            }
        }
    }

    /// Discard the engine statement and any results (`SQLFreeStmt` with
    /// `SQL_CLOSE`). Bindings are kept.
    pub fn close(&mut self) {
        self.clear_error();
        self.reset_execution();
    }

    /// Apply a `SQLFreeStmt` option. Bind stores keep their capacity.
    pub fn free(&mut self, option: FreeOption) {
        self.clear_error();
        match option {
            FreeOption::Close => self.reset_execution(),
            FreeOption::Unbind => self.outputs.reset(),
            FreeOption::ResetParams => self.inputs.reset(),
        }
        trace!(?option, "SQLFreeStmt");
    }

    fn reset_execution(&mut self) {
        self.handle = None;
        self.state = StatementState::Unprepared;
        self.cursor.reset();
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn record(&mut self, err: StatementError) -> StatementError {
        debug!(
            sqlstate = err.sqlstate(),
            function = err.function,
            native_code = ?err.native_code,
            "{}",
            err.message
        );
        self.last_error = Some(err.clone());
        err
    }

    pub(crate) fn fail<T>(
        &mut self,
        kind: ErrorKind,
        message: &str,
        function: &'static str,
    ) -> Result<T, StatementError> {
        Err(self.record(StatementError::new(kind, message, function)))
    }

    /// Record an informational diagnostic and report `SuccessWithInfo`.
    pub(crate) fn warn(&mut self, kind: ErrorKind, message: &str, function: &'static str) -> Status {
        self.record(StatementError::new(kind, message, function));
        Status::SuccessWithInfo
    }
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("state", &self.state)
            .field("query", &self.handle.as_ref().and_then(|h| h.query()))
            .field("inputs", &self.inputs.capacity())
            .field("outputs", &self.outputs.capacity())
            .field("cursor", &self.cursor)
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColumnInfo, MemoryEngine, Value};
    use crate::error::{engine_codes, EngineError};
    use crate::types::{HostType, RowType, NULL_DATA};
    use mockall::{mock, predicate::eq, Sequence};
    use serde_json::json;
    use std::cell::Cell;

    mock! {
        pub Engine {}

        impl QueryEngine for Engine {
            fn prepare(&self, sql: &str) -> Option<Box<dyn EngineStatement>>;
        }
    }

    mock! {
        pub EngineStmt {}

        impl EngineStatement for EngineStmt {
            fn query(&self) -> Option<String>;
            fn bind_parameters(&mut self, params: Vec<Value>);
            fn execute(&mut self) -> Result<(), EngineError>;
            fn fetch(&mut self) -> FetchOutcome;
            fn query_kind(&self) -> QueryKind;
            fn affected_rows(&self) -> u64;
            fn prefetched_rows(&self) -> u64;
            fn has_reply(&self) -> bool;
            fn has_field_names(&self) -> bool;
            fn has_current_row(&self) -> bool;
            fn column_count(&self) -> usize;
            fn column_name(&self, column: usize) -> String;
            fn column_type(&self, column: usize) -> RowType;
            fn column_len(&self, column: usize) -> usize;
            fn column_is_null(&self, column: usize) -> bool;
            fn column_value(&self, column: usize) -> Value;
        }
    }

    fn engine_with(stmt: MockEngineStmt) -> Arc<dyn QueryEngine> {
        let mut engine = MockEngine::new();
        engine
            .expect_prepare()
            .times(1)
            .return_once(move |_| Some(Box::new(stmt) as Box<dyn EngineStatement>));
        Arc::new(engine)
    }

    fn users() -> Arc<dyn QueryEngine> {
        Arc::new(
            MemoryEngine::new()
                .with_rows(
                    "SELECT id, name FROM users",
                    vec![
                        ColumnInfo::new("id", RowType::Integer),
                        ColumnInfo::new("name", RowType::String),
                    ],
                    vec![
                        vec![json!(1), json!("alice")],
                        vec![json!(2), json!(null)],
                    ],
                )
                .with_affected("DELETE FROM users", 2),
        )
    }

    #[test]
    fn test_new_statement_is_unprepared() {
        let stmt = Statement::new(users());
        assert_eq!(stmt.state(), StatementState::Unprepared);
        assert!(stmt.last_error().is_none());
    }

    #[test]
    fn test_execute_before_prepare_never_reaches_engine() {
        let mut engine = MockEngine::new();
        engine.expect_prepare().never();
        let mut stmt = Statement::new(Arc::new(engine));

        let err = stmt.execute().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCursorState);
        assert_eq!(err.function, "SQLExecute");
        assert_eq!(stmt.last_error(), Some(&err));
    }

    #[test]
    fn test_prepare_failure_is_memory_error() {
        let mut engine = MockEngine::new();
        engine.expect_prepare().returning(|_| None);
        let mut stmt = Statement::new(Arc::new(engine));

        let err = stmt.prepare("SELECT 1").unwrap_err();
        assert_eq!(err.sqlstate(), "HY001");
        assert_eq!(stmt.state(), StatementState::Unprepared);
    }

    #[test]
    fn test_engine_failure_captured_verbatim() {
        let mut engine_stmt = MockEngineStmt::new();
        engine_stmt.expect_execute().times(1).returning(|| {
            Err(EngineError::new(
                engine_codes::SQL_SYNTAX,
                "Syntax error near 'FORM'",
            ))
        });
        let mut stmt = Statement::new(engine_with(engine_stmt));
        stmt.prepare("SELECT * FORM t").unwrap();

        let err = stmt.execute().unwrap_err();
        assert_eq!(err.native_code, Some(engine_codes::SQL_SYNTAX));
        assert_eq!(err.message, "Syntax error near 'FORM'");
        assert_eq!(err.message_len, Some("Syntax error near 'FORM'".len()));
        assert_eq!(err.sqlstate(), "42000");
        assert_eq!(stmt.state(), StatementState::Prepared);
    }

    #[test]
    fn test_parameters_attached_before_execution() {
        let mut seq = Sequence::new();
        let mut engine_stmt = MockEngineStmt::new();
        engine_stmt
            .expect_bind_parameters()
            .with(eq(vec![Value::Int(5), Value::Nil]))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        engine_stmt
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        engine_stmt.expect_query_kind().return_const(QueryKind::Dml);
        engine_stmt.expect_affected_rows().return_const(1u64);

        let mut value = 5i64.to_ne_bytes();
        let null = Cell::new(NULL_DATA);
        let mut stmt = Statement::new(engine_with(engine_stmt));
        stmt.prepare("UPDATE t SET a = ? WHERE b = ?").unwrap();
        stmt.bind_input(1, HostType::SBigInt, Some(as_cells(&mut value)), 8, None)
            .unwrap();
        stmt.bind_input(2, HostType::Char, None, 0, Some(&null)).unwrap();
        stmt.execute().unwrap();
        assert_eq!(stmt.state(), StatementState::Executed);
    }

    #[test]
    fn test_fetch_scroll_rejects_orientation_without_engine() {
        let mut engine_stmt = MockEngineStmt::new();
        engine_stmt.expect_execute().returning(|| Ok(()));
        engine_stmt.expect_query_kind().return_const(QueryKind::Select);
        engine_stmt.expect_prefetched_rows().return_const(0u64);
        engine_stmt.expect_fetch().never();

        let mut stmt = Statement::new(engine_with(engine_stmt));
        stmt.prepare("SELECT 1").unwrap();
        stmt.execute().unwrap();

        let err = stmt.fetch_scroll(FetchOrientation::Prior, 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedOrientation);
        assert!(err.kind.is_unsupported());
    }

    #[test]
    fn test_fetch_engine_error_is_recorded() {
        let mut engine_stmt = MockEngineStmt::new();
        engine_stmt.expect_execute().returning(|| Ok(()));
        engine_stmt.expect_query_kind().return_const(QueryKind::Select);
        engine_stmt.expect_prefetched_rows().return_const(0u64);
        engine_stmt.expect_column_count().return_const(1usize);
        engine_stmt.expect_fetch().times(1).returning(|| {
            FetchOutcome::Error(EngineError::new(engine_codes::CLIENT_SYSTEM, "Broken pipe"))
        });

        let mut stmt = Statement::new(engine_with(engine_stmt));
        stmt.prepare("SELECT 1").unwrap();
        stmt.execute().unwrap();
        let err = stmt.fetch().unwrap_err();
        assert_eq!(err.sqlstate(), "08S01");
        assert_eq!(err.function, "SQLFetch");
    }

    #[test]
    fn test_lifecycle_with_memory_engine() {
        let mut stmt = Statement::new(users());
        stmt.prepare("SELECT id, name FROM users").unwrap();
        assert_eq!(stmt.state(), StatementState::Prepared);

        stmt.execute().unwrap();
        assert_eq!(stmt.state(), StatementState::Executed);
        assert_eq!(stmt.affected_rows().unwrap(), -1);

        assert_eq!(stmt.fetch().unwrap(), Status::Success);
        assert_eq!(stmt.fetch().unwrap(), Status::Success);
        assert_eq!(stmt.fetch().unwrap(), Status::NoData);
    }

    #[test]
    fn test_execute_twice_requires_reprepare() {
        let mut stmt = Statement::new(users());
        stmt.prepare("DELETE FROM users").unwrap();
        stmt.execute().unwrap();
        assert_eq!(stmt.affected_rows().unwrap(), 2);

        let err = stmt.execute().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCursorState);
    }

    #[test]
    fn test_close_discards_results_keeps_bindings() {
        let mut buf = [0u8; 8];
        let mut stmt = Statement::new(users());
        stmt.bind_output(1, HostType::SBigInt, Some(as_cells(&mut buf)), 8, None)
            .unwrap();
        stmt.prepare("SELECT id, name FROM users").unwrap();
        stmt.execute().unwrap();
        stmt.close();

        assert_eq!(stmt.state(), StatementState::Unprepared);
        assert_eq!(stmt.fetch().unwrap_err().kind, ErrorKind::InvalidCursorState);
        assert!(stmt.output_descriptor(1).unwrap().is_bound());
    }

    #[test]
    fn test_free_options() {
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        let mut stmt = Statement::new(users());
        stmt.bind_input(1, HostType::SBigInt, Some(as_cells(&mut a)), 8, None)
            .unwrap();
        stmt.bind_output(3, HostType::SBigInt, Some(as_cells(&mut b)), 8, None)
            .unwrap();

        stmt.free(FreeOption::Unbind);
        assert_eq!(stmt.output_capacity(), 3);
        assert!(!stmt.output_descriptor(3).unwrap().is_bound());
        assert!(stmt.input_descriptor(1).unwrap().is_bound());

        stmt.free(FreeOption::ResetParams);
        assert!(!stmt.input_descriptor(1).unwrap().is_bound());
        assert_eq!(stmt.input_capacity(), 1);
    }

    #[test]
    fn test_diagnostics_cleared_on_next_call() {
        let mut stmt = Statement::new(users());
        assert!(stmt.fetch().is_err());
        assert!(stmt.last_error().is_some());
        stmt.prepare("SELECT id, name FROM users").unwrap();
        assert!(stmt.last_error().is_none());
    }

    #[test]
    fn test_status_return_codes() {
        assert_eq!(SqlReturn::from(Status::Success), SqlReturn::Success);
        assert_eq!(SqlReturn::from(Status::SuccessWithInfo).code(), 1);
        assert_eq!(SqlReturn::from_result(&Ok::<_, StatementError>(Status::NoData)).code(), 100);
    }

    #[test]
    fn test_fetch_orientation_codes() {
        assert_eq!(FetchOrientation::from_code(1), Some(FetchOrientation::Next));
        assert_eq!(FetchOrientation::Bookmark.code(), 8);
        assert_eq!(FetchOrientation::from_code(7), None);
    }
}
