//! In-memory query engine.
//!
//! `MemoryEngine` answers queries from fixtures keyed by query text. A fixture
//! is either a row set (column descriptions plus JSON rows), an affected-row
//! count, or an engine error. Binary cells are written as hex strings.
//!
//! # Example
//!
//! ```
//! use odbc_stmt_rs::engine::MemoryEngine;
//!
//! let engine = MemoryEngine::from_json(r#"{
//!     "SELECT id, name FROM users": {
//!         "kind": "rows",
//!         "columns": [{"name": "id", "type": "integer"}, {"name": "name", "type": "string"}],
//!         "rows": [[1, "alice"], [2, null]]
//!     },
//!     "DELETE FROM users": {"kind": "affected", "count": 2}
//! }"#).unwrap();
//! # let _ = engine;
//! ```

use super::{EngineStatement, FetchOutcome, QueryEngine, QueryKind, Value};
use crate::error::{engine_codes, EngineError};
use crate::types::RowType;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Column description in a row-set fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Column type
    #[serde(rename = "type")]
    pub row_type: RowType,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, row_type: RowType) -> Self {
        Self {
            name: name.into(),
            row_type,
        }
    }
}

/// Canned answer for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Fixture {
    /// Row-returning query
    Rows {
        columns: Vec<ColumnInfo>,
        #[serde(default)]
        rows: Vec<Vec<serde_json::Value>>,
    },
    /// Data-modification query
    Affected { count: u64 },
    /// Query failing in the engine
    Error {
        code: i32,
        #[serde(default)]
        message: Option<String>,
    },
}

/// One recorded execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Query text
    pub query: String,
    /// Parameters attached at execution time
    pub params: Vec<Value>,
}

/// Query engine answering from in-memory fixtures.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    fixtures: HashMap<String, Fixture>,
    executions: Arc<Mutex<Vec<Execution>>>,
    fail_prepare: bool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from a JSON object mapping query text to fixtures.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error for malformed fixture documents.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let fixtures: HashMap<String, Fixture> = serde_json::from_str(json)?;
        Ok(Self {
            fixtures: fixtures
                .into_iter()
                .map(|(sql, fixture)| (normalize(&sql), fixture))
                .collect(),
            ..Self::default()
        })
    }

    /// Register a fixture for `sql`.
    pub fn with_fixture(mut self, sql: &str, fixture: Fixture) -> Self {
        self.fixtures.insert(normalize(sql), fixture);
        self
    }

    /// Register a row set for `sql`.
    pub fn with_rows(
        self,
        sql: &str,
        columns: Vec<ColumnInfo>,
        rows: Vec<Vec<serde_json::Value>>,
    ) -> Self {
        self.with_fixture(sql, Fixture::Rows { columns, rows })
    }

    /// Register an affected-row count for `sql`.
    pub fn with_affected(self, sql: &str, count: u64) -> Self {
        self.with_fixture(sql, Fixture::Affected { count })
    }

    /// Register an engine failure for `sql`.
    pub fn with_error(self, sql: &str, code: i32, message: &str) -> Self {
        self.with_fixture(
            sql,
            Fixture::Error {
                code,
                message: Some(message.to_string()),
            },
        )
    }

    /// Make every prepare fail as if the query text could not be copied.
    pub fn failing_prepare(mut self) -> Self {
        self.fail_prepare = true;
        self
    }

    /// Executions recorded so far, oldest first.
    pub fn executions(&self) -> Vec<Execution> {
        self.executions.lock().clone()
    }
}

impl QueryEngine for MemoryEngine {
    fn prepare(&self, sql: &str) -> Option<Box<dyn EngineStatement>> {
        if self.fail_prepare {
            return None;
        }
        let key = normalize(sql);
        Some(Box::new(MemoryStatement {
            fixture: self.fixtures.get(&key).cloned(),
            query: sql.to_string(),
            params: Vec::new(),
            executions: Arc::clone(&self.executions),
            reply: None,
        }))
    }
}

#[derive(Debug)]
enum Reply {
    Rows {
        columns: Vec<ColumnInfo>,
        rows: Vec<Vec<Value>>,
        next: usize,
        current: Option<usize>,
    },
    Affected(u64),
}

/// Statement prepared by `MemoryEngine`.
#[derive(Debug)]
pub struct MemoryStatement {
    query: String,
    fixture: Option<Fixture>,
    params: Vec<Value>,
    executions: Arc<Mutex<Vec<Execution>>>,
    reply: Option<Reply>,
}

impl MemoryStatement {
    fn columns(&self) -> &[ColumnInfo] {
        match &self.reply {
            Some(Reply::Rows { columns, .. }) => columns,
            _ => &[],
        }
    }

    fn current_value(&self, column: usize) -> Option<&Value> {
        match &self.reply {
            Some(Reply::Rows { rows, current, .. }) => {
                current.and_then(|row| rows.get(row)).and_then(|r| r.get(column))
            }
            _ => None,
        }
    }
}

impl EngineStatement for MemoryStatement {
    fn query(&self) -> Option<String> {
        Some(self.query.clone())
    }

    fn bind_parameters(&mut self, params: Vec<Value>) {
        self.params = params;
    }

    fn execute(&mut self) -> Result<(), EngineError> {
        self.reply = None;
        self.executions.lock().push(Execution {
            query: self.query.clone(),
            params: self.params.clone(),
        });

        let fixture = self.fixture.as_ref().ok_or_else(|| {
            EngineError::new(
                engine_codes::NO_SUCH_SPACE,
                format!("No fixture for query '{}'", self.query),
            )
        })?;

        self.reply = Some(match fixture {
            Fixture::Rows { columns, rows } => {
                let rows = rows
                    .iter()
                    .map(|row| decode_row(columns, row))
                    .collect::<Result<Vec<_>, _>>()?;
                Reply::Rows {
                    columns: columns.clone(),
                    rows,
                    next: 0,
                    current: None,
                }
            }
            Fixture::Affected { count } => Reply::Affected(*count),
            Fixture::Error { code, message } => {
                return Err(EngineError {
                    code: *code,
                    message: message.clone(),
                })
            }
        });
        Ok(())
    }

    fn fetch(&mut self) -> FetchOutcome {
        match &mut self.reply {
            Some(Reply::Rows {
                rows,
                next,
                current,
                ..
            }) => {
                if *next < rows.len() {
                    *current = Some(*next);
                    *next += 1;
                    FetchOutcome::Row
                } else {
                    *current = None;
                    FetchOutcome::NoData
                }
            }
            Some(Reply::Affected(_)) => FetchOutcome::NoData,
            None => FetchOutcome::Error(EngineError::new(
                engine_codes::CLIENT_FAIL,
                "Statement has not been executed",
            )),
        }
    }

    fn query_kind(&self) -> QueryKind {
        match self.reply {
            Some(Reply::Affected(_)) => QueryKind::Dml,
            _ => QueryKind::Select,
        }
    }

    fn affected_rows(&self) -> u64 {
        match self.reply {
            Some(Reply::Affected(count)) => count,
            _ => 0,
        }
    }

    fn prefetched_rows(&self) -> u64 {
        match &self.reply {
            Some(Reply::Rows { rows, .. }) => rows.len() as u64,
            _ => 0,
        }
    }

    fn has_reply(&self) -> bool {
        self.reply.is_some()
    }

    fn has_field_names(&self) -> bool {
        matches!(self.reply, Some(Reply::Rows { .. }))
    }

    fn has_current_row(&self) -> bool {
        matches!(
            self.reply,
            Some(Reply::Rows {
                current: Some(_),
                ..
            })
        )
    }

    fn column_count(&self) -> usize {
        self.columns().len()
    }

    fn column_name(&self, column: usize) -> String {
        self.columns()
            .get(column)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn column_type(&self, column: usize) -> RowType {
        self.columns()
            .get(column)
            .map_or(RowType::Nil, |c| c.row_type)
    }

    fn column_len(&self, column: usize) -> usize {
        self.current_value(column).map_or(0, Value::len)
    }

    fn column_is_null(&self, column: usize) -> bool {
        self.current_value(column).map_or(true, Value::is_nil)
    }

    fn column_value(&self, column: usize) -> Value {
        self.current_value(column).cloned().unwrap_or(Value::Nil)
    }
}

fn normalize(sql: &str) -> String {
    sql.trim().to_string()
}

fn decode_row(columns: &[ColumnInfo], row: &[serde_json::Value]) -> Result<Vec<Value>, EngineError> {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| match row.get(i) {
            Some(cell) => decode_cell(cell, column),
            None => Ok(Value::Nil),
        })
        .collect()
}

fn decode_cell(cell: &serde_json::Value, column: &ColumnInfo) -> Result<Value, EngineError> {
    if cell.is_null() {
        return Ok(Value::Nil);
    }
    let decoded = match column.row_type {
        RowType::Integer => cell.as_i64().map(Value::Int),
        RowType::Unsigned => cell.as_u64().map(Value::UInt),
        RowType::Float => cell.as_f64().map(|f| Value::Float(f as f32)),
        RowType::Double => cell.as_f64().map(Value::Double),
        RowType::Boolean => cell.as_bool().map(Value::Bool),
        RowType::String => cell.as_str().map(Value::from),
        RowType::Binary => cell
            .as_str()
            .and_then(|s| hex::decode(s).ok())
            .map(Value::Bin),
        RowType::Nil => Some(Value::Nil),
        RowType::Array | RowType::Map | RowType::Ext => Some(Value::Str(cell.to_string().into_bytes())),
    };
    decoded.ok_or_else(|| {
        EngineError::new(
            engine_codes::TYPE_MISMATCH,
            format!(
                "Type mismatch: cannot read {} as {:?} for column '{}'",
                cell, column.row_type, column.name
            ),
        )
    })
}
