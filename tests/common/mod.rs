//! Common test utilities for odbc-stmt-rs integration tests.
//!
//! Tests run against `MemoryEngine` loaded from `tests/fixtures/catalog.json`.
//! The catalog holds a four-column `users` result (integer, string, double,
//! binary) whose second row carries nulls, a parameterised select, an
//! unsigned column, an empty result, two DML statements and a query the
//! engine rejects with a syntax error.

#![allow(dead_code)]

use odbc_stmt_rs::error::StatementError;
use odbc_stmt_rs::{MemoryEngine, Statement};
use std::sync::Arc;

pub const CATALOG: &str = include_str!("../fixtures/catalog.json");

pub const USERS: &str = "SELECT id, name, score, avatar FROM users";
pub const USERS_BY_NAME: &str = "SELECT id FROM users WHERE name = ? AND id > ?";
pub const COUNTERS: &str = "SELECT total FROM counters";
pub const EMPTY: &str = "SELECT 1 FROM empty";
pub const UPDATE_SCORE: &str = "UPDATE users SET score = ? WHERE id = ?";
pub const DELETE_USERS: &str = "DELETE FROM users";
pub const BROKEN: &str = "SELEC broken";

/// Engine answering from the fixture catalog.
pub fn catalog() -> MemoryEngine {
    MemoryEngine::from_json(CATALOG).expect("fixture catalog should parse")
}

/// Statement over a fresh catalog engine, prepared and executed.
pub fn executed(sql: &str) -> Statement<'static> {
    let mut stmt = Statement::new(Arc::new(catalog()));
    stmt.prepare(sql).expect("prepare should succeed");
    stmt.execute().expect("execute should succeed");
    stmt
}

/// Executed statement positioned on row `row` (1-based).
pub fn positioned(sql: &str, row: usize) -> Statement<'static> {
    let mut stmt = executed(sql);
    for _ in 0..row {
        stmt.fetch().expect("fetch should succeed");
    }
    stmt
}

/// Assert that `result` failed with `sqlstate`.
#[track_caller]
pub fn assert_sqlstate<T: std::fmt::Debug>(result: Result<T, StatementError>, sqlstate: &str) {
    match result {
        Ok(value) => panic!("expected SQLSTATE {}, got Ok({:?})", sqlstate, value),
        Err(err) => assert_eq!(err.sqlstate(), sqlstate, "unexpected error: {}", err),
    }
}
