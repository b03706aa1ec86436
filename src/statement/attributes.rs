//! Column and statement attribute tables.
//!
//! Column attributes (`SQLColAttribute`) are resolved from a fixed table
//! mapping each `SQL_DESC_*` identifier to a text default, a neutral integer,
//! or a value computed from the executed statement. Statement attributes
//! (`SQLSetStmtAttr` / `SQLGetStmtAttr`) follow an allow-list: most are
//! accepted as no-ops, the implementation descriptors are read-only, and the
//! rest are rejected.

use super::Statement;
use crate::engine::EngineStatement;
use crate::error::{ErrorKind, StatementError};
use crate::types::{RowType, TypeMapper};
use tracing::debug;

/// `SQL_DESC_*` column attribute identifiers.
pub mod column_attr {
    pub const CONCISE_TYPE: u16 = 2;
    pub const DISPLAY_SIZE: u16 = 6;
    pub const UNSIGNED: u16 = 8;
    pub const FIXED_PREC_SCALE: u16 = 9;
    pub const UPDATABLE: u16 = 10;
    pub const AUTO_UNIQUE_VALUE: u16 = 11;
    pub const CASE_SENSITIVE: u16 = 12;
    pub const SEARCHABLE: u16 = 13;
    pub const TYPE_NAME: u16 = 14;
    pub const TABLE_NAME: u16 = 15;
    pub const SCHEMA_NAME: u16 = 16;
    pub const CATALOG_NAME: u16 = 17;
    pub const LABEL: u16 = 18;
    pub const BASE_COLUMN_NAME: u16 = 22;
    pub const BASE_TABLE_NAME: u16 = 23;
    pub const LITERAL_PREFIX: u16 = 27;
    pub const LITERAL_SUFFIX: u16 = 28;
    pub const LOCAL_TYPE_NAME: u16 = 29;
    pub const NUM_PREC_RADIX: u16 = 32;
    pub const COUNT: u16 = 1001;
    pub const TYPE: u16 = 1002;
    pub const LENGTH: u16 = 1003;
    pub const PRECISION: u16 = 1005;
    pub const SCALE: u16 = 1006;
    pub const NULLABLE: u16 = 1008;
    pub const NAME: u16 = 1011;
    pub const UNNAMED: u16 = 1012;
    pub const OCTET_LENGTH: u16 = 1013;
}

/// `SQL_ATTR_*` statement attribute identifiers.
pub mod stmt_attr {
    pub const QUERY_TIMEOUT: i32 = 0;
    pub const MAX_ROWS: i32 = 1;
    pub const NOSCAN: i32 = 2;
    pub const MAX_LENGTH: i32 = 3;
    pub const ASYNC_ENABLE: i32 = 4;
    pub const ROW_BIND_TYPE: i32 = 5;
    pub const CURSOR_TYPE: i32 = 6;
    pub const CONCURRENCY: i32 = 7;
    pub const KEYSET_SIZE: i32 = 8;
    pub const SIMULATE_CURSOR: i32 = 10;
    pub const RETRIEVE_DATA: i32 = 11;
    pub const USE_BOOKMARKS: i32 = 12;
    pub const ROW_NUMBER: i32 = 14;
    pub const ENABLE_AUTO_IPD: i32 = 15;
    pub const FETCH_BOOKMARK_PTR: i32 = 16;
    pub const PARAM_BIND_OFFSET_PTR: i32 = 17;
    pub const PARAM_BIND_TYPE: i32 = 18;
    pub const PARAM_OPERATION_PTR: i32 = 19;
    pub const PARAM_STATUS_PTR: i32 = 20;
    pub const PARAMS_PROCESSED_PTR: i32 = 21;
    pub const PARAMSET_SIZE: i32 = 22;
    pub const ROW_BIND_OFFSET_PTR: i32 = 23;
    pub const ROW_OPERATION_PTR: i32 = 24;
    pub const ROW_STATUS_PTR: i32 = 25;
    pub const ROWS_FETCHED_PTR: i32 = 26;
    pub const ROW_ARRAY_SIZE: i32 = 27;
    pub const CURSOR_SCROLLABLE: i32 = -1;
    pub const CURSOR_SENSITIVITY: i32 = -2;
    pub const APP_ROW_DESC: i32 = 10010;
    pub const APP_PARAM_DESC: i32 = 10011;
    pub const IMP_ROW_DESC: i32 = 10012;
    pub const IMP_PARAM_DESC: i32 = 10013;
    pub const METADATA_ID: i32 = 10014;
}

/// `SQL_NULLABLE_UNKNOWN`.
pub const NULLABLE_UNKNOWN: i64 = 2;

/// Value of a column attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(v) => Some(*v),
            AttributeValue::Text(_) => None,
        }
    }
}

type Compute = fn(&dyn EngineStatement, usize) -> AttributeValue;

#[derive(Clone, Copy)]
enum AttrSource {
    Text(&'static str),
    Integer(i64),
    Computed(Compute),
}

fn sql_type_code(stmt: &dyn EngineStatement, column: usize) -> AttributeValue {
    AttributeValue::Integer(TypeMapper::row_to_sql(stmt.column_type(column)).code().into())
}

fn column_count(stmt: &dyn EngineStatement, _column: usize) -> AttributeValue {
    AttributeValue::Integer(stmt.column_count() as i64)
}

fn column_len(stmt: &dyn EngineStatement, column: usize) -> AttributeValue {
    AttributeValue::Integer(stmt.column_len(column) as i64)
}

fn column_name(stmt: &dyn EngineStatement, column: usize) -> AttributeValue {
    AttributeValue::Text(stmt.column_name(column))
}

fn type_name(stmt: &dyn EngineStatement, column: usize) -> AttributeValue {
    AttributeValue::Text(TypeMapper::row_type_name(stmt.column_type(column)).to_string())
}

// Only signed integer columns report as signed.
fn unsigned(stmt: &dyn EngineStatement, column: usize) -> AttributeValue {
    AttributeValue::Integer(i64::from(stmt.column_type(column) != RowType::Integer))
}

const COLUMN_ATTRIBUTES: &[(u16, AttrSource)] = &[
    (column_attr::AUTO_UNIQUE_VALUE, AttrSource::Integer(-1)),
    (column_attr::BASE_COLUMN_NAME, AttrSource::Text("")),
    (column_attr::BASE_TABLE_NAME, AttrSource::Text("")),
    (column_attr::CASE_SENSITIVE, AttrSource::Integer(-1)),
    (column_attr::CATALOG_NAME, AttrSource::Text("")),
    (column_attr::CONCISE_TYPE, AttrSource::Computed(sql_type_code)),
    (column_attr::COUNT, AttrSource::Computed(column_count)),
    (column_attr::DISPLAY_SIZE, AttrSource::Integer(-1)),
    (column_attr::FIXED_PREC_SCALE, AttrSource::Integer(-1)),
    (column_attr::LABEL, AttrSource::Text("")),
    (column_attr::LENGTH, AttrSource::Computed(column_len)),
    (column_attr::LITERAL_PREFIX, AttrSource::Text("")),
    (column_attr::LITERAL_SUFFIX, AttrSource::Text("")),
    (column_attr::LOCAL_TYPE_NAME, AttrSource::Text("")),
    (column_attr::NAME, AttrSource::Computed(column_name)),
    (column_attr::NULLABLE, AttrSource::Integer(NULLABLE_UNKNOWN)),
    (column_attr::NUM_PREC_RADIX, AttrSource::Integer(-1)),
    (column_attr::OCTET_LENGTH, AttrSource::Integer(-1)),
    (column_attr::PRECISION, AttrSource::Integer(-1)),
    (column_attr::SCALE, AttrSource::Integer(-1)),
    (column_attr::SCHEMA_NAME, AttrSource::Text("")),
    (column_attr::SEARCHABLE, AttrSource::Integer(-1)),
    (column_attr::TABLE_NAME, AttrSource::Text("")),
    (column_attr::TYPE, AttrSource::Computed(sql_type_code)),
    (column_attr::TYPE_NAME, AttrSource::Computed(type_name)),
    (column_attr::UNNAMED, AttrSource::Integer(-1)),
    (column_attr::UNSIGNED, AttrSource::Computed(unsigned)),
    (column_attr::UPDATABLE, AttrSource::Integer(-1)),
];

/// Resolve column attribute `id` for 0-based `column`.
///
/// Identifiers outside the table resolve to integer 0.
pub(crate) fn column_attribute_value(
    stmt: &dyn EngineStatement,
    column: usize,
    id: u16,
) -> AttributeValue {
    let source = COLUMN_ATTRIBUTES
        .iter()
        .find(|(attr, _)| *attr == id)
        .map(|(_, source)| *source);
    match source {
        Some(AttrSource::Text(text)) => AttributeValue::Text(text.to_string()),
        Some(AttrSource::Integer(value)) => AttributeValue::Integer(value),
        Some(AttrSource::Computed(compute)) => compute(stmt, column),
        None => AttributeValue::Integer(0),
    }
}

/// Descriptor attached to a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    AppRow,
    AppParam,
    ImpRow,
    ImpParam,
}

/// Value of a statement attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementAttrValue {
    Unsigned(u64),
    Descriptor(DescriptorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetPolicy {
    Accept,
    ReadOnly,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GetSource {
    Value(StatementAttrValue),
    Unsupported,
}

const fn constant(value: u64) -> GetSource {
    GetSource::Value(StatementAttrValue::Unsigned(value))
}

const fn descriptor(kind: DescriptorKind) -> GetSource {
    GetSource::Value(StatementAttrValue::Descriptor(kind))
}

// SQL_NONSCROLLABLE, SQL_INSENSITIVE, SQL_CONCUR_READ_ONLY and friends.
const NONSCROLLABLE: u64 = 0;
const INSENSITIVE: u64 = 1;
const ASYNC_ENABLE_OFF: u64 = 0;
const CONCUR_READ_ONLY: u64 = 1;
const CURSOR_FORWARD_ONLY: u64 = 0;
const NOSCAN_ON: u64 = 1;
const RD_ON: u64 = 1;
const UB_OFF: u64 = 0;
const BIND_BY_COLUMN: u64 = 0;

const STATEMENT_ATTRIBUTES: &[(i32, SetPolicy, GetSource)] = &[
    (stmt_attr::APP_ROW_DESC, SetPolicy::Accept, descriptor(DescriptorKind::AppRow)),
    (stmt_attr::APP_PARAM_DESC, SetPolicy::Accept, descriptor(DescriptorKind::AppParam)),
    (stmt_attr::IMP_ROW_DESC, SetPolicy::ReadOnly, descriptor(DescriptorKind::ImpRow)),
    (stmt_attr::IMP_PARAM_DESC, SetPolicy::ReadOnly, descriptor(DescriptorKind::ImpParam)),
    (stmt_attr::CURSOR_SCROLLABLE, SetPolicy::Accept, constant(NONSCROLLABLE)),
    (stmt_attr::CURSOR_SENSITIVITY, SetPolicy::Accept, constant(INSENSITIVE)),
    (stmt_attr::ASYNC_ENABLE, SetPolicy::Accept, constant(ASYNC_ENABLE_OFF)),
    (stmt_attr::CONCURRENCY, SetPolicy::Accept, constant(CONCUR_READ_ONLY)),
    (stmt_attr::CURSOR_TYPE, SetPolicy::Accept, constant(CURSOR_FORWARD_ONLY)),
    (stmt_attr::ENABLE_AUTO_IPD, SetPolicy::Accept, constant(0)),
    (stmt_attr::MAX_LENGTH, SetPolicy::Accept, constant(0)),
    (stmt_attr::MAX_ROWS, SetPolicy::Accept, constant(0)),
    (stmt_attr::METADATA_ID, SetPolicy::Accept, constant(0)),
    (stmt_attr::NOSCAN, SetPolicy::Accept, constant(NOSCAN_ON)),
    (stmt_attr::QUERY_TIMEOUT, SetPolicy::Accept, constant(0)),
    (stmt_attr::RETRIEVE_DATA, SetPolicy::Accept, constant(RD_ON)),
    (stmt_attr::ROW_NUMBER, SetPolicy::Accept, constant(0)),
    (stmt_attr::USE_BOOKMARKS, SetPolicy::Accept, constant(UB_OFF)),
    (stmt_attr::ROW_BIND_TYPE, SetPolicy::Unsupported, constant(BIND_BY_COLUMN)),
    (stmt_attr::FETCH_BOOKMARK_PTR, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::KEYSET_SIZE, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::PARAM_BIND_OFFSET_PTR, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::PARAM_BIND_TYPE, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::PARAM_OPERATION_PTR, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::PARAM_STATUS_PTR, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::PARAMS_PROCESSED_PTR, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::PARAMSET_SIZE, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::ROW_BIND_OFFSET_PTR, SetPolicy::Unsupported, GetSource::Unsupported),
    (stmt_attr::ROW_OPERATION_PTR, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::ROW_STATUS_PTR, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::ROWS_FETCHED_PTR, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::ROW_ARRAY_SIZE, SetPolicy::Accept, GetSource::Unsupported),
    (stmt_attr::SIMULATE_CURSOR, SetPolicy::Accept, GetSource::Unsupported),
];

fn statement_attribute(id: i32) -> (SetPolicy, GetSource) {
    STATEMENT_ATTRIBUTES
        .iter()
        .find(|(attr, _, _)| *attr == id)
        .map_or((SetPolicy::Unsupported, GetSource::Unsupported), |(_, set, get)| {
            (*set, *get)
        })
}

impl<'b> Statement<'b> {
    /// Set a statement attribute (`SQLSetStmtAttr`).
    ///
    /// Accepted attributes are no-ops; the value is ignored.
    ///
    /// # Errors
    ///
    /// Returns invalid-descriptor-use for the implementation descriptors and
    /// not-implemented for attributes outside the allow-list.
    pub fn set_attribute(&mut self, id: i32, value: u64) -> Result<(), StatementError> {
        const FUNCTION: &str = "SQLSetStmtAttr";
        self.clear_error();
        debug!(attribute = id, value, "SQLSetStmtAttr");

        match statement_attribute(id).0 {
            SetPolicy::Accept => Ok(()),
            SetPolicy::ReadOnly => self.fail(
                ErrorKind::InvalidDescriptorUse,
                "Invalid use of an automatically allocated descriptor handle",
                FUNCTION,
            ),
            SetPolicy::Unsupported => self.fail(
                ErrorKind::NotImplemented,
                "Driver does not support the statement attribute",
                FUNCTION,
            ),
        }
    }

    /// Read a statement attribute (`SQLGetStmtAttr`).
    ///
    /// # Errors
    ///
    /// Returns not-implemented for attributes without a reportable value.
    pub fn get_attribute(&mut self, id: i32) -> Result<StatementAttrValue, StatementError> {
        const FUNCTION: &str = "SQLGetStmtAttr";
        self.clear_error();
        debug!(attribute = id, "SQLGetStmtAttr");

        match statement_attribute(id).1 {
            GetSource::Value(value) => Ok(value),
            GetSource::Unsupported => self.fail(
                ErrorKind::NotImplemented,
                "Driver does not support the statement attribute",
                FUNCTION,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColumnInfo, MemoryEngine, QueryEngine};
    use serde_json::json;

    fn executed() -> Box<dyn EngineStatement> {
        let engine = MemoryEngine::new().with_rows(
            "SELECT id, label FROM t",
            vec![
                ColumnInfo::new("id", RowType::Integer),
                ColumnInfo::new("label", RowType::String),
            ],
            vec![vec![json!(1), json!("first")]],
        );
        let mut stmt = engine.prepare("SELECT id, label FROM t").unwrap();
        stmt.execute().unwrap();
        stmt.fetch();
        stmt
    }

    #[test]
    fn test_column_attribute_table_covers_all_identifiers() {
        assert_eq!(COLUMN_ATTRIBUTES.len(), 28);
    }

    #[test]
    fn test_computed_column_attributes() {
        let stmt = executed();
        let stmt: &dyn EngineStatement = &*stmt;
        assert_eq!(
            column_attribute_value(stmt, 1, column_attr::NAME),
            AttributeValue::Text("label".to_string())
        );
        assert_eq!(
            column_attribute_value(stmt, 0, column_attr::TYPE).as_integer(),
            Some(-5)
        );
        assert_eq!(
            column_attribute_value(stmt, 1, column_attr::CONCISE_TYPE).as_integer(),
            Some(12)
        );
        assert_eq!(
            column_attribute_value(stmt, 0, column_attr::TYPE_NAME).as_text(),
            Some("BIGINT")
        );
        assert_eq!(
            column_attribute_value(stmt, 0, column_attr::COUNT).as_integer(),
            Some(2)
        );
        assert_eq!(
            column_attribute_value(stmt, 1, column_attr::LENGTH).as_integer(),
            Some(5)
        );
    }

    #[test]
    fn test_unsigned_attribute() {
        let stmt = executed();
        assert_eq!(
            column_attribute_value(&*stmt, 0, column_attr::UNSIGNED).as_integer(),
            Some(0)
        );
        assert_eq!(
            column_attribute_value(&*stmt, 1, column_attr::UNSIGNED).as_integer(),
            Some(1)
        );
    }

    #[test]
    fn test_neutral_column_attributes() {
        let stmt = executed();
        let stmt: &dyn EngineStatement = &*stmt;
        for id in [
            column_attr::AUTO_UNIQUE_VALUE,
            column_attr::DISPLAY_SIZE,
            column_attr::PRECISION,
            column_attr::SCALE,
            column_attr::UPDATABLE,
        ] {
            assert_eq!(column_attribute_value(stmt, 0, id), AttributeValue::Integer(-1));
        }
        assert_eq!(
            column_attribute_value(stmt, 0, column_attr::TABLE_NAME),
            AttributeValue::Text(String::new())
        );
        assert_eq!(
            column_attribute_value(stmt, 0, column_attr::NULLABLE),
            AttributeValue::Integer(NULLABLE_UNKNOWN)
        );
    }

    #[test]
    fn test_unknown_column_attribute_is_zero() {
        let stmt = executed();
        assert_eq!(
            column_attribute_value(&*stmt, 0, 4242),
            AttributeValue::Integer(0)
        );
    }

    #[test]
    fn test_statement_attribute_policies() {
        assert_eq!(statement_attribute(stmt_attr::NOSCAN).0, SetPolicy::Accept);
        assert_eq!(statement_attribute(stmt_attr::IMP_ROW_DESC).0, SetPolicy::ReadOnly);
        assert_eq!(
            statement_attribute(stmt_attr::ROW_BIND_OFFSET_PTR).0,
            SetPolicy::Unsupported
        );
        assert_eq!(statement_attribute(99999).0, SetPolicy::Unsupported);
    }

    #[test]
    fn test_statement_attribute_getters() {
        assert_eq!(
            statement_attribute(stmt_attr::CURSOR_TYPE).1,
            constant(CURSOR_FORWARD_ONLY)
        );
        assert_eq!(
            statement_attribute(stmt_attr::IMP_PARAM_DESC).1,
            descriptor(DescriptorKind::ImpParam)
        );
        assert_eq!(
            statement_attribute(stmt_attr::ROW_ARRAY_SIZE).1,
            GetSource::Unsupported
        );
    }
}
