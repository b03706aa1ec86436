//! Result and parameter metadata.

use super::attributes::{column_attribute_value, AttributeValue};
use super::{Statement, StatementState, Status};
use crate::engine::{count_placeholders, QueryKind};
use crate::error::{ErrorKind, StatementError};
use crate::types::{SqlType, TypeMapper};
use tracing::info;

/// Nullability of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    NoNulls,
    Nullable,
    Unknown,
}

impl Nullability {
    /// `SQL_NO_NULLS`, `SQL_NULLABLE` or `SQL_NULLABLE_UNKNOWN`.
    pub fn code(self) -> i16 {
        match self {
            Nullability::NoNulls => 0,
            Nullability::Nullable => 1,
            Nullability::Unknown => 2,
        }
    }
}

/// Column description returned by `describe_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    /// Full column name
    pub name: String,
    /// Length of the full name in bytes
    pub name_len: usize,
    /// Exposed SQL type
    pub sql_type: SqlType,
    /// Column size; not reported by the engine
    pub column_size: u64,
    /// Decimal digits; not reported by the engine
    pub decimal_digits: i16,
    pub nullable: Nullability,
}

impl<'b> Statement<'b> {
    /// Number of result columns (`SQLNumResultCols`).
    ///
    /// # Errors
    ///
    /// Returns sequence-error unless the statement is executed.
    pub fn column_count(&mut self) -> Result<usize, StatementError> {
        self.clear_error();
        let count = match self.handle.as_deref() {
            Some(handle) if self.state == StatementState::Executed => handle.column_count(),
            _ => {
                return self.fail(
                    ErrorKind::SequenceError,
                    "Function sequence error",
                    "SQLNumResultCols",
                )
            }
        };
        info!("SQLNumResultCols(OK) {} columns", count);
        Ok(count)
    }

    /// Describe a result column (`SQLDescribeCol`).
    ///
    /// When `name_buf` is given the name is copied into it, null-terminated
    /// when it fits. A name that does not fit (including its terminator)
    /// makes the call return `SuccessWithInfo` with a truncation record.
    ///
    /// # Errors
    ///
    /// Returns sequence-error when the engine has not answered, a
    /// not-cursor-specification error when the reply has no result
    /// description, and invalid-descriptor-index for bad indices.
    pub fn describe_column(
        &mut self,
        index: u16,
        name_buf: Option<&mut [u8]>,
    ) -> Result<(Status, ColumnDescription), StatementError> {
        const FUNCTION: &str = "SQLDescribeCol";
        self.clear_error();

        let handle = match self.handle.as_deref() {
            Some(handle) if handle.has_reply() => handle,
            _ => return self.fail(ErrorKind::SequenceError, "Function sequence error", FUNCTION),
        };
        if !handle.has_field_names() {
            return self.fail(
                ErrorKind::NotCursorSpecification,
                "Prepared statement not a cursor-specification",
                FUNCTION,
            );
        }
        if index == 0 || usize::from(index) > handle.column_count() {
            return self.fail(
                ErrorKind::InvalidDescriptorIndex,
                "Invalid descriptor index",
                FUNCTION,
            );
        }
        let column = usize::from(index) - 1;

        let name = handle.column_name(column);
        let description = ColumnDescription {
            name_len: name.len(),
            sql_type: TypeMapper::row_to_sql(handle.column_type(column)),
            column_size: 0,
            decimal_digits: 0,
            nullable: Nullability::Unknown,
            name,
        };

        let mut status = Status::Success;
        if let Some(buf) = name_buf {
            let bytes = description.name.as_bytes();
            let copied = bytes.len().min(buf.len());
            buf[..copied].copy_from_slice(&bytes[..copied]);
            if let Some(terminator) = buf.get_mut(copied) {
                *terminator = 0;
            }
            if buf.len() <= bytes.len() {
                status = self.warn(ErrorKind::Truncation, "String data, right truncated", FUNCTION);
            }
        }
        Ok((status, description))
    }

    /// Read a column attribute (`SQLColAttribute`).
    ///
    /// Every attribute identifier resolves once the index is valid;
    /// identifiers the driver does not know report integer 0.
    ///
    /// # Errors
    ///
    /// Returns sequence-error before prepare and invalid-descriptor-index for
    /// bad indices.
    pub fn column_attribute(
        &mut self,
        index: u16,
        attribute_id: u16,
    ) -> Result<AttributeValue, StatementError> {
        const FUNCTION: &str = "SQLColAttribute";
        self.clear_error();
        info!("SQLColAttribute(Attribute={}, ColNumber={})", attribute_id, index);

        let Some(handle) = self.handle.as_deref() else {
            return self.fail(ErrorKind::SequenceError, "Function sequence error", FUNCTION);
        };
        if index == 0 || usize::from(index) > handle.column_count() {
            return self.fail(
                ErrorKind::InvalidDescriptorIndex,
                "Invalid descriptor index",
                FUNCTION,
            );
        }
        Ok(column_attribute_value(
            handle,
            usize::from(index) - 1,
            attribute_id,
        ))
    }

    /// Rows affected by the last execution (`SQLRowCount`).
    ///
    /// Row-returning statements report -1.
    ///
    /// # Errors
    ///
    /// Returns sequence-error unless the statement is executed.
    pub fn affected_rows(&mut self) -> Result<i64, StatementError> {
        self.clear_error();
        match self.handle.as_deref() {
            Some(handle) if self.state == StatementState::Executed => {
                Ok(match handle.query_kind() {
                    QueryKind::Dml => i64::try_from(handle.affected_rows()).unwrap_or(i64::MAX),
                    QueryKind::Select => -1,
                })
            }
            _ => self.fail(ErrorKind::SequenceError, "Function sequence error", "SQLRowCount"),
        }
    }

    /// Number of parameter markers in the prepared query (`SQLNumParams`).
    ///
    /// # Errors
    ///
    /// Returns sequence-error before prepare.
    pub fn num_params(&mut self) -> Result<usize, StatementError> {
        self.clear_error();
        match self.handle.as_deref() {
            Some(handle) => Ok(handle.query().map_or(0, |sql| count_placeholders(&sql))),
            None => self.fail(ErrorKind::SequenceError, "Function sequence error", "SQLNumParams"),
        }
    }

    /// Describe a parameter (`SQLDescribeParam`).
    ///
    /// # Errors
    ///
    /// Always fails with not-implemented: describing parameters needs a
    /// parsed statement.
    pub fn describe_param(&mut self, _index: u16) -> Result<(), StatementError> {
        self.clear_error();
        self.fail(
            ErrorKind::NotImplemented,
            "Driver does not support this function",
            "SQLDescribeParam",
        )
    }
}
