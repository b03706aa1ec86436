//! Chunked column retrieval (`SQLGetData`).

use super::convert::{chunk_range, conversion_message, render};
use super::{Statement, StatementState, Status};
use crate::error::{ErrorKind, StatementError};
use crate::types::{HostType, Len, RowType, TypeMapper, NULL_DATA};

/// Progress of repeated reads on one column of the current row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkCursor {
    column: Option<usize>,
    delivered: usize,
}

impl ChunkCursor {
    /// Forget all progress. Called on every fetch.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Make `column` the active column. Progress restarts when the column
    /// changes or the read is not chunked.
    pub fn select(&mut self, column: usize, chunked: bool) {
        if self.column != Some(column) || !chunked {
            self.column = Some(column);
            self.delivered = 0;
        }
    }

    /// Whether a column of `len` bytes has been fully handed out.
    pub fn is_exhausted(&self, len: usize) -> bool {
        self.delivered > 0 && self.delivered >= len
    }

    pub fn advance(&mut self, bytes: usize) {
        self.delivered = self.delivered.saturating_add(bytes);
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }
}

impl<'b> Statement<'b> {
    /// Read one column of the current row into `buffer` (`SQLGetData`).
    ///
    /// Text and binary columns read with an indicator slot are delivered in
    /// chunks: each call continues where the previous call on the same column
    /// stopped and returns `SuccessWithInfo` while data remains, then
    /// `NoData` once the column is exhausted. Any other read is single-shot.
    ///
    /// `buffer_len` is the declared capacity; it also narrows integer and
    /// floating requests to the matching fixed width.
    ///
    /// # Errors
    ///
    /// Returns sequence-error before execution, invalid-descriptor-index for
    /// bad indices or when no row is positioned, indicator-required for a null
    /// value without an indicator slot, invalid-buffer-length for a negative
    /// capacity, and invalid-buffer-type for unmapped host types.
    pub fn get_data(
        &mut self,
        index: u16,
        host_type: HostType,
        buffer: &mut [u8],
        buffer_len: Len,
        mut indicator: Option<&mut Len>,
    ) -> Result<Status, StatementError> {
        const FUNCTION: &str = "SQLGetData";
        self.clear_error();

        let handle = match self.handle.as_deref() {
            Some(handle) if self.state == StatementState::Executed => handle,
            _ => return self.fail(ErrorKind::SequenceError, "Function sequence error", FUNCTION),
        };

        if index == 0 || usize::from(index) > handle.column_count() {
            return self.fail(
                ErrorKind::InvalidDescriptorIndex,
                "Invalid descriptor index",
                FUNCTION,
            );
        }
        let column = usize::from(index) - 1;

        if !handle.has_current_row() {
            return self.fail(
                ErrorKind::InvalidDescriptorIndex,
                "No data or row in current row",
                FUNCTION,
            );
        }

        if handle.column_is_null(column) {
            return match indicator {
                Some(slot) => {
                    *slot = NULL_DATA;
                    Ok(Status::Success)
                }
                None => self.fail(
                    ErrorKind::IndicatorRequired,
                    "Indicator variable required but not supplied",
                    FUNCTION,
                ),
            };
        }

        if buffer_len < 0 {
            return self.fail(
                ErrorKind::InvalidBufferLength,
                "Invalid string or buffer length",
                FUNCTION,
            );
        }

        let column_type = handle.column_type(column);
        let resolved = match TypeMapper::host_to_bind(host_type) {
            Some(bind) => bind,
            None if host_type == HostType::Default => TypeMapper::row_to_bind(column_type),
            None => {
                return self.fail(
                    ErrorKind::InvalidBufferType,
                    "Invalid application buffer type",
                    FUNCTION,
                )
            }
        };
        let (bind_type, declared) = TypeMapper::narrow(resolved, buffer_len);

        self.cursor.select(column, indicator.is_some());
        let column_len = handle.column_len(column);
        if self.cursor.is_exhausted(column_len) {
            return Ok(Status::NoData);
        }

        let value = handle.column_value(column);
        let delivered = render(&value, bind_type).and_then(|rendered| {
            let range = chunk_range(
                rendered.len(),
                self.cursor.delivered(),
                bind_type,
                declared,
                buffer.len(),
            )?;
            let written = range.len();
            buffer[..written].copy_from_slice(&rendered[range]);
            Ok(written)
        });
        let written = match delivered {
            Ok(written) => written,
            Err(kind) => return self.fail(kind, conversion_message(kind), FUNCTION),
        };
        if let Some(slot) = indicator.as_deref_mut() {
            *slot = written as Len;
        }

        let chunked = matches!(column_type, RowType::String | RowType::Binary);
        if indicator.is_none() || !chunked {
            return Ok(Status::Success);
        }

        self.cursor.advance(written);
        if self.cursor.delivered() >= column_len {
            Ok(Status::Success)
        } else {
            Ok(self.warn(ErrorKind::Truncation, "String data, right truncated", FUNCTION))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_starts_empty() {
        let cursor = ChunkCursor::default();
        assert_eq!(cursor.column(), None);
        assert_eq!(cursor.delivered(), 0);
        assert!(!cursor.is_exhausted(0));
    }

    #[test]
    fn test_cursor_keeps_progress_on_same_column() {
        let mut cursor = ChunkCursor::default();
        cursor.select(1, true);
        cursor.advance(4);
        cursor.select(1, true);
        assert_eq!(cursor.delivered(), 4);
    }

    #[test]
    fn test_cursor_resets_on_column_switch() {
        let mut cursor = ChunkCursor::default();
        cursor.select(1, true);
        cursor.advance(4);
        cursor.select(0, true);
        assert_eq!(cursor.column(), Some(0));
        assert_eq!(cursor.delivered(), 0);
    }

    #[test]
    fn test_cursor_resets_without_indicator() {
        let mut cursor = ChunkCursor::default();
        cursor.select(2, true);
        cursor.advance(3);
        cursor.select(2, false);
        assert_eq!(cursor.delivered(), 0);
    }

    #[test]
    fn test_cursor_exhaustion() {
        let mut cursor = ChunkCursor::default();
        cursor.select(0, true);
        cursor.advance(10);
        assert!(cursor.is_exhausted(10));
        assert!(!cursor.is_exhausted(11));
        cursor.reset();
        assert!(!cursor.is_exhausted(10));
    }
}
