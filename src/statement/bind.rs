//! Bind descriptors and the bind parameter store.
//!
//! A statement keeps two stores: one for input parameters and one for output
//! columns. Both are index-addressed, grow on demand and never shrink. Caller
//! buffers are borrowed for the statement lifetime `'b` as slices of
//! [`Cell<u8>`], so the caller can keep writing parameter values (and reading
//! fetched columns) between calls.

use super::{Statement, StatementState};
use crate::engine::Value;
use crate::error::{ErrorKind, StatementError};
use crate::types::{BindType, HostType, Len, TypeMapper, NTS, NULL_DATA};
use std::cell::Cell;
use std::collections::TryReserveError;
use tracing::trace;

/// View a mutable byte buffer as cells suitable for a persistent binding.
pub fn as_cells(buffer: &mut [u8]) -> &[Cell<u8>] {
    Cell::from_mut(buffer).as_slice_of_cells()
}

/// One parameter or output column binding.
///
/// The zeroed descriptor (`Default`) has type `Nil` and no buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BindDescriptor<'b> {
    /// Coerced value type
    pub bind_type: BindType,
    /// Caller buffer
    pub buffer: Option<&'b [Cell<u8>]>,
    /// Declared length (input) or buffer capacity (output)
    pub len: Len,
    /// Caller length/indicator slot
    pub indicator: Option<&'b Cell<Len>>,
}

impl<'b> BindDescriptor<'b> {
    /// Descriptor for a null parameter.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.buffer.is_some() || self.indicator.is_some()
    }
}

/// Resizable array of bind descriptors.
#[derive(Debug, Default)]
pub struct BindStore<'b> {
    slots: Vec<BindDescriptor<'b>>,
}

impl<'b> BindStore<'b> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of descriptor slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether anything was ever bound.
    pub fn is_allocated(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Grow to at least `required` slots.
    ///
    /// Existing descriptors are preserved and new slots are zero-filled.
    /// Nothing is reallocated when the store is already large enough.
    ///
    /// # Errors
    ///
    /// Returns the allocation error; the store is left untouched.
    pub fn ensure_capacity(&mut self, required: usize) -> Result<(), TryReserveError> {
        if required <= self.slots.len() {
            return Ok(());
        }
        self.slots.try_reserve_exact(required - self.slots.len())?;
        self.slots.resize(required, BindDescriptor::default());
        Ok(())
    }

    /// Descriptor at 0-based `index`.
    pub fn get(&self, index: usize) -> Option<&BindDescriptor<'b>> {
        self.slots.get(index)
    }

    /// Overwrite the descriptor at 0-based `index`. Returns false when the
    /// slot does not exist.
    pub fn set(&mut self, index: usize, descriptor: BindDescriptor<'b>) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = descriptor;
                true
            }
            None => false,
        }
    }

    /// Zero every descriptor without shrinking.
    pub fn reset(&mut self) {
        self.slots.fill(BindDescriptor::default());
    }

    pub fn iter(&self) -> impl Iterator<Item = &BindDescriptor<'b>> {
        self.slots.iter()
    }
}

impl<'b> Statement<'b> {
    /// Bind an input parameter (`SQLBindParameter`).
    ///
    /// A parameter whose indicator holds `NULL_DATA` is bound as null and its
    /// buffer is ignored. For text buffers, an `NTS` length is resolved by
    /// scanning for the terminator.
    ///
    /// Numeric parameters are sized by `buffer_len`: 2 and 1 bytes bind as
    /// 16- and 8-bit integers, and a floating-point length below 4 binds as
    /// null. The buffer must hold the resulting width.
    ///
    /// # Arguments
    ///
    /// * `index` - 1-based parameter number
    /// * `host_type` - Caller buffer type
    /// * `buffer` - Caller buffer, borrowed until rebind or statement drop
    /// * `buffer_len` - Value length in bytes, or `NTS`
    /// * `indicator` - Optional length/indicator slot
    ///
    /// # Errors
    ///
    /// Returns invalid-descriptor-index for index 0, invalid-buffer-type for
    /// unmapped host types, invalid-null-pointer or invalid-buffer-length for
    /// unusable buffers, and memory-allocation when the store cannot grow.
    pub fn bind_input(
        &mut self,
        index: u16,
        host_type: HostType,
        buffer: Option<&'b [Cell<u8>]>,
        buffer_len: Len,
        indicator: Option<&'b Cell<Len>>,
    ) -> Result<(), StatementError> {
        const FUNCTION: &str = "SQLBindParameter";
        self.clear_error();

        if index < 1 {
            return self.fail(
                ErrorKind::InvalidDescriptorIndex,
                "ODBC bind parameter invalid index number",
                FUNCTION,
            );
        }

        let Some(bind_type) = TypeMapper::host_to_bind(host_type) else {
            return self.fail(
                ErrorKind::InvalidBufferType,
                "Invalid application buffer type",
                FUNCTION,
            );
        };

        let is_null = indicator.is_some_and(|slot| slot.get() == NULL_DATA);
        let descriptor = if is_null {
            BindDescriptor {
                indicator,
                ..BindDescriptor::null()
            }
        } else {
            let Some(buf) = buffer else {
                return self.fail(
                    ErrorKind::InvalidNullPointer,
                    "Invalid use of null pointer",
                    FUNCTION,
                );
            };
            match bind_type.width() {
                Some(_) => match TypeMapper::narrow(bind_type, buffer_len) {
                    (BindType::Nil, _) => BindDescriptor {
                        indicator,
                        ..BindDescriptor::null()
                    },
                    (narrowed, len) => {
                        if narrowed.width().is_some_and(|width| buf.len() < width) {
                            return self.fail(
                                ErrorKind::InvalidBufferLength,
                                "Invalid string or buffer length",
                                FUNCTION,
                            );
                        }
                        BindDescriptor {
                            bind_type: narrowed,
                            buffer: Some(buf),
                            len,
                            indicator,
                        }
                    }
                },
                None => {
                    let len = if bind_type == BindType::Str && buffer_len == NTS {
                        terminated_len(buf)
                    } else if buffer_len < 0 {
                        return self.fail(
                            ErrorKind::InvalidBufferLength,
                            "Invalid string or buffer length",
                            FUNCTION,
                        );
                    } else {
                        buffer_len
                    };
                    BindDescriptor {
                        bind_type,
                        buffer: Some(buf),
                        len,
                        indicator,
                    }
                }
            }
        };

        if self.inputs.ensure_capacity(usize::from(index)).is_err() {
            return self.fail(
                ErrorKind::MemoryAllocation,
                "Unable to allocate memory",
                FUNCTION,
            );
        }
        self.inputs.set(usize::from(index) - 1, descriptor);
        trace!(
            index,
            bind_type = ?descriptor.bind_type,
            null = is_null,
            "bound input parameter"
        );
        Ok(())
    }

    /// Bind an output column (`SQLBindCol`).
    ///
    /// `HostType::Default` takes the column's type once the statement is
    /// executed and falls back to text before that. The binding is picked up
    /// by every following fetch.
    ///
    /// # Errors
    ///
    /// Returns invalid-descriptor-index for index 0 or, on an executed
    /// statement, an index past the last column; invalid-buffer-length for a
    /// negative capacity or a fixed-width buffer that is too short;
    /// invalid-buffer-type for unmapped host types.
    pub fn bind_output(
        &mut self,
        index: u16,
        host_type: HostType,
        buffer: Option<&'b [Cell<u8>]>,
        buffer_len: Len,
        indicator: Option<&'b Cell<Len>>,
    ) -> Result<(), StatementError> {
        const FUNCTION: &str = "SQLBindCol";
        self.clear_error();

        if index < 1 {
            return self.fail(
                ErrorKind::InvalidDescriptorIndex,
                "Invalid descriptor index",
                FUNCTION,
            );
        }
        if buffer_len < 0 {
            return self.fail(
                ErrorKind::InvalidBufferLength,
                "Invalid string or buffer length",
                FUNCTION,
            );
        }

        let column = usize::from(index) - 1;
        let mut required = usize::from(index);
        let mut column_type = None;
        if self.state == StatementState::Executed {
            if let Some(handle) = self.handle.as_deref() {
                let count = handle.column_count();
                if count < usize::from(index) {
                    return self.fail(
                        ErrorKind::InvalidDescriptorIndex,
                        "Invalid descriptor index",
                        FUNCTION,
                    );
                }
                required = count;
                column_type = Some(handle.column_type(column));
            }
        }

        let Some(bind_type) = TypeMapper::resolve_output(host_type, column_type) else {
            return self.fail(
                ErrorKind::InvalidBufferType,
                "Invalid application buffer type",
                FUNCTION,
            );
        };
        if let (Some(width), Some(buf)) = (bind_type.width(), buffer) {
            if buf.len() < width {
                return self.fail(
                    ErrorKind::InvalidBufferLength,
                    "Invalid string or buffer length",
                    FUNCTION,
                );
            }
        }

        if self.outputs.ensure_capacity(required).is_err() {
            return self.fail(
                ErrorKind::MemoryAllocation,
                "Unable to allocate memory",
                FUNCTION,
            );
        }
        self.outputs.set(
            column,
            BindDescriptor {
                bind_type,
                buffer,
                len: buffer_len,
                indicator,
            },
        );
        trace!(index, ?bind_type, "bound output column");
        Ok(())
    }

    /// Input descriptor for 1-based parameter `index`.
    pub fn input_descriptor(&self, index: u16) -> Option<&BindDescriptor<'b>> {
        usize::from(index)
            .checked_sub(1)
            .and_then(|i| self.inputs.get(i))
    }

    /// Output descriptor for 1-based column `index`.
    pub fn output_descriptor(&self, index: u16) -> Option<&BindDescriptor<'b>> {
        usize::from(index)
            .checked_sub(1)
            .and_then(|i| self.outputs.get(i))
    }

    pub fn input_capacity(&self) -> usize {
        self.inputs.capacity()
    }

    pub fn output_capacity(&self) -> usize {
        self.outputs.capacity()
    }
}

/// Length of a null-terminated string in `buffer`; the whole buffer when no
/// terminator is present.
fn terminated_len(buffer: &[Cell<u8>]) -> Len {
    let len = buffer
        .iter()
        .position(|b| b.get() == 0)
        .unwrap_or(buffer.len());
    len as Len
}

fn read_bytes(buffer: &[Cell<u8>], len: Len) -> Vec<u8> {
    let len = usize::try_from(len).unwrap_or(0).min(buffer.len());
    buffer[..len].iter().map(Cell::get).collect()
}

fn read_array<const N: usize>(buffer: &[Cell<u8>]) -> Option<[u8; N]> {
    let src = buffer.get(..N)?;
    let mut out = [0u8; N];
    for (dst, cell) in out.iter_mut().zip(src) {
        *dst = cell.get();
    }
    Some(out)
}

/// Read the current value of an input binding from the caller buffer.
pub(crate) fn parameter_value(descriptor: &BindDescriptor<'_>) -> Value {
    let Some(buf) = descriptor.buffer else {
        return Value::Nil;
    };
    let value = match descriptor.bind_type {
        BindType::Nil => None,
        BindType::Str => Some(Value::Str(read_bytes(buf, descriptor.len))),
        BindType::Bin => Some(Value::Bin(read_bytes(buf, descriptor.len))),
        BindType::Int => read_array(buf).map(|b| Value::Int(i64::from_ne_bytes(b))),
        BindType::UInt => read_array(buf).map(|b| Value::UInt(u64::from_ne_bytes(b))),
        BindType::Int32 => read_array(buf).map(|b| Value::Int(i32::from_ne_bytes(b).into())),
        BindType::UInt32 => read_array(buf).map(|b| Value::UInt(u32::from_ne_bytes(b).into())),
        BindType::Int16 => read_array(buf).map(|b| Value::Int(i16::from_ne_bytes(b).into())),
        BindType::UInt16 => read_array(buf).map(|b| Value::UInt(u16::from_ne_bytes(b).into())),
        BindType::Int8 => read_array(buf).map(|b| Value::Int(i8::from_ne_bytes(b).into())),
        BindType::UInt8 => read_array(buf).map(|b| Value::UInt(u8::from_ne_bytes(b).into())),
        BindType::Float => read_array(buf).map(|b| Value::Float(f32::from_ne_bytes(b))),
        BindType::Double => read_array(buf).map(|b| Value::Double(f64::from_ne_bytes(b))),
    };
    value.unwrap_or(Value::Nil)
}

/// Snapshot every input binding, in parameter order.
pub(crate) fn parameter_values(store: &BindStore<'_>) -> Vec<Value> {
    store.iter().map(parameter_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_grows_and_zero_fills() {
        let mut store = BindStore::new();
        assert!(!store.is_allocated());

        store.ensure_capacity(3).unwrap();
        assert_eq!(store.capacity(), 3);
        assert!(store.iter().all(|d| *d == BindDescriptor::default()));
        assert_eq!(store.get(2).unwrap().bind_type, BindType::Nil);
    }

    #[test]
    fn test_store_never_shrinks() {
        let mut store = BindStore::new();
        store.ensure_capacity(5).unwrap();
        store.ensure_capacity(2).unwrap();
        assert_eq!(store.capacity(), 5);
    }

    #[test]
    fn test_store_preserves_entries_on_growth() {
        let mut buf = [0u8; 8];
        let cells = as_cells(&mut buf);
        let mut store = BindStore::new();
        store.ensure_capacity(1).unwrap();
        let descriptor = BindDescriptor {
            bind_type: BindType::Int,
            buffer: Some(cells),
            len: 8,
            indicator: None,
        };
        assert!(store.set(0, descriptor));

        store.ensure_capacity(10).unwrap();
        assert_eq!(store.get(0), Some(&descriptor));
        assert_eq!(store.capacity(), 10);
    }

    #[test]
    fn test_store_allocation_failure_leaves_store_untouched() {
        let mut store = BindStore::new();
        store.ensure_capacity(2).unwrap();
        assert!(store.ensure_capacity(usize::MAX).is_err());
        assert_eq!(store.capacity(), 2);
    }

    #[test]
    fn test_store_set_out_of_range() {
        let mut store = BindStore::new();
        assert!(!store.set(0, BindDescriptor::null()));
    }

    #[test]
    fn test_store_reset_keeps_capacity() {
        let mut buf = [0u8; 4];
        let cells = as_cells(&mut buf);
        let mut store = BindStore::new();
        store.ensure_capacity(2).unwrap();
        store.set(
            1,
            BindDescriptor {
                bind_type: BindType::Str,
                buffer: Some(cells),
                len: 4,
                indicator: None,
            },
        );
        store.reset();
        assert_eq!(store.capacity(), 2);
        assert!(!store.get(1).unwrap().is_bound());
    }

    #[test]
    fn test_terminated_len() {
        let mut buf = *b"abc\0def";
        assert_eq!(terminated_len(as_cells(&mut buf)), 3);
        let mut buf = *b"abc";
        assert_eq!(terminated_len(as_cells(&mut buf)), 3);
    }

    #[test]
    fn test_parameter_value_reads_current_buffer() {
        let mut buf = 7i64.to_ne_bytes();
        let cells = as_cells(&mut buf);
        let descriptor = BindDescriptor {
            bind_type: BindType::Int,
            buffer: Some(cells),
            len: 8,
            indicator: None,
        };
        assert_eq!(parameter_value(&descriptor), Value::Int(7));

        for (cell, byte) in cells.iter().zip(42i64.to_ne_bytes()) {
            cell.set(byte);
        }
        assert_eq!(parameter_value(&descriptor), Value::Int(42));
    }

    #[test]
    fn test_parameter_value_narrow_types() {
        let mut buf = (-3i16).to_ne_bytes();
        let descriptor = BindDescriptor {
            bind_type: BindType::Int16,
            buffer: Some(as_cells(&mut buf)),
            len: 2,
            indicator: None,
        };
        assert_eq!(parameter_value(&descriptor), Value::Int(-3));

        let mut buf = 1.5f32.to_ne_bytes();
        let descriptor = BindDescriptor {
            bind_type: BindType::Float,
            buffer: Some(as_cells(&mut buf)),
            len: 4,
            indicator: None,
        };
        assert_eq!(parameter_value(&descriptor), Value::Float(1.5));
    }

    #[test]
    fn test_parameter_value_text_clamped_to_buffer() {
        let mut buf = *b"hello";
        let descriptor = BindDescriptor {
            bind_type: BindType::Str,
            buffer: Some(as_cells(&mut buf)),
            len: 50,
            indicator: None,
        };
        assert_eq!(parameter_value(&descriptor), Value::from("hello"));
    }

    #[test]
    fn test_parameter_value_unbound_slot_is_nil() {
        assert_eq!(parameter_value(&BindDescriptor::default()), Value::Nil);
    }
}
