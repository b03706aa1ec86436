//! Value-to-buffer conversion.
//!
//! A column value is first rendered into the byte representation of the
//! requested bind type, then a bounded slice of that rendering is copied into
//! the caller buffer. Fixed-width targets always receive exactly their width;
//! text and binary targets receive at most the declared length, starting at
//! the chunk offset.

use super::bind::BindStore;
use crate::engine::{EngineStatement, Value};
use crate::error::ErrorKind;
use crate::types::{BindType, Len, NULL_DATA};
use std::cell::Cell;
use std::ops::Range;

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    fn as_i64(self) -> i64 {
        match self {
            Number::Int(v) => v,
            Number::UInt(v) => v as i64,
            Number::Float(v) => v as i64,
        }
    }

    fn as_u64(self) -> u64 {
        match self {
            Number::Int(v) => v as u64,
            Number::UInt(v) => v,
            Number::Float(v) => v as u64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::UInt(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

fn parse_number(bytes: &[u8]) -> Option<Number> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    if let Ok(v) = text.parse::<i64>() {
        return Some(Number::Int(v));
    }
    if let Ok(v) = text.parse::<u64>() {
        return Some(Number::UInt(v));
    }
    text.parse::<f64>().ok().map(Number::Float)
}

fn number(value: &Value) -> Result<Number, ErrorKind> {
    match value {
        Value::Nil => Ok(Number::Int(0)),
        Value::Bool(b) => Ok(Number::Int(i64::from(*b))),
        Value::Int(v) => Ok(Number::Int(*v)),
        Value::UInt(v) => Ok(Number::UInt(*v)),
        Value::Float(v) => Ok(Number::Float(f64::from(*v))),
        Value::Double(v) => Ok(Number::Float(*v)),
        Value::Str(bytes) => parse_number(bytes).ok_or(ErrorKind::InvalidCast),
        Value::Bin(_) => Err(ErrorKind::InvalidCast),
    }
}

fn text(value: &Value) -> Vec<u8> {
    match value {
        Value::Nil => Vec::new(),
        Value::Bool(b) => if *b { b"1".to_vec() } else { b"0".to_vec() },
        Value::Int(v) => v.to_string().into_bytes(),
        Value::UInt(v) => v.to_string().into_bytes(),
        Value::Float(v) => v.to_string().into_bytes(),
        Value::Double(v) => v.to_string().into_bytes(),
        Value::Str(bytes) | Value::Bin(bytes) => bytes.clone(),
    }
}

fn binary(value: &Value) -> Vec<u8> {
    match value {
        Value::Nil => Vec::new(),
        Value::Bool(b) => vec![u8::from(*b)],
        Value::Int(v) => v.to_ne_bytes().to_vec(),
        Value::UInt(v) => v.to_ne_bytes().to_vec(),
        Value::Float(v) => v.to_ne_bytes().to_vec(),
        Value::Double(v) => v.to_ne_bytes().to_vec(),
        Value::Str(bytes) | Value::Bin(bytes) => bytes.clone(),
    }
}

/// Render `value` as the bytes of `target`.
///
/// Numeric targets use `as` casts: values outside the target range wrap for
/// integers and saturate for floats (`Int(300)` as `Int8` is 44, `Double(1e30)`
/// as `Int` is `i64::MAX`).
///
/// # Errors
///
/// Returns `InvalidCast` when a numeric target is requested for binary data
/// or for text that does not parse as a number.
pub(crate) fn render(value: &Value, target: BindType) -> Result<Vec<u8>, ErrorKind> {
    let bytes = match target {
        BindType::Nil => Vec::new(),
        BindType::Str => text(value),
        BindType::Bin => binary(value),
        BindType::Int => number(value)?.as_i64().to_ne_bytes().to_vec(),
        BindType::UInt => number(value)?.as_u64().to_ne_bytes().to_vec(),
        BindType::Int32 => (number(value)?.as_i64() as i32).to_ne_bytes().to_vec(),
        BindType::UInt32 => (number(value)?.as_u64() as u32).to_ne_bytes().to_vec(),
        BindType::Int16 => (number(value)?.as_i64() as i16).to_ne_bytes().to_vec(),
        BindType::UInt16 => (number(value)?.as_u64() as u16).to_ne_bytes().to_vec(),
        BindType::Int8 => (number(value)?.as_i64() as i8).to_ne_bytes().to_vec(),
        BindType::UInt8 => (number(value)?.as_u64() as u8).to_ne_bytes().to_vec(),
        BindType::Float => (number(value)?.as_f64() as f32).to_ne_bytes().to_vec(),
        BindType::Double => number(value)?.as_f64().to_ne_bytes().to_vec(),
    };
    Ok(bytes)
}

/// Range of a rendering of `total` bytes to copy for one call.
///
/// # Errors
///
/// Returns `InvalidBufferLength` when a fixed-width target does not fit in
/// `capacity` bytes.
pub(crate) fn chunk_range(
    total: usize,
    offset: usize,
    target: BindType,
    declared: Len,
    capacity: usize,
) -> Result<Range<usize>, ErrorKind> {
    match target.width() {
        Some(width) if capacity < width => Err(ErrorKind::InvalidBufferLength),
        Some(width) => Ok(0..width.min(total)),
        None if target == BindType::Nil => Ok(0..0),
        None => {
            let start = offset.min(total);
            let limit = usize::try_from(declared).unwrap_or(0).min(capacity);
            Ok(start..start.saturating_add(limit).min(total))
        }
    }
}

/// Diagnostic text for a conversion failure.
pub(crate) fn conversion_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidCast => "Invalid character value for cast specification",
        ErrorKind::InvalidBufferLength => "Invalid string or buffer length",
        ErrorKind::IndicatorRequired => "Indicator variable required but not supplied",
        _ => "Conversion failed",
    }
}

fn write_cells(dest: &[Cell<u8>], bytes: &[u8]) {
    for (cell, byte) in dest.iter().zip(bytes) {
        cell.set(*byte);
    }
}

/// Copy the current row into the bound output columns.
///
/// Returns true when at least one text or binary column was truncated.
pub(crate) fn deliver_row(
    handle: &dyn EngineStatement,
    outputs: &BindStore<'_>,
) -> Result<bool, ErrorKind> {
    let mut truncated = false;
    for (column, descriptor) in outputs.iter().enumerate().take(handle.column_count()) {
        if !descriptor.is_bound() {
            continue;
        }
        if handle.column_is_null(column) {
            match descriptor.indicator {
                Some(slot) => slot.set(NULL_DATA),
                None => return Err(ErrorKind::IndicatorRequired),
            }
            continue;
        }
        let Some(buffer) = descriptor.buffer else {
            if let Some(slot) = descriptor.indicator {
                slot.set(handle.column_len(column) as Len);
            }
            continue;
        };

        let rendered = render(&handle.column_value(column), descriptor.bind_type)?;
        let range = chunk_range(
            rendered.len(),
            0,
            descriptor.bind_type,
            descriptor.len,
            buffer.len(),
        )?;
        let written = range.len();
        write_cells(buffer, &rendered[range]);
        if let Some(slot) = descriptor.indicator {
            slot.set(written as Len);
        }
        if descriptor.bind_type.is_variable() && written < rendered.len() {
            truncated = true;
        }
    }
    Ok(truncated)
}
