//! Type mapping between host buffer types, bind types, and engine row types.

use super::Len;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host (C) buffer type tag as exposed by the client API.
///
/// Codes follow the ODBC `SQL_C_*` constants. Codes the driver does not know
/// are kept as `Other` so they can be reported as an invalid buffer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    Char,
    WChar,
    Binary,
    Double,
    Float,
    SBigInt,
    UBigInt,
    SShort,
    UShort,
    Short,
    Long,
    SLong,
    ULong,
    STinyInt,
    UTinyInt,
    TinyInt,
    Bit,
    Numeric,
    Date,
    Time,
    Timestamp,
    Guid,
    /// Take the type from the column (`SQL_C_DEFAULT`)
    Default,
    Other(i16),
}

impl HostType {
    /// The `SQL_C_*` code of this type.
    pub fn code(self) -> i16 {
        match self {
            HostType::Char => 1,
            HostType::WChar => -8,
            HostType::Binary => -2,
            HostType::Double => 8,
            HostType::Float => 7,
            HostType::SBigInt => -25,
            HostType::UBigInt => -27,
            HostType::SShort => -15,
            HostType::UShort => -17,
            HostType::Short => 5,
            HostType::Long => 4,
            HostType::SLong => -16,
            HostType::ULong => -18,
            HostType::STinyInt => -26,
            HostType::UTinyInt => -28,
            HostType::TinyInt => -6,
            HostType::Bit => -7,
            HostType::Numeric => 2,
            HostType::Date => 91,
            HostType::Time => 92,
            HostType::Timestamp => 93,
            HostType::Guid => -11,
            HostType::Default => 99,
            HostType::Other(code) => code,
        }
    }
}

impl From<i16> for HostType {
    fn from(code: i16) -> Self {
        match code {
            1 => HostType::Char,
            -8 => HostType::WChar,
            -2 => HostType::Binary,
            8 => HostType::Double,
            7 => HostType::Float,
            -25 => HostType::SBigInt,
            -27 => HostType::UBigInt,
            -15 => HostType::SShort,
            -17 => HostType::UShort,
            5 => HostType::Short,
            4 => HostType::Long,
            -16 => HostType::SLong,
            -18 => HostType::ULong,
            -26 => HostType::STinyInt,
            -28 => HostType::UTinyInt,
            -6 => HostType::TinyInt,
            -7 => HostType::Bit,
            2 => HostType::Numeric,
            91 => HostType::Date,
            92 => HostType::Time,
            93 => HostType::Timestamp,
            -11 => HostType::Guid,
            99 => HostType::Default,
            other => HostType::Other(other),
        }
    }
}

/// Value type of a bind descriptor.
///
/// The engine-native types plus the fixed-width integer variants produced by
/// size-based narrowing. The zeroed descriptor has type `Nil`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindType {
    #[default]
    Nil,
    Int,
    UInt,
    Str,
    Bin,
    Float,
    Double,
    Int32,
    UInt32,
    Int16,
    UInt16,
    Int8,
    UInt8,
}

impl BindType {
    /// Byte width of fixed-width types; `None` for text, binary and nil.
    pub fn width(self) -> Option<usize> {
        match self {
            BindType::Int | BindType::UInt | BindType::Double => Some(8),
            BindType::Int32 | BindType::UInt32 | BindType::Float => Some(4),
            BindType::Int16 | BindType::UInt16 => Some(2),
            BindType::Int8 | BindType::UInt8 => Some(1),
            BindType::Nil | BindType::Str | BindType::Bin => None,
        }
    }

    /// Text or binary.
    pub fn is_variable(self) -> bool {
        matches!(self, BindType::Str | BindType::Bin)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BindType::UInt | BindType::UInt32 | BindType::UInt16 | BindType::UInt8
        )
    }
}

/// Column value type as reported by the query engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowType {
    Nil,
    Boolean,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "uint")]
    Unsigned,
    #[serde(alias = "str", alias = "text")]
    String,
    #[serde(alias = "bin")]
    Binary,
    Float,
    Double,
    Array,
    Map,
    Ext,
}

impl RowType {
    pub fn is_variable(self) -> bool {
        matches!(self, RowType::String | RowType::Binary)
    }
}

/// SQL data type exposed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    BigInt,
    Varchar,
    Real,
    Double,
    Binary,
}

impl SqlType {
    /// The `SQL_*` type code.
    pub fn code(self) -> i16 {
        match self {
            SqlType::BigInt => -5,
            SqlType::Varchar => 12,
            SqlType::Real => 7,
            SqlType::Double => 8,
            SqlType::Binary => -2,
        }
    }

    /// Canonical type name.
    pub fn name(self) -> &'static str {
        match self {
            SqlType::BigInt => "BIGINT",
            SqlType::Varchar => "VARCHAR",
            SqlType::Real => "REAL",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Binary => "BINARY",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type coercion between the host, bind, and row type systems.
pub struct TypeMapper;

impl TypeMapper {
    /// Map a host buffer type to a bind type.
    ///
    /// Returns `None` for host types without a mapping, including `Default`;
    /// callers decide whether default typing is allowed.
    pub fn host_to_bind(host: HostType) -> Option<BindType> {
        match host {
            HostType::Char => Some(BindType::Str),
            HostType::Binary => Some(BindType::Bin),
            HostType::Double => Some(BindType::Double),
            HostType::Float => Some(BindType::Float),
            HostType::SBigInt => Some(BindType::Int),
            HostType::UBigInt => Some(BindType::UInt),
            HostType::SShort | HostType::Short => Some(BindType::Int16),
            HostType::UShort => Some(BindType::UInt16),
            HostType::Long | HostType::SLong => Some(BindType::Int32),
            HostType::ULong => Some(BindType::UInt32),
            _ => None,
        }
    }

    /// Bind type matching a column's own storage type.
    pub fn row_to_bind(row: RowType) -> BindType {
        match row {
            RowType::Nil => BindType::Nil,
            RowType::Integer | RowType::Boolean => BindType::Int,
            RowType::Unsigned => BindType::UInt,
            RowType::Binary => BindType::Bin,
            RowType::Float => BindType::Float,
            RowType::Double => BindType::Double,
            RowType::String | RowType::Array | RowType::Map | RowType::Ext => BindType::Str,
        }
    }

    /// Resolve the bind type for an output or get-data request.
    ///
    /// `Default` takes the column's type when it is known and falls back to
    /// text when the result shape is not known yet.
    pub fn resolve_output(host: HostType, column: Option<RowType>) -> Option<BindType> {
        match Self::host_to_bind(host) {
            Some(bind) => Some(bind),
            None if host == HostType::Default => {
                Some(column.map(Self::row_to_bind).unwrap_or(BindType::Str))
            }
            None => None,
        }
    }

    /// SQL type exposed for a row type. Unknown types are reported as text.
    pub fn row_to_sql(row: RowType) -> SqlType {
        match row {
            RowType::Integer | RowType::Unsigned => SqlType::BigInt,
            RowType::String => SqlType::Varchar,
            RowType::Float => SqlType::Real,
            RowType::Double => SqlType::Double,
            RowType::Binary => SqlType::Binary,
            _ => SqlType::Varchar,
        }
    }

    /// Canonical type name for a row type.
    pub fn row_type_name(row: RowType) -> &'static str {
        Self::row_to_sql(row).name()
    }

    /// Narrow a bind type to the width the buffer actually has.
    ///
    /// Integers shrink to the 32/16/8-bit variant matching `len`; floating
    /// types become `Double` or `Float` by width, or `Nil` with zero length
    /// when `len` is below the single-precision width.
    pub fn narrow(bind: BindType, len: Len) -> (BindType, Len) {
        match bind {
            BindType::Int | BindType::UInt => {
                let unsigned = bind == BindType::UInt;
                let narrowed = match len {
                    4 if unsigned => BindType::UInt32,
                    4 => BindType::Int32,
                    2 if unsigned => BindType::UInt16,
                    2 => BindType::Int16,
                    1 if unsigned => BindType::UInt8,
                    1 => BindType::Int8,
                    _ => bind,
                };
                (narrowed, len)
            }
            BindType::Double | BindType::Float => {
                let mut narrowed = (bind, len);
                // First match wins: the double-width check runs before the float checks.
                if len == 8 {
                    narrowed.0 = BindType::Double;
                }
                if len == 4 {
                    narrowed.0 = BindType::Float;
                } else if len < 4 {
                    narrowed = (BindType::Nil, 0);
                }
                narrowed
            }
            _ => (bind, len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_code_round_trip() {
        for code in [1i16, -2, 8, 7, -25, -27, -15, -17, 5, 4, -16, -18, 99, 91] {
            assert_eq!(HostType::from(code).code(), code);
        }
        assert_eq!(HostType::from(1234), HostType::Other(1234));
    }

    #[test]
    fn test_host_to_bind_mapping() {
        assert_eq!(TypeMapper::host_to_bind(HostType::Char), Some(BindType::Str));
        assert_eq!(TypeMapper::host_to_bind(HostType::Binary), Some(BindType::Bin));
        assert_eq!(TypeMapper::host_to_bind(HostType::SBigInt), Some(BindType::Int));
        assert_eq!(TypeMapper::host_to_bind(HostType::UBigInt), Some(BindType::UInt));
        assert_eq!(TypeMapper::host_to_bind(HostType::Short), Some(BindType::Int16));
        assert_eq!(TypeMapper::host_to_bind(HostType::ULong), Some(BindType::UInt32));
        assert_eq!(TypeMapper::host_to_bind(HostType::Float), Some(BindType::Float));
    }

    #[test]
    fn test_host_without_mapping() {
        assert_eq!(TypeMapper::host_to_bind(HostType::Date), None);
        assert_eq!(TypeMapper::host_to_bind(HostType::Default), None);
        assert_eq!(TypeMapper::host_to_bind(HostType::Other(-99)), None);
    }

    #[test]
    fn test_resolve_output_default() {
        assert_eq!(
            TypeMapper::resolve_output(HostType::Default, None),
            Some(BindType::Str)
        );
        assert_eq!(
            TypeMapper::resolve_output(HostType::Default, Some(RowType::Double)),
            Some(BindType::Double)
        );
        assert_eq!(
            TypeMapper::resolve_output(HostType::SBigInt, Some(RowType::String)),
            Some(BindType::Int)
        );
        assert_eq!(TypeMapper::resolve_output(HostType::Guid, None), None);
    }

    #[test]
    fn test_row_to_sql_mapping() {
        assert_eq!(TypeMapper::row_to_sql(RowType::Integer), SqlType::BigInt);
        assert_eq!(TypeMapper::row_to_sql(RowType::Unsigned), SqlType::BigInt);
        assert_eq!(TypeMapper::row_to_sql(RowType::String), SqlType::Varchar);
        assert_eq!(TypeMapper::row_to_sql(RowType::Float), SqlType::Real);
        assert_eq!(TypeMapper::row_to_sql(RowType::Double), SqlType::Double);
        assert_eq!(TypeMapper::row_to_sql(RowType::Binary), SqlType::Binary);
        assert_eq!(TypeMapper::row_to_sql(RowType::Map), SqlType::Varchar);
        assert_eq!(TypeMapper::row_to_sql(RowType::Boolean), SqlType::Varchar);
    }

    #[test]
    fn test_row_type_names() {
        assert_eq!(TypeMapper::row_type_name(RowType::Integer), "BIGINT");
        assert_eq!(TypeMapper::row_type_name(RowType::Double), "DOUBLE PRECISION");
        assert_eq!(TypeMapper::row_type_name(RowType::Nil), "VARCHAR");
        assert_eq!(SqlType::Real.code(), 7);
    }

    #[test]
    fn test_narrow_integers() {
        assert_eq!(TypeMapper::narrow(BindType::Int, 2), (BindType::Int16, 2));
        assert_eq!(TypeMapper::narrow(BindType::Int, 1), (BindType::Int8, 1));
        assert_eq!(TypeMapper::narrow(BindType::Int, 4), (BindType::Int32, 4));
        assert_eq!(TypeMapper::narrow(BindType::UInt, 2), (BindType::UInt16, 2));
        assert_eq!(TypeMapper::narrow(BindType::UInt, 1), (BindType::UInt8, 1));
        assert_eq!(TypeMapper::narrow(BindType::Int, 8), (BindType::Int, 8));
        assert_eq!(TypeMapper::narrow(BindType::Int, 3), (BindType::Int, 3));
        assert_eq!(TypeMapper::narrow(BindType::Int, 0), (BindType::Int, 0));
    }

    #[test]
    fn test_narrow_floats() {
        assert_eq!(TypeMapper::narrow(BindType::Float, 8), (BindType::Double, 8));
        assert_eq!(TypeMapper::narrow(BindType::Double, 4), (BindType::Float, 4));
        assert_eq!(TypeMapper::narrow(BindType::Double, 3), (BindType::Nil, 0));
        assert_eq!(TypeMapper::narrow(BindType::Float, 0), (BindType::Nil, 0));
        assert_eq!(TypeMapper::narrow(BindType::Double, 16), (BindType::Double, 16));
    }

    #[test]
    fn test_narrow_leaves_variable_types() {
        assert_eq!(TypeMapper::narrow(BindType::Str, 1), (BindType::Str, 1));
        assert_eq!(TypeMapper::narrow(BindType::Bin, 0), (BindType::Bin, 0));
    }

    #[test]
    fn test_row_type_deserialize() {
        let t: RowType = serde_json::from_str("\"integer\"").unwrap();
        assert_eq!(t, RowType::Integer);
        let t: RowType = serde_json::from_str("\"str\"").unwrap();
        assert_eq!(t, RowType::String);
    }
}
