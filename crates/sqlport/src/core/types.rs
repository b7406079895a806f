//! SQL type codes as reported by database drivers.
//!
//! The numeric codes follow the JDBC `java.sql.Types` table, which is what
//! every driver-level column metadata source reports, regardless of vendor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generic SQL type code of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum SqlTypeCode {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    VarChar,
    LongVarChar,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Null,
    Other,
    JavaObject,
    Distinct,
    Struct,
    Array,
    Blob,
    Clob,
    Ref,
    DataLink,
    Boolean,
    RowId,
    NChar,
    NVarChar,
    LongNVarChar,
    NClob,
    SqlXml,
    RefCursor,
    TimeWithTimezone,
    TimestampWithTimezone,
    /// A vendor code outside the standard table.
    Unrecognized(i32),
}

impl SqlTypeCode {
    /// Map a numeric type code to its variant.
    pub fn from_code(code: i32) -> Self {
        match code {
            -7 => SqlTypeCode::Bit,
            -6 => SqlTypeCode::TinyInt,
            5 => SqlTypeCode::SmallInt,
            4 => SqlTypeCode::Integer,
            -5 => SqlTypeCode::BigInt,
            6 => SqlTypeCode::Float,
            7 => SqlTypeCode::Real,
            8 => SqlTypeCode::Double,
            2 => SqlTypeCode::Numeric,
            3 => SqlTypeCode::Decimal,
            1 => SqlTypeCode::Char,
            12 => SqlTypeCode::VarChar,
            -1 => SqlTypeCode::LongVarChar,
            91 => SqlTypeCode::Date,
            92 => SqlTypeCode::Time,
            93 => SqlTypeCode::Timestamp,
            -2 => SqlTypeCode::Binary,
            -3 => SqlTypeCode::VarBinary,
            -4 => SqlTypeCode::LongVarBinary,
            0 => SqlTypeCode::Null,
            1111 => SqlTypeCode::Other,
            2000 => SqlTypeCode::JavaObject,
            2001 => SqlTypeCode::Distinct,
            2002 => SqlTypeCode::Struct,
            2003 => SqlTypeCode::Array,
            2004 => SqlTypeCode::Blob,
            2005 => SqlTypeCode::Clob,
            2006 => SqlTypeCode::Ref,
            70 => SqlTypeCode::DataLink,
            16 => SqlTypeCode::Boolean,
            -8 => SqlTypeCode::RowId,
            -15 => SqlTypeCode::NChar,
            -9 => SqlTypeCode::NVarChar,
            -16 => SqlTypeCode::LongNVarChar,
            2011 => SqlTypeCode::NClob,
            2009 => SqlTypeCode::SqlXml,
            2012 => SqlTypeCode::RefCursor,
            2013 => SqlTypeCode::TimeWithTimezone,
            2014 => SqlTypeCode::TimestampWithTimezone,
            other => SqlTypeCode::Unrecognized(other),
        }
    }

    /// The numeric type code.
    pub fn code(self) -> i32 {
        match self {
            SqlTypeCode::Bit => -7,
            SqlTypeCode::TinyInt => -6,
            SqlTypeCode::SmallInt => 5,
            SqlTypeCode::Integer => 4,
            SqlTypeCode::BigInt => -5,
            SqlTypeCode::Float => 6,
            SqlTypeCode::Real => 7,
            SqlTypeCode::Double => 8,
            SqlTypeCode::Numeric => 2,
            SqlTypeCode::Decimal => 3,
            SqlTypeCode::Char => 1,
            SqlTypeCode::VarChar => 12,
            SqlTypeCode::LongVarChar => -1,
            SqlTypeCode::Date => 91,
            SqlTypeCode::Time => 92,
            SqlTypeCode::Timestamp => 93,
            SqlTypeCode::Binary => -2,
            SqlTypeCode::VarBinary => -3,
            SqlTypeCode::LongVarBinary => -4,
            SqlTypeCode::Null => 0,
            SqlTypeCode::Other => 1111,
            SqlTypeCode::JavaObject => 2000,
            SqlTypeCode::Distinct => 2001,
            SqlTypeCode::Struct => 2002,
            SqlTypeCode::Array => 2003,
            SqlTypeCode::Blob => 2004,
            SqlTypeCode::Clob => 2005,
            SqlTypeCode::Ref => 2006,
            SqlTypeCode::DataLink => 70,
            SqlTypeCode::Boolean => 16,
            SqlTypeCode::RowId => -8,
            SqlTypeCode::NChar => -15,
            SqlTypeCode::NVarChar => -9,
            SqlTypeCode::LongNVarChar => -16,
            SqlTypeCode::NClob => 2011,
            SqlTypeCode::SqlXml => 2009,
            SqlTypeCode::RefCursor => 2012,
            SqlTypeCode::TimeWithTimezone => 2013,
            SqlTypeCode::TimestampWithTimezone => 2014,
            SqlTypeCode::Unrecognized(code) => code,
        }
    }
}

impl From<i32> for SqlTypeCode {
    fn from(code: i32) -> Self {
        SqlTypeCode::from_code(code)
    }
}

impl From<SqlTypeCode> for i32 {
    fn from(code: SqlTypeCode) -> Self {
        code.code()
    }
}

impl fmt::Display for SqlTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
