//! Value type dispatch between typed SQL values and portable variants.
//!
//! [`ValueDispatcher`] decides, from a column's SQL type code (and type name,
//! for YEAR columns), whether values travel as text or binary and how they are
//! rendered and parsed:
//!
//! | Type codes | Kind | Encode | Decode |
//! |---|---|---|---|
//! | BIT..DECIMAL, BOOLEAN, DATALINK | Text | canonical number/boolean text | typed parse, empty is NULL |
//! | CHAR family, NCHAR family, CLOB, NCLOB | Text | unchanged | unchanged, empty kept |
//! | SQLXML | Text | unchanged | unchanged, empty is NULL |
//! | BINARY, VARBINARY, LONGVARBINARY, BLOB, ROWID | Binary | raw bytes | raw bytes, empty is NULL |
//! | OTHER, JAVA_OBJECT, STRUCT, REF | Binary | [`ObjectCodec`] | [`ObjectCodec`] |
//! | DATE | Text | `yyyy-MM-dd`, or `yyyy` for YEAR | date, then year |
//! | TIME | Text | `HH:mm:ss` | `HH:mm:ss` only |
//! | TIMESTAMP | Text | `yyyy-MM-dd HH:mm:ss[.f]` | timestamp, then date, then year |
//!
//! Anything else fails with [`MigrateError::UnsupportedType`]. A value that
//! does not parse fails with [`MigrateError::MalformedValue`]; no default is
//! ever substituted.

mod object;
mod temporal;

pub use object::{ObjectCodec, RawObjectCodec, TextObjectCodec};

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;

use crate::core::{
    Column, SqlNullType, SqlTypeCode, SqlValue, ValueOptions, ValueVariant, VariantKind,
};
use crate::error::{MigrateError, Result};

use temporal::{EXPECTED_DATE, EXPECTED_TIME, EXPECTED_TIMESTAMP};

/// Numeric parse target for a text-framed numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numeric {
    Bool,
    Small,
    Int,
    Big,
    Real,
    Double,
    Decimal,
    DataLink,
}

/// Dispatch rule selected for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Numeric(Numeric),
    Text { empty_is_null: bool },
    Binary,
    Object,
    Date,
    Time,
    Timestamp,
}

impl Rule {
    fn kind(self) -> VariantKind {
        match self {
            Rule::Binary | Rule::Object => VariantKind::Binary,
            _ => VariantKind::Text,
        }
    }
}

fn rule_for(column: &Column) -> Result<Rule> {
    let rule = match column.type_code {
        SqlTypeCode::Bit | SqlTypeCode::Boolean => Rule::Numeric(Numeric::Bool),
        SqlTypeCode::TinyInt | SqlTypeCode::SmallInt => Rule::Numeric(Numeric::Small),
        SqlTypeCode::Integer => Rule::Numeric(Numeric::Int),
        SqlTypeCode::BigInt => Rule::Numeric(Numeric::Big),
        SqlTypeCode::Real => Rule::Numeric(Numeric::Real),
        SqlTypeCode::Float | SqlTypeCode::Double => Rule::Numeric(Numeric::Double),
        SqlTypeCode::Numeric | SqlTypeCode::Decimal => Rule::Numeric(Numeric::Decimal),
        SqlTypeCode::DataLink => Rule::Numeric(Numeric::DataLink),
        SqlTypeCode::Char
        | SqlTypeCode::VarChar
        | SqlTypeCode::LongVarChar
        | SqlTypeCode::NChar
        | SqlTypeCode::NVarChar
        | SqlTypeCode::LongNVarChar
        | SqlTypeCode::Clob
        | SqlTypeCode::NClob => Rule::Text {
            empty_is_null: false,
        },
        SqlTypeCode::SqlXml => Rule::Text {
            empty_is_null: true,
        },
        SqlTypeCode::Binary
        | SqlTypeCode::VarBinary
        | SqlTypeCode::LongVarBinary
        | SqlTypeCode::Blob
        | SqlTypeCode::RowId => Rule::Binary,
        SqlTypeCode::Other | SqlTypeCode::JavaObject | SqlTypeCode::Struct | SqlTypeCode::Ref => {
            Rule::Object
        }
        SqlTypeCode::Date => Rule::Date,
        SqlTypeCode::Time => Rule::Time,
        SqlTypeCode::Timestamp => Rule::Timestamp,
        _ => return Err(unsupported(column)),
    };
    Ok(rule)
}

fn unsupported(column: &Column) -> MigrateError {
    MigrateError::UnsupportedType {
        table: column.table.clone(),
        column: column.name.clone(),
        type_code: column.type_code.code(),
        type_name: column.type_name.clone(),
    }
}

fn malformed(column: &Column, expected: &str, raw: &str) -> MigrateError {
    MigrateError::malformed(&column.table, &column.name, expected, raw)
}

/// Converts typed column values to portable variants and back.
///
/// Stateless apart from the injected object codec, so one instance can be
/// shared across worker threads.
#[derive(Debug, Clone)]
pub struct ValueDispatcher {
    object_codec: Arc<dyn ObjectCodec>,
}

impl Default for ValueDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueDispatcher {
    /// Dispatcher that passes object bytes through unchanged.
    pub fn new() -> Self {
        Self {
            object_codec: Arc::new(RawObjectCodec),
        }
    }

    pub fn with_object_codec(object_codec: Arc<dyn ObjectCodec>) -> Self {
        Self { object_codec }
    }

    /// Which variant values of this column are framed as.
    pub fn classify(&self, column: &Column) -> Result<VariantKind> {
        rule_for(column).map(Rule::kind)
    }

    /// Reduce a typed value to a portable variant; NULL yields `None`.
    pub fn to_variant(
        &self,
        value: &SqlValue<'_>,
        column: &Column,
        options: &ValueOptions,
    ) -> Result<Option<ValueVariant>> {
        let rule = rule_for(column)?;
        if value.is_null() {
            return Ok(None);
        }
        let variant = match rule {
            Rule::Numeric(Numeric::DataLink) | Rule::Text { .. } => {
                ValueVariant::Text(render_text(value, column, options)?)
            }
            Rule::Numeric(_) => ValueVariant::Text(render_numeric(value, column)?),
            Rule::Binary => ValueVariant::Binary(render_bytes(value, column)?),
            Rule::Object => ValueVariant::Binary(self.object_codec.encode(value, column)?),
            Rule::Date => ValueVariant::Text(render_date(value, column, options)?),
            Rule::Time => ValueVariant::Text(render_time(value, column, options)?),
            Rule::Timestamp => ValueVariant::Text(render_timestamp(value, column, options)?),
        };
        Ok(Some(variant))
    }

    /// Rebuild a typed value from a variant; `None` yields a typed NULL.
    pub fn from_variant(
        &self,
        variant: Option<&ValueVariant>,
        column: &Column,
        _options: &ValueOptions,
    ) -> Result<SqlValue<'static>> {
        let rule = rule_for(column)?;
        let null = SqlValue::Null(SqlNullType::for_type_code(column.type_code));
        let Some(variant) = variant else {
            return Ok(null);
        };

        match rule {
            Rule::Binary => {
                let bytes = expect_binary(variant, column)?;
                if bytes.is_empty() {
                    return Ok(null);
                }
                Ok(SqlValue::bytes_owned(bytes.to_vec()))
            }
            Rule::Object => {
                let bytes = expect_binary(variant, column)?;
                self.object_codec.decode(bytes, column)
            }
            Rule::Text { empty_is_null } => {
                let text = expect_text(variant, column)?;
                if empty_is_null && text.is_empty() {
                    return Ok(null);
                }
                Ok(SqlValue::text_owned(text))
            }
            Rule::Numeric(numeric) => {
                let text = expect_text(variant, column)?;
                if text.is_empty() {
                    return Ok(null);
                }
                parse_numeric(numeric, text, column)
            }
            Rule::Date => {
                let text = expect_text(variant, column)?;
                if text.is_empty() {
                    return Ok(null);
                }
                temporal::parse_date_or_year(text)
                    .map(SqlValue::Date)
                    .ok_or_else(|| malformed(column, EXPECTED_DATE, text))
            }
            Rule::Time => {
                let text = expect_text(variant, column)?;
                if text.is_empty() {
                    return Ok(null);
                }
                temporal::parse_time(text)
                    .map(SqlValue::Time)
                    .ok_or_else(|| malformed(column, EXPECTED_TIME, text))
            }
            Rule::Timestamp => {
                let text = expect_text(variant, column)?;
                if text.is_empty() {
                    return Ok(null);
                }
                temporal::parse_timestamp_lenient(text)
                    .map(SqlValue::DateTime)
                    .ok_or_else(|| malformed(column, EXPECTED_TIMESTAMP, text))
            }
        }
    }
}

fn expect_text<'v>(variant: &'v ValueVariant, column: &Column) -> Result<&'v str> {
    variant
        .as_text()
        .ok_or_else(|| malformed(column, "text variant", "<binary>"))
}

fn expect_binary<'v>(variant: &'v ValueVariant, column: &Column) -> Result<&'v [u8]> {
    match variant {
        ValueVariant::Binary(b) => Ok(b.as_slice()),
        ValueVariant::Text(s) => Err(malformed(column, "binary variant", s)),
    }
}

/// Canonical text of a numeric or boolean value.
fn numeric_text(value: &SqlValue<'_>) -> Option<String> {
    match value {
        SqlValue::Bool(v) => Some(v.to_string()),
        SqlValue::I16(v) => Some(v.to_string()),
        SqlValue::I32(v) => Some(v.to_string()),
        SqlValue::I64(v) => Some(v.to_string()),
        SqlValue::F32(v) => Some(v.to_string()),
        SqlValue::F64(v) => Some(v.to_string()),
        SqlValue::Decimal(v) => Some(v.to_string()),
        _ => None,
    }
}

fn render_numeric(value: &SqlValue<'_>, column: &Column) -> Result<String> {
    if let SqlValue::Text(s) = value {
        return Ok(s.to_string());
    }
    numeric_text(value).ok_or_else(|| malformed(column, "numeric value", value.kind_name()))
}

fn render_text(value: &SqlValue<'_>, column: &Column, options: &ValueOptions) -> Result<String> {
    match value {
        SqlValue::Text(s) => Ok(s.to_string()),
        SqlValue::Uuid(u) => Ok(u.hyphenated().to_string()),
        SqlValue::Bytes(b) => std::str::from_utf8(b)
            .map(str::to_string)
            .map_err(|_| malformed(column, "UTF-8 text", &String::from_utf8_lossy(b))),
        SqlValue::Date(d) => Ok(temporal::format_date(d)),
        SqlValue::Time(t) => Ok(temporal::format_time(t)),
        SqlValue::DateTime(_) | SqlValue::DateTimeOffset(_) => {
            render_timestamp(value, column, options)
        }
        other => numeric_text(other)
            .ok_or_else(|| malformed(column, "text value", other.kind_name())),
    }
}

fn render_bytes(value: &SqlValue<'_>, column: &Column) -> Result<Vec<u8>> {
    match value {
        SqlValue::Bytes(b) => Ok(b.to_vec()),
        SqlValue::Text(s) => Ok(s.as_bytes().to_vec()),
        SqlValue::Uuid(u) => Ok(u.as_bytes().to_vec()),
        other => Err(malformed(column, "binary value", other.kind_name())),
    }
}

/// Shift an offset-aware timestamp into the configured zone, or keep its own.
fn local_timestamp(ts: &DateTime<FixedOffset>, options: &ValueOptions) -> Result<NaiveDateTime> {
    Ok(match options.time_zone()? {
        Some(zone) => ts.with_timezone(&zone).naive_local(),
        None => ts.naive_local(),
    })
}

fn render_date(value: &SqlValue<'_>, column: &Column, options: &ValueOptions) -> Result<String> {
    let year_only = temporal::is_year_type(&column.type_name);
    let date = match value {
        SqlValue::Date(d) => *d,
        SqlValue::DateTime(ts) => ts.date(),
        SqlValue::DateTimeOffset(ts) => local_timestamp(ts, options)?.date(),
        SqlValue::I16(y) if year_only => return Ok(temporal::format_year(i32::from(*y))),
        SqlValue::I32(y) if year_only => return Ok(temporal::format_year(*y)),
        SqlValue::Text(s) => return Ok(s.to_string()),
        other => return Err(malformed(column, EXPECTED_DATE, other.kind_name())),
    };
    if year_only {
        Ok(temporal::format_year(chrono::Datelike::year(&date)))
    } else {
        Ok(temporal::format_date(&date))
    }
}

fn render_time(value: &SqlValue<'_>, column: &Column, options: &ValueOptions) -> Result<String> {
    match value {
        SqlValue::Time(t) => Ok(temporal::format_time(t)),
        SqlValue::DateTime(ts) => Ok(temporal::format_time(&ts.time())),
        SqlValue::DateTimeOffset(ts) => Ok(temporal::format_time(&local_timestamp(ts, options)?.time())),
        SqlValue::Text(s) => Ok(s.to_string()),
        other => Err(malformed(column, EXPECTED_TIME, other.kind_name())),
    }
}

fn render_timestamp(
    value: &SqlValue<'_>,
    column: &Column,
    options: &ValueOptions,
) -> Result<String> {
    match value {
        SqlValue::DateTime(ts) => Ok(temporal::format_timestamp(ts)),
        SqlValue::DateTimeOffset(ts) => Ok(temporal::format_timestamp(&local_timestamp(ts, options)?)),
        SqlValue::Date(d) => match d.and_hms_opt(0, 0, 0) {
            Some(ts) => Ok(temporal::format_timestamp(&ts)),
            None => Err(malformed(column, EXPECTED_TIMESTAMP, &d.to_string())),
        },
        SqlValue::Text(s) => Ok(s.to_string()),
        other => Err(malformed(column, EXPECTED_TIMESTAMP, other.kind_name())),
    }
}

fn parse_numeric(numeric: Numeric, text: &str, column: &Column) -> Result<SqlValue<'static>> {
    match numeric {
        Numeric::Bool => parse_bool(text)
            .map(SqlValue::Bool)
            .ok_or_else(|| malformed(column, "boolean as true, false, 1 or 0", text)),
        Numeric::Small => text
            .parse::<i16>()
            .map(SqlValue::I16)
            .map_err(|_| malformed(column, "16-bit integer", text)),
        Numeric::Int => text
            .parse::<i32>()
            .map(SqlValue::I32)
            .map_err(|_| malformed(column, "32-bit integer", text)),
        Numeric::Big => text
            .parse::<i64>()
            .map(SqlValue::I64)
            .map_err(|_| malformed(column, "64-bit integer", text)),
        Numeric::Real => text
            .parse::<f32>()
            .map(SqlValue::F32)
            .map_err(|_| malformed(column, "single-precision number", text)),
        Numeric::Double => text
            .parse::<f64>()
            .map(SqlValue::F64)
            .map_err(|_| malformed(column, "double-precision number", text)),
        Numeric::Decimal => match Decimal::from_str_exact(text) {
            Ok(d) => Ok(SqlValue::Decimal(d)),
            // Beyond 28 digits: keep the exact text rather than round.
            Err(_) if is_decimal_literal(text) => Ok(SqlValue::text_owned(text)),
            Err(_) => Err(malformed(column, "decimal number", text)),
        },
        Numeric::DataLink => Ok(SqlValue::text_owned(text)),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

/// `[+-]digits[.digits][(e|E)[+-]digits]`, with at least one mantissa digit.
fn is_decimal_literal(text: &str) -> bool {
    let s = text.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(text);
    let (mantissa, exponent) = match s.find(|c: char| c == 'e' || c == 'E') {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return false;
    }
    if !digits(int_part) || !digits(frac_part) {
        return false;
    }
    match exponent {
        None => true,
        Some(e) => {
            let e = e.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(e);
            !e.is_empty() && digits(e)
        }
    }
}

impl FromStr for ValueDispatcher {
    type Err = MigrateError;

    /// Build a dispatcher by object codec name: "raw" or "text".
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "raw" | "bytes" => Ok(Self::new()),
            "text" | "string" => Ok(Self::with_object_codec(Arc::new(TextObjectCodec))),
            other => Err(MigrateError::Config(format!(
                "Unknown object codec: '{}'. Supported codecs: raw, text",
                other
            ))),
        }
    }
}
