//! Pluggable codecs for user-defined, REF and opaque object values.

use std::fmt;

use crate::core::{Column, SqlValue};
use crate::error::{MigrateError, Result};

/// Converts OTHER/JAVA_OBJECT/STRUCT/REF values to and from bytes.
pub trait ObjectCodec: Send + Sync + fmt::Debug {
    fn encode(&self, value: &SqlValue<'_>, column: &Column) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8], column: &Column) -> Result<SqlValue<'static>>;
}

/// Passes driver-serialized object bytes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawObjectCodec;

impl ObjectCodec for RawObjectCodec {
    fn encode(&self, value: &SqlValue<'_>, column: &Column) -> Result<Vec<u8>> {
        match value {
            SqlValue::Bytes(b) => Ok(b.to_vec()),
            SqlValue::Text(s) => Ok(s.as_bytes().to_vec()),
            SqlValue::Uuid(u) => Ok(u.as_bytes().to_vec()),
            other => Err(MigrateError::malformed(
                &column.table,
                &column.name,
                "serialized object bytes",
                other.kind_name(),
            )),
        }
    }

    fn decode(&self, bytes: &[u8], _column: &Column) -> Result<SqlValue<'static>> {
        Ok(SqlValue::bytes_owned(bytes.to_vec()))
    }
}

/// Stores objects by their text form (json, uuid, interval and similar
/// vendor types that accept a string on insert).
#[derive(Debug, Clone, Copy, Default)]
pub struct TextObjectCodec;

impl ObjectCodec for TextObjectCodec {
    fn encode(&self, value: &SqlValue<'_>, column: &Column) -> Result<Vec<u8>> {
        match value {
            SqlValue::Text(s) => Ok(s.as_bytes().to_vec()),
            SqlValue::Uuid(u) => Ok(u.hyphenated().to_string().into_bytes()),
            SqlValue::Bytes(b) => Ok(b.to_vec()),
            other => Err(MigrateError::malformed(
                &column.table,
                &column.name,
                "object text",
                other.kind_name(),
            )),
        }
    }

    fn decode(&self, bytes: &[u8], column: &Column) -> Result<SqlValue<'static>> {
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(SqlValue::text_owned(s)),
            Err(_) => Err(MigrateError::malformed(
                &column.table,
                &column.name,
                "UTF-8 object text",
                &String::from_utf8_lossy(bytes),
            )),
        }
    }
}
