//! Column value access: the seam to the driver layer.
//!
//! A driver exposes each column of the current row through [`ColumnAccess`].
//! The transfer helpers read values through it on dump and write decoded
//! values back through it on load.

use std::collections::BTreeMap;

use chrono::{FixedOffset, Offset, Utc};

use crate::error::{MigrateError, Result};

use super::schema::Column;
use super::value::{SqlNullType, SqlValue};

/// String-keyed options passed to every value access. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueOptions {
    entries: BTreeMap<String, String>,
}

impl ValueOptions {
    /// Time zone applied to offset-aware timestamps (e.g. "+02:00", "UTC").
    pub const TIME_ZONE: &'static str = "time.zone";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Parsed value of [`Self::TIME_ZONE`], if set.
    pub fn time_zone(&self) -> Result<Option<FixedOffset>> {
        self.get(Self::TIME_ZONE).map(parse_time_zone).transpose()
    }
}

/// Parse "UTC", "Z" or a "+HH:MM" offset.
pub fn parse_time_zone(zone: &str) -> Result<FixedOffset> {
    let zone = zone.trim();
    if zone.eq_ignore_ascii_case("utc") || zone.eq_ignore_ascii_case("z") {
        return Ok(Utc.fix());
    }
    zone.parse::<FixedOffset>().map_err(|_| {
        MigrateError::Config(format!(
            "invalid time zone '{}': expected UTC or an offset like +02:00",
            zone
        ))
    })
}

/// Access to one column of the current row.
pub trait ColumnAccess {
    /// Column model for this position.
    fn column(&self) -> &Column;

    /// Read the current value; NULL is `SqlValue::Null`.
    fn get_value(&self, options: &ValueOptions) -> Result<SqlValue<'_>>;

    /// Store a value for insertion into the target.
    fn set_value(&mut self, value: SqlValue<'static>, options: &ValueOptions) -> Result<()>;
}

/// In-memory column cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub column: Column,
    pub value: SqlValue<'static>,
}

impl ColumnValue {
    pub fn new(column: Column, value: SqlValue<'static>) -> Self {
        Self { column, value }
    }

    /// A NULL cell typed for the column.
    pub fn null(column: Column) -> Self {
        let value = SqlValue::Null(SqlNullType::for_type_code(column.type_code));
        Self { column, value }
    }
}

impl ColumnAccess for ColumnValue {
    fn column(&self) -> &Column {
        &self.column
    }

    fn get_value(&self, _options: &ValueOptions) -> Result<SqlValue<'_>> {
        Ok(self.value.clone())
    }

    fn set_value(&mut self, value: SqlValue<'static>, _options: &ValueOptions) -> Result<()> {
        self.value = value;
        Ok(())
    }
}
