//! Portable value representation.
//!
//! Every SQL value is reduced to one of two wire-level variants before it is
//! written to a backup container. SQL NULL is never a variant: a row holds
//! `None` in that position and codecs record it in a null bitmap.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Portable value: text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueVariant {
    Text(String),
    Binary(Vec<u8>),
}

impl ValueVariant {
    pub fn kind(&self) -> VariantKind {
        match self {
            ValueVariant::Text(_) => VariantKind::Text,
            ValueVariant::Binary(_) => VariantKind::Binary,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ValueVariant::Text(s) => Some(s),
            ValueVariant::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ValueVariant::Binary(b) => Some(b),
            ValueVariant::Text(_) => None,
        }
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            ValueVariant::Text(s) => s.is_empty(),
            ValueVariant::Binary(b) => b.is_empty(),
        }
    }
}

impl From<String> for ValueVariant {
    fn from(v: String) -> Self {
        ValueVariant::Text(v)
    }
}

impl From<&str> for ValueVariant {
    fn from(v: &str) -> Self {
        ValueVariant::Text(v.to_string())
    }
}

impl From<Vec<u8>> for ValueVariant {
    fn from(v: Vec<u8>) -> Self {
        ValueVariant::Binary(v)
    }
}

/// Which variant a column's values are framed as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    #[default]
    Text,
    Binary,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Text => "text",
            VariantKind::Binary => "binary",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Ok(VariantKind::Text),
            "binary" | "bytes" => Ok(VariantKind::Binary),
            other => Err(format!("unknown value kind '{}'", other)),
        }
    }
}

/// One record: a value or NULL per column, positionally aligned with the
/// row set's column list.
pub type Row = Vec<Option<ValueVariant>>;
