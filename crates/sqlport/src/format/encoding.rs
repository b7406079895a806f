//! Hex and base64 text encodings for binary values embedded in text formats.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Text encoding of binary column bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryEncoding {
    /// RFC 4648 standard alphabet, padded.
    #[default]
    Base64,
    /// Lowercase on write, either case on read.
    Hex,
}

impl BinaryEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryEncoding::Base64 => "base64",
            BinaryEncoding::Hex => "hex",
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            BinaryEncoding::Base64 => STANDARD.encode(bytes),
            BinaryEncoding::Hex => hex::encode(bytes),
        }
    }

    /// Decode text; surrounding whitespace is ignored.
    pub fn decode(&self, text: &str) -> std::result::Result<Vec<u8>, String> {
        let text = text.trim();
        match self {
            BinaryEncoding::Base64 => STANDARD.decode(text).map_err(|e| e.to_string()),
            BinaryEncoding::Hex => hex::decode(text).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for BinaryEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BinaryEncoding {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "base64" => Ok(BinaryEncoding::Base64),
            "hex" => Ok(BinaryEncoding::Hex),
            other => Err(MigrateError::Config(format!(
                "Unknown binary encoding: '{}'. Supported encodings: base64, hex",
                other
            ))),
        }
    }
}
