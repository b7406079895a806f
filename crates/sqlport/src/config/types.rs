//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::core::DatabaseInfo;
use crate::format::BinaryEncoding;

/// Default stream buffer size: 1 MiB.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection hints. Never used to pick a dialect.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Backup container format.
    #[serde(default)]
    pub format: FormatOptions,

    /// Chunk roll-over limits.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Options passed to every column value access.
    #[serde(default)]
    pub values: ValuesConfig,
}

/// User-supplied connection settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Declared compatibility target. Logged when it disagrees with the
    /// observed database, otherwise ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared: Option<DatabaseInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Per-query timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_timeout_secs: Option<u64>,
}

/// Format selection and stream settings shared by all codecs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Codec name: csv, xml or bson.
    #[serde(default = "default_format_name")]
    pub name: String,

    /// Wrap streams in a buffer.
    #[serde(default = "default_true")]
    pub buffering: bool,

    /// Buffer capacity in bytes when buffering is on.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    #[serde(default)]
    pub csv: CsvOptions,

    #[serde(default)]
    pub xml: XmlOptions,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            name: default_format_name(),
            buffering: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
            csv: CsvOptions::default(),
            xml: XmlOptions::default(),
        }
    }
}

impl FormatOptions {
    /// Same settings, different codec.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn unbuffered(mut self) -> Self {
        self.buffering = false;
        self
    }
}

/// Delimited text settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvOptions {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default = "default_quote")]
    pub quote: char,

    /// How binary columns are embedded in text.
    #[serde(default)]
    pub binary_encoding: BinaryEncoding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            quote: default_quote(),
            binary_encoding: BinaryEncoding::default(),
        }
    }
}

/// XML prolog settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlOptions {
    #[serde(default = "default_xml_version")]
    pub version: String,

    #[serde(default = "default_xml_encoding")]
    pub encoding: String,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            version: default_xml_version(),
            encoding: default_xml_encoding(),
        }
    }
}

/// Limits after which a chunked writer starts a new file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
}

/// Value access settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuesConfig {
    /// Zone applied to offset-aware timestamps, e.g. "+02:00" or "UTC".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

fn default_format_name() -> String {
    "csv".to_string()
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_delimiter() -> char {
    ','
}

fn default_quote() -> char {
    '"'
}

fn default_xml_version() -> String {
    "1.0".to_string()
}

fn default_xml_encoding() -> String {
    "utf-8".to_string()
}
