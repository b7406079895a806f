//! Error types for the serialization core.

use thiserror::Error;

/// Longest slice of offending input kept in a [`MigrateError::MalformedValue`].
const MAX_RAW_LEN: usize = 64;

/// Main error type for value conversion, codec and resolver operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, out-of-range option, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A matcher pattern was rejected at registration time.
    #[error("Invalid resolver registration: {0}")]
    Registration(String),

    /// No dispatch rule exists for a SQL type code/name combination.
    #[error("Unsupported type {type_name} (code {type_code}) for column {column} of table {table}")]
    UnsupportedType {
        table: String,
        column: String,
        type_code: i32,
        type_name: String,
    },

    /// Text or bytes did not parse per the expected grammar.
    #[error("Malformed value for column {column} of table {table}: expected {expected}, got '{raw}'")]
    MalformedValue {
        table: String,
        column: String,
        expected: String,
        raw: String,
    },

    /// Underlying stream or document failure; fatal for the whole stream.
    #[error("{format} codec error: {message}")]
    Codec { format: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transfer was cancelled between rows.
    #[error("Transfer cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Codec error for the named format.
    pub fn codec(format: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Codec {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create a MalformedValue error, truncating the offending input.
    pub fn malformed(
        table: impl Into<String>,
        column: impl Into<String>,
        expected: impl Into<String>,
        raw: &str,
    ) -> Self {
        MigrateError::MalformedValue {
            table: table.into(),
            column: column.into(),
            expected: expected.into(),
            raw: truncate(raw),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Truncate raw input to a safe length for diagnostics, on a char boundary.
fn truncate(raw: &str) -> String {
    match raw.char_indices().nth(MAX_RAW_LEN) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

/// Result type alias for serialization operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
