//! Configuration validation.

use super::Config;
use crate::core::access::parse_time_zone;
use crate::error::{MigrateError, Result};

const KNOWN_FORMATS: &[&str] = &["csv", "xml", "bson"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let format = &config.format;
    if !KNOWN_FORMATS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(&format.name))
    {
        return Err(MigrateError::Config(format!(
            "format.name must be one of {}, got '{}'",
            KNOWN_FORMATS.join(", "),
            format.name
        )));
    }
    if format.buffer_size == 0 {
        return Err(MigrateError::Config(
            "format.buffer_size must be at least 1".into(),
        ));
    }

    // CSV
    let csv = &format.csv;
    for (key, c) in [("delimiter", csv.delimiter), ("quote", csv.quote)] {
        if !c.is_ascii() || c == '\r' || c == '\n' {
            return Err(MigrateError::Config(format!(
                "format.csv.{} must be a single ASCII character other than CR or LF, got {:?}",
                key, c
            )));
        }
    }
    if csv.delimiter == csv.quote {
        return Err(MigrateError::Config(
            "format.csv.delimiter and format.csv.quote must differ".into(),
        ));
    }

    // XML
    if format.xml.version != "1.0" {
        return Err(MigrateError::Config(format!(
            "format.xml.version must be '1.0', got '{}'",
            format.xml.version
        )));
    }
    let encoding = format.xml.encoding.to_lowercase();
    if encoding != "utf-8" && encoding != "utf8" {
        return Err(MigrateError::Config(format!(
            "format.xml.encoding must be 'utf-8', got '{}'",
            format.xml.encoding
        )));
    }

    // Chunking - only check if explicitly set
    if let Some(0) = config.chunking.max_rows {
        return Err(MigrateError::Config(
            "chunking.max_rows must be at least 1".into(),
        ));
    }
    if let Some(0) = config.chunking.max_bytes {
        return Err(MigrateError::Config(
            "chunking.max_bytes must be at least 1".into(),
        ));
    }

    if let Some(zone) = &config.values.time_zone {
        parse_time_zone(zone)?;
    }

    if let Some(declared) = &config.connection.declared {
        declared
            .validate_pattern()
            .map_err(|e| MigrateError::Config(format!("connection.declared: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: &Config, needle: &str) {
        match validate(config) {
            Err(MigrateError::Config(msg)) => {
                assert!(msg.contains(needle), "'{}' not in '{}'", needle, msg)
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_unknown_format() {
        let mut config = Config::default();
        config.format.name = "parquet".into();
        assert_invalid(&config, "format.name");

        config.format.name = "XML".into();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_buffer_size() {
        let mut config = Config::default();
        config.format.buffer_size = 0;
        assert_invalid(&config, "buffer_size");
    }

    #[test]
    fn test_csv_delimiter_rules() {
        let mut config = Config::default();
        config.format.csv.delimiter = '"';
        assert_invalid(&config, "must differ");

        config.format.csv.delimiter = '\n';
        assert_invalid(&config, "format.csv.delimiter");

        config.format.csv.delimiter = '§';
        assert_invalid(&config, "ASCII");

        config.format.csv.delimiter = '\t';
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_xml_prolog_rules() {
        let mut config = Config::default();
        config.format.xml.version = "1.1".into();
        assert_invalid(&config, "format.xml.version");

        let mut config = Config::default();
        config.format.xml.encoding = "ISO-8859-1".into();
        assert_invalid(&config, "format.xml.encoding");
    }

    #[test]
    fn test_chunking_limits() {
        let mut config = Config::default();
        config.chunking.max_rows = Some(0);
        assert_invalid(&config, "max_rows");

        let mut config = Config::default();
        config.chunking.max_bytes = Some(0);
        assert_invalid(&config, "max_bytes");
    }

    #[test]
    fn test_time_zone() {
        let mut config = Config::default();
        config.values.time_zone = Some("Europe/Nowhere".into());
        assert_invalid(&config, "time zone");

        config.values.time_zone = Some("-05:00".into());
        assert!(validate(&config).is_ok());
    }
}
