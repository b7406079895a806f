//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::core::ValueOptions;
use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Value access options derived from the `values` section.
    pub fn value_options(&self) -> ValueOptions {
        let mut options = ValueOptions::new();
        if let Some(zone) = &self.values.time_zone {
            options = options.with(ValueOptions::TIME_ZONE, zone.clone());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DatabaseInfo;
    use crate::error::MigrateError;
    use crate::format::BinaryEncoding;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.format.name, "csv");
        assert!(config.format.buffering);
        assert_eq!(config.format.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.format.csv.delimiter, ',');
        assert_eq!(config.format.csv.binary_encoding, BinaryEncoding::Base64);
        assert_eq!(config.format.xml.version, "1.0");
        assert_eq!(config.format.xml.encoding, "utf-8");
        assert!(config.connection.declared.is_none());
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
connection:
  declared: { product_name: "MySQL", major_version: 5 }
  schema: sales
  query_timeout_secs: 30
format:
  name: xml
  buffering: false
  buffer_size: 8192
  csv: { delimiter: ";", binary_encoding: hex }
chunking:
  max_rows: 10000
values:
  time_zone: "+02:00"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(
            config.connection.declared,
            Some(DatabaseInfo::new("MySQL").with_major(5))
        );
        assert_eq!(config.connection.schema.as_deref(), Some("sales"));
        assert_eq!(config.format.name, "xml");
        assert!(!config.format.buffering);
        assert_eq!(config.format.csv.delimiter, ';');
        assert_eq!(config.format.csv.quote, '"');
        assert_eq!(config.format.csv.binary_encoding, BinaryEncoding::Hex);
        assert_eq!(config.chunking.max_rows, Some(10_000));
        assert_eq!(
            config.value_options().get(ValueOptions::TIME_ZONE),
            Some("+02:00")
        );
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let err = Config::from_yaml("format: { name: parquet }").unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
        assert_eq!(err.exit_code(), 2);

        let err = Config::from_yaml("format: [1, 2").unwrap_err();
        assert!(matches!(err, MigrateError::Yaml(_)));

        let err =
            Config::from_yaml("connection: { declared: { product_name: x, major_version: -1 } }")
                .unwrap_err();
        assert!(err.to_string().contains("connection.declared"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "format:\n  name: bson").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.format.name, "bson");

        assert!(matches!(
            Config::load("/nonexistent/sqlport.yaml"),
            Err(MigrateError::Io(_))
        ));
    }
}
