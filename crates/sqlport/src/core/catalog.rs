//! Format catalog for explicit dependency injection.
//!
//! The [`FormatCatalog`] maps format names to codecs. It is constructed
//! explicitly and passed to whatever needs to open backup streams, rather
//! than living in a global.

use std::sync::Arc;

use crate::error::{MigrateError, Result};
use crate::format::{BsonFormat, CsvFormat, Format, XmlFormat};

/// Registry of backup container formats, keyed by case-insensitive name.
///
/// # Example
///
/// ```rust
/// use sqlport::core::FormatCatalog;
///
/// let catalog = FormatCatalog::with_builtins();
/// let xml = catalog.require("XML").unwrap();
/// assert_eq!(xml.extension(), "xml");
/// assert!(catalog.get("parquet").is_none());
/// ```
#[derive(Debug, Default, Clone)]
pub struct FormatCatalog {
    /// Registered formats in registration order.
    formats: Vec<Arc<dyn Format>>,
}

impl FormatCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with csv, xml and bson registered.
    pub fn with_builtins() -> Self {
        Self {
            formats: vec![
                Arc::new(CsvFormat) as Arc<dyn Format>,
                Arc::new(XmlFormat),
                Arc::new(BsonFormat),
            ],
        }
    }

    /// Register a format. Names must be unique, ignoring case.
    pub fn register(&mut self, format: Arc<dyn Format>) -> Result<()> {
        if self.has_format(format.name()) {
            return Err(MigrateError::Registration(format!(
                "format '{}' is already registered",
                format.name()
            )));
        }
        self.formats.push(format);
        Ok(())
    }

    /// Get a format by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Format>> {
        self.formats
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    /// Get a format by name, returning an error if not found.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Format>> {
        self.get(name).ok_or_else(|| {
            MigrateError::Config(format!(
                "Unknown format: '{}'. Supported formats: {}",
                name,
                self.names().join(", ")
            ))
        })
    }

    /// Check if a format is registered.
    pub fn has_format(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get all registered format names.
    pub fn names(&self) -> Vec<&'static str> {
        self.formats.iter().map(|f| f.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Format>> {
        self.formats.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let catalog = FormatCatalog::with_builtins();
        assert_eq!(catalog.names(), vec!["csv", "xml", "bson"]);
        assert!(catalog.has_format("Bson"));
        assert_eq!(catalog.require(" csv ").unwrap().name(), "csv");
    }

    #[test]
    fn test_require_lists_supported_formats() {
        let err = FormatCatalog::with_builtins().require("avro").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("avro"));
        assert!(msg.contains("csv, xml, bson"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut catalog = FormatCatalog::new();
        catalog.register(Arc::new(XmlFormat)).unwrap();
        assert!(matches!(
            catalog.register(Arc::new(XmlFormat)),
            Err(MigrateError::Registration(_))
        ));
        assert_eq!(catalog.names(), vec!["xml"]);
    }
}
