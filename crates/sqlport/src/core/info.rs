//! Database identity descriptors and pattern matching.
//!
//! A [`DatabaseInfo`] is used two ways: as the *observed* identity of a live
//! database (always fully populated from connection metadata) and as a
//! registration *pattern* in a resolver, where unset fields mean "any".

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Identity of a running database instance or a declared compatibility target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Product name as reported by the driver (e.g. "PostgreSQL").
    #[serde(default)]
    pub product_name: Option<String>,

    /// Full product version string (e.g. "9.6.24").
    #[serde(default)]
    pub product_version: Option<String>,

    /// Major version number.
    #[serde(default)]
    pub major_version: Option<i32>,

    /// Minor version number.
    #[serde(default)]
    pub minor_version: Option<i32>,
}

impl DatabaseInfo {
    /// Create a descriptor with only the product name set.
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: Some(product_name.into()),
            ..Self::default()
        }
    }

    /// Create a fully populated descriptor, as observed from a connection.
    pub fn observed(
        product_name: impl Into<String>,
        product_version: impl Into<String>,
        major_version: i32,
        minor_version: i32,
    ) -> Self {
        Self {
            product_name: Some(product_name.into()),
            product_version: Some(product_version.into()),
            major_version: Some(major_version),
            minor_version: Some(minor_version),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.product_version = Some(version.into());
        self
    }

    pub fn with_major(mut self, major: i32) -> Self {
        self.major_version = Some(major);
        self
    }

    pub fn with_minor(mut self, minor: i32) -> Self {
        self.minor_version = Some(minor);
        self
    }

    /// Check whether this pattern accepts an observed descriptor.
    ///
    /// Unset pattern fields match anything. The product name is a
    /// case-insensitive prefix match; every other set field must be equal.
    /// A field set on the pattern but missing on the observed side fails.
    pub fn matches(&self, observed: &DatabaseInfo) -> bool {
        if let Some(ref name) = self.product_name {
            match observed.product_name {
                Some(ref actual) if starts_with_ignore_case(actual, name) => {}
                _ => return false,
            }
        }
        if self.product_version.is_some() && self.product_version != observed.product_version {
            return false;
        }
        if self.major_version.is_some() && self.major_version != observed.major_version {
            return false;
        }
        if self.minor_version.is_some() && self.minor_version != observed.minor_version {
            return false;
        }
        true
    }

    /// Reject patterns that can never describe a real database.
    pub fn validate_pattern(&self) -> Result<()> {
        if let Some(ref name) = self.product_name {
            if name.trim().is_empty() {
                return Err(MigrateError::Registration(
                    "product_name must not be empty; leave it unset to match any product".into(),
                ));
            }
        }
        for (field, value) in [
            ("major_version", self.major_version),
            ("minor_version", self.minor_version),
        ] {
            if let Some(v) = value {
                if v < 0 {
                    return Err(MigrateError::Registration(format!(
                        "{} must not be negative, got {} in pattern {}",
                        field, v, self
                    )));
                }
            }
        }
        Ok(())
    }
}

fn starts_with_ignore_case(actual: &str, prefix: &str) -> bool {
    let mut actual = actual.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| actual.next() == Some(p))
}

impl fmt::Display for DatabaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product_name.as_deref().unwrap_or("*"))?;
        if let Some(ref version) = self.product_version {
            write!(f, " {}", version)?;
        }
        match (self.major_version, self.minor_version) {
            (Some(major), Some(minor)) => write!(f, " ({}.{})", major, minor),
            (Some(major), None) => write!(f, " ({}.*)", major),
            (None, Some(minor)) => write!(f, " (*.{})", minor),
            (None, None) => Ok(()),
        }
    }
}
