//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific SQL syntax for identifier quoting, query building,
//! and parameter placeholders.

use std::sync::Arc;

use crate::core::traits::Dialect;
use crate::value::{TextObjectCodec, ValueDispatcher};

/// PostgreSQL dialect implementation.
///
/// OTHER-typed columns (json, jsonb, uuid, interval, ...) are carried as their
/// text form, which PostgreSQL accepts back on insert.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    dispatcher: ValueDispatcher,
}

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self {
            dispatcher: ValueDispatcher::with_object_codec(Arc::new(TextObjectCodec)),
        }
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Handle names that contain double quotes by doubling them
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc. (1-based)
        format!("${}", index)
    }

    fn value_dispatcher(&self) -> &ValueDispatcher {
        &self.dispatcher
    }
}
