//! Fallback dialect for databases without a dedicated rule.

use crate::core::traits::Dialect;
use crate::value::ValueDispatcher;

/// SQL-92 dialect: double-quoted identifiers, `?` placeholders, no window
/// functions assumed.
#[derive(Debug, Clone, Default)]
pub struct GenericDialect {
    dispatcher: ValueDispatcher,
}

impl GenericDialect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &str {
        "generic"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn supports_row_number(&self) -> bool {
        false
    }

    fn value_dispatcher(&self) -> &ValueDispatcher {
        &self.dispatcher
    }
}
