//! MSSQL SQL dialect (Strategy pattern).
//!
//! Provides MSSQL-specific SQL syntax for identifier quoting, query building,
//! and parameter placeholders.

use crate::core::traits::{push_conditions, select_list, Dialect, SelectQueryOptions};
use crate::value::ValueDispatcher;

/// Microsoft SQL Server dialect implementation.
///
/// Implements the Strategy pattern for SQL syntax differences.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect {
    dispatcher: ValueDispatcher,
}

impl MssqlDialect {
    /// Create a new MSSQL dialect instance.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // MSSQL uses square brackets for identifier quoting
        // Handle names that contain closing brackets by doubling them
        format!("[{}]", name.replace(']', "]]"))
    }

    fn build_select_query(&self, opts: &SelectQueryOptions) -> String {
        let table = self.qualify_table(opts.schema.as_deref(), &opts.table);
        let mut sql = format!(
            "SELECT {} FROM {} WITH (NOLOCK)",
            select_list(self, &opts.columns),
            table
        );

        push_conditions(self, opts, &mut sql);

        // Ordering by PK for keyset pagination
        if let Some(ref pk) = opts.pk_col {
            sql.push_str(&format!(" ORDER BY {}", self.quote_ident(pk)));
        }

        // MSSQL uses TOP for limiting rows in ordered queries
        if let Some(limit) = opts.limit {
            sql = sql.replacen("SELECT ", &format!("SELECT TOP {} ", limit), 1);
        }

        sql
    }

    fn param_placeholder(&self, index: usize) -> String {
        // MSSQL uses @P1, @P2, etc. (1-based)
        format!("@P{}", index)
    }

    fn value_dispatcher(&self) -> &ValueDispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.quote_ident("name"), "[name]");
        assert_eq!(dialect.quote_ident("table]name"), "[table]]name]");
        assert_eq!(dialect.quote_ident("Users"), "[Users]");
    }

    #[test]
    fn test_param_placeholder() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.param_placeholder(1), "@P1");
        assert_eq!(dialect.param_placeholder(10), "@P10");
    }

    #[test]
    fn test_build_select_query_simple() {
        let dialect = MssqlDialect::new();
        let opts = SelectQueryOptions {
            schema: Some("dbo".to_string()),
            columns: vec!["id".to_string(), "name".to_string()],
            ..SelectQueryOptions::new("Users")
        };

        assert_eq!(
            dialect.build_select_query(&opts),
            "SELECT [id], [name] FROM [dbo].[Users] WITH (NOLOCK)"
        );
    }

    #[test]
    fn test_build_select_query_with_keyset() {
        let dialect = MssqlDialect::new();
        let opts = SelectQueryOptions {
            schema: Some("dbo".to_string()),
            columns: vec!["id".to_string(), "name".to_string()],
            pk_col: Some("id".to_string()),
            min_pk: Some(100),
            max_pk: Some(200),
            limit: Some(1000),
            ..SelectQueryOptions::new("Users")
        };

        let sql = dialect.build_select_query(&opts);
        assert!(sql.starts_with("SELECT TOP 1000 [id], [name]"));
        assert!(sql.contains("[id] > 100"));
        assert!(sql.contains("[id] <= 200"));
        assert!(sql.ends_with("ORDER BY [id]"));
    }

    #[test]
    fn test_build_select_query_with_where() {
        let dialect = MssqlDialect::new();
        let opts = SelectQueryOptions {
            where_clause: Some("status = 'active'".to_string()),
            ..SelectQueryOptions::new("Users")
        };

        assert_eq!(
            dialect.build_select_query(&opts),
            "SELECT * FROM [Users] WITH (NOLOCK) WHERE (status = 'active')"
        );
    }

    #[test]
    fn test_build_row_number_query() {
        let dialect = MssqlDialect::new();
        let sql = dialect.build_row_number_query("SELECT * FROM [dbo].[Users]", "id", 1, 1000);

        assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY [id])"));
        assert!(sql.contains("__rn >= 1"));
        assert!(sql.contains("__rn <= 1000"));
    }
}
