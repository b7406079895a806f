//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Provides MySQL-specific SQL syntax for identifier quoting, query building,
//! and parameter placeholders.

use crate::core::traits::Dialect;
use crate::value::ValueDispatcher;

/// Server family a [`MysqlDialect`] was resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MysqlFlavor {
    /// MySQL 5.x: no window functions.
    Legacy,
    /// MySQL 8.0+.
    Modern,
    MariaDb,
}

/// MySQL/MariaDB dialect implementation.
#[derive(Debug, Clone)]
pub struct MysqlDialect {
    flavor: MysqlFlavor,
    dispatcher: ValueDispatcher,
}

impl MysqlDialect {
    /// Create a dialect for MySQL 8.0+.
    pub fn new() -> Self {
        Self::with_flavor(MysqlFlavor::Modern)
    }

    pub fn legacy() -> Self {
        Self::with_flavor(MysqlFlavor::Legacy)
    }

    pub fn mariadb() -> Self {
        Self::with_flavor(MysqlFlavor::MariaDb)
    }

    fn with_flavor(flavor: MysqlFlavor) -> Self {
        Self {
            flavor,
            dispatcher: ValueDispatcher::new(),
        }
    }

    pub fn flavor(&self) -> MysqlFlavor {
        self.flavor
    }
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        match self.flavor {
            MysqlFlavor::Legacy => "mysql5",
            MysqlFlavor::Modern => "mysql",
            MysqlFlavor::MariaDb => "mariadb",
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        // Handle names that contain backticks by doubling them
        format!("`{}`", name.replace('`', "``"))
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn supports_row_number(&self) -> bool {
        // MariaDB has window functions since 10.2, MySQL since 8.0.
        self.flavor != MysqlFlavor::Legacy
    }

    fn value_dispatcher(&self) -> &ValueDispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::SelectQueryOptions;

    #[test]
    fn test_quote_ident() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_ident("name"), "`name`");
        assert_eq!(dialect.quote_ident("table`name"), "`table``name`");
        assert_eq!(dialect.quote_ident("Users"), "`Users`");
    }

    #[test]
    fn test_param_placeholder() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.param_placeholder(1), "?");
        assert_eq!(dialect.param_placeholder(10), "?");
    }

    #[test]
    fn test_build_select_query_with_keyset() {
        let dialect = MysqlDialect::new();
        let opts = SelectQueryOptions {
            schema: Some("shop".to_string()),
            columns: vec!["id".to_string(), "name".to_string()],
            pk_col: Some("id".to_string()),
            min_pk: Some(100),
            limit: Some(1000),
            ..SelectQueryOptions::new("users")
        };

        assert_eq!(
            dialect.build_select_query(&opts),
            "SELECT `id`, `name` FROM `shop`.`users` WHERE `id` > 100 ORDER BY `id` LIMIT 1000"
        );
    }

    #[test]
    fn test_row_number_by_flavor() {
        let inner = "SELECT * FROM `users`";
        let modern = MysqlDialect::new().build_row_number_query(inner, "id", 1, 1000);
        assert!(modern.contains("ROW_NUMBER() OVER (ORDER BY `id`)"));

        let legacy = MysqlDialect::legacy().build_row_number_query(inner, "id", 1001, 2000);
        assert!(!legacy.contains("ROW_NUMBER"));
        assert!(legacy.ends_with("ORDER BY `id` LIMIT 1000 OFFSET 1000"));

        assert!(MysqlDialect::mariadb().supports_row_number());
        assert_eq!(MysqlDialect::mariadb().name(), "mariadb");
    }
}
