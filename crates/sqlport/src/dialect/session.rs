//! Per-connection dialect session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ConnectionConfig;
use crate::core::traits::{ConnectionMetadata, Dialect, SelectQueryOptions};
use crate::core::{DatabaseInfo, Resolution};
use crate::error::{MigrateError, Result};

use super::DialectResolver;

/// Dialect bound to one live connection, plus the user's non-dialect settings.
#[derive(Debug, Clone)]
pub struct DialectSession {
    dialect: Arc<dyn Dialect>,
    observed: DatabaseInfo,
    defaulted: bool,
    catalog: Option<String>,
    schema: Option<String>,
    query_timeout: Option<Duration>,
}

impl DialectSession {
    /// Resolve the dialect from the connection's reported metadata.
    ///
    /// `config.declared` never takes part in selection. When it disagrees
    /// with what the connection reports, a warning is logged.
    ///
    /// # Errors
    ///
    /// Fails if the metadata cannot be read, or if no rule matches and the
    /// registry has no default.
    pub fn open(
        resolver: &DialectResolver,
        conn: &dyn ConnectionMetadata,
        config: &ConnectionConfig,
    ) -> Result<Self> {
        let observed = conn.database_info()?;

        if let Some(declared) = &config.declared {
            if !declared.matches(&observed) {
                warn!(
                    "Declared database {} does not match connected {}; using the connected database",
                    declared, observed
                );
            }
        }

        let (dialect, defaulted) = match resolver.resolve_detailed(&observed) {
            Resolution::Matched(d) => (d, false),
            Resolution::Defaulted(d) => (d, true),
            Resolution::Unsupported => {
                return Err(MigrateError::Config(format!(
                    "no dialect is registered for {}",
                    observed
                )))
            }
        };

        info!("Using {} dialect for {}", dialect.name(), observed);

        Ok(Self {
            dialect,
            observed,
            defaulted,
            catalog: config.catalog.clone(),
            schema: config.schema.clone(),
            query_timeout: config.query_timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// Identity reported by the connection.
    pub fn observed(&self) -> &DatabaseInfo {
        &self.observed
    }

    /// Whether no rule matched and the registry default is in use.
    pub fn is_defaulted(&self) -> bool {
        self.defaulted
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// Quoted table name in the session schema.
    pub fn qualify_table(&self, table: &str) -> String {
        self.dialect.qualify_table(self.schema(), table)
    }

    /// Full-table extraction query in the session schema.
    pub fn select_query(&self, table: &str, columns: &[String]) -> String {
        let opts = SelectQueryOptions {
            schema: self.schema.clone(),
            columns: columns.to_vec(),
            ..SelectQueryOptions::new(table)
        };
        self.dialect.build_select_query(&opts)
    }

    /// Rows `start_row..=end_row` (1-based) of the full-table query in `pk_col` order.
    pub fn page_query(
        &self,
        table: &str,
        columns: &[String],
        pk_col: &str,
        start_row: i64,
        end_row: i64,
    ) -> String {
        let inner = self.select_query(table, columns);
        self.dialect
            .build_row_number_query(&inner, pk_col, start_row, end_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResolverBuilder;
    use crate::dialect::builtin_dialects;
    use crate::drivers::PostgresDialect;

    /// Connection whose metadata query fails.
    struct BrokenConnection;

    impl ConnectionMetadata for BrokenConnection {
        fn product_name(&self) -> Result<String> {
            Err(MigrateError::Config("connection closed".into()))
        }

        fn product_version(&self) -> Result<String> {
            Ok("1.0".into())
        }

        fn major_version(&self) -> Result<i32> {
            Ok(1)
        }

        fn minor_version(&self) -> Result<i32> {
            Ok(0)
        }
    }

    #[test]
    fn test_selects_by_observed_metadata() {
        let resolver = builtin_dialects().unwrap();
        let config = ConnectionConfig {
            declared: Some(DatabaseInfo::new("MySQL").with_major(5)),
            schema: Some("public".into()),
            query_timeout_secs: Some(30),
            ..Default::default()
        };
        let conn = DatabaseInfo::observed("PostgreSQL", "16.2", 16, 2);

        let session = DialectSession::open(&resolver, &conn, &config).unwrap();
        assert_eq!(session.dialect().name(), "postgres");
        assert!(!session.is_defaulted());
        assert_eq!(session.observed(), &conn);
        assert_eq!(session.schema(), Some("public"));
        assert_eq!(session.query_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            session.select_query("users", &["id".to_string()]),
            "SELECT \"id\" FROM \"public\".\"users\""
        );
    }

    #[test]
    fn test_mariadb_session() {
        let resolver = builtin_dialects().unwrap();
        let conn = DatabaseInfo::observed("MySQL", "5.5.5-10.11.6-MariaDB", 5, 5);
        let session = DialectSession::open(&resolver, &conn, &ConnectionConfig::default()).unwrap();
        assert_eq!(session.dialect().name(), "mariadb");
        assert_eq!(session.qualify_table("t"), "`t`");
    }

    #[test]
    fn test_page_query_follows_window_support() {
        let resolver = builtin_dialects().unwrap();
        let config = ConnectionConfig {
            schema: Some("shop".into()),
            ..Default::default()
        };

        let modern = DatabaseInfo::observed("MySQL", "8.0.36", 8, 0);
        let session = DialectSession::open(&resolver, &modern, &config).unwrap();
        let sql = session.page_query("users", &[], "id", 1, 500);
        assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY `id`)"));
        assert!(sql.contains("FROM (SELECT * FROM `shop`.`users`) AS __inner"));

        let legacy = DatabaseInfo::observed("MySQL", "5.7.44", 5, 7);
        let session = DialectSession::open(&resolver, &legacy, &config).unwrap();
        assert_eq!(
            session.page_query("users", &[], "id", 501, 1000),
            "SELECT * FROM (SELECT * FROM `shop`.`users`) AS __inner ORDER BY `id` LIMIT 500 OFFSET 500"
        );
    }

    #[test]
    fn test_default_is_reported() {
        let resolver = builtin_dialects().unwrap();
        let conn = DatabaseInfo::observed("H2", "2.2.224", 2, 2);
        let session = DialectSession::open(&resolver, &conn, &ConnectionConfig::default()).unwrap();
        assert!(session.is_defaulted());
        assert_eq!(session.dialect().name(), "generic");
    }

    #[test]
    fn test_unsupported_without_default() {
        let mut builder = ResolverBuilder::<dyn Dialect>::new();
        builder
            .register(DatabaseInfo::new("PostgreSQL"), |_, _| {
                Arc::new(PostgresDialect::new()) as Arc<dyn Dialect>
            })
            .unwrap();
        let resolver = builder.build();

        let conn = DatabaseInfo::observed("SQLite", "3.45.1", 3, 45);
        let err = DialectSession::open(&resolver, &conn, &ConnectionConfig::default()).unwrap_err();
        assert!(err.to_string().contains("SQLite"));
    }

    #[test]
    fn test_metadata_failure_propagates() {
        let resolver = builtin_dialects().unwrap();
        let err = DialectSession::open(&resolver, &BrokenConnection, &ConnectionConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("connection closed"));
    }
}
