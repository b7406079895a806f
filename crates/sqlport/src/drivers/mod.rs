//! Database driver dialects.
//!
//! This module provides database-specific implementations of [`Dialect`]:
//!
//! - [`mysql`]: MySQL 5.x, MySQL 8+ and MariaDB
//! - [`postgres`]: PostgreSQL
//! - [`mssql`]: Microsoft SQL Server
//! - [`generic`]: SQL-92 fallback for everything else
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` (e.g., `drivers/oracle/`)
//! 2. Implement the `Dialect` trait
//! 3. Register a pattern in [`register_builtins`], ahead of any broader
//!    pattern that would otherwise shadow it

pub mod generic;
pub mod mssql;
pub mod mysql;
pub mod postgres;

use std::sync::Arc;

use tracing::debug;

pub use generic::GenericDialect;
pub use mssql::MssqlDialect;
pub use mysql::{MysqlDialect, MysqlFlavor};
pub use postgres::PostgresDialect;

use crate::core::traits::Dialect;
use crate::core::{DatabaseInfo, ResolverBuilder, ResolverHandle};
use crate::error::Result;

/// Product name MySQL-compatible servers report.
pub const MYSQL: &str = "MySQL";
pub const MARIADB: &str = "MariaDB";
pub const POSTGRESQL: &str = "PostgreSQL";
pub const SQL_SERVER: &str = "Microsoft SQL Server";

/// Register the built-in dialect rules, most specific first, and the
/// generic default.
pub fn register_builtins(builder: &mut ResolverBuilder<dyn Dialect>) -> Result<()> {
    builder
        .register(DatabaseInfo::new(MYSQL).with_major(5), mysql5_or_mariadb)?
        .register(DatabaseInfo::new(MYSQL), |_, _| {
            Arc::new(MysqlDialect::new()) as Arc<dyn Dialect>
        })?
        .register(DatabaseInfo::new(MARIADB), |_, _| {
            Arc::new(MysqlDialect::mariadb()) as Arc<dyn Dialect>
        })?
        .register(DatabaseInfo::new(POSTGRESQL), |_, _| {
            Arc::new(PostgresDialect::new()) as Arc<dyn Dialect>
        })?
        .register(DatabaseInfo::new(SQL_SERVER), |_, _| {
            Arc::new(MssqlDialect::new()) as Arc<dyn Dialect>
        })?
        .set_default(|_, _| Arc::new(GenericDialect::new()) as Arc<dyn Dialect>);
    Ok(())
}

/// MariaDB 10.x reports itself as `MySQL 5.5.5-10.x.y-MariaDB` for client
/// compatibility; hand those over to the MariaDB rule.
fn mysql5_or_mariadb(
    observed: &DatabaseInfo,
    handle: &ResolverHandle<dyn Dialect>,
) -> Arc<dyn Dialect> {
    let version = observed.product_version.as_deref().unwrap_or_default();
    if version.contains(MARIADB) {
        let mariadb = DatabaseInfo {
            product_name: Some(MARIADB.to_string()),
            ..observed.clone()
        };
        debug!("{} reports MariaDB; resolving as {}", observed, mariadb);
        if let Some(dialect) = handle.resolve(&mariadb) {
            return dialect;
        }
    }
    Arc::new(MysqlDialect::legacy())
}
