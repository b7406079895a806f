//! Microsoft SQL Server support.
//!
//! - [`MssqlDialect`]: SQL syntax strategy for MSSQL

mod dialect;

pub use dialect::MssqlDialect;
