//! # sqlport
//!
//! Portable value serialization and dialect resolution for moving data
//! between SQL databases.
//!
//! This library provides:
//!
//! - **Value dispatch** reducing every SQL type to a text or binary variant
//!   and back, without losing precision
//! - **Backup codecs** for CSV, XML and BSON chunk files with explicit NULL
//!   bitmaps
//! - **Dialect resolution** from a live connection's reported product and
//!   version, with cached, first-match-wins rules and a generic fallback
//! - **Chunked dump/load** helpers and format conversion of backed-up row sets
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sqlport::{Config, FormatCatalog, RowSet};
//!
//! fn main() -> sqlport::Result<()> {
//!     let config = Config::load("sqlport.yaml")?;
//!     let catalog = FormatCatalog::with_builtins();
//!     let row_set = RowSet::load("backup/orders.json")?;
//!     let from = catalog.require("csv")?;
//!     let to = catalog.require(&config.format.name)?;
//!     let converted = sqlport::transfer::convert_rowset(
//!         &row_set,
//!         Path::new("backup"),
//!         from.as_ref(),
//!         to.as_ref(),
//!         Path::new("converted"),
//!         &config.format,
//!     )?;
//!     println!("Converted {} rows", converted.row_count);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod format;
pub mod transfer;
pub mod value;

// Re-exports for convenient access
pub use crate::config::{Config, ConnectionConfig, FormatOptions};
pub use crate::core::{
    ColumnAccess, DatabaseInfo, Dialect, FormatCatalog, Resolution, Resolver, ResolverBuilder,
    RowSet, SqlValue, ValueVariant, VariantKind,
};
pub use crate::dialect::{builtin_dialects, DialectResolver, DialectSession};
pub use crate::error::{MigrateError, Result};
pub use crate::transfer::{ChunkedWriter, TransferEngine, TransferStats};
pub use crate::value::ValueDispatcher;
