//! Core abstractions for the serialization layer.
//!
//! - [`info`]: Database identity descriptors and pattern matching
//! - [`resolver`]: Ordered, cached strategy registry keyed by database identity
//! - [`types`]: Generic SQL type codes
//! - [`schema`]: Column and row-set metadata
//! - [`value`]: Typed SQL values exchanged with the driver layer
//! - [`variant`]: The portable two-case value representation
//! - [`access`]: Column access trait and value options
//! - [`traits`]: Dialect strategy and connection metadata traits
//! - [`catalog`]: Format registry keyed by name
//!
//! # Design Patterns
//!
//! - **Strategy**: resolved per observed database through [`Resolver`]
//! - **Dependency injection**: factories receive a [`ResolverHandle`] instead
//!   of discovering their registry

pub mod access;
pub mod catalog;
pub mod info;
pub mod resolver;
pub mod schema;
pub mod traits;
pub mod types;
pub mod value;
pub mod variant;

pub use access::{ColumnAccess, ColumnValue, ValueOptions};
pub use catalog::FormatCatalog;
pub use info::DatabaseInfo;
pub use resolver::{Resolution, Resolver, ResolverBuilder, ResolverHandle};
pub use schema::{Chunk, Column, ColumnDescriptor, RowSet, RowSetType};
pub use traits::{ConnectionMetadata, Dialect, SelectQueryOptions};
pub use types::SqlTypeCode;
pub use value::{SqlNullType, SqlValue};
pub use variant::{Row, ValueVariant, VariantKind};
