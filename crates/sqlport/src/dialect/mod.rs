//! Dialect resolution for live connections.
//!
//! The dialect registry is a [`Resolver`] over `dyn Dialect`. Sessions are
//! opened against it with the connection's own metadata:
//!
//! ```rust
//! use sqlport::config::ConnectionConfig;
//! use sqlport::core::DatabaseInfo;
//! use sqlport::dialect::{builtin_dialects, DialectSession};
//!
//! let resolver = builtin_dialects().unwrap();
//! let connection = DatabaseInfo::observed("PostgreSQL", "16.2", 16, 2);
//! let session = DialectSession::open(&resolver, &connection, &ConnectionConfig::default()).unwrap();
//! assert_eq!(session.dialect().name(), "postgres");
//! ```

mod session;

use std::sync::Arc;

pub use session::DialectSession;

use crate::core::{Dialect, Resolver, ResolverBuilder};
use crate::drivers;
use crate::error::Result;

/// Registry of dialects keyed by observed database identity.
pub type DialectResolver = Resolver<dyn Dialect>;

/// Build a registry with the built-in dialect rules and the generic default.
pub fn builtin_dialects() -> Result<Arc<DialectResolver>> {
    let mut builder = ResolverBuilder::<dyn Dialect>::new();
    drivers::register_builtins(&mut builder)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DatabaseInfo;

    #[test]
    fn test_registry_caches_instances() {
        let resolver = builtin_dialects().unwrap();
        let observed = DatabaseInfo::observed("MySQL", "8.0.36", 8, 0);
        let first = resolver.resolve(&observed).unwrap();
        let second = resolver.resolve(&observed).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_registries_are_independent() {
        let observed = DatabaseInfo::observed("PostgreSQL", "16.2", 16, 2);
        let a = builtin_dialects().unwrap().resolve(&observed).unwrap();
        let b = builtin_dialects().unwrap().resolve(&observed).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), b.name());
    }
}
