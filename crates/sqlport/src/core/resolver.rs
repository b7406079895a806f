//! Ordered strategy registry keyed by [`DatabaseInfo`] patterns.
//!
//! A [`Resolver`] maps observed database identities to strategy objects
//! (dialects, services, value formats). Rules are tried in registration
//! order and the first matching pattern wins, so overlapping patterns must be
//! registered most-specific-first by the caller:
//!
//! ```rust
//! use std::sync::Arc;
//! use sqlport::core::{DatabaseInfo, ResolverBuilder};
//!
//! let mut builder = ResolverBuilder::<str>::new();
//! builder.register(DatabaseInfo::new("MySQL").with_major(5), |_, _| Arc::from("mysql5")).unwrap();
//! builder.register(DatabaseInfo::new("MySQL"), |_, _| Arc::from("mysql")).unwrap();
//! let resolver = builder.build();
//!
//! let observed = DatabaseInfo::observed("MySQL", "5.7.44", 5, 7);
//! assert_eq!(resolver.resolve(&observed).as_deref(), Some("mysql5"));
//! ```
//!
//! Resolved strategies are cached per observed identity. Each cache slot is a
//! `OnceLock`, so concurrent resolutions of the same identity construct the
//! strategy exactly once and all callers receive the same `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use tracing::{debug, warn};

use crate::error::Result;

use super::info::DatabaseInfo;

/// Strategy factory invoked with the observed identity and a handle back to
/// the registry that is resolving it.
pub type Factory<S> = Arc<dyn Fn(&DatabaseInfo, &ResolverHandle<S>) -> Arc<S> + Send + Sync>;

/// Outcome of a resolution.
pub enum Resolution<S: ?Sized> {
    /// A registered pattern accepted the observed identity.
    Matched(Arc<S>),
    /// No pattern matched; the default factory was used.
    Defaulted(Arc<S>),
    /// No pattern matched and no default is configured.
    Unsupported,
}

impl<S: ?Sized> Resolution<S> {
    /// The resolved strategy, if any.
    pub fn strategy(&self) -> Option<&Arc<S>> {
        match self {
            Resolution::Matched(s) | Resolution::Defaulted(s) => Some(s),
            Resolution::Unsupported => None,
        }
    }

    pub fn into_strategy(self) -> Option<Arc<S>> {
        match self {
            Resolution::Matched(s) | Resolution::Defaulted(s) => Some(s),
            Resolution::Unsupported => None,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Resolution::Defaulted(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Resolution::Unsupported)
    }
}

impl<S: ?Sized> Clone for Resolution<S> {
    fn clone(&self) -> Self {
        match self {
            Resolution::Matched(s) => Resolution::Matched(Arc::clone(s)),
            Resolution::Defaulted(s) => Resolution::Defaulted(Arc::clone(s)),
            Resolution::Unsupported => Resolution::Unsupported,
        }
    }
}

impl<S: ?Sized> fmt::Debug for Resolution<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Matched(_) => f.write_str("Matched"),
            Resolution::Defaulted(_) => f.write_str("Defaulted"),
            Resolution::Unsupported => f.write_str("Unsupported"),
        }
    }
}

struct Rule<S: ?Sized> {
    pattern: DatabaseInfo,
    factory: Factory<S>,
}

/// Collects rules before the registry is frozen.
pub struct ResolverBuilder<S: ?Sized> {
    rules: Vec<Rule<S>>,
    default: Option<Factory<S>>,
}

impl<S: ?Sized + Send + Sync + 'static> ResolverBuilder<S> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default: None,
        }
    }

    /// Append a rule. Rules are tried in the order they were registered.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Registration`](crate::error::MigrateError::Registration)
    /// if the pattern is malformed (negative version, blank product name).
    pub fn register<F>(&mut self, pattern: DatabaseInfo, factory: F) -> Result<&mut Self>
    where
        F: Fn(&DatabaseInfo, &ResolverHandle<S>) -> Arc<S> + Send + Sync + 'static,
    {
        pattern.validate_pattern()?;
        self.rules.push(Rule {
            pattern,
            factory: Arc::new(factory),
        });
        Ok(self)
    }

    /// Set the factory used when no rule matches.
    pub fn set_default<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&DatabaseInfo, &ResolverHandle<S>) -> Arc<S> + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(factory));
        self
    }

    /// Freeze the rule table.
    pub fn build(self) -> Arc<Resolver<S>> {
        let Self { rules, default } = self;
        Arc::new_cyclic(|weak| Resolver {
            rules,
            default,
            cache: Mutex::new(HashMap::new()),
            handle: ResolverHandle {
                inner: weak.clone(),
            },
        })
    }
}

impl<S: ?Sized + Send + Sync + 'static> Default for ResolverBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak back-reference handed to factories for nested resolutions.
pub struct ResolverHandle<S: ?Sized> {
    inner: Weak<Resolver<S>>,
}

impl<S: ?Sized> Clone for ResolverHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: ?Sized + Send + Sync + 'static> ResolverHandle<S> {
    /// Resolve through the parent registry.
    ///
    /// Returns [`Resolution::Unsupported`] if the registry has been dropped.
    /// Resolving the identity currently being constructed blocks forever.
    pub fn resolve_detailed(&self, observed: &DatabaseInfo) -> Resolution<S> {
        match self.inner.upgrade() {
            Some(resolver) => resolver.resolve_detailed(observed),
            None => Resolution::Unsupported,
        }
    }

    pub fn resolve(&self, observed: &DatabaseInfo) -> Option<Arc<S>> {
        self.resolve_detailed(observed).into_strategy()
    }
}

type Slot<S> = Arc<OnceLock<Resolution<S>>>;

/// Immutable rule table with a per-identity resolution cache.
pub struct Resolver<S: ?Sized> {
    rules: Vec<Rule<S>>,
    default: Option<Factory<S>>,
    cache: Mutex<HashMap<DatabaseInfo, Slot<S>>>,
    handle: ResolverHandle<S>,
}

impl<S: ?Sized + Send + Sync + 'static> Resolver<S> {
    /// Resolve a strategy for an observed database identity.
    pub fn resolve_detailed(&self, observed: &DatabaseInfo) -> Resolution<S> {
        let slot = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry(observed.clone()).or_default())
        };
        slot.get_or_init(|| self.instantiate(observed)).clone()
    }

    /// Resolve a strategy, discarding whether the default was used.
    pub fn resolve(&self, observed: &DatabaseInfo) -> Option<Arc<S>> {
        self.resolve_detailed(observed).into_strategy()
    }

    fn instantiate(&self, observed: &DatabaseInfo) -> Resolution<S> {
        if let Some(rule) = self.rules.iter().find(|r| r.pattern.matches(observed)) {
            debug!("Resolved {} via pattern {}", observed, rule.pattern);
            return Resolution::Matched((rule.factory)(observed, &self.handle));
        }
        match self.default {
            Some(ref factory) => {
                warn!(
                    "No rule matched {}; falling back to the default strategy",
                    observed
                );
                Resolution::Defaulted(factory(observed, &self.handle))
            }
            None => {
                debug!("No rule matched {} and no default is configured", observed);
                Resolution::Unsupported
            }
        }
    }

    /// A handle to this registry.
    pub fn handle(&self) -> ResolverHandle<S> {
        self.handle.clone()
    }

    /// Registered patterns in precedence order.
    pub fn patterns(&self) -> impl Iterator<Item = &DatabaseInfo> {
        self.rules.iter().map(|r| &r.pattern)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl<S: ?Sized> fmt::Debug for Resolver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field(
                "patterns",
                &self
                    .rules
                    .iter()
                    .map(|r| r.pattern.to_string())
                    .collect::<Vec<_>>(),
            )
            .field("has_default", &self.default.is_some())
            .finish()
    }
}
