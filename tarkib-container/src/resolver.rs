//! # The Resolver: heart of Tarkib
//!
//! Constructs instances and fills their properties from the registry,
//! recursing into resolvable properties and walking up embedded base types.
//!
//! # Architecture
//! ```text
//! ResolverBuilder ──build()──> Resolver ──resolve::<T>()──> T
//!                                 │
//!                   ┌─────────────┼──────────────┐
//!                   ▼             ▼              ▼
//!               Registry    MetadataCache   ResolverSettings
//! ```
//!
//! Registration takes `&mut self` and resolution takes `&self`, so all
//! setup happens before the resolver can be shared between threads.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use tarkib_container::prelude::*;
//!
//! struct Logger {
//!     prefix: &'static str,
//! }
//!
//! #[derive(Default)]
//! struct Connection {
//!     open: bool,
//! }
//!
//! impl Resolvable for Connection {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::builder::<Self>().default_initializer().build()
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Service {
//!     log: Option<Arc<Logger>>,
//!     conn: Connection,
//! }
//!
//! impl Resolvable for Service {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::builder::<Self>()
//!             .default_initializer()
//!             .property("log", |this: &mut Self| &mut this.log)
//!             .resolvable("conn", |this: &mut Self| &mut this.conn)
//!             .build()
//!     }
//! }
//!
//! let logger = Arc::new(Logger { prefix: "[app]" });
//! let resolver = Resolver::builder()
//!     .value(Some(logger.clone()))
//!     .build()
//!     .expect("setup failed");
//!
//! let service: Service = resolver.resolve().expect("resolve failed");
//! assert!(Arc::ptr_eq(service.log.as_ref().unwrap(), &logger));
//! assert!(!service.conn.open);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tarkib_support::rendering::suggest_similar;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{
    ConstructFailure, NotConstructibleError, PropertyMismatchError, Result, TarkibError,
};
use crate::key::TypeKey;
use crate::metadata::{MetadataCache, TypeMetadata};
use crate::provider::{Provider, ProviderRegistry};
use crate::reflect::{Describe, PropertyInfo, Reflect, Resolvable};
use crate::registry::{RegisteredValue, Registry};
use crate::settings::ResolverSettings;

// ============================================================
// ResolverBuilder
// ============================================================

/// Builds a [`Resolver`] with its values and mappings.
///
/// Every step is applied immediately; the first failure is remembered and
/// returned by [`build()`](ResolverBuilder::build).
///
/// # Examples
/// ```rust,ignore
/// let resolver = Resolver::builder()
///     .settings(ResolverSettings::default().with_max_depth(32))
///     .value(Arc::new(ConsoleLogger))
///     .value_with(
///         RegisteredValue::builder(Arc::new(FileLogger::open("app.log")))
///             .exposes::<Arc<dyn Logger>>(|logger| logger.clone()),
///     )
///     .map::<Box<dyn Store>, SqlStore>()
///     .add_provider(&MailProvider)
///     .build()?;
/// ```
pub struct ResolverBuilder {
    resolver: Resolver,
    error: Option<TarkibError>,
}

impl ResolverBuilder {
    fn new() -> Self {
        Self {
            resolver: Resolver::new(),
            error: None,
        }
    }

    pub fn settings(mut self, settings: ResolverSettings) -> Self {
        self.resolver.settings = settings;
        self
    }

    /// Register a singleton value, injected into every property of type `T`.
    pub fn value<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        let result = self.resolver.register(value);
        self.record(result)
    }

    /// Register a value built with [`RegisteredValue::builder`], keeping
    /// the capabilities it exposes.
    pub fn value_with(mut self, value: impl Into<RegisteredValue>) -> Self {
        let result = self.resolver.register_with(value);
        self.record(result)
    }

    /// Map slot type `From` to implementation type `To`.
    pub fn map<From: ?Sized + 'static, To: Resolvable>(mut self) -> Self {
        let result = self.resolver.map::<From, To>();
        self.record(result)
    }

    /// Add a [`Provider`] module.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        debug!(provider = provider.name(), "Adding provider");
        let result = provider.register(&mut self.resolver);
        self.record(result)
    }

    /// Finish setup.
    ///
    /// # Errors
    /// The first registration error met while building.
    #[instrument(skip(self), name = "resolver_build")]
    pub fn build(self) -> Result<Resolver> {
        if let Some(error) = self.error {
            return Err(error);
        }

        info!(
            values = self.resolver.registry.len(),
            mappings = self.resolver.registry.mapping_count(),
            "Resolver ready"
        );
        Ok(self.resolver)
    }

    fn record(mut self, result: Result<()>) -> Self {
        if let Err(error) = result {
            warn!(%error, "Registration failed");
            if self.error.is_none() {
                self.error = Some(error);
            }
        }
        self
    }
}

// ═══════════════════════════════════════════
// Resolver
// ═══════════════════════════════════════════

/// Property-injection resolver.
///
/// Holds the [`Registry`] and the [`MetadataCache`]. Shareable across
/// threads once setup is done.
#[derive(Default)]
pub struct Resolver {
    registry: Registry,
    cache: MetadataCache,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ResolverSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Create a new builder.
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    // ── Registration ──

    /// Binds a singleton value to its type `T`.
    ///
    /// # Errors
    /// [`TarkibError::DuplicateRegistration`] if `T` already has a value;
    /// the first value stays in effect.
    pub fn register<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Result<()> {
        self.insert_value(RegisteredValue::new(value))
    }

    /// Binds a value built with [`RegisteredValue::builder`].
    ///
    /// ```rust,ignore
    /// resolver.register_with(
    ///     RegisteredValue::builder(Arc::new(ConsoleLogger))
    ///         .exposes::<Arc<dyn Logger>>(|logger| logger.clone()),
    /// )?;
    /// ```
    ///
    /// # Errors
    /// [`TarkibError::DuplicateRegistration`] if the value's type is taken.
    pub fn register_with(&mut self, value: impl Into<RegisteredValue>) -> Result<()> {
        self.insert_value(value.into())
    }

    /// Maps slot type `From` to implementation type `To`.
    ///
    /// # Errors
    /// - [`TarkibError::IncompatibleMapping`] if `To` is not assignable to `From`
    /// - [`TarkibError::DuplicateRegistration`] if `From` is already mapped
    pub fn map<From: ?Sized + 'static, To: Resolvable>(&mut self) -> Result<()> {
        self.registry.map::<From, To>()
    }

    // ── Resolution ──

    /// Constructs a `T` and resolves its properties.
    ///
    /// ```rust,ignore
    /// let service: Service = resolver.resolve()?;
    /// ```
    ///
    /// # Errors
    /// [`TarkibError::NotConstructible`] when `T` or any resolvable property
    /// target has no zero-argument initializer or lacks a mapping.
    #[instrument(skip(self), fields(ty = %TypeKey::of::<T>()))]
    pub fn resolve<T: Resolvable>(&self) -> Result<T> {
        let key = TypeKey::of::<T>();
        let mut path = Vec::new();
        let (_, instance) = self.instantiate(key, T::type_info, &mut path)?;

        instance
            .into_any()
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| mismatch(key, "<initializer>", key))
    }

    /// Resolves a value for slot type `S` through its registered mapping.
    ///
    /// ```rust,ignore
    /// resolver.map::<Box<dyn Store>, SqlStore>()?;
    /// let store: Box<dyn Store> = resolver.resolve_mapped()?;
    /// ```
    ///
    /// # Errors
    /// [`TarkibError::NotConstructible`] if `S` has no mapping.
    #[instrument(skip(self), fields(slot = %TypeKey::of::<S>()))]
    pub fn resolve_mapped<S: Any + Send + Sync>(&self) -> Result<S> {
        let slot = TypeKey::of::<S>();
        let mapping = *self
            .registry
            .lookup_mapping(&slot)
            .ok_or_else(|| self.not_constructible(slot, &[], ConstructFailure::Unmapped))?;

        let mut path = Vec::new();
        let (meta, instance) =
            self.instantiate(mapping.target(), mapping.describer(), &mut path)?;

        meta.info()
            .coerce_into(&slot, instance.into_any())
            .and_then(|value| value.downcast::<S>().ok())
            .map(|boxed| *boxed)
            .ok_or_else(|| mismatch(meta.key(), "<upcast>", slot))
    }

    /// Resolves the properties of an existing instance.
    ///
    /// Starts from the exact runtime type of `target`, which for a
    /// `&mut dyn Reflect` is the concrete type behind it.
    pub fn resolve_properties<T: Reflect + ?Sized>(&self, target: &mut T) -> Result<()> {
        let key = target.type_key();
        trace!(key = %key, "Resolving properties of existing instance");

        let meta = self.metadata(key, target.describer())?;
        let mut path = vec![key];
        self.populate(&meta, target.as_any_mut(), &mut path)
    }

    /// Type-erased form of [`resolve_properties`](Self::resolve_properties).
    ///
    /// # Errors
    /// [`TarkibError::NullTarget`] when `target` is `None`.
    pub fn resolve_existing(&self, target: Option<&mut dyn Reflect>) -> Result<()> {
        let target = target.ok_or(TarkibError::NullTarget)?;
        self.resolve_properties(target)
    }

    // ── Registered values ──

    /// Applies `apply` to every registered value assignable to `T`: values
    /// registered as `T` and values exposing `T` as a capability.
    ///
    /// Order follows the registry's map and is not stable.
    ///
    /// ```rust,ignore
    /// resolver.transform_dependencies::<Arc<dyn Logger>>(|logger| logger.set_level(Level::Debug));
    /// ```
    pub fn transform_dependencies<T: Any>(&self, apply: impl FnMut(&T)) {
        let values = self.registry.values_of::<T>();
        debug!(ty = %TypeKey::of::<T>(), count = values.len(), "Transforming dependencies");
        values.into_iter().for_each(apply);
    }

    /// Like [`transform_dependencies`](Self::transform_dependencies), but
    /// `select` first filters and orders the values; `apply` then runs in
    /// the order `select` returned.
    ///
    /// ```rust,ignore
    /// resolver.transform_dependencies_with::<Arc<dyn Logger>>(
    ///     |mut loggers| {
    ///         loggers.sort_by_key(|l| l.priority());
    ///         loggers
    ///     },
    ///     |logger| logger.flush(),
    /// );
    /// ```
    pub fn transform_dependencies_with<T: Any>(
        &self,
        select: impl FnOnce(Vec<&T>) -> Vec<&T>,
        apply: impl FnMut(&T),
    ) {
        let selected = select(self.registry.values_of::<T>());
        debug!(ty = %TypeKey::of::<T>(), count = selected.len(), "Transforming selected dependencies");
        selected.into_iter().for_each(apply);
    }

    // ── Internal ──

    fn insert_value(&mut self, value: RegisteredValue) -> Result<()> {
        if self.settings.warn_on_late_registration && !self.cache.is_empty() {
            warn!(
                key = %value.key(),
                cached = self.cache.len(),
                "Registering after metadata was cached; cached types keep their bindings"
            );
        }
        self.registry.insert_value(value)
    }

    fn metadata(&self, key: TypeKey, describe: Describe) -> Result<Arc<TypeMetadata>> {
        self.cache.get_or_compute(key, describe, &self.registry)
    }

    /// Constructs `key` and resolves its properties.
    ///
    /// `path` holds the types currently under construction and is restored
    /// before returning.
    fn instantiate(
        &self,
        key: TypeKey,
        describe: Describe,
        path: &mut Vec<TypeKey>,
    ) -> Result<(Arc<TypeMetadata>, Box<dyn Reflect>)> {
        let meta = self.metadata(key, describe)?;
        let mut instance = meta
            .info()
            .construct()
            .ok_or_else(|| self.not_constructible(key, path, ConstructFailure::NoInitializer))?;

        path.push(key);
        let populated = self.populate(&meta, instance.as_any_mut(), path);
        path.pop();
        populated?;

        Ok((meta, instance))
    }

    /// Applies bindings and resolvable properties for `meta`'s type, then
    /// for each base type in turn.
    fn populate(
        &self,
        meta: &Arc<TypeMetadata>,
        target: &mut dyn Any,
        path: &mut Vec<TypeKey>,
    ) -> Result<()> {
        let mut current = Arc::clone(meta);
        let mut target = target;

        loop {
            let owner = current.key();

            for binding in current.bindings() {
                let property = binding.property();
                trace!(owner = %owner, property = property.name(), "Injecting registered value");
                let value = binding
                    .value()
                    .clone_value()
                    .ok_or_else(|| mismatch(owner, property.name(), property.declared_type()))?;
                property.assign(owner, target, value)?;
            }

            for property in current.resolvables() {
                let value = self.build_property(property, path)?;
                trace!(owner = %owner, property = property.name(), "Assigned resolved property");
                property.assign(owner, target, value)?;
            }

            let Some(base) = current.info().base() else {
                return Ok(());
            };
            trace!(from = %owner, to = %base.key(), "Walking to base type");

            let next = self.metadata(base.key(), base.describer())?;
            target = base
                .project(target)
                .ok_or_else(|| mismatch(owner, "<base>", base.key()))?;
            current = next;
        }
    }

    /// Builds the value of one resolvable property.
    fn build_property(
        &self,
        property: &PropertyInfo,
        path: &mut Vec<TypeKey>,
    ) -> Result<Box<dyn Any + Send + Sync>> {
        let declared = property.declared_type();
        let (key, describe) = match self.registry.lookup_mapping(&declared) {
            Some(mapping) => (mapping.target(), mapping.describer()),
            None => match property.declared_describer() {
                Some(describe) => (declared, describe),
                None => {
                    return Err(self.not_constructible(declared, path, ConstructFailure::Unmapped));
                }
            },
        };

        if let Some(limit) = self.settings.max_depth {
            if path.len() > limit {
                let mut path = path.clone();
                path.push(key);
                return Err(TarkibError::DepthLimitExceeded { limit, path });
            }
        }

        let (meta, instance) = self.instantiate(key, describe, path)?;
        meta.info()
            .coerce_into(&declared, instance.into_any())
            .ok_or_else(|| mismatch(meta.key(), property.name(), declared))
    }

    fn not_constructible(
        &self,
        requested: TypeKey,
        path: &[TypeKey],
        reason: ConstructFailure,
    ) -> TarkibError {
        let suggestions = match reason {
            ConstructFailure::Unmapped => {
                let mapped = self.registry.mapped_keys();
                let names: Vec<&str> = mapped.iter().map(TypeKey::type_name).collect();
                suggest_similar(requested.type_name(), &names, 3)
            }
            ConstructFailure::NoInitializer => Vec::new(),
        };

        TarkibError::NotConstructible(NotConstructibleError {
            requested,
            path: path.to_vec(),
            reason,
            suggestions,
        })
    }
}

impl ProviderRegistry for Resolver {
    fn register_value(&mut self, value: RegisteredValue) -> Result<()> {
        self.insert_value(value)
    }

    fn register_mapping(&mut self, from: TypeKey, describer: Describe) -> Result<()> {
        self.registry.insert_mapping(from, describer)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("values", &self.registry.len())
            .field("mappings", &self.registry.mapping_count())
            .field("cached", &self.cache.len())
            .finish()
    }
}

fn mismatch(owner: TypeKey, property: &'static str, expected: TypeKey) -> TarkibError {
    TarkibError::PropertyMismatch(PropertyMismatchError {
        owner,
        property,
        expected,
    })
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Resolver, ResolverBuilder};
    pub use crate::error::{Result, TarkibError};
    pub use crate::key::TypeKey;
    pub use crate::provider::{Provider, ProviderRegistry};
    pub use crate::reflect::{Reflect, Resolvable, TypeInfo};
    pub use crate::registry::RegisteredValue;
    pub use crate::settings::ResolverSettings;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
