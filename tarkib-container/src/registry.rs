//! Registry: singleton values and type mappings.
//!
//! The registry maps a [`TypeKey`] to the single value injected into every
//! property declared with that type, and a slot type to the implementation
//! type constructed for it. It only grows: there is no removal and a second
//! registration for the same key fails.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{
    DuplicateRegistrationError, IncompatibleMappingError, RegistrationKind, Result, TarkibError,
};
use crate::key::TypeKey;
use crate::reflect::{Describe, Resolvable};

type CloneFn = fn(&(dyn Any + Send + Sync)) -> Option<Box<dyn Any + Send + Sync>>;

fn clone_erased<T: Clone + Send + Sync + 'static>(
    value: &(dyn Any + Send + Sync),
) -> Option<Box<dyn Any + Send + Sync>> {
    value
        .downcast_ref::<T>()
        .map(|value| Box::new(value.clone()) as Box<dyn Any + Send + Sync>)
}

/// A singleton value bound to its type.
///
/// Injection clones the value, so register `Arc<T>` when every consumer
/// must share one instance.
///
/// A value can also expose capabilities: views of itself under another type,
/// such as `Arc<dyn Logger>` for an `Arc<ConsoleLogger>`. Capabilities are
/// only used to collect values by type ([`Registry::values_of`]); injection
/// still matches the registered type itself.
pub struct RegisteredValue {
    key: TypeKey,
    value: Box<dyn Any + Send + Sync>,
    cloner: CloneFn,
    capabilities: Vec<Capability>,
}

struct Capability {
    key: TypeKey,
    view: Box<dyn Any + Send + Sync>,
}

impl RegisteredValue {
    pub fn new<T: Clone + Send + Sync + 'static>(value: T) -> Self {
        Self::builder(value).build()
    }

    /// Starts a registration that can expose capabilities.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use tarkib_container::key::TypeKey;
    /// use tarkib_container::registry::RegisteredValue;
    ///
    /// trait Logger: Send + Sync {}
    /// struct ConsoleLogger;
    /// impl Logger for ConsoleLogger {}
    ///
    /// let value = RegisteredValue::builder(Arc::new(ConsoleLogger))
    ///     .exposes::<Arc<dyn Logger>>(|logger| logger.clone())
    ///     .build();
    ///
    /// assert_eq!(value.key(), TypeKey::of::<Arc<ConsoleLogger>>());
    /// assert!(value.view::<Arc<dyn Logger>>().is_some());
    /// ```
    pub fn builder<T: Clone + Send + Sync + 'static>(value: T) -> ValueBuilder<T> {
        ValueBuilder {
            value,
            capabilities: Vec::new(),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Borrows the value if it was registered as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Borrows the value as a `T`: the registered value itself, or the
    /// capability exposed under `T`.
    pub fn view<T: Any>(&self) -> Option<&T> {
        self.downcast_ref::<T>().or_else(|| {
            let key = TypeKey::of::<T>();
            self.capabilities
                .iter()
                .find(|c| c.key == key)
                .and_then(|c| c.view.downcast_ref::<T>())
        })
    }

    /// Capability types this value exposes, in declaration order.
    pub fn capabilities(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.capabilities.iter().map(|c| c.key)
    }

    /// Returns a fresh clone ready to be written into a property.
    pub(crate) fn clone_value(&self) -> Option<Box<dyn Any + Send + Sync>> {
        (self.cloner)(&*self.value)
    }
}

impl fmt::Debug for RegisteredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredValue")
            .field("key", &self.key)
            .field("capabilities", &self.capabilities().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds a [`RegisteredValue`] of type `T`.
pub struct ValueBuilder<T> {
    value: T,
    capabilities: Vec<Capability>,
}

impl<T: Clone + Send + Sync + 'static> ValueBuilder<T> {
    /// Exposes the value as capability `U`, converting once with `view`.
    ///
    /// Exposing `U` a second time replaces the earlier view.
    pub fn exposes<U: Any + Send + Sync>(mut self, view: fn(&T) -> U) -> Self {
        let key = TypeKey::of::<U>();
        self.capabilities.retain(|c| c.key != key);
        self.capabilities.push(Capability {
            key,
            view: Box::new(view(&self.value)),
        });
        self
    }

    pub fn build(self) -> RegisteredValue {
        RegisteredValue {
            key: TypeKey::of::<T>(),
            value: Box::new(self.value),
            cloner: clone_erased::<T>,
            capabilities: self.capabilities,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> From<ValueBuilder<T>> for RegisteredValue {
    fn from(builder: ValueBuilder<T>) -> Self {
        builder.build()
    }
}

/// Redirects construction of a declared slot type to an implementation type.
#[derive(Clone, Copy)]
pub struct TypeMapping {
    from: TypeKey,
    to: TypeKey,
    describer: Describe,
}

impl TypeMapping {
    /// The declared slot type.
    pub fn source(&self) -> TypeKey {
        self.from
    }

    /// The implementation type constructed for the slot.
    pub fn target(&self) -> TypeKey {
        self.to
    }

    /// Describer of the implementation type.
    pub fn describer(&self) -> Describe {
        self.describer
    }
}

impl fmt::Debug for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeMapping({} => {})", self.from, self.to)
    }
}

/// Stores registered values and type mappings.
#[derive(Debug, Default)]
pub struct Registry {
    values: HashMap<TypeKey, Arc<RegisteredValue>>,
    mappings: HashMap<TypeKey, TypeMapping>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to its type `T`.
    ///
    /// # Errors
    /// [`TarkibError::DuplicateRegistration`] if `T` already has a value.
    pub fn register<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Result<()> {
        self.insert_value(RegisteredValue::new(value))
    }

    /// Binds an already wrapped value.
    pub fn insert_value(&mut self, value: RegisteredValue) -> Result<()> {
        let key = value.key();
        if self.values.contains_key(&key) {
            return Err(TarkibError::DuplicateRegistration(DuplicateRegistrationError {
                key,
                kind: RegistrationKind::Value,
            }));
        }

        debug!(
            key = %key,
            capabilities = value.capabilities.len(),
            "Registered value"
        );
        self.values.insert(key, Arc::new(value));
        Ok(())
    }

    /// Maps slot type `From` to implementation type `To`.
    ///
    /// # Errors
    /// - [`TarkibError::IncompatibleMapping`] if `To` is not assignable to `From`
    /// - [`TarkibError::DuplicateRegistration`] if `From` is already mapped
    pub fn map<From: ?Sized + 'static, To: Resolvable>(&mut self) -> Result<()> {
        self.insert_mapping(TypeKey::of::<From>(), To::type_info)
    }

    /// Maps `from` to the type produced by `describer`.
    ///
    /// Compatibility is checked before anything is stored, so a rejected
    /// mapping leaves no trace.
    pub fn insert_mapping(&mut self, from: TypeKey, describer: Describe) -> Result<()> {
        let target = describer();
        let to = target.key();

        if !target.is_assignable_to(&from) {
            return Err(TarkibError::IncompatibleMapping(IncompatibleMappingError { from, to }));
        }
        if self.mappings.contains_key(&from) {
            return Err(TarkibError::DuplicateRegistration(DuplicateRegistrationError {
                key: from,
                kind: RegistrationKind::Mapping,
            }));
        }

        debug!(from = %from, to = %to, "Registered mapping");
        self.mappings.insert(from, TypeMapping { from, to, describer });
        Ok(())
    }

    pub fn lookup_value(&self, key: &TypeKey) -> Option<&Arc<RegisteredValue>> {
        self.values.get(key)
    }

    pub fn lookup_mapping(&self, key: &TypeKey) -> Option<&TypeMapping> {
        let mapping = self.mappings.get(key);
        if let Some(mapping) = mapping {
            trace!(from = %key, to = %mapping.to, "Following mapping");
        }
        mapping
    }

    /// Every registered value assignable to `T`: values registered as `T`
    /// and values exposing `T` as a capability.
    ///
    /// Order follows the value map and is not stable across registrations.
    pub fn values_of<T: Any>(&self) -> Vec<&T> {
        self.values
            .values()
            .filter_map(|value| value.view::<T>())
            .collect()
    }

    /// Returns the number of registered values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no values are registered.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }

    pub fn registered_keys(&self) -> Vec<TypeKey> {
        self.values.keys().copied().collect()
    }

    pub fn mapped_keys(&self) -> Vec<TypeKey> {
        self.mappings.keys().copied().collect()
    }
}
