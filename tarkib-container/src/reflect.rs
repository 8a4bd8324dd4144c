//! Type descriptors: the reflection surface the resolver works against.
//!
//! Rust has no runtime reflection, so every resolvable type describes itself
//! through a [`TypeInfo`]: its zero-argument initializer, the properties it
//! declares directly, its base part (inheritance is modelled as an embedded
//! base field) and the slot types it may be assigned to.
//!
//! Descriptors are usually generated by `#[derive(Resolvable)]`, but the
//! builder is public and reads well by hand:
//!
//! ```rust
//! use tarkib_container::reflect::{Resolvable, TypeInfo};
//!
//! #[derive(Default)]
//! struct Connection {
//!     retries: u32,
//! }
//!
//! impl Resolvable for Connection {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::builder::<Self>()
//!             .default_initializer()
//!             .property("retries", |this: &mut Self| &mut this.retries)
//!             .build()
//!     }
//! }
//!
//! let info = Connection::type_info();
//! assert!(info.is_constructible());
//! assert_eq!(info.properties().len(), 1);
//! assert!(!info.properties()[0].is_resolvable());
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{PropertyMismatchError, Result, TarkibError};
use crate::key::TypeKey;

/// Produces the descriptor of one type.
pub type Describe = fn() -> TypeInfo;

/// A type the resolver can construct and populate.
///
/// Implement it with [`TypeInfo::builder`], or derive it.
pub trait Resolvable: Any + Send + Sync + Sized {
    /// Describes this type. Called once per resolver; the result is cached.
    fn type_info() -> TypeInfo;
}

/// Object-safe view of a [`Resolvable`] instance.
///
/// Gives the resolver the exact runtime type of an instance it only knows
/// as `dyn Reflect`. Implemented for every [`Resolvable`] type.
pub trait Reflect: Any + Send + Sync {
    fn type_key(&self) -> TypeKey;

    fn describer(&self) -> Describe;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<T: Resolvable> Reflect for T {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn describer(&self) -> Describe {
        T::type_info
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

// ── Type-erased accessors ──

trait Initializer: Send + Sync {
    fn construct(&self) -> Box<dyn Reflect>;
}

struct FnInitializer<T> {
    init: fn() -> T,
}

impl<T: Resolvable> Initializer for FnInitializer<T> {
    fn construct(&self) -> Box<dyn Reflect> {
        Box::new((self.init)())
    }
}

trait Setter: Send + Sync {
    /// Returns `false` if either the target or the value has the wrong type.
    fn set(&self, target: &mut dyn Any, value: Box<dyn Any + Send + Sync>) -> bool;
}

struct FieldSetter<T, F> {
    access: fn(&mut T) -> &mut F,
}

impl<T: Any, F: Any> Setter for FieldSetter<T, F> {
    fn set(&self, target: &mut dyn Any, value: Box<dyn Any + Send + Sync>) -> bool {
        let Some(target) = target.downcast_mut::<T>() else {
            return false;
        };
        match value.downcast::<F>() {
            Ok(value) => {
                *(self.access)(target) = *value;
                true
            }
            Err(_) => false,
        }
    }
}

trait Projection: Send + Sync {
    fn project<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

struct FieldProjection<T, B> {
    access: fn(&mut T) -> &mut B,
}

impl<T: Any, B: Any> Projection for FieldProjection<T, B> {
    fn project<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let target = target.downcast_mut::<T>()?;
        let base: &mut dyn Any = (self.access)(target);
        Some(base)
    }
}

trait Coercion: Send + Sync {
    fn coerce(&self, value: Box<dyn Any + Send + Sync>) -> Option<Box<dyn Any + Send + Sync>>;
}

struct FnCoercion<T, U> {
    cast: fn(T) -> U,
}

impl<T, U> Coercion for FnCoercion<T, U>
where
    T: Any + Send + Sync,
    U: Any + Send + Sync,
{
    fn coerce(&self, value: Box<dyn Any + Send + Sync>) -> Option<Box<dyn Any + Send + Sync>> {
        let value = value.downcast::<T>().ok()?;
        Some(Box::new((self.cast)(*value)))
    }
}

// ── Descriptors ──

/// A property declared directly on a type.
#[derive(Clone)]
pub struct PropertyInfo {
    name: &'static str,
    declared: TypeKey,
    resolvable: bool,
    declared_describer: Option<Describe>,
    setter: Arc<dyn Setter>,
}

impl PropertyInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type the property is declared with.
    pub fn declared_type(&self) -> TypeKey {
        self.declared
    }

    /// Whether the property carries the resolvable marker.
    pub fn is_resolvable(&self) -> bool {
        self.resolvable
    }

    /// Describer of the declared type, when it can be built without a mapping.
    pub fn declared_describer(&self) -> Option<Describe> {
        self.declared_describer
    }

    /// Writes `value` into this property of `target`.
    ///
    /// `owner` is the type declaring the property and only feeds the error.
    pub(crate) fn assign(
        &self,
        owner: TypeKey,
        target: &mut dyn Any,
        value: Box<dyn Any + Send + Sync>,
    ) -> Result<()> {
        if self.setter.set(target, value) {
            Ok(())
        } else {
            Err(TarkibError::PropertyMismatch(PropertyMismatchError {
                owner,
                property: self.name,
                expected: self.declared,
            }))
        }
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("resolvable", &self.resolvable)
            .finish()
    }
}

/// Link from a type to its embedded base part.
#[derive(Clone)]
pub struct BaseInfo {
    key: TypeKey,
    describer: Describe,
    projection: Arc<dyn Projection>,
}

impl BaseInfo {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn describer(&self) -> Describe {
        self.describer
    }

    /// Borrows the base part out of an instance of the derived type.
    pub(crate) fn project<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        self.projection.project(target)
    }
}

impl fmt::Debug for BaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BaseInfo").field(&self.key).finish()
    }
}

#[derive(Clone)]
struct Upcast {
    target: TypeKey,
    coercion: Arc<dyn Coercion>,
}

/// Reflection result for one concrete type.
#[derive(Clone)]
pub struct TypeInfo {
    key: TypeKey,
    initializer: Option<Arc<dyn Initializer>>,
    properties: Vec<PropertyInfo>,
    base: Option<BaseInfo>,
    upcasts: Vec<Upcast>,
}

impl TypeInfo {
    /// Starts describing type `T`.
    pub fn builder<T: Resolvable>() -> TypeInfoBuilder<T> {
        TypeInfoBuilder {
            info: TypeInfo {
                key: TypeKey::of::<T>(),
                initializer: None,
                properties: Vec::new(),
                base: None,
                upcasts: Vec::new(),
            },
            _type: PhantomData,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Properties declared directly on this type, in declaration order.
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    pub fn base(&self) -> Option<&BaseInfo> {
        self.base.as_ref()
    }

    pub fn is_constructible(&self) -> bool {
        self.initializer.is_some()
    }

    /// Invokes the zero-argument initializer, if there is one.
    pub fn construct(&self) -> Option<Box<dyn Reflect>> {
        self.initializer.as_ref().map(|init| init.construct())
    }

    /// Whether an instance of this type may fill a slot declared as `slot`.
    pub fn is_assignable_to(&self, slot: &TypeKey) -> bool {
        self.key == *slot || self.upcasts.iter().any(|u| u.target == *slot)
    }

    /// Slot types this type declares upcasts to.
    pub fn upcast_targets(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.upcasts.iter().map(|u| u.target)
    }

    /// Converts an instance of this type into a value of the slot type.
    ///
    /// Returns `None` when the type is not assignable to `slot` or `value`
    /// is not an instance of this type.
    pub fn coerce_into(
        &self,
        slot: &TypeKey,
        value: Box<dyn Any + Send + Sync>,
    ) -> Option<Box<dyn Any + Send + Sync>> {
        if self.key == *slot {
            let matches = (*value).type_id() == slot.type_id();
            return matches.then_some(value);
        }
        self.upcasts
            .iter()
            .find(|u| u.target == *slot)
            .and_then(|u| u.coercion.coerce(value))
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("key", &self.key)
            .field("constructible", &self.is_constructible())
            .field("properties", &self.properties)
            .field("base", &self.base)
            .field("upcasts", &self.upcast_targets().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds the [`TypeInfo`] of `T`.
///
/// Accessors are plain `fn` pointers, so closures passed here must not
/// capture anything: `|this: &mut Self| &mut this.field`.
pub struct TypeInfoBuilder<T> {
    info: TypeInfo,
    _type: PhantomData<fn() -> T>,
}

impl<T: Resolvable> TypeInfoBuilder<T> {
    /// Sets the zero-argument initializer.
    pub fn initializer(mut self, init: fn() -> T) -> Self {
        self.info.initializer = Some(Arc::new(FnInitializer { init }));
        self
    }

    /// Uses `T::default` as the zero-argument initializer.
    pub fn default_initializer(self) -> Self
    where
        T: Default,
    {
        self.initializer(T::default)
    }

    /// Declares an unmarked property.
    ///
    /// It is injected when a value of type `F` is registered and left
    /// alone otherwise.
    pub fn property<F: Any + Send + Sync>(
        self,
        name: &'static str,
        access: fn(&mut T) -> &mut F,
    ) -> Self {
        self.push_property(name, access, false, None)
    }

    /// Declares a resolvable property whose type can be built directly.
    pub fn resolvable<F: Resolvable>(self, name: &'static str, access: fn(&mut T) -> &mut F) -> Self {
        self.push_property(name, access, true, Some(F::type_info))
    }

    /// Declares a resolvable property that can only be filled through a
    /// mapping, such as a `Box<dyn Trait>` slot.
    pub fn mapped<F: Any + Send + Sync>(self, name: &'static str, access: fn(&mut T) -> &mut F) -> Self {
        self.push_property(name, access, true, None)
    }

    /// Declares the embedded base part of `T`.
    pub fn base<B: Resolvable>(mut self, access: fn(&mut T) -> &mut B) -> Self {
        self.info.base = Some(BaseInfo {
            key: TypeKey::of::<B>(),
            describer: B::type_info,
            projection: Arc::new(FieldProjection { access }),
        });
        self
    }

    /// Declares `T` assignable to slot type `U`, converting with `cast`.
    pub fn upcast<U: Any + Send + Sync>(mut self, cast: fn(T) -> U) -> Self {
        self.info.upcasts.push(Upcast {
            target: TypeKey::of::<U>(),
            coercion: Arc::new(FnCoercion { cast }),
        });
        self
    }

    pub fn build(self) -> TypeInfo {
        self.info
    }

    fn push_property<F: Any + Send + Sync>(
        mut self,
        name: &'static str,
        access: fn(&mut T) -> &mut F,
        resolvable: bool,
        declared_describer: Option<Describe>,
    ) -> Self {
        self.info.properties.push(PropertyInfo {
            name,
            declared: TypeKey::of::<F>(),
            resolvable,
            declared_describer,
            setter: Arc::new(FieldSetter { access }),
        });
        self
    }
}
