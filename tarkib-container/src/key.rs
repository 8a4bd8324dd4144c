//! Type identification keys.
//!
//! [`TypeKey`] identifies a type everywhere in the resolver: registered
//! values, mappings, cached metadata and declared property types.
//! It pairs a [`TypeId`] with the type's name so diagnostics stay readable.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use tarkib_support::rendering::shorten_type_name;

/// Identifies a Rust type inside the resolver.
///
/// Equality and hashing only look at the [`TypeId`]; the name is carried
/// for error messages and logs.
///
/// # Examples
/// ```
/// use tarkib_container::key::TypeKey;
///
/// let key = TypeKey::of::<String>();
/// assert_eq!(key.type_name(), "alloc::string::String");
/// assert_eq!(key.short_name(), "String");
/// assert_eq!(key, TypeKey::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Creates a key for type `T`.
    ///
    /// Unsized types are fine: `TypeKey::of::<dyn Store>()` is a valid key,
    /// although property slots are usually keyed by `Box<dyn Store>`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name with module paths stripped.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }

    /// Returns `true` if this key identifies `T`.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.type_name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}
