//! Per-type metadata, computed once and cached.
//!
//! Describing a type and classifying its properties against the registry is
//! the expensive part of a resolution. [`MetadataCache`] does it once per
//! concrete type and hands out the same [`TypeMetadata`] afterwards.
//!
//! # Concurrency
//! Lookups take the shared read lock. On a miss the metadata is computed
//! without holding any lock, then committed under the write lock with a
//! second check: if another thread committed first, its entry wins and the
//! fresh computation is dropped. Entries are never replaced or merged.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{Result, TarkibError};
use crate::key::TypeKey;
use crate::reflect::{Describe, PropertyInfo, TypeInfo};
use crate::registry::{RegisteredValue, Registry};

/// A property whose declared type has a registered value.
#[derive(Debug, Clone)]
pub struct DirectBinding {
    property: PropertyInfo,
    value: Arc<RegisteredValue>,
}

impl DirectBinding {
    pub fn property(&self) -> &PropertyInfo {
        &self.property
    }

    pub fn value(&self) -> &Arc<RegisteredValue> {
        &self.value
    }
}

/// Classified properties of one type, plus the descriptor they came from.
///
/// Every property declared directly on the type lands in exactly one of
/// [`bindings`](Self::bindings) or [`resolvables`](Self::resolvables), or in
/// neither when it is unmarked and unregistered. Inherited properties belong
/// to the metadata of the base type.
pub struct TypeMetadata {
    info: TypeInfo,
    bindings: Vec<DirectBinding>,
    resolvables: Vec<PropertyInfo>,
}

impl TypeMetadata {
    /// Classifies the properties of `info` against `registry`.
    pub fn compute(info: TypeInfo, registry: &Registry) -> Self {
        let mut bindings = Vec::new();
        let mut resolvables = Vec::new();

        for property in info.properties() {
            if let Some(value) = registry.lookup_value(&property.declared_type()) {
                bindings.push(DirectBinding {
                    property: property.clone(),
                    value: Arc::clone(value),
                });
            } else if property.is_resolvable() {
                resolvables.push(property.clone());
            }
        }

        Self {
            info,
            bindings,
            resolvables,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.info.key()
    }

    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn bindings(&self) -> &[DirectBinding] {
        &self.bindings
    }

    pub fn resolvables(&self) -> &[PropertyInfo] {
        &self.resolvables
    }
}

impl fmt::Debug for TypeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound: Vec<_> = self.bindings.iter().map(|b| b.property.name()).collect();
        let resolvable: Vec<_> = self.resolvables.iter().map(PropertyInfo::name).collect();
        f.debug_struct("TypeMetadata")
            .field("key", &self.key())
            .field("bindings", &bound)
            .field("resolvables", &resolvable)
            .finish()
    }
}

/// Cache of [`TypeMetadata`] keyed by concrete type.
#[derive(Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<TypeKey, Arc<TypeMetadata>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metadata for `key`, computing it with `describe` on a miss.
    ///
    /// # Errors
    /// [`TarkibError::DescriptorMismatch`] if `describe` describes a type
    /// other than `key`. Nothing is cached in that case.
    pub fn get_or_compute(
        &self,
        key: TypeKey,
        describe: Describe,
        registry: &Registry,
    ) -> Result<Arc<TypeMetadata>> {
        if let Some(hit) = self.get(&key) {
            trace!(key = %key, "Metadata cache hit");
            return Ok(hit);
        }

        let info = describe();
        if info.key() != key {
            return Err(TarkibError::DescriptorMismatch {
                requested: key,
                described: info.key(),
            });
        }
        let computed = Arc::new(TypeMetadata::compute(info, registry));

        match self.entries.write().entry(key) {
            Entry::Occupied(existing) => {
                debug!(key = %key, "Metadata committed concurrently, discarding ours");
                Ok(Arc::clone(existing.get()))
            }
            Entry::Vacant(slot) => {
                debug!(
                    key = %key,
                    bindings = computed.bindings.len(),
                    resolvables = computed.resolvables.len(),
                    "Cached type metadata"
                );
                Ok(Arc::clone(slot.insert(computed)))
            }
        }
    }

    pub fn get(&self, key: &TypeKey) -> Option<Arc<TypeMetadata>> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns the number of cached types.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("cached", &self.len())
            .finish()
    }
}
