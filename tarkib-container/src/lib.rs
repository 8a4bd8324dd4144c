//! Core resolver implementation for Tarkib.
//!
//! - [`key`]: type keys
//! - [`reflect`]: type descriptors and the [`Resolvable`] trait
//! - [`registry`]: singleton values and type mappings
//! - [`metadata`]: per-type metadata cache
//! - [`resolver`]: the resolution engine

pub mod error;
pub mod key;
pub mod metadata;
pub mod provider;
pub mod reflect;
pub mod registry;
pub mod resolver;
pub mod settings;

pub use error::{Result, TarkibError};
pub use key::TypeKey;
pub use reflect::{Reflect, Resolvable, TypeInfo};
pub use registry::RegisteredValue;
pub use resolver::{Resolver, ResolverBuilder, prelude};
pub use settings::ResolverSettings;
