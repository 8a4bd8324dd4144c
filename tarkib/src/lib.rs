//! # Tarkib: property-injection resolver for Rust
//!
//! Tarkib builds objects by filling their properties. Register singleton
//! values and type mappings once, then ask for a type: Tarkib constructs
//! it, injects every property whose type has a registered value, and
//! recursively builds the properties marked as resolvable.
//!
//! ```rust
//! use std::sync::Arc;
//! use tarkib::prelude::*;
//!
//! trait Store: Send + Sync {
//!     fn name(&self) -> &'static str;
//! }
//!
//! #[derive(Default, Resolvable)]
//! #[resolvable(upcast = "Box<dyn Store>")]
//! struct MemoryStore;
//!
//! impl Store for MemoryStore {
//!     fn name(&self) -> &'static str {
//!         "memory"
//!     }
//! }
//!
//! #[derive(Default, Resolvable)]
//! struct Connection {
//!     url: Arc<String>,
//! }
//!
//! #[derive(Resolvable)]
//! struct Service {
//!     #[resolvable]
//!     conn: Connection,
//!     #[resolvable(mapped)]
//!     store: Box<dyn Store>,
//! }
//!
//! impl Default for Service {
//!     fn default() -> Self {
//!         Self {
//!             conn: Connection::default(),
//!             store: Box::new(MemoryStore),
//!         }
//!     }
//! }
//!
//! let resolver = Resolver::builder()
//!     .value(Arc::new(String::from("db://primary")))
//!     .map::<Box<dyn Store>, MemoryStore>()
//!     .build()?;
//!
//! let service: Service = resolver.resolve()?;
//! assert_eq!(service.conn.url.as_str(), "db://primary");
//! assert_eq!(service.store.name(), "memory");
//! # Ok::<(), tarkib::TarkibError>(())
//! ```
//!
//! ## Crates
//! - `tarkib-container`: registry, metadata cache and resolver
//! - `tarkib-derive`: `#[derive(Resolvable)]`
//! - `tarkib-support`: diagnostics rendering

extern crate self as tarkib;

pub use tarkib_container::*;
pub use tarkib_derive::*;
pub use tarkib_support::*;

/// Everything needed to describe and resolve types.
pub mod prelude {
    pub use tarkib_container::prelude::{
        Provider, ProviderRegistry, Reflect, RegisteredValue, Resolver, ResolverBuilder,
        ResolverSettings, Result, TarkibError, TypeInfo, TypeKey,
    };
    pub use tarkib_container::reflect::Resolvable;
    pub use tarkib_derive::Resolvable;
}
