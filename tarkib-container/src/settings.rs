//! Resolver configuration.
//!
//! [`ResolverSettings`] is plain serde data so applications can keep it
//! next to the rest of their configuration:
//!
//! ```
//! use tarkib_container::settings::ResolverSettings;
//!
//! let settings = ResolverSettings::default().with_max_depth(16);
//! assert_eq!(settings.max_depth, Some(16));
//! assert!(settings.warn_on_late_registration);
//! ```

use serde::{Deserialize, Serialize};

/// Tunables for a [`Resolver`](crate::resolver::Resolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Deepest nesting of resolvable properties below the root instance.
    ///
    /// `None` leaves recursion unbounded, so a cyclic graph of resolvable
    /// types runs until the stack is exhausted.
    pub max_depth: Option<usize>,

    /// Log a warning when a value is registered after metadata was cached.
    ///
    /// Cached metadata is permanent and keeps the bindings it was computed
    /// with.
    pub warn_on_late_registration: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_depth: None,
            warn_on_late_registration: true,
        }
    }
}

impl ResolverSettings {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn warn_on_late_registration(mut self, warn: bool) -> Self {
        self.warn_on_late_registration = warn;
        self
    }
}
