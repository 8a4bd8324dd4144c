//! Derive macros for Tarkib.
//!
//! See [`Resolvable`] for the supported attributes.

pub use tarkib_macros::Resolvable;
