//! # Tarkib Support
//!
//! Shared utilities for the Tarkib resolver crates.
//!
//! This crate provides:
//! - Short, readable type names for diagnostics
//! - Rendering of resolution paths and inheritance chains
//! - "Did you mean?" suggestions for mapping hints

pub mod rendering;
