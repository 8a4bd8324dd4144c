//! Error types for resolver operations.
//!
//! Every error is raised synchronously by the call that triggered it and is
//! never retried internally. Messages name the types involved in short form
//! and end with a hint.

use std::fmt;

use tarkib_support::rendering::render_chain;

use crate::key::TypeKey;

/// Main error type for all Tarkib operations.
#[derive(Debug, thiserror::Error)]
pub enum TarkibError {
    /// A value or mapping was registered twice for the same type.
    #[error("{}", .0)]
    DuplicateRegistration(DuplicateRegistrationError),

    /// A mapping target is not assignable to its source type.
    #[error("{}", .0)]
    IncompatibleMapping(IncompatibleMappingError),

    /// A type has no usable zero-argument initializer.
    #[error("{}", .0)]
    NotConstructible(NotConstructibleError),

    /// Property resolution was asked to work on no instance.
    #[error("Cannot resolve properties: no target instance was given")]
    NullTarget,

    /// A descriptor produced or accepted a value of the wrong type.
    #[error("{}", .0)]
    PropertyMismatch(PropertyMismatchError),

    /// A describer returned the descriptor of another type.
    #[error(
        "Descriptor mismatch: describer for {requested} describes {described}\n  \
         Hint: type_info() must start from TypeInfo::builder::<Self>()"
    )]
    DescriptorMismatch {
        requested: TypeKey,
        described: TypeKey,
    },

    /// Nested construction went deeper than the configured limit.
    #[error("Resolution exceeded max depth {limit}:\n  {}", render_keys(.path))]
    DepthLimitExceeded { limit: usize, path: Vec<TypeKey> },
}

/// What was registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    Value,
    Mapping,
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationKind::Value => write!(f, "value"),
            RegistrationKind::Mapping => write!(f, "mapping"),
        }
    }
}

/// Error when a type key is bound twice.
#[derive(Debug)]
pub struct DuplicateRegistrationError {
    pub key: TypeKey,
    pub kind: RegistrationKind,
}

impl fmt::Display for DuplicateRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duplicate {} registration for {}", self.kind, self.key)?;
        write!(
            f,
            "\n  Hint: registrations are append-only; the first {} for {} stays in effect",
            self.kind,
            self.key.short_name()
        )
    }
}

/// Error when a mapping target cannot stand in for its source type.
#[derive(Debug)]
pub struct IncompatibleMappingError {
    pub from: TypeKey,
    pub to: TypeKey,
}

impl fmt::Display for IncompatibleMappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Incompatible mapping: {} is not assignable to {}",
            self.to, self.from
        )?;
        write!(
            f,
            "\n  Hint: declare the upcast on {}, e.g. #[resolvable(upcast = \"{}\")]",
            self.to.short_name(),
            self.from.short_name()
        )
    }
}

/// Why a type could not be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructFailure {
    /// The type describes no zero-argument initializer.
    NoInitializer,
    /// The slot type is only constructible through a mapping, and none exists.
    Unmapped,
}

/// Error when a root target or a resolvable property cannot be built.
#[derive(Debug)]
pub struct NotConstructibleError {
    /// The type that could not be constructed
    pub requested: TypeKey,
    /// Types being built when construction was attempted, outermost first
    pub path: Vec<TypeKey>,
    pub reason: ConstructFailure,
    /// Mapped slot types with similar names
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotConstructibleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ConstructFailure::NoInitializer => write!(
                f,
                "Parameterless initializer needed to build {}",
                self.requested
            )?,
            ConstructFailure::Unmapped => write!(
                f,
                "No mapping registered for {}, which cannot be built directly",
                self.requested
            )?,
        }

        if let Some(owner) = self.path.last() {
            write!(f, "\n  Required by: {}", owner.short_name())?;
        }
        if self.path.len() > 1 {
            write!(f, "\n  Path: {}", render_keys(&self.path))?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        match self.reason {
            ConstructFailure::NoInitializer => write!(
                f,
                "\n  Hint: derive Default for {} or give its descriptor a constructor",
                self.requested.short_name()
            ),
            ConstructFailure::Unmapped => write!(
                f,
                "\n  Hint: did you forget to call .map::<{}, _>()?",
                self.requested.short_name()
            ),
        }
    }
}

/// Error when a property setter or upcast sees a value of the wrong type.
#[derive(Debug)]
pub struct PropertyMismatchError {
    pub owner: TypeKey,
    pub property: &'static str,
    pub expected: TypeKey,
}

impl fmt::Display for PropertyMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Property {}::{} expected a value of type {}",
            self.owner.short_name(),
            self.property,
            self.expected
        )?;
        write!(
            f,
            "\n  Hint: the type descriptor of {} disagrees with the real field type",
            self.owner.short_name()
        )
    }
}

fn render_keys(path: &[TypeKey]) -> String {
    let names: Vec<&str> = path.iter().map(TypeKey::type_name).collect();
    render_chain(&names)
}

/// Convenient Result type for Tarkib operations.
pub type Result<T> = std::result::Result<T, TarkibError>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Service;
    struct Connection;

    #[test]
    fn duplicate_registration_display() {
        let err = TarkibError::DuplicateRegistration(DuplicateRegistrationError {
            key: TypeKey::of::<String>(),
            kind: RegistrationKind::Mapping,
        });

        let msg = format!("{err}");
        assert!(msg.contains("Duplicate mapping registration"));
        assert!(msg.contains("String"));
    }

    #[test]
    fn incompatible_mapping_display() {
        let err = TarkibError::IncompatibleMapping(IncompatibleMappingError {
            from: TypeKey::of::<Service>(),
            to: TypeKey::of::<Connection>(),
        });

        let msg = format!("{err}");
        assert!(msg.contains("Incompatible mapping"));
        assert!(msg.contains("upcast = \"Service\""));
    }

    #[test]
    fn not_constructible_shows_path() {
        let err = TarkibError::NotConstructible(NotConstructibleError {
            requested: TypeKey::of::<Connection>(),
            path: vec![TypeKey::of::<Service>(), TypeKey::of::<Vec<u8>>()],
            reason: ConstructFailure::NoInitializer,
            suggestions: vec![],
        });

        let msg = format!("{err}");
        assert!(msg.contains("Parameterless initializer"));
        assert!(msg.contains("Required by: Vec<u8>"));
        assert!(msg.contains("Service → Vec<u8>"));
    }

    #[test]
    fn unmapped_lists_suggestions() {
        let err = TarkibError::NotConstructible(NotConstructibleError {
            requested: TypeKey::of::<Connection>(),
            path: vec![],
            reason: ConstructFailure::Unmapped,
            suggestions: vec!["Connections".into()],
        });

        let msg = format!("{err}");
        assert!(msg.contains("No mapping registered"));
        assert!(msg.contains("- Connections"));
        assert!(!msg.contains("Required by"));
    }

    #[test]
    fn descriptor_mismatch_display() {
        let err = TarkibError::DescriptorMismatch {
            requested: TypeKey::of::<Service>(),
            described: TypeKey::of::<Connection>(),
        };

        let msg = format!("{err}");
        assert!(msg.contains("describes"));
        assert!(msg.contains("Connection"));
        assert!(msg.contains("builder::<Self>()"));
    }

    #[test]
    fn depth_limit_display() {
        let err = TarkibError::DepthLimitExceeded {
            limit: 2,
            path: vec![TypeKey::of::<Service>(), TypeKey::of::<Connection>()],
        };

        let msg = format!("{err}");
        assert!(msg.contains("max depth 2"));
        assert!(msg.contains("Service → Connection"));
    }
}
