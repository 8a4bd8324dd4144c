//! Provider trait: a module of related registrations.
//!
//! Providers group the values and mappings of one area of an application
//! so setup code does not turn into one long list.
//!
//! # Examples
//! ```rust,ignore
//! struct StorageProvider;
//!
//! impl Provider for StorageProvider {
//!     fn register(&self, registry: &mut dyn ProviderRegistry) -> Result<()> {
//!         registry.value(Arc::new(PoolConfig::default()))?;
//!         registry.map::<Box<dyn Store>, SqlStore>()
//!     }
//! }
//! ```

use std::any::Any;

use crate::error::Result;
use crate::key::TypeKey;
use crate::reflect::{Describe, Resolvable};
use crate::registry::RegisteredValue;

/// A module that registers related values and mappings.
pub trait Provider: Send + Sync {
    /// Registers into `registry`. Called once while the resolver is set up.
    fn register(&self, registry: &mut dyn ProviderRegistry) -> Result<()>;

    /// Optional: human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The registration surface handed to providers.
///
/// Kept apart from the resolver so providers can be tested against a mock.
pub trait ProviderRegistry {
    fn register_value(&mut self, value: RegisteredValue) -> Result<()>;

    fn register_mapping(&mut self, from: TypeKey, describer: Describe) -> Result<()>;
}

impl dyn ProviderRegistry + '_ {
    /// Registers `value` under its own type.
    pub fn value<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Result<()> {
        self.register_value(RegisteredValue::new(value))
    }

    /// Maps slot type `From` to implementation type `To`.
    pub fn map<From: ?Sized + Any, To: Resolvable>(&mut self) -> Result<()> {
        self.register_mapping(TypeKey::of::<From>(), To::type_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::TypeInfo;

    #[derive(Default)]
    struct MockRegistry {
        values: Vec<TypeKey>,
        mappings: Vec<(TypeKey, TypeKey)>,
    }

    impl ProviderRegistry for MockRegistry {
        fn register_value(&mut self, value: RegisteredValue) -> Result<()> {
            self.values.push(value.key());
            Ok(())
        }

        fn register_mapping(&mut self, from: TypeKey, describer: Describe) -> Result<()> {
            self.mappings.push((from, describer().key()));
            Ok(())
        }
    }

    trait Mailer: Send + Sync {}

    #[derive(Default)]
    struct SmtpMailer;

    impl Mailer for SmtpMailer {}

    impl Resolvable for SmtpMailer {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<Self>()
                .default_initializer()
                .upcast::<Box<dyn Mailer>>(|this| Box::new(this))
                .build()
        }
    }

    struct MailProvider;

    impl Provider for MailProvider {
        fn register(&self, registry: &mut dyn ProviderRegistry) -> Result<()> {
            registry.value(String::from("smtp.example.org"))?;
            registry.map::<Box<dyn Mailer>, SmtpMailer>()
        }
    }

    #[test]
    fn provider_registers_values_and_mappings() {
        let mut registry = MockRegistry::default();
        MailProvider.register(&mut registry).unwrap();

        assert_eq!(registry.values, [TypeKey::of::<String>()]);
        assert_eq!(
            registry.mappings,
            [(TypeKey::of::<Box<dyn Mailer>>(), TypeKey::of::<SmtpMailer>())]
        );
    }

    #[test]
    fn provider_has_name() {
        assert!(MailProvider.name().contains("MailProvider"));
    }
}
