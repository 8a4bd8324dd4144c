//! `#[derive(Resolvable)]` descriptors and how the resolver uses them.

use std::sync::Arc;

use tarkib::prelude::*;

trait Store: Send + Sync {
    fn kind(&self) -> &'static str;
}

#[derive(Default, Resolvable)]
#[resolvable(upcast = "Box<dyn Store>")]
#[resolvable(upcast = "std::sync::Arc<dyn Store>")]
struct MemoryStore {
    capacity: usize,
}

impl Store for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[derive(Default, Resolvable)]
struct Entity {
    id: u64,
}

#[derive(Resolvable)]
struct Account {
    #[resolvable(base)]
    entity: Entity,
    owner: Option<Arc<String>>,
    #[resolvable(mapped)]
    store: Box<dyn Store>,
    #[resolvable(skip)]
    visits: u32,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            entity: Entity::default(),
            owner: None,
            store: Box::new(MemoryStore::default()),
            visits: 0,
        }
    }
}

#[derive(Resolvable)]
#[resolvable(no_default)]
struct Handle {
    fd: i32,
}

#[derive(Resolvable)]
struct Holder {
    #[resolvable]
    handle: Handle,
}

impl Default for Holder {
    fn default() -> Self {
        Self {
            handle: Handle { fd: 0 },
        }
    }
}

#[test]
fn derive_describes_fields_in_order() {
    let info = Account::type_info();
    assert_eq!(info.key(), TypeKey::of::<Account>());
    assert!(info.is_constructible());

    let names: Vec<_> = info.properties().iter().map(|p| p.name()).collect();
    assert_eq!(names, ["owner", "store"]);

    let owner = &info.properties()[0];
    assert!(!owner.is_resolvable());
    assert_eq!(owner.declared_type(), TypeKey::of::<Option<Arc<String>>>());

    let store = &info.properties()[1];
    assert!(store.is_resolvable());
    assert!(store.declared_describer().is_none());
}

#[test]
fn derive_records_base() {
    let info = Account::type_info();
    assert_eq!(info.base().map(|b| b.key()), Some(TypeKey::of::<Entity>()));
    assert!(Entity::type_info().base().is_none());
}

#[test]
fn derive_records_upcasts() {
    let info = MemoryStore::type_info();
    assert!(info.is_assignable_to(&TypeKey::of::<MemoryStore>()));
    assert!(info.is_assignable_to(&TypeKey::of::<Box<dyn Store>>()));
    assert!(info.is_assignable_to(&TypeKey::of::<Arc<dyn Store>>()));
    assert!(!info.is_assignable_to(&TypeKey::of::<Entity>()));
}

#[test]
fn no_default_leaves_type_unconstructible() {
    assert!(!Handle::type_info().is_constructible());

    let resolver = Resolver::new();
    assert!(matches!(
        resolver.resolve::<Handle>(),
        Err(TarkibError::NotConstructible(_))
    ));
}

#[test]
fn no_default_type_can_still_be_populated() {
    let resolver = Resolver::builder().value(3i32).build().unwrap();

    let mut handle = Handle { fd: -1 };
    resolver.resolve_properties(&mut handle).unwrap();
    assert_eq!(handle.fd, 3);
}

#[test]
fn no_default_property_target_reports_the_owner() {
    let resolver = Resolver::new();
    let Err(err) = resolver.resolve::<Holder>() else {
        panic!("Holder must not resolve while Handle has no initializer");
    };

    let message = err.to_string();
    assert!(message.contains("Parameterless initializer"), "{message}");
    assert!(message.contains("Required by: Holder"), "{message}");
}

#[test]
fn derived_account_resolves_end_to_end() {
    let owner = Arc::new(String::from("ada"));
    let resolver = Resolver::builder()
        .value(Some(owner.clone()))
        .value(41u64)
        .value(9u32)
        .map::<Box<dyn Store>, MemoryStore>()
        .build()
        .unwrap();

    let account: Account = resolver.resolve().unwrap();
    assert!(Arc::ptr_eq(account.owner.as_ref().unwrap(), &owner));
    assert_eq!(account.entity.id, 41);
    assert_eq!(account.store.kind(), "memory");
    // Skipped fields are never touched, even with a value registered.
    assert_eq!(account.visits, 0);
}

#[test]
fn mapped_field_without_mapping_fails() {
    let resolver = Resolver::new();
    match resolver.resolve::<Account>() {
        Err(TarkibError::NotConstructible(e)) => {
            assert_eq!(e.requested, TypeKey::of::<Box<dyn Store>>());
            assert_eq!(e.path, [TypeKey::of::<Account>()]);
        }
        Err(other) => panic!("Expected NotConstructible, got: {other:?}"),
        Ok(_) => panic!("Expected NotConstructible, got a resolved account"),
    }
}

#[test]
fn arc_upcast_fills_shared_slot() {
    let mut resolver = Resolver::new();
    resolver.map::<Arc<dyn Store>, MemoryStore>().unwrap();

    let store: Arc<dyn Store> = resolver.resolve_mapped().unwrap();
    assert_eq!(store.kind(), "memory");
}
