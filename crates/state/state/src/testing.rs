use crate::error::StateError;
use crate::key::{KeyKind, StateKey};
use crate::store::StateStore;

fn test_key(kind: KeyKind) -> StateKey {
    StateKey::new("test-ns", kind)
}

/// Run the full state store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if a store operation fails.
pub fn run_store_conformance_tests(store: &dyn StateStore) -> Result<(), StateError> {
    test_get_missing(store)?;
    test_set_and_get(store)?;
    test_overwrite(store)?;
    test_delete(store)?;
    test_keys_are_isolated(store)?;
    test_clear(store)?;
    Ok(())
}

fn test_get_missing(store: &dyn StateStore) -> Result<(), StateError> {
    let val = store.get(&test_key(KeyKind::Custom("missing".into())))?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

fn test_set_and_get(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::RuleSet);
    store.set(&key, "[]")?;
    assert_eq!(store.get(&key)?.as_deref(), Some("[]"));
    Ok(())
}

fn test_overwrite(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Entitlements);
    store.set(&key, "v1")?;
    store.set(&key, "v2")?;
    assert_eq!(store.get(&key)?.as_deref(), Some("v2"), "set should overwrite");
    Ok(())
}

fn test_delete(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::RuleData(9));
    store.set(&key, "bye")?;
    assert!(store.delete(&key)?, "delete should return true for existing key");
    assert!(store.get(&key)?.is_none(), "get after delete should return None");
    assert!(!store.delete(&key)?, "delete on missing key should return false");
    Ok(())
}

fn test_keys_are_isolated(store: &dyn StateStore) -> Result<(), StateError> {
    let one = test_key(KeyKind::RuleData(1));
    let two = test_key(KeyKind::RuleData(2));
    let other_ns = StateKey::new("other-ns", KeyKind::RuleData(1));
    store.set(&one, "one")?;
    store.set(&two, "two")?;
    store.set(&other_ns, "other")?;
    assert_eq!(store.get(&one)?.as_deref(), Some("one"));
    assert_eq!(store.get(&two)?.as_deref(), Some("two"));
    assert_eq!(store.get(&other_ns)?.as_deref(), Some("other"));
    Ok(())
}

fn test_clear(store: &dyn StateStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::RuleSet);
    store.set(&key, "[]")?;
    store.clear()?;
    assert!(store.get(&key)?.is_none(), "clear should remove every entry");
    assert!(store.get(&test_key(KeyKind::RuleData(1)))?.is_none());
    Ok(())
}
