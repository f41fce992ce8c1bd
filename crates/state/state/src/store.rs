use crate::error::StateError;
use crate::key::StateKey;

/// Key-value persistence for cached documents and ledger entries.
///
/// Values are opaque strings; callers own (de)serialization. Calls are
/// synchronous because they sit on the page-evaluation path, which must
/// complete without suspending. Implementations must be `Send + Sync`.
pub trait StateStore: Send + Sync {
    /// Get the value for a key. Returns `None` if not found.
    fn get(&self, key: &StateKey) -> Result<Option<String>, StateError>;

    /// Set a value, overwriting any previous value.
    fn set(&self, key: &StateKey, value: &str) -> Result<(), StateError>;

    /// Delete a key. Returns `true` if the key existed.
    fn delete(&self, key: &StateKey) -> Result<bool, StateError>;

    /// Remove every entry.
    fn clear(&self) -> Result<(), StateError>;
}
