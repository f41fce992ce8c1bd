use dashmap::DashMap;

use paygate_state::error::StateError;
use paygate_state::key::StateKey;
use paygate_state::store::StateStore;

/// In-memory [`StateStore`] backed by a [`DashMap`].
///
/// Contents do not survive the process; use it for tests and for hosts
/// that re-fetch rules on every start.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    data: DashMap<String, String>,
}

impl MemoryStateStore {
    /// Create a new, empty in-memory state store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Render a [`StateKey`] into the string used as the map key.
    fn render_key(key: &StateKey) -> String {
        key.canonical()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        Ok(self
            .data
            .get(&Self::render_key(key))
            .map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &StateKey, value: &str) -> Result<(), StateError> {
        self.data.insert(Self::render_key(key), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &StateKey) -> Result<bool, StateError> {
        Ok(self.data.remove(&Self::render_key(key)).is_some())
    }

    fn clear(&self) -> Result<(), StateError> {
        self.data.clear();
        Ok(())
    }
}
