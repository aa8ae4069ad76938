use paydesk_common::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// String key-value persistence scoped to one origin.
///
/// This is the only capability the credential layer needs from storage, so
/// tests can swap in [`MemoryKeyValueStore`] without touching disk.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Process-local store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_round_trip() {
        let store = MemoryKeyValueStore::new();
        store.set("currentRole", "admin").unwrap();
        assert_eq!(store.get("currentRole").unwrap(), Some("admin".to_string()));

        store.remove("currentRole").unwrap();
        assert_eq!(store.get("currentRole").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn remove_missing_key_is_ok() {
        let store = MemoryKeyValueStore::new();
        assert!(store.remove("nothing-here").is_ok());
        assert!(store.remove("nothing-here").is_ok());
    }

    #[test]
    fn shared_arc_sees_same_entries() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let other = Arc::clone(&store);
        store.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(store.keys(), vec!["k".to_string()]);
    }
}
