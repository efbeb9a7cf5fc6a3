/// Key-value persistence seam
///
/// The record and settings stores only ever need "get a string by key" and
/// "set a string by key". Production uses the SQLite `Library`; tests use
/// `MemoryStorage`.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};

pub trait KeyValueStore {
    /// Fetch the value stored under `key`, or `None` if it was never set
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Write several keys at once.
    ///
    /// The default implementation writes them one after another, so a failure
    /// part way through leaves the earlier keys written. Stores that support
    /// transactions override this to make the batch atomic.
    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// One store shared by the record store and the settings store
pub type SharedStore<S> = Arc<Mutex<S>>;

pub fn shared<S: KeyValueStore>(store: S) -> SharedStore<S> {
    Arc::new(Mutex::new(store))
}

impl<S: KeyValueStore> KeyValueStore for SharedStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.lock().unwrap_or_else(PoisonError::into_inner).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.lock().unwrap_or_else(PoisonError::into_inner).set(key, value)
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<()> {
        self.lock().unwrap_or_else(PoisonError::into_inner).set_many(entries)
    }
}

/// In-memory store with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes once keys plus values would exceed `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(quota),
        }
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(Error::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let store = MemoryStorage::new();
        assert_eq!(store.get("nothing").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let mut store = MemoryStorage::new();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_quota_rejects_large_writes() {
        let mut store = MemoryStorage::with_quota(10);
        store.set("k", "12345").unwrap();

        let err = store.set("other", "123456").unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { quota: 10, .. }));
        // Failed write leaves the store untouched
        assert_eq!(store.get("other").unwrap(), None);

        // Replacing an existing key only counts the new value
        store.set("k", "123456789").unwrap();
    }

    #[test]
    fn test_shared_handles_see_same_data() {
        let mut writer = shared(MemoryStorage::new());
        let reader = Arc::clone(&writer);

        writer.set("k", "v").unwrap();
        assert_eq!(reader.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_default_set_many_is_sequential() {
        let mut store = MemoryStorage::with_quota(8);
        let err = store
            .set_many(&[("a", "123".to_string()), ("b", "123456".to_string())])
            .unwrap_err();

        assert!(matches!(err, Error::QuotaExceeded { .. }));
        assert_eq!(store.get("a").unwrap().as_deref(), Some("123"));
        assert_eq!(store.get("b").unwrap(), None);
    }
}
