use std::sync::Arc;

use dashmap::DashMap;
use http::Extensions;

use crate::store::{Error, StorageArea, StorageProvider};

/// An in-memory storage area.
///
/// Clones share the same underlying map, the way every tab of an origin sees the same
/// local storage. Concurrent writers race last-write-wins.
///
/// ### Note
///
/// As a [`StorageProvider`], every request gets a clone of the same map, so all clients
/// of the server read and overwrite one another's records. Use it for tests and
/// single-user tools only. Records also live only as long as the process. Use
/// [`CookieStorage`](crate::store::CookieStorage) to keep each client's data with that
/// client.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl StorageArea for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.data.get(key).map(|value| value.clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), Error> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, Error> {
        Ok(self.data.remove(key).is_some())
    }
}

/// Hands every request the same map, whoever sent it.
impl StorageProvider for MemoryStorage {
    type Storage = MemoryStorage;

    fn provide(&self, _extensions: &Extensions) -> Option<Self::Storage> {
        Some(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let storage = MemoryStorage::new();

        assert!(storage.get("missing").unwrap().is_none());

        storage.set("key", "value".to_string()).unwrap();
        assert_eq!(storage.get("key").unwrap().as_deref(), Some("value"));

        storage.set("key", "updated".to_string()).unwrap();
        assert_eq!(storage.get("key").unwrap().as_deref(), Some("updated"));
        assert_eq!(storage.len(), 1);

        assert!(storage.remove("key").unwrap());
        assert!(!storage.remove("key").unwrap());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_clones_share_data() {
        let first_tab = MemoryStorage::new();
        let second_tab = first_tab.clone();

        first_tab.set("key", "from first".to_string()).unwrap();
        second_tab.set("key", "from second".to_string()).unwrap();

        assert_eq!(first_tab.get("key").unwrap().as_deref(), Some("from second"));
    }

    #[test]
    fn test_provider_shares_one_map_across_requests() {
        let provider = MemoryStorage::new();
        let first = provider.provide(&Extensions::new()).unwrap();
        let second = provider.provide(&Extensions::new()).unwrap();

        first.set("travelplace_last_search", "{}".to_string()).unwrap();

        assert_eq!(
            second.get("travelplace_last_search").unwrap().as_deref(),
            Some("{}")
        );
    }
}
