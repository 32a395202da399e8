pub mod file;
pub mod memory;
pub mod sqlite;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Raw string key/value storage that survives the process.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for Box<B> {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        (**self).remove(key)
    }
}

/// Typed JSON values on top of a [`KeyValueBackend`].
///
/// Persistence is best-effort: read failures fall back to the caller's
/// default and write failures are logged, neither reaches the caller.
pub struct DurableStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> DurableStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                log::error!("Error reading storage key \"{}\": {:#}", key, e);
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Discarding unreadable value under \"{}\": {}", key, e);
                default
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("Failed to serialize value for \"{}\": {}", key, e);
                return;
            }
        };

        if let Err(e) = self.backend.set(key, &raw) {
            log::error!("Error writing storage key \"{}\": {:#}", key, e);
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_key_returns_default() {
        let store = DurableStore::new(MemoryBackend::new());
        let value: Vec<String> = store.load("absent", vec!["fallback".to_string()]);
        assert_eq!(value, vec!["fallback".to_string()]);
    }

    #[test]
    fn test_save_then_load() {
        let mut store = DurableStore::new(MemoryBackend::new());
        let mut value = HashMap::new();
        value.insert("a".to_string(), 1u32);
        store.save("counts", &value);

        let loaded: HashMap<String, u32> = store.load("counts", HashMap::new());
        assert_eq!(loaded, value);
        assert_eq!(store.backend().raw("counts").as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_corrupt_payload_returns_default() {
        let backend = MemoryBackend::new();
        backend.insert_raw("numbers", "{not json");
        let store = DurableStore::new(backend);

        let loaded: Vec<u32> = store.load("numbers", Vec::new());
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_incompatible_shape_returns_default() {
        let backend = MemoryBackend::new();
        backend.insert_raw("numbers", r#"{"version":2}"#);
        let store = DurableStore::new(backend);

        let loaded: Vec<u32> = store.load("numbers", vec![7]);
        assert_eq!(loaded, vec![7]);
    }

    #[test]
    fn test_unavailable_backend_is_swallowed() {
        let backend = MemoryBackend::new();
        let mut store = DurableStore::new(backend.clone());
        store.save("numbers", &vec![1u32, 2]);

        backend.set_failing(true);
        store.save("numbers", &vec![3u32]);
        let loaded: Vec<u32> = store.load("numbers", Vec::new());
        assert!(loaded.is_empty());

        backend.set_failing(false);
        let loaded: Vec<u32> = store.load("numbers", Vec::new());
        assert_eq!(loaded, vec![1, 2]);
    }
}
