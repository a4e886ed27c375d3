use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Data;
use crate::utils::{LiveError, LiveResult};

pub trait SessionStore: Send + Sync {
    /// Merges `partial` into the stored state key by key.
    fn set(&self, partial: Data) -> LiveResult<()>;

    fn get(&self, key: &str) -> Option<Value>;

    /// Decodes the value stored under `key`.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> LiveResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| LiveError::Session(format!("decode {key}: {e}"))),
            None => Ok(None),
        }
    }
}

/// Session state kept in process memory behind a reader/writer lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<Data>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Data {
        self.data.read().clone()
    }
}

impl SessionStore for InMemoryStore {
    fn set(&self, partial: Data) -> LiveResult<()> {
        let mut data = self.data.write();
        for (k, v) in partial {
            data.insert(k, v);
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }
}
