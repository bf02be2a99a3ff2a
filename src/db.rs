//! The backing store: a byte-addressable persistent map from content hash to
//! RLP-encoded node bytes. Durability is entirely the implementation's concern;
//! the trie only ever calls `get`/`put`/`delete`.

use ethereum_types::H256;

use crate::error::TrieError;

pub trait TrieDB: Send + Sync {
    fn get(&self, key: H256) -> Result<Option<Vec<u8>>, TrieError>;
    fn put(&self, key: H256, value: Vec<u8>) -> Result<(), TrieError>;
    fn put_batch(&self, key_values: Vec<(H256, Vec<u8>)>) -> Result<(), TrieError>;
    fn delete(&self, key: H256) -> Result<(), TrieError>;
}

/// An in-memory `TrieDB`, useful for tests and ephemeral tries.
#[derive(Default)]
pub struct InMemoryTrieDB {
    inner: std::sync::Mutex<std::collections::HashMap<H256, Vec<u8>>>,
}

impl InMemoryTrieDB {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrieDB for InMemoryTrieDB {
    fn get(&self, key: H256) -> Result<Option<Vec<u8>>, TrieError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| TrieError::StoreIOFailure("lock poisoned".into()))?;
        Ok(guard.get(&key).cloned())
    }

    fn put(&self, key: H256, value: Vec<u8>) -> Result<(), TrieError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| TrieError::StoreIOFailure("lock poisoned".into()))?;
        guard.insert(key, value);
        Ok(())
    }

    fn put_batch(&self, key_values: Vec<(H256, Vec<u8>)>) -> Result<(), TrieError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| TrieError::StoreIOFailure("lock poisoned".into()))?;
        for (key, value) in key_values {
            guard.insert(key, value);
        }
        Ok(())
    }

    fn delete(&self, key: H256) -> Result<(), TrieError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| TrieError::StoreIOFailure("lock poisoned".into()))?;
        guard.remove(&key);
        Ok(())
    }
}
