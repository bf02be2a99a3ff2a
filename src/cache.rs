//! The write-through node cache sitting between the trie engine and the
//! backing store. Every non-inline node passes through here: `put` assigns it
//! a [`NodeRef`], `get` resolves a hash back into a decoded node (reading
//! through to the store on a miss), and `commit`/`undo` implement the trie's
//! transactional semantics.

use std::collections::HashMap;
use std::sync::Arc;

use ethereum_types::H256;

use crate::db::TrieDB;
use crate::error::TrieError;
use crate::hash::keccak;
use crate::node::{Node, NodeRef};

#[derive(Clone)]
struct CacheEntry {
    encoded: Vec<u8>,
    dirty: bool,
}

/// In-memory map from node hash to its encoded bytes, read-through to a
/// [`TrieDB`] and written back only on [`NodeCache::commit`].
///
/// The backing store is held behind an `Arc` so that [`crate::Trie::copy`]
/// can share it across independent caches.
pub struct NodeCache {
    db: Arc<dyn TrieDB>,
    entries: HashMap<H256, CacheEntry>,
}

impl Clone for NodeCache {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            entries: self.entries.clone(),
        }
    }
}

impl NodeCache {
    pub fn new(db: Arc<dyn TrieDB>) -> Self {
        Self {
            db,
            entries: HashMap::new(),
        }
    }

    /// Stores a node, returning a reference to it. Encodings shorter than 32
    /// bytes are returned inline and never touch the cache (invariant: no
    /// cache entry is ever shorter than 32 bytes).
    pub fn put(&mut self, node: Node) -> Result<NodeRef, TrieError> {
        let encoded = node.encode_raw();
        if encoded.len() < 32 {
            return Ok(NodeRef::Inline(Box::new(node)));
        }
        let hash = keccak(&encoded);
        self.entries.entry(hash).or_insert(CacheEntry {
            encoded,
            dirty: true,
        });
        Ok(NodeRef::Hash(hash))
    }

    /// Resolves a hash reference to its decoded node, loading from the
    /// backing store on a cache miss. A hash that resolves to nothing in
    /// either the cache or the store is a hard error: a dangling reference.
    pub fn get(&mut self, hash: H256) -> Result<Node, TrieError> {
        if let Some(entry) = self.entries.get(&hash) {
            return Ok(Node::decode_raw(&entry.encoded)?);
        }
        let Some(encoded) = self.db.get(hash)? else {
            tracing::error!(%hash, "dangling node reference");
            return Err(TrieError::DanglingReference(hash));
        };
        let node = Node::decode_raw(&encoded)?;
        self.entries.insert(
            hash,
            CacheEntry {
                encoded,
                dirty: false,
            },
        );
        Ok(node)
    }

    pub fn delete(&mut self, hash: H256) {
        self.entries.remove(&hash);
    }

    /// Flushes dirty entries to the store and clears their dirty flag.
    pub fn commit(&mut self) -> Result<(), TrieError> {
        let batch: Vec<(H256, Vec<u8>)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.dirty)
            .map(|(h, e)| (*h, e.encoded.clone()))
            .collect();
        if batch.is_empty() {
            return Ok(());
        }
        tracing::debug!(entries = batch.len(), "flushing dirty nodes to store");
        self.db.put_batch(batch)?;
        for entry in self.entries.values_mut() {
            entry.dirty = false;
        }
        Ok(())
    }

    /// Discards every entry created or modified since the last commit.
    pub fn undo(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.dirty);
        tracing::debug!(discarded = before - self.entries.len(), "cache undo");
    }

    /// Iterates over every cached hash, used only by garbage collection.
    pub fn keys(&self) -> impl Iterator<Item = H256> + '_ {
        self.entries.keys().copied()
    }

    /// Drops every cached entry not present in `reachable`.
    pub fn retain_only(&mut self, reachable: &std::collections::HashSet<H256>) {
        self.entries.retain(|h, _| reachable.contains(h));
    }

    /// True iff `hash` resolves within the in-memory cache (does not consult
    /// the backing store).
    pub fn contains(&self, hash: &H256) -> bool {
        self.entries.contains_key(hash)
    }
}
