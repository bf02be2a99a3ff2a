//! A Modified Merkle Patricia Trie: a persistent, content-addressed mapping
//! from byte-string keys to byte-string values, authenticated by a single
//! 32-byte root hash. Equal key/value sets always produce the same root
//! hash regardless of insertion order; any change to the set changes it.
//!
//! ```
//! use patricia_trie::{InMemoryTrieDB, Trie};
//! use std::sync::Arc;
//!
//! let mut trie = Trie::new(Arc::new(InMemoryTrieDB::new()));
//! trie.update(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
//! assert_eq!(trie.get(b"dog").unwrap(), b"puppy");
//! ```

pub mod cache;
pub mod db;
pub mod error;
pub mod hash;
pub mod iter;
pub mod nibbles;
pub mod node;
pub mod rlp;

use std::sync::Arc;

use ethereum_types::H256;

pub use db::{InMemoryTrieDB, TrieDB};
pub use error::TrieError;
pub use hash::EMPTY_TRIE_HASH;
pub use iter::TrieIterator;

use cache::NodeCache;
use hash::keccak;
use node::extension::{get_at, insert_at, remove_at};
use node::NodeRef;

/// An Ethereum-compatible Modified Merkle Patricia Trie.
pub struct Trie {
    /// Reference to the current root node.
    root: NodeRef,
    /// Root as of the last `sync`, restored by `undo`.
    prev_root: NodeRef,
    cache: NodeCache,
}

impl Trie {
    /// Creates an empty trie backed by `db`.
    pub fn new(db: Arc<dyn TrieDB>) -> Self {
        Self {
            root: NodeRef::Empty,
            prev_root: NodeRef::Empty,
            cache: NodeCache::new(db),
        }
    }

    /// Opens a trie at a previously computed root hash.
    pub fn open(db: Arc<dyn TrieDB>, root: H256) -> Self {
        let root_ref = if root == *EMPTY_TRIE_HASH {
            NodeRef::Empty
        } else {
            NodeRef::Hash(root)
        };
        Self {
            root: root_ref.clone(),
            prev_root: root_ref,
            cache: NodeCache::new(db),
        }
    }

    /// Looks up `key`, returning its value or an empty vector if absent.
    /// A missing key is not an error.
    pub fn get(&mut self, key: &[u8]) -> Result<Vec<u8>, TrieError> {
        let path = nibbles::bin_to_nibbles(key);
        get_at(&self.root, &mut self.cache, &path)
    }

    /// Inserts or overwrites `key`'s value. An empty value is equivalent to
    /// deleting the key.
    pub fn update(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), TrieError> {
        if value.is_empty() {
            return self.delete(&key);
        }
        let path = nibbles::bin_to_nibbles(&key);
        let root = std::mem::take(&mut self.root);
        self.root = insert_at(root, &mut self.cache, &path, value)?;
        Ok(())
    }

    /// Removes `key`, if present. Absence is not an error.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), TrieError> {
        let path = nibbles::bin_to_nibbles(key);
        let root = std::mem::take(&mut self.root);
        let (new_root, _removed) = remove_at(root, &mut self.cache, &path)?;
        self.root = new_root;
        Ok(())
    }

    /// The current root hash. `EMPTY_TRIE_HASH` iff the trie holds no keys.
    pub fn root_hash(&self) -> H256 {
        match &self.root {
            NodeRef::Empty => *EMPTY_TRIE_HASH,
            NodeRef::Inline(node) => keccak(&node.encode_raw()),
            NodeRef::Hash(hash) => *hash,
        }
    }

    /// Switches the working root. `root` must be empty (the empty trie) or
    /// exactly 32 bytes (a previously computed root hash).
    pub fn set_root(&mut self, root: &[u8]) -> Result<(), TrieError> {
        self.root = match root.len() {
            0 => NodeRef::Empty,
            32 if root == EMPTY_TRIE_HASH.as_bytes() => NodeRef::Empty,
            32 => NodeRef::Hash(H256::from_slice(root)),
            _ => return Err(TrieError::DecodeFailure(rlp::RlpDecodeError::InvalidLength)),
        };
        Ok(())
    }

    /// Commits dirty cache entries to the backing store and advances the
    /// undo checkpoint to the current root.
    pub fn sync(&mut self) -> Result<(), TrieError> {
        self.cache.commit()?;
        self.prev_root = self.root.clone();
        Ok(())
    }

    /// Discards every mutation since the last `sync`, restoring the root to
    /// its value at that point.
    pub fn undo(&mut self) {
        self.cache.undo();
        self.root = self.prev_root.clone();
    }

    /// An independent trie sharing this one's backing store but owning its
    /// own cache; mutating either does not affect the other's cache.
    pub fn copy(&self) -> Self {
        Self {
            root: self.root.clone(),
            prev_root: self.prev_root.clone(),
            cache: self.cache.clone(),
        }
    }

    /// Reclaims cache entries unreachable from the current root. Not
    /// thread-safe: callers must ensure no concurrent writer is active.
    pub fn clean_cache(&mut self) -> Result<(), TrieError> {
        let mut reachable = std::collections::HashSet::new();
        if let NodeRef::Hash(root_hash) = &self.root {
            self.scan_tree(*root_hash, &mut reachable)?;
        }
        tracing::debug!(reachable = reachable.len(), "sweeping unreachable nodes");
        self.cache.retain_only(&reachable);
        Ok(())
    }

    fn scan_tree(
        &mut self,
        hash: H256,
        reachable: &mut std::collections::HashSet<H256>,
    ) -> Result<(), TrieError> {
        if !reachable.insert(hash) {
            return Ok(());
        }
        let node = self.cache.get(hash)?;
        for child_hash in node.hashed_children() {
            self.scan_tree(child_hash, reachable)?;
        }
        Ok(())
    }

    /// Root-hash equality between two tries.
    pub fn equals(&self, other: &Trie) -> bool {
        self.root_hash() == other.root_hash()
    }

    /// True iff the current root is resolvable, reading through to the
    /// backing store if it has been evicted from the in-memory cache.
    pub fn validate(&mut self) -> bool {
        match &self.root {
            NodeRef::Empty | NodeRef::Inline(_) => true,
            NodeRef::Hash(hash) => self.cache.get(*hash).is_ok(),
        }
    }

    /// An in-order iterator over every live `(key, value)` pair.
    pub fn iterator(&mut self) -> TrieIterator<'_> {
        TrieIterator::new(&mut self.cache, self.root.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;
    use proptest::{
        collection::{btree_set, vec},
        prelude::*,
    };

    fn new_temp() -> Trie {
        Trie::new(Arc::new(InMemoryTrieDB::new()))
    }

    #[test]
    fn empty_trie_root_is_the_empty_hash() {
        let trie = new_temp();
        assert_eq!(trie.root_hash(), *EMPTY_TRIE_HASH);
        assert_eq!(
            trie.root_hash().as_bytes(),
            hex!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421")
        );
    }

    #[test]
    fn get_insert_words() {
        let mut trie = new_temp();
        assert_eq!(trie.get(b"first").unwrap(), Vec::<u8>::new());
        trie.update(b"first".to_vec(), b"value_a".to_vec()).unwrap();
        trie.update(b"second".to_vec(), b"value_b".to_vec()).unwrap();
        assert_eq!(trie.get(b"first").unwrap(), b"value_a");
        assert_eq!(trie.get(b"second").unwrap(), b"value_b");
    }

    #[test]
    fn get_insert_shares_a_branch() {
        let mut trie = new_temp();
        trie.update(vec![0x16], vec![0]).unwrap();
        trie.update(vec![0x16, 0x00], vec![1]).unwrap();
        assert_eq!(trie.get(&[0x16]).unwrap(), vec![0]);
        assert_eq!(trie.get(&[0x16, 0x00]).unwrap(), vec![1]);
    }

    #[test]
    fn get_insert_many() {
        let mut trie = new_temp();
        let entries: Vec<Vec<u8>> = vec![
            vec![26, 192, 44, 251],
            vec![195, 132, 220, 124, 112, 201, 70, 128, 235],
            vec![126, 138, 25, 245, 146],
            vec![129, 176, 66, 2, 150, 151, 180, 60, 124],
            vec![138, 101, 157],
        ];
        for entry in &entries {
            trie.update(entry.clone(), entry.clone()).unwrap();
        }
        for entry in &entries {
            assert_eq!(trie.get(entry).unwrap(), *entry);
        }
    }

    #[test]
    fn insert_key_that_is_a_prefix_of_an_existing_leaf() {
        let mut trie = new_temp();
        trie.update(b"doge".to_vec(), b"coin".to_vec()).unwrap();
        trie.update(b"do".to_vec(), b"verb".to_vec()).unwrap();
        assert_eq!(trie.get(b"doge").unwrap(), b"coin");
        assert_eq!(trie.get(b"do").unwrap(), b"verb");
    }

    #[test]
    fn insert_key_for_which_an_existing_leaf_is_a_prefix() {
        let mut trie = new_temp();
        trie.update(b"do".to_vec(), b"verb".to_vec()).unwrap();
        trie.update(b"doge".to_vec(), b"coin".to_vec()).unwrap();
        assert_eq!(trie.get(b"do").unwrap(), b"verb");
        assert_eq!(trie.get(b"doge").unwrap(), b"coin");
    }

    #[test]
    fn insert_key_terminating_inside_an_existing_extension() {
        let mut trie = new_temp();
        // Nibble paths [0,1,2,3,4,5] and [0,1,2,3,6,7]: share a 4-nibble
        // prefix, so this collapses to Extension([0,1,2,3]) -> Branch.
        trie.update(vec![0x01, 0x23, 0x45], b"a".to_vec()).unwrap();
        trie.update(vec![0x01, 0x23, 0x67], b"b".to_vec()).unwrap();
        // This key's nibble path [0,1] is a strict prefix of the extension's
        // stored path [0,1,2,3]: it terminates partway through the
        // extension rather than at the branch the extension points to.
        trie.update(vec![0x01], b"c".to_vec()).unwrap();

        assert_eq!(trie.get(&[0x01, 0x23, 0x45]).unwrap(), b"a");
        assert_eq!(trie.get(&[0x01, 0x23, 0x67]).unwrap(), b"b");
        assert_eq!(trie.get(&[0x01]).unwrap(), b"c");
    }

    // E1: root hash of a known multi-key trie, matching the canonical
    // go-ethereum/cita-trie test vector for this exact key set.
    #[test]
    fn e1_known_root_hash() {
        let mut trie = new_temp();
        trie.update(b"do".to_vec(), b"verb".to_vec()).unwrap();
        trie.update(b"horse".to_vec(), b"stallion".to_vec())
            .unwrap();
        trie.update(b"doge".to_vec(), b"coin".to_vec()).unwrap();
        trie.update(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        assert_eq!(
            trie.root_hash().as_bytes(),
            hex!("5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84")
        );
    }

    // E2: inserting then deleting the only key restores the empty root.
    #[test]
    fn e2_insert_then_delete_restores_empty_root() {
        let mut trie = new_temp();
        trie.update(b"foo".to_vec(), b"bar".to_vec()).unwrap();
        assert_ne!(trie.root_hash(), *EMPTY_TRIE_HASH);
        trie.delete(b"foo").unwrap();
        assert_eq!(trie.root_hash(), *EMPTY_TRIE_HASH);
    }

    // E3: re-inserting a key overwrites its value and matches a trie that
    // only ever saw the final value.
    #[test]
    fn e3_overwrite_matches_fresh_trie() {
        let mut trie = new_temp();
        trie.update(b"k".to_vec(), b"v1".to_vec()).unwrap();
        trie.update(b"k".to_vec(), b"v2".to_vec()).unwrap();
        assert_eq!(trie.get(b"k").unwrap(), b"v2");

        let mut fresh = new_temp();
        fresh.update(b"k".to_vec(), b"v2".to_vec()).unwrap();
        assert!(trie.equals(&fresh));
    }

    // E4: insertion order does not affect the resulting root hash.
    #[test]
    fn e4_insertion_order_is_irrelevant() {
        let pairs = [(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec()), (b"c".to_vec(), b"3".to_vec())];
        let orders: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let mut roots = Vec::new();
        for order in orders {
            let mut trie = new_temp();
            for i in order {
                let (k, v) = &pairs[i];
                trie.update(k.clone(), v.clone()).unwrap();
            }
            roots.push(trie.root_hash());
        }
        assert!(roots.windows(2).all(|w| w[0] == w[1]));
    }

    // E5: undo reverts to the root as of the last sync.
    #[test]
    fn e5_undo_reverts_uncommitted_mutations() {
        let mut trie = new_temp();
        trie.update(b"k".to_vec(), b"v".to_vec()).unwrap();
        trie.sync().unwrap();
        let committed_root = trie.root_hash();

        trie.undo();
        assert_eq!(trie.root_hash(), committed_root);
        assert_eq!(trie.get(b"k").unwrap(), b"v");

        trie.update(b"k".to_vec(), b"w".to_vec()).unwrap();
        assert_eq!(trie.get(b"k").unwrap(), b"w");
        trie.undo();
        assert_eq!(trie.root_hash(), committed_root);
        assert_eq!(trie.get(b"k").unwrap(), b"v");
    }

    // E6: GC never discards a node reachable from the current root.
    #[test]
    fn e6_clean_cache_preserves_all_live_keys() {
        use rand::RngCore;
        let mut rng = rand::rng();
        let mut trie = new_temp();
        let mut entries = Vec::new();
        for _ in 0..1000 {
            let mut key = vec![0u8; 8];
            let mut value = vec![0u8; 16];
            rng.fill_bytes(&mut key);
            rng.fill_bytes(&mut value);
            trie.update(key.clone(), value.clone()).unwrap();
            entries.push((key, value));
        }
        trie.sync().unwrap();
        trie.clean_cache().unwrap();
        for (key, value) in &entries {
            assert_eq!(trie.get(key).unwrap(), *value);
        }
    }

    #[test]
    fn clean_cache_drops_orphaned_nodes() {
        // Values long enough that the leaf's encoding clears the 32-byte
        // inline threshold and actually lands in the cache.
        let key = vec![0x11; 40];
        let mut trie = new_temp();
        trie.update(key.clone(), vec![0x22; 40]).unwrap();
        trie.sync().unwrap();
        let before = trie.cache.keys().count();

        trie.update(key.clone(), vec![0x33; 40]).unwrap();
        trie.sync().unwrap();
        let after_overwrite = trie.cache.keys().count();
        assert!(after_overwrite > before);

        trie.clean_cache().unwrap();
        assert_eq!(trie.cache.keys().count(), before);
        assert_eq!(trie.get(&key).unwrap(), vec![0x33; 40]);
    }

    #[test]
    fn validate_detects_an_evicted_root() {
        let db = Arc::new(InMemoryTrieDB::new());
        let mut trie = Trie::new(db.clone());
        // Key/value sized so the leaf's RLP encoding exceeds the 32-byte
        // inline threshold, forcing a Hash root rather than an Inline one.
        trie.update(vec![0xab; 40], vec![0xcd; 40]).unwrap();
        trie.sync().unwrap();
        assert!(trie.validate());

        let root = trie.root_hash();
        let mut reopened = Trie::open(db, root);
        assert!(reopened.validate());
    }

    #[test]
    fn copy_shares_the_store_but_not_the_cache() {
        let mut trie = new_temp();
        trie.update(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        let mut copy = trie.copy();
        assert!(trie.equals(&copy));

        copy.update(b"dog".to_vec(), b"biscuit".to_vec()).unwrap();
        assert_eq!(trie.get(b"dog").unwrap(), b"puppy");
        assert_eq!(copy.get(b"dog").unwrap(), b"biscuit");
    }

    #[test]
    fn iterator_yields_keys_in_ascending_nibble_order() {
        let mut trie = new_temp();
        let keys: [&[u8]; 4] = [b"doge", b"dog", b"do", b"horse"];
        for key in keys {
            trie.update(key.to_vec(), key.to_vec()).unwrap();
        }
        let collected: Vec<Vec<u8>> = trie
            .iterator()
            .map(|entry| entry.unwrap().0)
            .collect();
        let mut expected: Vec<Vec<u8>> = keys.iter().map(|k| k.to_vec()).collect();
        expected.sort();
        assert_eq!(collected, expected);
    }

    #[test]
    fn set_root_rejects_malformed_lengths() {
        let mut trie = new_temp();
        assert!(trie.set_root(&[0u8; 31]).is_err());
        assert!(trie.set_root(&[0u8; 33]).is_err());
        assert!(trie.set_root(&[]).is_ok());
    }

    proptest! {
        #[test]
        fn round_trip_insert_then_get(data in btree_set(vec(any::<u8>(), 1..64), 1..80)) {
            let mut trie = new_temp();
            for val in data.iter() {
                trie.update(val.clone(), val.clone()).unwrap();
            }
            for val in data.iter() {
                prop_assert_eq!(trie.get(val).unwrap(), val.clone());
            }
        }

        #[test]
        fn delete_is_the_inverse_of_insert(data in btree_set(vec(any::<u8>(), 1..64), 1..80)) {
            let mut trie = new_temp();
            let root_before = trie.root_hash();
            for val in data.iter() {
                trie.update(val.clone(), val.clone()).unwrap();
            }
            for val in data.iter() {
                trie.delete(val).unwrap();
            }
            prop_assert_eq!(trie.root_hash(), root_before);
        }

        #[test]
        fn removals_leave_surviving_keys_intact(
            mut data in vec((vec(any::<u8>(), 4..64), any::<bool>()), 1..80)
        ) {
            data.sort_by_key(|(val, _)| val.clone());
            data.dedup_by_key(|(val, _)| val.clone());

            let mut trie = new_temp();
            for (val, _) in data.iter() {
                trie.update(val.clone(), val.clone()).unwrap();
            }
            for (val, should_remove) in data.iter() {
                if *should_remove {
                    trie.delete(val).unwrap();
                }
            }
            for (val, removed) in data.iter() {
                if *removed {
                    prop_assert_eq!(trie.get(val).unwrap(), Vec::<u8>::new());
                } else {
                    prop_assert_eq!(trie.get(val).unwrap(), val.clone());
                }
            }
        }
    }
}
