//! Keccak-256 digest used to content-address non-inline nodes.

use ethereum_types::H256;
use sha3::{Digest, Keccak256};

/// Keccak-256 hash of `bytes`.
pub fn keccak(bytes: &[u8]) -> H256 {
    H256::from_slice(Keccak256::new().chain_update(bytes).finalize().as_slice())
}

lazy_static::lazy_static! {
    /// Root hash of a trie holding no key/value pairs: `keccak(rlp(""))`.
    pub static ref EMPTY_TRIE_HASH: H256 = keccak(&crate::rlp::encode_bytes(&[]));
}
