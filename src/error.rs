use ethereum_types::H256;
use thiserror::Error;

/// Errors raised by trie operations.
///
/// A lookup for a key that simply isn't present is *not* an error: `get`
/// returns an empty value for that case. Everything here signals that the
/// operation could not be carried out at all.
#[derive(Debug, Error)]
pub enum TrieError {
    #[error("malformed key: keys must be non-null byte sequences")]
    MalformedKey,
    #[error("dangling reference: node with hash {0:#x} not found in cache or store")]
    DanglingReference(H256),
    #[error("failed to decode node: {0}")]
    DecodeFailure(#[from] crate::rlp::RlpDecodeError),
    #[error("backing store I/O failure: {0}")]
    StoreIOFailure(String),
}
