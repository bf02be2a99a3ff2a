use ethereum_types::H256;

use crate::cache::NodeCache;
use crate::error::TrieError;
use crate::rlp::RlpItem;

use super::Node;

/// A reference to a child node, as described by the canonical child reference
/// discipline: nodes whose encoding is shorter than 32 bytes are embedded
/// verbatim; larger nodes are referenced by hash; a missing child is the
/// empty sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRef {
    /// No child.
    Empty,
    /// The child's encoding is under 32 bytes; it is embedded directly.
    Inline(Box<Node>),
    /// The child is stored in the cache/store under this hash.
    Hash(H256),
}

impl Default for NodeRef {
    fn default() -> Self {
        NodeRef::Empty
    }
}

impl NodeRef {
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeRef::Empty)
    }

    /// Resolves this reference to its node, reading through the cache (and,
    /// transitively, the backing store) for hash references.
    pub fn resolve(&self, cache: &mut NodeCache) -> Result<Option<Node>, TrieError> {
        match self {
            NodeRef::Empty => Ok(None),
            NodeRef::Inline(node) => Ok(Some((**node).clone())),
            NodeRef::Hash(hash) => cache.get(*hash).map(Some),
        }
    }

    /// Encodes this reference as it appears in a parent node's item list:
    /// the empty string, a 32-byte hash, or the child's own item tree nested
    /// directly (for inline children).
    pub fn to_item(&self) -> RlpItem {
        match self {
            NodeRef::Empty => RlpItem::Bytes(Vec::new()),
            NodeRef::Inline(node) => node.to_item(),
            NodeRef::Hash(hash) => RlpItem::Bytes(hash.as_bytes().to_vec()),
        }
    }

    /// Builds a `NodeRef` from a decoded child item.
    pub fn from_item(item: &RlpItem) -> Result<Self, TrieError> {
        match item {
            RlpItem::Bytes(b) if b.is_empty() => Ok(NodeRef::Empty),
            RlpItem::Bytes(b) if b.len() == 32 => Ok(NodeRef::Hash(H256::from_slice(b))),
            RlpItem::List(_) => Ok(NodeRef::Inline(Box::new(Node::from_item(item)?))),
            RlpItem::Bytes(_) => Err(TrieError::DecodeFailure(
                crate::rlp::RlpDecodeError::InvalidLength,
            )),
        }
    }
}
