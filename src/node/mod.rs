//! The three node kinds of a Modified Merkle Patricia Trie, and the
//! reference type that glues them together.

pub mod branch;
pub mod extension;
pub mod leaf;
pub mod node_ref;

pub use branch::BranchNode;
pub use extension::ExtensionNode;
pub use leaf::LeafNode;
pub use node_ref::NodeRef;

use crate::error::TrieError;
use crate::rlp::RlpItem;

/// A node in the trie. Canonical shape is enforced entirely by the insert
/// and delete collapse rules, not by this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(LeafNode),
    Extension(ExtensionNode),
    Branch(Box<BranchNode>),
}

impl Node {
    fn fields(&self) -> Vec<RlpItem> {
        match self {
            Node::Leaf(n) => n.fields(),
            Node::Extension(n) => n.fields(),
            Node::Branch(n) => n.fields(),
        }
    }

    /// This node's own item tree: a 2-item list for leaf/extension, a
    /// 17-item list for branch.
    pub fn to_item(&self) -> RlpItem {
        RlpItem::List(self.fields())
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        self.to_item().encode()
    }

    pub fn decode_raw(bytes: &[u8]) -> Result<Self, TrieError> {
        let item = RlpItem::decode(bytes)?;
        Self::from_item(&item)
    }

    fn from_item(item: &RlpItem) -> Result<Self, TrieError> {
        match item.len() {
            2 if item.is_list() => {
                let path_item = item.get(0).expect("checked len");
                let path_bytes = path_item
                    .as_bytes()
                    .ok_or(crate::rlp::RlpDecodeError::InvalidLength)?;
                let (path, is_leaf) = crate::nibbles::unpack_nibbles(path_bytes);
                if is_leaf {
                    let value = item
                        .get(1)
                        .and_then(|v| v.as_bytes())
                        .ok_or(crate::rlp::RlpDecodeError::InvalidLength)?
                        .to_vec();
                    Ok(Node::Leaf(LeafNode::new(path, value)))
                } else {
                    let child = NodeRef::from_item(item.get(1).expect("checked len"))?;
                    Ok(Node::Extension(ExtensionNode::new(path, child)))
                }
            }
            17 if item.is_list() => {
                let mut children: [NodeRef; 16] = std::array::from_fn(|_| NodeRef::Empty);
                for (i, slot) in children.iter_mut().enumerate() {
                    *slot = NodeRef::from_item(item.get(i).expect("checked len"))?;
                }
                let value = item
                    .get(16)
                    .and_then(|v| v.as_bytes())
                    .ok_or(crate::rlp::RlpDecodeError::InvalidLength)?
                    .to_vec();
                Ok(Node::Branch(Box::new(BranchNode::new(children, value))))
            }
            _ => Err(crate::rlp::RlpDecodeError::InvalidLength.into()),
        }
    }

    /// All child references that point into the cache/store (i.e. not
    /// inline, not empty), used by garbage collection to walk reachability.
    pub fn hashed_children(&self) -> Vec<ethereum_types::H256> {
        let refs: Vec<&NodeRef> = match self {
            Node::Leaf(_) => vec![],
            Node::Extension(n) => vec![&n.child],
            Node::Branch(n) => n.children.iter().collect(),
        };
        refs.into_iter()
            .filter_map(|r| match r {
                NodeRef::Hash(h) => Some(*h),
                _ => None,
            })
            .collect()
    }
}
