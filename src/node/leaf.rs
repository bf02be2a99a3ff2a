use crate::cache::NodeCache;
use crate::error::TrieError;
use crate::nibbles::matching_prefix_length;

use super::branch::BranchNode;
use super::node_ref::NodeRef;
use super::Node;

/// A node that terminates a key: `path` is the remaining nibble path from
/// this node down to the value, with the terminator flag set on encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    pub path: Vec<u8>,
    pub value: Vec<u8>,
}

impl LeafNode {
    pub fn new(path: Vec<u8>, value: Vec<u8>) -> Self {
        Self { path, value }
    }

    pub fn get(&self, path: &[u8]) -> Vec<u8> {
        if path == self.path.as_slice() {
            self.value.clone()
        } else {
            Vec::new()
        }
    }

    pub fn insert(
        self,
        cache: &mut NodeCache,
        path: &[u8],
        value: Vec<u8>,
    ) -> Result<NodeRef, TrieError> {
        if path == self.path.as_slice() {
            return cache.put(Node::Leaf(LeafNode::new(path.to_vec(), value)));
        }

        let m = matching_prefix_length(&self.path, path);

        // One path can be a strict prefix of the other (e.g. "do" stored,
        // "doge" inserted): then `m` reaches the end of that path without
        // reaching the end of the other, and the value that terminates here
        // goes into the branch's own value slot rather than a child slot.
        let mut children: [NodeRef; 16] = std::array::from_fn(|_| NodeRef::Empty);
        let mut branch_value = Vec::new();

        if m == self.path.len() {
            branch_value = self.value;
        } else {
            let old_slot = self.path[m];
            children[old_slot as usize] =
                cache.put(Node::Leaf(LeafNode::new(self.path[m + 1..].to_vec(), self.value)))?;
        }

        if m == path.len() {
            branch_value = value;
        } else {
            let new_slot = path[m];
            children[new_slot as usize] =
                cache.put(Node::Leaf(LeafNode::new(path[m + 1..].to_vec(), value)))?;
        }

        let branch = cache.put(Node::Branch(Box::new(BranchNode::new(children, branch_value))))?;

        if m == 0 {
            Ok(branch)
        } else {
            super::extension::ExtensionNode::wrap(path[..m].to_vec(), branch, cache)
        }
    }

    /// Returns `(new_ref, removed_value)`. `new_ref` is `NodeRef::Empty` if
    /// the key matched, or this same leaf re-stored unchanged otherwise.
    pub fn remove(
        self,
        cache: &mut NodeCache,
        path: &[u8],
    ) -> Result<(NodeRef, Option<Vec<u8>>), TrieError> {
        if path == self.path.as_slice() {
            Ok((NodeRef::Empty, Some(self.value)))
        } else {
            let unchanged = cache.put(Node::Leaf(self))?;
            Ok((unchanged, None))
        }
    }

    pub fn fields(&self) -> Vec<crate::rlp::RlpItem> {
        vec![
            crate::rlp::RlpItem::Bytes(crate::nibbles::pack_nibbles(&self.path, true)),
            crate::rlp::RlpItem::Bytes(self.value.clone()),
        ]
    }
}
