use crate::cache::NodeCache;
use crate::error::TrieError;

use super::extension::{get_at, insert_at, remove_at, ExtensionNode};
use super::leaf::LeafNode;
use super::node_ref::NodeRef;
use super::Node;

/// A node with 16 child slots keyed by the next nibble, plus an optional
/// value attached to the key that terminates exactly at this branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub children: [NodeRef; 16],
    pub value: Vec<u8>,
}

impl BranchNode {
    pub fn new(children: [NodeRef; 16], value: Vec<u8>) -> Self {
        Self { children, value }
    }

    pub fn get(&self, cache: &mut NodeCache, path: &[u8]) -> Result<Vec<u8>, TrieError> {
        match path.split_first() {
            None => Ok(self.value.clone()),
            Some((&nibble, rest)) => get_at(&self.children[nibble as usize], cache, rest),
        }
    }

    pub fn insert(
        mut self,
        cache: &mut NodeCache,
        path: &[u8],
        value: Vec<u8>,
    ) -> Result<NodeRef, TrieError> {
        match path.split_first() {
            None => self.value = value,
            Some((&nibble, rest)) => {
                let slot = std::mem::take(&mut self.children[nibble as usize]);
                self.children[nibble as usize] = insert_at(slot, cache, rest, value)?;
            }
        }
        cache.put(Node::Branch(Box::new(self)))
    }

    pub fn remove(
        mut self,
        cache: &mut NodeCache,
        path: &[u8],
    ) -> Result<(NodeRef, Option<Vec<u8>>), TrieError> {
        let removed = match path.split_first() {
            None => {
                if self.value.is_empty() {
                    None
                } else {
                    Some(std::mem::take(&mut self.value))
                }
            }
            Some((&nibble, rest)) => {
                let slot = std::mem::take(&mut self.children[nibble as usize]);
                let (new_child, removed) = remove_at(slot, cache, rest)?;
                self.children[nibble as usize] = new_child;
                removed
            }
        };

        if removed.is_none() {
            let unchanged = cache.put(Node::Branch(Box::new(self)))?;
            return Ok((unchanged, None));
        }

        self.collapse(cache).map(|new_ref| (new_ref, removed))
    }

    /// Enforces invariant 7: a branch with exactly one non-empty slot (among
    /// its 16 children and its value) is not canonical and must collapse
    /// into a single leaf/extension, or vanish entirely if it has none.
    fn collapse(self, cache: &mut NodeCache) -> Result<NodeRef, TrieError> {
        let nonempty: Vec<usize> = (0..16)
            .filter(|&i| !self.children[i].is_empty())
            .collect();
        let has_value = !self.value.is_empty();

        match (nonempty.len(), has_value) {
            (0, false) => Ok(NodeRef::Empty),
            (0, true) => cache.put(Node::Leaf(LeafNode::new(Vec::new(), self.value))),
            (1, false) => {
                let i = nonempty[0];
                let BranchNode { mut children, .. } = self;
                let child_ref = std::mem::take(&mut children[i]);
                match child_ref.resolve(cache)? {
                    Some(Node::Leaf(child_leaf)) => {
                        let mut merged = vec![i as u8];
                        merged.extend_from_slice(&child_leaf.path);
                        cache.put(Node::Leaf(LeafNode::new(merged, child_leaf.value)))
                    }
                    Some(Node::Extension(child_ext)) => {
                        let mut merged = vec![i as u8];
                        merged.extend_from_slice(&child_ext.path);
                        ExtensionNode::wrap(merged, child_ext.child, cache)
                    }
                    Some(Node::Branch(_)) => {
                        ExtensionNode::wrap(vec![i as u8], child_ref, cache)
                    }
                    None => unreachable!("nonempty slot resolved to no node"),
                }
            }
            _ => cache.put(Node::Branch(Box::new(self))),
        }
    }

    pub fn fields(&self) -> Vec<crate::rlp::RlpItem> {
        let mut items: Vec<crate::rlp::RlpItem> =
            self.children.iter().map(|c| c.to_item()).collect();
        items.push(crate::rlp::RlpItem::Bytes(self.value.clone()));
        items
    }
}
