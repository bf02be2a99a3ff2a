//! Deterministic in-order traversal of a trie's live key/value pairs.

use crate::cache::NodeCache;
use crate::error::TrieError;
use crate::node::{Node, NodeRef};

enum WorkItem {
    /// A subtree still to be expanded, rooted at `prefix`.
    Node(Vec<u8>, NodeRef),
    /// A value ready to be yielded once popped.
    Value(Vec<u8>, Vec<u8>),
}

/// Yields `(key, value)` pairs in ascending order of their nibble path
/// (including the implicit terminator, so a value terminating exactly at a
/// branch sorts *after* all of that branch's deeper children — nibble 16
/// exceeds any real nibble).
pub struct TrieIterator<'a> {
    cache: &'a mut NodeCache,
    stack: Vec<WorkItem>,
}

impl<'a> TrieIterator<'a> {
    pub(crate) fn new(cache: &'a mut NodeCache, root: NodeRef) -> Self {
        let stack = if root.is_empty() {
            Vec::new()
        } else {
            vec![WorkItem::Node(Vec::new(), root)]
        };
        Self { cache, stack }
    }
}

impl Iterator for TrieIterator<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>), TrieError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                WorkItem::Value(prefix, value) => {
                    return Some(nibbles_to_bytes(&prefix).map(|key| (key, value)));
                }
                WorkItem::Node(prefix, node_ref) => {
                    let node = match node_ref.resolve(self.cache) {
                        Ok(Some(node)) => node,
                        Ok(None) => continue,
                        Err(e) => return Some(Err(e)),
                    };
                    match node {
                        Node::Leaf(leaf) => {
                            let mut full = prefix;
                            full.extend_from_slice(&leaf.path);
                            return Some(nibbles_to_bytes(&full).map(|key| (key, leaf.value)));
                        }
                        Node::Extension(ext) => {
                            let mut full = prefix;
                            full.extend_from_slice(&ext.path);
                            self.stack.push(WorkItem::Node(full, ext.child));
                        }
                        Node::Branch(branch) => {
                            if !branch.value.is_empty() {
                                self.stack
                                    .push(WorkItem::Value(prefix.clone(), branch.value));
                            }
                            for nibble in (0..16u8).rev() {
                                let child = &branch.children[nibble as usize];
                                if !child.is_empty() {
                                    let mut child_prefix = prefix.clone();
                                    child_prefix.push(nibble);
                                    self.stack
                                        .push(WorkItem::Node(child_prefix, child.clone()));
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn nibbles_to_bytes(nibbles: &[u8]) -> Result<Vec<u8>, TrieError> {
    if nibbles.len() % 2 != 0 {
        return Err(TrieError::DecodeFailure(
            crate::rlp::RlpDecodeError::InvalidLength,
        ));
    }
    Ok(nibbles
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}
