use crate::cache::NodeCache;
use crate::error::TrieError;
use crate::nibbles::matching_prefix_length;

use super::branch::BranchNode;
use super::leaf::LeafNode;
use super::node_ref::NodeRef;
use super::Node;

/// A node that shares a common path prefix with all of its descendants and
/// points at exactly one child (always a branch, directly or through more
/// extensions collapsed away). `path` never carries the terminator flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionNode {
    pub path: Vec<u8>,
    pub child: NodeRef,
}

impl ExtensionNode {
    pub fn new(path: Vec<u8>, child: NodeRef) -> Self {
        Self { path, child }
    }

    /// Wraps `child` under `path`, or returns `child` unchanged if `path` is
    /// empty (an extension with no path would be a no-op indirection).
    pub fn wrap(
        path: Vec<u8>,
        child: NodeRef,
        cache: &mut NodeCache,
    ) -> Result<NodeRef, TrieError> {
        if path.is_empty() {
            Ok(child)
        } else {
            cache.put(Node::Extension(ExtensionNode::new(path, child)))
        }
    }

    pub fn get(&self, cache: &mut NodeCache, path: &[u8]) -> Result<Vec<u8>, TrieError> {
        if let Some(rest) = path.strip_prefix(self.path.as_slice()) {
            get_at(&self.child, cache, rest)
        } else {
            Ok(Vec::new())
        }
    }

    pub fn insert(
        self,
        cache: &mut NodeCache,
        path: &[u8],
        value: Vec<u8>,
    ) -> Result<NodeRef, TrieError> {
        if let Some(rest) = path.strip_prefix(self.path.as_slice()) {
            let new_child = insert_at(self.child, cache, rest, value)?;
            Self::wrap(self.path, new_child, cache)
        } else {
            let m = matching_prefix_length(&self.path, path);
            // `self.path` is never a prefix of `path` here (that case took
            // the `strip_prefix` branch above), so `m < self.path.len()`
            // always holds and `self.path[m]` is safe. The inserted key's
            // path can still be a strict prefix of `self.path`, though
            // (inserting a key that terminates partway through this
            // extension): then `m == path.len()` and the new value goes
            // into the branch's own value slot rather than a child slot.
            let old_slot = self.path[m];

            let mut children: [NodeRef; 16] = std::array::from_fn(|_| NodeRef::Empty);
            let mut branch_value = Vec::new();

            children[old_slot as usize] =
                Self::wrap(self.path[m + 1..].to_vec(), self.child, cache)?;

            if m == path.len() {
                branch_value = value;
            } else {
                let new_slot = path[m];
                children[new_slot as usize] =
                    cache.put(Node::Leaf(LeafNode::new(path[m + 1..].to_vec(), value)))?;
            }

            let branch =
                cache.put(Node::Branch(Box::new(BranchNode::new(children, branch_value))))?;

            if m == 0 {
                Ok(branch)
            } else {
                Self::wrap(path[..m].to_vec(), branch, cache)
            }
        }
    }

    pub fn remove(
        self,
        cache: &mut NodeCache,
        path: &[u8],
    ) -> Result<(NodeRef, Option<Vec<u8>>), TrieError> {
        let Some(rest) = path.strip_prefix(self.path.as_slice()) else {
            let unchanged = cache.put(Node::Extension(self))?;
            return Ok((unchanged, None));
        };

        let (new_child, removed) = remove_at(self.child, cache, rest)?;
        if removed.is_none() {
            let unchanged = Self::wrap(self.path, new_child, cache)?;
            return Ok((unchanged, None));
        }

        // Collapse: an extension must never point directly at another
        // leaf/extension, so merge paths whenever the child collapsed to one.
        let collapsed = match new_child.resolve(cache)? {
            Some(Node::Leaf(child_leaf)) => {
                let merged = [self.path.as_slice(), &child_leaf.path].concat();
                cache.put(Node::Leaf(LeafNode::new(merged, child_leaf.value)))?
            }
            Some(Node::Extension(child_ext)) => {
                let merged = [self.path.as_slice(), &child_ext.path].concat();
                Self::wrap(merged, child_ext.child, cache)?
            }
            _ => Self::wrap(self.path, new_child, cache)?,
        };
        Ok((collapsed, removed))
    }

    pub fn fields(&self) -> Vec<crate::rlp::RlpItem> {
        vec![
            crate::rlp::RlpItem::Bytes(crate::nibbles::pack_nibbles(&self.path, false)),
            self.child.to_item(),
        ]
    }
}

// These free functions close the mutual-recursion loop between node kinds
// without pulling `Node::get/insert/remove` into every node submodule.
pub(super) fn get_at(
    node_ref: &NodeRef,
    cache: &mut NodeCache,
    path: &[u8],
) -> Result<Vec<u8>, TrieError> {
    match node_ref.resolve(cache)? {
        None => Ok(Vec::new()),
        Some(Node::Leaf(leaf)) => Ok(leaf.get(path)),
        Some(Node::Extension(ext)) => ext.get(cache, path),
        Some(Node::Branch(branch)) => branch.get(cache, path),
    }
}

pub(super) fn insert_at(
    node_ref: NodeRef,
    cache: &mut NodeCache,
    path: &[u8],
    value: Vec<u8>,
) -> Result<NodeRef, TrieError> {
    match node_ref.resolve(cache)? {
        None => cache.put(Node::Leaf(LeafNode::new(path.to_vec(), value))),
        Some(Node::Leaf(leaf)) => leaf.insert(cache, path, value),
        Some(Node::Extension(ext)) => ext.insert(cache, path, value),
        Some(Node::Branch(branch)) => branch.insert(cache, path, value),
    }
}

pub(super) fn remove_at(
    node_ref: NodeRef,
    cache: &mut NodeCache,
    path: &[u8],
) -> Result<(NodeRef, Option<Vec<u8>>), TrieError> {
    match node_ref.resolve(cache)? {
        None => Ok((NodeRef::Empty, None)),
        Some(Node::Leaf(leaf)) => leaf.remove(cache, path),
        Some(Node::Extension(ext)) => ext.remove(cache, path),
        Some(Node::Branch(branch)) => branch.remove(cache, path),
    }
}
