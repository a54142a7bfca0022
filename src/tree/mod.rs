//! # Composite tree traversal.
//!
//! [`Composite`] is implemented by any node type that owns its children through `Arc`
//! and keeps a non-owning link to its parent. It provides depth, ancestry, a lazy
//! pre-order traversal and a text rendering on top of two accessors.
//!
//! ## Traversal
//! ```text
//! root            iter(): root, a, a1, a2, b
//! ├─ a            level(): root=0, a=1, a1=2
//! │  ├─ a1        parents(a1): [a, root]
//! │  └─ a2
//! └─ b
//! ```
//!
//! Structural mutation (add/prepend/remove) lives on the concrete node type, which
//! knows how to maintain its own invariants.

use std::fmt;
use std::sync::Arc;

/// Parent/child structure with read-only traversal helpers.
pub trait Composite: fmt::Display + Sized {
    /// The parent, if the node is attached.
    fn parent(&self) -> Option<Arc<Self>>;

    /// A snapshot of the children, in document order.
    fn children(&self) -> Vec<Arc<Self>>;

    /// Number of ancestors (root = 0).
    fn level(&self) -> usize {
        let mut count = 0;
        let mut cur = self.parent();
        while let Some(p) = cur {
            count += 1;
            cur = p.parent();
        }
        count
    }

    /// Ancestor chain, nearest first.
    fn parents(&self) -> Vec<Arc<Self>> {
        let mut out = Vec::new();
        let mut cur = self.parent();
        while let Some(p) = cur {
            cur = p.parent();
            out.push(p);
        }
        out
    }

    /// The topmost ancestor (the node itself when detached).
    fn root(self: &Arc<Self>) -> Arc<Self> {
        self.parents().pop().unwrap_or_else(|| Arc::clone(self))
    }

    /// Lazy pre-order traversal starting with the node itself.
    fn iter(self: &Arc<Self>) -> PreOrder<Self> {
        PreOrder {
            stack: vec![Arc::clone(self)],
        }
    }

    /// Number of nodes in the subtree, the node included.
    fn descendant_count(self: &Arc<Self>) -> usize {
        self.iter().count()
    }

    /// Renders the subtree, one `- name` line per node, indented two spaces per level.
    fn tree(self: &Arc<Self>) -> String {
        self.iter().fold(String::new(), |mut out, node| {
            out.push_str(&"  ".repeat(node.level()));
            out.push_str(&format!("- {node}\n"));
            out
        })
    }
}

/// Depth-first, left-to-right traversal; children are read when their parent is visited.
pub struct PreOrder<T> {
    stack: Vec<Arc<T>>,
}

impl<T: Composite> Iterator for PreOrder<T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Arc<T>> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().into_iter().rev());
        Some(node)
    }
}
