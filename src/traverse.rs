use std::fmt;
use std::iter::FusedIterator;

use crate::avl_tree::Node;

/// Visiting order for [`AvlTree::traverse`](crate::avl_tree::AvlTree::traverse).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Order {
    /// left, node, right: ascending key order
    InOrder,
    /// node, left, right
    PreOrder,
    /// left, right, node
    PostOrder,
}

/// Read-only handle on a single node, for renderers that need the tree's shape
/// and not just its entries.
pub struct NodeRef<'a, K, V> {
    node: &'a Node<K, V>,
}

impl<'a, K, V> Clone for NodeRef<'a, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, K, V> Copy for NodeRef<'a, K, V> {}

impl<'a, K, V> NodeRef<'a, K, V> {
    pub(crate) fn new(node: &'a Node<K, V>) -> Self {
        NodeRef { node }
    }

    pub fn key(&self) -> &'a K {
        &self.node.key
    }

    pub fn value(&self) -> &'a V {
        &self.node.value
    }

    /// Height of the subtree rooted here; a leaf has height 0.
    pub fn height(&self) -> i32 {
        self.node.height
    }

    pub fn has_left(&self) -> bool {
        self.node.left.is_some()
    }

    pub fn has_right(&self) -> bool {
        self.node.right.is_some()
    }

    pub fn left(&self) -> Option<NodeRef<'a, K, V>> {
        self.node.left.as_deref().map(NodeRef::new)
    }

    pub fn right(&self) -> Option<NodeRef<'a, K, V>> {
        self.node.right.as_deref().map(NodeRef::new)
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for NodeRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key: {:>4},  val: {:>10},  height: {:>3}",
            self.key(),
            self.value(),
            self.height()
        )
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for NodeRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", self.key())
            .field("value", self.value())
            .field("height", &self.height())
            .finish()
    }
}

enum Step<'a, K, V> {
    Expand(&'a Node<K, V>),
    Visit(&'a Node<K, V>),
}

/// Lazy walk over every node of a tree in a fixed [`Order`].
///
/// The stack holds pending work in reverse: expanding a node pushes its two
/// subtrees and a visit of the node itself in the order that makes popping
/// produce the requested sequence. Stack depth stays proportional to the
/// tree height.
pub struct Traverse<'a, K, V> {
    order: Order,
    stack: Vec<Step<'a, K, V>>,
    remaining: usize,
}

impl<'a, K, V> Traverse<'a, K, V> {
    pub(crate) fn new(root: Option<&'a Node<K, V>>, len: usize, order: Order) -> Self {
        let mut stack = Vec::new();
        stack.extend(root.map(Step::Expand));
        Traverse {
            order,
            stack,
            remaining: len,
        }
    }

    fn expand(&mut self, node: &'a Node<K, V>) {
        let left = node.left.as_deref().map(Step::Expand);
        let right = node.right.as_deref().map(Step::Expand);
        let visit = Some(Step::Visit(node));
        let pushes = match self.order {
            Order::InOrder => [right, visit, left],
            Order::PreOrder => [right, left, visit],
            Order::PostOrder => [visit, right, left],
        };
        self.stack.extend(pushes.into_iter().flatten());
    }
}

impl<'a, K, V> Iterator for Traverse<'a, K, V> {
    type Item = NodeRef<'a, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(step) = self.stack.pop() {
            match step {
                Step::Visit(node) => {
                    self.remaining -= 1;
                    return Some(NodeRef::new(node));
                }
                Step::Expand(node) => self.expand(node),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Traverse<'_, K, V> {}

impl<K, V> FusedIterator for Traverse<'_, K, V> {}

/// In-order iterator over `(key, value)` pairs.
pub struct Iter<'a, K, V> {
    inner: Traverse<'a, K, V>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(inner: Traverse<'a, K, V>) -> Self {
        Iter { inner }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (node.key(), node.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}
