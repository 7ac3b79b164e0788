use std::borrow::Borrow;
use std::cmp::{max, Ordering};
use std::fmt;
use std::marker::PhantomData;
use std::mem;

use itertools::Itertools;

use crate::config::{ConfigT, DefaultConfig};
use crate::error::TreeError;
use crate::traverse::{Iter, NodeRef, Order, Traverse};

macro_rules! debug {
    ($($arg:tt)+) => {
        if Config::DEBUG {
            log::debug!($($arg)+);
        }
    };
}

pub(crate) type Link<K, V> = Option<Box<Node<K, V>>>;

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) height: i32,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
}

/// Height of a possibly empty subtree; empty is -1 so a leaf is 0.
fn height<K, V>(link: &Link<K, V>) -> i32 {
    link.as_ref().map_or(-1, |node| node.height)
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Self {
        Node {
            key,
            value,
            height: 0,
            left: None,
            right: None,
        }
    }

    fn update_height(&mut self) {
        self.height = 1 + max(height(&self.left), height(&self.right));
    }

    /// Positive when right-heavy.
    fn balance_factor(&self) -> i32 {
        height(&self.right) - height(&self.left)
    }
}

/// Ordered map kept height-balanced by AVL rotations.
///
/// Every node owns its two children outright and there are no parent links:
/// the recursive mutators hand back the (possibly new) root of the subtree
/// they touched and the caller re-links it.
pub struct AvlTree<K, V, Config: ConfigT = DefaultConfig> {
    root: Link<K, V>,
    len: usize,
    _config: PhantomData<Config>,
}

impl<K, V> AvlTree<K, V, DefaultConfig> {
    pub fn new() -> Self {
        Self::with_config()
    }
}

impl<K, V, Config: ConfigT> AvlTree<K, V, Config> {
    pub fn with_config() -> Self {
        AvlTree {
            root: None,
            len: 0,
            _config: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the whole tree, -1 when empty.
    pub fn height(&self) -> i32 {
        height(&self.root)
    }

    pub fn root(&self) -> Option<NodeRef<'_, K, V>> {
        self.root.as_deref().map(NodeRef::new)
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Leftmost node, i.e. the smallest key.
    pub fn find_min(&self) -> Option<NodeRef<'_, K, V>> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some(NodeRef::new(node))
    }

    /// Rightmost node, i.e. the largest key.
    pub fn find_max(&self) -> Option<NodeRef<'_, K, V>> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some(NodeRef::new(node))
    }

    /// Calls `visitor` on every node in `order`.
    pub fn traverse<'a, F>(&'a self, order: Order, visitor: F)
    where
        F: FnMut(NodeRef<'a, K, V>),
    {
        self.traverse_iter(order).for_each(visitor);
    }

    pub fn traverse_iter(&self, order: Order) -> Traverse<'_, K, V> {
        Traverse::new(self.root.as_deref(), self.len, order)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.traverse_iter(Order::InOrder))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    // `z` is `x`'s right child, already detached from it.
    fn rotate_left(mut x: Box<Node<K, V>>, mut z: Box<Node<K, V>>) -> Box<Node<K, V>> {
        x.right = z.left.take();
        x.update_height();
        z.left = Some(x);
        z.update_height();
        z
    }

    // `z` is `x`'s left child, already detached from it.
    fn rotate_right(mut x: Box<Node<K, V>>, mut z: Box<Node<K, V>>) -> Box<Node<K, V>> {
        x.left = z.right.take();
        x.update_height();
        z.right = Some(x);
        z.update_height();
        z
    }

    /// Refreshes `node`'s height and, if its subtrees differ in height by
    /// more than one, rotates. Returns the root of the rebalanced subtree.
    fn rebalance(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        node.update_height();
        let delta = node.balance_factor();
        if delta < -1 {
            if let Some(mut left) = node.left.take() {
                // double rotation only when the inner grandchild is strictly taller
                if height(&left.left) < height(&left.right) {
                    if let Some(pivot) = left.right.take() {
                        debug!("left-right rotation, balance {}", delta);
                        left = Self::rotate_left(left, pivot);
                    }
                } else {
                    debug!("right rotation, balance {}", delta);
                }
                return Self::rotate_right(node, left);
            }
        } else if delta > 1 {
            if let Some(mut right) = node.right.take() {
                if height(&right.right) < height(&right.left) {
                    if let Some(pivot) = right.left.take() {
                        debug!("right-left rotation, balance {}", delta);
                        right = Self::rotate_right(right, pivot);
                    }
                } else {
                    debug!("left rotation, balance {}", delta);
                }
                return Self::rotate_left(node, right);
            }
        }
        node
    }

    /// Detaches the leftmost node of the subtree. Returns what is left of the
    /// subtree together with the detached entry.
    fn remove_min(mut node: Box<Node<K, V>>) -> (Link<K, V>, K, V) {
        match node.left.take() {
            Some(left) => {
                let (rest, key, value) = Self::remove_min(left);
                node.left = rest;
                (Some(Self::rebalance(node)), key, value)
            }
            None => {
                let Node {
                    key, value, right, ..
                } = *node;
                (right, key, value)
            }
        }
    }

    fn check_subtree(node: Option<&Node<K, V>>, count: &mut usize) -> Option<i32> {
        let Some(node) = node else {
            return Some(-1);
        };
        *count += 1;
        let left = Self::check_subtree(node.left.as_deref(), count)?;
        let right = Self::check_subtree(node.right.as_deref(), count)?;
        let h = 1 + max(left, right);
        ((right - left).abs() <= 1 && node.height == h).then_some(h)
    }
}

impl<K: Ord, V, Config: ConfigT> AvlTree<K, V, Config> {
    /// Adds a new entry. An existing key is reported as
    /// [`TreeError::DuplicateKey`] and leaves the tree as it was.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), TreeError> {
        let (root, inserted) = Self::insert_node(self.root.take(), key, value);
        self.root = Some(root);
        if !inserted {
            debug!("insert rejected: duplicate key");
            return Err(TreeError::DuplicateKey);
        }
        self.len += 1;
        self.assert_invariants();
        Ok(())
    }

    fn insert_node(link: Link<K, V>, key: K, value: V) -> (Box<Node<K, V>>, bool) {
        let Some(mut node) = link else {
            return (Box::new(Node::new(key, value)), true);
        };
        let inserted = match key.cmp(&node.key) {
            Ordering::Less => {
                let (left, inserted) = Self::insert_node(node.left.take(), key, value);
                node.left = Some(left);
                inserted
            }
            Ordering::Greater => {
                let (right, inserted) = Self::insert_node(node.right.take(), key, value);
                node.right = Some(right);
                inserted
            }
            Ordering::Equal => return (node, false),
        };
        (Self::rebalance(node), inserted)
    }

    /// Removes `key` and returns its value.
    ///
    /// A node with two children takes over the key and value of its in-order
    /// successor, which is then unlinked from the right subtree instead.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, TreeError>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (root, removed) = Self::remove_node(self.root.take(), key);
        self.root = root;
        match removed {
            Some(value) => {
                self.len -= 1;
                self.assert_invariants();
                Ok(value)
            }
            None => {
                debug!("remove missed: key not found");
                Err(TreeError::KeyNotFound)
            }
        }
    }

    fn remove_node<Q>(link: Link<K, V>, key: &Q) -> (Link<K, V>, Option<V>)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(mut node) = link else {
            return (None, None);
        };
        let removed = match key.cmp(node.key.borrow()) {
            Ordering::Less => {
                let (left, removed) = Self::remove_node(node.left.take(), key);
                node.left = left;
                removed
            }
            Ordering::Greater => {
                let (right, removed) = Self::remove_node(node.right.take(), key);
                node.right = right;
                removed
            }
            Ordering::Equal => match (node.left.take(), node.right.take()) {
                (Some(left), Some(right)) => {
                    let (rest, successor_key, successor_value) = Self::remove_min(right);
                    node.left = Some(left);
                    node.right = rest;
                    node.key = successor_key;
                    Some(mem::replace(&mut node.value, successor_value))
                }
                (child, None) | (None, child) => return (child, Some(node.value)),
            },
        };
        (Some(Self::rebalance(node)), removed)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            match key.cmp(node.key.borrow()) {
                Ordering::Less => cur = node.left.as_deref(),
                Ordering::Greater => cur = node.right.as_deref(),
                Ordering::Equal => return Some(&node.value),
            }
        }
        None
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root.as_deref_mut();
        while let Some(node) = cur {
            match key.cmp(node.key.borrow()) {
                Ordering::Less => cur = node.left.as_deref_mut(),
                Ordering::Greater => cur = node.right.as_deref_mut(),
                Ordering::Equal => return Some(&mut node.value),
            }
        }
        None
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Like [`get`](Self::get), but reports a miss as [`TreeError::KeyNotFound`].
    pub fn lookup<Q>(&self, key: &Q) -> Result<&V, TreeError>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(TreeError::KeyNotFound)
    }

    /// Replaces the value stored under `key` and returns the old one. The
    /// shape of the tree does not change.
    pub fn update<Q>(&mut self, key: &Q, value: V) -> Result<V, TreeError>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.get_mut(key) {
            Some(slot) => Ok(mem::replace(slot, value)),
            None => Err(TreeError::KeyNotFound),
        }
    }

    /// Checks that `len` matches the number of nodes, that keys ascend
    /// strictly in order, and that every stored height is accurate and
    /// balanced. Walks the whole tree.
    pub fn check_invariants(&self) -> bool {
        let mut count = 0;
        let shape_ok = Self::check_subtree(self.root.as_deref(), &mut count).is_some();
        let keys_ascending = self.keys().tuple_windows().all(|(a, b)| a < b);
        shape_ok && keys_ascending && count == self.len
    }

    fn assert_invariants(&self) {
        if Config::CHECK_INVARIANTS {
            assert!(self.check_invariants(), "AVL invariants violated");
        }
    }
}

impl<K, V, Config: ConfigT> Default for AvlTree<K, V, Config> {
    fn default() -> Self {
        Self::with_config()
    }
}

impl<'a, K, V, Config: ConfigT> IntoIterator for &'a AvlTree<K, V, Config> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Display, V: fmt::Display, Config: ConfigT> fmt::Display for AvlTree<K, V, Config> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root() {
            Some(root) => write!(f, "Size: {}, Root: {}", self.len, root),
            None => write!(f, "Size: {}, Root: None", self.len),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, Config: ConfigT> fmt::Debug for AvlTree<K, V, Config> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugConfig;
    use std::fmt::Write;

    use expect_test::expect;

    fn pretty_print_to_string<K, V, C>(tree: &AvlTree<K, V, C>) -> String
    where
        K: fmt::Display,
        V: fmt::Display,
        C: ConfigT,
    {
        fn traverse<K: fmt::Display, V: fmt::Display>(
            link: &Link<K, V>,
            level: usize,
            mut out: String,
        ) -> String {
            if let Some(node) = link {
                out = traverse(&node.left, level + 1, out);
                writeln!(
                    &mut out,
                    "{}{}: {} ({})",
                    "  ".repeat(level),
                    &node.key,
                    &node.value,
                    node.height
                )
                .expect("writing to String cannot fail");
                out = traverse(&node.right, level + 1, out);
            }
            out
        }
        traverse(&tree.root, 0, String::new())
    }

    fn tree_of(keys: &[i32]) -> AvlTree<i32, i32, DebugConfig> {
        let mut tree = AvlTree::with_config();
        for &k in keys {
            tree.insert(k, k).expect("keys are distinct");
        }
        tree
    }

    #[test]
    fn test_insert_and_get() {
        let mut tree = AvlTree::new();
        tree.insert("a", 1).unwrap();
        tree.insert("b", 2).unwrap();
        tree.insert("c", 3).unwrap();
        let s = pretty_print_to_string(&tree);
        let expect = expect![[r#"
              a: 1 (0)
            b: 2 (1)
              c: 3 (0)
        "#]];
        expect.assert_eq(&s);
        assert_eq!(tree.get(&"a"), Some(&1));
        assert_eq!(tree.get(&"b"), Some(&2));
        assert_eq!(tree.get(&"c"), Some(&3));
        assert_eq!(tree.get(&"d"), None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut tree = AvlTree::new();
        tree.insert("key", 10).unwrap();
        let before = pretty_print_to_string(&tree);
        assert_eq!(tree.insert("key", 20), Err(TreeError::DuplicateKey));
        assert_eq!(tree.get(&"key"), Some(&10));
        assert_eq!(tree.len(), 1);
        assert_eq!(pretty_print_to_string(&tree), before);
    }

    #[test]
    fn test_update_value() {
        let mut tree = AvlTree::new();
        tree.insert("key", 10).unwrap();
        assert_eq!(tree.update(&"key", 20), Ok(10));
        assert_eq!(tree.get(&"key"), Some(&20));
        assert_eq!(tree.update(&"nope", 1), Err(TreeError::KeyNotFound));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_inorder_sorted() {
        let mut tree = AvlTree::new();
        let vals = vec![10, 5, 20, 15, 25, 3, 8];
        for &v in &vals {
            tree.insert(v, v * 10).unwrap();
        }
        let keys = tree.keys().copied().collect::<Vec<_>>();
        let mut sorted = vals.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_single_right_rotation() {
        let tree = tree_of(&[3, 2, 1]);
        let expect = expect![[r#"
              1: 1 (0)
            2: 2 (1)
              3: 3 (0)
        "#]];
        expect.assert_eq(&pretty_print_to_string(&tree));
    }

    #[test]
    fn test_single_left_rotation() {
        let tree = tree_of(&[1, 2, 3]);
        let expect = expect![[r#"
              1: 1 (0)
            2: 2 (1)
              3: 3 (0)
        "#]];
        expect.assert_eq(&pretty_print_to_string(&tree));
    }

    #[test]
    fn test_left_right_rotation() {
        let tree = tree_of(&[3, 1, 2]);
        let expect = expect![[r#"
              1: 1 (0)
            2: 2 (1)
              3: 3 (0)
        "#]];
        expect.assert_eq(&pretty_print_to_string(&tree));
    }

    #[test]
    fn test_right_left_rotation() {
        let tree = tree_of(&[1, 3, 2]);
        let expect = expect![[r#"
              1: 1 (0)
            2: 2 (1)
              3: 3 (0)
        "#]];
        expect.assert_eq(&pretty_print_to_string(&tree));
    }

    #[test]
    fn test_equal_grandchildren_take_single_rotation() {
        let mut tree = tree_of(&[2, 1, 4, 3, 5]);
        assert_eq!(tree.remove(&1), Ok(1));
        let expect = expect![[r#"
              2: 2 (1)
                3: 3 (0)
            4: 4 (2)
              5: 5 (0)
        "#]];
        expect.assert_eq(&pretty_print_to_string(&tree));
    }

    #[test]
    fn test_remove_leaf() {
        let mut tree = tree_of(&[1, 2]);
        let s = pretty_print_to_string(&tree);
        let expect = expect![[r#"
            1: 1 (1)
              2: 2 (0)
        "#]];
        expect.assert_eq(&s);
        assert_eq!(tree.remove(&2), Ok(2));
        let s = pretty_print_to_string(&tree);
        let expect = expect![[r#"
            1: 1 (0)
        "#]];
        expect.assert_eq(&s);
        assert_eq!(tree.get(&2), None);
        assert_eq!(tree.get(&1), Some(&1));
    }

    #[test]
    fn test_remove_node_with_one_child() {
        let mut tree = AvlTree::new();
        tree.insert(10, "ten").unwrap();
        tree.insert(5, "five").unwrap();
        tree.insert(15, "fifteen").unwrap();
        tree.insert(3, "three").unwrap();
        assert_eq!(tree.remove(&5), Ok("five"));
        assert_eq!(tree.get(&5), None);
        assert_eq!(tree.get(&3), Some(&"three"));
        assert_eq!(tree.get(&10), Some(&"ten"));
        assert!(tree.check_invariants());
    }

    #[test]
    fn test_remove_node_with_two_children() {
        let mut tree = tree_of(&[2, 1, 3]);
        assert_eq!(tree.remove(&2), Ok(2));
        assert_eq!(tree.get(&2), None);
        let expect = expect![[r#"
              1: 1 (0)
            3: 3 (1)
        "#]];
        expect.assert_eq(&pretty_print_to_string(&tree));
    }

    #[test]
    fn test_remove_missing_key() {
        let mut tree = tree_of(&[2, 1, 3]);
        let before = pretty_print_to_string(&tree);
        assert_eq!(tree.remove(&7), Err(TreeError::KeyNotFound));
        assert_eq!(tree.len(), 3);
        assert_eq!(pretty_print_to_string(&tree), before);

        let mut empty: AvlTree<i32, i32> = AvlTree::new();
        assert_eq!(empty.remove(&7), Err(TreeError::KeyNotFound));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_balance_after_operations() {
        let mut tree = AvlTree::<i32, i32, DebugConfig>::with_config();
        for k in 1..=100 {
            tree.insert(k, k).unwrap();
        }
        for k in &[50, 75, 25] {
            tree.remove(k).unwrap();
        }
        assert!(tree.check_invariants(), "Tree is unbalanced after operations");
        assert_eq!(tree.len(), 97);
        assert_eq!(tree.height(), 6);
    }

    #[test]
    fn test_check_invariants_detects_corruption() {
        let mut tree = tree_of(&[2, 1, 3]);
        assert!(tree.check_invariants());
        if let Some(root) = tree.root.as_mut() {
            root.height = 5;
        }
        assert!(!tree.check_invariants());

        let mut tree = tree_of(&[2, 1, 3]);
        tree.len = 4;
        assert!(!tree.check_invariants());

        let mut tree = tree_of(&[2, 1, 3]);
        if let Some(left) = tree.root.as_mut().and_then(|root| root.left.as_mut()) {
            left.key = 9;
        }
        assert!(!tree.check_invariants());
    }

    #[test]
    fn test_display() {
        let mut tree = AvlTree::new();
        assert_eq!(tree.to_string(), "Size: 0, Root: None");
        for (k, v) in [(1611, "lisa"), (1819, "andy"), (1320, "rich")] {
            tree.insert(k, v).unwrap();
        }
        let expect = expect!["Size: 3, Root: key: 1611,  val:       lisa,  height:   1"];
        expect.assert_eq(&tree.to_string());
        let expect = expect![[r#"{1320: "rich", 1611: "lisa", 1819: "andy"}"#]];
        expect.assert_eq(&format!("{:?}", tree));
    }

    #[test]
    fn test_borrowed_lookup() {
        let mut tree = AvlTree::new();
        tree.insert(String::from("alpha"), 1).unwrap();
        tree.insert(String::from("beta"), 2).unwrap();
        assert_eq!(tree.lookup("beta"), Ok(&2));
        assert_eq!(tree.lookup("gamma"), Err(TreeError::KeyNotFound));
        assert!(tree.contains_key("alpha"));
        if let Some(v) = tree.get_mut("alpha") {
            *v += 10;
        }
        assert_eq!(tree.remove("alpha"), Ok(11));
    }

    #[test]
    fn test_clear() {
        let mut tree = tree_of(&[1, 2, 3]);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), -1);
        assert!(tree.root().is_none());
        assert!(tree.check_invariants());
    }
}
