use std::fmt;
use std::iter::FusedIterator;
use std::mem;

use log::{debug, trace};
use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::Result;
use crate::node::{self, Link, Node};

/// An ordered map from string keys to values, implemented with an AVL tree.
///
/// All methods take `&self`: the tree is guarded by a single reader/writer lock.
/// Writers (`upsert`, `delete`, `remove`, `clear`) take the lock exclusively,
/// readers share it. Readers take the lock recursively, so a thread that already
/// holds an [`Iter`] can keep reading even while a writer is queued.
///
/// ```
/// use avltree::{AvlTree, Error};
/// let tree = AvlTree::new();
/// tree.upsert("b", 2);
/// tree.upsert("a", 1);
/// assert_eq!(tree.lookup("a"), Ok(1));
/// assert_eq!(tree.delete("c"), Err(Error::NotFound));
/// let keys: Vec<String> = tree.iter().map(|(k, _)| k).collect();
/// assert_eq!(keys, ["a", "b"]);
/// ```
pub struct AvlTree<V> {
    inner: RwLock<Inner<V>>,
}

struct Inner<V> {
    root: Link<V>,
    num_nodes: usize,
}

/// An in-order iterator over the entries of an [`AvlTree`].
///
/// Holds the tree's read lock until it is exhausted or dropped.
pub struct Iter<'a, V> {
    nodes: node::Iter<'a, V>,
    guard: Option<RwLockReadGuard<'a, Inner<V>>>,
}

impl<V> Inner<V> {
    fn upsert(&mut self, key: String, value: V) -> Option<V> {
        let (root, replaced) = Node::upsert(self.root.take(), key, value);
        self.root = Some(root);
        if replaced.is_none() {
            self.num_nodes += 1;
        }
        replaced
    }

    fn remove(&mut self, key: &str) -> Result<V> {
        let (root, removed) = Node::delete(self.root.take(), key);
        self.root = root;
        match removed {
            Ok((_, value)) => {
                debug_assert!(self.num_nodes >= 1);
                self.num_nodes -= 1;
                Ok(value)
            }
            Err(err) => {
                trace!(target: "avltree", "delete missed key {:?}", key);
                Err(err)
            }
        }
    }
}

impl<V> AvlTree<V> {
    /// Creates an empty tree.
    /// No memory is allocated until the first entry is inserted.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                root: None,
                num_nodes: 0,
            }),
        }
    }

    /// Returns true if the tree contains no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read_recursive().root.is_none()
    }

    /// Returns the number of entries in the tree.
    pub fn len(&self) -> usize {
        self.inner.read_recursive().num_nodes
    }

    /// Returns the height of the root node, 0 for an empty tree or a single entry.
    pub fn height(&self) -> usize {
        self.inner.read_recursive().root.as_ref().map_or(0, |root| root.height())
    }

    /// Removes all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let num_nodes = mem::take(&mut inner.num_nodes);
        inner.root = None;
        debug!(target: "avltree", "cleared {} entries", num_nodes);
    }

    /// Inserts a key-value pair, or overwrites the value if the key is present.
    /// Returns the replaced value, if any.
    pub fn upsert(&self, key: impl Into<String>, value: V) -> Option<V> {
        self.inner.write().upsert(key.into(), value)
    }

    /// Removes a key from the tree.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.remove(key).map(drop)
    }

    /// Removes a key from the tree, returning its value.
    pub fn remove(&self, key: &str) -> Result<V> {
        self.inner.write().remove(key)
    }

    /// Returns true if the tree holds `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        let inner = self.inner.read_recursive();
        Node::lookup(inner.root.as_deref(), key).is_ok()
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        let inner = self.inner.read_recursive();
        let num_nodes = inner.root.as_deref().map_or(0, |root| root.check_consistency().1);
        assert_eq!(num_nodes, inner.num_nodes);

        let keys: Vec<&str> = Node::iter(inner.root.as_deref()).map(|(k, _)| k).collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

impl<V: Clone> AvlTree<V> {
    /// Returns a copy of the value stored under `key`.
    pub fn lookup(&self, key: &str) -> Result<V> {
        let inner = self.inner.read_recursive();
        Node::lookup(inner.root.as_deref(), key).cloned()
    }

    /// Gets an iterator over the entries of the tree, in ascending key order.
    ///
    /// The iterator holds the read lock for the whole traversal. Writers block
    /// until it is exhausted or dropped, so calling a writing method on the
    /// same thread while the iterator is alive deadlocks. Reading methods do
    /// not block on the same thread, but a steady stream of overlapping
    /// iterations from other threads can starve writers.
    /// Use [`snapshot`](Self::snapshot) to release the lock right away.
    pub fn iter(&self) -> Iter<'_, V> {
        let guard = self.inner.read_recursive();
        // SAFETY: the nodes are owned by `self.inner` and only change under the
        // write lock. The returned `Iter` holds the read guard for as long as
        // `nodes` can still reach a node, and it only hands out owned copies.
        // `Iter::next` must drop the guard only once `nodes` is exhausted, and
        // `nodes` must stay declared before `guard` so it is dropped first.
        let root = guard
            .root
            .as_deref()
            .map(|root| unsafe { &*(root as *const Node<V>) });
        Iter {
            nodes: Node::iter(root),
            guard: Some(guard),
        }
    }

    /// Copies all entries, in ascending key order, and releases the read lock
    /// before returning.
    pub fn snapshot(&self) -> Vec<(String, V)> {
        let inner = self.inner.read_recursive();
        Node::iter(inner.root.as_deref())
            .map(|(key, value)| (key.to_owned(), value.clone()))
            .collect()
    }
}

impl<V> Default for AvlTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for AvlTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read_recursive();
        f.debug_map().entries(Node::iter(inner.root.as_deref())).finish()
    }
}

impl<K: Into<String>, V> Extend<(K, V)> for AvlTree<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let inner = self.inner.get_mut();
        for (key, value) in iter {
            inner.upsert(key.into(), value);
        }
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for AvlTree<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<V: Clone> Iterator for Iter<'_, V> {
    type Item = (String, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.guard.as_ref()?;
        match self.nodes.next() {
            Some((key, value)) => Some((key.to_owned(), value.clone())),
            None => {
                // Exhausted, let writers in
                self.guard = None;
                None
            }
        }
    }
}

impl<V: Clone> FusedIterator for Iter<'_, V> {}
