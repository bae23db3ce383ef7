use std::cmp::{self, Ordering};
use std::mem;

use log::trace;

use crate::error::{Error, Result};

pub(crate) type Link<V> = Option<Box<Node<V>>>;

/// A tree node owning both of its subtrees.
///
/// `left_height` and `right_height` cache the height of the respective child
/// subtree plus one, or 0 if the child is absent. A leaf therefore has height 0.
pub(crate) struct Node<V> {
    pub(crate) key: String,
    pub(crate) value: V,
    pub(crate) left: Link<V>,
    pub(crate) right: Link<V>,
    pub(crate) left_height: usize,
    pub(crate) right_height: usize,
}

impl<V> Node<V> {
    pub(crate) fn leaf(key: String, value: V) -> Box<Self> {
        Box::new(Node {
            key,
            value,
            left: None,
            right: None,
            left_height: 0,
            right_height: 0,
        })
    }

    pub(crate) fn height(&self) -> usize {
        cmp::max(self.left_height, self.right_height)
    }

    fn has_left_violation(&self) -> bool {
        self.left_height > self.right_height + 1
    }

    fn has_right_violation(&self) -> bool {
        self.right_height > self.left_height + 1
    }

    fn is_left_heavy(&self) -> bool {
        self.left_height > self.right_height
    }

    fn is_right_heavy(&self) -> bool {
        self.right_height > self.left_height
    }

    /// Recomputes both cached heights from the children.
    /// Children must already carry correct heights.
    pub(crate) fn update_heights(&mut self) {
        self.left_height = self.left.as_ref().map_or(0, |left| left.height() + 1);
        self.right_height = self.right.as_ref().map_or(0, |right| right.height() + 1);
    }

    //   n              r
    //  / \            / \
    // a   r    ->    n   c
    //    / \        / \
    //   b   c      a   b
    pub(crate) fn rotate_left(mut self: Box<Self>) -> Box<Self> {
        let mut right = self
            .right
            .take()
            .expect("rotate_left requires a right child");
        trace!(target: "avltree", "rotate left at {:?}", self.key);
        self.right = right.left.take();
        self.update_heights();
        right.left = Some(self);
        right.update_heights();
        right
    }

    //     n          l
    //    / \        / \
    //   l   c  ->  a   n
    //  / \            / \
    // a   b          b   c
    pub(crate) fn rotate_right(mut self: Box<Self>) -> Box<Self> {
        let mut left = self
            .left
            .take()
            .expect("rotate_right requires a left child");
        trace!(target: "avltree", "rotate right at {:?}", self.key);
        self.left = left.right.take();
        self.update_heights();
        left.right = Some(self);
        left.update_heights();
        left
    }

    /// Restores the AVL condition at this node, assuming both subtrees already
    /// satisfy it and the cached heights are current.
    /// Returns the root of the (possibly rotated) subtree.
    pub(crate) fn balance(mut self: Box<Self>) -> Box<Self> {
        if self.has_left_violation() {
            // Left-right case: straighten the left child first
            if self.left.as_ref().is_some_and(|left| left.is_right_heavy()) {
                self.left = self.left.take().map(Node::rotate_left);
                self.update_heights();
            }
            self.rotate_right()
        } else if self.has_right_violation() {
            // Right-left case
            if self.right.as_ref().is_some_and(|right| right.is_left_heavy()) {
                self.right = self.right.take().map(Node::rotate_right);
                self.update_heights();
            }
            self.rotate_left()
        } else {
            self
        }
    }

    /// Inserts `key` or overwrites its value.
    /// Returns the new subtree root and the replaced value, if any.
    pub(crate) fn upsert(link: Link<V>, key: String, value: V) -> (Box<Self>, Option<V>) {
        let mut node = match link {
            None => return (Node::leaf(key, value), None),
            Some(node) => node,
        };

        let replaced = match key.as_str().cmp(node.key.as_str()) {
            Ordering::Equal => {
                let old = mem::replace(&mut node.value, value);
                return (node, Some(old));
            }
            Ordering::Less => {
                let (left, replaced) = Self::upsert(node.left.take(), key, value);
                node.left = Some(left);
                replaced
            }
            Ordering::Greater => {
                let (right, replaced) = Self::upsert(node.right.take(), key, value);
                node.right = Some(right);
                replaced
            }
        };

        node.update_heights();
        (node.balance(), replaced)
    }

    pub(crate) fn lookup<'a>(mut link: Option<&'a Self>, key: &str) -> Result<&'a V> {
        while let Some(node) = link {
            link = match key.cmp(node.key.as_str()) {
                Ordering::Equal => return Ok(&node.value),
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
            };
        }
        Err(Error::NotFound)
    }

    /// Removes `key` from the subtree.
    /// Returns the new subtree root together with the removed entry or `NotFound`.
    /// On `NotFound` the subtree is handed back with its shape unchanged.
    pub(crate) fn delete(link: Link<V>, key: &str) -> (Link<V>, Result<(String, V)>) {
        let mut node = match link {
            None => return (None, Err(Error::NotFound)),
            Some(node) => node,
        };

        let removed = match key.cmp(node.key.as_str()) {
            Ordering::Less => {
                let (left, removed) = Self::delete(node.left.take(), key);
                node.left = left;
                removed
            }
            Ordering::Greater => {
                let (right, removed) = Self::delete(node.right.take(), key);
                node.right = right;
                removed
            }
            Ordering::Equal => match (node.left.take(), node.right.take()) {
                (None, None) => return (None, Ok(node.into_entry())),
                (Some(left), None) => return (Some(left), Ok(node.into_entry())),
                (None, Some(right)) => return (Some(right), Ok(node.into_entry())),
                (Some(left), Some(right)) => {
                    // The in-order successor has no left child, so removing it
                    // never reaches this arm again.
                    let successor = right.min_key().to_owned();
                    let (right, removed) = Self::delete(Some(right), &successor);
                    node.left = Some(left);
                    node.right = right;
                    removed.map(|(key, value)| {
                        (
                            mem::replace(&mut node.key, key),
                            mem::replace(&mut node.value, value),
                        )
                    })
                }
            },
        };

        node.update_heights();
        (Some(node.balance()), removed)
    }

    /// Asserts balance, height and local order for the whole subtree.
    /// Returns its height and number of nodes.
    #[cfg(any(test, feature = "consistency_check"))]
    pub(crate) fn check_consistency(&self) -> (usize, usize) {
        let mut num_nodes = 1;
        let mut left_height = 0;
        let mut right_height = 0;

        if let Some(left) = self.left.as_deref() {
            assert!(left.key < self.key);
            let (height, count) = left.check_consistency();
            left_height = height + 1;
            num_nodes += count;
        }
        if let Some(right) = self.right.as_deref() {
            assert!(right.key > self.key);
            let (height, count) = right.check_consistency();
            right_height = height + 1;
            num_nodes += count;
        }

        assert_eq!(self.left_height, left_height);
        assert_eq!(self.right_height, right_height);

        // AVL condition (nearly balanced)
        assert!(left_height <= right_height + 1);
        assert!(right_height <= left_height + 1);

        (self.height(), num_nodes)
    }

    fn min_key(&self) -> &str {
        let mut node = self;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        &node.key
    }

    fn into_entry(self: Box<Self>) -> (String, V) {
        let Node { key, value, .. } = *self;
        (key, value)
    }

    pub(crate) fn iter(link: Option<&Self>) -> Iter<'_, V> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left_spine(link);
        iter
    }
}

/// Lazy in-order traversal of a subtree.
///
/// The stack holds the path of nodes whose left subtree has been visited
/// (or is being visited) but which have not been yielded yet.
pub(crate) struct Iter<'a, V> {
    stack: Vec<&'a Node<V>>,
}

impl<'a, V> Iter<'a, V> {
    fn push_left_spine(&mut self, mut link: Option<&'a Node<V>>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = node.left.as_deref();
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        Some((&node.key, &node.value))
    }
}
