//! A concurrency-safe ordered map from string keys to values,
//! implemented with an AVL tree.
//!
//! The tree rebalances after every insert and delete, so lookups, upserts and
//! deletes are O(log n). A single reader/writer lock guards the whole tree.
//!
//! ```
//! use avltree::AvlTree;
//! let tree = AvlTree::new();
//! tree.upsert("one", 1);
//! tree.upsert("two", 2);
//! assert_eq!(tree.lookup("two"), Ok(2));
//! tree.delete("one").unwrap();
//! assert!(!tree.contains_key("one"));
//! ```

mod error;
mod node;
mod tree;

pub use error::{Error, Result};
pub use tree::{AvlTree, Iter};

#[cfg(test)]
mod proptests;
