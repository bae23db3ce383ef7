use std::sync::Arc;
use std::thread;

use avltree::{AvlTree, Error};

fn main() {
    let tree = Arc::new(AvlTree::new());
    tree.upsert("zero", 0);
    tree.upsert("one", 1);
    tree.upsert("two", 2);
    tree.upsert("two", 2);
    tree.upsert("three", 3);
    assert_eq!(tree.lookup("one"), Ok(1));
    tree.delete("one").unwrap();
    assert_eq!(tree.lookup("one"), Err(Error::NotFound));

    let handles: Vec<_> = (4..8)
        .map(|i| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                tree.upsert(format!("n{i}"), i);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for (k, v) in tree.iter() {
        println!("{k} => {v}");
    }
    println!("{} entries, height {}", tree.len(), tree.height());
}
