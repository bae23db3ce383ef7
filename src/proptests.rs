use super::{AvlTree, Error};

use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Upsert(String, u32),
    Delete(String),
    Lookup(String),
}

fn key_strategy() -> impl Strategy<Value = String> + Clone {
    // A small alphabet makes collisions, and with them overwrites and
    // successful deletes, frequent.
    "[a-e]{0,4}"
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Upsert(k, v)),
        30 => key.clone().prop_map(Op::Delete),
        20 => key.prop_map(Op::Lookup),
    ];
    prop::collection::vec(op, 0..=500)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let tree: AvlTree<u32> = AvlTree::new();
        let mut model: BTreeMap<String, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Upsert(key, value) => {
                    let old_tree = tree.upsert(key.as_str(), value);
                    let old_model = model.insert(key, value);
                    prop_assert_eq!(old_tree, old_model);
                }
                Op::Delete(key) => {
                    let got = tree.remove(&key);
                    let expected = model.remove(&key).ok_or(Error::NotFound);
                    prop_assert_eq!(got, expected);
                }
                Op::Lookup(key) => {
                    let got = tree.lookup(&key);
                    let expected = model.get(&key).copied().ok_or(Error::NotFound);
                    prop_assert_eq!(got, expected);
                }
            }

            tree.check_consistency();
            prop_assert_eq!(tree.len(), model.len());
        }

        let got: Vec<(String, u32)> = tree.iter().collect();
        let expected: Vec<(String, u32)> = model.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_overwrite_keeps_shape(keys in prop::collection::vec(key_strategy(), 1..=200)) {
        let tree = AvlTree::new();
        for key in &keys {
            tree.upsert(key.as_str(), 0u8);
        }
        let len = tree.len();
        let height = tree.height();

        for key in &keys {
            prop_assert!(tree.upsert(key.as_str(), 1u8).is_some());
            prop_assert_eq!(tree.len(), len);
            prop_assert_eq!(tree.height(), height);
        }
        tree.check_consistency();
    }
}
