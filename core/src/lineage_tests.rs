//! Lineage engine tests: generation numbering, cycle safety, depth bounds.

#[cfg(test)]
mod tests {
    use crate::{Error, ErrorKind, LineageEngine};
    use std::sync::Arc;
    use tidepool_store::{FishStore, SqliteStore};
    use tidepool_types::{now_ms, Address, Fish};

    fn store() -> Arc<SqliteStore> {
        Arc::new(SqliteStore::open_in_memory().unwrap())
    }

    fn put_fish(store: &SqliteStore, id: i64, parent1: Option<i64>, parent2: Option<i64>) {
        store
            .insert_fish(&Fish {
                id,
                owner: Address::parse("0xaa").unwrap(),
                tank_id: None,
                sprite_ref: None,
                parent1,
                parent2,
                created_at_ms: now_ms(),
            })
            .unwrap();
    }

    fn generations(nodes: &[crate::LineageNode]) -> Vec<(i64, u32)> {
        let mut pairs: Vec<(i64, u32)> = nodes.iter().map(|n| (n.fish.id, n.generation)).collect();
        pairs.sort_unstable();
        pairs
    }

    #[test]
    fn rejects_non_positive_root() {
        let engine = LineageEngine::new(store());
        assert_eq!(
            engine.build_family_tree(0).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            engine.build_family_tree(-3).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn missing_root_is_not_found() {
        let engine = LineageEngine::new(store());
        assert_eq!(
            engine.build_family_tree(5).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn rootless_fish_is_its_own_tree() {
        let store = store();
        put_fish(&store, 1, None, None);
        let tree = LineageEngine::new(store).build_family_tree(1).unwrap();

        assert_eq!(generations(&tree.ancestors), vec![(1, 0)]);
        assert!(tree.descendants.is_empty());
        assert_eq!(tree.ancestor_generations, 0);
        assert_eq!(tree.descendant_generations, 0);
    }

    #[test]
    fn three_generation_chain_numbers_correctly() {
        let store = store();
        put_fish(&store, 1, None, None); // grandparent
        put_fish(&store, 2, Some(1), None); // parent
        put_fish(&store, 3, Some(2), None); // root
        let tree = LineageEngine::new(store).build_family_tree(3).unwrap();

        assert_eq!(generations(&tree.ancestors), vec![(1, 2), (2, 1), (3, 0)]);
        assert_eq!(tree.ancestor_generations, 2);
    }

    #[test]
    fn diamond_ancestry_lists_shared_ancestor_once() {
        let store = store();
        put_fish(&store, 1, None, None); // shared grandparent
        put_fish(&store, 2, Some(1), None);
        put_fish(&store, 3, Some(1), None);
        put_fish(&store, 4, Some(2), Some(3)); // root
        let tree = LineageEngine::new(store).build_family_tree(4).unwrap();

        assert_eq!(
            generations(&tree.ancestors),
            vec![(1, 2), (2, 1), (3, 1), (4, 0)],
            "shared ancestor appears exactly once"
        );
    }

    #[test]
    fn direct_self_cycle_terminates() {
        let store = store();
        put_fish(&store, 1, Some(1), None);
        let tree = LineageEngine::new(store).build_family_tree(1).unwrap();

        assert_eq!(generations(&tree.ancestors), vec![(1, 0)]);
        assert_eq!(tree.ancestor_generations, 0);
        // The self-pointer also matches the descendant query, but the root
        // is excluded by the visited set there too.
        assert!(tree.descendants.is_empty());
    }

    #[test]
    fn indirect_cycle_terminates_without_duplicates() {
        let store = store();
        put_fish(&store, 1, Some(2), None);
        put_fish(&store, 2, Some(1), None);
        let tree = LineageEngine::new(store).build_family_tree(1).unwrap();

        assert_eq!(generations(&tree.ancestors), vec![(1, 0), (2, 1)]);
        let mut ids: Vec<i64> = tree.ancestors.iter().map(|n| n.fish.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), tree.ancestors.len(), "no id appears twice");
    }

    #[test]
    fn dangling_parent_pointer_is_skipped() {
        let store = store();
        put_fish(&store, 1, Some(99), None); // parent row missing
        let tree = LineageEngine::new(store).build_family_tree(1).unwrap();

        assert_eq!(generations(&tree.ancestors), vec![(1, 0)]);
        assert_eq!(tree.ancestor_generations, 0);
    }

    #[test]
    fn descendants_walk_level_by_level() {
        let store = store();
        put_fish(&store, 1, None, None); // root
        put_fish(&store, 2, None, None); // unrelated mate
        put_fish(&store, 3, Some(1), Some(2)); // child
        put_fish(&store, 4, Some(2), Some(1)); // child, pointers swapped
        put_fish(&store, 5, Some(3), Some(4)); // grandchild
        let tree = LineageEngine::new(store).build_family_tree(1).unwrap();

        assert_eq!(
            generations(&tree.descendants),
            vec![(3, 1), (4, 1), (5, 2)],
            "either parent pointer links a child to the root line"
        );
        assert_eq!(tree.descendant_generations, 2);
        // The mate is an ancestor of the children but not of the root.
        assert_eq!(generations(&tree.ancestors), vec![(1, 0)]);
    }

    #[test]
    fn ancestor_chain_past_cap_fails_loudly() {
        let store = store();
        put_fish(&store, 1, None, None);
        for id in 2..=6 {
            put_fish(&store, id, Some(id - 1), None);
        }
        let engine = LineageEngine::new(Arc::clone(&store)).with_max_depth(3);

        let err = engine.build_family_tree(6).unwrap_err();
        assert!(matches!(err, Error::LineageDepthExceeded { max: 3, .. }));
        assert_eq!(err.kind(), ErrorKind::Internal);

        // A root within the cap still resolves.
        let shallow = LineageEngine::new(store).with_max_depth(3);
        assert!(shallow.build_family_tree(4).is_ok());
    }

    #[test]
    fn descendant_levels_past_cap_fail_loudly() {
        let store = store();
        put_fish(&store, 1, None, None);
        for id in 2..=6 {
            put_fish(&store, id, Some(id - 1), None);
        }
        let engine = LineageEngine::new(store).with_max_depth(3);

        let err = engine.build_family_tree(1).unwrap_err();
        assert!(matches!(err, Error::LineageDepthExceeded { .. }));
    }

    #[test]
    fn family_tree_serializes_for_controllers() {
        let store = store();
        put_fish(&store, 1, None, None);
        put_fish(&store, 2, Some(1), Some(1));
        let tree = LineageEngine::new(store).build_family_tree(2).unwrap();

        let json = serde_json::to_value(&tree).expect("tree should serialize");
        assert_eq!(json["ancestor_generations"], 1);
        assert_eq!(json["ancestors"].as_array().unwrap().len(), 2);
    }
}
