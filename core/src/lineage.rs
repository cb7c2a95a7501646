use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tidepool_store::FishStore;
use tidepool_types::{Fish, MAX_LINEAGE_DEPTH};
use tracing::debug;

/// One entry of a lineage walk: the fish and its generation distance from
/// the root (root = 0 for ancestors, first children = 1 for descendants).
#[derive(Clone, Debug, Serialize)]
pub struct LineageNode {
    pub fish: Fish,
    pub generation: u32,
}

/// Full two-direction lineage of a root fish. The two walks are independent
/// and not deduplicated against each other; the root appears only in
/// `ancestors`, at generation 0.
#[derive(Clone, Debug, Serialize)]
pub struct FamilyTree {
    pub ancestors: Vec<LineageNode>,
    pub descendants: Vec<LineageNode>,
    /// Highest generation reached among ancestors (0 when the root has no
    /// parents).
    pub ancestor_generations: u32,
    /// Number of descendant levels found (0 when the root has no children).
    pub descendant_generations: u32,
}

/// Rebuilds ancestry and descendant graphs from the two-parent-pointer fish
/// table.
///
/// The table is expected to be acyclic, but the engine never assumes it:
/// both walks carry explicit visited sets so cycles and self-references
/// terminate, and a hard generation cap fails the walk loudly instead of
/// silently truncating a pathological chain. Only the off-chain store is
/// read; the ledger is never consulted.
pub struct LineageEngine<S> {
    store: Arc<S>,
    max_depth: u32,
}

impl<S: FishStore> LineageEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_depth: MAX_LINEAGE_DEPTH,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn build_family_tree(&self, root_id: i64) -> Result<FamilyTree> {
        if root_id <= 0 {
            return Err(Error::validation("root_id", "must be a positive id"));
        }
        let root = self
            .store
            .fish_by_id(root_id)?
            .ok_or_else(|| Error::not_found("fish", root_id))?;

        let (ancestors, ancestor_generations) = self.walk_ancestors(root)?;
        let (descendants, descendant_generations) = self.walk_descendants(root_id)?;

        debug!(
            root_id,
            ancestors = ancestors.len(),
            descendants = descendants.len(),
            "built family tree"
        );
        Ok(FamilyTree {
            ancestors,
            descendants,
            ancestor_generations,
            descendant_generations,
        })
    }

    /// Depth-first walk up the parent pointers. A parent id already visited
    /// ends that branch (covers both cycles and diamond links); a parent id
    /// with no row is treated as a dangling pointer and skipped.
    fn walk_ancestors(&self, root: Fish) -> Result<(Vec<LineageNode>, u32)> {
        let root_id = root.id;
        let mut visited: HashSet<i64> = HashSet::from([root_id]);
        let mut stack: Vec<(i64, u32)> = Vec::new();
        for parent in [root.parent1, root.parent2].into_iter().flatten() {
            stack.push((parent, 1));
        }
        let mut ancestors = vec![LineageNode {
            fish: root,
            generation: 0,
        }];
        let mut max_generation = 0;

        while let Some((id, generation)) = stack.pop() {
            if visited.contains(&id) {
                continue;
            }
            if generation > self.max_depth {
                return Err(Error::LineageDepthExceeded {
                    root: root_id,
                    max: self.max_depth,
                });
            }
            let Some(fish) = self.store.fish_by_id(id)? else {
                continue;
            };
            visited.insert(id);
            max_generation = max_generation.max(generation);
            for parent in [fish.parent1, fish.parent2].into_iter().flatten() {
                stack.push((parent, generation + 1));
            }
            ancestors.push(LineageNode { fish, generation });
        }

        Ok((ancestors, max_generation))
    }

    /// Level-by-level walk down: each level queries for fish whose either
    /// parent pointer lands in the previous level, excluding anything
    /// already visited. Stops at the first level that adds nothing.
    fn walk_descendants(&self, root_id: i64) -> Result<(Vec<LineageNode>, u32)> {
        let mut visited: HashSet<i64> = HashSet::from([root_id]);
        let mut descendants = Vec::new();
        let mut level = vec![root_id];
        let mut generations = 0;

        loop {
            let children = self.store.fish_by_parent_ids(&level)?;
            let mut next = Vec::new();
            for child in children {
                if visited.insert(child.id) {
                    next.push(child.id);
                    descendants.push(LineageNode {
                        fish: child,
                        generation: generations + 1,
                    });
                }
            }
            if next.is_empty() {
                break;
            }
            generations += 1;
            if generations > self.max_depth {
                return Err(Error::LineageDepthExceeded {
                    root: root_id,
                    max: self.max_depth,
                });
            }
            level = next;
        }

        Ok((descendants, generations))
    }
}
