//! Tree Assembler
//!
//! Rebuilds parent → children structure from a flat list of nodes. Used by the
//! staging cache after every structural mutation and by the tree service when
//! it nests a fetched tree.
//!
//! # Design
//!
//! - **Stateless**: `assemble` recomputes the whole forest from the flat list,
//!   so edges from an earlier call can never leak into the new result.
//! - **Index based**: A `Forest` stores positions into the input slice. The
//!   flat list stays the single owner of node data.
//! - **Orphans are roots**: A node whose parent id is not in the list becomes a
//!   root. This is the normal case when only part of a tree has been pulled.
//! - **Total**: Self-parented nodes and parent cycles are broken by rooting the
//!   first node of the cycle, so every input item appears exactly once.

use std::collections::HashMap;

/// Anything that can be placed in a tree by id and parent id
pub trait TreeItem {
    fn item_id(&self) -> i64;
    fn parent_item_id(&self) -> Option<i64>;
}

impl<T: TreeItem + ?Sized> TreeItem for &T {
    fn item_id(&self) -> i64 {
        (**self).item_id()
    }

    fn parent_item_id(&self) -> Option<i64> {
        (**self).parent_item_id()
    }
}

/// Parent → children adjacency over a flat item slice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
}

/// Assemble a forest from a flat list. Children keep the order of the input.
///
/// When two items share an id, children attach to the last one.
pub fn assemble<T: TreeItem>(items: &[T]) -> Forest {
    let mut index_by_id: HashMap<i64, usize> = HashMap::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        index_by_id.insert(item.item_id(), idx);
    }

    let mut forest = Forest {
        roots: Vec::new(),
        children: vec![Vec::new(); items.len()],
    };

    for (idx, item) in items.iter().enumerate() {
        match item
            .parent_item_id()
            .and_then(|parent_id| index_by_id.get(&parent_id).copied())
        {
            Some(parent_idx) if parent_idx != idx => {
                forest.children[parent_idx].push(idx);
            }
            _ => forest.roots.push(idx),
        }
    }

    forest.break_cycles();
    forest
}

impl Forest {
    /// Root positions in input order
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Direct children of the item at `idx`
    pub fn children_of(&self, idx: usize) -> &[usize] {
        self.children.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of items the forest was built from
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// All descendants of `idx` in pre-order, excluding `idx` itself
    pub fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children_of(idx).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children_of(next).iter().rev());
        }
        out
    }

    /// Every item in pre-order, root by root
    pub fn pre_order(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len());
        for &root in &self.roots {
            out.push(root);
            out.extend(self.descendants(root));
        }
        out
    }

    /// Build one owned nested value per root, bottom-up.
    ///
    /// `build` receives an item and the already built values of its children.
    /// Runs without recursion so deep server trees cannot exhaust the stack.
    pub fn fold<T, U, F>(&self, items: &[T], mut build: F) -> Vec<U>
    where
        F: FnMut(&T, Vec<U>) -> U,
    {
        let mut built: Vec<Option<U>> = (0..items.len()).map(|_| None).collect();

        for idx in self.post_order() {
            let children = self.children[idx]
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            built[idx] = Some(build(&items[idx], children));
        }

        self.roots
            .iter()
            .filter_map(|&root| built[root].take())
            .collect()
    }

    fn post_order(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<(usize, bool)> = self.roots.iter().rev().map(|&r| (r, false)).collect();

        while let Some((idx, expanded)) = stack.pop() {
            if expanded {
                out.push(idx);
                continue;
            }
            stack.push((idx, true));
            stack.extend(self.children[idx].iter().rev().map(|&c| (c, false)));
        }
        out
    }

    /// Items caught in a parent cycle are unreachable from any root. Detach the
    /// first unreachable item of each cycle from its parent and root it.
    fn break_cycles(&mut self) {
        let mut reachable = vec![false; self.len()];
        for idx in self.pre_order() {
            reachable[idx] = true;
        }

        for idx in 0..self.len() {
            if reachable[idx] {
                continue;
            }

            for siblings in self.children.iter_mut() {
                siblings.retain(|&child| child != idx);
            }
            self.roots.push(idx);

            reachable[idx] = true;
            for descendant in self.descendants(idx) {
                reachable[descendant] = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Item(i64, Option<i64>);

    impl TreeItem for Item {
        fn item_id(&self) -> i64 {
            self.0
        }

        fn parent_item_id(&self) -> Option<i64> {
            self.1
        }
    }

    fn ids(items: &[Item], positions: &[usize]) -> Vec<i64> {
        positions.iter().map(|&p| items[p].0).collect()
    }

    #[derive(Debug, PartialEq)]
    struct Nested(i64, Vec<Nested>);

    #[test]
    fn test_assemble_links_children_in_input_order() {
        let items = vec![
            Item(1, None),
            Item(3, Some(1)),
            Item(2, Some(1)),
            Item(21, Some(2)),
        ];
        let forest = assemble(&items);

        assert_eq!(ids(&items, forest.roots()), vec![1]);
        assert_eq!(ids(&items, forest.children_of(0)), vec![3, 2]);
        assert_eq!(ids(&items, forest.children_of(2)), vec![21]);
        assert_eq!(ids(&items, &forest.pre_order()), vec![1, 3, 2, 21]);
    }

    #[test]
    fn test_orphans_become_roots() {
        // Only a subtree was pulled: 2 is missing, so 21 has no parent in the list.
        let items = vec![Item(1, None), Item(21, Some(2)), Item(211, Some(21))];
        let forest = assemble(&items);

        assert_eq!(ids(&items, forest.roots()), vec![1, 21]);
        assert_eq!(ids(&items, forest.children_of(1)), vec![211]);
    }

    #[test]
    fn test_reassembly_has_no_stale_edges() {
        let mut items = vec![Item(1, None), Item(2, Some(1)), Item(3, Some(2))];
        let before = assemble(&items);
        assert_eq!(before.descendants(0).len(), 2);

        items.remove(1);
        let after = assemble(&items);
        assert_eq!(ids(&items, after.roots()), vec![1, 3]);
        assert!(after.children_of(0).is_empty());
    }

    #[test]
    fn test_self_parent_and_cycles_are_rooted() {
        let items = vec![Item(5, Some(5)), Item(6, Some(7)), Item(7, Some(6))];
        let forest = assemble(&items);

        assert_eq!(ids(&items, forest.roots()), vec![5, 6]);
        assert_eq!(ids(&items, forest.children_of(1)), vec![7]);
        assert_eq!(forest.pre_order().len(), 3);
    }

    #[test]
    fn test_fold_builds_nested_values() {
        let items = vec![
            Item(1, None),
            Item(2, Some(1)),
            Item(4, Some(2)),
            Item(3, Some(1)),
            Item(9, Some(100)),
        ];
        let forest = assemble(&items);

        let nested = forest.fold(&items, |item, children| Nested(item.0, children));
        assert_eq!(
            nested,
            vec![
                Nested(1, vec![Nested(2, vec![Nested(4, vec![])]), Nested(3, vec![])]),
                Nested(9, vec![]),
            ]
        );
    }

    #[test]
    fn test_fold_handles_deep_chains() {
        let items: Vec<Item> = (0..50_000)
            .map(|i| Item(i, if i == 0 { None } else { Some(i - 1) }))
            .collect();
        let forest = assemble(&items);

        let depth = forest.fold(&items, |_, children: Vec<usize>| {
            children.into_iter().max().unwrap_or(0) + 1
        });
        assert_eq!(depth, vec![50_000]);
    }

    #[test]
    fn test_empty_input() {
        let forest = assemble::<Item>(&[]);
        assert!(forest.is_empty());
        assert!(forest.roots().is_empty());
        assert!(forest.children_of(3).is_empty());
    }
}
