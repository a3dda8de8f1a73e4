//! Parent/child bookkeeping for render components.
//!
//! The scene graph itself owns components top-down. This index only records
//! which id was attached under which, so teardown can find every descendant
//! without walking the graph.

use std::collections::{BTreeSet, HashMap};

use crate::world::EntityId;

#[derive(Debug, Default)]
pub struct Hierarchy {
    parents: HashMap<EntityId, EntityId>,
    children: HashMap<EntityId, BTreeSet<EntityId>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the parent of an entity, if it has one.
    pub fn get_parent(&self, entity: EntityId) -> Option<EntityId> {
        self.parents.get(&entity).copied()
    }

    /// Get the direct children of an entity, in id order.
    pub fn get_children(&self, entity: EntityId) -> Vec<EntityId> {
        self.children
            .get(&entity)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Set the parent of an entity, replacing any previous parent.
    ///
    /// Passing `None` makes the entity a root.
    pub fn set_parent(&mut self, entity: EntityId, parent: Option<EntityId>) {
        if let Some(old) = self.parents.remove(&entity) {
            if let Some(siblings) = self.children.get_mut(&old) {
                siblings.remove(&entity);
                if siblings.is_empty() {
                    self.children.remove(&old);
                }
            }
        }

        if let Some(parent) = parent {
            self.parents.insert(entity, parent);
            self.children.entry(parent).or_default().insert(entity);
        }
    }

    /// Forget `entity` and everything below it. Returns the removed ids,
    /// parents before children.
    pub fn remove_subtree(&mut self, entity: EntityId) -> Vec<EntityId> {
        self.set_parent(entity, None);

        let mut removed = Vec::new();
        let mut stack = vec![entity];
        while let Some(id) = stack.pop() {
            removed.push(id);
            if let Some(children) = self.children.remove(&id) {
                for child in children.into_iter().rev() {
                    self.parents.remove(&child);
                    stack.push(child);
                }
            }
        }
        removed
    }

    /// True if any relation mentions `entity`.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.parents.contains_key(&entity)
            || self.children.contains_key(&entity)
            || self.children.values().any(|c| c.contains(&entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> EntityId {
        EntityId::new(n)
    }

    #[test]
    fn reparenting_moves_the_child() {
        let mut h = Hierarchy::new();
        h.set_parent(id(2), Some(id(1)));
        h.set_parent(id(2), Some(id(3)));

        assert_eq!(h.get_parent(id(2)), Some(id(3)));
        assert!(h.get_children(id(1)).is_empty());
        assert_eq!(h.get_children(id(3)), vec![id(2)]);
    }

    #[test]
    fn subtree_removal_leaves_no_trace() {
        let mut h = Hierarchy::new();
        h.set_parent(id(2), Some(id(1)));
        h.set_parent(id(3), Some(id(2)));
        h.set_parent(id(4), Some(id(2)));
        h.set_parent(id(5), Some(id(1)));

        assert_eq!(h.remove_subtree(id(2)), vec![id(2), id(3), id(4)]);

        for n in 2..=4 {
            assert!(!h.contains(id(n)));
        }
        assert_eq!(h.get_children(id(1)), vec![id(5)]);
    }
}
