//! Named, ordered collections of entity ids.

use std::collections::HashMap;

use crate::world::EntityId;

/// One named collection. Insertion order is spawn order and is used for draw
/// order and nearest-neighbour tie-breaks.
#[derive(Clone, Debug, Default)]
pub struct GroupSet {
    members: Vec<EntityId>,
}

impl GroupSet {
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn as_slice(&self) -> &[EntityId] {
        &self.members
    }

    fn insert(&mut self, id: EntityId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.members.push(id);
        true
    }

    fn remove(&mut self, id: EntityId) -> bool {
        match self.members.iter().position(|&m| m == id) {
            Some(idx) => {
                self.members.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// All group sets of a world plus a reverse index so removing an entity does
/// not have to scan every group.
#[derive(Debug, Default)]
pub struct GroupSets {
    sets: HashMap<String, GroupSet>,
    order: Vec<String>,
    memberships: HashMap<EntityId, Vec<String>>,
}

impl GroupSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` to `group`, creating the group on first use.
    /// Returns false if it was already a member.
    pub fn insert(&mut self, group: &str, id: EntityId) -> bool {
        if !self.sets.contains_key(group) {
            self.sets.insert(group.to_string(), GroupSet::default());
            self.order.push(group.to_string());
        }
        let Some(set) = self.sets.get_mut(group) else {
            return false;
        };
        if !set.insert(id) {
            return false;
        }
        self.memberships
            .entry(id)
            .or_default()
            .push(group.to_string());
        true
    }

    pub fn remove(&mut self, group: &str, id: EntityId) -> bool {
        let removed = self
            .sets
            .get_mut(group)
            .map(|set| set.remove(id))
            .unwrap_or(false);
        if removed {
            if let Some(groups) = self.memberships.get_mut(&id) {
                groups.retain(|g| g != group);
                if groups.is_empty() {
                    self.memberships.remove(&id);
                }
            }
        }
        removed
    }

    /// Remove `id` from every group it belongs to.
    pub fn remove_everywhere(&mut self, id: EntityId) {
        if let Some(groups) = self.memberships.remove(&id) {
            for group in groups {
                if let Some(set) = self.sets.get_mut(&group) {
                    set.remove(id);
                }
            }
        }
    }

    pub fn get(&self, group: &str) -> Option<&GroupSet> {
        self.sets.get(group)
    }

    /// Owned copy of a group's members, in insertion order.
    pub fn snapshot(&self, group: &str) -> Vec<EntityId> {
        self.sets
            .get(group)
            .map(|set| set.members.clone())
            .unwrap_or_default()
    }

    pub fn groups_of(&self, id: EntityId) -> &[String] {
        self.memberships
            .get(&id)
            .map(|g| g.as_slice())
            .unwrap_or(&[])
    }

    /// Group names in the order they were first used.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn clear(&mut self) {
        self.sets.clear();
        self.order.clear();
        self.memberships.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> EntityId {
        EntityId::from_raw(n)
    }

    #[test]
    fn insertion_order_and_uniqueness() {
        let mut groups = GroupSets::new();
        assert!(groups.insert("enemy", id(3)));
        assert!(groups.insert("enemy", id(1)));
        assert!(!groups.insert("enemy", id(3)));
        assert_eq!(groups.snapshot("enemy"), vec![id(3), id(1)]);
    }

    #[test]
    fn remove_everywhere_clears_all_memberships() {
        let mut groups = GroupSets::new();
        groups.insert("enemy", id(1));
        groups.insert("sensed", id(1));
        groups.insert("enemy", id(2));

        groups.remove_everywhere(id(1));

        assert_eq!(groups.snapshot("enemy"), vec![id(2)]);
        assert!(groups.snapshot("sensed").is_empty());
        assert!(groups.groups_of(id(1)).is_empty());
        assert_eq!(groups.names(), ["enemy".to_string(), "sensed".to_string()]);
    }

    #[test]
    fn remove_single_group_keeps_others() {
        let mut groups = GroupSets::new();
        groups.insert("enemy", id(1));
        groups.insert("sensed", id(1));
        assert!(groups.remove("sensed", id(1)));
        assert!(!groups.remove("sensed", id(1)));
        assert_eq!(groups.groups_of(id(1)), ["enemy".to_string()]);
    }
}
