use std::collections::HashMap;
use std::fmt;

use glam::Vec2;

use crate::entities::{Category, Entity, Lifecycle};
use crate::groups::{GroupSet, GroupSets};

/// Unique identifier for an entity in the world.
///
/// Ids are handed out monotonically and never reused, so a stale id can never
/// alias an entity spawned later.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Build an id from its raw value (for hosts and tests).
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the underlying integer ID (useful for debugging or host bindings).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entity registry.
///
/// Owns every live entity record and its group memberships:
/// - each entity sits in the primary group of its category
/// - and optionally in any number of secondary named groups
///
/// The world does not talk to the physics host or the timer set; the session
/// coordinates those so that spawn and despawn stay all-or-nothing.
pub struct World {
    next_id: u32,
    entities: HashMap<EntityId, Entity>,
    primary: GroupSets,
    named: GroupSets,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entities: HashMap::new(),
            primary: GroupSets::new(),
            named: GroupSets::new(),
        }
    }

    /// Reserve the next id, or `None` once the id space is used up. An id
    /// reserved but never inserted (because the host refused the body) simply
    /// reads as removed.
    pub(crate) fn allocate_id(&mut self) -> Option<EntityId> {
        let next = self.next_id.checked_add(1)?;
        let id = EntityId(self.next_id);
        self.next_id = next;
        Some(id)
    }

    /// Insert a fully built record and register its group memberships.
    pub(crate) fn insert(&mut self, entity: Entity, groups: &[String]) {
        let id = entity.id;
        self.primary.insert(entity.category.as_str(), id);
        for group in groups {
            self.named.insert(group, id);
        }
        self.entities.insert(id, entity);
    }

    /// Remove a record from the registry and every group it belongs to. The
    /// returned record is already `Removed`.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let mut entity = self.entities.remove(&id)?;
        self.primary.remove_everywhere(id);
        self.named.remove_everywhere(id);
        entity.state = Lifecycle::Removed;
        Some(entity)
    }

    #[cfg(test)]
    pub(crate) fn set_next_id(&mut self, raw: u32) {
        self.next_id = raw;
    }

    /// Check if an entity is currently alive.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Lifecycle of an id: `None` if it was never issued, `Removed` once it
    /// has been despawned.
    pub fn lifecycle(&self, id: EntityId) -> Option<Lifecycle> {
        match self.entities.get(&id) {
            Some(entity) => Some(entity.state),
            None if id.0 > 0 && id.0 < self.next_id => Some(Lifecycle::Removed),
            None => None,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Category of a live entity.
    pub fn category_of(&self, id: EntityId) -> Option<&Category> {
        self.entities.get(&id).map(|e| &e.category)
    }

    /// True if `id` is alive and of category `category`.
    pub fn is_a(&self, id: EntityId, category: &str) -> bool {
        self.category_of(id).is_some_and(|c| c == category)
    }

    /// True if `id` is alive and a member of the secondary group `group`.
    pub fn in_group(&self, id: EntityId, group: &str) -> bool {
        self.named.get(group).is_some_and(|set| set.contains(id))
    }

    /// Number of alive entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if there are no entities in the world.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of live entities of a category.
    pub fn count(&self, category: &str) -> usize {
        self.primary.get(category).map(GroupSet::len).unwrap_or(0)
    }

    /// Owned snapshot of a category's members in spawn order.
    pub fn ids(&self, category: &str) -> Vec<EntityId> {
        self.primary.snapshot(category)
    }

    /// Owned snapshot of a secondary group's members in insertion order.
    pub fn group_ids(&self, group: &str) -> Vec<EntityId> {
        self.named.snapshot(group)
    }

    /// Restartable cursor over a category. See [`Cursor`].
    pub fn each(&self, category: &str) -> Cursor {
        Cursor::new(self.ids(category))
    }

    /// Restartable cursor over a secondary group.
    pub fn each_in_group(&self, group: &str) -> Cursor {
        Cursor::new(self.group_ids(group))
    }

    /// Add a live entity to a secondary group. Returns false if the entity is
    /// dead or already a member.
    pub fn join_group(&mut self, id: EntityId, group: &str) -> bool {
        if !self.is_alive(id) || group.is_empty() {
            return false;
        }
        self.named.insert(group, id)
    }

    pub fn leave_group(&mut self, id: EntityId, group: &str) -> bool {
        self.named.remove(group, id)
    }

    /// Secondary groups of an entity.
    pub fn groups_of(&self, id: EntityId) -> &[String] {
        self.named.groups_of(id)
    }

    /// Categories in first-spawn order.
    pub fn categories(&self) -> &[String] {
        self.primary.names()
    }

    /// Nearest live entity of `category` to `point`. Ties go to the entity
    /// spawned first.
    pub fn nearest(&self, category: &str, point: Vec2) -> Option<EntityId> {
        let set = self.primary.get(category)?;
        let mut best: Option<(EntityId, f32)> = None;
        for &id in set.as_slice() {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            let dist = entity.body.position.distance_squared(point);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((id, dist));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Iterate over all live entities in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// All live ids sorted by spawn order.
    pub fn all_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot cursor over a group.
///
/// The member list is copied when the cursor is created, so spawning or
/// despawning while iterating can never corrupt it. Entities despawned after
/// the snapshot are skipped when reached; entities spawned after it are never
/// yielded. The cursor does not borrow the world between steps, which lets
/// callers mutate the session inside the loop:
///
/// ```rust
/// # use behave2d::{NullHost, Session, SessionConfig, Spawn};
/// # let mut session = Session::new(SessionConfig::default(), Box::new(NullHost::new()));
/// # session.spawn(Spawn::new("enemy")).unwrap();
/// let mut cursor = session.each("enemy");
/// while let Some(id) = cursor.next(session.world()) {
///     session.despawn(id);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Cursor {
    ids: Vec<EntityId>,
    pos: usize,
}

impl Cursor {
    fn new(ids: Vec<EntityId>) -> Self {
        Self { ids, pos: 0 }
    }

    /// Next id from the snapshot that is still alive.
    pub fn next(&mut self, world: &World) -> Option<EntityId> {
        while let Some(&id) = self.ids.get(self.pos) {
            self.pos += 1;
            if world.is_alive(id) {
                return Some(id);
            }
        }
        None
    }

    /// Snapshot entries not yet visited (alive or not).
    pub fn remaining(&self) -> usize {
        self.ids.len() - self.pos
    }

    /// Drain the rest of the cursor into a vector of live ids.
    pub fn collect_alive(mut self, world: &World) -> Vec<EntityId> {
        let mut out = Vec::with_capacity(self.remaining());
        while let Some(id) = self.next(world) {
            out.push(id);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Attrs;
    use crate::entities::Body;

    fn add(world: &mut World, category: &str, position: Vec2) -> EntityId {
        let id = world.allocate_id().unwrap();
        world.insert(
            Entity {
                id,
                category: Category::new(category).unwrap(),
                state: Lifecycle::Spawned,
                contacts: 0,
                body: Body {
                    position,
                    ..Body::default()
                },
                life: None,
                attrs: Attrs::new(),
            },
            &[],
        );
        id
    }

    #[test]
    fn lifecycle_of_issued_and_unknown_ids() {
        let mut world = World::new();
        let a = add(&mut world, "enemy", Vec2::ZERO);
        assert_eq!(world.lifecycle(a), Some(Lifecycle::Spawned));
        world.remove(a);
        assert_eq!(world.lifecycle(a), Some(Lifecycle::Removed));
        assert_eq!(world.lifecycle(EntityId::from_raw(99)), None);
        assert_eq!(world.lifecycle(EntityId::from_raw(0)), None);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut world = World::new();
        let a = add(&mut world, "enemy", Vec2::ZERO);
        world.remove(a);
        let b = add(&mut world, "enemy", Vec2::ZERO);
        assert_ne!(a, b);
        assert!(!world.is_alive(a));
    }

    #[test]
    fn allocation_stops_when_ids_run_out() {
        let mut world = World::new();
        world.set_next_id(u32::MAX - 1);
        let last = world.allocate_id();
        assert_eq!(last, Some(EntityId::from_raw(u32::MAX - 1)));
        assert_eq!(world.allocate_id(), None);
        assert_eq!(world.allocate_id(), None);
        assert_eq!(world.lifecycle(EntityId::from_raw(u32::MAX - 1)), Some(Lifecycle::Removed));
    }

    #[test]
    fn cursor_skips_entities_removed_after_snapshot() {
        let mut world = World::new();
        let a = add(&mut world, "enemy", Vec2::ZERO);
        let b = add(&mut world, "enemy", Vec2::ZERO);
        let c = add(&mut world, "enemy", Vec2::ZERO);

        let mut cursor = world.each("enemy");
        assert_eq!(cursor.next(&world), Some(a));
        world.remove(a);
        world.remove(c);
        let late = add(&mut world, "enemy", Vec2::ZERO);
        assert_eq!(cursor.next(&world), Some(b));
        assert_eq!(cursor.next(&world), None);
        assert!(world.ids("enemy").contains(&late));
    }

    #[test]
    fn group_cursor_skips_entities_removed_after_snapshot() {
        let mut world = World::new();
        let a = add(&mut world, "enemy", Vec2::ZERO);
        let b = add(&mut world, "bat", Vec2::ZERO);
        let c = add(&mut world, "enemy", Vec2::ZERO);
        for id in [a, b, c] {
            assert!(world.join_group(id, "swarm"));
        }

        let mut cursor = world.each_in_group("swarm");
        assert_eq!(cursor.next(&world), Some(a));
        world.remove(a);
        world.remove(b);
        let late = add(&mut world, "bat", Vec2::ZERO);
        assert!(world.join_group(late, "swarm"));
        assert_eq!(cursor.next(&world), Some(c));
        assert_eq!(cursor.next(&world), None);

        let mut restarted = world.each_in_group("swarm");
        assert_eq!(restarted.collect_alive(&world), vec![c, late]);
    }

    #[test]
    fn nearest_prefers_first_spawned_on_ties() {
        let mut world = World::new();
        let far = add(&mut world, "enemy", Vec2::new(100.0, 0.0));
        let left = add(&mut world, "enemy", Vec2::new(-10.0, 0.0));
        let right = add(&mut world, "enemy", Vec2::new(10.0, 0.0));
        add(&mut world, "pickup", Vec2::ZERO);

        assert_eq!(world.nearest("enemy", Vec2::ZERO), Some(left));
        world.remove(left);
        assert_eq!(world.nearest("enemy", Vec2::ZERO), Some(right));
        world.remove(right);
        assert_eq!(world.nearest("enemy", Vec2::ZERO), Some(far));
        assert_eq!(world.nearest("boss", Vec2::ZERO), None);
    }

    #[test]
    fn removal_clears_secondary_groups() {
        let mut world = World::new();
        let a = add(&mut world, "enemy", Vec2::ZERO);
        assert!(world.join_group(a, "sensed"));
        assert!(world.in_group(a, "sensed"));
        world.remove(a);
        assert!(!world.in_group(a, "sensed"));
        assert!(!world.join_group(a, "sensed"));
        assert_eq!(world.count("enemy"), 0);
    }
}
