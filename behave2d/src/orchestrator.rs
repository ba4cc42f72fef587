//! Despawn cascades.
//!
//! A cascade rule says "when an entity of this category goes away, spawn
//! these in its place": explosion particles, experience orbs, split rocks.
//! The session queues the remains of every despawned entity and drains the
//! queue breadth-first from the outermost `despawn` call, so a cascade that
//! despawns something else never recurses.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::entities::{Category, Remains, Spawn};
use crate::error::Result;

/// Builds the `index`-th spawn of a cascade from the remains of the entity
/// that triggered it.
pub type SpawnFactory = Rc<dyn Fn(&Remains, usize) -> Spawn>;

#[derive(Clone)]
pub struct SpawnRule {
    pub count: usize,
    pub factory: SpawnFactory,
}

impl SpawnRule {
    pub fn new<F>(count: usize, factory: F) -> Self
    where
        F: Fn(&Remains, usize) -> Spawn + 'static,
    {
        Self {
            count,
            factory: Rc::new(factory),
        }
    }

    /// The spawns this rule produces for one set of remains.
    pub fn build(&self, remains: &Remains) -> Vec<Spawn> {
        (0..self.count).map(|i| (self.factory)(remains, i)).collect()
    }
}

impl fmt::Debug for SpawnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnRule")
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

/// Cascade rules per category, plus the queue of remains waiting for their
/// cascades to run.
#[derive(Default)]
pub struct DespawnRules {
    rules: HashMap<Category, Vec<SpawnRule>>,
    queue: VecDeque<Remains>,
    draining: bool,
}

impl DespawnRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Several rules on one category all run, in insertion order.
    pub fn add(&mut self, category: &str, rule: SpawnRule) -> Result<()> {
        let category = Category::new(category)?;
        self.rules.entry(category).or_default().push(rule);
        Ok(())
    }

    pub fn has_rules(&self, category: &str) -> bool {
        self.rules.get(category).is_some_and(|r| !r.is_empty())
    }

    /// Spawns owed to `remains`, across every rule of its category.
    pub fn spawns_for(&self, remains: &Remains) -> Vec<Spawn> {
        self.rules
            .get(remains.category.as_str())
            .map(|rules| rules.iter().flat_map(|r| r.build(remains)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn enqueue(&mut self, remains: Remains) {
        self.queue.push_back(remains);
    }

    pub(crate) fn pop(&mut self) -> Option<Remains> {
        self.queue.pop_front()
    }

    /// Claim the drain. Returns false when an outer call is already draining.
    pub(crate) fn begin_drain(&mut self) -> bool {
        !std::mem::replace(&mut self.draining, true)
    }

    pub(crate) fn end_drain(&mut self) {
        self.draining = false;
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Attrs;
    use crate::world::EntityId;
    use glam::Vec2;

    fn remains(category: &str) -> Remains {
        Remains {
            id: EntityId::from_raw(3),
            category: Category::new(category).unwrap(),
            position: Vec2::new(5.0, 6.0),
            velocity: Vec2::ZERO,
            attrs: Attrs::new(),
        }
    }

    #[test]
    fn rules_build_count_spawns_at_remains() {
        let mut rules = DespawnRules::new();
        rules
            .add("enemy", SpawnRule::new(3, |r, i| Spawn::new("particle").at(r.position).attr("index", i as i64)))
            .unwrap();
        rules.add("enemy", SpawnRule::new(1, |r, _| Spawn::new("exp").at(r.position))).unwrap();

        let spawns = rules.spawns_for(&remains("enemy"));
        let names: Vec<_> = spawns.iter().map(|s| s.category_name()).collect();
        assert_eq!(names, vec!["particle", "particle", "particle", "exp"]);
        assert!(spawns.iter().all(|s| s.position() == Vec2::new(5.0, 6.0)));
        assert!(rules.spawns_for(&remains("bullet")).is_empty());
    }

    #[test]
    fn drain_is_claimed_once() {
        let mut rules = DespawnRules::new();
        assert!(rules.begin_drain());
        assert!(!rules.begin_drain());
        rules.end_drain();
        assert!(rules.begin_drain());
    }

    #[test]
    fn bad_category_is_rejected() {
        let mut rules = DespawnRules::new();
        assert!(rules.add("Enemy!", SpawnRule::new(1, |_, _| Spawn::new("x"))).is_err());
    }
}
