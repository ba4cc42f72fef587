//! Per-category behavior table.
//!
//! Instead of attaching closures to individual entities, a game registers
//! named functions once per category. Per-entity state lives in the entity's
//! attributes and life pool, so the functions themselves stay stateless.

use std::collections::HashMap;
use std::fmt;

use crate::draw::Canvas;
use crate::entities::{Category, Entity};
use crate::error::Result;
use crate::session::Session;
use crate::world::EntityId;

/// Called once per tick for every live entity of the category.
pub type UpdateFn = fn(&mut Session, EntityId, f32);

/// Called once per frame for every live entity of the category.
pub type DrawFn = fn(&Session, &Entity, &mut dyn Canvas);

/// Which parts of the frame an entity takes part in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub updatable: bool,
    pub drawable: bool,
    pub contactable: bool,
}

#[derive(Clone, Copy)]
pub struct CategoryBehavior {
    update: Option<UpdateFn>,
    draw: Option<DrawFn>,
    visible: bool,
}

impl CategoryBehavior {
    pub fn new() -> Self {
        Self {
            update: None,
            draw: None,
            visible: true,
        }
    }

    pub fn update(mut self, f: UpdateFn) -> Self {
        self.update = Some(f);
        self
    }

    /// Custom draw function; without one a drawable entity is drawn as a
    /// rectangle covering its collider.
    pub fn draw(mut self, f: DrawFn) -> Self {
        self.draw = Some(f);
        self
    }

    /// Never draw this category (sensors, spawners, ...).
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn update_fn(&self) -> Option<UpdateFn> {
        self.update
    }

    pub fn draw_fn(&self) -> Option<DrawFn> {
        self.draw
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl fmt::Debug for CategoryBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryBehavior")
            .field("update", &self.update.is_some())
            .field("draw", &self.draw.is_some())
            .field("visible", &self.visible)
            .finish()
    }
}

impl Default for CategoryBehavior {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct Behaviors {
    table: HashMap<Category, CategoryBehavior>,
    order: Vec<Category>,
}

impl Behaviors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the behavior of a category.
    pub fn register(&mut self, category: &str, behavior: CategoryBehavior) -> Result<()> {
        let category = Category::new(category)?;
        if self.table.insert(category.clone(), behavior).is_none() {
            self.order.push(category);
        }
        Ok(())
    }

    pub fn get(&self, category: &str) -> Option<&CategoryBehavior> {
        self.table.get(category)
    }

    /// Categories with an update function, in registration order.
    pub fn updatable(&self) -> Vec<(Category, UpdateFn)> {
        self.order
            .iter()
            .filter_map(|c| {
                let update = self.table.get(c)?.update?;
                Some((c.clone(), update))
            })
            .collect()
    }

    /// Capabilities of a category; `contactable` is filled in by the session,
    /// which knows the contact router.
    pub fn capabilities(&self, category: &str) -> Capabilities {
        match self.get(category) {
            Some(b) => Capabilities {
                updatable: b.update.is_some(),
                drawable: b.visible,
                contactable: false,
            },
            None => Capabilities {
                updatable: false,
                drawable: true,
                contactable: false,
            },
        }
    }

    pub fn clear(&mut self) {
        self.table.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Session, _: EntityId, _: f32) {}

    #[test]
    fn registration_order_and_capabilities() {
        let mut behaviors = Behaviors::new();
        behaviors
            .register("enemy", CategoryBehavior::new().update(noop))
            .unwrap();
        behaviors
            .register("sensor", CategoryBehavior::new().hidden())
            .unwrap();
        behaviors
            .register("bullet", CategoryBehavior::new().update(noop))
            .unwrap();

        let names: Vec<_> = behaviors
            .updatable()
            .into_iter()
            .map(|(c, _)| c.to_string())
            .collect();
        assert_eq!(names, vec!["enemy", "bullet"]);

        let caps = behaviors.capabilities("sensor");
        assert!(!caps.drawable && !caps.updatable);
        let caps = behaviors.capabilities("wall");
        assert!(caps.drawable && !caps.updatable);
    }

    #[test]
    fn invalid_category_is_rejected() {
        let mut behaviors = Behaviors::new();
        assert!(behaviors.register("Bad Name", CategoryBehavior::new()).is_err());
    }
}
