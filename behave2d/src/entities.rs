//! Entity records and the descriptors used to spawn them.
//!
//! An entity is a fixed record: identity, category, a physical body, an
//! optional life pool and a typed attribute payload. Behavior is attached per
//! category (see `behavior`), never per instance.

use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::attrs::{AttrValue, Attrs};
use crate::error::{BehaveError, Result};
use crate::world::EntityId;

const MAX_CATEGORY_LEN: usize = 32;

/// Category tag such as `enemy`, `bullet` or `pickup`.
///
/// Cheap to clone; the name is validated once on construction.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(Rc<str>);

impl Category {
    pub fn new(name: &str) -> Result<Self> {
        let invalid = |reason| BehaveError::InvalidCategory {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if name.len() > MAX_CATEGORY_LEN {
            return Err(invalid("longer than 32 characters"));
        }
        if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(invalid("must start with a lowercase letter"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(invalid("only lowercase letters, digits, '_' and '-' are allowed"));
        }

        Ok(Self(Rc::from(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Category({})", self.0)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Category {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Category {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Category {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Where an entity is in its lifetime.
///
/// `Despawning` names the teardown inside `Session::despawn`. It is never
/// stored: the record leaves the registry and reads as `Removed` in one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Spawned,
    Active,
    Despawning,
    Removed,
}

/// Host-facing rigid body type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigidBodyType {
    Dynamic,
    #[default]
    Kinematic,
    Fixed,
}

/// Host-facing collider shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Box { hx: f32, hy: f32 },
    Circle { radius: f32 },
}

/// Physical state of an entity as mirrored from the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub shape: ColliderShape,
    pub body_type: RigidBodyType,
    pub sensor: bool,
}

impl Body {
    /// Axis-aligned size of the collider.
    pub fn size(&self) -> Vec2 {
        match self.shape {
            ColliderShape::Box { hx, hy } => Vec2::new(hx * 2.0, hy * 2.0),
            ColliderShape::Circle { radius } => Vec2::splat(radius * 2.0),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            shape: ColliderShape::Box { hx: 4.0, hy: 4.0 },
            body_type: RigidBodyType::Kinematic,
            sensor: false,
        }
    }
}

/// Life pool, always kept within `0..=max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Life {
    current: i32,
    max: i32,
}

impl Life {
    pub fn new(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn set(&mut self, value: i32) {
        self.current = value.clamp(0, self.max);
    }

    /// Add `delta` (negative to damage) and return the clamped result.
    pub fn adjust(&mut self, delta: i32) -> i32 {
        self.set(self.current.saturating_add(delta));
        self.current
    }

    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }

    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.current as f32 / self.max as f32
        }
    }
}

/// A live entity record.
#[derive(Clone, Debug)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) category: Category,
    pub(crate) state: Lifecycle,
    pub(crate) contacts: u32,
    pub(crate) body: Body,
    pub life: Option<Life>,
    pub attrs: Attrs,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state
    }

    /// Number of contact dispatches this entity took part in.
    pub fn contact_count(&self) -> u32 {
        self.contacts
    }

    /// Body as last synced from the host. Move it with
    /// `Session::set_position` and `Session::set_velocity`.
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.body.velocity
    }
}

/// Description of an entity to create.
///
/// ```rust
/// use behave2d::{Spawn, Vec2};
///
/// let bullet = Spawn::new("bullet")
///     .at(Vec2::new(10.0, 20.0))
///     .velocity(Vec2::new(0.0, -200.0))
///     .sensor(true)
///     .attr("damage", 1);
/// ```
#[derive(Clone, Debug)]
pub struct Spawn {
    pub(crate) category: String,
    pub(crate) body: Body,
    pub(crate) life: Option<i32>,
    pub(crate) attrs: Attrs,
    pub(crate) groups: Vec<String>,
    pub(crate) ttl: Option<Duration>,
}

impl Spawn {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            body: Body::default(),
            life: None,
            attrs: Attrs::new(),
            groups: Vec::new(),
            ttl: None,
        }
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.body.position = position;
        self
    }

    pub fn velocity(mut self, velocity: Vec2) -> Self {
        self.body.velocity = velocity;
        self
    }

    /// Box collider with the given full width and height.
    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.body.shape = ColliderShape::Box {
            hx: width * 0.5,
            hy: height * 0.5,
        };
        self
    }

    pub fn circle(mut self, radius: f32) -> Self {
        self.body.shape = ColliderShape::Circle { radius };
        self
    }

    pub fn body_type(mut self, body_type: RigidBodyType) -> Self {
        self.body.body_type = body_type;
        self
    }

    pub fn dynamic(self) -> Self {
        self.body_type(RigidBodyType::Dynamic)
    }

    pub fn sensor(mut self, sensor: bool) -> Self {
        self.body.sensor = sensor;
        self
    }

    pub fn life(mut self, max: i32) -> Self {
        self.life = Some(max);
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.set(key, value);
        self
    }

    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    /// Also add the entity to a secondary named group.
    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.groups.push(name.into());
        self
    }

    /// Despawn the entity automatically after `ttl`.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn category_name(&self) -> &str {
        &self.category
    }

    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Validate everything that can be checked before talking to the host.
    pub(crate) fn validate(&self) -> Result<Category> {
        let category = Category::new(&self.category)?;
        self.attrs.validate()?;

        let body = &self.body;
        if !body.position.is_finite() || !body.velocity.is_finite() {
            return Err(BehaveError::InvalidAttribute {
                key: "body".into(),
                reason: "position and velocity must be finite",
            });
        }
        let shape_ok = match body.shape {
            ColliderShape::Box { hx, hy } => hx > 0.0 && hy > 0.0 && hx.is_finite() && hy.is_finite(),
            ColliderShape::Circle { radius } => radius > 0.0 && radius.is_finite(),
        };
        if !shape_ok {
            return Err(BehaveError::InvalidAttribute {
                key: "shape".into(),
                reason: "collider extents must be positive and finite",
            });
        }
        if let Some(max) = self.life {
            if max <= 0 {
                return Err(BehaveError::InvalidAttribute {
                    key: "life".into(),
                    reason: "life must be positive",
                });
            }
        }
        for group in &self.groups {
            if group.is_empty() {
                return Err(BehaveError::InvalidAttribute {
                    key: "group".into(),
                    reason: "group name must not be empty",
                });
            }
        }
        Ok(category)
    }
}

/// What is left of an entity once it has been despawned. Handed to despawn
/// cascades so they can place their spawns.
#[derive(Clone, Debug)]
pub struct Remains {
    pub id: EntityId,
    pub category: Category,
    pub position: Vec2,
    pub velocity: Vec2,
    pub attrs: Attrs,
}

impl From<Entity> for Remains {
    fn from(entity: Entity) -> Self {
        Self {
            id: entity.id,
            category: entity.category,
            position: entity.body.position,
            velocity: entity.body.velocity,
            attrs: entity.attrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_validation() {
        assert!(Category::new("enemy").is_ok());
        assert!(Category::new("exp_orb-2").is_ok());
        assert!(Category::new("").is_err());
        assert!(Category::new("Enemy").is_err());
        assert!(Category::new("2fast").is_err());
        assert!(Category::new("bad tag").is_err());
        assert!(Category::new(&"a".repeat(33)).is_err());
    }

    #[test]
    fn life_is_clamped() {
        let mut life = Life::new(3);
        assert_eq!(life.adjust(-1), 2);
        assert_eq!(life.adjust(10), 3);
        assert_eq!(life.adjust(-10), 0);
        assert!(life.is_depleted());
        life.set(2);
        assert!((life.fraction() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn spawn_validation_catches_bad_bodies() {
        assert!(Spawn::new("enemy").validate().is_ok());
        assert!(Spawn::new("enemy").size(0.0, 4.0).validate().is_err());
        assert!(Spawn::new("enemy").circle(-1.0).validate().is_err());
        assert!(Spawn::new("enemy").life(0).validate().is_err());
        assert!(Spawn::new("enemy")
            .at(Vec2::new(f32::NAN, 0.0))
            .validate()
            .is_err());
        assert!(Spawn::new("enemy").group("").validate().is_err());
    }

    #[test]
    fn body_size_from_shape() {
        let spawn = Spawn::new("bullet").size(3.0, 4.0);
        assert_eq!(spawn.body.size(), Vec2::new(3.0, 4.0));
        let spawn = Spawn::new("sensor").circle(50.0);
        assert_eq!(spawn.body.size(), Vec2::splat(100.0));
    }
}
