//! The physics host seam.
//!
//! The lifecycle layer never simulates anything itself: bodies are handed to a
//! [`PhysicsHost`], which integrates them and reports contacts. `RapierHost`
//! (in `physics`) is the real implementation; [`NullHost`] only integrates
//! velocities and is handy for tests and tools.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use glam::Vec2;

use crate::contact::ContactEvent;
use crate::entities::Body;
use crate::world::EntityId;

/// Body state read back from the host after a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub position: Vec2,
    pub velocity: Vec2,
}

pub trait PhysicsHost {
    /// Register a body. Must either fully succeed or leave nothing behind.
    /// `contact_events` asks the host to report contacts for this body.
    fn add_entity(&mut self, id: EntityId, body: &Body, contact_events: bool) -> Result<()>;

    /// Turn contact reporting on or off for an existing body.
    fn set_contact_events(&mut self, _id: EntityId, _enabled: bool) {}

    /// Deregister a body. Unknown ids are ignored.
    fn remove_entity(&mut self, id: EntityId);

    fn set_position(&mut self, id: EntityId, position: Vec2);

    fn set_velocity(&mut self, id: EntityId, velocity: Vec2);

    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f32);

    fn body_state(&self, id: EntityId) -> Option<BodyState>;

    /// Contact transitions collected since the last drain, in host order.
    fn drain_contacts(&mut self) -> Vec<ContactEvent>;
}

/// Host without collision detection: bodies move by their velocity and
/// contacts only appear when injected.
#[derive(Debug, Default)]
pub struct NullHost {
    bodies: HashMap<EntityId, BodyState>,
    pending: Vec<ContactEvent>,
}

impl NullHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a contact to be reported by the next drain.
    pub fn inject(&mut self, event: ContactEvent) {
        self.pending.push(event);
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn has_body(&self, id: EntityId) -> bool {
        self.bodies.contains_key(&id)
    }
}

impl PhysicsHost for NullHost {
    fn add_entity(&mut self, id: EntityId, body: &Body, _contact_events: bool) -> Result<()> {
        if self.bodies.contains_key(&id) {
            return Err(anyhow!("Entity {:?} already has a body", id));
        }
        self.bodies.insert(
            id,
            BodyState {
                position: body.position,
                velocity: body.velocity,
            },
        );
        Ok(())
    }

    fn remove_entity(&mut self, id: EntityId) {
        self.bodies.remove(&id);
    }

    fn set_position(&mut self, id: EntityId, position: Vec2) {
        if let Some(state) = self.bodies.get_mut(&id) {
            state.position = position;
        }
    }

    fn set_velocity(&mut self, id: EntityId, velocity: Vec2) {
        if let Some(state) = self.bodies.get_mut(&id) {
            state.velocity = velocity;
        }
    }

    fn step(&mut self, dt: f32) {
        for state in self.bodies.values_mut() {
            state.position += state.velocity * dt;
        }
    }

    fn body_state(&self, id: EntityId) -> Option<BodyState> {
        self.bodies.get(&id).copied()
    }

    fn drain_contacts(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_host_integrates_velocity() {
        let mut host = NullHost::new();
        let id = EntityId::from_raw(1);
        let body = Body {
            velocity: Vec2::new(10.0, -20.0),
            ..Body::default()
        };
        host.add_entity(id, &body, false).unwrap();
        host.step(0.5);
        assert_eq!(host.body_state(id).unwrap().position, Vec2::new(5.0, -10.0));
        assert!(host.add_entity(id, &body, false).is_err());
        host.remove_entity(id);
        assert!(host.body_state(id).is_none());
    }

    #[test]
    fn injected_contacts_drain_once() {
        let mut host = NullHost::new();
        let event = ContactEvent::begin(EntityId::from_raw(1), EntityId::from_raw(2));
        host.inject(event);
        assert_eq!(host.drain_contacts(), vec![event]);
        assert!(host.drain_contacts().is_empty());
    }
}
