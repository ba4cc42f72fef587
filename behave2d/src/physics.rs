use std::collections::HashMap;

use anyhow::{anyhow, Result};
use glam::Vec2;

use crate::config::SessionConfig;
use crate::contact::ContactEvent;
use crate::entities::{Body, ColliderShape, RigidBodyType};
use crate::host::{BodyState, PhysicsHost};
use crate::world::EntityId;

// Rapier stays an implementation detail of this host: do NOT re-export it.
use rapier2d::prelude::*;

/// Physics host backed by rapier2d.
///
/// One rigid body with one collider per entity. Kinematic bodies are
/// velocity based, and every pair of body types generates contacts so that
/// kinematic bullets still hit kinematic enemies.
pub struct RapierHost {
    // --- rapier internals ---
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,

    // Event channels
    event_recv_collision: crossbeam_channel::Receiver<CollisionEvent>,
    event_recv_contact_force: crossbeam_channel::Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,

    // --- mappings (entity <-> rapier) ---
    entity_to_body: HashMap<EntityId, RigidBodyHandle>,
    body_to_entity: HashMap<RigidBodyHandle, EntityId>,

    gravity: Vec2,

    pending: Vec<ContactEvent>,
}

impl Default for RapierHost {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl RapierHost {
    pub fn new(gravity: Vec2) -> Self {
        let (send_col, recv_col) = crossbeam_channel::unbounded();
        let (send_force, recv_force) = crossbeam_channel::unbounded();
        let event_handler = ChannelEventCollector::new(send_col, send_force);

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),

            event_recv_collision: recv_col,
            event_recv_contact_force: recv_force,
            event_handler,

            entity_to_body: HashMap::new(),
            body_to_entity: HashMap::new(),

            gravity,
            pending: Vec::new(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.gravity)
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Return true if an entity currently has a physics body.
    pub fn has_body(&self, entity: EntityId) -> bool {
        self.entity_to_body.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.entity_to_body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_to_body.is_empty()
    }

    fn body_mut(&mut self, entity: EntityId) -> Option<&mut RigidBody> {
        let h = self.entity_to_body.get(&entity).copied()?;
        self.rigid_bodies.get_mut(h)
    }

    fn to_rapier_shape(shape: ColliderShape) -> SharedShape {
        match shape {
            ColliderShape::Box { hx, hy } => SharedShape::cuboid(hx, hy),
            ColliderShape::Circle { radius } => SharedShape::ball(radius),
        }
    }

    fn active_events(enabled: bool) -> ActiveEvents {
        if enabled {
            ActiveEvents::COLLISION_EVENTS
        } else {
            ActiveEvents::empty()
        }
    }

    fn collect_events(&mut self) {
        while let Ok(ev) = self.event_recv_collision.try_recv() {
            let mapped = match ev {
                CollisionEvent::Started(c1, c2, _) => {
                    self.map_pair(c1, c2).map(|(a, b)| ContactEvent::begin(a, b))
                }
                CollisionEvent::Stopped(c1, c2, _) => {
                    self.map_pair(c1, c2).map(|(a, b)| ContactEvent::end(a, b))
                }
            };
            if let Some(event) = mapped {
                self.pending.push(event);
            }
        }

        // Force events are never requested; keep the channel empty.
        while self.event_recv_contact_force.try_recv().is_ok() {}
    }

    /// Colliders removed together with their body no longer resolve and are
    /// dropped here.
    fn map_pair(&self, c1: ColliderHandle, c2: ColliderHandle) -> Option<(EntityId, EntityId)> {
        let b1 = self.colliders.get(c1)?.parent()?;
        let b2 = self.colliders.get(c2)?.parent()?;
        let e1 = *self.body_to_entity.get(&b1)?;
        let e2 = *self.body_to_entity.get(&b2)?;
        Some((e1, e2))
    }
}

impl PhysicsHost for RapierHost {
    fn add_entity(&mut self, id: EntityId, body: &Body, contact_events: bool) -> Result<()> {
        if self.entity_to_body.contains_key(&id) {
            return Err(anyhow!("Entity {:?} already has a physics body", id));
        }

        let rb_type = match body.body_type {
            RigidBodyType::Dynamic => rapier2d::prelude::RigidBodyType::Dynamic,
            RigidBodyType::Kinematic => rapier2d::prelude::RigidBodyType::KinematicVelocityBased,
            RigidBodyType::Fixed => rapier2d::prelude::RigidBodyType::Fixed,
        };

        let mut builder = RigidBodyBuilder::new(rb_type)
            .translation(vector![body.position.x, body.position.y])
            .linvel(vector![body.velocity.x, body.velocity.y])
            .lock_rotations();

        // Enable CCD for dynamic bodies to prevent tunneling through thin colliders
        if matches!(body.body_type, RigidBodyType::Dynamic) {
            builder = builder.ccd_enabled(true);
        }

        let collider = ColliderBuilder::new(Self::to_rapier_shape(body.shape))
            .sensor(body.sensor)
            .active_collision_types(ActiveCollisionTypes::all())
            .active_events(Self::active_events(contact_events))
            .build();

        let handle = self.rigid_bodies.insert(builder.build());
        self.colliders
            .insert_with_parent(collider, handle, &mut self.rigid_bodies);
        self.entity_to_body.insert(id, handle);
        self.body_to_entity.insert(handle, id);
        Ok(())
    }

    fn set_contact_events(&mut self, id: EntityId, enabled: bool) {
        let Some(handle) = self.entity_to_body.get(&id).copied() else {
            return;
        };
        let Some(body) = self.rigid_bodies.get(handle) else {
            return;
        };
        for collider in body.colliders().to_vec() {
            if let Some(c) = self.colliders.get_mut(collider) {
                c.set_active_events(Self::active_events(enabled));
            }
        }
    }

    fn remove_entity(&mut self, id: EntityId) {
        if let Some(handle) = self.entity_to_body.remove(&id) {
            self.rigid_bodies.remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
            self.body_to_entity.remove(&handle);
        }
    }

    fn set_position(&mut self, id: EntityId, position: Vec2) {
        if let Some(b) = self.body_mut(id) {
            b.set_translation(vector![position.x, position.y], true);
        }
    }

    fn set_velocity(&mut self, id: EntityId, velocity: Vec2) {
        if let Some(b) = self.body_mut(id) {
            b.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;

        let gravity = vector![self.gravity.x, self.gravity.y];
        let hooks = &();

        self.pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            hooks,
            &self.event_handler,
        );

        self.collect_events();
    }

    fn body_state(&self, id: EntityId) -> Option<BodyState> {
        let h = *self.entity_to_body.get(&id)?;
        let b = self.rigid_bodies.get(h)?;
        let t = b.translation();
        let v = b.linvel();
        Some(BodyState {
            position: Vec2::new(t.x, t.y),
            velocity: Vec2::new(v.x, v.y),
        })
    }

    fn drain_contacts(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactPhase;

    fn body(position: Vec2, velocity: Vec2) -> Body {
        Body {
            position,
            velocity,
            ..Body::default()
        }
    }

    #[test]
    fn kinematic_bodies_move_by_velocity() {
        let mut host = RapierHost::default();
        let id = EntityId::from_raw(1);
        host.add_entity(id, &body(Vec2::ZERO, Vec2::new(60.0, 0.0)), false)
            .unwrap();
        for _ in 0..60 {
            host.step(1.0 / 60.0);
        }
        let state = host.body_state(id).unwrap();
        assert!((state.position.x - 60.0).abs() < 0.5);
        assert!(host.add_entity(id, &body(Vec2::ZERO, Vec2::ZERO), false).is_err());
    }

    #[test]
    fn overlapping_kinematic_bodies_report_begin_and_end() {
        let mut host = RapierHost::default();
        let a = EntityId::from_raw(1);
        let b = EntityId::from_raw(2);
        host.add_entity(a, &body(Vec2::ZERO, Vec2::ZERO), true).unwrap();
        host.add_entity(b, &body(Vec2::new(2.0, 0.0), Vec2::ZERO), false)
            .unwrap();

        host.step(1.0 / 60.0);
        host.step(1.0 / 60.0);
        let events = host.drain_contacts();
        assert!(events
            .iter()
            .any(|e| e.phase == ContactPhase::Begin && [e.a, e.b].contains(&a) && [e.a, e.b].contains(&b)));

        host.set_position(b, Vec2::new(100.0, 0.0));
        host.step(1.0 / 60.0);
        host.step(1.0 / 60.0);
        let events = host.drain_contacts();
        assert!(events.iter().any(|e| e.phase == ContactPhase::End));
    }

    #[test]
    fn removed_bodies_drop_their_contacts() {
        let mut host = RapierHost::default();
        let a = EntityId::from_raw(1);
        let b = EntityId::from_raw(2);
        host.add_entity(a, &body(Vec2::ZERO, Vec2::ZERO), true).unwrap();
        host.add_entity(b, &body(Vec2::ZERO, Vec2::ZERO), true).unwrap();
        host.step(1.0 / 60.0);
        host.drain_contacts();

        host.remove_entity(b);
        assert!(!host.has_body(b));
        host.step(1.0 / 60.0);
        assert!(host
            .drain_contacts()
            .iter()
            .all(|e| e.a != b && e.b != b));
    }
}
