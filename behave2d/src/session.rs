//! The session: one explicitly constructed context that owns the registry,
//! timers, contact router, despawn cascades and the host seams.
//!
//! Every callback receives `&mut Session`, so game code can spawn, despawn,
//! schedule and mutate counters from anywhere. Callbacks are cloned out of
//! their tables before they run, and every list that is walked while
//! callbacks run (group members, due timers, contact handlers) is a snapshot
//! re-checked for liveness at each step.

use std::rc::Rc;
use std::time::Duration;

use glam::Vec2;

use crate::audio::{AudioSink, SilentAudio};
use crate::behavior::{Behaviors, Capabilities, CategoryBehavior};
use crate::config::SessionConfig;
use crate::contact::{Contact, ContactEvent, ContactFilter, ContactRouter, HandlerId};
use crate::counters::Counters;
use crate::draw::{Canvas, WHITE};
use crate::entities::{Entity, Life, Lifecycle, Remains, Spawn};
use crate::error::{BehaveError, Result};
use crate::host::PhysicsHost;
use crate::input::InputState;
use crate::orchestrator::{DespawnRules, SpawnRule};
use crate::timers::{TimerKey, TimerSet};
use crate::tween::{Easing, Tweens};
use crate::world::{Cursor, EntityId, World};

pub type TimerCallback = Rc<dyn Fn(&mut Session)>;

pub type ContactCallback = Rc<dyn Fn(&mut Session, Contact)>;

/// Begin and end handlers for one contact registration. Either may be absent.
#[derive(Clone, Default)]
pub struct ContactHandlers {
    begin: Option<ContactCallback>,
    end: Option<ContactCallback>,
}

impl ContactHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn begin<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Session, Contact) + 'static,
    {
        self.begin = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn end<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Session, Contact) + 'static,
    {
        self.end = Some(Rc::new(f));
        self
    }
}

pub struct Session {
    config: SessionConfig,
    world: World,
    timers: TimerSet<TimerCallback>,
    contacts: ContactRouter<ContactCallback>,
    cascades: DespawnRules,
    behaviors: Behaviors,
    tweens: Tweens,
    counters: Counters,
    input: InputState,
    host: Box<dyn PhysicsHost>,
    audio: Box<dyn AudioSink>,
    frame: u64,
}

impl Session {
    /// Create a session around a physics host. Audio is silent until
    /// [`with_audio`](Self::with_audio) is used.
    pub fn new(config: SessionConfig, host: Box<dyn PhysicsHost>) -> Self {
        Self {
            config,
            world: World::new(),
            timers: TimerSet::new(),
            contacts: ContactRouter::new(),
            cascades: DespawnRules::new(),
            behaviors: Behaviors::new(),
            tweens: Tweens::new(),
            counters: Counters::new(),
            input: InputState::new(),
            host,
            audio: Box::new(SilentAudio),
            frame: 0,
        }
    }

    #[must_use]
    pub fn with_audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------
    // Registry
    // ------------------------------

    /// Create an entity. Either the entity is fully registered (record,
    /// groups, host body, lifetime timer) or nothing is left behind.
    pub fn spawn(&mut self, spawn: Spawn) -> Result<EntityId> {
        let category = spawn.validate()?;
        if let Some(max) = self.config.max_entities {
            if self.world.len() >= max {
                return Err(BehaveError::Config(format!(
                    "entity limit of {max} reached while spawning {category}"
                )));
            }
        }

        let Spawn {
            body,
            life,
            attrs,
            groups,
            ttl,
            ..
        } = spawn;

        let id = self.world.allocate_id().ok_or(BehaveError::IdsExhausted)?;
        let contact_events = self.contacts.mentions_category(category.as_str());
        if let Err(source) = self.host.add_entity(id, &body, contact_events) {
            log::warn!("host rejected {category} {id:?}: {source:#}");
            return Err(BehaveError::HostRejected {
                category: category.to_string(),
                source,
            });
        }

        log::debug!("spawned {category} {id:?} at {}", body.position);
        self.world.insert(
            Entity {
                id,
                category,
                state: Lifecycle::Spawned,
                contacts: 0,
                body,
                life: life.map(Life::new),
                attrs,
            },
            &groups,
        );

        if let Some(ttl) = ttl {
            self.after_for(
                id,
                ttl,
                move |s| {
                    s.despawn(id);
                },
                Some(TimerKey::Scoped(id, "ttl".into())),
            );
        }
        Ok(id)
    }

    /// Remove an entity. Returns false, changing nothing, when it is already
    /// gone. Despawn cascades run after the entity is fully removed.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.world.remove(id) else {
            return false;
        };

        self.host.remove_entity(id);
        let timers = self.timers.cancel_owned_by(id);
        self.tweens.cancel(id);
        self.contacts.forget_entity(id);
        log::debug!(
            "despawned {} {id:?} ({timers} timers cancelled)",
            entity.category
        );

        if self.cascades.has_rules(entity.category.as_str()) {
            self.cascades.enqueue(Remains::from(entity));
            self.run_cascades();
        }
        true
    }

    /// Drain queued cascades breadth-first. Nested calls only enqueue.
    fn run_cascades(&mut self) {
        if !self.cascades.begin_drain() {
            return;
        }
        while let Some(remains) = self.cascades.pop() {
            let spawns = self.cascades.spawns_for(&remains);
            log::debug!(
                "cascade from {} {:?}: {} spawns",
                remains.category,
                remains.id,
                spawns.len()
            );
            for spawn in spawns {
                let category = spawn.category_name().to_string();
                if let Err(err) = self.spawn(spawn) {
                    log::warn!("skipping {category} cascade spawn from {:?}: {err}", remains.id);
                }
            }
        }
        self.cascades.end_drain();
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.world.is_alive(id)
    }

    pub fn lifecycle(&self, id: EntityId) -> Option<Lifecycle> {
        self.world.lifecycle(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.world.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.world.get_mut(id)
    }

    /// Snapshot cursor over a category. See [`Cursor`].
    pub fn each(&self, category: &str) -> Cursor {
        self.world.each(category)
    }

    pub fn each_in_group(&self, group: &str) -> Cursor {
        self.world.each_in_group(group)
    }

    pub fn count(&self, category: &str) -> usize {
        self.world.count(category)
    }

    pub fn nearest(&self, category: &str, point: Vec2) -> Option<EntityId> {
        self.world.nearest(category, point)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn host(&self) -> &dyn PhysicsHost {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn PhysicsHost {
        self.host.as_mut()
    }

    // ------------------------------
    // Body and life
    // ------------------------------

    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        self.world.get(id).map(Entity::position)
    }

    /// Set a velocity on both the record and the host body.
    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec2) -> bool {
        let Some(entity) = self.world.get_mut(id) else {
            return false;
        };
        entity.body.velocity = velocity;
        self.host.set_velocity(id, velocity);
        true
    }

    /// Teleport an entity on both the record and the host body.
    pub fn set_position(&mut self, id: EntityId, position: Vec2) -> bool {
        let Some(entity) = self.world.get_mut(id) else {
            return false;
        };
        entity.body.position = position;
        self.host.set_position(id, position);
        true
    }

    /// Subtract from an entity's life and return what is left. `None` if the
    /// entity is dead or has no life pool.
    pub fn damage(&mut self, id: EntityId, amount: i32) -> Option<i32> {
        let life = self.world.get_mut(id)?.life.as_mut()?;
        Some(life.adjust(amount.saturating_neg()))
    }

    pub fn heal(&mut self, id: EntityId, amount: i32) -> Option<i32> {
        let life = self.world.get_mut(id)?.life.as_mut()?;
        Some(life.adjust(amount))
    }

    /// Tween an entity from its current position to `to`. Replaces any
    /// running tween on the same entity and stops when it is despawned.
    pub fn animate_position(
        &mut self,
        id: EntityId,
        to: Vec2,
        duration: Duration,
        easing: Easing,
    ) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        self.tweens.start(id, from, to, duration, easing);
        true
    }

    pub fn is_animating(&self, id: EntityId) -> bool {
        self.tweens.is_animating(id)
    }

    // ------------------------------
    // Timers
    // ------------------------------

    /// Current session clock.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Ticks run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn after<F>(&mut self, delay: Duration, f: F, key: Option<TimerKey>) -> TimerKey
    where
        F: Fn(&mut Session) + 'static,
    {
        self.timers.after(delay, Rc::new(f), key)
    }

    pub fn every<F>(
        &mut self,
        interval: Duration,
        f: F,
        key: Option<TimerKey>,
        fire_immediately: bool,
    ) -> TimerKey
    where
        F: Fn(&mut Session) + 'static,
    {
        self.timers.every(interval, Rc::new(f), key, fire_immediately)
    }

    /// [`after`](Self::after) bound to `owner`. Nothing is scheduled when the
    /// owner is already dead.
    pub fn after_for<F>(
        &mut self,
        owner: EntityId,
        delay: Duration,
        f: F,
        key: Option<TimerKey>,
    ) -> Option<TimerKey>
    where
        F: Fn(&mut Session) + 'static,
    {
        if !self.world.is_alive(owner) {
            return None;
        }
        let key = self.after(delay, f, key);
        self.timers.bind_to_entity(&key, owner);
        Some(key)
    }

    /// [`every`](Self::every) bound to `owner`.
    pub fn every_for<F>(
        &mut self,
        owner: EntityId,
        interval: Duration,
        f: F,
        key: Option<TimerKey>,
        fire_immediately: bool,
    ) -> Option<TimerKey>
    where
        F: Fn(&mut Session) + 'static,
    {
        if !self.world.is_alive(owner) {
            return None;
        }
        let key = self.every(interval, f, key, fire_immediately);
        self.timers.bind_to_entity(&key, owner);
        Some(key)
    }

    pub fn cancel(&mut self, key: impl Into<TimerKey>) -> bool {
        self.timers.cancel(&key.into())
    }

    /// Cancel the timer when `owner` is despawned. Binding to a dead entity
    /// cancels the timer right away and returns false.
    pub fn bind_to_entity(&mut self, key: &TimerKey, owner: EntityId) -> bool {
        if !self.world.is_alive(owner) {
            self.timers.cancel(key);
            return false;
        }
        self.timers.bind_to_entity(key, owner)
    }

    pub fn has_timer(&self, key: &TimerKey) -> bool {
        self.timers.contains(key)
    }

    pub fn timers(&self) -> &TimerSet<TimerCallback> {
        &self.timers
    }

    fn fire_timers(&mut self) {
        for ticket in self.timers.due() {
            let Some(fired) = self.timers.fire(&ticket) else {
                continue;
            };
            if fired.owner.is_some_and(|owner| !self.world.is_alive(owner)) {
                continue;
            }
            log::trace!("timer {:?} fired at {:?}", fired.key, self.timers.now());
            (fired.callback)(self);
        }
    }

    // ------------------------------
    // Contacts
    // ------------------------------

    /// Register contact handlers. `subject` picks the party the handlers
    /// belong to, `other` filters the party it touched.
    pub fn on_contact(
        &mut self,
        subject: impl Into<ContactFilter>,
        other: impl Into<ContactFilter>,
        handlers: ContactHandlers,
    ) -> HandlerId {
        let id = self
            .contacts
            .register(subject.into(), other.into(), handlers.begin, handlers.end);
        self.refresh_contact_events();
        id
    }

    /// Handlers for any entity touching something matching `other`.
    pub fn on_contact_with(
        &mut self,
        other: impl Into<ContactFilter>,
        handlers: ContactHandlers,
    ) -> HandlerId {
        self.on_contact(ContactFilter::Any, other, handlers)
    }

    pub fn remove_handler(&mut self, id: HandlerId) -> bool {
        self.contacts.remove(id)
    }

    /// Ask the host for contacts on live bodies a new registration involves.
    fn refresh_contact_events(&mut self) {
        for id in self.world.all_ids() {
            if self.contacts.wants_events(&self.world, id) {
                self.host.set_contact_events(id, true);
            }
        }
    }

    /// Dispatch one host contact event. Events with a dead party, duplicate
    /// begins and unmatched ends are dropped.
    pub fn deliver_contact(&mut self, event: ContactEvent) {
        let (a, b) = (event.a, event.b);
        if !self.world.is_alive(a) || !self.world.is_alive(b) {
            log::trace!("dropped {:?} contact {a:?}/{b:?}: party gone", event.phase);
            return;
        }
        if !self.contacts.accept(&event) {
            log::trace!("ignored repeated {:?} contact {a:?}/{b:?}", event.phase);
            return;
        }

        for planned in self.contacts.plan(&self.world, &event) {
            if !self.world.is_alive(a) || !self.world.is_alive(b) {
                break;
            }
            if !self.contacts.contains(planned.handler) {
                continue;
            }
            if let Some(entity) = self.world.get_mut(planned.contact.this) {
                entity.contacts += 1;
            }
            log::trace!(
                "contact {:?} {:?} -> {:?} via {:?}",
                planned.contact.phase,
                planned.contact.this,
                planned.contact.other,
                planned.handler
            );
            (planned.callback)(self, planned.contact);
        }
    }

    // ------------------------------
    // Despawn cascades
    // ------------------------------

    /// Spawn `rule.count` entities whenever an entity of `category` is
    /// despawned.
    pub fn on_despawn(&mut self, category: &str, rule: SpawnRule) -> Result<()> {
        self.cascades.add(category, rule)
    }

    // ------------------------------
    // Behaviors
    // ------------------------------

    pub fn register_behavior(&mut self, category: &str, behavior: CategoryBehavior) -> Result<()> {
        self.behaviors.register(category, behavior)
    }

    pub fn capabilities(&self, category: &str) -> Capabilities {
        Capabilities {
            contactable: self.contacts.mentions_category(category),
            ..self.behaviors.capabilities(category)
        }
    }

    // ------------------------------
    // Shared state, input, audio
    // ------------------------------

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut Counters {
        &mut self.counters
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn play_sound(&mut self, index: usize, gain: f32) {
        let gain = if gain.is_finite() { gain.clamp(0.0, 1.0) } else { 0.0 };
        self.audio.play_sound(index, gain);
    }

    // ------------------------------
    // Frame
    // ------------------------------

    /// Advance the session by `dt` seconds: timers, tweens, update pass,
    /// physics step, contact dispatch, then input edges are cleared.
    pub fn tick(&mut self, dt: f32) {
        let step = Duration::try_from_secs_f32(dt).unwrap_or(Duration::ZERO);
        let dt = step.as_secs_f32();

        self.timers.advance(step);
        self.fire_timers();

        for (id, position) in self.tweens.advance(step) {
            self.set_position(id, position);
        }

        self.update_pass(dt);

        self.host.step(dt);
        let host = &self.host;
        for entity in self.world.iter_mut() {
            if let Some(state) = host.body_state(entity.id) {
                entity.body.position = state.position;
                entity.body.velocity = state.velocity;
            }
        }

        for event in self.host.drain_contacts() {
            self.deliver_contact(event);
        }

        self.input.end_tick();
        self.frame += 1;
    }

    /// One tick at the configured rate.
    pub fn step(&mut self) {
        self.tick(self.config.tick_seconds());
    }

    fn update_pass(&mut self, dt: f32) {
        for entity in self.world.iter_mut() {
            if entity.state == Lifecycle::Spawned {
                entity.state = Lifecycle::Active;
            }
        }

        for (category, update) in self.behaviors.updatable() {
            let mut cursor = self.world.each(category.as_str());
            while let Some(id) = cursor.next(&self.world) {
                update(self, id, dt);
            }
        }
    }

    /// Emit every drawable entity. Categories listed in `draw_order` come
    /// first, the rest in first-spawn order.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        let mut order: Vec<&str> = Vec::new();
        for name in self
            .config
            .draw_order
            .iter()
            .chain(self.world.categories())
        {
            if !order.contains(&name.as_str()) {
                order.push(name.as_str());
            }
        }

        for category in order {
            let behavior = self.behaviors.get(category);
            if behavior.is_some_and(|b| !b.is_visible()) {
                continue;
            }
            let draw = behavior.and_then(|b| b.draw_fn());
            for id in self.world.ids(category) {
                let Some(entity) = self.world.get(id) else {
                    continue;
                };
                match draw {
                    Some(draw) => draw(self, entity, canvas),
                    None => {
                        let size = entity.body.size();
                        canvas.rect(entity.position() - size * 0.5, size, WHITE);
                    }
                }
            }
        }
    }

    /// Despawn every entity without running cascades and drop all timers,
    /// tweens and contact handlers.
    pub fn shutdown(&mut self) {
        self.cascades.clear();
        let ids = self.world.all_ids();
        let count = ids.len();
        for id in ids {
            self.despawn(id);
        }
        self.timers.clear();
        self.tweens.clear();
        self.contacts.clear();
        log::debug!("session shut down, {count} entities despawned");
    }
}
