//! Routing of host contact events to game handlers.
//!
//! Handlers are registered with two filters: `subject` picks the party the
//! handler belongs to, `other` filters the party it collided with. For every
//! event the router builds a dispatch plan (party `a` first, then party `b`,
//! each in registration order); the session runs the plan and re-checks
//! liveness before every step.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::world::{EntityId, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    Begin,
    End,
}

/// Contact event as delivered by the physics host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactEvent {
    pub a: EntityId,
    pub b: EntityId,
    pub phase: ContactPhase,
}

impl ContactEvent {
    pub fn begin(a: EntityId, b: EntityId) -> Self {
        Self {
            a,
            b,
            phase: ContactPhase::Begin,
        }
    }

    pub fn end(a: EntityId, b: EntityId) -> Self {
        Self {
            a,
            b,
            phase: ContactPhase::End,
        }
    }

    fn pair(&self) -> (EntityId, EntityId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}

/// A contact seen from one party.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    pub this: EntityId,
    pub other: EntityId,
    pub phase: ContactPhase,
}

pub type ContactPredicate = Rc<dyn Fn(&World, EntityId) -> bool>;

/// Selects a contact party.
#[derive(Clone)]
pub enum ContactFilter {
    Any,
    Entity(EntityId),
    Category(String),
    Group(String),
    Predicate(ContactPredicate),
}

impl ContactFilter {
    pub fn category(name: impl Into<String>) -> Self {
        Self::Category(name.into())
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::Group(name.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&World, EntityId) -> bool + 'static,
    {
        Self::Predicate(Rc::new(f))
    }

    pub fn matches(&self, world: &World, id: EntityId) -> bool {
        match self {
            Self::Any => true,
            Self::Entity(target) => *target == id,
            Self::Category(name) => world.is_a(id, name),
            Self::Group(name) => world.in_group(id, name),
            Self::Predicate(f) => f(world, id),
        }
    }
}

impl fmt::Debug for ContactFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Entity(id) => write!(f, "Entity({id:?})"),
            Self::Category(name) => write!(f, "Category({name})"),
            Self::Group(name) => write!(f, "Group({name})"),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<EntityId> for ContactFilter {
    fn from(value: EntityId) -> Self {
        Self::Entity(value)
    }
}

impl From<&str> for ContactFilter {
    fn from(value: &str) -> Self {
        Self::Category(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct Registration<H> {
    id: HandlerId,
    subject: ContactFilter,
    other: ContactFilter,
    begin: Option<H>,
    end: Option<H>,
}

/// One planned handler invocation.
pub struct Planned<H> {
    pub handler: HandlerId,
    pub callback: H,
    pub contact: Contact,
}

pub struct ContactRouter<H> {
    registrations: Vec<Registration<H>>,
    next_id: u64,
    open: HashSet<(EntityId, EntityId)>,
}

impl<H: Clone> ContactRouter<H> {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            next_id: 0,
            open: HashSet::new(),
        }
    }

    pub fn register(
        &mut self,
        subject: ContactFilter,
        other: ContactFilter,
        begin: Option<H>,
        end: Option<H>,
    ) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        log::trace!("contact handler {id:?}: {subject:?} vs {other:?}");
        self.registrations.push(Registration {
            id,
            subject,
            other,
            begin,
            end,
        });
        id
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.registrations.iter().any(|r| r.id == id)
    }

    pub fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Drop everything tied to a despawned entity: handlers whose filters name
    /// it and every open overlap episode it takes part in.
    pub fn forget_entity(&mut self, id: EntityId) {
        self.registrations.retain(|r| {
            !matches!(r.subject, ContactFilter::Entity(e) if e == id)
                && !matches!(r.other, ContactFilter::Entity(e) if e == id)
        });
        self.open.retain(|&(a, b)| a != id && b != id);
    }

    /// Track overlap episodes. Returns false for a duplicate `Begin` or an
    /// `End` without a matching `Begin`; such events are ignored.
    pub fn accept(&mut self, event: &ContactEvent) -> bool {
        let pair = event.pair();
        match event.phase {
            ContactPhase::Begin => self.open.insert(pair),
            ContactPhase::End => self.open.remove(&pair),
        }
    }

    pub fn is_open(&self, a: EntityId, b: EntityId) -> bool {
        self.open.contains(&ContactEvent::begin(a, b).pair())
    }

    /// Build the ordered list of handlers to run for an event. Filters are
    /// evaluated against the world as it is when the event is delivered.
    pub fn plan(&self, world: &World, event: &ContactEvent) -> Vec<Planned<H>> {
        let mut planned = Vec::new();
        for (this, other) in [(event.a, event.b), (event.b, event.a)] {
            for reg in &self.registrations {
                let callback = match event.phase {
                    ContactPhase::Begin => reg.begin.as_ref(),
                    ContactPhase::End => reg.end.as_ref(),
                };
                let Some(callback) = callback else {
                    continue;
                };
                if reg.subject.matches(world, this) && reg.other.matches(world, other) {
                    planned.push(Planned {
                        handler: reg.id,
                        callback: callback.clone(),
                        contact: Contact {
                            this,
                            other,
                            phase: event.phase,
                        },
                    });
                }
            }
        }
        planned
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Categories named directly by a filter, used to decide which bodies
    /// need contact events from the host.
    pub fn mentions_category(&self, category: &str) -> bool {
        self.registrations.iter().any(|r| {
            [&r.subject, &r.other].into_iter().any(|f| match f {
                ContactFilter::Category(name) => name == category,
                ContactFilter::Any | ContactFilter::Group(_) | ContactFilter::Predicate(_) => true,
                ContactFilter::Entity(_) => false,
            })
        })
    }

    /// Whether any registration could involve the live entity `id`, in which
    /// case the host must report its contacts.
    pub fn wants_events(&self, world: &World, id: EntityId) -> bool {
        self.registrations.iter().any(|r| {
            [&r.subject, &r.other].into_iter().any(|f| match f {
                ContactFilter::Entity(target) => *target == id,
                ContactFilter::Category(name) => world.is_a(id, name),
                ContactFilter::Any | ContactFilter::Group(_) | ContactFilter::Predicate(_) => true,
            })
        })
    }

    pub fn clear(&mut self) {
        self.registrations.clear();
        self.open.clear();
    }
}

impl<H: Clone> Default for ContactRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::{NullHost, SessionConfig, Spawn};

    fn session() -> Session {
        Session::new(SessionConfig::default(), Box::new(NullHost::new()))
    }

    #[test]
    fn duplicate_begin_and_stray_end_are_ignored() {
        let mut router: ContactRouter<&'static str> = ContactRouter::new();
        let a = EntityId::from_raw(1);
        let b = EntityId::from_raw(2);

        assert!(!router.accept(&ContactEvent::end(a, b)));
        assert!(router.accept(&ContactEvent::begin(a, b)));
        assert!(!router.accept(&ContactEvent::begin(b, a)));
        assert!(router.is_open(b, a));
        assert!(router.accept(&ContactEvent::end(b, a)));
        assert!(!router.accept(&ContactEvent::end(a, b)));
    }

    #[test]
    fn plan_orders_party_a_then_b_in_registration_order() {
        let mut s = session();
        let bullet = s.spawn(Spawn::new("bullet")).unwrap();
        let enemy = s.spawn(Spawn::new("enemy")).unwrap();

        let mut router = ContactRouter::new();
        router.register("enemy".into(), "bullet".into(), Some("enemy-hit"), None);
        router.register("bullet".into(), "enemy".into(), Some("bullet-hit"), None);
        router.register(ContactFilter::Any, ContactFilter::Any, Some("any"), Some("any-end"));

        let plan = router.plan(s.world(), &ContactEvent::begin(bullet, enemy));
        let labels: Vec<_> = plan.iter().map(|p| p.callback).collect();
        assert_eq!(labels, vec!["bullet-hit", "any", "enemy-hit", "any"]);
        assert_eq!(plan[0].contact.this, bullet);
        assert_eq!(plan[0].contact.other, enemy);
        assert_eq!(plan[2].contact.this, enemy);

        let plan = router.plan(s.world(), &ContactEvent::end(bullet, enemy));
        let labels: Vec<_> = plan.iter().map(|p| p.callback).collect();
        assert_eq!(labels, vec!["any-end", "any-end"]);
    }

    #[test]
    fn group_and_predicate_filters() {
        let mut s = session();
        let player = s.spawn(Spawn::new("player")).unwrap();
        let orb = s.spawn(Spawn::new("orb").attr("value", 5)).unwrap();
        s.world_mut().join_group(orb, "magnetized");

        let rich = ContactFilter::predicate(|world, id| {
            world
                .get(id)
                .and_then(|e| e.attrs.int("value"))
                .is_some_and(|v| v >= 5)
        });
        assert!(rich.matches(s.world(), orb));
        assert!(!rich.matches(s.world(), player));
        assert!(ContactFilter::group("magnetized").matches(s.world(), orb));
        assert!(!ContactFilter::group("magnetized").matches(s.world(), player));
        assert!(ContactFilter::from(player).matches(s.world(), player));
    }

    #[test]
    fn forget_entity_drops_scoped_handlers_and_episodes() {
        let mut router = ContactRouter::new();
        let a = EntityId::from_raw(1);
        let b = EntityId::from_raw(2);
        let scoped = router.register(a.into(), ContactFilter::Any, Some(()), None);
        let shared = router.register("enemy".into(), ContactFilter::Any, Some(()), None);
        router.accept(&ContactEvent::begin(a, b));

        router.forget_entity(a);

        assert!(!router.remove(scoped));
        assert!(router.remove(shared));
        assert!(!router.is_open(a, b));
    }
}
