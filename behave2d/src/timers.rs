//! Keyed one-shot and recurring timers driven by the session clock.
//!
//! The timer set only stores callbacks and decides when they are due; the
//! session invokes them. Firing happens in two steps so that a callback can
//! cancel or replace other timers that are due in the same pass:
//!
//! 1. [`TimerSet::due`] lists tickets for everything due, oldest first.
//! 2. [`TimerSet::fire`] re-validates a ticket right before it runs and
//!    reschedules or removes the timer.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::world::EntityId;

/// Identity of a timer. Scheduling with a key already in use replaces the
/// previous timer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Explicit name, e.g. `"shoot"`.
    Name(String),
    /// Keyed by an entity, the way sample games key per-sprite intervals.
    Entity(EntityId),
    /// Named timer owned by an entity, e.g. `(enemy, "zigzag")`.
    Scoped(EntityId, String),
    /// Assigned by the timer set when no key was given.
    Auto(u64),
}

impl fmt::Debug for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, ":{name}"),
            Self::Entity(id) => write!(f, "{id:?}"),
            Self::Scoped(id, name) => write!(f, "{id:?}:{name}"),
            Self::Auto(n) => write!(f, "auto-{n}"),
        }
    }
}

impl From<&str> for TimerKey {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for TimerKey {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<EntityId> for TimerKey {
    fn from(value: EntityId) -> Self {
        Self::Entity(value)
    }
}

struct Timer<C> {
    callback: C,
    interval: Duration,
    due: Duration,
    recurring: bool,
    owner: Option<EntityId>,
    seq: u64,
}

/// Handle to one due timer, valid only for the timer instance it was issued
/// for. A replaced or cancelled timer invalidates its tickets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    key: TimerKey,
    seq: u64,
}

impl Ticket {
    pub fn key(&self) -> &TimerKey {
        &self.key
    }
}

/// A timer that passed re-validation and must now be run.
pub struct Fired<C> {
    pub key: TimerKey,
    pub owner: Option<EntityId>,
    pub callback: C,
}

pub struct TimerSet<C> {
    now: Duration,
    timers: HashMap<TimerKey, Timer<C>>,
    by_owner: HashMap<EntityId, Vec<TimerKey>>,
    next_seq: u64,
    next_auto: u64,
}

impl<C: Clone> TimerSet<C> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            timers: HashMap::new(),
            by_owner: HashMap::new(),
            next_seq: 0,
            next_auto: 0,
        }
    }

    /// Current clock value.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    /// One-shot timer firing `delay` from now.
    pub fn after(&mut self, delay: Duration, callback: C, key: Option<TimerKey>) -> TimerKey {
        let due = self.now.saturating_add(delay);
        self.schedule(key, callback, delay, due, false)
    }

    /// Recurring timer. With `fire_immediately` the first firing happens in
    /// the next fire pass instead of one interval from now.
    pub fn every(
        &mut self,
        interval: Duration,
        callback: C,
        key: Option<TimerKey>,
        fire_immediately: bool,
    ) -> TimerKey {
        let due = if fire_immediately {
            self.now
        } else {
            self.now.saturating_add(interval)
        };
        self.schedule(key, callback, interval, due, true)
    }

    /// Cancel a timer. Unknown keys are a no-op.
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        match self.timers.remove(key) {
            Some(timer) => {
                if let Some(owner) = timer.owner {
                    self.unlink(owner, key);
                }
                true
            }
            None => false,
        }
    }

    /// Tie a timer to an entity so [`cancel_owned_by`](Self::cancel_owned_by)
    /// removes it. Returns false for unknown keys.
    pub fn bind_to_entity(&mut self, key: &TimerKey, owner: EntityId) -> bool {
        let Some(timer) = self.timers.get_mut(key) else {
            return false;
        };
        if let Some(previous) = timer.owner.replace(owner) {
            if previous == owner {
                return true;
            }
            self.unlink(previous, key);
        }
        self.by_owner.entry(owner).or_default().push(key.clone());
        true
    }

    /// Cancel every timer bound to `owner`, returning how many were removed.
    pub fn cancel_owned_by(&mut self, owner: EntityId) -> usize {
        let Some(keys) = self.by_owner.remove(&owner) else {
            return 0;
        };
        keys.iter()
            .filter(|key| self.timers.remove(*key).is_some())
            .count()
    }

    /// Tickets for every timer due at the current time, ordered by due time
    /// and then by scheduling order.
    pub fn due(&self) -> Vec<Ticket> {
        let mut due: Vec<_> = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= self.now)
            .map(|(key, t)| (t.due, t.seq, key.clone()))
            .collect();
        due.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        due.into_iter()
            .map(|(_, seq, key)| Ticket { key, seq })
            .collect()
    }

    /// Re-validate a ticket and consume one firing of its timer. One-shot
    /// timers are removed; recurring ones move to their next slot, skipping
    /// slots that were missed entirely.
    pub fn fire(&mut self, ticket: &Ticket) -> Option<Fired<C>> {
        let now = self.now;
        let timer = self.timers.get_mut(&ticket.key)?;
        if timer.seq != ticket.seq || timer.due > now {
            return None;
        }

        let fired = Fired {
            key: ticket.key.clone(),
            owner: timer.owner,
            callback: timer.callback.clone(),
        };

        if timer.recurring {
            if timer.interval.is_zero() {
                timer.due = now;
            } else {
                timer.due = timer.due.saturating_add(timer.interval);
                while timer.due <= now && timer.due < Duration::MAX {
                    timer.due = timer.due.saturating_add(timer.interval);
                }
            }
        } else {
            self.cancel(&ticket.key);
        }
        Some(fired)
    }

    pub fn contains(&self, key: &TimerKey) -> bool {
        self.timers.contains_key(key)
    }

    /// Time left until a timer is next due.
    pub fn remaining(&self, key: &TimerKey) -> Option<Duration> {
        self.timers
            .get(key)
            .map(|t| t.due.saturating_sub(self.now))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Drop every timer; the clock keeps its value.
    pub fn clear(&mut self) {
        self.timers.clear();
        self.by_owner.clear();
    }

    fn schedule(
        &mut self,
        key: Option<TimerKey>,
        callback: C,
        interval: Duration,
        due: Duration,
        recurring: bool,
    ) -> TimerKey {
        let key = key.unwrap_or_else(|| {
            self.next_auto += 1;
            TimerKey::Auto(self.next_auto)
        });
        if self.cancel(&key) {
            log::trace!("timer {key:?} replaced");
        }

        self.next_seq += 1;
        self.timers.insert(
            key.clone(),
            Timer {
                callback,
                interval,
                due,
                recurring,
                owner: None,
                seq: self.next_seq,
            },
        );
        key
    }

    fn unlink(&mut self, owner: EntityId, key: &TimerKey) {
        if let Some(keys) = self.by_owner.get_mut(&owner) {
            keys.retain(|k| k != key);
            if keys.is_empty() {
                self.by_owner.remove(&owner);
            }
        }
    }
}

impl<C: Clone> Default for TimerSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Fire everything due and return the labels in firing order.
    fn pass(timers: &mut TimerSet<&'static str>) -> Vec<&'static str> {
        let mut out = Vec::new();
        for ticket in timers.due() {
            if let Some(fired) = timers.fire(&ticket) {
                out.push(fired.callback);
            }
        }
        out
    }

    #[test]
    fn one_shot_fires_once() {
        let mut timers = TimerSet::new();
        timers.after(ms(100), "boom", None);
        timers.advance(ms(50));
        assert!(pass(&mut timers).is_empty());
        timers.advance(ms(50));
        assert_eq!(pass(&mut timers), vec!["boom"]);
        timers.advance(ms(500));
        assert!(pass(&mut timers).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn keyed_schedule_replaces_previous() {
        let mut timers = TimerSet::new();
        let key = timers.after(ms(100), "old", Some("spawn".into()));
        timers.after(ms(200), "new", Some(key.clone()));
        assert_eq!(timers.len(), 1);
        timers.advance(ms(150));
        assert!(pass(&mut timers).is_empty());
        timers.advance(ms(50));
        assert_eq!(pass(&mut timers), vec!["new"]);
    }

    #[test]
    fn recurring_keeps_phase_and_skips_missed_slots() {
        let mut timers = TimerSet::new();
        let key = timers.every(ms(100), "tick", None, false);
        timers.advance(ms(350));
        assert_eq!(pass(&mut timers), vec!["tick"]);
        assert_eq!(timers.remaining(&key), Some(ms(50)));
    }

    #[test]
    fn fire_immediately_is_due_in_next_pass() {
        let mut timers = TimerSet::new();
        timers.every(ms(100), "shoot", Some("shoot".into()), true);
        assert_eq!(pass(&mut timers), vec!["shoot"]);
        assert!(pass(&mut timers).is_empty());
        timers.advance(ms(100));
        assert_eq!(pass(&mut timers), vec!["shoot"]);
    }

    #[test]
    fn due_order_is_time_then_schedule_order() {
        let mut timers = TimerSet::new();
        timers.after(ms(30), "c", None);
        timers.after(ms(10), "a", None);
        timers.after(ms(10), "b", None);
        timers.advance(ms(30));
        assert_eq!(pass(&mut timers), vec!["a", "b", "c"]);
    }

    #[test]
    fn cancelled_ticket_does_not_fire() {
        let mut timers = TimerSet::new();
        let first = timers.after(ms(10), "first", None);
        let second = timers.after(ms(10), "second", None);
        timers.advance(ms(10));

        let tickets = timers.due();
        assert_eq!(tickets.len(), 2);
        assert!(timers.fire(&tickets[0]).is_some());
        // The first callback cancels the second before it runs.
        assert!(timers.cancel(&second));
        assert!(timers.fire(&tickets[1]).is_none());
        assert!(!timers.cancel(&first));
    }

    #[test]
    fn replaced_timer_invalidates_old_ticket() {
        let mut timers = TimerSet::new();
        let key = timers.after(ms(10), "old", Some("k".into()));
        timers.advance(ms(10));
        let tickets = timers.due();
        timers.after(ms(10), "new", Some(key));
        assert!(timers.fire(&tickets[0]).is_none());
    }

    #[test]
    fn owned_timers_are_cancelled_with_their_owner() {
        let mut timers = TimerSet::new();
        let owner = EntityId::from_raw(7);
        let other = EntityId::from_raw(8);
        let anim = timers.every(ms(500), "anim", Some(TimerKey::Scoped(owner, "anim".into())), false);
        let ttl = timers.after(ms(900), "ttl", None);
        let keep = timers.after(ms(900), "keep", None);
        assert!(timers.bind_to_entity(&anim, owner));
        assert!(timers.bind_to_entity(&ttl, owner));
        assert!(timers.bind_to_entity(&keep, other));
        assert!(!timers.bind_to_entity(&TimerKey::from("missing"), owner));

        assert_eq!(timers.cancel_owned_by(owner), 2);
        assert_eq!(timers.cancel_owned_by(owner), 0);
        assert!(timers.contains(&keep));
    }

    #[test]
    fn far_future_delays_saturate() {
        let mut timers = TimerSet::new();
        timers.advance(ms(10));
        let never = timers.after(Duration::MAX, "never", None);
        let rare = timers.every(Duration::MAX, "rare", None, true);
        assert_eq!(timers.remaining(&never), Some(Duration::MAX - ms(10)));

        assert_eq!(pass(&mut timers), vec!["rare"]);
        assert_eq!(timers.remaining(&rare), Some(Duration::MAX - ms(10)));
        timers.advance(ms(10));
        assert!(pass(&mut timers).is_empty());
    }

    #[test]
    fn cancelling_unknown_key_is_noop() {
        let mut timers: TimerSet<&'static str> = TimerSet::new();
        assert!(!timers.cancel(&TimerKey::from("nope")));
    }
}
