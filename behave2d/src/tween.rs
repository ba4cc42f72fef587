//! Position tweens bound to an entity's lifetime.

use std::collections::HashMap;
use std::time::Duration;

use glam::Vec2;

use crate::world::EntityId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    #[default]
    Linear,
    QuadOut,
    QuintOut,
}

impl Easing {
    /// Map linear progress `t` in `0..=1` onto the eased curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadOut => 1.0 - (1.0 - t).powi(2),
            Easing::QuintOut => 1.0 - (1.0 - t).powi(5),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Tween {
    from: Vec2,
    to: Vec2,
    elapsed: Duration,
    duration: Duration,
    easing: Easing,
}

/// At most one position tween per entity; starting a new one replaces it.
#[derive(Debug, Default)]
pub struct Tweens {
    active: HashMap<EntityId, Tween>,
}

impl Tweens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, id: EntityId, from: Vec2, to: Vec2, duration: Duration, easing: Easing) {
        self.active.insert(
            id,
            Tween {
                from,
                to,
                elapsed: Duration::ZERO,
                duration,
                easing,
            },
        );
    }

    pub fn cancel(&mut self, id: EntityId) -> bool {
        self.active.remove(&id).is_some()
    }

    pub fn is_animating(&self, id: EntityId) -> bool {
        self.active.contains_key(&id)
    }

    /// Advance every tween and return the new positions, sorted by entity.
    /// Finished tweens report their end position once and are dropped.
    pub fn advance(&mut self, dt: Duration) -> Vec<(EntityId, Vec2)> {
        let mut out = Vec::with_capacity(self.active.len());
        self.active.retain(|&id, tween| {
            tween.elapsed += dt;
            let t = if tween.duration.is_zero() {
                1.0
            } else {
                tween.elapsed.as_secs_f32() / tween.duration.as_secs_f32()
            };
            let k = tween.easing.apply(t);
            out.push((id, tween.from.lerp(tween.to, k)));
            t < 1.0
        });
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_endpoints() {
        for easing in [Easing::Linear, Easing::QuadOut, Easing::QuintOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
        assert!(Easing::QuintOut.apply(0.5) > Easing::QuadOut.apply(0.5));
        assert!(Easing::QuadOut.apply(0.5) > Easing::Linear.apply(0.5));
    }

    #[test]
    fn tween_reaches_target_then_stops() {
        let mut tweens = Tweens::new();
        let id = EntityId::from_raw(1);
        tweens.start(id, Vec2::ZERO, Vec2::new(10.0, 0.0), Duration::from_millis(500), Easing::Linear);

        let step = tweens.advance(Duration::from_millis(250));
        assert!((step[0].1.x - 5.0).abs() < 1e-4);

        let step = tweens.advance(Duration::from_millis(300));
        assert_eq!(step, vec![(id, Vec2::new(10.0, 0.0))]);
        assert!(!tweens.is_animating(id));
        assert!(tweens.advance(Duration::from_millis(16)).is_empty());
    }
}
