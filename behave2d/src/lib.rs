//! behave2d - entity lifecycle and reactive contacts for small 2D games.
//!
//! A [`Session`] owns every live entity together with its timers, contact
//! handlers and despawn cascades, and keeps them consistent: spawning is
//! all-or-nothing, despawning is idempotent and takes everything bound to the
//! entity with it, and no callback ever sees a dead entity.

pub mod attrs;
pub mod audio;
pub mod behavior;
pub mod config;
pub mod contact;
pub mod counters;
pub mod draw;
pub mod entities;
pub mod error;
pub mod groups;
pub mod host;
pub mod input;
pub mod orchestrator;
pub mod physics;
pub mod session;
pub mod timers;
pub mod tween;
pub mod world;

pub use crate::attrs::{AttrValue, Attrs};
pub use crate::audio::{AudioSink, SilentAudio, SoundLog};
pub use crate::behavior::{Capabilities, CategoryBehavior, DrawFn, UpdateFn};
pub use crate::config::SessionConfig;
pub use crate::contact::{Contact, ContactEvent, ContactFilter, ContactPhase, HandlerId};
pub use crate::counters::Counters;
pub use crate::draw::{Canvas, Color, Primitive, RecordingCanvas, WHITE};
pub use crate::entities::{
    Body, Category, ColliderShape, Entity, Life, Lifecycle, Remains, RigidBodyType, Spawn,
};
pub use crate::error::{BehaveError, Result};
pub use crate::host::{BodyState, NullHost, PhysicsHost};
pub use crate::input::{InputState, Key, MouseButton};
pub use crate::orchestrator::{SpawnFactory, SpawnRule};
pub use crate::physics::RapierHost;
pub use crate::session::{ContactHandlers, Session};
pub use crate::timers::TimerKey;
pub use crate::tween::Easing;
pub use crate::world::{Cursor, EntityId, World};
pub use glam::Vec2;
