//! Typed key-value payload carried by every entity.
//!
//! Game code stores per-entity state here (speed, target position, pickup
//! value, ...) instead of growing the entity record for each game.

use std::collections::BTreeMap;

use glam::Vec2;

use crate::error::{BehaveError, Result};
use crate::world::EntityId;

/// A single payload value. The set of variants is closed on purpose so that
/// payloads stay cheap to clone and easy to inspect in logs.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f32),
    Bool(bool),
    Text(String),
    Vec2(Vec2),
    Entity(EntityId),
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f32> for AttrValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec2> for AttrValue {
    fn from(value: Vec2) -> Self {
        Self::Vec2(value)
    }
}

impl From<EntityId> for AttrValue {
    fn from(value: EntityId) -> Self {
        Self::Entity(value)
    }
}

/// Per-entity attribute table, ordered by key so iteration is deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attrs {
    values: BTreeMap<String, AttrValue>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used when describing a spawn.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or overwrite a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Integer value. Floats are not coerced.
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value; integers are widened.
    pub fn float(&self, key: &str) -> Option<f32> {
        match self.values.get(key)? {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(AttrValue::Bool(true)))
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            AttrValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn vec2(&self, key: &str) -> Option<Vec2> {
        match self.values.get(key)? {
            AttrValue::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn entity(&self, key: &str) -> Option<EntityId> {
        match self.values.get(key)? {
            AttrValue::Entity(v) => Some(*v),
            _ => None,
        }
    }

    /// Check every key and value, failing on the first bad one.
    pub(crate) fn validate(&self) -> Result<()> {
        for (key, value) in &self.values {
            if key.is_empty() {
                return Err(BehaveError::InvalidAttribute {
                    key: key.clone(),
                    reason: "key must not be empty",
                });
            }
            let finite = match value {
                AttrValue::Float(v) => v.is_finite(),
                AttrValue::Vec2(v) => v.is_finite(),
                _ => true,
            };
            if !finite {
                return Err(BehaveError::InvalidAttribute {
                    key: key.clone(),
                    reason: "value must be finite",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_only_match_their_variant() {
        let attrs = Attrs::new()
            .with("speed", 20)
            .with("scale", 0.5f32)
            .with("homing", true)
            .with("name", "bat");

        assert_eq!(attrs.int("speed"), Some(20));
        assert_eq!(attrs.float("speed"), Some(20.0));
        assert_eq!(attrs.int("scale"), None);
        assert!(attrs.flag("homing"));
        assert!(!attrs.flag("name"));
        assert_eq!(attrs.text("name"), Some("bat"));
        assert_eq!(attrs.vec2("name"), None);
    }

    #[test]
    fn validate_rejects_empty_keys_and_nan() {
        assert!(Attrs::new().with("", 1).validate().is_err());
        assert!(Attrs::new().with("v", f32::NAN).validate().is_err());
        assert!(Attrs::new()
            .with("target", Vec2::new(f32::INFINITY, 0.0))
            .validate()
            .is_err());
        assert!(Attrs::new().with("v", 1.5f32).validate().is_ok());
    }
}
