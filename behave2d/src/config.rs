use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{BehaveError, Result};

/// Configuration values for a session and its physics host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed update rate in ticks per second.
    pub tick_rate: u32,
    /// Gravity handed to the physics host.
    pub gravity: Vec2,
    /// Categories drawn first, in this order. Others follow in first-spawn
    /// order.
    pub draw_order: Vec<String>,
    /// Upper bound on live entities; `None` means unbounded.
    pub max_entities: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            gravity: Vec2::ZERO,
            draw_order: Vec::new(),
            max_entities: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    #[must_use]
    pub fn with_draw_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draw_order = order.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_max_entities(mut self, max: usize) -> Self {
        self.max_entities = Some(max);
        self
    }

    /// Length of one tick in seconds.
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 {
            return Err(BehaveError::Config("tick_rate must be positive".into()));
        }
        if !self.gravity.is_finite() {
            return Err(BehaveError::Config("gravity must be finite".into()));
        }
        if self.max_entities == Some(0) {
            return Err(BehaveError::Config("max_entities must be positive".into()));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = SessionConfig::from_json(r#"{ "tick_rate": 30, "draw_order": ["exp", "enemy"] }"#)
            .unwrap();
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.gravity, Vec2::ZERO);
        assert_eq!(config.draw_order, vec!["exp", "enemy"]);
        assert_eq!(config.max_entities, None);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            SessionConfig::from_json(r#"{ "tick_rate": 0 }"#),
            Err(BehaveError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_json("{ not json"),
            Err(BehaveError::ConfigFormat(_))
        ));
    }

    #[test]
    fn builder_round_trips_through_json() {
        let config = SessionConfig::new()
            .with_tick_rate(120)
            .with_gravity(Vec2::new(0.0, 9.81))
            .with_max_entities(500);
        let back = SessionConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
        assert!((back.tick_seconds() - 1.0 / 120.0).abs() < 1e-9);
    }
}
