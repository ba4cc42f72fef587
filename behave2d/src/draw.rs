//! Draw target seam.
//!
//! Rendering belongs to the host; game code only emits primitives.

use glam::Vec2;

pub type Color = [f32; 4];

pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];

/// Something to draw, in world coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Rect {
        position: Vec2, // top-left
        size: Vec2,
        color: Color,
    },
    Circle {
        center: Vec2,
        radius: f32,
        color: Color,
    },
    Text {
        text: String,
        position: Vec2,
        size: f32,
        color: Color,
    },
}

pub trait Canvas {
    fn draw_primitive(&mut self, primitive: Primitive);

    fn rect(&mut self, position: Vec2, size: Vec2, color: Color) {
        self.draw_primitive(Primitive::Rect {
            position,
            size,
            color,
        });
    }

    fn circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.draw_primitive(Primitive::Circle {
            center,
            radius,
            color,
        });
    }

    fn text(&mut self, text: &str, position: Vec2, size: f32, color: Color) {
        self.draw_primitive(Primitive::Text {
            text: text.to_string(),
            position,
            size,
            color,
        });
    }
}

/// Canvas that keeps every primitive of a frame, for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    primitives: Vec<Primitive>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    /// Text of every text primitive, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn draw_primitive(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }
}
