use std::collections::HashSet;

use glam::Vec2;

/// Keys the sample games react to. Hosts map their native key codes onto
/// these; anything else can travel as `Char`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Enter,
    Escape,
    Char(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn index(self) -> usize {
        match self {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Middle => 2,
        }
    }
}

/// Keyboard and mouse state, fed by the host between ticks and polled by game
/// code during the tick. Pressed/released edges last for exactly one tick.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    keys_down: HashSet<Key>,
    keys_pressed: HashSet<Key>,
    keys_released: HashSet<Key>,

    mouse: Vec2,
    mouse_down: [bool; 3],
    mouse_pressed: [bool; 3],
    mouse_released: [bool; 3],
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-tick pressed/released flags. Called by the session at the
    /// end of every tick.
    pub fn end_tick(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.mouse_pressed = [false; 3];
        self.mouse_released = [false; 3];
    }

    /// Key went down. Repeats while held do not produce a new press edge.
    pub fn press(&mut self, key: Key) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: Key) {
        if self.keys_down.remove(&key) {
            self.keys_released.insert(key);
        }
    }

    pub fn press_mouse(&mut self, button: MouseButton) {
        let idx = button.index();
        if !self.mouse_down[idx] {
            self.mouse_pressed[idx] = true;
        }
        self.mouse_down[idx] = true;
    }

    pub fn release_mouse(&mut self, button: MouseButton) {
        let idx = button.index();
        if self.mouse_down[idx] {
            self.mouse_released[idx] = true;
        }
        self.mouse_down[idx] = false;
    }

    pub fn move_mouse(&mut self, position: Vec2) {
        self.mouse = position;
    }

    /// Returns true if the key is currently held down.
    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this tick.
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the key was released this tick.
    pub fn is_key_released(&self, key: Key) -> bool {
        self.keys_released.contains(&key)
    }

    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_down[button.index()]
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed[button.index()]
    }

    pub fn is_mouse_released(&self, button: MouseButton) -> bool {
        self.mouse_released[button.index()]
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse
    }

    /// Arrow-key direction, each component in `-1.0..=1.0`. Opposite keys
    /// cancel out.
    pub fn arrows(&self) -> Vec2 {
        let axis = |neg, pos| {
            let mut value = 0.0;
            if self.is_key_down(neg) {
                value -= 1.0;
            }
            if self.is_key_down(pos) {
                value += 1.0;
            }
            value
        };
        Vec2::new(axis(Key::Left, Key::Right), axis(Key::Up, Key::Down))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_edges_last_one_tick() {
        let mut input = InputState::new();
        input.press(Key::Space);
        input.press(Key::Space);
        assert!(input.is_key_pressed(Key::Space));
        assert!(input.is_key_down(Key::Space));

        input.end_tick();
        assert!(!input.is_key_pressed(Key::Space));
        assert!(input.is_key_down(Key::Space));

        input.release(Key::Space);
        assert!(input.is_key_released(Key::Space));
        input.end_tick();
        assert!(!input.is_key_released(Key::Space));
        assert!(!input.is_key_down(Key::Space));
    }

    #[test]
    fn arrows_cancel_out() {
        let mut input = InputState::new();
        input.press(Key::Left);
        input.press(Key::Down);
        assert_eq!(input.arrows(), Vec2::new(-1.0, 1.0));
        input.press(Key::Right);
        assert_eq!(input.arrows(), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn mouse_buttons() {
        let mut input = InputState::new();
        input.press_mouse(MouseButton::Left);
        input.move_mouse(Vec2::new(3.0, 4.0));
        assert!(input.is_mouse_pressed(MouseButton::Left));
        input.end_tick();
        assert!(input.is_mouse_down(MouseButton::Left));
        input.release_mouse(MouseButton::Left);
        assert!(input.is_mouse_released(MouseButton::Left));
        assert_eq!(input.mouse_position(), Vec2::new(3.0, 4.0));
    }
}
