use std::cell::RefCell;
use std::rc::Rc;

/// Sound output provided by the host. Sounds are addressed by their index in
/// the host's sound bank.
pub trait AudioSink {
    /// Play a sound effect once. `gain` is already clamped to `0.0..=1.0`.
    fn play_sound(&mut self, index: usize, gain: f32);
}

/// Audio sink for headless runs. Every request is only logged.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play_sound(&mut self, index: usize, gain: f32) {
        log::trace!("sound {index} at gain {gain:.2} (silent)");
    }
}

/// Records every played sound. Clones share the same log, so one copy can go
/// into the session while another is inspected.
#[derive(Clone, Debug, Default)]
pub struct SoundLog {
    played: Rc<RefCell<Vec<(usize, f32)>>>,
}

impl SoundLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(index, gain)` pairs played so far.
    pub fn played(&self) -> Vec<(usize, f32)> {
        self.played.borrow().clone()
    }

    /// How many times sound `index` was played.
    pub fn count(&self, index: usize) -> usize {
        self.played.borrow().iter().filter(|(i, _)| *i == index).count()
    }
}

impl AudioSink for SoundLog {
    fn play_sound(&mut self, index: usize, gain: f32) {
        self.played.borrow_mut().push((index, gain));
    }
}
