//! Per-frame key event buffers.

use std::vec::Drain;

use super::state::{KeyState, Transition};
use crate::key::Key;

/// Key events collected by poll passes.
///
/// `pressed` is rebuilt on every pass. The edge lists (`just_pressed` and
/// `just_released`) are kept until [`FrameEvents::clear_edges`] is called; a
/// pass that runs before the clear appends to them again.
#[derive(Debug, Clone)]
pub struct FrameEvents {
    just_pressed: Vec<Key>,
    pressed: Vec<Key>,
    just_released: Vec<Key>,
    durations: Vec<u32>,
}

impl FrameEvents {
    /// Create buffers for `total` keys
    pub fn new(total: usize) -> Self {
        Self {
            just_pressed: Vec::with_capacity(total),
            pressed: Vec::with_capacity(total),
            just_released: Vec::with_capacity(total),
            durations: vec![0; total],
        }
    }

    /// Start a new poll pass
    pub fn begin_pass(&mut self) {
        self.pressed.clear();
    }

    /// Route the outcome of one key step; `state` is the state after the step
    pub fn record(&mut self, key: Key, transition: Transition, state: KeyState) {
        match transition {
            Transition::None => {}
            Transition::JustPressed => {
                self.record_just_pressed(key);
                self.increment_duration(key);
            }
            Transition::StillPressed => self.increment_duration(key),
            Transition::JustReleased => {
                self.record_just_released(key);
                self.reset_duration(key);
            }
        }
        if state == KeyState::Pressed {
            self.record_pressed(key);
        }
    }

    pub fn record_just_pressed(&mut self, key: Key) {
        self.just_pressed.push(key);
    }

    pub fn record_pressed(&mut self, key: Key) {
        self.pressed.push(key);
    }

    pub fn record_just_released(&mut self, key: Key) {
        self.just_released.push(key);
    }

    pub fn increment_duration(&mut self, key: Key) {
        let duration = &mut self.durations[key.index()];
        *duration = duration.saturating_add(1);
    }

    pub fn reset_duration(&mut self, key: Key) {
        self.durations[key.index()] = 0;
    }

    /// Forget the edge events of the current frame
    pub fn clear_edges(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }

    pub fn just_pressed(&self) -> &[Key] {
        &self.just_pressed
    }

    pub fn pressed(&self) -> &[Key] {
        &self.pressed
    }

    pub fn just_released(&self) -> &[Key] {
        &self.just_released
    }

    pub fn drain_just_pressed(&mut self) -> Drain<'_, Key> {
        self.just_pressed.drain(..)
    }

    pub fn drain_just_released(&mut self) -> Drain<'_, Key> {
        self.just_released.drain(..)
    }

    /// Consecutive polls `key` has been held.
    ///
    /// # Panics
    ///
    /// Panics if `key` is outside the layout the buffers were created for.
    pub fn duration_of(&self, key: Key) -> u32 {
        self.durations[key.index()]
    }
}
