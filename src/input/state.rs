//! Per-key finite state machine with debounce counter.

/// Debounce state of a single key
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Idle,
    ArmingPress,
    Pressed,
    ArmingRelease,
}

/// Event produced by a single step of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    JustPressed,
    StillPressed,
    JustReleased,
}

/// Transition table a key runs through.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum KeyFsm {
    /// Buttons, matrix cells and joystick channels.
    #[default]
    Standard,
    /// Rotary pseudo-keys: never debounced, and the arming states look at the
    /// current raw reading, so a single detent produces a press and a release
    /// in two polls.
    Rotary,
}

/// State and debounce counter of one key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyCell {
    state: KeyState,
    cycle: u32,
}

impl KeyCell {
    pub fn state(&self) -> KeyState {
        self.state
    }

    /// Consecutive polls the raw signal has been stable while waiting for the threshold
    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Advance the machine by one poll
    pub fn step(&mut self, fsm: KeyFsm, raw: bool, threshold: u32) -> Transition {
        match (fsm, self.state) {
            (KeyFsm::Standard, KeyState::Idle) => self.step_idle(raw, threshold),
            (KeyFsm::Standard, KeyState::Pressed) => self.step_pressed(raw, threshold),
            // a detent is raw-true for a single poll, there is nothing to debounce
            (KeyFsm::Rotary, KeyState::Idle) => self.step_idle(raw, 0),
            (KeyFsm::Rotary, KeyState::Pressed) => self.step_pressed(raw, 0),
            (KeyFsm::Standard, KeyState::ArmingPress) => {
                self.enter(KeyState::Pressed);
                Transition::JustPressed
            }
            (KeyFsm::Standard, KeyState::ArmingRelease) => {
                self.enter(KeyState::Idle);
                Transition::JustReleased
            }
            (KeyFsm::Rotary, KeyState::ArmingPress) => {
                self.enter(if raw {
                    KeyState::Pressed
                } else {
                    KeyState::ArmingRelease
                });
                Transition::JustPressed
            }
            (KeyFsm::Rotary, KeyState::ArmingRelease) => {
                self.enter(if raw {
                    KeyState::ArmingPress
                } else {
                    KeyState::Idle
                });
                Transition::JustReleased
            }
        }
    }

    fn step_idle(&mut self, raw: bool, threshold: u32) -> Transition {
        if !raw {
            self.cycle = 0;
        } else if self.cycle >= threshold {
            self.enter(KeyState::ArmingPress);
        } else {
            self.cycle = self.cycle.saturating_add(1);
        }
        Transition::None
    }

    fn step_pressed(&mut self, raw: bool, threshold: u32) -> Transition {
        if raw {
            self.cycle = 0;
        } else if self.cycle >= threshold {
            self.enter(KeyState::ArmingRelease);
            return Transition::None;
        } else {
            self.cycle = self.cycle.saturating_add(1);
        }
        Transition::StillPressed
    }

    fn enter(&mut self, state: KeyState) {
        self.state = state;
        self.cycle = 0;
    }
}
