pub mod analog;
pub mod config;
pub mod encoder;
mod error;
pub mod events;
pub mod gpio;
pub mod mock;
pub mod source;
pub mod state;

pub use self::config::InputConfig;
pub use self::encoder::{QuadratureDecoder, QuadratureEncoder, RotaryEncoder};
pub use self::error::InitError;
use self::events::FrameEvents;
pub use self::source::{AnalogChannel, Button, DigitalInput, Encoder, MatrixBus};
use self::source::{ButtonBank, Joystick, Matrix, Pass};
use self::state::{KeyCell, KeyState};
use crate::key::{Key, KeyLayout, Source};

/// Highest number of keys a layout may hold
pub const MAX_KEYS: usize = u16::MAX as usize + 1;

/// Input subsystem.
///
/// Owns the configured sources, the state machine of every key and the frame
/// event buffers. Call [`InputSubsystem::poll`] once per frame.
pub struct InputSubsystem {
    layout: KeyLayout,
    debounce: u32,
    matrix: Option<Matrix>,
    buttons: ButtonBank,
    encoder: Option<RotaryEncoder>,
    joystick: Joystick,
    cells: Vec<KeyCell>,
    events: FrameEvents,
}

impl InputSubsystem {
    /// Create a new input subsystem with the given configuration.
    ///
    /// All per-key storage is allocated here and never grows afterwards.
    pub fn new(config: InputConfig) -> Result<Self, InitError> {
        let matrix = config.matrix.map(Matrix::new);
        let (rows, cols) = matrix.as_ref().map(Matrix::size).unwrap_or((0, 0));
        if matrix.is_some() && (rows == 0 || cols == 0) {
            return Err(InitError::EmptyMatrix);
        }
        let layout = KeyLayout::new(
            rows,
            cols,
            config.buttons.len(),
            config.encoder.is_some(),
            config.joystick.len(),
        );
        if layout.total() > MAX_KEYS {
            return Err(InitError::TooManyKeys {
                keys: layout.total(),
                max: MAX_KEYS,
            });
        }
        info!(
            "input layout: {rows}x{cols} matrix, {} buttons, {} rotary, {} joystick ({} keys, debounce {})",
            layout.len(Source::Gpio),
            layout.len(Source::Rotary),
            layout.len(Source::Joystick),
            layout.total(),
            config.debounce
        );

        Ok(Self {
            layout,
            debounce: config.debounce,
            matrix,
            buttons: ButtonBank::new(config.buttons),
            encoder: config.encoder,
            joystick: Joystick::new(config.joystick),
            cells: vec![KeyCell::default(); layout.total()],
            events: FrameEvents::new(layout.total()),
        })
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Debounce threshold in polls
    pub fn debounce(&self) -> u32 {
        self.debounce
    }

    /// Run one poll pass over every source and open the frame.
    ///
    /// The edge events of the frame are cleared when the returned [`Frame`]
    /// is dropped.
    pub fn poll(&mut self) -> Frame<'_> {
        self.poll_pass();
        Frame { input: self }
    }

    fn poll_pass(&mut self) {
        trace!("poll pass");
        self.events.begin_pass();
        let mut pass = Pass {
            cells: &mut self.cells,
            events: &mut self.events,
            threshold: self.debounce,
        };
        if let Some(matrix) = self.matrix.as_mut() {
            pass.run(matrix, self.layout.range(Source::Matrix).start);
        }
        pass.run(&mut self.buttons, self.layout.range(Source::Gpio).start);
        if let Some(encoder) = self.encoder.as_mut() {
            pass.run(encoder, self.layout.range(Source::Rotary).start);
        }
        pass.run(&mut self.joystick, self.layout.range(Source::Joystick).start);
    }

    /// Keys that entered the pressed state since the edges were last cleared
    pub fn just_pressed(&self) -> &[Key] {
        self.events.just_pressed()
    }

    /// Keys in the pressed state after the last poll
    pub fn pressed(&self) -> &[Key] {
        self.events.pressed()
    }

    /// Keys released since the edges were last cleared
    pub fn just_released(&self) -> &[Key] {
        self.events.just_released()
    }

    /// Consecutive polls `key` has been held.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not part of the layout.
    pub fn duration_of(&self, key: Key) -> u32 {
        self.events.duration_of(key)
    }

    /// State machine state of `key`
    pub fn state_of(&self, key: Key) -> Option<KeyState> {
        self.cells.get(key.index()).map(KeyCell::state)
    }

    /// Forget the just-pressed and just-released keys.
    ///
    /// [`Frame`] calls this on drop; skipping it redelivers the same edges on
    /// the next frame.
    pub fn clear_frame_edges(&mut self) {
        self.events.clear_edges();
    }
}

/// Results of one poll pass.
///
/// Borrows the subsystem until dropped, which clears the frame edges.
pub struct Frame<'a> {
    input: &'a mut InputSubsystem,
}

impl Frame<'_> {
    pub fn layout(&self) -> &KeyLayout {
        self.input.layout()
    }

    pub fn just_pressed(&self) -> &[Key] {
        self.input.just_pressed()
    }

    pub fn pressed(&self) -> &[Key] {
        self.input.pressed()
    }

    pub fn just_released(&self) -> &[Key] {
        self.input.just_released()
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed().contains(&key)
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed().contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released().contains(&key)
    }

    /// See [`InputSubsystem::duration_of`]
    pub fn duration_of(&self, key: Key) -> u32 {
        self.input.duration_of(key)
    }

    pub fn state_of(&self, key: Key) -> Option<KeyState> {
        self.input.state_of(key)
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.input.clear_frame_edges();
    }
}
