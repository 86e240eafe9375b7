use super::encoder::RotaryEncoder;
use super::source::{AnalogChannel, Button, MatrixBus};

/// Configuration for the input subsystem.
///
/// Sources are always polled in the order matrix, buttons, encoder, joystick,
/// whatever order they are configured in.
#[derive(Default)]
pub struct InputConfig {
    /// Polls a raw change must stay stable before it is trusted; 0 trusts the first poll
    pub debounce: u32,
    pub matrix: Option<Box<dyn MatrixBus>>,
    pub buttons: Vec<Button>,
    pub encoder: Option<RotaryEncoder>,
    pub joystick: Vec<Box<dyn AnalogChannel>>,
}

impl InputConfig {
    pub fn with_debounce(mut self, debounce: u32) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_matrix(mut self, bus: impl MatrixBus + 'static) -> Self {
        self.matrix = Some(Box::new(bus));
        self
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn with_encoder(mut self, encoder: RotaryEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_joystick(mut self, channel: impl AnalogChannel + 'static) -> Self {
        self.joystick.push(Box::new(channel));
        self
    }
}
