//! padscan - frame-synchronous key input for small GPIO game consoles
//!
//! Turns raw GPIO lines, a key matrix, a rotary encoder and analog joystick
//! channels into debounced per-frame key events.
//!
//! ```no_run
//! use padscan::input::{InputConfig, InputSubsystem};
//!
//! let mut input = InputSubsystem::new(InputConfig::default()).unwrap();
//! loop {
//!     let frame = input.poll();
//!     for key in frame.just_pressed() {
//!         println!("{key} pressed");
//!     }
//! }
//! ```

#[macro_use]
extern crate log;

pub mod app_config;
pub mod display;
pub mod input;
pub mod key;

pub use self::input::{Frame, InputConfig, InputSubsystem};
pub use self::key::{Key, KeyLayout, RotaryDirection, Source};
