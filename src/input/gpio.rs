//! GPIO backends: rppal for the Raspberry Pi GPIO block, gpio-cdev for any
//! Linux GPIO character device.

use std::path::Path;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use rppal::gpio::{Bias, Gpio, InputPin, IoPin, Mode};

use super::InitError;
use super::source::{DigitalInput, MatrixBus};

const CONSUMER: &str = "padscan";

/// Input line on the Raspberry Pi GPIO block
#[derive(Debug)]
pub struct RppalInput {
    pin: InputPin,
}

impl RppalInput {
    /// Claim `pin` as an input, pulled up if `active_low` else pulled down
    pub fn try_new(gpio: &Gpio, pin: u8, active_low: bool) -> Result<Self, InitError> {
        let raw = gpio
            .get(pin)
            .map_err(|source| InitError::Rppal { pin, source })?;
        let pin = if active_low {
            raw.into_input_pullup()
        } else {
            raw.into_input_pulldown()
        };
        Ok(Self { pin })
    }
}

impl DigitalInput for RppalInput {
    fn is_high(&mut self) -> bool {
        self.pin.is_high()
    }
}

/// Key matrix wired to the Raspberry Pi GPIO block.
///
/// Rows are pulled-down inputs; columns idle as pulled-down inputs and are
/// switched to outputs only while driven.
#[derive(Debug)]
pub struct RppalMatrix {
    rows: Vec<InputPin>,
    cols: Vec<IoPin>,
}

impl RppalMatrix {
    pub fn try_new(gpio: &Gpio, rows: &[u8], cols: &[u8]) -> Result<Self, InitError> {
        if rows.is_empty() || cols.is_empty() {
            return Err(InitError::EmptyMatrix);
        }
        let rows = rows
            .iter()
            .map(|pin| {
                gpio.get(*pin)
                    .map(|p| p.into_input_pulldown())
                    .map_err(|source| InitError::Rppal { pin: *pin, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let cols = cols
            .iter()
            .map(|pin| {
                gpio.get(*pin)
                    .map(|p| {
                        let mut io = p.into_io(Mode::Input);
                        io.set_bias(Bias::PullDown);
                        io
                    })
                    .map_err(|source| InitError::Rppal { pin: *pin, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows, cols })
    }
}

impl MatrixBus for RppalMatrix {
    fn rows(&self) -> usize {
        self.rows.len()
    }

    fn cols(&self) -> usize {
        self.cols.len()
    }

    fn drive_high(&mut self, col: usize) {
        let pin = &mut self.cols[col];
        pin.set_mode(Mode::Output);
        pin.set_high();
    }

    fn release(&mut self, col: usize) {
        let pin = &mut self.cols[col];
        pin.set_low();
        pin.set_mode(Mode::Input);
        pin.set_bias(Bias::PullDown);
    }

    fn read_row(&mut self, row: usize) -> bool {
        self.rows[row].is_high()
    }
}

/// Input line requested through a GPIO character device.
///
/// The kernel ABI exposed by gpio-cdev has no bias flags, so the line needs
/// an external pull resistor.
pub struct CdevInput {
    handle: LineHandle,
    line: u32,
    idle_high: bool,
}

impl CdevInput {
    /// Request `line` on `chip`; `active_low` tells which level reads as released
    pub fn try_new(chip: &Path, line: u32, active_low: bool) -> Result<Self, InitError> {
        let cdev_err = |source| InitError::Cdev {
            chip: chip.to_path_buf(),
            line,
            source,
        };
        let handle = Chip::new(chip)
            .and_then(|mut c| c.get_line(line))
            .and_then(|l| l.request(LineRequestFlags::INPUT, 0, CONSUMER))
            .map_err(cdev_err)?;
        handle.get_value().map_err(cdev_err)?;
        Ok(Self {
            handle,
            line,
            idle_high: active_low,
        })
    }
}

impl DigitalInput for CdevInput {
    fn is_high(&mut self) -> bool {
        match self.handle.get_value() {
            Ok(value) => value != 0,
            Err(e) => {
                error!("Failed to read GPIO line {}: {}", self.line, e);
                self.idle_high
            }
        }
    }
}
