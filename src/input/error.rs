use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while bringing up input hardware.
///
/// All of them happen before the first poll; the poll path itself cannot fail.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("layout needs {keys} keys, at most {max} are supported")]
    TooManyKeys { keys: usize, max: usize },
    #[error("key matrix needs at least one row and one column")]
    EmptyMatrix,
    #[error("failed to set up GPIO {pin}: {source}")]
    Rppal {
        pin: u8,
        #[source]
        source: rppal::gpio::Error,
    },
    #[error("failed to request line {line} on {chip:?}: {source}")]
    Cdev {
        chip: PathBuf,
        line: u32,
        #[source]
        source: gpio_cdev::Error,
    },
    #[error("failed to read analog channel {path:?}: {source}")]
    Analog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
