//! Analog channels read from Linux IIO sysfs.

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::InitError;
use super::source::AnalogChannel;

/// Pressed predicate over a raw analog reading.
///
/// The channel is pressed when the value is strictly below `below` or
/// strictly above `above`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Threshold {
    pub below: Option<i32>,
    pub above: Option<i32>,
}

impl Threshold {
    pub fn is_pressed(&self, value: i32) -> bool {
        self.below.is_some_and(|below| value < below)
            || self.above.is_some_and(|above| value > above)
    }

    /// Whether at least one bound is set
    pub fn is_bounded(&self) -> bool {
        self.below.is_some() || self.above.is_some()
    }
}

/// IIO channel such as `/sys/bus/iio/devices/iio:device0/in_voltage0_raw`
#[derive(Debug)]
pub struct IioChannel {
    path: PathBuf,
    threshold: Threshold,
}

impl IioChannel {
    /// Open the channel, reading it once to make sure it responds
    pub fn try_new(path: impl Into<PathBuf>, threshold: Threshold) -> Result<Self, InitError> {
        let path = path.into();
        let value = read_raw(&path).map_err(|source| InitError::Analog {
            path: path.clone(),
            source,
        })?;
        debug!("analog channel {} reads {value}", path.display());
        Ok(Self { path, threshold })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AnalogChannel for IioChannel {
    fn is_pressed(&mut self) -> bool {
        match read_raw(&self.path) {
            Ok(value) => self.threshold.is_pressed(value),
            Err(e) => {
                error!("Failed to read analog channel {}: {}", self.path.display(), e);
                false
            }
        }
    }
}

fn read_raw(path: &Path) -> io::Result<i32> {
    let raw = std::fs::read_to_string(path)?;
    raw.trim()
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_should_apply_threshold() {
        let threshold = Threshold {
            below: Some(1000),
            above: Some(3000),
        };

        assert!(threshold.is_pressed(999));
        assert!(!threshold.is_pressed(1000));
        assert!(!threshold.is_pressed(2048));
        assert!(!threshold.is_pressed(3000));
        assert!(threshold.is_pressed(3001));
    }

    #[test]
    fn test_should_not_press_unbounded_threshold() {
        let threshold = Threshold::default();

        assert!(!threshold.is_bounded());
        assert!(!threshold.is_pressed(i32::MIN));
        assert!(!threshold.is_pressed(i32::MAX));
    }

    #[test]
    fn test_should_read_iio_channel() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "2048\n").unwrap();
        let mut channel = IioChannel::try_new(
            file.path(),
            Threshold {
                below: None,
                above: Some(3000),
            },
        )
        .unwrap();

        assert!(!channel.is_pressed());
        std::fs::write(file.path(), "4000\n").unwrap();
        assert!(channel.is_pressed());
    }

    #[test]
    fn test_should_fail_on_unreadable_channel() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not a number").unwrap();

        assert!(IioChannel::try_new(file.path(), Threshold::default()).is_err());
        assert!(IioChannel::try_new("/nonexistent/in_voltage0_raw", Threshold::default()).is_err());
    }

    #[test]
    fn test_should_report_released_when_read_fails() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "10").unwrap();
        let mut channel = IioChannel::try_new(
            file.path(),
            Threshold {
                below: Some(100),
                above: None,
            },
        )
        .unwrap();
        assert!(channel.is_pressed());

        std::fs::write(file.path(), "garbage").unwrap();
        assert!(!channel.is_pressed());
    }
}
