mod backend;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub use self::backend::Backend;
use crate::input::analog::Threshold;

/// Device configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// polls a raw change must be stable for before it is trusted
    #[serde(default)]
    pub debounce: u32,
    /// polling interval in milliseconds
    poll_interval_ms: u64,
    /// default active_low setting for buttons; if true, button is pressed when GPIO is low
    #[serde(default = "default_active_low")]
    pub default_active_low: bool,
    /// GPIO driver for buttons and encoder
    #[serde(default)]
    pub backend: Backend,
    /// GPIO character device used by the cdev backend
    #[serde(default = "default_gpio_chip")]
    pub gpio_chip: PathBuf,
    /// Key matrix configuration
    pub matrix: Option<MatrixConfig>,
    /// Buttons configuration
    #[serde(rename = "button", default)]
    pub buttons: Vec<ButtonConfig>,
    /// Rotary encoder configuration
    pub encoder: Option<EncoderConfig>,
    /// Joystick channels configuration
    #[serde(rename = "joystick", default)]
    pub joysticks: Vec<JoystickConfig>,
    /// Framebuffer configuration
    pub display: Option<DisplayConfig>,
}

fn default_active_low() -> bool {
    true
}

fn default_gpio_chip() -> PathBuf {
    PathBuf::from("/dev/gpiochip0")
}

impl AppConfig {
    /// Load configuration from the specified file path
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config: AppConfig = toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check constraints serde cannot express
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(matrix) = &self.matrix {
            if matrix.rows.is_empty() || matrix.cols.is_empty() {
                anyhow::bail!("key matrix needs at least one row and one column");
            }
            if self.backend != Backend::Rppal {
                anyhow::bail!("key matrix scanning requires the rppal backend");
            }
        }
        if self.encoder.as_ref().is_some_and(|e| e.sample_interval_us == 0) {
            anyhow::bail!("encoder sample_interval_us must be greater than 0");
        }
        for joystick in &self.joysticks {
            if !joystick.threshold.is_bounded() {
                anyhow::bail!(
                    "joystick {:?} needs a `below` or `above` threshold",
                    joystick.path
                );
            }
        }
        Ok(())
    }

    /// Polling interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Human readable label of every key, in layout order
    pub fn key_labels(&self) -> Vec<String> {
        let mut labels = vec![];
        if let Some(matrix) = &self.matrix {
            for row in 0..matrix.rows.len() {
                for col in 0..matrix.cols.len() {
                    labels.push(format!("r{row}c{col}"));
                }
            }
        }
        labels.extend(self.buttons.iter().map(|b| {
            b.name
                .clone()
                .unwrap_or_else(|| format!("gpio{}", b.gpio))
        }));
        if self.encoder.is_some() {
            labels.push("rotary-".to_string());
            labels.push("rotary+".to_string());
        }
        labels.extend(
            self.joysticks
                .iter()
                .enumerate()
                .map(|(i, j)| j.name.clone().unwrap_or_else(|| format!("axis{i}"))),
        );
        labels
    }
}

/// Key matrix pins
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixConfig {
    /// Row GPIO pins, read as pulled-down inputs
    pub rows: Vec<u8>,
    /// Column GPIO pins, driven high one at a time
    pub cols: Vec<u8>,
}

/// Configuration for an individual button
#[derive(Debug, Clone, Deserialize)]
pub struct ButtonConfig {
    /// GPIO pin (or line offset for the cdev backend)
    pub gpio: u8,
    pub name: Option<String>,
    /// Whether the button is active low; if true, button is pressed when GPIO is low
    pub active_low: Option<bool>,
}

/// Quadrature encoder pins
#[derive(Debug, Clone, Deserialize)]
pub struct EncoderConfig {
    pub pin_a: u8,
    pub pin_b: u8,
    /// swap the increment and decrement keys
    #[serde(default)]
    pub invert: bool,
    #[serde(default = "default_steps_per_detent")]
    pub steps_per_detent: u32,
    /// period of the quadrature sampling thread in microseconds
    #[serde(default = "default_sample_interval_us")]
    sample_interval_us: u64,
}

fn default_steps_per_detent() -> u32 {
    4
}

fn default_sample_interval_us() -> u64 {
    500
}

impl EncoderConfig {
    /// Quadrature sampling period
    pub fn sample_interval(&self) -> Duration {
        Duration::from_micros(self.sample_interval_us)
    }
}

/// Configuration for an individual joystick channel
#[derive(Debug, Clone, Deserialize)]
pub struct JoystickConfig {
    /// IIO raw value file
    pub path: PathBuf,
    pub name: Option<String>,
    #[serde(flatten)]
    pub threshold: Threshold,
}

/// Framebuffer output
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub stride_pixels: usize,
    #[serde(default = "default_bytes_per_pixel")]
    pub bytes_per_pixel: usize,
}

fn default_bytes_per_pixel() -> usize {
    2
}

#[cfg(test)]
mod tests {

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_should_parse_config() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();

        assert_eq!(config.debounce, 0);
        assert_eq!(config.poll_interval(), Duration::from_millis(16));
        assert!(config.default_active_low);
        assert_eq!(config.backend, Backend::Rppal);
        assert_eq!(config.gpio_chip, PathBuf::from("/dev/gpiochip0"));

        let matrix = config.matrix.as_ref().unwrap();
        assert_eq!(matrix.rows, vec![5, 6, 13]);
        assert_eq!(matrix.cols, vec![19]);

        assert_eq!(config.buttons.len(), 2);
        assert_eq!(config.buttons[0].gpio, 4);
        assert_eq!(config.buttons[0].name.as_deref(), Some("up"));
        assert_eq!(config.buttons[0].active_low, None);
        assert_eq!(config.buttons[1].active_low, Some(false));

        let encoder = config.encoder.as_ref().unwrap();
        assert_eq!((encoder.pin_a, encoder.pin_b), (17, 27));
        assert!(encoder.invert);
        assert_eq!(encoder.steps_per_detent, 4);
        assert_eq!(encoder.sample_interval(), Duration::from_micros(250));

        assert_eq!(config.joysticks.len(), 1);
        assert_eq!(
            config.joysticks[0].threshold,
            Threshold {
                below: Some(1000),
                above: Some(3000)
            }
        );

        let display = config.display.as_ref().unwrap();
        assert_eq!(display.path, PathBuf::from("/dev/fb1"));
        assert_eq!(display.bytes_per_pixel, 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_should_load_from_file() {
        let tempfile = NamedTempFile::new().unwrap();
        std::fs::write(tempfile.path(), DEFAULT_CONFIG).unwrap();

        let config = AppConfig::load_from_file(tempfile.path()).unwrap();
        assert_eq!(config.buttons.len(), 2);
        assert_eq!(config.joysticks.len(), 1);
    }

    #[test]
    fn test_should_parse_config_without_arrays() {
        let config: AppConfig = toml::from_str(CONFIG_WNO_ARRAYS).unwrap();

        assert_eq!(config.debounce, 2);
        assert_eq!(config.backend, Backend::Cdev);
        assert!(config.matrix.is_none());
        assert!(config.key_labels().is_empty());
    }

    #[test]
    fn test_should_label_keys_in_layout_order() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();

        assert_eq!(
            config.key_labels(),
            vec!["r0c0", "r1c0", "r2c0", "up", "gpio22", "rotary-", "rotary+", "left"]
        );
    }

    #[test]
    fn test_should_reject_matrix_on_cdev() {
        let config = format!("backend = \"cdev\"\n{CONFIG_MATRIX_ONLY}");
        let config: AppConfig = toml::from_str(&config).unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_default_encoder_sample_interval() {
        let config: AppConfig = toml::from_str(CONFIG_ENCODER_ONLY).unwrap();

        let encoder = config.encoder.as_ref().unwrap();
        assert_eq!(encoder.sample_interval(), Duration::from_micros(500));
        config.validate().unwrap();
    }

    #[test]
    fn test_should_reject_zero_sample_interval() {
        let config = format!("{CONFIG_ENCODER_ONLY}sample_interval_us = 0\n");
        let config: AppConfig = toml::from_str(&config).unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_reject_unbounded_joystick() {
        let tempfile = NamedTempFile::new().unwrap();
        std::fs::write(
            tempfile.path(),
            r#"
poll_interval_ms = 16

[[joystick]]
path = "/sys/bus/iio/devices/iio:device0/in_voltage0_raw"
"#,
        )
        .unwrap();

        assert!(AppConfig::load_from_file(tempfile.path()).is_err());
    }

    const DEFAULT_CONFIG: &str = r#"
debounce = 0 # polls a raw change must be stable for
poll_interval_ms = 16 # frame period in milliseconds
default_active_low = true # if true, buttons are pressed when GPIO is low

[matrix]
rows = [5, 6, 13]
cols = [19]

[[button]]
gpio = 4
name = "up"

[[button]]
gpio = 22
active_low = false # `default_active_low` by default

[encoder]
pin_a = 17
pin_b = 27
invert = true
sample_interval_us = 250 # quadrature lines are sampled apart from the frame loop

[[joystick]]
path = "/sys/bus/iio/devices/iio:device0/in_voltage0_raw"
name = "left"
below = 1000
above = 3000

[display]
path = "/dev/fb1"
width = 320
height = 240
stride_pixels = 320
    "#;

    const CONFIG_WNO_ARRAYS: &str = r#"
debounce = 2
poll_interval_ms = 16
backend = "cdev"
    "#;

    const CONFIG_ENCODER_ONLY: &str = r#"
poll_interval_ms = 16

[encoder]
pin_a = 17
pin_b = 27
"#;

    const CONFIG_MATRIX_ONLY: &str = r#"
poll_interval_ms = 16

[matrix]
rows = [5]
cols = [6]
    "#;
}
