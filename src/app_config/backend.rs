use std::fmt;
use std::str::FromStr;

/// GPIO driver used for buttons and encoder lines
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Raspberry Pi GPIO block through rppal
    #[default]
    Rppal,
    /// Linux GPIO character device through gpio-cdev
    Cdev,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Rppal => write!(f, "rppal"),
            Backend::Cdev => write!(f, "cdev"),
        }
    }
}

impl FromStr for Backend {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rppal" => Ok(Backend::Rppal),
            "cdev" => Ok(Backend::Cdev),
            _ => Err("Unsupported GPIO backend"),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Backend {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Backend::from_str(&s).map_err(serde::de::Error::custom)
    }
}
