//! Dryness threshold loading and range validation.
//!
//! The threshold is the only controller setting kept outside `config.toml`:
//! it is a single number in a text file, read once at startup. A value
//! outside [`MIN_THRESHOLD`]..=[`MAX_THRESHOLD`] (or one that does not parse)
//! leaves the controller unconfigured, which disables automatic watering for
//! the lifetime of the process. A threshold file that cannot be read at all
//! is kept apart as [`DrynessThreshold::Unreadable`]: automatic watering is
//! disabled the same way, but the cause is storage, not configuration.
//! Manual bypass is unaffected in every case.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::Path;

pub const MIN_THRESHOLD: i64 = 45;
pub const MAX_THRESHOLD: i64 = 95;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DrynessThreshold {
    /// Humidity percent at or below which the soil counts as dry.
    Configured { percent: u8 },
    /// Rejected input, kept verbatim for the startup log line.
    Unconfigured { raw: String },
    /// The threshold file could not be read.
    Unreadable { reason: String },
}

impl DrynessThreshold {
    /// Range-check an integer value.
    pub fn validate(value: i64) -> Self {
        if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&value) {
            Self::Configured {
                percent: value as u8,
            }
        } else {
            Self::Unconfigured {
                raw: value.to_string(),
            }
        }
    }

    /// Parse the text form (surrounding whitespace ignored).
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.parse::<i64>() {
            Ok(v) => Self::validate(v),
            Err(_) => Self::Unconfigured {
                raw: trimmed.to_string(),
            },
        }
    }

    /// Read and parse the threshold file. An I/O failure is returned as an
    /// error so the caller can raise a storage fault.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dryness threshold: {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    /// Like [`DrynessThreshold::load`], but a read failure becomes
    /// [`DrynessThreshold::Unreadable`] carrying the error chain.
    pub fn load_or_unreadable(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| Self::Unreadable {
            reason: format!("{e:#}"),
        })
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured { .. })
    }

    /// True iff configured and `humidity` is at or below the threshold.
    pub fn permits(&self, humidity: f32) -> bool {
        match self {
            Self::Configured { percent } => humidity <= f32::from(*percent),
            Self::Unconfigured { .. } | Self::Unreadable { .. } => false,
        }
    }
}

impl fmt::Display for DrynessThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured { percent } => write!(f, "{percent}%"),
            Self::Unconfigured { raw } => write!(f, "unconfigured ({raw:?})"),
            Self::Unreadable { .. } => write!(f, "unreadable"),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
