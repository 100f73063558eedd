//! Engine configuration: channel count, queue depths, timestamp width and
//! resolution variant. Fixed for the lifetime of an engine.
//!
//! Configuration can be built in code, through [`crate::builder::EngineBuilder`],
//! or loaded from TOML:
//!
//! ```toml
//! channels = 4
//! capture_depth = 128
//! schedule_depth = 128
//! timestamp_width = 32
//! resolution = "high"
//! fast_bus = true
//! ```

#![forbid(unsafe_code)]

use crate::invariant_ppt::{assert_invariant, CONFIG_LEGALITY, CONFIG_REJECTS_INVALID};
use crate::record::SUBCYCLE_BITS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Largest channel count; per-channel registers are one 32-bit word.
pub const MAX_CHANNELS: usize = 32;

/// Narrowest timestamp word that still leaves a one-bit cycle field.
pub const MIN_TIMESTAMP_WIDTH: u32 = SUBCYCLE_BITS + 1;

/// Widest timestamp word.
pub const MAX_TIMESTAMP_WIDTH: u32 = 32;

/// Sampling variant of the detectors and schedulers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// One sample per tick; sub-cycle always 0.
    Low,
    /// Eight phase samples per tick.
    #[default]
    High,
}

impl Resolution {
    /// Number of phase samples per tick.
    pub const fn oversampling(self) -> usize {
        match self {
            Resolution::Low => 1,
            Resolution::High => 8,
        }
    }

    /// Bits of a sample vector that carry samples.
    pub const fn sample_mask(self) -> u8 {
        match self {
            Resolution::Low => 0x01,
            Resolution::High => 0xff,
        }
    }

    /// Index of the latest phase in a tick.
    pub const fn last_phase(self) -> u8 {
        (self.oversampling() - 1) as u8
    }
}

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("channel count {0} outside 1..=32")]
    Channels(usize),
    #[error("{queue} queue depth must be at least 1")]
    Depth { queue: &'static str },
    #[error("timestamp width {0} outside 4..=32")]
    TimestampWidth(u32),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Construction-time parameters of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of lines, each with one detector and one scheduler.
    pub channels: usize,
    /// Capture queue capacity.
    pub capture_depth: usize,
    /// Schedule queue capacity.
    pub schedule_depth: usize,
    /// Width of a timestamp word; the cycle counter is 3 bits narrower.
    pub timestamp_width: u32,
    pub resolution: Resolution,
    /// Whether the fast addressable bus view is present.
    pub fast_bus: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channels: 4,
            capture_depth: 128,
            schedule_depth: 128,
            timestamp_width: 32,
            resolution: Resolution::High,
            fast_bus: true,
        }
    }
}

impl EngineConfig {
    /// Width of the cycle counter.
    pub fn cycle_width(&self) -> u32 {
        self.timestamp_width - SUBCYCLE_BITS
    }

    /// Mask of the per-channel bitmap registers.
    pub fn channel_mask(&self) -> u32 {
        width_mask(self.channels as u32)
    }

    /// Check the configuration against the engine's structural limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let result = if self.channels == 0 || self.channels > MAX_CHANNELS {
            Err(ConfigError::Channels(self.channels))
        } else if self.capture_depth == 0 {
            Err(ConfigError::Depth { queue: "capture" })
        } else if self.schedule_depth == 0 {
            Err(ConfigError::Depth { queue: "schedule" })
        } else if !(MIN_TIMESTAMP_WIDTH..=MAX_TIMESTAMP_WIDTH).contains(&self.timestamp_width) {
            Err(ConfigError::TimestampWidth(self.timestamp_width))
        } else {
            Ok(())
        };

        match &result {
            Ok(()) => assert_invariant(
                CONFIG_LEGALITY,
                self.cycle_width() >= 1 && self.channels <= MAX_CHANNELS,
                "validated configuration leaves a cycle field and fits the bitmap registers",
                Some("validate"),
            ),
            Err(_) => assert_invariant(
                CONFIG_REJECTS_INVALID,
                true,
                "illegal configuration rejected",
                Some("validate"),
            ),
        }
        result
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

/// Mask with the low `width` bits set.
pub(crate) const fn width_mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}
