//! Builder API for engines.

use crate::config::{EngineConfig, Resolution};
use crate::engine::{Engine, EngineError};
use crate::harness::Harness;
use rtrb::Consumer;

/// Fluent engine construction over [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one loaded from TOML.
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn channels(mut self, channels: usize) -> Self {
        self.config.channels = channels;
        self
    }

    pub fn capture_depth(mut self, depth: usize) -> Self {
        self.config.capture_depth = depth;
        self
    }

    pub fn schedule_depth(mut self, depth: usize) -> Self {
        self.config.schedule_depth = depth;
        self
    }

    /// Set both queue depths.
    pub fn depth(self, depth: usize) -> Self {
        self.capture_depth(depth).schedule_depth(depth)
    }

    pub fn timestamp_width(mut self, width: u32) -> Self {
        self.config.timestamp_width = width;
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.config.resolution = resolution;
        self
    }

    pub fn fast_bus(mut self, enabled: bool) -> Self {
        self.config.fast_bus = enabled;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and build.
    pub fn build(self) -> Result<Engine, EngineError> {
        Engine::new(self.config)
    }

    /// Build with a tick-fact queue attached.
    pub fn build_with_signals(self) -> Result<(Engine, Consumer<u8>), EngineError> {
        Engine::new_with_signals(self.config)
    }

    /// Build and wrap in a test bench.
    pub fn build_harness(self) -> Result<Harness, EngineError> {
        Ok(Harness::new(self.build()?))
    }
}
