//! Per-channel state, sized once at construction.

use crate::config::EngineConfig;
use crate::edge::EdgeDetector;
use crate::invariant_ppt::{assert_invariant, CHANNELS_FIXED};
use crate::pulse::PulseGenerator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Channel {
    pub detector: EdgeDetector,
    pub generator: PulseGenerator,
}

impl Channel {
    /// Allocate the channel array for `config`.
    pub fn array(config: &EngineConfig) -> Vec<Channel> {
        let channels = vec![Channel::default(); config.channels];
        assert_invariant(
            CHANNELS_FIXED,
            channels.len() == config.channels && channels.len() <= 32,
            "channel count matches configuration and fits a bitmap",
            Some("Channel::array"),
        );
        channels
    }
}
