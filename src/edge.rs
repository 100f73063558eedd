//! Per-channel edge detector.

use crate::config::Resolution;
use crate::sampler::SampleVector;

/// Direction enables of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeEnables {
    pub rising: bool,
    pub falling: bool,
}

impl EdgeEnables {
    /// Whether a transition away from `level` would be reported.
    pub const fn active(self, level: bool) -> bool {
        (level && self.falling) || (!level && self.rising)
    }
}

/// Remembered level of one input line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeDetector {
    level: bool,
}

impl EdgeDetector {
    pub fn level(&self) -> bool {
        self.level
    }

    /// Consume one tick of samples. Returns the sub-cycle of a reported
    /// transition, or `None` if nothing qualifying happened.
    ///
    /// In high resolution the remembered level flips whenever any phase
    /// differs from it, whether or not the direction is enabled. At most one
    /// transition per tick is observed.
    pub fn update(
        &mut self,
        resolution: Resolution,
        samples: SampleVector,
        enables: EdgeEnables,
    ) -> Option<u8> {
        let active = enables.active(self.level);
        match resolution {
            Resolution::Low => {
                let sample = samples.phase(0);
                let detect = sample != self.level && active;
                self.level = sample;
                detect.then_some(0)
            }
            Resolution::High => {
                let changed = samples.0 ^ SampleVector::replicate(resolution, self.level).0;
                if changed == 0 {
                    return None;
                }
                self.level = !self.level;
                active.then_some(changed.trailing_zeros() as u8)
            }
        }
    }
}
