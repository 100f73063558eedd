//! Per-channel pulse scheduler.

use crate::config::Resolution;
use crate::sampler::SampleVector;

/// Mask for sub-cycle k: phases k..7 set.
pub const EDGE_MASKS: [u8; 8] = [0xff, 0xfe, 0xfc, 0xf8, 0xf0, 0xe0, 0xc0, 0x80];

/// A fire command for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseCommand {
    pub level: bool,
    pub subcycle: u8,
}

/// Output vector register of one line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PulseGenerator {
    samples: SampleVector,
}

impl PulseGenerator {
    pub fn samples(&self) -> SampleVector {
        self.samples
    }

    /// Level the line rests at after the current tick.
    pub fn steady_level(&self, resolution: Resolution) -> bool {
        self.samples.last(resolution)
    }

    /// Clock the generator once, optionally firing a command.
    pub fn update(&mut self, resolution: Resolution, fire: Option<PulseCommand>) {
        match resolution {
            Resolution::Low => {
                if let Some(cmd) = fire {
                    self.samples = SampleVector(u8::from(cmd.level));
                }
            }
            Resolution::High => {
                let level = self.steady_level(resolution);
                let mut next = SampleVector::replicate(resolution, level).0;
                if let Some(cmd) = fire {
                    if cmd.level != level {
                        next ^= EDGE_MASKS[usize::from(cmd.subcycle & 7)];
                    }
                }
                self.samples = SampleVector(next);
            }
        }
    }
}

/// What one channel presents to its pad this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineOutput {
    pub samples: SampleVector,
    /// Tri-state control: `true` means the line is not driven.
    pub tristate: bool,
}

impl LineOutput {
    /// Samples if the line is driven.
    pub fn driven(&self) -> Option<SampleVector> {
        (!self.tristate).then_some(self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_res_edge_lands_on_phase() {
        let mut g = PulseGenerator::default();
        g.update(
            Resolution::High,
            Some(PulseCommand {
                level: true,
                subcycle: 3,
            }),
        );
        assert_eq!(g.samples(), SampleVector(0b1111_1000));
        g.update(Resolution::High, None);
        assert_eq!(g.samples(), SampleVector(0xff));
    }

    #[test]
    fn high_res_same_level_is_noop() {
        let mut g = PulseGenerator::default();
        g.update(
            Resolution::High,
            Some(PulseCommand {
                level: false,
                subcycle: 1,
            }),
        );
        assert_eq!(g.samples(), SampleVector(0));
    }

    #[test]
    fn high_res_back_to_back_fires_use_steady_level() {
        let mut g = PulseGenerator::default();
        g.update(
            Resolution::High,
            Some(PulseCommand {
                level: true,
                subcycle: 3,
            }),
        );
        g.update(
            Resolution::High,
            Some(PulseCommand {
                level: false,
                subcycle: 5,
            }),
        );
        assert_eq!(g.samples(), SampleVector(0b0001_1111));
    }

    #[test]
    fn low_res_latches_level() {
        let mut g = PulseGenerator::default();
        g.update(
            Resolution::Low,
            Some(PulseCommand {
                level: true,
                subcycle: 6,
            }),
        );
        assert_eq!(g.samples(), SampleVector(1));
        assert!(g.steady_level(Resolution::Low));
    }

    #[test]
    fn tristate_hides_samples() {
        let out = LineOutput {
            samples: SampleVector(0xff),
            tristate: true,
        };
        assert_eq!(out.driven(), None);
    }
}
