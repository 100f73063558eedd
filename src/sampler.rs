//! Oversampling plumbing between the fast phase clock and the system tick.
//!
//! [`LineSampler`] deserializes phase samples of an input line into one
//! [`SampleVector`] per tick; [`LineSerializer`] does the reverse for an output
//! line. Both transfer their parallel word on the serdes strobe, which the
//! clock subsystem delivers once per tick.

use crate::config::Resolution;

/// Per-tick phase samples of one line. Bit k is phase k; phase 0 is earliest.
/// Low resolution uses bit 0 only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SampleVector(pub u8);

impl SampleVector {
    /// All phases at `level`.
    pub const fn replicate(resolution: Resolution, level: bool) -> Self {
        if level {
            Self(resolution.sample_mask())
        } else {
            Self(0)
        }
    }

    pub const fn phase(self, k: u8) -> bool {
        self.0 >> k & 1 != 0
    }

    /// Level at the end of the tick.
    pub const fn last(self, resolution: Resolution) -> bool {
        self.phase(resolution.last_phase())
    }
}

/// Input deserializer for one line.
#[derive(Debug, Clone)]
pub struct LineSampler {
    resolution: Resolution,
    shift: u8,
    filled: u8,
    parallel: SampleVector,
}

impl LineSampler {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            shift: 0,
            filled: 0,
            parallel: SampleVector::default(),
        }
    }

    /// Shift in the next phase sample (fast clock domain).
    pub fn clock_in(&mut self, level: bool) {
        let n = self.resolution.oversampling() as u8;
        if self.filled < n {
            self.shift |= u8::from(level) << self.filled;
            self.filled += 1;
        }
    }

    /// Serdes strobe: publish the collected phases as this tick's vector.
    ///
    /// Phases that were not clocked in repeat the last sample taken.
    pub fn strobe(&mut self) -> SampleVector {
        let n = self.resolution.oversampling() as u8;
        if self.filled > 0 {
            let last = self.shift >> (self.filled - 1) & 1 != 0;
            for k in self.filled..n {
                self.shift |= u8::from(last) << k;
            }
            self.parallel = SampleVector(self.shift & self.resolution.sample_mask());
        }
        self.shift = 0;
        self.filled = 0;
        self.parallel
    }

    /// Vector published by the most recent strobe.
    pub fn parallel(&self) -> SampleVector {
        self.parallel
    }
}

/// Output serializer for one line.
#[derive(Debug, Clone)]
pub struct LineSerializer {
    resolution: Resolution,
    word: SampleVector,
    next: u8,
}

impl LineSerializer {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            word: SampleVector::default(),
            next: 0,
        }
    }

    /// Serdes strobe: load the vector to shift out during the next tick.
    pub fn strobe(&mut self, word: SampleVector) {
        self.word = word;
        self.next = 0;
    }

    /// Shift out the next phase sample. Holds the last phase once exhausted.
    pub fn clock_out(&mut self) -> bool {
        let last = self.resolution.last_phase();
        let k = self.next.min(last);
        if self.next <= last {
            self.next += 1;
        }
        self.word.phase(k)
    }
}
