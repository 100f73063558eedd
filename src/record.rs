//! Timestamps and the records carried by the capture and schedule queues.

use crate::config::width_mask;

/// Bits of a timestamp word holding the sub-cycle phase.
pub const SUBCYCLE_BITS: u32 = 3;

const SUBCYCLE_MASK: u32 = (1 << SUBCYCLE_BITS) - 1;

/// A (cycle, sub-cycle) instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub cycle: u32,
    /// Phase within the tick, 0 = earliest. Always 0 in low resolution.
    pub subcycle: u8,
}

impl Timestamp {
    pub const fn new(cycle: u32, subcycle: u8) -> Self {
        Self { cycle, subcycle }
    }

    /// Register encoding: `cycle << 3 | subcycle`, truncated to `width` bits.
    pub fn to_word(self, width: u32) -> u32 {
        let word = (self.cycle << SUBCYCLE_BITS) | (u32::from(self.subcycle) & SUBCYCLE_MASK);
        word & width_mask(width)
    }

    /// Inverse of [`Timestamp::to_word`].
    pub fn from_word(word: u32, width: u32) -> Self {
        let word = word & width_mask(width);
        Self {
            cycle: word >> SUBCYCLE_BITS,
            subcycle: (word & SUBCYCLE_MASK) as u8,
        }
    }
}

/// One timestamped input edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureRecord {
    pub time: Timestamp,
    /// Remembered level of every channel after the capturing tick.
    pub levels: u32,
}

/// One commanded output transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub time: Timestamp,
    /// Target level of every channel.
    pub levels: u32,
}

impl ScheduleRecord {
    pub fn level(&self, channel: usize) -> bool {
        self.levels >> channel & 1 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_layout() {
        let t = Timestamp::new(0x115, 5);
        assert_eq!(t.to_word(32), 0x115 << 3 | 5);
        assert_eq!(Timestamp::from_word(0x8ad, 32), Timestamp::new(0x115, 5));
    }

    #[test]
    fn narrow_word_truncates_cycle() {
        // 8-bit word leaves a 5-bit cycle field.
        let t = Timestamp::new(0x21, 2);
        assert_eq!(Timestamp::from_word(t.to_word(8), 8), Timestamp::new(0x01, 2));
    }

    #[test]
    fn schedule_level_bits() {
        let r = ScheduleRecord {
            time: Timestamp::default(),
            levels: 0b0100,
        };
        assert!(r.level(2));
        assert!(!r.level(0));
    }
}
