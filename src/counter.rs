//! Global cycle counter.

use crate::config::width_mask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleCounter {
    value: u32,
    width: u32,
}

impl CycleCounter {
    pub fn new(width: u32) -> Self {
        Self { value: 0, width }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Largest representable value, 2^width - 1.
    pub fn max(&self) -> u32 {
        width_mask(self.width)
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Clock once. `zero` wins over `running`. Returns `true` on the tick the
    /// counter wraps from its maximum to zero.
    pub fn advance(&mut self, running: bool, zero: bool) -> bool {
        if zero {
            self.value = 0;
            return false;
        }
        if !running {
            return false;
        }
        let wrapped = self.value == self.max();
        self.value = if wrapped { 0 } else { self.value + 1 };
        wrapped
    }
}
