//! Register-bank view of the host interface.
//!
//! Status registers read live state, storage registers take effect
//! immediately, and strobe registers post a pulse that the next tick consumes.
//! The fast bus view (`crate::bus`) acts on the same [`SharedState`]; nothing
//! here arbitrates between the two.

use crate::config::{width_mask, EngineConfig};
use crate::regmap::{Csr, RegisterError, RegisterMap};
use crate::state::SharedState;
use std::cell::Cell;

/// One-shot pulses waiting for the next tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Strobes {
    pub zero: bool,
    pub capture_next: bool,
    pub schedule_next: bool,
}

/// Queue-facing accesses one view made within a tick window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueAccess {
    /// Schedule time or data storage was written.
    pub schedule_input: bool,
    /// Capture head time or data was read.
    pub capture_head: bool,
}

#[derive(Debug, Clone)]
pub struct RegisterBank {
    map: RegisterMap,
    timestamp_width: u32,
    pending: Strobes,
    schedule_input_written: bool,
    capture_head_read: Cell<bool>,
}

impl RegisterBank {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            map: RegisterMap::build(config),
            timestamp_width: config.timestamp_width,
            pending: Strobes::default(),
            schedule_input_written: false,
            capture_head_read: Cell::new(false),
        }
    }

    pub fn map(&self) -> &RegisterMap {
        &self.map
    }

    pub fn reset(&mut self) {
        self.pending = Strobes::default();
        self.schedule_input_written = false;
        self.capture_head_read.set(false);
    }

    pub fn read(&self, state: &SharedState, csr: Csr) -> u32 {
        let c = &state.controls;
        let value = match csr {
            Csr::Cycle => state.counter.value(),
            Csr::Arm => u32::from(c.arm),
            Csr::Force => u32::from(c.force),
            Csr::FlushCapture => u32::from(c.flush_capture),
            Csr::FlushSchedule => u32::from(c.flush_schedule),
            Csr::Level => state.levels,
            Csr::RisingEnable => c.rising_enable,
            Csr::FallingEnable => c.falling_enable,
            Csr::OutputEnable => c.output_enable,
            Csr::CaptureTime => {
                self.capture_head_read.set(true);
                state
                    .capture
                    .head()
                    .map_or(0, |r| r.time.to_word(self.timestamp_width))
            }
            Csr::CaptureData => {
                self.capture_head_read.set(true);
                state.capture.head().map_or(0, |r| r.levels)
            }
            Csr::ScheduleTime => c.schedule_time,
            Csr::ScheduleData => c.schedule_data,
            Csr::EventStatus => state.events.status(),
            Csr::EventPending => state.events.pending(),
            Csr::EventEnable => state.events.enable(),
            Csr::Zero | Csr::CaptureNext | Csr::ScheduleNext => 0,
        };
        value & self.map.field(csr).mask()
    }

    pub fn write(
        &mut self,
        state: &mut SharedState,
        csr: Csr,
        value: u32,
    ) -> Result<(), RegisterError> {
        let value = value & width_mask(self.map.field(csr).width);
        let bit = value & 1 != 0;
        let c = &mut state.controls;
        match csr {
            Csr::Zero => self.pending.zero = true,
            Csr::CaptureNext => self.pending.capture_next = true,
            Csr::ScheduleNext => self.pending.schedule_next = true,
            Csr::Arm => c.arm = bit,
            Csr::Force => c.force = bit,
            Csr::FlushCapture => c.flush_capture = bit,
            Csr::FlushSchedule => c.flush_schedule = bit,
            Csr::RisingEnable => c.rising_enable = value,
            Csr::FallingEnable => c.falling_enable = value,
            Csr::OutputEnable => c.output_enable = value,
            Csr::ScheduleTime => {
                c.schedule_time = value;
                self.schedule_input_written = true;
            }
            Csr::ScheduleData => {
                c.schedule_data = value;
                self.schedule_input_written = true;
            }
            Csr::EventPending => state.events.clear(value),
            Csr::EventEnable => state.events.set_enable(value),
            Csr::Cycle
            | Csr::Level
            | Csr::CaptureTime
            | Csr::CaptureData
            | Csr::EventStatus => return Err(RegisterError::ReadOnly(csr.name())),
        }
        Ok(())
    }

    pub fn read_at(&self, state: &SharedState, offset: u16) -> Result<u32, RegisterError> {
        let csr = self.map.lookup(offset)?.csr;
        Ok(self.read(state, csr))
    }

    pub fn write_at(
        &mut self,
        state: &mut SharedState,
        offset: u16,
        value: u32,
    ) -> Result<(), RegisterError> {
        let csr = self.map.lookup(offset)?.csr;
        self.write(state, csr, value)
    }

    /// Hand the posted strobes to the tick and clear them.
    pub(crate) fn take_strobes(&mut self) -> Strobes {
        std::mem::take(&mut self.pending)
    }

    /// Queue-facing accesses since the last tick, cleared on the way out.
    pub(crate) fn take_access(&mut self) -> QueueAccess {
        QueueAccess {
            schedule_input: std::mem::take(&mut self.schedule_input_written),
            capture_head: self.capture_head_read.take(),
        }
    }
}
