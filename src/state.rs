//! State shared between the tick path and both host views.
//!
//! Only `Engine::tick` advances it; the host views mutate it through their
//! accessor methods, each of which is a single-tick effect.

use crate::config::EngineConfig;
use crate::counter::CycleCounter;
use crate::events::EventSet;
use crate::fifo::Fifo;
use crate::invariant_ppt::{assert_invariant, QUEUE_CAPACITY_FIXED, RESET_DEFAULTS};
use crate::record::{CaptureRecord, ScheduleRecord};

/// Control storage registers. All clear at reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub arm: bool,
    pub force: bool,
    pub flush_capture: bool,
    pub flush_schedule: bool,
    pub rising_enable: u32,
    pub falling_enable: u32,
    pub output_enable: u32,
    /// Schedule input time word.
    pub schedule_time: u32,
    /// Schedule input level bitmap.
    pub schedule_data: u32,
}

impl Controls {
    /// `running = (arm AND trigger) OR force`.
    pub fn running(&self, trigger: bool) -> bool {
        (self.arm && trigger) || self.force
    }
}

#[derive(Debug)]
pub struct SharedState {
    pub counter: CycleCounter,
    pub capture: Fifo<CaptureRecord>,
    pub schedule: Fifo<ScheduleRecord>,
    pub controls: Controls,
    /// Remembered level of every channel.
    pub levels: u32,
    pub events: EventSet,
    /// Running state of the previous tick.
    pub running: bool,
}

impl SharedState {
    pub fn new(config: &EngineConfig) -> Self {
        let state = Self {
            counter: CycleCounter::new(config.cycle_width()),
            capture: Fifo::new(config.capture_depth),
            schedule: Fifo::new(config.schedule_depth),
            controls: Controls::default(),
            levels: 0,
            events: EventSet::default(),
            running: false,
        };
        assert_invariant(
            QUEUE_CAPACITY_FIXED,
            state.capture.depth() == config.capture_depth
                && state.schedule.depth() == config.schedule_depth,
            "queue depths match configuration",
            Some("SharedState::new"),
        );
        state
    }

    /// Return to reset values without reallocating the queues.
    pub fn reset(&mut self) {
        self.counter.reset();
        self.capture.clear();
        self.schedule.clear();
        self.controls = Controls::default();
        self.levels = 0;
        self.events = EventSet::default();
        self.running = false;
        assert_invariant(
            RESET_DEFAULTS,
            self.counter.value() == 0 && self.capture.is_empty() && self.schedule.is_empty(),
            "reset leaves counter at zero and both queues empty",
            Some("SharedState::reset"),
        );
    }
}
