//! Fast bus view of the host interface.
//!
//! One request may be outstanding. The tick after submission decodes it over
//! `addr & 0xff`, samples read data from pre-tick state and raises the
//! acknowledgement for exactly one tick. A request submitted while the
//! acknowledgement is still visible waits one extra tick. Writes to the
//! "next" addresses pop or push on the following tick.

use crate::config::width_mask;
use crate::host::QueueAccess;
use crate::state::SharedState;
use thiserror::Error;

/// Decoded fast bus registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusRegister {
    Cycle,
    CaptureTime,
    CaptureData,
    CaptureNext,
    ScheduleTime,
    ScheduleData,
    ScheduleNext,
}

impl BusRegister {
    pub const ALL: [BusRegister; 7] = [
        BusRegister::Cycle,
        BusRegister::CaptureTime,
        BusRegister::CaptureData,
        BusRegister::CaptureNext,
        BusRegister::ScheduleTime,
        BusRegister::ScheduleData,
        BusRegister::ScheduleNext,
    ];

    pub const fn address(self) -> u32 {
        match self {
            BusRegister::Cycle => 0x00,
            BusRegister::CaptureTime => 0x10,
            BusRegister::CaptureData => 0x11,
            BusRegister::CaptureNext => 0x12,
            BusRegister::ScheduleTime => 0x20,
            BusRegister::ScheduleData => 0x21,
            BusRegister::ScheduleNext => 0x22,
        }
    }

    /// Decode the low address byte; upper bits are ignored.
    pub const fn decode(addr: u32) -> Option<Self> {
        match addr & 0xff {
            0x00 => Some(BusRegister::Cycle),
            0x10 => Some(BusRegister::CaptureTime),
            0x11 => Some(BusRegister::CaptureData),
            0x12 => Some(BusRegister::CaptureNext),
            0x20 => Some(BusRegister::ScheduleTime),
            0x21 => Some(BusRegister::ScheduleData),
            0x22 => Some(BusRegister::ScheduleNext),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusRequest {
    pub addr: u32,
    pub write: bool,
    pub data: u32,
}

impl BusRequest {
    pub const fn read(reg: BusRegister) -> Self {
        Self {
            addr: reg.address(),
            write: false,
            data: 0,
        }
    }

    pub const fn write(reg: BusRegister, data: u32) -> Self {
        Self {
            addr: reg.address(),
            write: true,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("a fast bus request is already outstanding")]
    Busy,
    #[error("fast bus is disabled in this configuration")]
    Disabled,
}

/// Queue strobes registered by an acknowledged write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStrobes {
    pub capture_next: bool,
    pub schedule_next: bool,
}

#[derive(Debug, Clone)]
pub struct FastBus {
    enabled: bool,
    timestamp_width: u32,
    channel_mask: u32,
    request: Option<BusRequest>,
    ack: bool,
    dat_r: u32,
    next: BusStrobes,
}

impl FastBus {
    pub fn new(enabled: bool, timestamp_width: u32, channel_mask: u32) -> Self {
        Self {
            enabled,
            timestamp_width,
            channel_mask,
            request: None,
            ack: false,
            dat_r: 0,
            next: BusStrobes::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn reset(&mut self) {
        self.request = None;
        self.ack = false;
        self.dat_r = 0;
        self.next = BusStrobes::default();
    }

    /// Present a request to be served on a later tick.
    pub fn submit(&mut self, request: BusRequest) -> Result<(), BusError> {
        if !self.enabled {
            return Err(BusError::Disabled);
        }
        if self.request.is_some() {
            return Err(BusError::Busy);
        }
        self.request = Some(request);
        Ok(())
    }

    /// A request is waiting for its acknowledgement.
    pub fn busy(&self) -> bool {
        self.request.is_some()
    }

    /// Read data of the request acknowledged on the last tick.
    pub fn response(&self) -> Option<u32> {
        self.ack.then_some(self.dat_r)
    }

    /// Strobes registered on the previous tick, consumed by this one.
    pub(crate) fn take_strobes(&mut self) -> BusStrobes {
        std::mem::take(&mut self.next)
    }

    /// Serve at most one request and report which queue-facing registers it
    /// touched.
    pub(crate) fn clock(&mut self, state: &mut SharedState) -> QueueAccess {
        let acked = self.ack;
        self.ack = false;
        self.dat_r = 0;
        let mut access = QueueAccess::default();
        if acked {
            return access;
        }
        let Some(request) = self.request.take() else {
            return access;
        };
        self.ack = true;

        let reg = BusRegister::decode(request.addr);
        let c = &mut state.controls;
        self.dat_r = match reg {
            Some(BusRegister::Cycle) => state.counter.value(),
            Some(BusRegister::CaptureTime) => {
                access.capture_head = true;
                state
                    .capture
                    .head()
                    .map_or(0, |r| r.time.to_word(self.timestamp_width))
            }
            Some(BusRegister::CaptureData) => {
                access.capture_head = true;
                state.capture.head().map_or(0, |r| r.levels)
            }
            Some(BusRegister::ScheduleTime) => c.schedule_time,
            Some(BusRegister::ScheduleData) => c.schedule_data,
            Some(BusRegister::CaptureNext | BusRegister::ScheduleNext) | None => 0,
        };
        if !request.write {
            return access;
        }
        match reg {
            Some(BusRegister::CaptureNext) => self.next.capture_next = true,
            Some(BusRegister::ScheduleNext) => self.next.schedule_next = true,
            Some(BusRegister::ScheduleTime) => {
                c.schedule_time = request.data & width_mask(self.timestamp_width);
                access.schedule_input = true;
            }
            Some(BusRegister::ScheduleData) => {
                c.schedule_data = request.data & self.channel_mask;
                access.schedule_input = true;
            }
            _ => {}
        }
        access
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn setup() -> (FastBus, SharedState) {
        let config = EngineConfig::default();
        (
            FastBus::new(true, config.timestamp_width, config.channel_mask()),
            SharedState::new(&config),
        )
    }

    #[test]
    fn decode_ignores_high_bits() {
        for reg in BusRegister::ALL {
            assert_eq!(BusRegister::decode(reg.address() | 0x300), Some(reg));
        }
        assert_eq!(BusRegister::decode(0x13), None);
    }

    #[test]
    fn ack_lasts_one_tick() {
        let (mut bus, mut state) = setup();
        bus.submit(BusRequest::write(BusRegister::ScheduleTime, 0x40))
            .unwrap();
        assert_eq!(bus.response(), None);
        assert!(bus.clock(&mut state).schedule_input);
        assert_eq!(bus.response(), Some(0));
        assert_eq!(state.controls.schedule_time, 0x40);
        bus.clock(&mut state);
        assert_eq!(bus.response(), None);
    }

    #[test]
    fn back_to_back_waits_a_tick() {
        let (mut bus, mut state) = setup();
        bus.submit(BusRequest::read(BusRegister::Cycle)).unwrap();
        assert_eq!(
            bus.submit(BusRequest::read(BusRegister::Cycle)),
            Err(BusError::Busy)
        );
        bus.clock(&mut state);
        bus.submit(BusRequest::read(BusRegister::ScheduleData))
            .unwrap();
        bus.clock(&mut state);
        assert_eq!(bus.response(), None);
        bus.clock(&mut state);
        assert_eq!(bus.response(), Some(0));
    }

    #[test]
    fn next_strobes_register_for_following_tick() {
        let (mut bus, mut state) = setup();
        bus.submit(BusRequest::write(BusRegister::CaptureNext, 1))
            .unwrap();
        assert_eq!(bus.take_strobes(), BusStrobes::default());
        bus.clock(&mut state);
        assert!(bus.take_strobes().capture_next);
    }

    #[test]
    fn capture_head_reads_are_reported() {
        let (mut bus, mut state) = setup();
        bus.submit(BusRequest::read(BusRegister::CaptureTime)).unwrap();
        let access = bus.clock(&mut state);
        assert!(access.capture_head);
        assert!(!access.schedule_input);
        bus.clock(&mut state);
        bus.submit(BusRequest::read(BusRegister::ScheduleTime)).unwrap();
        assert_eq!(bus.clock(&mut state), QueueAccess::default());
    }

    #[test]
    fn unmapped_is_acknowledged() {
        let (mut bus, mut state) = setup();
        bus.submit(BusRequest {
            addr: 0x55,
            write: true,
            data: 7,
        })
        .unwrap();
        assert_eq!(bus.clock(&mut state), QueueAccess::default());
        assert_eq!(bus.response(), Some(0));
    }

    #[test]
    fn disabled_rejects() {
        let mut bus = FastBus::new(false, 32, 0xf);
        assert_eq!(
            bus.submit(BusRequest::read(BusRegister::Cycle)),
            Err(BusError::Disabled)
        );
    }
}
