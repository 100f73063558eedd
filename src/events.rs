//! Event/condition set exposed to an external interrupt controller.
//!
//! Each event has a status bit (the live condition), a pending bit and an
//! enable bit. How pending follows status depends on the event's kind:
//!
//! - [`EventKind::Level`]: pending mirrors status and cannot be cleared.
//! - [`EventKind::Process`]: pending latches on the tick status becomes true
//!   and holds until the host clears it.
//! - [`EventKind::Pulse`]: pending latches on every tick status is asserted.

/// Trigger semantics of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Level,
    Process,
    Pulse,
}

/// The engine's events, in register bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Event {
    /// Capture queue is non-empty.
    CaptureReadable = 0,
    /// Schedule queue has room.
    ScheduleWritable = 1,
    /// An edge was dropped against a full capture queue.
    CaptureOverflow = 2,
    /// Running with nothing left to schedule.
    ScheduleUnderflow = 3,
    Started = 4,
    Stopped = 5,
    /// Cycle counter wrapped.
    Wrap = 6,
}

impl Event {
    pub const ALL: [Event; 7] = [
        Event::CaptureReadable,
        Event::ScheduleWritable,
        Event::CaptureOverflow,
        Event::ScheduleUnderflow,
        Event::Started,
        Event::Stopped,
        Event::Wrap,
    ];

    pub const fn bit(self) -> u32 {
        1 << self as u32
    }

    pub const fn kind(self) -> EventKind {
        match self {
            Event::CaptureReadable | Event::ScheduleWritable => EventKind::Level,
            Event::Wrap => EventKind::Pulse,
            _ => EventKind::Process,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Event::CaptureReadable => "capture_readable",
            Event::ScheduleWritable => "schedule_writable",
            Event::CaptureOverflow => "capture_overflow",
            Event::ScheduleUnderflow => "schedule_underflow",
            Event::Started => "started",
            Event::Stopped => "stopped",
            Event::Wrap => "wrap",
        }
    }
}

/// Bits of all events.
pub const EVENT_MASK: u32 = (1 << Event::ALL.len()) - 1;

const LEVEL_MASK: u32 = Event::CaptureReadable.bit() | Event::ScheduleWritable.bit();

/// Live conditions sampled at the end of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conditions {
    pub capture_readable: bool,
    pub schedule_writable: bool,
    pub capture_dropped: bool,
    pub schedule_empty: bool,
    pub running: bool,
    pub wrapped: bool,
}

impl Conditions {
    /// Status word for these conditions.
    pub fn status(&self) -> u32 {
        let mut status = 0;
        let mut set = |event: Event, on: bool| {
            if on {
                status |= event.bit();
            }
        };
        set(Event::CaptureReadable, self.capture_readable);
        set(Event::ScheduleWritable, self.schedule_writable);
        set(Event::CaptureOverflow, self.capture_dropped);
        set(Event::ScheduleUnderflow, self.running && self.schedule_empty);
        set(Event::Started, self.running);
        set(Event::Stopped, !self.running);
        set(Event::Wrap, self.wrapped);
        status
    }

    /// Conditions of a freshly reset engine.
    pub fn at_reset() -> Self {
        Self {
            schedule_writable: true,
            schedule_empty: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSet {
    status: u32,
    latched: u32,
    enable: u32,
}

impl Default for EventSet {
    fn default() -> Self {
        Self {
            status: Conditions::at_reset().status(),
            latched: 0,
            enable: 0,
        }
    }
}

impl EventSet {
    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn pending(&self) -> u32 {
        (self.latched & !LEVEL_MASK) | (self.status & LEVEL_MASK)
    }

    pub fn enable(&self) -> u32 {
        self.enable
    }

    pub fn set_enable(&mut self, mask: u32) {
        self.enable = mask & EVENT_MASK;
    }

    /// Write-one-to-clear on the pending register. Level events are ignored.
    pub fn clear(&mut self, mask: u32) {
        self.latched &= !(mask & !LEVEL_MASK);
    }

    pub fn is_pending(&self, event: Event) -> bool {
        self.pending() & event.bit() != 0
    }

    /// Interrupt line.
    pub fn irq(&self) -> bool {
        self.pending() & self.enable != 0
    }

    /// Clock once with this tick's conditions.
    pub fn update(&mut self, conditions: Conditions) {
        let status = conditions.status();
        for event in Event::ALL {
            let bit = event.bit();
            let now = status & bit != 0;
            let before = self.status & bit != 0;
            let latch = match event.kind() {
                EventKind::Level => false,
                EventKind::Process => now && !before,
                EventKind::Pulse => now,
            };
            if latch {
                self.latched |= bit;
            }
        }
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_state() {
        let ev = EventSet::default();
        assert_eq!(
            ev.status(),
            Event::ScheduleWritable.bit() | Event::Stopped.bit()
        );
        assert_eq!(ev.pending(), Event::ScheduleWritable.bit());
        assert!(!ev.irq());
    }

    #[test]
    fn process_latches_on_rising_condition_only() {
        let mut ev = EventSet::default();
        let running = Conditions {
            running: true,
            ..Conditions::at_reset()
        };
        ev.update(running);
        assert!(ev.is_pending(Event::Started));
        assert!(ev.is_pending(Event::ScheduleUnderflow));
        ev.clear(Event::Started.bit());
        ev.update(running);
        assert!(!ev.is_pending(Event::Started));

        ev.update(Conditions::at_reset());
        assert!(ev.is_pending(Event::Stopped));
    }

    #[test]
    fn pulse_latches_each_assertion() {
        let mut ev = EventSet::default();
        let wrap = Conditions {
            wrapped: true,
            ..Conditions::at_reset()
        };
        ev.update(wrap);
        ev.clear(Event::Wrap.bit());
        ev.update(wrap);
        assert!(ev.is_pending(Event::Wrap));
        ev.update(Conditions::at_reset());
        assert_eq!(ev.status() & Event::Wrap.bit(), 0);
        assert!(ev.is_pending(Event::Wrap));
    }

    #[test]
    fn level_cannot_be_cleared() {
        let mut ev = EventSet::default();
        ev.update(Conditions {
            capture_readable: true,
            ..Conditions::at_reset()
        });
        ev.clear(EVENT_MASK);
        assert!(ev.is_pending(Event::CaptureReadable));
    }

    #[test]
    fn irq_follows_enable() {
        let mut ev = EventSet::default();
        ev.set_enable(Event::CaptureOverflow.bit());
        ev.update(Conditions {
            capture_dropped: true,
            ..Conditions::at_reset()
        });
        assert!(ev.irq());
        ev.clear(Event::CaptureOverflow.bit());
        assert!(!ev.irq());
    }
}
