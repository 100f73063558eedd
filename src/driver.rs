//! Host driver: console-style operations over either host view.
//!
//! Every register access costs one tick of the harness. Queue registers go
//! through the selected [`HostPath`]; control and event registers always use
//! the register bank.

use crate::bus::{BusError, BusRegister, BusRequest};
use crate::config::width_mask;
use crate::engine::EngineError;
use crate::events::Event;
use crate::harness::Harness;
use crate::record::{CaptureRecord, Timestamp, SUBCYCLE_BITS};
use crate::regmap::{Csr, RegisterError};
use thiserror::Error;

/// Default poll budget, in ticks.
pub const DEFAULT_MAX_WAIT: u64 = 4096;

/// Ticks allowed for one fast bus acknowledgement.
const BUS_TIMEOUT: u64 = 4;

/// Timestamp word of the probe edge used by the loopback measurement.
const PROBE_WORD: u32 = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPath {
    RegisterBank,
    FastBus,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("schedule queue overrun after {written} records")]
    Overrun { written: usize },
    #[error("no response within {0} ticks")]
    Timeout(u64),
    #[error("no buffer up to {0} met the loopback deadline")]
    NoSafeBuffer(u32),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Snapshot printed by the console `status` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub events: u32,
    pub pending: u32,
    pub arm: bool,
    pub force: bool,
    pub flush_capture: bool,
    pub flush_schedule: bool,
    pub cycle: u32,
    pub output_enable: u32,
    pub rising_enable: u32,
    pub falling_enable: u32,
    pub levels: u32,
}

/// Result of a latency search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeBuffer {
    /// Smallest answer delay met, in timestamp units.
    pub buffer: u32,
    /// Measured edge-to-edge time at that buffer.
    pub latency: u32,
}

#[derive(Debug)]
pub struct HostDriver<'h> {
    harness: &'h mut Harness,
    path: HostPath,
    max_wait: u64,
}

impl<'h> HostDriver<'h> {
    pub fn new(harness: &'h mut Harness, path: HostPath) -> Self {
        Self {
            harness,
            path,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    /// Poll budget for waits, in ticks.
    pub fn max_wait(mut self, ticks: u64) -> Self {
        self.max_wait = ticks;
        self
    }

    pub fn harness(&self) -> &Harness {
        self.harness
    }

    fn timestamp_width(&self) -> u32 {
        self.harness.engine().config().timestamp_width
    }

    fn read(&mut self, csr: Csr) -> Result<u32, DriverError> {
        let value = self.harness.engine().csr_read(csr);
        self.harness.step()?;
        Ok(value)
    }

    fn write(&mut self, csr: Csr, value: u32) -> Result<(), DriverError> {
        self.harness.engine_mut().csr_write(csr, value)?;
        self.harness.step()?;
        Ok(())
    }

    fn bus(&mut self, request: BusRequest) -> Result<u32, DriverError> {
        self.harness.engine_mut().bus_submit(request)?;
        for _ in 0..BUS_TIMEOUT {
            self.harness.step()?;
            if let Some(data) = self.harness.engine().bus_response() {
                return Ok(data);
            }
        }
        Err(DriverError::Timeout(BUS_TIMEOUT))
    }

    fn queue_read(&mut self, csr: Csr, reg: BusRegister) -> Result<u32, DriverError> {
        match self.path {
            HostPath::RegisterBank => self.read(csr),
            HostPath::FastBus => self.bus(BusRequest::read(reg)),
        }
    }

    fn queue_write(&mut self, csr: Csr, reg: BusRegister, value: u32) -> Result<(), DriverError> {
        match self.path {
            HostPath::RegisterBank => self.write(csr, value),
            HostPath::FastBus => {
                self.bus(BusRequest::write(reg, value))?;
                if matches!(reg, BusRegister::CaptureNext | BusRegister::ScheduleNext) {
                    // Let the registered strobe land before the next status read.
                    self.harness.step()?;
                }
                Ok(())
            }
        }
    }

    fn capture_time(&mut self) -> Result<u32, DriverError> {
        self.queue_read(Csr::CaptureTime, BusRegister::CaptureTime)
    }

    fn capture_data(&mut self) -> Result<u32, DriverError> {
        self.queue_read(Csr::CaptureData, BusRegister::CaptureData)
    }

    fn pop_capture(&mut self) -> Result<(), DriverError> {
        self.queue_write(Csr::CaptureNext, BusRegister::CaptureNext, 1)
    }

    fn set_schedule_time(&mut self, word: u32) -> Result<(), DriverError> {
        self.queue_write(Csr::ScheduleTime, BusRegister::ScheduleTime, word)
    }

    fn set_schedule_data(&mut self, levels: u32) -> Result<(), DriverError> {
        self.queue_write(Csr::ScheduleData, BusRegister::ScheduleData, levels)
    }

    fn push_schedule(&mut self) -> Result<(), DriverError> {
        self.queue_write(Csr::ScheduleNext, BusRegister::ScheduleNext, 1)
    }

    fn event_status(&mut self) -> Result<u32, DriverError> {
        self.read(Csr::EventStatus)
    }

    /// Drain the capture queue.
    pub fn read_captures(&mut self) -> Result<Vec<CaptureRecord>, DriverError> {
        let width = self.timestamp_width();
        let mut records = Vec::new();
        while self.event_status()? & Event::CaptureReadable.bit() != 0 {
            let time = Timestamp::from_word(self.capture_time()?, width);
            let levels = self.capture_data()?;
            self.pop_capture()?;
            records.push(CaptureRecord { time, levels });
        }
        log::debug!("read {} capture records", records.len());
        Ok(records)
    }

    /// Push `count` copies of one record, failing on a full queue.
    pub fn write_schedule(
        &mut self,
        time: Timestamp,
        levels: u32,
        count: usize,
    ) -> Result<usize, DriverError> {
        let word = time.to_word(self.timestamp_width());
        self.set_schedule_time(word)?;
        self.set_schedule_data(levels)?;
        for written in 0..count {
            if self.event_status()? & Event::ScheduleWritable.bit() == 0 {
                log::warn!("schedule queue overrun after {} records", written);
                return Err(DriverError::Overrun { written });
            }
            self.push_schedule()?;
        }
        Ok(count)
    }

    /// Push a sequence of records in order, failing on a full queue.
    pub fn schedule(&mut self, records: &[(Timestamp, u32)]) -> Result<usize, DriverError> {
        let width = self.timestamp_width();
        for (written, &(time, levels)) in records.iter().enumerate() {
            if self.event_status()? & Event::ScheduleWritable.bit() == 0 {
                log::warn!("schedule queue overrun after {} records", written);
                return Err(DriverError::Overrun { written });
            }
            self.set_schedule_time(time.to_word(width))?;
            self.set_schedule_data(levels)?;
            self.push_schedule()?;
        }
        Ok(records.len())
    }

    pub fn set_output_enable(&mut self, mask: u32) -> Result<(), DriverError> {
        self.write(Csr::OutputEnable, mask)
    }

    pub fn set_rising_enable(&mut self, mask: u32) -> Result<(), DriverError> {
        self.write(Csr::RisingEnable, mask)
    }

    pub fn set_falling_enable(&mut self, mask: u32) -> Result<(), DriverError> {
        self.write(Csr::FallingEnable, mask)
    }

    /// Release both flushes, then arm and force.
    pub fn start(&mut self) -> Result<(), DriverError> {
        self.write(Csr::FlushSchedule, 0)?;
        self.write(Csr::FlushCapture, 0)?;
        self.write(Csr::Arm, 1)?;
        self.write(Csr::Force, 1)?;
        log::debug!("started");
        Ok(())
    }

    /// Stop counting and hold both queues flushed.
    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.write(Csr::Force, 0)?;
        self.write(Csr::Arm, 0)?;
        self.write(Csr::FlushSchedule, 1)?;
        self.write(Csr::FlushCapture, 1)?;
        log::debug!("stopped");
        Ok(())
    }

    pub fn zero(&mut self) -> Result<(), DriverError> {
        self.write(Csr::Zero, 1)
    }

    pub fn status(&mut self) -> Result<Status, DriverError> {
        Ok(Status {
            events: self.read(Csr::EventStatus)?,
            pending: self.read(Csr::EventPending)?,
            arm: self.read(Csr::Arm)? != 0,
            force: self.read(Csr::Force)? != 0,
            flush_capture: self.read(Csr::FlushCapture)? != 0,
            flush_schedule: self.read(Csr::FlushSchedule)? != 0,
            cycle: self.read(Csr::Cycle)?,
            output_enable: self.read(Csr::OutputEnable)?,
            rising_enable: self.read(Csr::RisingEnable)?,
            falling_enable: self.read(Csr::FallingEnable)?,
            levels: self.read(Csr::Level)?,
        })
    }

    /// Clear pending events (write one to clear).
    pub fn clear_events(&mut self, mask: u32) -> Result<(), DriverError> {
        self.write(Csr::EventPending, mask)
    }

    /// Poll until the capture queue is readable.
    pub fn wait_capture(&mut self, max_ticks: u64) -> Result<(), DriverError> {
        for _ in 0..max_ticks {
            if self.event_status()? & Event::CaptureReadable.bit() != 0 {
                return Ok(());
            }
        }
        Err(DriverError::Timeout(max_ticks))
    }

    /// One loopback measurement with output 0 wired to input 0.
    ///
    /// Emits a probe pulse, waits for its captured rising edge at `t` and
    /// schedules the answering rising edge at `t + buffer`. Returns the
    /// measured edge-to-edge time, or `None` when the answer was scheduled
    /// too late to fire.
    pub fn loopback_round_trip(&mut self, buffer: u32) -> Result<Option<u32>, DriverError> {
        let mask = width_mask(self.timestamp_width());

        self.stop()?;
        self.set_output_enable(1)?;
        self.set_rising_enable(1)?;
        self.set_falling_enable(0)?;
        self.zero()?;
        self.write(Csr::FlushSchedule, 0)?;
        self.write(Csr::FlushCapture, 0)?;

        let probe = [
            (0, 0),
            (PROBE_WORD, 1),
            (PROBE_WORD + (1 << SUBCYCLE_BITS), 0),
        ];
        for (word, levels) in probe {
            self.set_schedule_time(word)?;
            self.set_schedule_data(levels)?;
            self.push_schedule()?;
        }
        self.write(Csr::Force, 1)?;

        self.wait_capture(self.max_wait)?;
        let t = self.capture_time()?;
        self.set_schedule_time(t.wrapping_add(buffer) & mask)?;
        self.set_schedule_data(1)?;
        self.push_schedule()?;
        self.pop_capture()?;

        let latency = match self.wait_capture(self.max_wait) {
            Ok(()) => Some(self.capture_time()?.wrapping_sub(t) & mask),
            Err(DriverError::Timeout(_)) => None,
            Err(e) => return Err(e),
        };
        self.stop()?;
        log::debug!("loopback buffer {}: {:?}", buffer, latency);
        Ok(latency)
    }

    /// Binary-search the smallest loopback buffer the host meets, starting
    /// from `start` timestamp units.
    pub fn find_safe_buffer(&mut self, start: u32) -> Result<SafeBuffer, DriverError> {
        let mut buffer = start;
        let mut step = start / 2;
        let mut best = None;
        loop {
            match self.loopback_round_trip(buffer)? {
                Some(latency) => {
                    best = Some(SafeBuffer { buffer, latency });
                    buffer = buffer.saturating_sub(step);
                }
                None => buffer = buffer.saturating_add(step),
            }
            if step == 0 {
                break;
            }
            step /= 2;
        }
        let best = best.ok_or(DriverError::NoSafeBuffer(start))?;
        log::info!(
            "safe loopback buffer {} (latency {})",
            best.buffer,
            best.latency
        );
        Ok(best)
    }
}
