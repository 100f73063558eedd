//! Engine module: the tick-synchronous timing engine.

// IMPORTANT: Do not call assert_invariant or any logging in the tick path to avoid locks/allocs.

use crate::bus::{BusError, BusRequest, BusStrobes, FastBus};
use crate::channel::Channel;
use crate::config::{ConfigError, EngineConfig, Resolution, MAX_CHANNELS};
use crate::edge::EdgeEnables;
use crate::events::{Conditions, EventSet};
use crate::host::{QueueAccess, RegisterBank, Strobes};
use crate::invariant_rt::{
    new_invariant_queue, signal_invariant, signal_invariant_n, INV_CAPTURE_DROPPED,
    INV_CAPTURE_ENQUEUED, INV_COUNTER_WRAPPED, INV_EDGE_COLLISION, INV_HOST_HAZARD,
    INV_SCHEDULE_FIRED, INV_SCHEDULE_REJECTED, INV_TICK_CLEAN,
};
use crate::pulse::{LineOutput, PulseCommand};
use crate::record::{CaptureRecord, ScheduleRecord, Timestamp};
use crate::regmap::{Csr, RegisterError, RegisterMap};
use crate::sampler::SampleVector;
use crate::select;
use crate::state::SharedState;
use rtrb::{Consumer, Producer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("expected {expected} input sample vectors, got {got}")]
    InputCount { expected: usize, got: usize },
    #[error("expected {expected} output slots, got {got}")]
    OutputCount { expected: usize, got: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub running: bool,
    /// Record enqueued on the capture queue.
    pub captured: Option<CaptureRecord>,
    /// A detected edge was dropped against a full capture queue.
    pub capture_dropped: bool,
    /// Channels whose edges lost the tie-break.
    pub lost: u32,
    /// Schedule record applied to the outputs.
    pub fired: Option<ScheduleRecord>,
    /// A schedule push found the queue full.
    pub schedule_rejected: bool,
    pub wrapped: bool,
    /// Both host views touched the same queue or storage in this tick.
    pub hazard: bool,
}

/// The timing engine.
pub struct Engine {
    config: EngineConfig,
    channels: Vec<Channel>,
    state: SharedState,
    bank: RegisterBank,
    bus: FastBus,
    signals: Option<Producer<u8>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("channels", &self.channels)
            .field("state", &self.state)
            .field("bus", &self.bus)
            .field("signals", &self.signals.is_some())
            .finish()
    }
}

impl Engine {
    /// Create an engine. Storage is allocated here and never again.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let engine = Self {
            channels: Channel::array(&config),
            state: SharedState::new(&config),
            bank: RegisterBank::new(&config),
            bus: FastBus::new(config.fast_bus, config.timestamp_width, config.channel_mask()),
            signals: None,
            config,
        };
        log::debug!(
            "engine: {} channels, {:?} resolution, depths {}/{}, timestamp width {}",
            engine.config.channels,
            engine.config.resolution,
            engine.config.capture_depth,
            engine.config.schedule_depth,
            engine.config.timestamp_width
        );
        Ok(engine)
    }

    /// Create an engine that reports tick facts on an invariant queue.
    pub fn new_with_signals(config: EngineConfig) -> Result<(Self, Consumer<u8>), EngineError> {
        let mut engine = Self::new(config)?;
        let (tx, rx) = new_invariant_queue();
        engine.signals = Some(tx);
        Ok((engine, rx))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolution(&self) -> Resolution {
        self.config.resolution
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Return every register, queue and channel to its reset value.
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            *channel = Channel::default();
        }
        self.state.reset();
        self.bank.reset();
        self.bus.reset();
        log::debug!("engine reset");
    }

    pub fn counter(&self) -> u32 {
        self.state.counter.value()
    }

    /// Running state computed on the last tick.
    pub fn running(&self) -> bool {
        self.state.running
    }

    /// Remembered input levels, one bit per channel.
    pub fn levels(&self) -> u32 {
        self.state.levels
    }

    pub fn capture_len(&self) -> usize {
        self.state.capture.len()
    }

    pub fn schedule_len(&self) -> usize {
        self.state.schedule.len()
    }

    pub fn events(&self) -> &EventSet {
        &self.state.events
    }

    /// Interrupt line.
    pub fn irq(&self) -> bool {
        self.state.events.irq()
    }

    pub fn register_map(&self) -> &RegisterMap {
        self.bank.map()
    }

    pub fn csr_read(&self, csr: Csr) -> u32 {
        self.bank.read(&self.state, csr)
    }

    pub fn csr_write(&mut self, csr: Csr, value: u32) -> Result<(), RegisterError> {
        self.bank.write(&mut self.state, csr, value)
    }

    pub fn csr_read_at(&self, offset: u16) -> Result<u32, RegisterError> {
        self.bank.read_at(&self.state, offset)
    }

    pub fn csr_write_at(&mut self, offset: u16, value: u32) -> Result<(), RegisterError> {
        self.bank.write_at(&mut self.state, offset, value)
    }

    pub fn bus_submit(&mut self, request: BusRequest) -> Result<(), BusError> {
        self.bus.submit(request)
    }

    pub fn bus_response(&self) -> Option<u32> {
        self.bus.response()
    }

    pub fn bus_busy(&self) -> bool {
        self.bus.busy()
    }

    /// Advance the engine by one system tick.
    ///
    /// `lines` holds this tick's sample vector for every input line and `out`
    /// receives what every output line presents. Both must have one slot per
    /// channel.
    pub fn tick(
        &mut self,
        trigger: bool,
        lines: &[SampleVector],
        out: &mut [LineOutput],
    ) -> Result<TickReport, EngineError> {
        let n = self.channels.len();
        if lines.len() != n {
            return Err(EngineError::InputCount {
                expected: n,
                got: lines.len(),
            });
        }
        if out.len() != n {
            return Err(EngineError::OutputCount {
                expected: n,
                got: out.len(),
            });
        }

        let resolution = self.config.resolution;
        let width = self.config.timestamp_width;
        let controls = self.state.controls;
        let running = controls.running(trigger);
        let mut report = TickReport {
            running,
            ..TickReport::default()
        };

        // Strobes posted during the previous tick by either view.
        let csr = self.bank.take_strobes();
        let bus = self.bus.take_strobes();
        let csr_access = self.bank.take_access();
        let pop_capture = csr.capture_next || bus.capture_next || controls.flush_capture;
        let push_schedule = csr.schedule_next || bus.schedule_next;

        // Start-of-tick queue and counter state.
        let cycle = self.state.counter.value();
        let capture_writable = self.state.capture.writable();
        let schedule_writable = self.state.schedule.writable();
        let pushed = ScheduleRecord {
            time: Timestamp::from_word(controls.schedule_time, width),
            levels: controls.schedule_data,
        };
        let fire = self
            .state
            .schedule
            .head()
            .copied()
            .filter(|r| r.time.cycle == cycle);

        let bus_access = self.bus.clock(&mut self.state);
        report.hazard = host_hazard(csr, csr_access, bus, bus_access);

        // Edge detection.
        let mut detected = 0u32;
        let mut levels = 0u32;
        let mut subcycles = [0u8; MAX_CHANNELS];
        for (i, (channel, &samples)) in self.channels.iter_mut().zip(lines).enumerate() {
            let enables = EdgeEnables {
                rising: controls.rising_enable >> i & 1 != 0,
                falling: controls.falling_enable >> i & 1 != 0,
            };
            if let Some(subcycle) = channel.detector.update(resolution, samples, enables) {
                detected |= 1 << i;
                subcycles[i] = subcycle;
            }
            if channel.detector.level() {
                levels |= 1 << i;
            }
        }
        report.lost = select::losers(detected);

        // Capture queue: pop before push, writability from the start of the tick.
        if pop_capture {
            self.state.capture.pop();
        }
        if let Some(winner) = select::winner(detected).filter(|_| running) {
            let record = CaptureRecord {
                time: Timestamp::new(cycle, subcycles[winner]),
                levels,
            };
            if capture_writable && self.state.capture.push(record).is_ok() {
                report.captured = Some(record);
            } else {
                report.capture_dropped = true;
            }
        }

        // Schedule queue.
        if fire.is_some() || controls.flush_schedule {
            self.state.schedule.pop();
        }
        if push_schedule && !(schedule_writable && self.state.schedule.push(pushed).is_ok()) {
            report.schedule_rejected = true;
        }
        report.fired = fire;

        // Pulse generators.
        for (i, (channel, slot)) in self.channels.iter_mut().zip(out.iter_mut()).enumerate() {
            let enabled = controls.output_enable >> i & 1 != 0;
            let command = fire.filter(|_| enabled).map(|r| PulseCommand {
                level: r.level(i),
                subcycle: r.time.subcycle,
            });
            channel.generator.update(resolution, command);
            *slot = LineOutput {
                samples: channel.generator.samples(),
                tristate: !enabled,
            };
        }

        report.wrapped = self.state.counter.advance(running, csr.zero);

        self.state.levels = levels;
        self.state.running = running;
        self.state.events.update(Conditions {
            capture_readable: self.state.capture.readable(),
            schedule_writable: self.state.schedule.writable(),
            capture_dropped: report.capture_dropped,
            schedule_empty: self.state.schedule.is_empty(),
            running,
            wrapped: report.wrapped,
        });

        if let Some(tx) = self.signals.as_mut() {
            emit_signals(tx, &report);
        }
        Ok(report)
    }
}

/// Both views touched the same queue in one tick: a pop or push from each,
/// or one view's pop or push against the other's head read or input write.
fn host_hazard(
    csr: Strobes,
    csr_access: QueueAccess,
    bus: BusStrobes,
    bus_access: QueueAccess,
) -> bool {
    let capture = (csr.capture_next && bus.capture_next)
        || (csr.capture_next && bus_access.capture_head)
        || (bus.capture_next && csr_access.capture_head);
    let schedule = (csr.schedule_next && bus.schedule_next)
        || (csr_access.schedule_input && bus_access.schedule_input)
        || (csr.schedule_next && bus_access.schedule_input)
        || (bus.schedule_next && csr_access.schedule_input);
    capture || schedule
}

fn emit_signals(tx: &mut Producer<u8>, report: &TickReport) {
    if report.captured.is_some() {
        signal_invariant(tx, INV_CAPTURE_ENQUEUED);
    }
    if report.capture_dropped {
        signal_invariant(tx, INV_CAPTURE_DROPPED);
    }
    if report.lost != 0 {
        signal_invariant_n(tx, INV_EDGE_COLLISION, report.lost.count_ones() as usize);
    }
    if report.fired.is_some() {
        signal_invariant(tx, INV_SCHEDULE_FIRED);
    }
    if report.schedule_rejected {
        signal_invariant(tx, INV_SCHEDULE_REJECTED);
    }
    if report.wrapped {
        signal_invariant(tx, INV_COUNTER_WRAPPED);
    }
    if report.hazard {
        signal_invariant(tx, INV_HOST_HAZARD);
    }
    signal_invariant(tx, INV_TICK_CLEAN);
}

/// Run a tick with panic containment.
///
/// On panic every output is tri-stated and an empty report returned.
pub fn tick_safe(
    engine: &mut Engine,
    trigger: bool,
    lines: &[SampleVector],
    out: &mut [LineOutput],
) -> Result<TickReport, EngineError> {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        engine.tick(trigger, lines, out)
    }));
    match result {
        Ok(report) => report,
        Err(_) => {
            // Fail closed: release every line.
            for slot in out.iter_mut() {
                slot.tristate = true;
            }
            Ok(TickReport::default())
        }
    }
}
