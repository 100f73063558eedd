//! Test bench: drives an [`Engine`] from per-line stimuli through the serdes
//! plumbing and optionally loops outputs back to inputs.
//!
//! Stimulus instants are `(tick, phase)` pairs in fast-clock phases; a
//! low-resolution engine samples phase 0 of every tick only. Outputs reach
//! their pads one tick after the engine produced them, through a
//! [`LineSerializer`] per line.

use crate::engine::{Engine, EngineError, TickReport};
use crate::pulse::LineOutput;
use crate::sampler::{LineSampler, LineSerializer, SampleVector};
use crate::trace::{OutputTrace, PadLevel};

/// Piecewise-constant level of one input line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStimulus {
    initial: bool,
    /// `(tick, phase, level)`, sorted by instant.
    changes: Vec<(u64, u8, bool)>,
}

impl LineStimulus {
    pub fn constant(level: bool) -> Self {
        Self {
            initial: level,
            changes: Vec::new(),
        }
    }

    /// The line takes `level` from `(tick, phase)` on.
    pub fn set(mut self, tick: u64, phase: u8, level: bool) -> Self {
        let at = self
            .changes
            .partition_point(|&(t, p, _)| (t, p) <= (tick, phase));
        self.changes.insert(at, (tick, phase, level));
        self
    }

    /// A high pulse over `[rise, fall)`, instants in `(tick, phase)`.
    pub fn pulse(self, rise: (u64, u8), fall: (u64, u8)) -> Self {
        self.set(rise.0, rise.1, true).set(fall.0, fall.1, false)
    }

    pub fn level_at(&self, tick: u64, phase: u8) -> bool {
        self.changes
            .iter()
            .take_while(|&&(t, p, _)| (t, p) <= (tick, phase))
            .last()
            .map_or(self.initial, |&(_, _, level)| level)
    }
}

/// Engine plus everything around its pins.
#[derive(Debug)]
pub struct Harness {
    engine: Engine,
    trigger: bool,
    tick: u64,
    stimuli: Vec<LineStimulus>,
    samplers: Vec<LineSampler>,
    serializers: Vec<LineSerializer>,
    /// Output line feeding each input line, if wired.
    loopback: Vec<Option<usize>>,
    /// What each output presented on the previous tick.
    presented: Vec<LineOutput>,
    lines: Vec<SampleVector>,
    outputs: Vec<LineOutput>,
    pads: Vec<[bool; 8]>,
    trace: Option<OutputTrace>,
}

impl Harness {
    pub fn new(engine: Engine) -> Self {
        let n = engine.channels();
        let resolution = engine.resolution();
        let tristated = LineOutput {
            samples: SampleVector::default(),
            tristate: true,
        };
        Self {
            trigger: false,
            tick: 0,
            stimuli: vec![LineStimulus::default(); n],
            samplers: (0..n).map(|_| LineSampler::new(resolution)).collect(),
            serializers: (0..n).map(|_| LineSerializer::new(resolution)).collect(),
            loopback: vec![None; n],
            presented: vec![tristated; n],
            lines: vec![SampleVector::default(); n],
            outputs: vec![tristated; n],
            pads: vec![[false; 8]; n],
            trace: None,
            engine,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Ticks stepped so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn set_trigger(&mut self, trigger: bool) {
        self.trigger = trigger;
    }

    pub fn set_stimulus(&mut self, line: usize, stimulus: LineStimulus) {
        self.stimuli[line] = stimulus;
    }

    /// Wire output line `output` to input line `input`. A tri-stated output
    /// leaves the input on its stimulus.
    pub fn loopback(&mut self, output: usize, input: usize) {
        self.loopback[input] = Some(output);
    }

    /// Start recording the output pads.
    pub fn record(&mut self) {
        self.trace = Some(OutputTrace::new(
            self.engine.resolution(),
            self.engine.channels(),
        ));
    }

    pub fn take_trace(&mut self) -> Option<OutputTrace> {
        self.trace.take()
    }

    /// What the engine produced on the last tick.
    pub fn outputs(&self) -> &[LineOutput] {
        &self.outputs
    }

    /// Sample vectors fed to the engine on the last tick.
    pub fn inputs(&self) -> &[SampleVector] {
        &self.lines
    }

    /// Advance one system tick.
    pub fn step(&mut self) -> Result<TickReport, EngineError> {
        let resolution = self.engine.resolution();
        let phases = resolution.oversampling();

        // Output pads during this tick carry last tick's vectors.
        for (serializer, (pad, presented)) in self
            .serializers
            .iter_mut()
            .zip(self.pads.iter_mut().zip(&self.presented))
        {
            serializer.strobe(presented.samples);
            for level in pad.iter_mut().take(phases) {
                *level = serializer.clock_out();
            }
        }

        for (i, sampler) in self.samplers.iter_mut().enumerate() {
            let source = self.loopback[i].filter(|&j| !self.presented[j].tristate);
            for k in 0..phases {
                let phase = if phases == 1 { 0 } else { k as u8 };
                let level = match source {
                    Some(j) => self.pads[j][k],
                    None => self.stimuli[i].level_at(self.tick, phase),
                };
                sampler.clock_in(level);
            }
            self.lines[i] = sampler.strobe();
        }

        if let Some(trace) = self.trace.as_mut() {
            for k in 0..phases {
                let frame = self.pads.iter().zip(&self.presented).map(|(pad, out)| {
                    if out.tristate {
                        PadLevel::Floating
                    } else if pad[k] {
                        PadLevel::High
                    } else {
                        PadLevel::Low
                    }
                });
                trace.push_frame(frame);
            }
        }

        let report = self
            .engine
            .tick(self.trigger, &self.lines, &mut self.outputs)?;
        self.presented.copy_from_slice(&self.outputs);
        self.tick += 1;
        Ok(report)
    }

    /// Step `ticks` times, collecting the reports.
    pub fn run(&mut self, ticks: u64) -> Result<Vec<TickReport>, EngineError> {
        (0..ticks).map(|_| self.step()).collect()
    }

    /// Step until `done` holds for a report, at most `max_ticks` times.
    pub fn run_until(
        &mut self,
        max_ticks: u64,
        mut done: impl FnMut(&TickReport) -> bool,
    ) -> Result<Option<TickReport>, EngineError> {
        for _ in 0..max_ticks {
            let report = self.step()?;
            if done(&report) {
                return Ok(Some(report));
            }
        }
        Ok(None)
    }
}
