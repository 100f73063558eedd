//! Output waveform recording and WAV export.

use crate::config::Resolution;
use crate::engine::EngineError;
use crate::harness::Harness;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use thiserror::Error;

/// Amplitude of a driven-high pad in the exported file.
pub const HIGH_SAMPLE: i16 = i16::MAX / 2;

/// One phase sample of an output pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadLevel {
    Low,
    High,
    /// Tri-stated.
    Floating,
}

impl PadLevel {
    pub fn to_sample(self) -> i16 {
        match self {
            PadLevel::High => HIGH_SAMPLE,
            PadLevel::Low => -HIGH_SAMPLE,
            PadLevel::Floating => 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace holds no samples")]
    Empty,
    #[error("sample rate {tick_rate} Hz x {oversampling} overflows")]
    Rate { tick_rate: u32, oversampling: usize },
    #[error("wav export failed: {0}")]
    Wav(#[from] hound::Error),
}

/// Per-phase pad levels of every output line, frame-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTrace {
    resolution: Resolution,
    lines: usize,
    samples: Vec<PadLevel>,
}

impl OutputTrace {
    pub fn new(resolution: Resolution, lines: usize) -> Self {
        Self {
            resolution,
            lines,
            samples: Vec::new(),
        }
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Number of recorded phase frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.lines.max(1)
    }

    /// Append one phase frame, one level per line.
    pub fn push_frame(&mut self, frame: impl IntoIterator<Item = PadLevel>) {
        let start = self.samples.len();
        self.samples.extend(frame.into_iter().take(self.lines));
        self.samples
            .resize(start + self.lines, PadLevel::Floating);
    }

    /// Recorded levels of one line.
    pub fn line(&self, line: usize) -> impl Iterator<Item = PadLevel> + '_ {
        self.samples
            .chunks(self.lines.max(1))
            .filter_map(move |frame| frame.get(line).copied())
    }

    /// Write a 16-bit WAV with one channel per line at
    /// `tick_rate` x oversampling Hz.
    pub fn write_wav(&self, path: &Path, tick_rate: u32) -> Result<(), TraceError> {
        if self.samples.is_empty() {
            return Err(TraceError::Empty);
        }
        let oversampling = self.resolution.oversampling();
        let sample_rate = tick_rate
            .checked_mul(oversampling as u32)
            .ok_or(TraceError::Rate {
                tick_rate,
                oversampling,
            })?;
        let spec = WavSpec {
            channels: self.lines as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec)?;
        for level in &self.samples {
            writer.write_sample(level.to_sample())?;
        }
        writer.finalize()?;
        log::info!(
            "wrote {} frames x {} lines to {}",
            self.frames(),
            self.lines,
            path.display()
        );
        Ok(())
    }
}

/// Run `ticks` ticks on a harness and return the recorded pads.
pub fn render_offline(harness: &mut Harness, ticks: u64) -> Result<OutputTrace, EngineError> {
    harness.record();
    harness.run(ticks)?;
    Ok(harness.take_trace().unwrap_or_else(|| {
        OutputTrace::new(harness.engine().resolution(), harness.engine().channels())
    }))
}
