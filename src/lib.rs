//! Cycle-accurate multi-channel time-to-digital / digital-to-time engine.
//!
//! Input edges are timestamped against a global cycle counter with
//! sub-cycle resolution and queued for the host; host-queued output events
//! are replayed onto output lines at exact (cycle, sub-cycle) instants.
//! Everything advances on [`Engine::tick`].

pub mod builder;
pub mod bus;
pub mod channel;
pub mod config;
pub mod counter;
pub mod driver;
pub mod edge;
pub mod engine;
pub mod events;
pub mod fifo;
#[doc(hidden)]
pub mod harness;
pub mod host;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod invariant_rt;
pub mod pulse;
pub mod record;
pub mod regmap;
pub mod sampler;
pub mod select;
pub mod state;
pub mod trace;

pub use builder::EngineBuilder;
pub use bus::{BusError, BusRegister, BusRequest};
pub use config::{ConfigError, EngineConfig, Resolution};
pub use engine::{Engine, EngineError, TickReport};
pub use events::Event;
pub use pulse::LineOutput;
pub use record::{CaptureRecord, ScheduleRecord, Timestamp};
pub use regmap::{Csr, RegisterError};
pub use sampler::SampleVector;
