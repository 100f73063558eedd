//! Register-bank address table.
//!
//! The table is hand-written in declaration order and built once per engine;
//! field widths come from the configuration.

use crate::config::{width_mask, EngineConfig};
use crate::events::EVENT_MASK;
use crate::invariant_ppt::{assert_invariant, REGMAP_FIELDS_FIT, REGMAP_SOUNDNESS};
use thiserror::Error;

/// Host access class of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Status, written by the engine.
    ReadOnly,
    /// Control storage.
    ReadWrite,
    /// Write-only pulse consumed on the next tick; reads 0.
    Strobe,
    /// Pending bits; writing 1 clears.
    WriteOneToClear,
}

/// Registers of the register-bank view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Csr {
    Cycle,
    Zero,
    Arm,
    Force,
    FlushCapture,
    FlushSchedule,
    Level,
    RisingEnable,
    FallingEnable,
    OutputEnable,
    CaptureTime,
    CaptureData,
    CaptureNext,
    ScheduleTime,
    ScheduleData,
    ScheduleNext,
    EventStatus,
    EventPending,
    EventEnable,
}

impl Csr {
    /// All registers, in address order.
    pub const ALL: [Csr; 19] = [
        Csr::Cycle,
        Csr::Zero,
        Csr::Arm,
        Csr::Force,
        Csr::FlushCapture,
        Csr::FlushSchedule,
        Csr::Level,
        Csr::RisingEnable,
        Csr::FallingEnable,
        Csr::OutputEnable,
        Csr::CaptureTime,
        Csr::CaptureData,
        Csr::CaptureNext,
        Csr::ScheduleTime,
        Csr::ScheduleData,
        Csr::ScheduleNext,
        Csr::EventStatus,
        Csr::EventPending,
        Csr::EventEnable,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Csr::Cycle => "cycle",
            Csr::Zero => "zero",
            Csr::Arm => "arm",
            Csr::Force => "force",
            Csr::FlushCapture => "flush_capture",
            Csr::FlushSchedule => "flush_schedule",
            Csr::Level => "level",
            Csr::RisingEnable => "rising_enable",
            Csr::FallingEnable => "falling_enable",
            Csr::OutputEnable => "output_enable",
            Csr::CaptureTime => "capture_time",
            Csr::CaptureData => "capture_data",
            Csr::CaptureNext => "capture_next",
            Csr::ScheduleTime => "schedule_time",
            Csr::ScheduleData => "schedule_data",
            Csr::ScheduleNext => "schedule_next",
            Csr::EventStatus => "ev_status",
            Csr::EventPending => "ev_pending",
            Csr::EventEnable => "ev_enable",
        }
    }

    pub const fn access(self) -> Access {
        match self {
            Csr::Cycle
            | Csr::Level
            | Csr::CaptureTime
            | Csr::CaptureData
            | Csr::EventStatus => Access::ReadOnly,
            Csr::Zero | Csr::CaptureNext | Csr::ScheduleNext => Access::Strobe,
            Csr::EventPending => Access::WriteOneToClear,
            _ => Access::ReadWrite,
        }
    }
}

/// Errors of address-based register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("no register at offset {0:#x}")]
    Unmapped(u16),
    #[error("register {0} is read-only")]
    ReadOnly(&'static str),
}

/// One row of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterField {
    pub csr: Csr,
    /// Word offset within the bank.
    pub offset: u16,
    pub width: u32,
    pub access: Access,
}

impl RegisterField {
    pub fn mask(&self) -> u32 {
        width_mask(self.width)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMap {
    fields: Vec<RegisterField>,
}

impl RegisterMap {
    /// Lay out the bank for `config`.
    pub fn build(config: &EngineConfig) -> Self {
        let channels = config.channels as u32;
        let fields: Vec<RegisterField> = Csr::ALL
            .iter()
            .enumerate()
            .map(|(offset, &csr)| {
                let width = match csr {
                    Csr::Cycle => config.cycle_width(),
                    Csr::Level
                    | Csr::RisingEnable
                    | Csr::FallingEnable
                    | Csr::OutputEnable
                    | Csr::CaptureData
                    | Csr::ScheduleData => channels,
                    Csr::CaptureTime | Csr::ScheduleTime => config.timestamp_width,
                    Csr::EventStatus | Csr::EventPending | Csr::EventEnable => {
                        EVENT_MASK.count_ones()
                    }
                    _ => 1,
                };
                RegisterField {
                    csr,
                    offset: offset as u16,
                    width,
                    access: csr.access(),
                }
            })
            .collect();

        assert_invariant(
            REGMAP_SOUNDNESS,
            fields.iter().enumerate().all(|(i, f)| usize::from(f.offset) == i),
            "register offsets are dense and unique",
            Some("RegisterMap::build"),
        );
        assert_invariant(
            REGMAP_FIELDS_FIT,
            fields.iter().all(|f| (1..=32).contains(&f.width)),
            "every field fits one bus word",
            Some("RegisterMap::build"),
        );

        Self { fields }
    }

    pub fn fields(&self) -> &[RegisterField] {
        &self.fields
    }

    pub fn field(&self, csr: Csr) -> &RegisterField {
        // Built from `Csr::ALL`, so position equals declaration order.
        &self.fields[csr as usize]
    }

    pub fn lookup(&self, offset: u16) -> Result<&RegisterField, RegisterError> {
        self.fields
            .get(usize::from(offset))
            .ok_or(RegisterError::Unmapped(offset))
    }

    pub fn offset_of(&self, csr: Csr) -> u16 {
        self.field(csr).offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariant_ppt::contract_test;

    #[test]
    fn widths_follow_config() {
        let config = EngineConfig {
            channels: 6,
            timestamp_width: 24,
            ..EngineConfig::default()
        };
        let map = RegisterMap::build(&config);
        assert_eq!(map.field(Csr::Cycle).width, 21);
        assert_eq!(map.field(Csr::CaptureTime).width, 24);
        assert_eq!(map.field(Csr::OutputEnable).mask(), 0x3f);
        assert_eq!(map.field(Csr::EventEnable).width, 7);
        assert_eq!(map.field(Csr::Zero).access, Access::Strobe);
        contract_test("regmap build", &[REGMAP_SOUNDNESS, REGMAP_FIELDS_FIT]);
    }

    #[test]
    fn lookup_by_offset() {
        let map = RegisterMap::build(&EngineConfig::default());
        let offset = map.offset_of(Csr::ScheduleNext);
        assert_eq!(map.lookup(offset).unwrap().csr, Csr::ScheduleNext);
        assert_eq!(map.lookup(0x40), Err(RegisterError::Unmapped(0x40)));
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = Csr::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Csr::ALL.len());
    }
}
