use tdcdtc::invariant_rt::{drain_invariant_signals, INV_HOST_HAZARD};
use tdcdtc::{
    BusError, BusRegister, BusRequest, Csr, Engine, EngineBuilder, LineOutput, Resolution,
    SampleVector, TickReport,
};

fn engine() -> Engine {
    EngineBuilder::new()
        .channels(1)
        .resolution(Resolution::Low)
        .build()
        .unwrap()
}

fn tick_level(engine: &mut Engine, level: bool) -> TickReport {
    let mut out = [LineOutput::default()];
    engine
        .tick(false, &[SampleVector(u8::from(level))], &mut out)
        .unwrap()
}

fn tick(engine: &mut Engine) -> TickReport {
    let level = engine.levels() & 1 != 0;
    tick_level(engine, level)
}

/// Submit and tick until acknowledged. Returns the data and ticks spent.
fn access(engine: &mut Engine, request: BusRequest) -> (u32, usize) {
    engine.bus_submit(request).unwrap();
    for ticks in 1..=4 {
        tick(engine);
        if let Some(data) = engine.bus_response() {
            return (data, ticks);
        }
    }
    panic!("bus request never acknowledged");
}

#[test]
fn read_samples_pre_tick_state() {
    let mut e = engine();
    e.csr_write(Csr::Force, 1).unwrap();
    for _ in 0..3 {
        tick(&mut e);
    }
    let (cycle, ticks) = access(&mut e, BusRequest::read(BusRegister::Cycle));
    assert_eq!((cycle, ticks), (3, 1));
    assert_eq!(e.counter(), 4);
}

#[test]
fn ack_lasts_exactly_one_tick() {
    let mut e = engine();
    access(&mut e, BusRequest::read(BusRegister::Cycle));
    assert!(e.bus_response().is_some());
    tick(&mut e);
    assert_eq!(e.bus_response(), None);
}

#[test]
fn back_to_back_waits_for_previous_ack() {
    let mut e = engine();
    e.bus_submit(BusRequest::read(BusRegister::Cycle)).unwrap();
    assert_eq!(
        e.bus_submit(BusRequest::read(BusRegister::Cycle)),
        Err(BusError::Busy)
    );
    tick(&mut e);
    assert!(!e.bus_busy());
    let (_, ticks) = access(&mut e, BusRequest::read(BusRegister::ScheduleTime));
    assert_eq!(ticks, 2);
}

#[test]
fn schedule_push_lands_on_following_tick() {
    let mut e = engine();
    access(&mut e, BusRequest::write(BusRegister::ScheduleTime, 0x100));
    access(&mut e, BusRequest::write(BusRegister::ScheduleData, 1));
    assert_eq!(e.csr_read(Csr::ScheduleTime), 0x100);
    assert_eq!(e.csr_read(Csr::ScheduleData), 1);
    access(&mut e, BusRequest::write(BusRegister::ScheduleNext, 1));
    assert_eq!(e.schedule_len(), 0);
    tick(&mut e);
    assert_eq!(e.schedule_len(), 1);
}

#[test]
fn capture_head_over_bus() {
    let mut e = engine();
    e.csr_write(Csr::RisingEnable, 1).unwrap();
    e.csr_write(Csr::Force, 1).unwrap();
    tick_level(&mut e, false);
    tick_level(&mut e, false);
    tick_level(&mut e, true);
    let (time, _) = access(&mut e, BusRequest::read(BusRegister::CaptureTime));
    let (data, _) = access(&mut e, BusRequest::read(BusRegister::CaptureData));
    assert_eq!((time, data), (2 << 3, 1));
    access(&mut e, BusRequest::write(BusRegister::CaptureNext, 1));
    assert_eq!(e.capture_len(), 1);
    tick(&mut e);
    assert_eq!(e.capture_len(), 0);
}

#[test]
fn unmapped_address_is_acknowledged() {
    let mut e = engine();
    let (data, ticks) = access(
        &mut e,
        BusRequest {
            addr: 0x7f,
            write: true,
            data: 0xdead,
        },
    );
    assert_eq!((data, ticks), (0, 1));
    assert_eq!(e.csr_read(Csr::ScheduleTime), 0);
}

#[test]
fn address_decode_uses_low_byte() {
    let mut e = engine();
    access(
        &mut e,
        BusRequest {
            addr: 0xff00 | BusRegister::ScheduleData.address(),
            write: true,
            data: 1,
        },
    );
    assert_eq!(e.csr_read(Csr::ScheduleData), 1);
}

#[test]
fn disabled_bus_rejects_requests() {
    let mut e = EngineBuilder::new()
        .channels(1)
        .fast_bus(false)
        .build()
        .unwrap();
    assert_eq!(
        e.bus_submit(BusRequest::read(BusRegister::Cycle)),
        Err(BusError::Disabled)
    );
}

#[test]
fn dual_view_pop_is_flagged_and_merged() {
    let (mut e, mut rx) = EngineBuilder::new()
        .channels(1)
        .resolution(Resolution::Low)
        .build_with_signals()
        .unwrap();
    e.csr_write(Csr::RisingEnable, 1).unwrap();
    e.csr_write(Csr::FallingEnable, 1).unwrap();
    e.csr_write(Csr::Force, 1).unwrap();
    tick_level(&mut e, true);
    tick_level(&mut e, false);
    assert_eq!(e.capture_len(), 2);
    drain_invariant_signals(&mut rx);

    // Bus pop registers on this tick and lands on the next, together with
    // the register-bank strobe.
    access(&mut e, BusRequest::write(BusRegister::CaptureNext, 1));
    e.csr_write(Csr::CaptureNext, 1).unwrap();
    let report = tick(&mut e);
    assert!(report.hazard);
    assert_eq!(e.capture_len(), 1);
    assert!(drain_invariant_signals(&mut rx).contains(&INV_HOST_HAZARD));

    let report = tick(&mut e);
    assert!(!report.hazard);
}

#[test]
fn dual_view_storage_write_is_flagged() {
    let mut e = engine();
    e.bus_submit(BusRequest::write(BusRegister::ScheduleTime, 0x40))
        .unwrap();
    e.csr_write(Csr::ScheduleTime, 0x80).unwrap();
    let report = tick(&mut e);
    assert!(report.hazard);
    assert_eq!(e.csr_read(Csr::ScheduleTime), 0x40);
}

/// Engine with captures at cycles 1 and 2 waiting in the queue.
fn with_two_captures() -> Engine {
    let mut e = engine();
    e.csr_write(Csr::RisingEnable, 1).unwrap();
    e.csr_write(Csr::FallingEnable, 1).unwrap();
    e.csr_write(Csr::Force, 1).unwrap();
    tick_level(&mut e, false);
    tick_level(&mut e, true);
    tick_level(&mut e, false);
    assert_eq!(e.capture_len(), 2);
    e
}

#[test]
fn csr_push_against_bus_input_write_is_flagged() {
    let (mut e, mut rx) = EngineBuilder::new()
        .channels(1)
        .resolution(Resolution::Low)
        .build_with_signals()
        .unwrap();
    e.csr_write(Csr::ScheduleTime, 0x80).unwrap();
    assert!(!tick(&mut e).hazard);
    drain_invariant_signals(&mut rx);

    e.bus_submit(BusRequest::write(BusRegister::ScheduleTime, 0x40))
        .unwrap();
    e.csr_write(Csr::ScheduleNext, 1).unwrap();
    let report = tick(&mut e);
    assert!(report.hazard);
    assert_eq!(e.schedule_len(), 1);
    assert_eq!(e.csr_read(Csr::ScheduleTime), 0x40);
    assert!(drain_invariant_signals(&mut rx).contains(&INV_HOST_HAZARD));
}

#[test]
fn bus_push_against_csr_input_write_is_flagged() {
    let mut e = engine();
    access(&mut e, BusRequest::write(BusRegister::ScheduleNext, 1));
    e.csr_write(Csr::ScheduleData, 1).unwrap();
    let report = tick(&mut e);
    assert!(report.hazard);
    assert_eq!(e.schedule_len(), 1);
}

#[test]
fn csr_pop_against_bus_head_read_is_flagged() {
    let mut e = with_two_captures();
    e.csr_write(Csr::CaptureNext, 1).unwrap();
    e.bus_submit(BusRequest::read(BusRegister::CaptureTime))
        .unwrap();
    let report = tick(&mut e);
    assert!(report.hazard);
    // The bus saw the head the same tick removed.
    assert_eq!(e.bus_response(), Some(1 << 3));
    assert_eq!(e.capture_len(), 1);
}

#[test]
fn bus_pop_against_csr_head_read_is_flagged() {
    let mut e = with_two_captures();
    access(&mut e, BusRequest::write(BusRegister::CaptureNext, 1));
    assert_eq!(e.csr_read(Csr::CaptureData), 1);
    let report = tick(&mut e);
    assert!(report.hazard);
    assert_eq!(e.capture_len(), 1);
}

#[test]
fn single_view_read_then_pop_is_clean() {
    let mut e = with_two_captures();
    assert_eq!(e.csr_read(Csr::CaptureTime), 1 << 3);
    e.csr_write(Csr::CaptureNext, 1).unwrap();
    assert!(!tick(&mut e).hazard);

    access(&mut e, BusRequest::read(BusRegister::CaptureTime));
    access(&mut e, BusRequest::write(BusRegister::CaptureNext, 1));
    assert!(!tick(&mut e).hazard);
    assert_eq!(e.capture_len(), 0);
}
