//! Tick-safe invariant signaling for the engine's clock path.
//!
//! This module provides the second tier of the invariant system:
//! - **Tier 1 (tick-safe)**: lock-free signaling of fact IDs from `Engine::tick`
//! - **Tier 2 (host side)**: draining and contract verification
//!
//! The tick path **signals facts**. Host code **judges correctness**.
//!
//! Unlike `assert_invariant`, signaling here never allocates, never locks and
//! never panics. Facts travel through an `rtrb` SPSC ring; when it is full the
//! fact is dropped rather than stalling the tick.
//!
//! # Example
//!
//! ```
//! use tdcdtc::invariant_rt::*;
//!
//! let (mut tx, mut rx) = new_invariant_queue();
//! signal_invariant(&mut tx, INV_CAPTURE_ENQUEUED);
//! let signals = drain_invariant_signals(&mut rx);
//! assert!(signals.contains(&INV_CAPTURE_ENQUEUED));
//! ```

use rtrb::{Consumer, Producer, RingBuffer};

// ============================================================================
// Tick-Safe Fact IDs (Tier 1)
// ============================================================================

/// A detected edge was timestamped into the capture queue.
pub const INV_CAPTURE_ENQUEUED: u8 = 1;

/// A detected edge was dropped because the capture queue was full.
pub const INV_CAPTURE_DROPPED: u8 = 2;

/// More than one channel detected in the same tick; all but one were lost.
pub const INV_EDGE_COLLISION: u8 = 3;

/// The schedule queue head matched the counter and was applied.
pub const INV_SCHEDULE_FIRED: u8 = 4;

/// A schedule push was rejected because the schedule queue was full.
pub const INV_SCHEDULE_REJECTED: u8 = 5;

/// The cycle counter wrapped to zero.
pub const INV_COUNTER_WRAPPED: u8 = 6;

/// Both host views touched the same queue or field in one tick.
pub const INV_HOST_HAZARD: u8 = 7;

/// A tick completed.
pub const INV_TICK_CLEAN: u8 = 8;

// ============================================================================
// Invariant Signal Queue
// ============================================================================

/// Capacity for invariant signal queue.
/// Large enough to hold the facts of many ticks between host drains.
pub const INVARIANT_QUEUE_CAPACITY: usize = 256;

/// Creates a new invariant signal queue pair.
///
/// Returns (producer for the engine, consumer for the host).
pub fn new_invariant_queue() -> (Producer<u8>, Consumer<u8>) {
    RingBuffer::new(INVARIANT_QUEUE_CAPACITY)
}

/// Signals a fact from the tick path. Dropped if the queue is full.
#[inline]
pub fn signal_invariant(tx: &mut Producer<u8>, id: u8) {
    let _ = tx.push(id);
}

/// Signals a fact `count` times (capped at 16 per call).
#[inline]
pub fn signal_invariant_n(tx: &mut Producer<u8>, id: u8, count: usize) {
    for _ in 0..count.min(16) {
        let _ = tx.push(id);
    }
}

// ============================================================================
// Host-Side Verification (Tier 2)
// ============================================================================

/// Drains all pending invariant signals from the queue.
pub fn drain_invariant_signals(rx: &mut Consumer<u8>) -> Vec<u8> {
    let mut signals = Vec::with_capacity(INVARIANT_QUEUE_CAPACITY);
    while let Ok(id) = rx.pop() {
        signals.push(id);
    }
    signals
}

/// Counts occurrences of each fact ID in a signal list.
pub fn count_invariant_signals(signals: &[u8]) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for &id in signals {
        counts[id as usize] += 1;
    }
    counts
}

/// Contract verification: asserts that required facts were signaled.
///
/// # Panics
/// Panics if any required fact was not signaled at least once.
#[cfg(any(test, feature = "ppt"))]
pub fn contract_test_rt(contract_name: &str, signals: &[u8], required: &[u8]) {
    let counts = count_invariant_signals(signals);
    let missing: Vec<&str> = required
        .iter()
        .filter(|&&id| counts[id as usize] == 0)
        .map(|&id| invariant_name(id))
        .collect();

    if !missing.is_empty() {
        let present: Vec<&str> = signals
            .iter()
            .map(|&id| invariant_name(id))
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        panic!(
            "RT Contract '{}' missing invariants: {:?}. Present: {:?}",
            contract_name, missing, present
        );
    }
}

/// Maps fact ID to a human-readable name (for diagnostics only).
pub const fn invariant_name(id: u8) -> &'static str {
    match id {
        INV_CAPTURE_ENQUEUED => "CAPTURE_ENQUEUED",
        INV_CAPTURE_DROPPED => "CAPTURE_DROPPED",
        INV_EDGE_COLLISION => "EDGE_COLLISION",
        INV_SCHEDULE_FIRED => "SCHEDULE_FIRED",
        INV_SCHEDULE_REJECTED => "SCHEDULE_REJECTED",
        INV_COUNTER_WRAPPED => "COUNTER_WRAPPED",
        INV_HOST_HAZARD => "HOST_HAZARD",
        INV_TICK_CLEAN => "TICK_CLEAN",
        _ => "UNKNOWN",
    }
}
