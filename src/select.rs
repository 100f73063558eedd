//! Tie-break selector: one timestamp per tick across all channels.

/// Lowest-indexed channel of a detection bitmap.
pub fn winner(detected: u32) -> Option<usize> {
    (detected != 0).then(|| detected.trailing_zeros() as usize)
}

/// Detections that lost the tie-break and go unrecorded.
pub fn losers(detected: u32) -> u32 {
    detected & detected.wrapping_sub(1)
}
