//! How long the robot needs before a sensor response can be complete.
//!
//! A byte on the wire is 10 bits (8N1), so one byte costs `10_000 / bps`
//! milliseconds. The robot adds a fixed [`HARDWARE_DELAY_MS`] before it starts
//! answering.

use std::time::Duration;

use crate::constants::{BaudCode, HARDWARE_DELAY_MS};
use crate::packet::PacketId;

/// Total response payload for the requested packets.
pub fn response_len(ids: &[PacketId]) -> usize {
    ids.iter().map(|id| id.width()).sum()
}

/// Time to wait after a request before the full response can have arrived.
pub fn response_delay(ids: &[PacketId], baud: BaudCode) -> Duration {
    let bytes = response_len(ids) as u64;
    let transfer_ms = bytes * 10_000 / u64::from(baud.bps());
    Duration::from_millis(HARDWARE_DELAY_MS + transfer_ms)
}
