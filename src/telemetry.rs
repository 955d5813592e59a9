//! Shared telemetry state: raw sensor buffer, staleness mask, outstanding
//! requests and the ready-at estimate, all behind one lock.
//!
//! The lock is only held for in-memory copies. Decoders read from the
//! transport into a [`StagedTelemetry`] first and hand it over with
//! [`TelemetryStore::commit`].

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use strum::IntoEnumIterator;
use tracing::trace;

use crate::constants::BaudCode;
use crate::error::{OiError, Result};
use crate::packet::{PacketId, TELEMETRY_BUFFER_LEN};
use crate::timing::response_delay;

/// One bit per packet; a set bit means the packet's slot is stale.
///
/// Group bits are kept equal to "any member stale".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyMask(u64);

impl DirtyMask {
    /// Every packet stale, as before anything has been received.
    pub fn all_stale() -> Self {
        let mut mask = Self(0);
        for id in PacketId::iter() {
            mask.0 |= 1_u64 << id.dirty_index();
        }
        mask
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn is_stale(self, id: PacketId) -> bool {
        self.0 & (1_u64 << id.dirty_index()) != 0
    }

    pub(crate) fn mark(&mut self, id: PacketId) {
        for member in id.members() {
            self.0 |= 1_u64 << member.dirty_index();
        }
        self.refresh_groups();
    }

    pub(crate) fn clear(&mut self, id: PacketId) {
        for member in id.members() {
            self.0 &= !(1_u64 << member.dirty_index());
        }
        self.refresh_groups();
    }

    fn refresh_groups(&mut self) {
        for group in PacketId::iter().filter(|id| id.is_group()) {
            let bit = 1_u64 << group.dirty_index();
            if group.members().any(|member| self.0 & (1_u64 << member.dirty_index()) != 0) {
                self.0 |= bit;
            } else {
                self.0 &= !bit;
            }
        }
    }
}

/// Sensor bytes read off the wire but not yet published.
#[derive(Debug, Clone)]
pub(crate) struct StagedTelemetry {
    buffer: [u8; TELEMETRY_BUFFER_LEN],
    written: Vec<PacketId>,
    touched: Vec<PacketId>,
}

impl StagedTelemetry {
    pub(crate) fn new() -> Self {
        Self {
            buffer: [0; TELEMETRY_BUFFER_LEN],
            written: Vec::new(),
            touched: Vec::new(),
        }
    }

    /// Slot to read `id` into. Marks the packet as touched by this transfer.
    pub(crate) fn slot_mut(&mut self, id: PacketId) -> &mut [u8] {
        self.touched.push(id);
        &mut self.buffer[id.descriptor().range()]
    }

    /// Records that the slot of `id` now holds a complete value.
    pub(crate) fn complete(&mut self, id: PacketId) {
        self.written.push(id);
    }

    pub(crate) fn written(&self) -> &[PacketId] {
        &self.written
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub buffer: [u8; TELEMETRY_BUFFER_LEN],
    pub dirty: DirtyMask,
    pub ready_at: Option<Instant>,
}

impl TelemetrySnapshot {
    pub fn raw_packet(&self, id: PacketId) -> &[u8] {
        &self.buffer[id.descriptor().range()]
    }

    pub fn sensor_value(&self, id: PacketId) -> Result<i32> {
        decode_sensor(&self.buffer, self.dirty, id)
    }
}

#[derive(Debug)]
struct TelemetryState {
    baud: BaudCode,
    dirty: DirtyMask,
    buffer: [u8; TELEMETRY_BUFFER_LEN],
    pending: Vec<PacketId>,
    subscription: Vec<PacketId>,
    streaming: bool,
    ready_at: Option<Instant>,
}

#[derive(Debug)]
pub struct TelemetryStore {
    state: Mutex<TelemetryState>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new(BaudCode::default())
    }
}

impl TelemetryStore {
    pub fn new(baud: BaudCode) -> Self {
        Self {
            state: Mutex::new(TelemetryState {
                baud,
                dirty: DirtyMask::all_stale(),
                buffer: [0; TELEMETRY_BUFFER_LEN],
                pending: Vec::new(),
                subscription: Vec::new(),
                streaming: false,
                ready_at: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TelemetryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn baud(&self) -> BaudCode {
        self.lock().baud
    }

    pub(crate) fn set_baud(&self, baud: BaudCode) {
        self.lock().baud = baud;
    }

    /// Records an outstanding one-shot query and returns its response delay.
    pub(crate) fn arm_query(&self, ids: Vec<PacketId>) -> Duration {
        let mut state = self.lock();
        let delay = response_delay(&ids, state.baud);
        state.pending = ids;
        state.ready_at = Some(Instant::now() + delay);
        delay
    }

    /// Records the standing stream subscription and returns the delay until
    /// the first frame can be complete.
    pub(crate) fn arm_stream(&self, ids: Vec<PacketId>) -> Duration {
        let mut state = self.lock();
        let delay = response_delay(&ids, state.baud);
        state.subscription = ids;
        state.streaming = true;
        state.ready_at = Some(Instant::now() + delay);
        delay
    }

    pub(crate) fn set_streaming(&self, streaming: bool) {
        self.lock().streaming = streaming;
    }

    /// Removes and returns the outstanding query.
    pub(crate) fn take_pending(&self) -> Vec<PacketId> {
        std::mem::take(&mut self.lock().pending)
    }

    pub fn pending(&self) -> Vec<PacketId> {
        self.lock().pending.clone()
    }

    pub fn subscription(&self) -> Vec<PacketId> {
        self.lock().subscription.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.lock().streaming
    }

    pub fn ready_at(&self) -> Option<Instant> {
        self.lock().ready_at
    }

    /// Time left before the last request can have been answered in full.
    pub fn time_until_ready(&self) -> Duration {
        self.ready_at()
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    pub fn is_ready(&self) -> bool {
        self.time_until_ready().is_zero()
    }

    pub fn dirty_mask(&self) -> DirtyMask {
        self.lock().dirty
    }

    pub fn is_stale(&self, id: PacketId) -> bool {
        self.lock().dirty.is_stale(id)
    }

    /// Publishes staged bytes.
    ///
    /// Completed slots are always copied. With `valid` their dirty bits are
    /// cleared; otherwise every touched packet is marked stale.
    pub(crate) fn commit(&self, staged: &StagedTelemetry, valid: bool) {
        let mut state = self.lock();
        for id in &staged.written {
            let range = id.descriptor().range();
            state.buffer[range.clone()].copy_from_slice(&staged.buffer[range]);
        }

        if valid {
            for id in &staged.written {
                state.dirty.clear(*id);
            }
        } else {
            for id in &staged.touched {
                state.dirty.mark(*id);
            }
        }
        trace!(
            written = staged.written.len(),
            valid,
            dirty = state.dirty.bits(),
            "Telemetry committed"
        );
    }

    pub(crate) fn mark_stale(&self, ids: &[PacketId]) {
        let mut state = self.lock();
        for id in ids {
            state.dirty.mark(*id);
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let state = self.lock();
        TelemetrySnapshot {
            buffer: state.buffer,
            dirty: state.dirty,
            ready_at: state.ready_at,
        }
    }

    /// Raw big-endian bytes of a packet, fresh or not.
    pub fn raw_packet(&self, id: PacketId) -> Vec<u8> {
        self.lock().buffer[id.descriptor().range()].to_vec()
    }

    /// Decoded value of an atomic packet, sign-extended where the packet is
    /// signed.
    pub fn sensor_value(&self, id: PacketId) -> Result<i32> {
        let state = self.lock();
        decode_sensor(&state.buffer, state.dirty, id)
    }
}

fn decode_sensor(
    buffer: &[u8; TELEMETRY_BUFFER_LEN],
    dirty: DirtyMask,
    id: PacketId,
) -> Result<i32> {
    if id.is_group() {
        return Err(OiError::invalid_parameter(
            "packet_id",
            format!("{id} is a group packet; read its members"),
        ));
    }
    if dirty.is_stale(id) {
        return Err(OiError::StaleSensor { packet: id });
    }

    let descriptor = id.descriptor();
    let bytes = &buffer[descriptor.range()];
    let value = match (bytes, descriptor.signed) {
        ([b], false) => i32::from(*b),
        ([b], true) => i32::from(*b as i8),
        ([hi, lo], false) => i32::from(u16::from_be_bytes([*hi, *lo])),
        ([hi, lo], true) => i32::from(i16::from_be_bytes([*hi, *lo])),
        _ => unreachable!("atomic packets are one or two bytes wide"),
    };
    Ok(value)
}
