//! Sensor response parsing for query mode and stream mode.
//!
//! Query responses are the raw concatenation of the requested packets.
//! Stream frames look like:
//!
//! ```text
//! [0x13, N, (id, data...)*, checksum]
//! ```
//!
//! where `N` counts the id and data bytes and the checksum makes
//! `N + ids + data + checksum` vanish modulo 256.

use std::io::{ErrorKind, Read};

use tracing::{trace, warn};

use crate::constants::STREAM_HEADER;
use crate::error::{OiError, Result};
use crate::packet::PacketId;
use crate::telemetry::{StagedTelemetry, TelemetryStore};

/// Reads the response to the outstanding query into `store`.
///
/// The outstanding query is consumed whether or not the read succeeds. With
/// no query outstanding nothing is read and an empty list is returned.
pub fn decode_query_response<R: Read>(
    reader: &mut R,
    store: &TelemetryStore,
) -> Result<Vec<PacketId>> {
    let pending = store.take_pending();
    if pending.is_empty() {
        return Ok(pending);
    }

    let mut staged = StagedTelemetry::new();
    for id in &pending {
        if let Err(err) = read_fully(reader, staged.slot_mut(*id)) {
            warn!(packet = %id, error = %err, "Query response cut short");
            store.mark_stale(&pending);
            return Err(err);
        }
        staged.complete(*id);
    }

    store.commit(&staged, true);
    trace!(packets = pending.len(), "Query response decoded");
    Ok(pending)
}

/// Reads one stream frame into `store` and returns the packets it carried.
pub fn decode_stream_frame<R: Read>(
    reader: &mut R,
    store: &TelemetryStore,
) -> Result<Vec<PacketId>> {
    let mut byte = [0_u8; 1];
    read_fully(reader, &mut byte)?;
    if byte[0] != STREAM_HEADER {
        warn!(found = byte[0], "Stream frame missing sync byte");
        return Err(OiError::FailureToSync { found: byte[0] });
    }

    read_fully(reader, &mut byte)?;
    let len = usize::from(byte[0]);
    let mut sum = byte[0];

    let mut staged = StagedTelemetry::new();
    if let Err(err) = read_entries(reader, len, &mut sum, &mut staged) {
        warn!(error = %err, "Stream frame aborted");
        store.commit(&staged, false);
        return Err(err);
    }

    if let Err(err) = read_fully(reader, &mut byte) {
        store.commit(&staged, false);
        return Err(err);
    }
    let checksum = byte[0];
    if checksum.wrapping_add(sum) != 0 {
        warn!(checksum, sum, "Stream frame failed checksum");
        store.commit(&staged, false);
        return Err(OiError::InvalidChecksum { checksum, sum });
    }

    store.commit(&staged, true);
    trace!(len, packets = staged.written().len(), "Stream frame decoded");
    Ok(staged.written().to_vec())
}

fn read_entries<R: Read>(
    reader: &mut R,
    len: usize,
    sum: &mut u8,
    staged: &mut StagedTelemetry,
) -> Result<()> {
    let mut consumed = 0;
    let mut byte = [0_u8; 1];

    while consumed < len {
        read_fully(reader, &mut byte)?;
        *sum = sum.wrapping_add(byte[0]);
        consumed += 1;

        let Ok(id) = PacketId::try_from(byte[0]) else {
            return Err(OiError::FailureToSync { found: byte[0] });
        };
        let width = id.width();
        if consumed + width > len {
            return Err(OiError::FailureToSync { found: byte[0] });
        }

        let slot = staged.slot_mut(id);
        read_fully(reader, slot)?;
        *sum = slot.iter().fold(*sum, |acc, b| acc.wrapping_add(*b));
        consumed += width;
        staged.complete(id);
    }

    Ok(())
}

/// Fills `buf` from `reader`; a short count is a transfer failure.
pub(crate) fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(OiError::short_transfer(buf.len(), filled)),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(OiError::transfer_io(buf.len(), filled, err)),
        }
    }
    Ok(())
}
