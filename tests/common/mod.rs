use std::collections::VecDeque;
use std::io::{Read, Write};

use roomba_oi::{PacketId, TELEMETRY_BUFFER_LEN};

/// Robot stand-in that answers sensor requests from a fixed sensor image.
///
/// Each `write` is treated as one command frame, matching how the engine
/// transmits.
pub struct FakeRobot {
    pub sensors: [u8; TELEMETRY_BUFFER_LEN],
    pub received: Vec<Vec<u8>>,
    pending: VecDeque<u8>,
}

impl FakeRobot {
    pub fn new(sensors: [u8; TELEMETRY_BUFFER_LEN]) -> Self {
        Self {
            sensors,
            received: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn packet_bytes(&self, id: PacketId) -> &[u8] {
        &self.sensors[id.descriptor().range()]
    }

    /// Queues one stream frame carrying `ids`.
    pub fn emit_stream_frame(&mut self, ids: &[PacketId]) {
        let mut body = Vec::new();
        for id in ids {
            body.push(id.raw());
            body.extend_from_slice(self.packet_bytes(*id));
        }
        let len = body.len() as u8;
        let sum = body.iter().fold(len, |acc, b| acc.wrapping_add(*b));
        self.pending.push_back(19);
        self.pending.push_back(len);
        self.pending.extend(body);
        self.pending.push_back(sum.wrapping_neg());
    }

    pub fn emit_raw(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    pub fn unread(&self) -> usize {
        self.pending.len()
    }

    fn answer(&mut self, frame: &[u8]) {
        match frame {
            [142, id] => self.answer_query(&[*id]),
            [149, _, ids @ ..] => self.answer_query(ids),
            [148, _, ids @ ..] => {
                let ids: Vec<PacketId> = ids.iter().filter_map(|id| PacketId::try_from(*id).ok()).collect();
                self.emit_stream_frame(&ids);
            }
            _ => {}
        }
    }

    fn answer_query(&mut self, ids: &[u8]) {
        for id in ids.iter().filter_map(|id| PacketId::try_from(*id).ok()) {
            let bytes = self.packet_bytes(id).to_vec();
            self.pending.extend(bytes);
        }
    }
}

impl Read for FakeRobot {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for FakeRobot {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.received.push(buf.to_vec());
        self.answer(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
