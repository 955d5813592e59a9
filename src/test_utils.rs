//! In-memory transport for exercising the engine without a robot.

#![cfg(test)]

use std::collections::VecDeque;
use std::io::{Read, Write};

/// Scripted transport: reads drain `rx`, writes append to `tx`.
#[derive(Debug, Default)]
pub struct MockTransport {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    write_limit: Option<usize>,
    write_calls: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rx(bytes: &[u8]) -> Self {
        let mut transport = Self::new();
        transport.feed(bytes);
        transport
    }

    /// Accept at most `limit` bytes per write call.
    pub fn with_write_limit(limit: usize) -> Self {
        Self {
            write_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    pub fn remaining_rx(&self) -> usize {
        self.rx.len()
    }
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_calls += 1;
        let n = self.write_limit.map_or(buf.len(), |limit| buf.len().min(limit));
        self.tx.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Builds a stream frame whose checksum balances the running sum from `N`.
pub fn stream_frame(entries: &[(u8, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (id, data) in entries {
        body.push(*id);
        body.extend_from_slice(data);
    }

    let mut frame = vec![crate::constants::STREAM_HEADER, body.len() as u8];
    frame.extend_from_slice(&body);
    let sum = frame[1..]
        .iter()
        .fold(0_u8, |acc, byte| acc.wrapping_add(*byte));
    frame.push(sum.wrapping_neg());
    frame
}
