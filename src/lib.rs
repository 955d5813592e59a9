//! Host-side driver for the iRobot Roomba 500-series Open Interface.
//!
//! The recommended API surface is:
//! - [`ProtocolEngine`] for sending commands and reading sensor responses
//! - [`TelemetryStore`] for the decoded sensor state and its staleness
//! - [`PacketId`] for the sensor packet table
//! - [`transport`] for serial I/O adapters
//!
//! Lower-level pieces ([`Command`], [`ModeGate`], the decoders and the timing
//! calculator) are exported for callers that manage their own transport.

mod command;
/// Opcodes, modes, baud codes and the bitmask constants used by commands.
pub mod constants;
mod decoder;
mod engine;
mod error;
mod mode;
mod packet;
mod telemetry;
#[cfg(test)]
mod test_utils;
mod timing;
/// Transport adapters for connecting to a robot.
pub mod transport;

/// Typed commands and their wire encoding.
pub use command::{ClockTime, Command, Note, filter_packet_ids};
pub use constants::{BaudCode, OiMode, Opcode, Weekday};
/// Query-response and stream-frame parsers.
pub use decoder::{decode_query_response, decode_stream_frame};
pub use engine::ProtocolEngine;
/// Errors returned by every fallible operation.
pub use error::{OiError, Result};
pub use mode::{ModeGate, ModeRequirement};
pub use packet::{MAX_REQUESTED_PACKETS, PacketDescriptor, PacketId, TELEMETRY_BUFFER_LEN};
pub use telemetry::{DirtyMask, TelemetrySnapshot, TelemetryStore};
/// Response size and delay estimates.
pub use timing::{response_delay, response_len};
