//! Error taxonomy for command encoding and telemetry decoding.
//!
//! Errors fall into three groups, each with a helper telling the caller how
//! to react:
//!
//! - usage errors ([`OiError::is_usage_error`]): bad parameters or a command
//!   sent in the wrong mode. Fix the call site.
//! - transfer errors ([`OiError::is_retryable`]): the transport moved fewer
//!   bytes than asked. Retry at the caller's discretion.
//! - framing errors ([`OiError::requires_resync`]): the stream lost sync or
//!   failed its checksum. Discard the telemetry and resynchronize.

use num_enum::TryFromPrimitiveError;
use thiserror::Error;

use crate::constants::{BaudCode, OiMode, Opcode, Weekday};
use crate::packet::PacketId;

/// Result type alias for Open Interface operations.
pub type Result<T, E = OiError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OiError {
    #[error("Open Interface not started; send `start` first")]
    OiNotStarted,

    #[error("`{opcode}` is not allowed in {mode} mode")]
    InvalidModeForRequestedOperation { opcode: Opcode, mode: OiMode },

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Serial transfer failed: expected {expected} bytes, transferred {actual}")]
    SerialTransferFailure {
        expected: usize,
        actual: usize,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Stream lost sync at byte {found:#04x}")]
    FailureToSync { found: u8 },

    #[error("Stream frame checksum {checksum:#04x} does not balance running sum {sum:#04x}")]
    InvalidChecksum { checksum: u8, sum: u8 },

    #[error("Sensor data for {packet} is stale")]
    StaleSensor { packet: PacketId },
}

impl OiError {
    /// Transfer failures may succeed if the caller tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SerialTransferFailure { .. })
    }

    /// Framing failures mean the current telemetry should be discarded.
    pub fn requires_resync(&self) -> bool {
        matches!(self, Self::FailureToSync { .. } | Self::InvalidChecksum { .. })
    }

    /// Programming errors at the call site.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::OiNotStarted
                | Self::InvalidModeForRequestedOperation { .. }
                | Self::InvalidParameter { .. }
        )
    }

    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn short_transfer(expected: usize, actual: usize) -> Self {
        Self::SerialTransferFailure {
            expected,
            actual,
            source: None,
        }
    }

    pub(crate) fn transfer_io(expected: usize, actual: usize, source: std::io::Error) -> Self {
        Self::SerialTransferFailure {
            expected,
            actual,
            source: Some(source),
        }
    }
}

impl From<TryFromPrimitiveError<BaudCode>> for OiError {
    fn from(value: TryFromPrimitiveError<BaudCode>) -> Self {
        Self::invalid_parameter("baud_code", format!("{} is not in 0..=11", value.number))
    }
}

impl From<TryFromPrimitiveError<PacketId>> for OiError {
    fn from(value: TryFromPrimitiveError<PacketId>) -> Self {
        Self::invalid_parameter(
            "packet_id",
            format!("{} is not a known sensor packet", value.number),
        )
    }
}

impl From<TryFromPrimitiveError<Weekday>> for OiError {
    fn from(value: TryFromPrimitiveError<Weekday>) -> Self {
        Self::invalid_parameter("day", format!("{} is not in 0..=6", value.number))
    }
}
