//! Byte transports for talking to the robot.
//!
//! The engine works over any `Read + Write`; this module provides the
//! serial-port adapter.

#[cfg(feature = "serial")]
pub mod serial;
