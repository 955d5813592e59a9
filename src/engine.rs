use std::io::{Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

use crate::command::{ClockTime, Command, Note, filter_packet_ids};
use crate::constants::{BAUD_SETTLE_DELAY, BaudCode, OiMode, Weekday};
use crate::decoder::{decode_query_response, decode_stream_frame};
use crate::error::{OiError, Result};
use crate::mode::ModeGate;
use crate::packet::PacketId;
use crate::telemetry::TelemetryStore;
#[cfg(feature = "serial")]
use crate::transport::serial::{SerialOptions, SerialTransport, SerialTransportError};

/// Command encoder and telemetry decoder bound to one transport.
///
/// All methods take `&self`; the engine can be shared between a control
/// thread and a telemetry thread. Locks are taken in the order transport,
/// mode gate, telemetry store, and only the transport lock is held across
/// I/O.
pub struct ProtocolEngine<T> {
    io: Mutex<T>,
    gate: Mutex<ModeGate>,
    telemetry: TelemetryStore,
}

impl<T: Read + Write> ProtocolEngine<T> {
    /// Engine for a robot talking at the factory default of 115200 bps.
    pub fn new(io: T) -> Self {
        Self::with_baud(io, BaudCode::default())
    }

    pub fn with_baud(io: T, baud: BaudCode) -> Self {
        Self {
            io: Mutex::new(io),
            gate: Mutex::new(ModeGate::new(baud)),
            telemetry: TelemetryStore::new(baud),
        }
    }

    pub fn into_inner(self) -> T {
        self.io.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> OiMode {
        self.lock_gate().mode()
    }

    pub fn current_baud(&self) -> BaudCode {
        self.lock_gate().baud()
    }

    pub fn telemetry(&self) -> &TelemetryStore {
        &self.telemetry
    }

    /// Runs `f` with exclusive access to the transport, e.g. to change the
    /// host-side baud rate after [`ProtocolEngine::baud`].
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock_io())
    }

    /// Validates, transmits and records a command.
    ///
    /// Returns the bytes written. Mode, baud and telemetry bookkeeping change
    /// only after the whole frame has been accepted by the transport.
    pub fn send(&self, command: &Command) -> Result<Vec<u8>> {
        let mut io = self.lock_io();
        let opcode = command.opcode();

        if let Err(err) = self.lock_gate().authorize(opcode) {
            warn!(%opcode, error = %err, "Command rejected by mode gate");
            return Err(err);
        }
        let frame = command.encode().inspect_err(|err| {
            warn!(%opcode, error = %err, "Command rejected");
        })?;

        write_frame(&mut *io, &frame)?;
        trace!(%opcode, bytes = ?frame, "Frame written");

        {
            let mut gate = self.lock_gate();
            let before = gate.mode();
            gate.apply(opcode);
            if let Command::Baud(code) = command {
                gate.set_baud(*code);
            }
            if gate.mode() != before {
                debug!(from = %before, to = %gate.mode(), "OI mode changed");
            }
        }

        match command {
            Command::Baud(code) => {
                self.telemetry.set_baud(*code);
                debug!(baud = %code, "Baud rate changed; waiting for robot UART");
                std::thread::sleep(BAUD_SETTLE_DELAY);
            }
            Command::Sensors(_) | Command::QueryList(_) => {
                let ids = command.requested_packets().unwrap_or_default();
                let delay = self.telemetry.arm_query(ids);
                debug!(?delay, "Query armed");
            }
            Command::Stream(ids) => {
                let delay = self.telemetry.arm_stream(ids.clone());
                debug!(?delay, packets = ids.len(), "Stream subscribed");
            }
            Command::PauseResumeStream(resume) => self.telemetry.set_streaming(*resume),
            _ => {}
        }

        Ok(frame)
    }

    pub fn start(&self) -> Result<Vec<u8>> {
        self.send(&Command::Start)
    }

    /// Changes the robot's baud rate and blocks for the UART settle time.
    ///
    /// The host side of the link must be switched separately, see
    /// [`ProtocolEngine::with_transport`].
    pub fn baud(&self, code: BaudCode) -> Result<Vec<u8>> {
        self.send(&Command::Baud(code))
    }

    pub fn control(&self) -> Result<Vec<u8>> {
        self.send(&Command::Control)
    }

    pub fn safe(&self) -> Result<Vec<u8>> {
        self.send(&Command::Safe)
    }

    pub fn full(&self) -> Result<Vec<u8>> {
        self.send(&Command::Full)
    }

    pub fn clean(&self) -> Result<Vec<u8>> {
        self.send(&Command::Clean)
    }

    pub fn max(&self) -> Result<Vec<u8>> {
        self.send(&Command::Max)
    }

    pub fn spot(&self) -> Result<Vec<u8>> {
        self.send(&Command::Spot)
    }

    pub fn seek_dock(&self) -> Result<Vec<u8>> {
        self.send(&Command::SeekDock)
    }

    pub fn power(&self) -> Result<Vec<u8>> {
        self.send(&Command::Power)
    }

    pub fn drive(&self, velocity: i16, radius: i16) -> Result<Vec<u8>> {
        self.send(&Command::Drive { velocity, radius })
    }

    pub fn drive_direct(&self, left: i16, right: i16) -> Result<Vec<u8>> {
        self.send(&Command::DriveDirect { left, right })
    }

    pub fn drive_pwm(&self, left: i16, right: i16) -> Result<Vec<u8>> {
        self.send(&Command::DrivePwm { left, right })
    }

    pub fn motors(&self, mask: u8) -> Result<Vec<u8>> {
        self.send(&Command::Motors(mask))
    }

    pub fn pwm_motors(&self, main_brush: i8, side_brush: i8, vacuum: i8) -> Result<Vec<u8>> {
        self.send(&Command::PwmMotors {
            main_brush,
            side_brush,
            vacuum,
        })
    }

    pub fn leds(&self, mask: u8, color: u8, intensity: u8) -> Result<Vec<u8>> {
        self.send(&Command::Leds {
            mask,
            color,
            intensity,
        })
    }

    pub fn scheduling_leds(&self, days: u8, leds: u8) -> Result<Vec<u8>> {
        self.send(&Command::SchedulingLeds { days, leds })
    }

    pub fn digit_leds_raw(&self, segments: [u8; 4]) -> Result<Vec<u8>> {
        self.send(&Command::DigitLedsRaw(segments))
    }

    /// Shows four printable ASCII characters on the digit display.
    pub fn digit_leds_ascii(&self, digits: [char; 4]) -> Result<Vec<u8>> {
        // Characters beyond one byte map to 0 so encoding rejects them.
        let bytes = digits.map(|c| u8::try_from(c).unwrap_or(0));
        self.send(&Command::DigitLedsAscii(bytes))
    }

    pub fn buttons(&self, mask: u8) -> Result<Vec<u8>> {
        self.send(&Command::Buttons(mask))
    }

    pub fn song(&self, number: u8, notes: &[Note]) -> Result<Vec<u8>> {
        self.send(&Command::Song {
            number,
            notes: notes.to_vec(),
        })
    }

    pub fn play(&self, number: u8) -> Result<Vec<u8>> {
        self.send(&Command::Play(number))
    }

    /// Requests a single packet. Read the answer with
    /// [`ProtocolEngine::read_query_response`].
    pub fn sensors(&self, id: u8) -> Result<Vec<u8>> {
        let id = PacketId::try_from(id)?;
        self.send(&Command::Sensors(id))
    }

    /// Requests several packets at once. Unknown ids are dropped.
    pub fn query_list(&self, ids: &[u8]) -> Result<Vec<u8>> {
        self.send(&Command::QueryList(filter_packet_ids(ids)))
    }

    /// Subscribes to a stream of packets every 15 ms. Unknown ids are dropped.
    pub fn stream(&self, ids: &[u8]) -> Result<Vec<u8>> {
        self.send(&Command::Stream(filter_packet_ids(ids)))
    }

    pub fn pause_resume_stream(&self, resume: bool) -> Result<Vec<u8>> {
        self.send(&Command::PauseResumeStream(resume))
    }

    pub fn schedule(&self, days: u8, times: Option<[ClockTime; 7]>) -> Result<Vec<u8>> {
        self.send(&Command::Schedule { days, times })
    }

    pub fn set_day_time(&self, day: Weekday, hour: u8, minute: u8) -> Result<Vec<u8>> {
        self.send(&Command::SetDayTime {
            day,
            time: ClockTime::new(hour, minute),
        })
    }

    /// Reads the answer to the last `sensors` / `queryList` request.
    ///
    /// Callers should wait for [`TelemetryStore::time_until_ready`] first.
    pub fn read_query_response(&self) -> Result<Vec<PacketId>> {
        let mut io = self.lock_io();
        decode_query_response(&mut *io, &self.telemetry)
    }

    /// Reads one frame of the active stream.
    pub fn read_stream_frame(&self) -> Result<Vec<PacketId>> {
        let mut io = self.lock_io();
        decode_stream_frame(&mut *io, &self.telemetry)
    }

    fn lock_io(&self) -> MutexGuard<'_, T> {
        self.io.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_gate(&self) -> MutexGuard<'_, ModeGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write_frame<W: Write>(io: &mut W, frame: &[u8]) -> Result<()> {
    let written = io
        .write(frame)
        .map_err(|err| OiError::transfer_io(frame.len(), 0, err))?;
    if written != frame.len() {
        warn!(expected = frame.len(), written, "Short write");
        return Err(OiError::short_transfer(frame.len(), written));
    }
    io.flush()
        .map_err(|err| OiError::transfer_io(frame.len(), written, err))
}

#[cfg(feature = "serial")]
impl ProtocolEngine<SerialTransport> {
    pub fn open_serial(path: &str) -> Result<Self, SerialTransportError> {
        Self::open_serial_with(path, SerialOptions::default())
    }

    pub fn open_serial_with(
        path: &str,
        options: SerialOptions,
    ) -> Result<Self, SerialTransportError> {
        let baud = options.baud;
        Ok(Self::with_baud(
            SerialTransport::open_with(path, options)?,
            baud,
        ))
    }
}
