//! Off/Passive/Safe/Full state machine deciding which opcodes may be sent.

use crate::constants::{BaudCode, OiMode, Opcode};
use crate::error::{OiError, Result};

/// Which modes an opcode may be sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequirement {
    Any,
    /// Passive, Safe or Full.
    Started,
    /// Safe or Full.
    Actuation,
}

impl ModeRequirement {
    pub fn for_opcode(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Start => Self::Any,
            Opcode::Drive
            | Opcode::DriveDirect
            | Opcode::DrivePwm
            | Opcode::Motors
            | Opcode::PwmMotors
            | Opcode::Leds
            | Opcode::SchedulingLeds
            | Opcode::DigitLedsRaw
            | Opcode::DigitLedsAscii
            | Opcode::Play => Self::Actuation,
            _ => Self::Started,
        }
    }

    pub fn allows(self, mode: OiMode) -> bool {
        match self {
            Self::Any => true,
            Self::Started => mode != OiMode::Off,
            Self::Actuation => matches!(mode, OiMode::Safe | OiMode::Full),
        }
    }
}

/// Current OI mode plus the baud code the robot is talking at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeGate {
    mode: OiMode,
    baud: BaudCode,
}

impl ModeGate {
    pub fn new(baud: BaudCode) -> Self {
        Self {
            mode: OiMode::Off,
            baud,
        }
    }

    pub fn mode(&self) -> OiMode {
        self.mode
    }

    pub fn baud(&self) -> BaudCode {
        self.baud
    }

    /// Checks that `opcode` may be sent in the current mode.
    pub fn authorize(&self, opcode: Opcode) -> Result<()> {
        if ModeRequirement::for_opcode(opcode).allows(self.mode) {
            return Ok(());
        }

        if self.mode == OiMode::Off {
            Err(OiError::OiNotStarted)
        } else {
            Err(OiError::InvalidModeForRequestedOperation {
                opcode,
                mode: self.mode,
            })
        }
    }

    /// Mode the robot ends up in once `opcode` has been sent.
    pub fn next_mode(&self, opcode: Opcode) -> OiMode {
        match opcode {
            Opcode::Start
            | Opcode::Clean
            | Opcode::Max
            | Opcode::Spot
            | Opcode::SeekDock
            | Opcode::Power => OiMode::Passive,
            Opcode::Control | Opcode::Safe => OiMode::Safe,
            Opcode::Full => OiMode::Full,
            _ => self.mode,
        }
    }

    /// Records a successfully transmitted opcode.
    pub(crate) fn apply(&mut self, opcode: Opcode) {
        self.mode = self.next_mode(opcode);
    }

    pub(crate) fn set_baud(&mut self, baud: BaudCode) {
        self.baud = baud;
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::{ModeGate, ModeRequirement};
    use crate::constants::{BaudCode, OiMode, Opcode};
    use crate::error::OiError;

    fn gate_in(mode: OiMode) -> ModeGate {
        let mut gate = ModeGate::new(BaudCode::Baud115200);
        match mode {
            OiMode::Off => {}
            OiMode::Passive => gate.apply(Opcode::Start),
            OiMode::Safe => {
                gate.apply(Opcode::Start);
                gate.apply(Opcode::Safe);
            }
            OiMode::Full => {
                gate.apply(Opcode::Start);
                gate.apply(Opcode::Full);
            }
        }
        assert_eq!(gate.mode(), mode);
        gate
    }

    #[test]
    fn everything_but_start_needs_a_started_interface() {
        let gate = gate_in(OiMode::Off);
        for opcode in Opcode::iter() {
            let result = gate.authorize(opcode);
            if opcode == Opcode::Start {
                assert!(result.is_ok());
            } else {
                assert!(matches!(result, Err(OiError::OiNotStarted)), "{opcode}");
            }
        }
    }

    #[test]
    fn actuation_is_rejected_in_passive() {
        let gate = gate_in(OiMode::Passive);
        for opcode in Opcode::iter() {
            let result = gate.authorize(opcode);
            if ModeRequirement::for_opcode(opcode) == ModeRequirement::Actuation {
                assert!(
                    matches!(
                        result,
                        Err(OiError::InvalidModeForRequestedOperation {
                            mode: OiMode::Passive,
                            ..
                        })
                    ),
                    "{opcode}"
                );
            } else {
                assert!(result.is_ok(), "{opcode}");
            }
        }
    }

    #[test]
    fn safe_and_full_allow_every_opcode() {
        for mode in [OiMode::Safe, OiMode::Full] {
            let gate = gate_in(mode);
            assert!(Opcode::iter().all(|opcode| gate.authorize(opcode).is_ok()));
        }
    }

    #[test]
    fn start_always_lands_in_passive() {
        for mode in OiMode::iter() {
            let mut gate = gate_in(mode);
            gate.apply(Opcode::Start);
            assert_eq!(gate.mode(), OiMode::Passive);
        }
    }

    #[test]
    fn cleaning_commands_drop_back_to_passive() {
        for opcode in [
            Opcode::Clean,
            Opcode::Max,
            Opcode::Spot,
            Opcode::SeekDock,
            Opcode::Power,
        ] {
            let mut gate = gate_in(OiMode::Full);
            gate.apply(opcode);
            assert_eq!(gate.mode(), OiMode::Passive, "{opcode}");
        }
    }

    #[test]
    fn control_enters_safe_and_other_commands_keep_mode() {
        let mut gate = gate_in(OiMode::Passive);
        gate.apply(Opcode::Control);
        assert_eq!(gate.mode(), OiMode::Safe);

        gate.apply(Opcode::Drive);
        gate.apply(Opcode::Baud);
        gate.apply(Opcode::Sensors);
        assert_eq!(gate.mode(), OiMode::Safe);

        gate.apply(Opcode::Full);
        assert_eq!(gate.mode(), OiMode::Full);
    }
}
