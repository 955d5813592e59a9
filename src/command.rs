//! Typed Open Interface commands and their wire encoding.

use std::ops::RangeInclusive;

use crate::constants::{
    BaudCode, MAX_PWM, MAX_RADIUS, MAX_SONG_NOTES, MAX_SONG_NUMBER, MAX_VELOCITY, Opcode,
    RADIUS_STRAIGHT, Weekday,
};
use crate::error::{OiError, Result};
use crate::packet::{MAX_REQUESTED_PACKETS, PacketId};

const PRINTABLE_ASCII: RangeInclusive<u8> = 32..=126;

/// One note of a song: MIDI pitch and duration in 1/64ths of a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub pitch: u8,
    pub duration: u8,
}

impl Note {
    pub fn new(pitch: u8, duration: u8) -> Self {
        Self { pitch, duration }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Baud(BaudCode),
    Control,
    Safe,
    Full,
    Power,
    Spot,
    Clean,
    Max,
    SeekDock,
    /// Velocity in mm/s, radius in mm. [`RADIUS_STRAIGHT`] drives straight.
    Drive { velocity: i16, radius: i16 },
    DriveDirect { left: i16, right: i16 },
    DrivePwm { left: i16, right: i16 },
    Motors(u8),
    PwmMotors { main_brush: i8, side_brush: i8, vacuum: i8 },
    Leds { mask: u8, color: u8, intensity: u8 },
    SchedulingLeds { days: u8, leds: u8 },
    DigitLedsRaw([u8; 4]),
    DigitLedsAscii([u8; 4]),
    Buttons(u8),
    Song { number: u8, notes: Vec<Note> },
    Play(u8),
    Sensors(PacketId),
    QueryList(Vec<PacketId>),
    Stream(Vec<PacketId>),
    PauseResumeStream(bool),
    /// `times` is indexed Sunday first. `None` clears the schedule.
    Schedule { days: u8, times: Option<[ClockTime; 7]> },
    SetDayTime { day: Weekday, time: ClockTime },
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Start => Opcode::Start,
            Self::Baud(_) => Opcode::Baud,
            Self::Control => Opcode::Control,
            Self::Safe => Opcode::Safe,
            Self::Full => Opcode::Full,
            Self::Power => Opcode::Power,
            Self::Spot => Opcode::Spot,
            Self::Clean => Opcode::Clean,
            Self::Max => Opcode::Max,
            Self::SeekDock => Opcode::SeekDock,
            Self::Drive { .. } => Opcode::Drive,
            Self::DriveDirect { .. } => Opcode::DriveDirect,
            Self::DrivePwm { .. } => Opcode::DrivePwm,
            Self::Motors(_) => Opcode::Motors,
            Self::PwmMotors { .. } => Opcode::PwmMotors,
            Self::Leds { .. } => Opcode::Leds,
            Self::SchedulingLeds { .. } => Opcode::SchedulingLeds,
            Self::DigitLedsRaw(_) => Opcode::DigitLedsRaw,
            Self::DigitLedsAscii(_) => Opcode::DigitLedsAscii,
            Self::Buttons(_) => Opcode::Buttons,
            Self::Song { .. } => Opcode::Song,
            Self::Play(_) => Opcode::Play,
            Self::Sensors(_) => Opcode::Sensors,
            Self::QueryList(_) => Opcode::QueryList,
            Self::Stream(_) => Opcode::Stream,
            Self::PauseResumeStream(_) => Opcode::PauseResumeStream,
            Self::Schedule { .. } => Opcode::Schedule,
            Self::SetDayTime { .. } => Opcode::SetDayTime,
        }
    }

    /// Validates the parameters and produces the exact bytes to transmit.
    ///
    /// Masks are truncated to the bits the robot understands; out-of-range
    /// values are rejected with [`OiError::InvalidParameter`].
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = vec![u8::from(self.opcode())];

        match self {
            Self::Start
            | Self::Control
            | Self::Safe
            | Self::Full
            | Self::Power
            | Self::Spot
            | Self::Clean
            | Self::Max
            | Self::SeekDock => {}
            Self::Baud(code) => out.push(u8::from(*code)),
            Self::Drive { velocity, radius } => {
                check_range("velocity", *velocity, -MAX_VELOCITY..=MAX_VELOCITY)?;
                if *radius != RADIUS_STRAIGHT {
                    check_range("radius", *radius, -MAX_RADIUS..=MAX_RADIUS)?;
                }
                out.extend_from_slice(&velocity.to_be_bytes());
                out.extend_from_slice(&radius.to_be_bytes());
            }
            Self::DriveDirect { left, right } => {
                check_range("left", *left, -MAX_VELOCITY..=MAX_VELOCITY)?;
                check_range("right", *right, -MAX_VELOCITY..=MAX_VELOCITY)?;
                out.extend_from_slice(&right.to_be_bytes());
                out.extend_from_slice(&left.to_be_bytes());
            }
            Self::DrivePwm { left, right } => {
                check_range("left", *left, -MAX_PWM..=MAX_PWM)?;
                check_range("right", *right, -MAX_PWM..=MAX_PWM)?;
                out.extend_from_slice(&right.to_be_bytes());
                out.extend_from_slice(&left.to_be_bytes());
            }
            Self::Motors(mask) => out.push(mask & 0x1F),
            Self::PwmMotors {
                main_brush,
                side_brush,
                vacuum,
            } => {
                if *main_brush == i8::MIN {
                    return Err(OiError::invalid_parameter("main_brush", "-128 is not encodable"));
                }
                if *side_brush == i8::MIN {
                    return Err(OiError::invalid_parameter("side_brush", "-128 is not encodable"));
                }
                if *vacuum < 0 {
                    return Err(OiError::invalid_parameter(
                        "vacuum",
                        format!("{vacuum} is negative"),
                    ));
                }
                out.extend([main_brush, side_brush, vacuum].map(|duty| duty.to_be_bytes()[0]));
            }
            Self::Leds {
                mask,
                color,
                intensity,
            } => out.extend([mask & 0x0F, *color, *intensity]),
            Self::SchedulingLeds { days, leds } => out.extend([days & 0x7F, leds & 0x1F]),
            Self::DigitLedsRaw(segments) => out.extend(segments.map(|s| s & 0x7F)),
            Self::DigitLedsAscii(chars) => {
                if let Some(bad) = chars.iter().find(|&&c| !PRINTABLE_ASCII.contains(&c)) {
                    return Err(OiError::invalid_parameter(
                        "digits",
                        format!("character code {bad} is outside 32..=126"),
                    ));
                }
                out.extend_from_slice(chars);
            }
            Self::Buttons(mask) => out.push(*mask),
            Self::Song { number, notes } => {
                check_song_number(*number)?;
                if notes.is_empty() || notes.len() > MAX_SONG_NOTES {
                    return Err(OiError::invalid_parameter(
                        "notes",
                        format!("{} notes given, expected 1..={MAX_SONG_NOTES}", notes.len()),
                    ));
                }
                out.push(*number);
                out.push(notes.len() as u8);
                for note in notes {
                    out.extend([note.pitch, note.duration]);
                }
            }
            Self::Play(number) => {
                check_song_number(*number)?;
                out.push(*number);
            }
            Self::Sensors(id) => out.push(id.raw()),
            Self::QueryList(ids) | Self::Stream(ids) => {
                check_packet_list(ids)?;
                out.push(ids.len() as u8);
                out.extend(ids.iter().map(|id| id.raw()));
            }
            Self::PauseResumeStream(resume) => out.push(u8::from(*resume)),
            Self::Schedule { days, times } => encode_schedule(&mut out, *days, times.as_ref()),
            Self::SetDayTime { day, time } => {
                check_range("hour", time.hour, 0..=23)?;
                check_range("minute", time.minute, 0..=59)?;
                out.extend([u8::from(*day), time.hour, time.minute]);
            }
        }

        Ok(out)
    }

    /// Packet ids this command asks the robot to send back.
    pub fn requested_packets(&self) -> Option<Vec<PacketId>> {
        match self {
            Self::Sensors(id) => Some(vec![*id]),
            Self::QueryList(ids) | Self::Stream(ids) => Some(ids.clone()),
            _ => None,
        }
    }
}

/// Drops ids that do not name a sensor packet.
pub fn filter_packet_ids(raw: &[u8]) -> Vec<PacketId> {
    raw.iter()
        .filter_map(|&id| PacketId::try_from(id).ok())
        .collect()
}

fn check_range<T>(name: &'static str, value: T, range: RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(OiError::invalid_parameter(
            name,
            format!("{value} is outside {}..={}", range.start(), range.end()),
        ))
    }
}

fn check_song_number(number: u8) -> Result<()> {
    check_range("song_number", number, 0..=MAX_SONG_NUMBER)
}

fn check_packet_list(ids: &[PacketId]) -> Result<()> {
    if ids.is_empty() {
        return Err(OiError::invalid_parameter(
            "packet_ids",
            "no valid packet ids requested",
        ));
    }
    if ids.len() > MAX_REQUESTED_PACKETS {
        return Err(OiError::invalid_parameter(
            "packet_ids",
            format!(
                "{} packets requested, at most {MAX_REQUESTED_PACKETS} allowed",
                ids.len()
            ),
        ));
    }
    Ok(())
}

fn encode_schedule(out: &mut Vec<u8>, days: u8, times: Option<&[ClockTime; 7]>) {
    let Some(times) = times else {
        out.extend([0; 15]);
        return;
    };

    let mut mask = days & 0x7F;
    let mut slots = [0_u8; 14];
    for (day, time) in times.iter().enumerate() {
        let bit = 1 << day;
        if mask & bit == 0 {
            continue;
        }
        if time.hour < 23 && time.minute <= 59 {
            slots[day * 2] = time.hour;
            slots[day * 2 + 1] = time.minute;
        } else {
            mask &= !bit;
        }
    }

    out.push(mask);
    out.extend_from_slice(&slots);
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{ClockTime, Command, Note, filter_packet_ids};
    use crate::constants::{BaudCode, RADIUS_STRAIGHT, Weekday};
    use crate::error::OiError;
    use crate::packet::PacketId;

    fn invalid(command: Command) -> bool {
        matches!(command.encode(), Err(OiError::InvalidParameter { .. }))
    }

    #[test]
    fn single_byte_commands() {
        assert_eq!(Command::Start.encode().unwrap(), vec![128]);
        assert_eq!(Command::Control.encode().unwrap(), vec![130]);
        assert_eq!(Command::SeekDock.encode().unwrap(), vec![143]);
        assert_eq!(Command::Power.encode().unwrap(), vec![133]);
    }

    #[test]
    fn baud_carries_its_code() {
        assert_eq!(
            Command::Baud(BaudCode::Baud19200).encode().unwrap(),
            vec![129, 7]
        );
    }

    #[test]
    fn drive_is_big_endian() {
        let bytes = Command::Drive {
            velocity: -200,
            radius: 500,
        }
        .encode()
        .unwrap();
        assert_eq!(bytes, vec![137, 0xFF, 0x38, 0x01, 0xF4]);

        let straight = Command::Drive {
            velocity: 500,
            radius: RADIUS_STRAIGHT,
        }
        .encode()
        .unwrap();
        assert_eq!(straight, vec![137, 0x01, 0xF4, 0x7F, 0xFF]);
    }

    #[test]
    fn drive_rejects_out_of_range() {
        assert!(invalid(Command::Drive {
            velocity: 501,
            radius: 0
        }));
        assert!(invalid(Command::Drive {
            velocity: 0,
            radius: -2001
        }));
        assert!(invalid(Command::Drive {
            velocity: 0,
            radius: 32766
        }));
    }

    #[test]
    fn wheel_commands_send_right_before_left() {
        let direct = Command::DriveDirect {
            left: 100,
            right: -100,
        }
        .encode()
        .unwrap();
        assert_eq!(direct, vec![145, 0xFF, 0x9C, 0x00, 0x64]);

        let pwm = Command::DrivePwm {
            left: -255,
            right: 255,
        }
        .encode()
        .unwrap();
        assert_eq!(pwm, vec![146, 0x00, 0xFF, 0xFF, 0x01]);

        assert!(invalid(Command::DrivePwm {
            left: 256,
            right: 0
        }));
        assert!(invalid(Command::DriveDirect {
            left: 0,
            right: -501
        }));
    }

    #[test]
    fn masks_are_truncated() {
        assert_eq!(Command::Motors(0xFF).encode().unwrap(), vec![138, 0x1F]);
        assert_eq!(
            Command::Leds {
                mask: 0xFF,
                color: 128,
                intensity: 255
            }
            .encode()
            .unwrap(),
            vec![139, 0x0F, 128, 255]
        );
        assert_eq!(
            Command::SchedulingLeds {
                days: 0xFF,
                leds: 0xFF
            }
            .encode()
            .unwrap(),
            vec![162, 0x7F, 0x1F]
        );
        assert_eq!(
            Command::DigitLedsRaw([0xFF, 0x80, 0x01, 0x7F])
                .encode()
                .unwrap(),
            vec![163, 0x7F, 0x00, 0x01, 0x7F]
        );
    }

    #[test]
    fn pwm_motors_limits() {
        assert_eq!(
            Command::PwmMotors {
                main_brush: -127,
                side_brush: 64,
                vacuum: 127
            }
            .encode()
            .unwrap(),
            vec![144, 0x81, 0x40, 0x7F]
        );
        assert!(invalid(Command::PwmMotors {
            main_brush: -128,
            side_brush: 0,
            vacuum: 0
        }));
        assert!(invalid(Command::PwmMotors {
            main_brush: 0,
            side_brush: -128,
            vacuum: 0
        }));
        assert!(invalid(Command::PwmMotors {
            main_brush: 0,
            side_brush: 0,
            vacuum: -1
        }));
    }

    #[test]
    fn ascii_digits_reject_whole_command_on_one_bad_char() {
        assert_eq!(
            Command::DigitLedsAscii(*b"ZAK ").encode().unwrap(),
            vec![164, b'Z', b'A', b'K', b' ']
        );
        assert!(invalid(Command::DigitLedsAscii([b'Z', b'A', b'K', 0x01])));
        assert!(invalid(Command::DigitLedsAscii([127, b'A', b'K', b'Z'])));
    }

    #[test]
    fn song_layout_and_limits() {
        let bytes = Command::Song {
            number: 2,
            notes: vec![Note::new(60, 32), Note::new(64, 16)],
        }
        .encode()
        .unwrap();
        assert_eq!(bytes, vec![140, 2, 2, 60, 32, 64, 16]);

        assert!(invalid(Command::Song {
            number: 5,
            notes: vec![Note::new(60, 32)]
        }));
        assert!(invalid(Command::Song {
            number: 0,
            notes: vec![]
        }));
        assert!(invalid(Command::Song {
            number: 0,
            notes: vec![Note::new(60, 8); 17]
        }));
        assert!(invalid(Command::Play(5)));
        assert_eq!(Command::Play(4).encode().unwrap(), vec![141, 4]);
    }

    #[test]
    fn packet_lists() {
        let ids = filter_packet_ids(&[7, 59, 102, 19, 200, 100]);
        assert_eq!(
            ids,
            vec![
                PacketId::BumpsAndWheelDrops,
                PacketId::Distance,
                PacketId::Packets7To58
            ]
        );
        assert_eq!(
            Command::QueryList(ids.clone()).encode().unwrap(),
            vec![149, 3, 7, 19, 100]
        );
        assert_eq!(
            Command::Stream(ids).encode().unwrap(),
            vec![148, 3, 7, 19, 100]
        );
        assert!(invalid(Command::QueryList(filter_packet_ids(&[59, 60]))));
        assert!(invalid(Command::Stream(vec![PacketId::Wall; 64])));
        assert_eq!(
            Command::Sensors(PacketId::Buttons).encode().unwrap(),
            vec![142, 18]
        );
    }

    #[test]
    fn pause_resume_is_a_boolean_byte() {
        assert_eq!(
            Command::PauseResumeStream(true).encode().unwrap(),
            vec![150, 1]
        );
        assert_eq!(
            Command::PauseResumeStream(false).encode().unwrap(),
            vec![150, 0]
        );
    }

    #[test]
    fn schedule_without_times_is_cleared() {
        let bytes = Command::Schedule {
            days: 0x7F,
            times: None,
        }
        .encode()
        .unwrap();
        let mut expected = vec![167];
        expected.extend([0; 15]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn schedule_drops_days_with_invalid_times() {
        let mut times = [ClockTime::new(9, 30); 7];
        times[Weekday::Monday as usize] = ClockTime::new(24, 0);
        times[Weekday::Friday as usize] = ClockTime::new(10, 60);

        let days = Weekday::Sunday.mask_bit()
            | Weekday::Monday.mask_bit()
            | Weekday::Wednesday.mask_bit()
            | Weekday::Friday.mask_bit();
        let bytes = Command::Schedule {
            days,
            times: Some(times),
        }
        .encode()
        .unwrap();

        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 167);
        assert_eq!(
            bytes[1],
            Weekday::Sunday.mask_bit() | Weekday::Wednesday.mask_bit()
        );
        assert_eq!(&bytes[2..4], &[9, 30]);
        assert_eq!(&bytes[4..6], &[0, 0]);
        assert_eq!(&bytes[6..8], &[0, 0]);
        assert_eq!(&bytes[8..10], &[9, 30]);
        assert_eq!(&bytes[12..14], &[0, 0]);
    }

    #[test]
    fn schedule_treats_hour_23_as_out_of_range() {
        let bytes = Command::Schedule {
            days: 0x01,
            times: Some([ClockTime::new(23, 0); 7]),
        }
        .encode()
        .unwrap();
        assert_eq!(bytes[1], 0);
        assert_eq!(&bytes[2..4], &[0, 0]);
    }

    #[test]
    fn set_day_time_limits() {
        assert_eq!(
            Command::SetDayTime {
                day: Weekday::Thursday,
                time: ClockTime::new(23, 59)
            }
            .encode()
            .unwrap(),
            vec![168, 4, 23, 59]
        );
        assert!(invalid(Command::SetDayTime {
            day: Weekday::Thursday,
            time: ClockTime::new(24, 0)
        }));
        assert!(invalid(Command::SetDayTime {
            day: Weekday::Thursday,
            time: ClockTime::new(0, 60)
        }));
    }

    #[test]
    fn buttons_pass_through() {
        assert_eq!(Command::Buttons(0xFF).encode().unwrap(), vec![165, 0xFF]);
    }

    proptest! {
        #[test]
        fn valid_drive_is_five_big_endian_bytes(
            velocity in -500i16..=500,
            radius in prop_oneof![-2000i16..=2000, Just(RADIUS_STRAIGHT)],
        ) {
            let bytes = Command::Drive { velocity, radius }.encode().unwrap();
            prop_assert_eq!(bytes.len(), 5);
            prop_assert_eq!(bytes[0], 137);
            prop_assert_eq!(i16::from_be_bytes([bytes[1], bytes[2]]), velocity);
            prop_assert_eq!(i16::from_be_bytes([bytes[3], bytes[4]]), radius);
        }

        #[test]
        fn schedule_with_no_times_ignores_mask(days in any::<u8>()) {
            let bytes = Command::Schedule { days, times: None }.encode().unwrap();
            prop_assert_eq!(bytes.len(), 16);
            prop_assert_eq!(bytes[0], 167);
            prop_assert!(bytes[1..].iter().all(|&b| b == 0));
        }
    }
}
