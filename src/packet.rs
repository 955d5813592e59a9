//! Sensor packet ids and their layout in the telemetry buffer.
//!
//! Atomic packets 7..=58 each own a slot in an 80-byte buffer laid out in id
//! order. Group packets name a contiguous run of atomic packets, so their
//! descriptor is derived from the first and last member.

use std::ops::RangeInclusive;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{EnumIter, IntoStaticStr};

/// Size of the buffer holding every atomic packet.
pub const TELEMETRY_BUFFER_LEN: usize = 80;

/// Longest id list a single query or stream request may carry.
pub const MAX_REQUESTED_PACKETS: usize = 63;

const FIRST_ATOMIC: u8 = 7;
const LAST_ATOMIC: u8 = 58;

// (width, signed) for ids 7..=58.
const ATOMIC_LAYOUT: [(u8, bool); 52] = [
    (1, false), // 7 bumps and wheel drops
    (1, false), // 8 wall
    (1, false), // 9 cliff left
    (1, false), // 10 cliff front left
    (1, false), // 11 cliff front right
    (1, false), // 12 cliff right
    (1, false), // 13 virtual wall
    (1, false), // 14 wheel overcurrents
    (1, false), // 15 dirt detect
    (1, false), // 16 unused
    (1, false), // 17 ir omni
    (1, false), // 18 buttons
    (2, true),  // 19 distance
    (2, true),  // 20 angle
    (1, false), // 21 charging state
    (2, false), // 22 voltage
    (2, true),  // 23 current
    (1, true),  // 24 temperature
    (2, false), // 25 battery charge
    (2, false), // 26 battery capacity
    (2, false), // 27 wall signal
    (2, false), // 28 cliff left signal
    (2, false), // 29 cliff front left signal
    (2, false), // 30 cliff front right signal
    (2, false), // 31 cliff right signal
    (1, false), // 32 unused
    (2, false), // 33 unused
    (1, false), // 34 charging sources
    (1, false), // 35 oi mode
    (1, false), // 36 song number
    (1, false), // 37 song playing
    (1, false), // 38 stream packet count
    (2, true),  // 39 requested velocity
    (2, true),  // 40 requested radius
    (2, true),  // 41 requested right velocity
    (2, true),  // 42 requested left velocity
    (2, false), // 43 left encoder
    (2, false), // 44 right encoder
    (1, false), // 45 light bumper
    (2, false), // 46 light bump left
    (2, false), // 47 light bump front left
    (2, false), // 48 light bump center left
    (2, false), // 49 light bump center right
    (2, false), // 50 light bump front right
    (2, false), // 51 light bump right
    (1, false), // 52 ir left
    (1, false), // 53 ir right
    (2, true),  // 54 left motor current
    (2, true),  // 55 right motor current
    (2, true),  // 56 main brush current
    (2, true),  // 57 side brush current
    (1, false), // 58 stasis
];

const fn atomic_offset(id: u8) -> usize {
    let mut offset = 0;
    let mut current = FIRST_ATOMIC;
    while current < id {
        offset += ATOMIC_LAYOUT[(current - FIRST_ATOMIC) as usize].0 as usize;
        current += 1;
    }
    offset
}

/// Sensor packet identifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    IntoPrimitive,
    TryFromPrimitive,
    EnumIter,
    IntoStaticStr,
    strum_macros::Display,
)]
#[repr(u8)]
pub enum PacketId {
    Packets7To26 = 0,
    Packets7To16 = 1,
    Packets17To20 = 2,
    Packets21To26 = 3,
    Packets27To34 = 4,
    Packets35To42 = 5,
    Packets7To42 = 6,
    BumpsAndWheelDrops = 7,
    Wall = 8,
    CliffLeft = 9,
    CliffFrontLeft = 10,
    CliffFrontRight = 11,
    CliffRight = 12,
    VirtualWall = 13,
    WheelOvercurrents = 14,
    DirtDetect = 15,
    Unused16 = 16,
    IrCharacterOmni = 17,
    Buttons = 18,
    Distance = 19,
    Angle = 20,
    ChargingState = 21,
    Voltage = 22,
    Current = 23,
    Temperature = 24,
    BatteryCharge = 25,
    BatteryCapacity = 26,
    WallSignal = 27,
    CliffLeftSignal = 28,
    CliffFrontLeftSignal = 29,
    CliffFrontRightSignal = 30,
    CliffRightSignal = 31,
    Unused32 = 32,
    Unused33 = 33,
    ChargingSourcesAvailable = 34,
    OiMode = 35,
    SongNumber = 36,
    SongPlaying = 37,
    NumberOfStreamPackets = 38,
    RequestedVelocity = 39,
    RequestedRadius = 40,
    RequestedRightVelocity = 41,
    RequestedLeftVelocity = 42,
    LeftEncoderCounts = 43,
    RightEncoderCounts = 44,
    LightBumper = 45,
    LightBumpLeftSignal = 46,
    LightBumpFrontLeftSignal = 47,
    LightBumpCenterLeftSignal = 48,
    LightBumpCenterRightSignal = 49,
    LightBumpFrontRightSignal = 50,
    LightBumpRightSignal = 51,
    IrCharacterLeft = 52,
    IrCharacterRight = 53,
    LeftMotorCurrent = 54,
    RightMotorCurrent = 55,
    MainBrushMotorCurrent = 56,
    SideBrushMotorCurrent = 57,
    Stasis = 58,
    Packets7To58 = 100,
    Packets43To58 = 101,
    Packets46To51 = 106,
    Packets54To58 = 107,
}

/// Where a packet lives in the telemetry buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketDescriptor {
    pub offset: usize,
    pub width: usize,
    /// Only meaningful for atomic packets.
    pub signed: bool,
}

impl PacketDescriptor {
    pub fn range(self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.width
    }
}

impl PacketId {
    pub fn raw(self) -> u8 {
        self.into()
    }

    pub fn is_group(self) -> bool {
        !(FIRST_ATOMIC..=LAST_ATOMIC).contains(&self.raw())
    }

    /// Raw ids of the atomic packets this packet covers.
    pub fn member_ids(self) -> RangeInclusive<u8> {
        match self {
            Self::Packets7To26 => 7..=26,
            Self::Packets7To16 => 7..=16,
            Self::Packets17To20 => 17..=20,
            Self::Packets21To26 => 21..=26,
            Self::Packets27To34 => 27..=34,
            Self::Packets35To42 => 35..=42,
            Self::Packets7To42 => 7..=42,
            Self::Packets7To58 => 7..=58,
            Self::Packets43To58 => 43..=58,
            Self::Packets46To51 => 46..=51,
            Self::Packets54To58 => 54..=58,
            atomic => atomic.raw()..=atomic.raw(),
        }
    }

    pub fn members(self) -> impl Iterator<Item = PacketId> {
        self.member_ids()
            .filter_map(|raw| PacketId::try_from(raw).ok())
    }

    pub fn descriptor(self) -> PacketDescriptor {
        let ids = self.member_ids();
        let (first, last) = (*ids.start(), *ids.end());
        let (last_width, signed) = ATOMIC_LAYOUT[(last - FIRST_ATOMIC) as usize];
        let offset = atomic_offset(first);
        PacketDescriptor {
            offset,
            width: atomic_offset(last) + last_width as usize - offset,
            signed: signed && first == last,
        }
    }

    pub fn width(self) -> usize {
        self.descriptor().width
    }

    /// Bit position of this packet in the dirty mask.
    ///
    /// Ids 0..=58 map to themselves; the four high group ids take 59..=62.
    pub fn dirty_index(self) -> u32 {
        match self {
            Self::Packets7To58 => 59,
            Self::Packets43To58 => 60,
            Self::Packets46To51 => 61,
            Self::Packets54To58 => 62,
            other => u32::from(other.raw()),
        }
    }
}
