//! canlink protocol table
//!
//! This crate provides the identifier table and basic data type definitions shared by both
//! ends of the bus. canlink users should not depend on this crate directly. Use the
//! `canlink::core` reexport instead.
//!
//! The table is versioned with [`PROTOCOL_VERSION`]. Sender and receiver must be built against
//! the same version; a divergence is a deployment error, not something the stack recovers from.
#![no_std]

/// Version of the identifier table below
pub const PROTOCOL_VERSION: u8 = 1;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Standard (11-bit) CAN identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanId(u16);

impl CanId {
    const MAX_VALUE: u16 = 0x7ff;
    pub const MAX: CanId = CanId(Self::MAX_VALUE);

    pub const fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u16_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u16_truncating(value: u16) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u16(self) -> u16 {
        self.0
    }
}

impl From<CanId> for u16 {
    fn from(value: CanId) -> Self {
        value.into_u16()
    }
}

impl From<CanId> for u32 {
    fn from(value: CanId) -> Self {
        value.into_u16().into()
    }
}

impl TryFrom<u16> for CanId {
    type Error = InvalidValue;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

impl core::fmt::Display for CanId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:03X}", self.0)
    }
}

/// Identifier partition a message kind belongs to
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageClass {
    /// Periodic measurements and liveness, `0x100..=0x1FF`
    Telemetry,
    /// Commands and their acknowledgments, `0x200..=0x2FF`
    Control,
}

impl MessageClass {
    const fn range(self) -> (u16, u16) {
        match self {
            MessageClass::Telemetry => (0x100, 0x1ff),
            MessageClass::Control => (0x200, 0x2ff),
        }
    }

    pub const fn contains(self, id: CanId) -> bool {
        let (low, high) = self.range();
        low <= id.into_u16() && id.into_u16() <= high
    }
}

/// Message kinds known to the protocol
///
/// The discriminant is the bus identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum MessageKind {
    /// Engine speed, big-endian `u16`
    Rpm = 0x100,
    /// Temperature in degrees Celsius, big-endian `i16`
    Temperature = 0x101,
    /// Node status byte, see [`NodeStatus`]
    Status = 0x102,
    /// Liveness signal carrying [`HEARTBEAT_SENTINEL`]
    Heartbeat = 0x103,
    /// Command code, see [`Command`]
    Command = 0x200,
    /// Code of the acknowledged command
    Ack = 0x201,
}

/// Payload byte of every heartbeat frame
pub const HEARTBEAT_SENTINEL: u8 = 0xaa;

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        MessageKind::Rpm,
        MessageKind::Temperature,
        MessageKind::Status,
        MessageKind::Heartbeat,
        MessageKind::Command,
        MessageKind::Ack,
    ];

    pub const fn id(self) -> CanId {
        CanId(self as u16)
    }

    pub const fn from_id(id: CanId) -> Option<Self> {
        match id.into_u16() {
            0x100 => Some(MessageKind::Rpm),
            0x101 => Some(MessageKind::Temperature),
            0x102 => Some(MessageKind::Status),
            0x103 => Some(MessageKind::Heartbeat),
            0x200 => Some(MessageKind::Command),
            0x201 => Some(MessageKind::Ack),
            _ => None,
        }
    }

    pub const fn class(self) -> MessageClass {
        match self {
            MessageKind::Rpm
            | MessageKind::Temperature
            | MessageKind::Status
            | MessageKind::Heartbeat => MessageClass::Telemetry,
            MessageKind::Command | MessageKind::Ack => MessageClass::Control,
        }
    }

    /// Exact payload length of the kind
    pub const fn payload_len(self) -> usize {
        match self {
            MessageKind::Rpm | MessageKind::Temperature => 2,
            MessageKind::Status
            | MessageKind::Heartbeat
            | MessageKind::Command
            | MessageKind::Ack => 1,
        }
    }
}

impl From<MessageKind> for CanId {
    fn from(value: MessageKind) -> Self {
        value.id()
    }
}

impl TryFrom<CanId> for MessageKind {
    type Error = InvalidValue;

    fn try_from(value: CanId) -> Result<Self, Self::Error> {
        Self::from_id(value).ok_or(InvalidValue)
    }
}

/// Node status reported in `Status` frames
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NodeStatus {
    #[default]
    Ok = 0x01,
    Warn = 0x02,
    Fault = 0x03,
}

impl NodeStatus {
    pub const fn try_from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(NodeStatus::Ok),
            0x02 => Some(NodeStatus::Warn),
            0x03 => Some(NodeStatus::Fault),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<NodeStatus> for u8 {
    fn from(value: NodeStatus) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for NodeStatus {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// Command codes understood by the sensor node
///
/// Command and Ack frames carry the raw code, so codes outside this set still travel the bus
/// and get acknowledged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Engine speed exceeded the monitor limit
    WarningHighRpm = 0x01,
    /// Temperature exceeded the monitor limit
    WarningHighTemp = 0x02,
}

impl Command {
    pub const fn try_from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Command::WarningHighRpm),
            0x02 => Some(Command::WarningHighTemp),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for Command {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}
