//! Frame payload encoding
//!
//! Every message kind has a fixed payload layout:
//!
//! | Kind        | Bytes | Layout                     |
//! |-------------|-------|----------------------------|
//! | Rpm         | 2     | big-endian `u16`           |
//! | Temperature | 2     | big-endian `i16`           |
//! | Status      | 1     | `NodeStatus` code          |
//! | Heartbeat   | 1     | `HEARTBEAT_SENTINEL`       |
//! | Command     | 1     | command code               |
//! | Ack         | 1     | acknowledged command code  |
//!
//! `Value` pairs a kind with its typed payload, so every encodable value has a layout and
//! `encode` cannot fail. Decoding tolerates identifiers outside the table and reports them as
//! `Decoded::Unknown`. A known identifier with a malformed payload is a `DecodeError`.

use crate::core::{CanId, HEARTBEAT_SENTINEL, MessageKind, NodeStatus};
use crate::frame::{Data, Frame, MTU};

/// Typed frame payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    Rpm(u16),
    Temperature(i16),
    Status(NodeStatus),
    Heartbeat,
    Command(u8),
    Ack(u8),
}

impl Value {
    pub const fn kind(&self) -> MessageKind {
        match self {
            Value::Rpm(_) => MessageKind::Rpm,
            Value::Temperature(_) => MessageKind::Temperature,
            Value::Status(_) => MessageKind::Status,
            Value::Heartbeat => MessageKind::Heartbeat,
            Value::Command(_) => MessageKind::Command,
            Value::Ack(_) => MessageKind::Ack,
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::Rpm(rpm) => write!(f, "RPM: {}", rpm),
            Value::Temperature(temp) => write!(f, "TEMP: {}", temp),
            Value::Status(status) => write!(f, "STATUS: {}", status.into_u8()),
            Value::Heartbeat => f.write_str("Heartbeat"),
            Value::Command(code) => write!(f, "COMMAND: {}", code),
            Value::Ack(code) => write!(f, "ACK: {}", code),
        }
    }
}

/// Result of decoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decoded {
    Value(Value),
    /// The identifier is not part of the protocol table
    Unknown(CanId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Payload length does not match the kind layout
    Length {
        kind: MessageKind,
        expected: usize,
        actual: usize,
    },
    /// Payload byte is outside the value set of the kind
    InvalidValue { kind: MessageKind, byte: u8 },
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DecodeError::Length {
                kind,
                expected,
                actual,
            } => write!(f, "{:?} length {} (expected {})", kind, actual, expected),
            DecodeError::InvalidValue { kind, byte } => {
                write!(f, "{:?} invalid byte 0x{:02X}", kind, byte)
            }
        }
    }
}

pub fn encode(value: Value) -> Frame {
    let mut bytes = [0u8; MTU];
    let payload = match value {
        Value::Rpm(rpm) => rpm.to_be_bytes(),
        Value::Temperature(temp) => temp.to_be_bytes(),
        Value::Status(status) => [status.into_u8(), 0],
        Value::Heartbeat => [HEARTBEAT_SENTINEL, 0],
        Value::Command(code) | Value::Ack(code) => [code, 0],
    };
    let kind = value.kind();
    let length = kind.payload_len();
    bytes[..length].copy_from_slice(&payload[..length]);

    Frame {
        id: kind.id(),
        data: Data::from_raw(bytes, length as u8),
    }
}

pub fn decode(frame: &Frame) -> Result<Decoded, DecodeError> {
    let kind = match MessageKind::from_id(frame.id) {
        Some(kind) => kind,
        None => return Ok(Decoded::Unknown(frame.id)),
    };

    let data: &[u8] = &frame.data;
    if data.len() != kind.payload_len() {
        return Err(DecodeError::Length {
            kind,
            expected: kind.payload_len(),
            actual: data.len(),
        });
    }

    let value = match kind {
        MessageKind::Rpm => Value::Rpm(u16::from_be_bytes([data[0], data[1]])),
        MessageKind::Temperature => Value::Temperature(i16::from_be_bytes([data[0], data[1]])),
        MessageKind::Status => {
            let status = NodeStatus::try_from_u8(data[0])
                .ok_or(DecodeError::InvalidValue { kind, byte: data[0] })?;
            Value::Status(status)
        }
        MessageKind::Heartbeat => {
            if data[0] != HEARTBEAT_SENTINEL {
                return Err(DecodeError::InvalidValue { kind, byte: data[0] });
            }
            Value::Heartbeat
        }
        MessageKind::Command => Value::Command(data[0]),
        MessageKind::Ack => Value::Ack(data[0]),
    };

    Ok(Decoded::Value(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Value) {
        assert_eq!(decode(&encode(value)), Ok(Decoded::Value(value)));
    }

    #[test]
    fn test_rpm_layout() {
        let frame = encode(Value::Rpm(0x1234));
        assert_eq!(frame.id.into_u16(), 0x100);
        assert_eq!(&*frame.data, &[0x12, 0x34]);
    }

    #[test]
    fn test_temperature_layout() {
        let frame = encode(Value::Temperature(-2));
        assert_eq!(frame.id.into_u16(), 0x101);
        assert_eq!(&*frame.data, &[0xff, 0xfe]);
    }

    #[test]
    fn test_single_byte_layouts() {
        assert_eq!(&*encode(Value::Status(NodeStatus::Warn)).data, &[0x02]);
        assert_eq!(&*encode(Value::Heartbeat).data, &[HEARTBEAT_SENTINEL]);
        assert_eq!(&*encode(Value::Command(0x02)).data, &[0x02]);

        let ack = encode(Value::Ack(0x02));
        assert_eq!(ack.id, MessageKind::Ack.id());
        assert_eq!(&*ack.data, &[0x02]);
    }

    #[test]
    fn test_round_trip_boundaries() {
        for rpm in [u16::MIN, 1, 5000, 5001, u16::MAX] {
            round_trip(Value::Rpm(rpm));
        }
        for temp in [i16::MIN, -1, 0, 80, 81, i16::MAX] {
            round_trip(Value::Temperature(temp));
        }
        for status in [NodeStatus::Ok, NodeStatus::Warn, NodeStatus::Fault] {
            round_trip(Value::Status(status));
        }
        round_trip(Value::Heartbeat);
        for code in [u8::MIN, 0x01, 0x02, u8::MAX] {
            round_trip(Value::Command(code));
            round_trip(Value::Ack(code));
        }
    }

    #[test]
    fn test_unknown_id() {
        let id = CanId::new(0x7e0).unwrap();
        let frame = Frame::new(id, &[1, 2, 3]).unwrap();
        assert_eq!(decode(&frame), Ok(Decoded::Unknown(id)));
    }

    #[test]
    fn test_short_payload() {
        let frame = Frame::new(MessageKind::Rpm.id(), &[0x12]).unwrap();
        assert_eq!(
            decode(&frame),
            Err(DecodeError::Length {
                kind: MessageKind::Rpm,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_invalid_status_byte() {
        let frame = Frame::new(MessageKind::Status.id(), &[0x09]).unwrap();
        assert_eq!(
            decode(&frame),
            Err(DecodeError::InvalidValue {
                kind: MessageKind::Status,
                byte: 0x09
            })
        );
    }

    #[test]
    fn test_invalid_heartbeat_sentinel() {
        let frame = Frame::new(MessageKind::Heartbeat.id(), &[0x00]).unwrap();
        assert!(matches!(
            decode(&frame),
            Err(DecodeError::InvalidValue { .. })
        ));
    }
}
