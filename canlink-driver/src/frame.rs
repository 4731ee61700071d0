//! Transport frame object

use canlink_core::CanId;

/// Classic CAN maximum payload length
pub const MTU: usize = 8;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidLength;

/// Classic CAN data vector
///
/// Holds between 0 and [`MTU`] bytes. The length is fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Data {
    length: u8,
    bytes: [u8; MTU],
}

impl Data {
    pub const EMPTY: Data = Data {
        length: 0,
        bytes: [0; MTU],
    };

    /// Creates a new vector from a slice of at most [`MTU`] bytes.
    pub fn new(data: &[u8]) -> Result<Self, InvalidLength> {
        if data.len() > MTU {
            return Err(InvalidLength);
        }
        let mut bytes = [0; MTU];
        bytes[..data.len()].copy_from_slice(data);

        Ok(Self {
            length: data.len() as u8,
            bytes,
        })
    }

    /// Creates a vector from a raw controller buffer and its data length code.
    ///
    /// Classic CAN allows DLC values above 8 that still carry 8 bytes.
    pub fn from_raw(mut bytes: [u8; MTU], dlc: u8) -> Self {
        let length = dlc.min(MTU as u8);
        // Keep equality independent of stale controller bytes
        bytes[usize::from(length)..].fill(0);
        Self { length, bytes }
    }
}

impl Default for Data {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl core::ops::Deref for Data {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes[..usize::from(self.length)]
    }
}

/// Transport frame
///
/// A frame is a plain value: the inbound queue takes it by move on push and hands it out by
/// move on pop, so the interrupt-side writer and the task-side reader never share a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub id: CanId,
    pub data: Data,
}

impl Frame {
    pub fn new(id: CanId, data: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            id,
            data: Data::new(data)?,
        })
    }
}
