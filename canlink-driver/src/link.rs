//! Channels connecting driver and canlink stack

use crate::frame::Frame;
use crate::internal;

/// The stack had no free slot for a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dropped;

/// Consumer of received frames
///
/// Safe to call from an interrupt handler as long as the node was created with an
/// interrupt-safe mutex (e.g., `CriticalSectionRawMutex`).
///
/// The stack counts dropped frames; the driver does not need to report them.
#[derive(Clone, Copy)]
pub struct Rx<'a>(&'a (dyn internal::DynamicRx + Sync));

impl<'a> Rx<'a> {
    pub fn new(access: &'a (dyn internal::DynamicRx + Sync)) -> Self {
        Self(access)
    }

    /// Pushes a frame. Never blocks.
    ///
    /// Frames are delivered to the stack in push order. If the inbound queue is full, the pushed
    /// frame is discarded.
    pub fn push(&self, frame: Frame) -> Result<(), Dropped> {
        self.0.try_push(frame).map_err(|_| Dropped)
    }
}

/// Bus transmission failure reported by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// All transmit mailboxes are occupied
    MailboxFull,
    /// The controller left the bus after too many errors
    BusOff,
    /// Any other driver-specific failure
    Other,
}

/// Producer side of the bus, implemented by a driver
///
/// `send` must not block for longer than it takes to hand the frame to the controller.
/// A successful return means the frame was queued for transmission.
pub trait Tx {
    fn send(&mut self, frame: &Frame) -> Result<(), SendError>;
}

impl<T: Tx + ?Sized> Tx for &mut T {
    fn send(&mut self, frame: &Frame) -> Result<(), SendError> {
        (**self).send(frame)
    }
}
