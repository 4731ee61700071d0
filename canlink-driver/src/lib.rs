//! canlink driver interface
//!
//! The crate provides an interface between a CAN device driver and the canlink stack.
//! Limited scope facilitates compatibility across versions.
//! Driver crates should depend on this crate. canlink stack users should depend on
//! the `canlink` crate instead.
//!
//! The interface is made of two halves:
//! * `Rx` accepts received frames. It is the only stack object a driver may touch from an
//!   interrupt handler; `push` never blocks and drops the frame when the stack is behind.
//! * `Tx` is implemented by the driver. The stack calls `send` from task context for every
//!   outbound frame and does not retry on failure.
//!
//! Peripheral bring-up and acceptance filters stay on the driver side. The stack tolerates
//! frames with identifiers it does not know, so an accept-all filter is a valid setup.

#![no_std]

pub mod frame;
pub mod internal;
pub mod link;

pub mod time {
    pub use embassy_time::{Duration, Instant};
}
