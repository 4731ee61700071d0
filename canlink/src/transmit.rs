//! Transmit path
//!
//! Encodes values and hands the frames to the driver. Every attempt is logged; a failure is
//! reported to the caller and never retried here.

use crate::codec::{self, Value};
use crate::link::{SendError, Tx};
use crate::log::Log;

pub struct Transmitter<'a, B: Tx> {
    bus: B,
    log: Log<'a>,
}

impl<'a, B: Tx> Transmitter<'a, B> {
    pub fn new(bus: B, log: Log<'a>) -> Self {
        Self { bus, log }
    }

    pub async fn send(&mut self, value: Value) -> Result<(), SendError> {
        let frame = codec::encode(value);
        trace!("tx {:?}", frame);
        match self.bus.send(&frame) {
            Ok(()) => {
                self.log.info("CAN_TX", format_args!("{}", value)).await;
                Ok(())
            }
            Err(err) => {
                self.log
                    .warn("CAN_TX", format_args!("TX ERROR {:?} ({})", err, value))
                    .await;
                Err(err)
            }
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}
