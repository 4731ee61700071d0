use super::runner::Runner;
use crate::codec::Value;
use crate::core::{Command, NodeStatus};
use crate::link::Tx;

/// Sensor measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub rpm: u16,
    pub temperature: i16,
}

/// Hardware side of a sensor node
pub trait SensorIo {
    /// Takes a new measurement. Called once per telemetry period.
    fn read(&mut self) -> Reading;

    /// Carries out a command after it was acknowledged.
    ///
    /// A returned status becomes the node status and is announced on the bus right away.
    fn execute(&mut self, command: Command) -> Option<NodeStatus>;
}

impl<T: SensorIo + ?Sized> SensorIo for &mut T {
    fn read(&mut self) -> Reading {
        (**self).read()
    }

    fn execute(&mut self, command: Command) -> Option<NodeStatus> {
        (**self).execute(command)
    }
}

/// Simulated engine ramping up until it wraps back to idle
#[derive(Debug, Clone)]
pub struct Simulated {
    rpm: u16,
    temperature: i16,
}

impl Simulated {
    pub const IDLE_RPM: u16 = 800;
    pub const MAX_RPM: u16 = 6000;
    pub const RPM_STEP: u16 = 100;
    pub const AMBIENT_TEMPERATURE: i16 = 25;
    pub const MAX_TEMPERATURE: i16 = 100;

    pub const fn new() -> Self {
        Self {
            rpm: Self::IDLE_RPM,
            temperature: Self::AMBIENT_TEMPERATURE,
        }
    }
}

impl Default for Simulated {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorIo for Simulated {
    fn read(&mut self) -> Reading {
        self.rpm += Self::RPM_STEP;
        if self.rpm > Self::MAX_RPM {
            self.rpm = Self::IDLE_RPM;
        }
        self.temperature += 1;
        if self.temperature > Self::MAX_TEMPERATURE {
            self.temperature = Self::AMBIENT_TEMPERATURE;
        }
        Reading {
            rpm: self.rpm,
            temperature: self.temperature,
        }
    }

    fn execute(&mut self, _command: Command) -> Option<NodeStatus> {
        None
    }
}

impl<'a, B: Tx, S: SensorIo> Runner<'a, B, S> {
    pub(super) async fn on_telemetry_tick(&mut self) {
        let reading = self.io.read();
        self.snapshot.rpm = reading.rpm;
        self.snapshot.temperature = reading.temperature;

        // Failures are logged by the transmitter; the next period retries with fresh values
        let _ = self.tx.send(Value::Rpm(reading.rpm)).await;
        let _ = self.tx.send(Value::Temperature(reading.temperature)).await;
        let _ = self.tx.send(Value::Heartbeat).await;
    }

    pub(super) async fn on_command(&mut self, code: u8) {
        // The ack goes out before any work on the command
        let _ = self.tx.send(Value::Ack(code)).await;

        let Some(command) = Command::try_from_u8(code) else {
            self.log
                .warn("CMD", format_args!("Unknown command: 0x{:02X}", code))
                .await;
            return;
        };
        self.log
            .info("CMD", format_args!("{:?} received", command))
            .await;

        if let Some(status) = self.io.execute(command) {
            self.status = status;
            let _ = self.tx.send(Value::Status(status)).await;
        }
    }
}
