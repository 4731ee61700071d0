use super::ack::AckOutcome;
use super::runner::Runner;
use super::sensor::SensorIo;
use crate::codec::Value;
use crate::config::Config;
use crate::core::{Command, NodeStatus};
use crate::link::Tx;
use crate::time::Instant;

/// Command a monitor issues for a received reading, if it violates a limit.
///
/// Limits are exclusive: a reading equal to its limit is within bounds.
pub fn evaluate(config: &Config, value: &Value) -> Option<Command> {
    match *value {
        Value::Rpm(rpm) if rpm > config.rpm_limit => Some(Command::WarningHighRpm),
        Value::Temperature(temperature) if temperature > config.temperature_limit => {
            Some(Command::WarningHighTemp)
        }
        _ => None,
    }
}

impl<'a, B: Tx, S: SensorIo> Runner<'a, B, S> {
    pub(super) async fn on_reading(&mut self, value: Value) {
        match value {
            Value::Rpm(rpm) => self.snapshot.rpm = rpm,
            Value::Temperature(temperature) => self.snapshot.temperature = temperature,
            _ => unreachable!(),
        }
        self.log.info("CAN_RX", format_args!("{}", value)).await;
        self.update_monitor_status();

        let Some(command) = evaluate(&self.config, &value) else {
            return;
        };
        if let Some(pending) = self.tracker.pending() {
            debug!(
                "{:?} suppressed, command {} outstanding",
                command, pending.command
            );
            return;
        }

        self.log
            .warn("MONITOR", format_args!("WARNING - {:?}", command))
            .await;
        let code = command.into_u8();
        // The window opens at transmission, not after the TX log record is queued
        let now = Instant::now();
        // Nothing to wait for if the command never reached the bus
        if self.tx.send(Value::Command(code)).await.is_ok() {
            unwrap!(self.tracker.arm(code, now));
        }
    }

    pub(super) async fn on_ack(&mut self, code: u8) {
        match self.tracker.on_ack(code) {
            AckOutcome::Acknowledged(pending) => {
                self.missed_ack = false;
                self.update_monitor_status();
                let latency = Instant::now().saturating_duration_since(pending.issued_at);
                self.log
                    .info(
                        "ACK",
                        format_args!(
                            "ACK received for command {} after {} ms",
                            code,
                            latency.as_millis()
                        ),
                    )
                    .await;
            }
            AckOutcome::Mismatched { expected, received } => {
                self.log
                    .warn(
                        "ACK",
                        format_args!("ACK {} does not match command {}", received, expected),
                    )
                    .await;
            }
            AckOutcome::Unsolicited(code) => {
                self.log
                    .warn("ACK", format_args!("ACK {} without outstanding command", code))
                    .await;
            }
        }
    }

    pub(super) async fn on_ack_deadline(&mut self) {
        let Some(pending) = self.tracker.expire(Instant::now()) else {
            return;
        };
        self.missed_ack = true;
        self.update_monitor_status();
        self.log
            .error(
                "ACK",
                format_args!(
                    "ERROR - No ACK for command {} within {} ms",
                    pending.command,
                    self.config.ack_timeout.as_millis()
                ),
            )
            .await;
    }

    fn update_monitor_status(&mut self) {
        let rpm = Value::Rpm(self.snapshot.rpm);
        let temperature = Value::Temperature(self.snapshot.temperature);
        let violated = evaluate(&self.config, &rpm).is_some()
            || evaluate(&self.config, &temperature).is_some();
        self.status = if self.missed_ack {
            NodeStatus::Fault
        } else if violated {
            NodeStatus::Warn
        } else {
            NodeStatus::Ok
        };
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::codec;
    use crate::config::Role;
    use crate::frame::Frame;
    use crate::link::SendError;
    use crate::log::{Level, Record};
    use crate::node::{AckState, Node, Simulated};
    use crate::time::Duration;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_time::MockDriver;
    use futures_executor::{LocalPool, block_on};
    use futures_task::LocalSpawn;
    use std::boxed::Box;
    use std::cell::RefCell;
    use std::vec::Vec;

    struct Bus(&'static RefCell<Vec<Frame>>);

    impl Tx for Bus {
        fn send(&mut self, frame: &Frame) -> Result<(), SendError> {
            self.0.borrow_mut().push(*frame);
            Ok(())
        }
    }

    async fn node_runner(mut runner: Runner<'static, Bus, Simulated>) {
        runner.run().await
    }

    #[test]
    fn test_ack_window_starts_at_transmission() {
        let mut executor = LocalPool::new();
        let time = MockDriver::get();
        let frames: &'static RefCell<Vec<Frame>> = Box::leak(Box::new(RefCell::new(Vec::new())));

        let node = Box::leak(Box::new(Node::<CriticalSectionRawMutex>::new(
            Config::new(Role::Monitor),
        )));
        let (rx, control, runner, log) = node.split(Bus(frames), Simulated::new());
        executor
            .spawner()
            .spawn_local_obj(Box::new(node_runner(runner)).into())
            .unwrap();
        executor.run_until_stalled();

        // No log consumer: the runner stalls on every record until one is popped
        while log
            .try_push(Record::message(Level::Debug, "T", "fill"))
            .is_ok()
        {}
        rx.push(codec::encode(Value::Temperature(95))).unwrap();
        executor.run_until_stalled();

        while frames.borrow().is_empty() {
            block_on(log.pop());
            executor.run_until_stalled();
        }
        let sent_at = Instant::now();

        // Keep the runner blocked on the TX log record
        time.advance(Duration::from_millis(150));
        executor.run_until_stalled();
        assert_eq!(control.ack_state(), AckState::Idle);

        block_on(log.pop());
        executor.run_until_stalled();
        assert_eq!(
            control.ack_state(),
            AckState::CommandSent {
                command: 0x02,
                deadline: sent_at + Duration::from_millis(200),
            }
        );
    }

    #[test]
    fn test_rpm_limit_is_exclusive() {
        let config = Config::new(Role::Monitor);
        assert_eq!(evaluate(&config, &Value::Rpm(5000)), None);
        assert_eq!(
            evaluate(&config, &Value::Rpm(5001)),
            Some(Command::WarningHighRpm)
        );
    }

    #[test]
    fn test_temperature_limit_is_exclusive() {
        let config = Config::new(Role::Monitor);
        assert_eq!(evaluate(&config, &Value::Temperature(80)), None);
        assert_eq!(evaluate(&config, &Value::Temperature(-40)), None);
        assert_eq!(
            evaluate(&config, &Value::Temperature(81)),
            Some(Command::WarningHighTemp)
        );
    }

    #[test]
    fn test_custom_limits() {
        let mut config = Config::new(Role::Monitor);
        config.rpm_limit = 1000;
        assert_eq!(
            evaluate(&config, &Value::Rpm(1001)),
            Some(Command::WarningHighRpm)
        );
    }

    #[test]
    fn test_non_readings_never_violate() {
        let config = Config::new(Role::Monitor);
        for value in [
            Value::Heartbeat,
            Value::Status(NodeStatus::Fault),
            Value::Command(0x01),
            Value::Ack(0x02),
        ] {
            assert_eq!(evaluate(&config, &value), None);
        }
    }
}
