use core::future::pending;
use embassy_futures::select::{Either4, select4};
use embassy_time::{Ticker, Timer};

use super::ack::AckTracker;
use super::sensor::SensorIo;
use super::{DynamicControl, Published, TelemetrySnapshot};
use crate::codec::{self, Decoded, Value};
use crate::config::{Config, Role};
use crate::core::NodeStatus;
use crate::frame::Frame;
use crate::link::Tx;
use crate::log::Log;
use crate::queue::Inbound;
use crate::time::Instant;
use crate::transmit::Transmitter;

/// Node control task.
///
/// Drains the inbound queue and runs the role state machine. A single task serves both roles;
/// the configured role selects the handlers. Run for proper node operation.
pub struct Runner<'a, B: Tx, S: SensorIo> {
    pub(super) config: Config,
    inbound: Inbound<'a>,
    control: &'a (dyn DynamicControl + Sync),
    pub(super) log: Log<'a>,
    pub(super) tx: Transmitter<'a, B>,
    pub(super) io: S,
    pub(super) snapshot: TelemetrySnapshot,
    pub(super) status: NodeStatus,
    pub(super) tracker: AckTracker,
    pub(super) missed_ack: bool,
    peer_last_seen: Option<Instant>,
    dropped_seen: u32,
}

enum Event {
    Frame(Frame),
    Telemetry,
    Keepalive,
    AckDeadline,
}

impl<'a, B: Tx, S: SensorIo> Runner<'a, B, S> {
    pub(super) fn new(
        config: Config,
        inbound: Inbound<'a>,
        control: &'a (dyn DynamicControl + Sync),
        log: Log<'a>,
        bus: B,
        io: S,
    ) -> Self {
        Self {
            config,
            inbound,
            control,
            log,
            tx: Transmitter::new(bus, log),
            io,
            snapshot: TelemetrySnapshot::default(),
            status: NodeStatus::Ok,
            tracker: AckTracker::new(config.ack_timeout),
            missed_ack: false,
            peer_last_seen: None,
            dropped_seen: 0,
        }
    }

    pub async fn run(&mut self) -> ! {
        self.log
            .info("NODE", format_args!("{} task started", self.config.role))
            .await;
        self.publish();

        let mut telemetry = Ticker::every(self.config.telemetry_period);
        let mut keepalive = Ticker::every(self.config.status_period);
        let sensor = self.config.role == Role::Sensor;

        loop {
            let inbound = self.inbound;
            let deadline = self.tracker.deadline();
            let event = select4(
                inbound.pop(),
                async {
                    if sensor {
                        telemetry.next().await
                    } else {
                        pending::<()>().await
                    }
                },
                keepalive.next(),
                async {
                    match deadline {
                        // Timer always yields on the first poll. Skip it if the deadline has passed.
                        Some(deadline) if deadline > Instant::now() => Timer::at(deadline).await,
                        Some(_) => (),
                        None => pending::<()>().await,
                    }
                },
            )
            .await;

            let event = match event {
                Either4::First(frame) => Event::Frame(frame),
                Either4::Second(()) => Event::Telemetry,
                Either4::Third(()) => Event::Keepalive,
                Either4::Fourth(()) => Event::AckDeadline,
            };
            self.handle(event).await;
            self.report_drops().await;
            self.publish();
        }
    }

    async fn handle(&mut self, event: Event) {
        match event {
            Event::Frame(frame) => self.on_frame(frame).await,
            Event::Telemetry => self.on_telemetry_tick().await,
            Event::Keepalive => {
                let _ = self.tx.send(Value::Status(self.status)).await;
            }
            Event::AckDeadline => self.on_ack_deadline().await,
        }
    }

    async fn on_frame(&mut self, frame: Frame) {
        let value = match codec::decode(&frame) {
            Ok(Decoded::Value(value)) => value,
            Ok(Decoded::Unknown(id)) => {
                self.log
                    .warn("CAN_RX", format_args!("Unknown ID: {}", id))
                    .await;
                return;
            }
            Err(err) => {
                self.log
                    .warn("CAN_RX", format_args!("Malformed frame {}: {}", frame.id, err))
                    .await;
                return;
            }
        };

        match (self.config.role, value) {
            (_, Value::Heartbeat) => {
                self.peer_last_seen = Some(Instant::now());
                trace!("peer heartbeat");
            }
            (_, Value::Status(status)) => {
                self.snapshot.status = status;
                self.log.info("CAN_RX", format_args!("{}", value)).await;
            }
            (Role::Sensor, Value::Command(code)) => self.on_command(code).await,
            (Role::Monitor, Value::Rpm(_) | Value::Temperature(_)) => {
                self.on_reading(value).await
            }
            (Role::Monitor, Value::Ack(code)) => self.on_ack(code).await,
            (role, value) => debug!("{} node ignores {}", role, value),
        }
    }

    async fn report_drops(&mut self) {
        let dropped = self.inbound.dropped();
        let fresh = dropped.wrapping_sub(self.dropped_seen);
        if fresh == 0 {
            return;
        }
        self.dropped_seen = dropped;
        self.log
            .warn(
                "CAN_RX",
                format_args!("RX queue full, {} frames dropped ({} total)", fresh, dropped),
            )
            .await;
    }

    fn publish(&self) {
        self.control.store(Published {
            snapshot: self.snapshot,
            status: self.status,
            ack_state: self.tracker.state(),
            stats: self.tracker.stats(),
            peer_last_seen: self.peer_last_seen,
        });
    }
}
