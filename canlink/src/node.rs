//! canlink node implementation
//!
//! A node owns the inbound frame queue, the log channel and the published view of its
//! telemetry state. `split` hands out the accessors for the tasks and the driver:
//!
//! * `Rx` for the bus receive interrupt
//! * `Control` for reading the node state from any task
//! * `Runner` for the control task, which runs the role state machine
//! * `Log` for creating the log output task and for application diagnostics
//!
//! ## Examples
//!
//! A node can be created as simply as:
//! ```
//! use canlink::config::{Config, Role};
//! use canlink::frame::Frame;
//! use canlink::link::{SendError, Tx};
//! use canlink::node::{Node, Simulated};
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as Mutex;
//!
//! // A property of the board
//! struct Bus;
//! impl Tx for Bus {
//!     fn send(&mut self, _frame: &Frame) -> Result<(), SendError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut node = Node::<Mutex>::new(Config::new(Role::Sensor));
//! let (rx, control, runner, log) = node.split(Bus, Simulated::new());
//! ```
//! However, static allocation is typically used to obtain `'static` accessors
//! that can be passed to spawned tasks and the interrupt handler:
//! ```
//! # use canlink::config::{Config, Role};
//! # use canlink::frame::Frame;
//! # use canlink::link::{SendError, Tx};
//! # use canlink::node::{Node, Simulated};
//! # use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as Mutex;
//! # struct Bus;
//! # impl Tx for Bus {
//! #     fn send(&mut self, _frame: &Frame) -> Result<(), SendError> {
//! #         Ok(())
//! #     }
//! # }
//! use static_cell::StaticCell;
//!
//! static CELL: StaticCell<Node<Mutex>> = StaticCell::new();
//! let node = CELL.init(Node::new(Config::new(Role::Monitor)));
//! let (rx, control, runner, log) = node.split(Bus, Simulated::new());
//! ```

use core::cell::Cell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::Config;
use crate::core::NodeStatus;
use crate::link::{Rx, Tx};
use crate::log::{Log, LogChannel};
use crate::queue::{InboundQueue, Inbound};
use crate::time::Instant;

mod ack;
mod monitor;
mod runner;
mod sensor;

pub use ack::{AckOutcome, AckState, AckStats, AckTracker, Busy, PendingAck};
pub use monitor::evaluate;
pub use runner::Runner;
pub use sensor::{Reading, SensorIo, Simulated};

/// Latest telemetry known to a node
///
/// On a sensor node `rpm` and `temperature` are its own last readings; on a monitor node they
/// are the last values received from the bus. `status` is the last status received from the
/// peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySnapshot {
    pub rpm: u16,
    pub temperature: i16,
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Published {
    pub snapshot: TelemetrySnapshot,
    pub status: NodeStatus,
    pub ack_state: AckState,
    pub stats: AckStats,
    pub peer_last_seen: Option<Instant>,
}

pub(crate) trait DynamicControl {
    fn load(&self) -> Published;
    fn store(&self, published: Published);
    fn dropped_frames(&self) -> u32;
}

/// Read-only node state handle
///
/// The runner is the only writer. It publishes a consistent copy of its state after every
/// event it handles.
#[derive(Clone, Copy)]
pub struct Control<'a>(&'a (dyn DynamicControl + Sync));

impl<'a> Control<'a> {
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.0.load().snapshot
    }

    /// Status the node reports in its keepalive
    pub fn status(&self) -> NodeStatus {
        self.0.load().status
    }

    pub fn ack_state(&self) -> AckState {
        self.0.load().ack_state
    }

    pub fn stats(&self) -> AckStats {
        self.0.load().stats
    }

    /// Reception instant of the last peer heartbeat
    pub fn peer_last_seen(&self) -> Option<Instant> {
        self.0.load().peer_last_seen
    }

    /// Frames discarded because the inbound queue was full
    pub fn dropped_frames(&self) -> u32 {
        self.0.dropped_frames()
    }
}

struct NodeState<M: RawMutex> {
    inbound: InboundQueue<M>,
    log: LogChannel<M>,
    published: Mutex<M, Cell<Published>>,
}

impl<M: RawMutex> NodeState<M> {
    fn new() -> Self {
        Self {
            inbound: InboundQueue::new(),
            log: LogChannel::new(),
            published: Mutex::new(Cell::new(Published::default())),
        }
    }
}

impl<M: RawMutex> DynamicControl for NodeState<M> {
    fn load(&self) -> Published {
        self.published.lock(|cell| cell.get())
    }

    fn store(&self, published: Published) {
        self.published.lock(|cell| cell.set(published));
    }

    fn dropped_frames(&self) -> u32 {
        self.inbound.dropped()
    }
}

/// Bus node running one role.
///
/// Several nodes may coexist in one program, e.g., to simulate both ends of the bus.
pub struct Node<M: RawMutex> {
    config: Config,
    state: NodeState<M>,
}

impl<M: RawMutex + Sync> Node<M> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: NodeState::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the node accessors.
    ///
    /// `bus` is the transmit side of the driver. `io` provides the readings and executes the
    /// commands of a sensor node; a monitor node never calls it.
    pub fn split<B: Tx, S: SensorIo>(
        &mut self,
        bus: B,
        io: S,
    ) -> (Rx<'_>, Control<'_>, Runner<'_, B, S>, Log<'_>) {
        let state = &self.state;
        let rx = Rx::new(&state.inbound);
        let control = Control(state);
        let log = state.log.handle();
        let runner = Runner::new(self.config, Inbound::new(&state.inbound), state, log, bus, io);
        (rx, control, runner, log)
    }
}
