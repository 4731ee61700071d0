//! # canlink
//!
//! This library implements the control application of a two-node CAN system in no_std
//! environments: a sensor node publishing engine telemetry and a monitor node watching the
//! telemetry and commanding the sensor when a limit is exceeded. Commands are acknowledged;
//! the monitor reports a fault if an acknowledgment does not arrive in time.
//!
//! The library targets the Embassy async framework. All memory is statically sized.
//!
//! ## Architecture
//!
//! ```text
//!  ┌────────┐ push ┌───────────────┐ pop  ┌────────┐ send ┌────────┐
//!  │ RX ISR ├─────►│ Inbound queue ├─────►│ Runner ├─────►│ TX bus │
//!  └────────┘      └───────────────┘      └──┬──┬──┘      └────────┘
//!                                            │  │
//!                        ┌─────────────┐     │  │     ┌─────────┐
//!                        │ Log channel │◄────┘  └────►│ Control │
//!                        └──────┬──────┘              └─────────┘
//!                               ▼
//!                        ┌─────────────┐
//!                        │  LogRunner  │
//!                        └─────────────┘
//! ```
//! Components:
//! * _Inbound queue_ is a bounded FIFO filled from the receive interrupt. When it is full, new
//!   frames are dropped and counted.
//! * _Runner_ is the control task. It waits on the queue, the telemetry and keepalive tickers,
//!   and the acknowledgment deadline at once, so a pending acknowledgment never blocks frame
//!   reception.
//! * _Log channel_ carries formatted diagnostic records to a low-priority _LogRunner_ which
//!   writes them to a `DiagnosticSink`.
//! * _Control_ is a read-only handle to the state the runner publishes.
//!
//! ## Concurrency model
//!
//! All state shared between contexts lives in the `Node` and is guarded by an embassy raw
//! mutex. Use `CriticalSectionRawMutex` when the driver pushes frames from an interrupt handler.
//! `ThreadModeRawMutex` is sufficient when every component runs in a thread-mode executor.
//! Critical sections are bounded to a single queue or cell operation.
//!
//! ## Wire protocol
//!
//! The identifier table lives in `canlink::core` and payload layouts in `codec`. Both nodes
//! must be built against the same `core::PROTOCOL_VERSION`.
#![no_std]

pub use canlink_core as core;
pub use canlink_driver::{frame, link, time};

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod codec;
pub mod config;
pub mod log;
pub mod node;
pub mod queue;
pub mod transmit;
