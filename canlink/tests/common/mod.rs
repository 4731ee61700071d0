#![allow(dead_code)]

use canlink::codec::{self, Decoded, Value};
use canlink::config::Config;
use canlink::frame::Frame;
use canlink::link::{Rx, SendError, Tx};
use canlink::log::{DiagnosticSink, Level, LogRunner, Record};
use canlink::node::{Control, Node, Runner, SensorIo};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use futures_executor::LocalSpawner;
use futures_task::LocalSpawn;
use std::boxed::Box;
use std::cell::{Cell, RefCell};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

static CLOCK: Mutex<()> = Mutex::new(());

/// Serializes tests of one binary. The mock clock is process-global.
pub fn lock_clock() -> MutexGuard<'static, ()> {
    CLOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bus stub recording transmitted frames and optionally forwarding them to a peer node
#[derive(Clone, Copy)]
pub struct Wire {
    frames: &'static RefCell<Vec<Frame>>,
    peer: &'static Cell<Option<Rx<'static>>>,
    fail: &'static Cell<Option<SendError>>,
}

impl Wire {
    pub fn new() -> Self {
        Self {
            frames: Box::leak(Box::new(RefCell::new(Vec::new()))),
            peer: Box::leak(Box::new(Cell::new(None))),
            fail: Box::leak(Box::new(Cell::new(None))),
        }
    }

    pub fn connect(&self, peer: Rx<'static>) {
        self.peer.set(Some(peer));
    }

    pub fn fail_with(&self, err: Option<SendError>) {
        self.fail.set(err);
    }

    pub fn values(&self) -> Vec<Value> {
        self.frames.borrow().iter().map(decode_value).collect()
    }

    pub fn clear(&self) {
        self.frames.borrow_mut().clear();
    }
}

impl Tx for Wire {
    fn send(&mut self, frame: &Frame) -> Result<(), SendError> {
        if let Some(err) = self.fail.get() {
            return Err(err);
        }
        self.frames.borrow_mut().push(*frame);
        if let Some(peer) = self.peer.get() {
            // A full peer queue loses the frame, like a real receiver would
            let _ = peer.push(*frame);
        }
        Ok(())
    }
}

/// Log records collected by the log runner
#[derive(Clone, Copy)]
pub struct Records(&'static RefCell<Vec<Record>>);

impl Records {
    pub fn new() -> Self {
        Self(Box::leak(Box::new(RefCell::new(Vec::new()))))
    }

    pub fn sink(self) -> impl DiagnosticSink + 'static {
        move |record: &Record| self.0.borrow_mut().push(record.clone())
    }

    pub fn count(&self, level: Level) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|record| record.level == level)
            .count()
    }

    pub fn contains(&self, level: Level, text: &str) -> bool {
        self.0
            .borrow()
            .iter()
            .any(|record| record.level == level && record.text.contains(text))
    }
}

pub struct TestNode {
    pub rx: Rx<'static>,
    pub control: Control<'static>,
    pub wire: Wire,
    pub records: Records,
}

impl TestNode {
    pub fn inject(&self, value: Value) {
        self.rx.push(codec::encode(value)).unwrap();
    }
}

pub fn spawn_node<S: SensorIo + 'static>(
    spawner: &LocalSpawner,
    config: Config,
    io: S,
) -> TestNode {
    let node = Box::leak(Box::new(Node::<CriticalSectionRawMutex>::new(config)));
    let wire = Wire::new();
    let records = Records::new();
    let (rx, control, runner, log) = node.split(wire, io);

    spawner
        .spawn_local_obj(Box::new(node_runner(runner)).into())
        .unwrap();
    spawner
        .spawn_local_obj(Box::new(log_runner(LogRunner::new(log, records.sink()))).into())
        .unwrap();

    TestNode {
        rx,
        control,
        wire,
        records,
    }
}

pub fn decode_value(frame: &Frame) -> Value {
    match codec::decode(frame) {
        Ok(Decoded::Value(value)) => value,
        other => panic!("unexpected frame {:?}: {:?}", frame, other),
    }
}

async fn node_runner<S: SensorIo>(mut runner: Runner<'static, Wire, S>) {
    runner.run().await
}

async fn log_runner<S: DiagnosticSink>(mut runner: LogRunner<'static, S>) {
    runner.run().await
}
