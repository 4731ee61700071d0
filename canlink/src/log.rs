//! Diagnostic log channel
//!
//! Tasks format diagnostic records into a bounded queue; a dedicated low-priority task drains
//! it into a `DiagnosticSink` (typically a serial port). This keeps output latency away from the
//! control path. The channel is best effort: records of one producer stay in order, records of
//! different producers may interleave arbitrarily.
//!
//! A producer waits when the queue is full. Use `try_push` where waiting is not acceptable.
//!
//! ## Examples
//!
//! ```
//! use canlink::log::{Level, LogChannel, Record};
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as Mutex;
//!
//! let channel = LogChannel::<Mutex>::new();
//! let log = channel.handle();
//! log.try_push(Record::new(Level::Info, "CAN_RX", format_args!("RPM: {}", 3000)))
//!     .unwrap();
//! ```

use core::fmt::{self, Write};
use core::future::poll_fn;
use core::task::{Context, Poll};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use heapless::String;

/// Maximum record text length in bytes. Longer texts are truncated.
pub const MAX_LOG_LEN: usize = 128;

/// Number of records the channel can hold
pub const LOG_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Formatted diagnostic record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Record {
    pub level: Level,
    pub tag: &'static str,
    pub text: String<MAX_LOG_LEN>,
}

impl Record {
    pub fn new(level: Level, tag: &'static str, args: fmt::Arguments<'_>) -> Self {
        let mut text = Truncating {
            buf: String::new(),
            full: false,
        };
        // Truncating never reports an error
        let _ = text.write_fmt(args);
        Self {
            level,
            tag,
            text: text.buf,
        }
    }

    /// `(tag, message)` record
    pub fn message(level: Level, tag: &'static str, message: &str) -> Self {
        Self::new(level, tag, format_args!("{}", message))
    }

    /// `(tag, message, value)` record, rendered as `message: value`
    pub fn value(level: Level, tag: &'static str, message: &str, value: i32) -> Self {
        Self::new(level, tag, format_args!("{}: {}", message, value))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.tag, self.text)
    }
}

struct Truncating {
    buf: String<MAX_LOG_LEN>,
    full: bool,
}

impl Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.full {
                break;
            }
            // Stop at the first char that does not fit so the text stays a prefix
            self.full = self.buf.push(ch).is_err();
        }
        Ok(())
    }
}

pub struct LogChannel<M: RawMutex> {
    channel: Channel<M, Record, LOG_QUEUE_DEPTH>,
}

impl<M: RawMutex> LogChannel<M> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }
}

impl<M: RawMutex + Sync> LogChannel<M> {
    pub fn handle(&self) -> Log<'_> {
        Log(self)
    }
}

impl<M: RawMutex> Default for LogChannel<M> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) trait DynamicLog {
    fn try_push(&self, record: Record) -> Result<(), Record>;
    fn poll_ready_to_push(&self, cx: &mut Context<'_>) -> Poll<()>;
    fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<Record>;
}

impl<M: RawMutex> DynamicLog for LogChannel<M> {
    fn try_push(&self, record: Record) -> Result<(), Record> {
        self.channel.try_send(record).map_err(|err| match err {
            TrySendError::Full(record) => record,
        })
    }

    fn poll_ready_to_push(&self, cx: &mut Context<'_>) -> Poll<()> {
        self.channel.poll_ready_to_send(cx)
    }

    fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<Record> {
        self.channel.poll_receive(cx)
    }
}

/// Producer handle of a log channel
#[derive(Clone, Copy)]
pub struct Log<'a>(&'a (dyn DynamicLog + Sync));

impl<'a> Log<'a> {
    /// Pushes a record, waiting for a free slot. Safe to drop; a dropped push loses the record.
    pub async fn push(&self, record: Record) {
        let mut slot = Some(record);
        poll_fn(|cx| {
            let Some(mut record) = slot.take() else {
                return Poll::Ready(());
            };
            loop {
                match self.0.try_push(record) {
                    Ok(()) => return Poll::Ready(()),
                    Err(rejected) => record = rejected,
                }
                if self.0.poll_ready_to_push(cx).is_pending() {
                    slot = Some(record);
                    return Poll::Pending;
                }
            }
        })
        .await
    }

    /// Pushes a record if there is a free slot. Returns the record back otherwise.
    pub fn try_push(&self, record: Record) -> Result<(), Record> {
        self.0.try_push(record)
    }

    pub async fn debug(&self, tag: &'static str, args: fmt::Arguments<'_>) {
        self.push(Record::new(Level::Debug, tag, args)).await
    }

    pub async fn info(&self, tag: &'static str, args: fmt::Arguments<'_>) {
        self.push(Record::new(Level::Info, tag, args)).await
    }

    pub async fn warn(&self, tag: &'static str, args: fmt::Arguments<'_>) {
        self.push(Record::new(Level::Warn, tag, args)).await
    }

    pub async fn error(&self, tag: &'static str, args: fmt::Arguments<'_>) {
        self.push(Record::new(Level::Error, tag, args)).await
    }

    pub(crate) async fn pop(&self) -> Record {
        poll_fn(|cx| self.0.poll_pop(cx)).await
    }
}

/// Destination of diagnostic records, e.g., a UART
pub trait DiagnosticSink {
    fn write(&mut self, record: &Record);
}

impl<F: FnMut(&Record)> DiagnosticSink for F {
    fn write(&mut self, record: &Record) {
        self(record)
    }
}

/// Sink forwarding records to the `defmt` or `log` backend, whichever is enabled
#[derive(Debug, Default, Clone, Copy)]
pub struct Console;

impl DiagnosticSink for Console {
    fn write(&mut self, record: &Record) {
        let tag = record.tag;
        let text = record.text.as_str();
        match record.level {
            Level::Debug => debug!("[{}] {}", tag, text),
            Level::Info => info!("[{}] {}", tag, text),
            Level::Warn => warn!("[{}] {}", tag, text),
            Level::Error => error!("[{}] {}", tag, text),
        }
    }
}

/// Log output task.
///
/// Run at the lowest priority for proper node operation.
pub struct LogRunner<'a, S: DiagnosticSink> {
    log: Log<'a>,
    sink: S,
}

impl<'a, S: DiagnosticSink> LogRunner<'a, S> {
    pub fn new(log: Log<'a>, sink: S) -> Self {
        Self { log, sink }
    }

    pub async fn run(&mut self) -> ! {
        loop {
            let record = self.log.pop().await;
            self.sink.write(&record);
        }
    }
}
