//! Inbound frame queue
//!
//! The queue is the only object shared between the bus receive interrupt and task context.
//! The interrupt side pushes without blocking: when all `INBOUND_QUEUE_DEPTH` slots are taken,
//! the newly received frame is discarded and counted. The task side suspends on `pop` until a
//! frame arrives; the waker is registered with the channel, no polling loop is involved.
//!
//! Frames are delivered in push order.

use canlink_driver::internal::DynamicRx;
use core::cell::Cell;
use core::future::poll_fn;
use core::task::{Context, Poll};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::frame::Frame;
use crate::link::Dropped;

/// Number of frames the queue can hold
pub const INBOUND_QUEUE_DEPTH: usize = 10;

pub struct InboundQueue<M: RawMutex> {
    channel: Channel<M, Frame, INBOUND_QUEUE_DEPTH>,
    dropped: Mutex<M, Cell<u32>>,
}

impl<M: RawMutex> InboundQueue<M> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: Mutex::new(Cell::new(0)),
        }
    }

    /// Enqueues a frame. Never blocks; safe to call from an interrupt handler with an
    /// interrupt-safe mutex.
    pub fn push(&self, frame: Frame) -> Result<(), Dropped> {
        match self.channel.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.lock(|cell| cell.set(cell.get().wrapping_add(1)));
                Err(Dropped)
            }
        }
    }

    /// Waits for the oldest frame. Safe to drop.
    pub async fn pop(&self) -> Frame {
        poll_fn(|cx| self.poll_pop(cx)).await
    }

    pub fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<Frame> {
        self.channel.poll_receive(cx)
    }

    pub fn try_pop(&self) -> Option<Frame> {
        self.channel.try_receive().ok()
    }

    /// Total number of frames discarded because the queue was full. Wraps on overflow.
    pub fn dropped(&self) -> u32 {
        self.dropped.lock(|cell| cell.get())
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<M: RawMutex> Default for InboundQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> DynamicRx for InboundQueue<M> {
    fn try_push(&self, frame: Frame) -> Result<(), Frame> {
        self.push(frame).map_err(|_| frame)
    }
}

pub(crate) trait DynamicInbound {
    fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<Frame>;
    fn dropped(&self) -> u32;
}

impl<M: RawMutex> DynamicInbound for InboundQueue<M> {
    fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<Frame> {
        InboundQueue::poll_pop(self, cx)
    }

    fn dropped(&self) -> u32 {
        InboundQueue::dropped(self)
    }
}

/// Task-side handle of the inbound queue
#[derive(Clone, Copy)]
pub(crate) struct Inbound<'a>(&'a (dyn DynamicInbound + Sync));

impl<'a> Inbound<'a> {
    pub(crate) fn new(queue: &'a (dyn DynamicInbound + Sync)) -> Self {
        Self(queue)
    }

    pub(crate) async fn pop(&self) -> Frame {
        poll_fn(|cx| self.0.poll_pop(cx)).await
    }

    pub(crate) fn dropped(&self) -> u32 {
        self.0.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CanId;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use futures_executor::block_on;

    fn frame(seq: u8) -> Frame {
        Frame::new(CanId::new(0x100).unwrap(), &[seq]).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let queue = InboundQueue::<CriticalSectionRawMutex>::new();
        for seq in 0..4 {
            queue.push(frame(seq)).unwrap();
        }
        for seq in 0..4 {
            assert_eq!(block_on(queue.pop()), frame(seq));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_drops_newest() {
        const PUSHED: u8 = 13;
        let queue = InboundQueue::<CriticalSectionRawMutex>::new();

        let mut rejected = 0;
        for seq in 0..PUSHED {
            if queue.push(frame(seq)).is_err() {
                rejected += 1;
            }
        }

        let excess = usize::from(PUSHED) - INBOUND_QUEUE_DEPTH;
        assert_eq!(rejected, excess);
        assert_eq!(queue.dropped() as usize, excess);
        assert_eq!(queue.len(), INBOUND_QUEUE_DEPTH);

        for seq in 0..INBOUND_QUEUE_DEPTH as u8 {
            assert_eq!(queue.try_pop(), Some(frame(seq)));
        }
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_slot_reuse_after_pop() {
        let queue = InboundQueue::<CriticalSectionRawMutex>::new();
        for seq in 0..INBOUND_QUEUE_DEPTH as u8 {
            queue.push(frame(seq)).unwrap();
        }
        assert!(queue.push(frame(0xff)).is_err());

        assert_eq!(queue.try_pop(), Some(frame(0)));
        queue.push(frame(0xfe)).unwrap();
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn test_driver_handle() {
        let queue = InboundQueue::<CriticalSectionRawMutex>::new();
        let rx = crate::link::Rx::new(&queue);
        rx.push(frame(1)).unwrap();
        assert_eq!(queue.try_pop(), Some(frame(1)));
    }
}
