//! Command acknowledgment tracking
//!
//! At most one command is outstanding at a time. The tracker only decides; the runner owns the
//! timer and reports the outcome.

use crate::time::{Duration, Instant};

/// Outstanding command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingAck {
    pub command: u8,
    pub issued_at: Instant,
    pub deadline: Instant,
}

/// Published acknowledgment state of a monitor node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckState {
    #[default]
    Idle,
    CommandSent { command: u8, deadline: Instant },
}

/// Classification of a received Ack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckOutcome {
    /// Ack matched the outstanding command, which is now resolved
    Acknowledged(PendingAck),
    /// Ack code differs from the outstanding command, which stays pending
    Mismatched { expected: u8, received: u8 },
    /// No command was outstanding
    Unsolicited(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AckStats {
    pub issued: u32,
    pub acknowledged: u32,
    pub timed_out: u32,
    /// Mismatched and unsolicited acks
    pub stray: u32,
}

/// A command is already outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Busy {
    pub pending: u8,
}

#[derive(Debug)]
pub struct AckTracker {
    timeout: Duration,
    pending: Option<PendingAck>,
    stats: AckStats,
}

impl AckTracker {
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: None,
            stats: AckStats {
                issued: 0,
                acknowledged: 0,
                timed_out: 0,
                stray: 0,
            },
        }
    }

    /// Starts waiting for the acknowledgment of a command sent at `now`.
    pub fn arm(&mut self, command: u8, now: Instant) -> Result<(), Busy> {
        if let Some(pending) = &self.pending {
            return Err(Busy {
                pending: pending.command,
            });
        }
        self.pending = Some(PendingAck {
            command,
            issued_at: now,
            deadline: now + self.timeout,
        });
        self.stats.issued = self.stats.issued.wrapping_add(1);
        Ok(())
    }

    pub fn on_ack(&mut self, code: u8) -> AckOutcome {
        match self.pending {
            Some(pending) if pending.command == code => {
                self.pending = None;
                self.stats.acknowledged = self.stats.acknowledged.wrapping_add(1);
                AckOutcome::Acknowledged(pending)
            }
            Some(pending) => {
                self.stats.stray = self.stats.stray.wrapping_add(1);
                AckOutcome::Mismatched {
                    expected: pending.command,
                    received: code,
                }
            }
            None => {
                self.stats.stray = self.stats.stray.wrapping_add(1);
                AckOutcome::Unsolicited(code)
            }
        }
    }

    /// Resolves the outstanding command as timed out if its deadline is reached.
    ///
    /// Returns the expired command. A command expires only once.
    pub fn expire(&mut self, now: Instant) -> Option<PendingAck> {
        let pending = self.pending.filter(|pending| now >= pending.deadline)?;
        self.pending = None;
        self.stats.timed_out = self.stats.timed_out.wrapping_add(1);
        Some(pending)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.deadline)
    }

    pub fn pending(&self) -> Option<&PendingAck> {
        self.pending.as_ref()
    }

    pub fn state(&self) -> AckState {
        match self.pending {
            None => AckState::Idle,
            Some(pending) => AckState::CommandSent {
                command: pending.command,
                deadline: pending.deadline,
            },
        }
    }

    pub fn stats(&self) -> AckStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_matching_ack() {
        let mut tracker = AckTracker::new(TIMEOUT);
        tracker.arm(0x02, at(1000)).unwrap();
        assert_eq!(
            tracker.state(),
            AckState::CommandSent {
                command: 0x02,
                deadline: at(1200)
            }
        );

        let outcome = tracker.on_ack(0x02);
        assert_eq!(
            outcome,
            AckOutcome::Acknowledged(PendingAck {
                command: 0x02,
                issued_at: at(1000),
                deadline: at(1200),
            })
        );
        assert_eq!(tracker.state(), AckState::Idle);
        assert_eq!(tracker.expire(at(5000)), None);
        assert_eq!(tracker.stats().acknowledged, 1);
        assert_eq!(tracker.stats().timed_out, 0);
    }

    #[test]
    fn test_mismatched_ack_keeps_pending() {
        let mut tracker = AckTracker::new(TIMEOUT);
        tracker.arm(0x02, at(0)).unwrap();

        assert_eq!(
            tracker.on_ack(0x01),
            AckOutcome::Mismatched {
                expected: 0x02,
                received: 0x01
            }
        );
        assert_eq!(tracker.pending().map(|p| p.command), Some(0x02));
        assert_eq!(tracker.stats().stray, 1);
    }

    #[test]
    fn test_unsolicited_ack() {
        let mut tracker = AckTracker::new(TIMEOUT);
        assert_eq!(tracker.on_ack(0x02), AckOutcome::Unsolicited(0x02));
        assert_eq!(tracker.state(), AckState::Idle);
        assert_eq!(tracker.stats().stray, 1);
    }

    #[test]
    fn test_single_outstanding_command() {
        let mut tracker = AckTracker::new(TIMEOUT);
        tracker.arm(0x01, at(0)).unwrap();
        assert_eq!(tracker.arm(0x02, at(10)), Err(Busy { pending: 0x01 }));
        assert_eq!(tracker.deadline(), Some(at(200)));
        assert_eq!(tracker.stats().issued, 1);
    }

    #[test]
    fn test_expire_once_at_deadline() {
        let mut tracker = AckTracker::new(TIMEOUT);
        tracker.arm(0x01, at(100)).unwrap();

        assert_eq!(tracker.expire(at(299)), None);
        let expired = tracker.expire(at(300)).unwrap();
        assert_eq!(expired.command, 0x01);
        assert_eq!(tracker.expire(at(400)), None);
        assert_eq!(tracker.state(), AckState::Idle);
        assert_eq!(tracker.stats().timed_out, 1);

        // Ack after the timeout is a stray
        assert_eq!(tracker.on_ack(0x01), AckOutcome::Unsolicited(0x01));
    }

    #[test]
    fn test_rearm_after_resolution() {
        let mut tracker = AckTracker::new(TIMEOUT);
        tracker.arm(0x01, at(0)).unwrap();
        tracker.expire(at(200)).unwrap();
        tracker.arm(0x02, at(250)).unwrap();
        assert_eq!(tracker.deadline(), Some(at(450)));
        assert_eq!(tracker.stats().issued, 2);
    }
}
