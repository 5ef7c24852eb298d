//! Switch counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames handed up by the link driver
    pub frames_received: u64,
    /// Successful data transmissions (one per egress port)
    pub frames_forwarded: u64,
    /// Frames that reached no port
    pub frames_dropped: u64,
    /// BPDUs received on any port
    pub bpdus_received: u64,
    /// BPDUs transmitted
    pub bpdus_sent: u64,
    /// Transmissions the link driver rejected
    pub tx_errors: u64,
    /// Time since the counters were created
    pub uptime: Duration,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx {} fwd {} drop {} | bpdu rx {} tx {} | tx errors {} | up {:.1}s",
            self.frames_received,
            self.frames_forwarded,
            self.frames_dropped,
            self.bpdus_received,
            self.bpdus_sent,
            self.tx_errors,
            self.uptime.as_secs_f64()
        )
    }
}

/// Thread-safe counters shared by the receive loop and the scheduler
#[derive(Debug, Clone)]
pub struct SwitchStats {
    frames_received: Arc<AtomicU64>,
    frames_forwarded: Arc<AtomicU64>,
    frames_dropped: Arc<AtomicU64>,
    bpdus_received: Arc<AtomicU64>,
    bpdus_sent: Arc<AtomicU64>,
    tx_errors: Arc<AtomicU64>,
    start_time: Instant,
}

impl SwitchStats {
    pub fn new() -> Self {
        Self {
            frames_received: Arc::new(AtomicU64::new(0)),
            frames_forwarded: Arc::new(AtomicU64::new(0)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            bpdus_received: Arc::new(AtomicU64::new(0)),
            bpdus_sent: Arc::new(AtomicU64::new(0)),
            tx_errors: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bpdu_received(&self) {
        self.bpdus_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Account for a batch of BPDU transmissions
    pub fn record_bpdus_sent(&self, sent: usize, failed: usize) {
        self.bpdus_sent.fetch_add(sent as u64, Ordering::Relaxed);
        self.tx_errors.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn record_tx_error(&self) {
        self.tx_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            bpdus_received: self.bpdus_received.load(Ordering::Relaxed),
            bpdus_sent: self.bpdus_sent.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            uptime: self.start_time.elapsed(),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.frames_received,
            &self.frames_forwarded,
            &self.frames_dropped,
            &self.bpdus_received,
            &self.bpdus_sent,
            &self.tx_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for SwitchStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = SwitchStats::new();
        stats.record_received();
        stats.record_received();
        stats.record_forwarded();
        stats.record_dropped();
        stats.record_bpdu_received();
        stats.record_bpdus_sent(3, 1);
        stats.record_tx_error();

        let snap = stats.snapshot();
        assert_eq!(snap.frames_received, 2);
        assert_eq!(snap.frames_forwarded, 1);
        assert_eq!(snap.frames_dropped, 1);
        assert_eq!(snap.bpdus_received, 1);
        assert_eq!(snap.bpdus_sent, 3);
        assert_eq!(snap.tx_errors, 2);
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = SwitchStats::new();
        let clone = stats.clone();
        clone.record_forwarded();

        assert_eq!(stats.snapshot().frames_forwarded, 1);
    }

    #[test]
    fn test_reset() {
        let stats = SwitchStats::new();
        stats.record_received();
        stats.record_bpdus_sent(2, 2);
        stats.reset();

        let snap = stats.snapshot();
        assert_eq!(snap.frames_received, 0);
        assert_eq!(snap.bpdus_sent, 0);
        assert_eq!(snap.tx_errors, 0);
    }
}
