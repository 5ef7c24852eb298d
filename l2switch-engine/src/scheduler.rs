//! Periodic BPDU origination
//!
//! The scheduler runs as a tokio task next to the receive loop and only
//! touches the shared [`StpBridge`]. It is stopped through its
//! [`SchedulerHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use l2switch_core::{Error, LinkDriver, Result};
use l2switch_protocols::stp::StpBridge;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::MIN_HELLO_INTERVAL;
use crate::stats::SwitchStats;

/// Sends a hello on every designated trunk once per interval
pub struct BpduScheduler {
    bridge: Arc<StpBridge>,
    link: Arc<dyn LinkDriver>,
    interval: Duration,
    stats: SwitchStats,
}

impl BpduScheduler {
    /// `interval` is raised to [`MIN_HELLO_INTERVAL`] if shorter
    pub fn new(bridge: Arc<StpBridge>, link: Arc<dyn LinkDriver>, interval: Duration) -> Self {
        Self {
            bridge,
            link,
            interval: interval.max(MIN_HELLO_INTERVAL),
            stats: SwitchStats::new(),
        }
    }

    /// Count transmissions into shared switch counters
    pub fn with_stats(mut self, stats: SwitchStats) -> Self {
        self.stats = stats;
        self
    }

    /// Spawn the scheduler onto the current tokio runtime
    ///
    /// The first hello goes out immediately.
    pub fn spawn(self) -> SchedulerHandle {
        let running = Arc::new(AtomicBool::new(true));
        let wake = Arc::new(Notify::new());

        let task_running = Arc::clone(&running);
        let task_wake = Arc::clone(&wake);
        let bridge_id = self.bridge.priority();

        info!(
            bridge = bridge_id,
            interval_ms = self.interval.as_millis() as u64,
            "Starting BPDU scheduler"
        );

        let task_handle = tokio::spawn(async move {
            let passes = self.run(task_running, task_wake).await;
            info!(bridge = bridge_id, passes, "BPDU scheduler stopped");
            passes
        });

        SchedulerHandle {
            bridge_id,
            running,
            wake,
            task_handle: Some(task_handle),
        }
    }

    async fn run(self, running: Arc<AtomicBool>, wake: Arc<Notify>) -> u64 {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wake.notified() => {}
            }

            if !running.load(Ordering::Relaxed) {
                break;
            }

            let report = self.bridge.originate(self.link.as_ref());
            self.stats.record_bpdus_sent(report.sent, report.failed);
            passes += 1;

            debug!(
                bridge = self.bridge.priority(),
                sent = report.sent,
                failed = report.failed,
                "hello pass"
            );
        }

        passes
    }
}

/// Handle to a running [`BpduScheduler`]
pub struct SchedulerHandle {
    bridge_id: u16,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task_handle: Option<JoinHandle<u64>>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Signal the scheduler to stop after its current pass
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.wake.notify_one();
    }

    /// Stop the scheduler and wait for the task, returning how many passes ran
    pub async fn stop_and_wait(&mut self) -> Result<u64> {
        debug!(bridge = self.bridge_id, "Stopping BPDU scheduler");
        self.stop();

        let Some(task_handle) = self.task_handle.take() else {
            warn!(bridge = self.bridge_id, "BPDU scheduler already joined");
            return Ok(0);
        };

        match task_handle.await {
            Ok(passes) => Ok(passes),
            Err(e) if e.is_panic() => {
                error!(bridge = self.bridge_id, "BPDU scheduler panicked");
                Err(Error::Task("BPDU scheduler panicked".to_string()))
            }
            Err(e) => {
                error!(bridge = self.bridge_id, error = %e, "Failed to join BPDU scheduler");
                Err(Error::Task(format!("failed to join BPDU scheduler: {}", e)))
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2switch_core::{MacAddr, PortMode};
    use l2switch_link::MemoryLink;
    use l2switch_protocols::stp::Bpdu;

    const MAC: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x14]);

    fn setup() -> (Arc<StpBridge>, Arc<MemoryLink>) {
        let modes = vec![PortMode::Trunk, PortMode::Trunk, PortMode::Access(10)];
        (
            Arc::new(StpBridge::new(20, MAC, modes)),
            Arc::new(MemoryLink::new(MAC, 3)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_every_interval() {
        let (bridge, link) = setup();
        let stats = SwitchStats::new();

        let mut handle = BpduScheduler::new(bridge, link.clone(), Duration::from_secs(1))
            .with_stats(stats.clone())
            .spawn();
        assert!(handle.is_running());

        time::sleep(Duration::from_millis(3500)).await;
        let passes = handle.stop_and_wait().await.unwrap();

        assert_eq!(passes, 4);
        assert!(!handle.is_running());

        let sent = link.transmitted();
        assert_eq!(sent.len(), 8);
        assert!(sent.iter().all(|(port, _)| *port < 2));
        assert_eq!(Bpdu::decode(&sent[0].1).unwrap(), Bpdu::new(20, 0, 20));
        assert_eq!(stats.snapshot().bpdus_sent, 8);
    }

    #[tokio::test]
    async fn test_stop_is_prompt() {
        let (bridge, link) = setup();
        let mut handle =
            BpduScheduler::new(bridge, link.clone(), Duration::from_secs(3600)).spawn();

        tokio::task::yield_now().await;
        let result = time::timeout(Duration::from_secs(1), handle.stop_and_wait()).await;

        assert!(result.is_ok(), "scheduler did not stop within a second");
        assert!(result.unwrap().unwrap() <= 1);
    }

    #[tokio::test]
    async fn test_second_wait_is_noop() {
        let (bridge, link) = setup();
        let mut handle = BpduScheduler::new(bridge, link, Duration::from_millis(10)).spawn();

        handle.stop_and_wait().await.unwrap();
        assert_eq!(handle.stop_and_wait().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follows_bridge_state() {
        let (bridge, link) = setup();
        // Port 0 becomes root port, port 1 blocked: nothing left to advertise on
        bridge
            .receive_bpdu(0, &Bpdu::new(10, 0, 10), link.as_ref())
            .unwrap();
        bridge
            .receive_bpdu(1, &Bpdu::new(10, 10, 30), link.as_ref())
            .unwrap();
        link.take_transmitted();

        let mut handle =
            BpduScheduler::new(bridge, link.clone(), Duration::from_secs(1)).spawn();
        time::sleep(Duration::from_millis(2500)).await;
        handle.stop_and_wait().await.unwrap();

        assert!(link.transmitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_runs_at_minimum() {
        let (bridge, link) = setup();

        let mut handle = BpduScheduler::new(bridge, link, Duration::ZERO).spawn();
        time::sleep(MIN_HELLO_INTERVAL * 3 / 2).await;
        let passes = handle.stop_and_wait().await.unwrap();

        // First hello at once, one more after the minimum interval
        assert_eq!(passes, 2);
    }
}
