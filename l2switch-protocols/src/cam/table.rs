//! MAC learning table
//!
//! Maps source addresses to the port they were last seen on. The table has a
//! single writer (the receive loop) and therefore carries no lock of its own.

use l2switch_core::{MacAddr, PortId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// A learned address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingEntry {
    pub port: PortId,
    pub learned_at: Instant,
}

/// MAC address to port table with optional aging
#[derive(Debug, Default)]
pub struct ForwardingTable {
    entries: HashMap<MacAddr, ForwardingEntry>,
    aging: Option<Duration>,
}

impl ForwardingTable {
    /// Table whose entries never expire
    pub fn new() -> Self {
        Self::default()
    }

    /// Table whose entries expire `max_age` after they were last learned
    pub fn with_aging(max_age: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            aging: Some(max_age),
        }
    }

    pub fn aging(&self) -> Option<Duration> {
        self.aging
    }

    /// Record that `mac` was seen on `port`
    ///
    /// Last writer wins. Learning the same pair again only refreshes the
    /// entry's timestamp.
    pub fn learn(&mut self, mac: MacAddr, port: PortId) {
        self.learn_at(mac, port, Instant::now());
    }

    /// [`learn`](Self::learn) with an explicit timestamp
    pub fn learn_at(&mut self, mac: MacAddr, port: PortId, now: Instant) {
        let entry = ForwardingEntry {
            port,
            learned_at: now,
        };

        if let Some(previous) = self.entries.insert(mac, entry) {
            if previous.port != port {
                debug!(mac = %mac, from = previous.port, to = port, "station moved");
            }
        } else {
            debug!(mac = %mac, port, "learned station");
        }
    }

    /// Port `mac` was last seen on, if still valid
    pub fn lookup(&self, mac: &MacAddr) -> Option<PortId> {
        self.lookup_at(mac, Instant::now())
    }

    /// [`lookup`](Self::lookup) evaluated at `now`
    pub fn lookup_at(&self, mac: &MacAddr, now: Instant) -> Option<PortId> {
        let entry = self.entries.get(mac)?;
        if self.is_expired(entry, now) {
            return None;
        }
        Some(entry.port)
    }

    /// Remove every expired entry, returning how many were dropped
    ///
    /// A no-op on tables built without aging.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let Some(max_age) = self.aging else {
            return 0;
        };

        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.learned_at) < max_age);

        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "aged out stations");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, ordered by address
    pub fn entries(&self) -> Vec<(MacAddr, PortId)> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .map(|(mac, entry)| (*mac, entry.port))
            .collect();
        out.sort();
        out
    }

    fn is_expired(&self, entry: &ForwardingEntry, now: Instant) -> bool {
        match self.aging {
            Some(max_age) => now.saturating_duration_since(entry.learned_at) >= max_age,
            None => false,
        }
    }
}
