//! In-memory link
//!
//! Frames are injected by hand and every transmission is recorded, which is
//! enough to drive a switch (or a wired-up set of switches) without sockets.

use l2switch_core::{Error, LinkDriver, MacAddr, Packet, PortId, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::trace;

/// Queue-backed [`LinkDriver`]
pub struct MemoryLink {
    mac: MacAddr,
    names: Vec<String>,
    inbound: Mutex<VecDeque<Packet>>,
    arrived: Condvar,
    transmitted: Mutex<Vec<(PortId, Vec<u8>)>>,
    down: Mutex<HashSet<PortId>>,
}

impl MemoryLink {
    /// Link with `port_count` ports named `mem0`, `mem1`, ...
    pub fn new(mac: MacAddr, port_count: usize) -> Self {
        let names = (0..port_count).map(|i| format!("mem{}", i)).collect();
        Self::with_names(mac, names)
    }

    pub fn with_names(mac: MacAddr, names: Vec<String>) -> Self {
        Self {
            mac,
            names,
            inbound: Mutex::new(VecDeque::new()),
            arrived: Condvar::new(),
            transmitted: Mutex::new(Vec::new()),
            down: Mutex::new(HashSet::new()),
        }
    }

    /// Queue a frame as if it had been received on `port`
    pub fn inject(&self, port: PortId, frame: Vec<u8>) {
        self.inbound.lock().push_back(Packet::new(port, frame));
        self.arrived.notify_one();
    }

    /// Pop the next received frame without waiting
    pub fn try_receive(&self) -> Option<Packet> {
        self.inbound.lock().pop_front()
    }

    /// Frames waiting to be received
    pub fn pending(&self) -> usize {
        self.inbound.lock().len()
    }

    /// Drain everything transmitted so far
    pub fn take_transmitted(&self) -> Vec<(PortId, Vec<u8>)> {
        std::mem::take(&mut *self.transmitted.lock())
    }

    /// Copy of everything transmitted so far
    pub fn transmitted(&self) -> Vec<(PortId, Vec<u8>)> {
        self.transmitted.lock().clone()
    }

    /// Make transmissions on `port` fail (or succeed again)
    pub fn set_port_down(&self, port: PortId, down: bool) {
        let mut set = self.down.lock();
        if down {
            set.insert(port);
        } else {
            set.remove(&port);
        }
    }
}

impl LinkDriver for MemoryLink {
    fn receive_timeout(&self, timeout: Duration) -> Result<Option<Packet>> {
        let mut inbound = self.inbound.lock();
        if inbound.is_empty() {
            self.arrived.wait_for(&mut inbound, timeout);
        }
        Ok(inbound.pop_front())
    }

    fn transmit(&self, port: PortId, frame: &[u8]) -> Result<()> {
        if port >= self.names.len() {
            return Err(Error::PortOutOfRange(port));
        }
        if self.down.lock().contains(&port) {
            return Err(Error::link(port, "link down"));
        }

        trace!(port, len = frame.len(), "memory transmit");
        self.transmitted.lock().push((port, frame.to_vec()));
        Ok(())
    }

    fn mac_address(&self) -> MacAddr {
        self.mac
    }

    fn interface_name(&self, port: PortId) -> Option<&str> {
        self.names.get(port).map(String::as_str)
    }

    fn port_count(&self) -> usize {
        self.names.len()
    }
}
