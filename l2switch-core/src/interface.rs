//! Link-layer driver boundary
//!
//! The switch never touches sockets or buffers itself. Everything it needs
//! from the physical side goes through [`LinkDriver`].

use std::time::Duration;

use crate::{MacAddr, Packet, PortId, Result};

/// Frame I/O on a fixed set of numbered ports
pub trait LinkDriver: Send + Sync {
    /// Wait up to `timeout` for a frame on any port
    ///
    /// `Ok(None)` means nothing arrived in time.
    fn receive_timeout(&self, timeout: Duration) -> Result<Option<Packet>>;

    /// Send a complete Ethernet frame out of `port`
    fn transmit(&self, port: PortId, frame: &[u8]) -> Result<()>;

    /// MAC address the switch uses as the source of its own BPDUs
    fn mac_address(&self) -> MacAddr;

    /// Name of the interface behind `port`
    fn interface_name(&self, port: PortId) -> Option<&str>;

    /// Number of ports the driver was opened with
    fn port_count(&self) -> usize;

    /// Block until a frame arrives on any port
    fn receive_any(&self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.receive_timeout(Duration::from_secs(1))? {
                return Ok(packet);
            }
        }
    }
}
