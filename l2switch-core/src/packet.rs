//! Packet types

use std::time::Instant;

use crate::PortId;

/// A frame handed up by the link driver
#[derive(Debug, Clone)]
pub struct Packet {
    /// When the frame was received
    pub timestamp: Instant,
    /// Ingress port
    pub port: PortId,
    /// Frame data (including all headers)
    pub data: Vec<u8>,
}

impl Packet {
    /// Create a new packet received now
    pub fn new(port: PortId, data: Vec<u8>) -> Self {
        Self {
            timestamp: Instant::now(),
            port,
            data,
        }
    }

    /// Get packet data as slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get packet length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if packet is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
