//! BPDU packet structure and parsing
//!
//! The switch uses a compact, untagged BPDU rather than the 802.1D
//! configuration BPDU:
//! ```text
//!   Dst MAC: 01:80:C2:00:00:00 (6 bytes)
//!   Src MAC: sending switch (6 bytes)
//!   Root ID: 2 bytes
//!   Sender path cost: 2 bytes
//!   Sender ID: 2 bytes
//! ```

use bytes::{Buf, BufMut, BytesMut};
use l2switch_core::{Error, MacAddr, Result};
use std::fmt;

use super::constants::*;
use super::BridgeId;

/// Spanning tree hello carried between trunk ports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bpdu {
    /// Bridge the sender believes to be root
    pub root_id: BridgeId,
    /// Sender's cost to reach that root
    pub sender_path_cost: u16,
    /// Sender's own bridge identity
    pub sender_id: BridgeId,
}

impl Bpdu {
    pub fn new(root_id: BridgeId, sender_path_cost: u16, sender_id: BridgeId) -> Self {
        Self {
            root_id,
            sender_path_cost,
            sender_id,
        }
    }

    /// Build the complete 18-byte frame sent from `src_mac`
    pub fn encode(&self, src_mac: MacAddr) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(BPDU_SIZE);

        buf.put_slice(STP_MULTICAST_MAC.as_bytes());
        buf.put_slice(src_mac.as_bytes());
        buf.put_u16(self.root_id);
        buf.put_u16(self.sender_path_cost);
        buf.put_u16(self.sender_id);

        buf.to_vec()
    }

    /// Parse a BPDU from a complete frame
    ///
    /// Trailing bytes (Ethernet padding) are ignored.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() < BPDU_SIZE {
            return Err(Error::too_short(BPDU_SIZE, frame.len()));
        }

        if frame[0..6] != STP_MULTICAST_MAC.0 {
            return Err(Error::protocol(format!(
                "BPDU not addressed to the bridge group address: {}",
                MacAddr::from_slice(&frame[0..6]).unwrap_or(MacAddr::ZERO)
            )));
        }

        let mut buf = &frame[BPDU_FIELDS_OFFSET..BPDU_SIZE];

        Ok(Self {
            root_id: buf.get_u16(),
            sender_path_cost: buf.get_u16(),
            sender_id: buf.get_u16(),
        })
    }
}

impl fmt::Display for Bpdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BPDU root={} cost={} sender={}",
            self.root_id, self.sender_path_cost, self.sender_id
        )
    }
}
