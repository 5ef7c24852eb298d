//! Common types used throughout l2switch

use std::fmt;
use std::str::FromStr;

/// MAC Address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// Zero MAC address (00:00:00:00:00:00)
    pub const ZERO: MacAddr = MacAddr([0x00; 6]);

    /// Bridge group address that carries BPDUs (01:80:c2:00:00:00)
    pub const STP_MULTICAST: MacAddr = MacAddr([0x01, 0x80, 0xC2, 0x00, 0x00, 0x00]);

    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Create a MAC address from the first six bytes of a slice
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = slice.get(..6)?.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Group bit set (multicast, including broadcast)
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub fn is_unicast(&self) -> bool {
        !self.is_multicast()
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(crate::Error::protocol("Invalid MAC address format"));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| crate::Error::protocol("Invalid MAC address hex"))?;
        }

        Ok(MacAddr(bytes))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }
}

/// Index of a switch port, as handed out by the link driver
pub type PortId = usize;

/// VLAN identifier (low 12 bits significant)
pub type VlanId = u16;

/// Highest VLAN id representable in a tag
pub const MAX_VLAN_ID: VlanId = 0x0FFF;

/// Link mode of a switch port, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortMode {
    /// Untagged port on a single VLAN; never takes part in spanning tree
    Access(VlanId),
    /// Tagged port carrying every VLAN; takes part in spanning tree
    Trunk,
}

impl PortMode {
    pub fn is_trunk(&self) -> bool {
        matches!(self, PortMode::Trunk)
    }

    /// Configured VLAN for access ports
    pub fn access_vlan(&self) -> Option<VlanId> {
        match self {
            PortMode::Access(vlan) => Some(*vlan),
            PortMode::Trunk => None,
        }
    }
}

impl fmt::Display for PortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortMode::Access(vlan) => write!(f, "access vlan {}", vlan),
            PortMode::Trunk => write!(f, "trunk"),
        }
    }
}

/// Ethertype constants
pub mod ethertypes {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    /// Tag marker placed at offset 12 of trunk frames (not the IEEE 0x8100)
    pub const SWITCH_VLAN_TPID: u16 = 0x8200;
    pub const IPV6: u16 = 0x86DD;
}
