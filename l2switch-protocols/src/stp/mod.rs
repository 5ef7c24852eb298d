//! Simplified Spanning Tree Protocol
//!
//! Every switch starts out believing it is the root. Hellos (BPDUs) carry
//! `(root, cost, sender)` over trunk links; each switch keeps the lowest root
//! it has heard of, the cheapest port toward it, and blocks the redundant
//! links so the active topology is a tree.
//!
//! ## Port Roles
//!
//! - **RootPort** - the single port toward the root (none on the root itself)
//! - **Designated** - forwarding port that advertises the root downstream
//! - **Blocked** - redundant link, carries no data and no periodic hellos
//!
//! A changed view is still sent once on every trunk, blocked ones included.
//!
//! Access ports never take part and are always forwarding.
//!
//! ## Packet Format
//!
//! See [`packet`]. BPDUs are never VLAN tagged and always sent to
//! 01:80:C2:00:00:00.

pub mod bridge;
pub mod packet;

pub use bridge::{BridgeSnapshot, PortRole, StpBridge, TxReport};
pub use packet::Bpdu;

/// Bridge identity (priority). Lower is preferred.
pub type BridgeId = u16;

/// STP Protocol constants
pub mod constants {
    use l2switch_core::MacAddr;

    /// STP multicast destination MAC address
    pub const STP_MULTICAST_MAC: MacAddr = MacAddr::STP_MULTICAST;

    /// Complete BPDU frame size
    pub const BPDU_SIZE: usize = 18;

    /// Offset of the root id inside the frame
    pub const BPDU_FIELDS_OFFSET: usize = 12;

    /// Cost added for every hop toward the root
    pub const PATH_COST_PER_HOP: u16 = 10;

    /// Default interval between hellos (ms)
    pub const DEFAULT_HELLO_INTERVAL_MS: u64 = 1000;
}
