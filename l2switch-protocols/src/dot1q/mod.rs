//! VLAN tagging and access/trunk policy
//!
//! ## Tag Format
//!
//! Trunk links carry a 4-byte tag inserted directly after the MAC pair:
//! ```text
//! Ethernet Frame:
//!   Dst MAC: 6 bytes
//!   Src MAC: 6 bytes
//!   TPID: 0x8200 (2 bytes) - switch tag marker
//!   TCI: 2 bytes - low 12 bits are the VLAN id
//!   EtherType: 2 bytes
//!   Payload...
//! ```
//!
//! The marker is not the IEEE 0x8100 TPID; host stacks leave it alone.
//!
//! ## Port Modes
//!
//! | ingress | egress | result |
//! |---|---|---|
//! | access v | access v | forward |
//! | access v | access w | drop |
//! | access v | trunk | tag v |
//! | trunk (tag v) | access v | strip |
//! | trunk (tag v) | access w | drop |
//! | trunk | trunk | forward |

pub mod packet;
pub mod policy;

pub use packet::{
    has_vlan_tag, insert_vlan_tag, strip_vlan_tag, VlanTag, VLAN_TAG_OFFSET, VLAN_TAG_SIZE,
    VLAN_TPID,
};
pub use policy::{DropReason, VlanDecision, VlanPolicy};
