//! Switching protocols for l2switch
//!
//! Each module holds one of the independent policies the forwarding engine
//! combines on every frame.
//!
//! ## Modules
//!
//! ### CAM (MAC learning)
//! Source address learning with optional aging.
//! See [`cam`] module for details.
//!
//! ### VLAN tagging
//! Tag codec for trunk links and the access/trunk membership rules.
//! See [`dot1q`] module for details.
//!
//! ### STP (Spanning Tree)
//! Compact BPDU codec and the bridge state machine that blocks redundant
//! trunk links.
//! See [`stp`] module for details.

pub mod cam;
pub mod dot1q;
pub mod stp;

pub use cam::ForwardingTable;
pub use dot1q::{DropReason, VlanDecision, VlanPolicy};
pub use stp::{Bpdu, BridgeId, PortRole, StpBridge};
