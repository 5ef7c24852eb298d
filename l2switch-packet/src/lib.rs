//! Frame parsing and construction for l2switch
//!
//! The switch only ever inspects layer 2:
//!
//! - [`ethernet`] - header decoding (with switch VLAN tag detection) and a
//!   simple Ethernet II frame builder
//!
//! # Example
//!
//! ```rust
//! use l2switch_core::MacAddr;
//! use l2switch_packet::{EtherType, EthernetFrame, EthernetHeader};
//!
//! let src = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
//! let bytes = EthernetFrame::new(MacAddr::BROADCAST, src, EtherType::ARP, vec![0; 28]).to_bytes();
//!
//! let header = EthernetHeader::decode(&bytes).unwrap();
//! assert_eq!(header.source, src);
//! assert!(header.destination.is_broadcast());
//! assert_eq!(header.vlan, None);
//! ```

pub mod ethernet;

pub use ethernet::{EtherType, EthernetFrame, EthernetHeader};
