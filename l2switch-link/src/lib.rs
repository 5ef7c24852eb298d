//! Link-layer drivers for l2switch
//!
//! Two implementations of [`l2switch_core::LinkDriver`]:
//!
//! - [`DatalinkDriver`] - raw Ethernet channels on real interfaces (pnet)
//! - [`MemoryLink`] - queue-backed link for tests and simulations
//!
//! ## Example
//!
//! ```
//! use l2switch_core::{LinkDriver, MacAddr};
//! use l2switch_link::MemoryLink;
//!
//! let link = MemoryLink::new(MacAddr::ZERO, 4);
//! link.inject(1, vec![0xFF; 60]);
//!
//! let packet = link.receive_any().unwrap();
//! assert_eq!(packet.port, 1);
//! ```

pub mod datalink;
pub mod memory;

pub use datalink::{find_interface, interface_mac, DatalinkDriver};
pub use memory::MemoryLink;
