//! Switch engine for l2switch
//!
//! This crate ties the protocol pieces together into a running switch:
//!
//! - `Switch`: the forwarding decision engine and its receive loop
//! - `BpduScheduler`: periodic spanning tree hellos on a tokio task
//! - `SwitchStats`: counters shared by both
//!
//! # Example
//!
//! ```
//! use l2switch_core::{MacAddr, PortMode};
//! use l2switch_engine::{Disposition, EngineConfig, Switch};
//! use l2switch_link::MemoryLink;
//! use l2switch_packet::{EtherType, EthernetFrame};
//!
//! let mac = MacAddr([0x02, 0, 0, 0, 0, 1]);
//! let modes = vec![PortMode::Access(10), PortMode::Access(10), PortMode::Trunk];
//! let mut switch = Switch::new(10, mac, modes, EngineConfig::default());
//! let link = MemoryLink::new(mac, 3);
//!
//! let host = MacAddr([0, 0, 0, 0, 0, 7]);
//! let frame = EthernetFrame::new(MacAddr::BROADCAST, host, EtherType::IPv4, vec![0; 20]);
//!
//! let disposition = switch.handle_frame(0, &frame.to_bytes(), &link);
//! assert_eq!(disposition, Disposition::Forwarded { ports: vec![1, 2] });
//! assert_eq!(switch.table().lookup(&host), Some(0));
//! ```

pub mod config;
pub mod engine;
pub mod scheduler;
pub mod stats;


pub use config::EngineConfig;
pub use engine::{Disposition, Switch};
pub use scheduler::{BpduScheduler, SchedulerHandle};
pub use stats::{StatsSnapshot, SwitchStats};
