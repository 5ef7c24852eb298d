//! l2switch Core Library
//!
//! This crate provides the fundamental types, configuration parsing, error
//! handling and the link-driver trait shared by every l2switch crate.

pub mod config;
pub mod error;
pub mod interface;
pub mod packet;
pub mod types;

// Re-export commonly used types
pub use config::{PortConfig, SwitchConfig, SWITCH_NUM_INTERFACES};
pub use error::{Error, Result};
pub use interface::LinkDriver;
pub use packet::Packet;
pub use types::*;
