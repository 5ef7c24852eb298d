//! Content-addressable memory (MAC learning) table

pub mod table;

pub use table::{ForwardingEntry, ForwardingTable};
