//! Command-line interface for l2switch
//!
//! Argument parsing and shutdown handling live here so they can be tested
//! apart from the binary.

pub mod args;
pub mod shutdown;

pub use args::Cli;
pub use shutdown::until_shutdown;
