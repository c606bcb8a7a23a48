//! UI rendering module
//!
//! Plain-text status output for the terminal.

pub mod status;

pub use status::StatusView;
