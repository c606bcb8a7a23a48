//! weatherpoll library
//!
//! Keeps the current weather for one location available with as little
//! network traffic as possible: the last successful response is cached on
//! disk and only refetched once it is older than the freshness window.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod refresh;
pub mod ui;
