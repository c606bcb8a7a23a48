//! Cache module for the fetched weather document
//!
//! The store persists the last successful fetch with the time it was stored.
//! The controller runs one fetch-or-reuse cycle on top of it, degrading to the
//! stale copy when the network is unavailable.

pub mod controller;
pub mod store;

pub use controller::{CacheController, CycleError, CycleOutcome};
pub use store::{Artifact, ArtifactStore, StoreError};
