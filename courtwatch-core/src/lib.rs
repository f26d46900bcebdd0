//! Core types and the poll driver for the courtwatch availability notifier.

/// Venue tunables loaded once at startup.
pub mod config;
/// Merging of openings into day-grouped ranges.
pub mod consolidate;
/// Detection of openings between two snapshots.
pub mod diff;
/// Poll loop state machine.
pub mod driver;
/// Domain models shared by all crates.
pub mod model;
/// Conversion of raw slots into snapshots.
pub mod normalize;
/// Message rendering and delivery with fallbacks.
pub mod notify;
/// Traits describing the external collaborators.
pub mod ports;
/// In-memory and file-backed snapshot stores.
pub mod store;

pub use config::*;
pub use consolidate::*;
pub use diff::*;
pub use driver::*;
pub use model::*;
pub use normalize::*;
pub use notify::*;
pub use ports::*;
pub use store::*;
