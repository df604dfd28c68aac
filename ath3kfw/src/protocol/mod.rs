//! Protocol implementations.

pub mod ath3k;
pub mod upload;

// Re-export common types
pub use ath3k::{DeviceState, RefClock, Request, VersionRecord, get_state, get_version};
pub use upload::upload;
