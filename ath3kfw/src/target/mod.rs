//! Radio-specific boot logic.

pub mod ar3k;
pub mod variant;

pub use ar3k::{Ar3kLoader, BootReport, StageOutcome, SwitchOutcome};
pub use variant::Variant;
