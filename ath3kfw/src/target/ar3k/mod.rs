//! Atheros AR3011/AR3012 support.

pub mod loader;

pub use loader::{Ar3kLoader, BootReport, Progress, StageOutcome, SwitchOutcome};

use crate::error::Result;
use crate::target::variant::Variant;
use crate::transport::Transport;
use std::path::Path;

/// Run the boot plan for `variant` with firmware below `prefix`.
pub fn run<T: Transport>(transport: T, prefix: &Path, variant: Variant) -> Result<BootReport> {
    run_with_progress(transport, prefix, variant, &mut |_, _, _| {})
}

/// Like [`run`], reporting upload progress through `progress`.
pub fn run_with_progress<T: Transport>(
    transport: T,
    prefix: &Path,
    variant: Variant,
    progress: Progress<'_>,
) -> Result<BootReport> {
    Ar3kLoader::new(transport, prefix).run(variant, progress)
}
