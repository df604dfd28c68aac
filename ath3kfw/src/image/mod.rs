//! Firmware image handling.

pub mod dfu;

pub use dfu::{
    Firmware, MIN_FIRMWARE_LEN, PatchTrailer, legacy_firmware_path, patch_path, syscfg_path,
};
