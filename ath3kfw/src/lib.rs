//! # ath3kfw
//!
//! A library for loading firmware into Atheros AR3011/AR3012 USB Bluetooth
//! radios.
//!
//! These radios enumerate in a boot personality with no usable firmware.
//! This crate talks to them over vendor USB requests and brings them up:
//!
//! - AR3011: upload the monolithic `ath3k-1.fw` image
//! - AR3012: upload the ROM patch matching the radio's ROM version, then
//!   the system configuration matching its reference clock, then switch
//!   the radio to normal mode and to its runtime VID/PID
//!
//! ## Features
//!
//! - `serde`: Serialization support for data types
//!
//! ## Example
//!
//! ```rust,no_run
//! use ath3kfw::{Variant, open_device, parse_device_name};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (bus, address) = parse_device_name("ugen0.2")?;
//!     let transport = open_device(bus, address)?;
//!
//!     let report = ath3kfw::run(
//!         transport,
//!         Path::new("/usr/share/firmware/ath3k"),
//!         Variant::Ar3012,
//!     )?;
//!     println!("{report:?}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod error;
pub mod image;
pub mod protocol;
pub mod target;
pub mod transport;

/// Default firmware prefix directory.
pub const DEFAULT_FIRMWARE_PATH: &str = "/usr/share/firmware/ath3k/";

// Re-exports for convenience
pub use {
    device::{
        DetectedDevice, DeviceKind, format_device_list, list_devices, open_device,
        parse_device_name, usb_context,
    },
    error::{Error, Result},
    image::{Firmware, PatchTrailer},
    protocol::{DeviceState, RefClock, Request, VersionRecord, get_state, get_version},
    target::{
        Ar3kLoader, BootReport, StageOutcome, SwitchOutcome, Variant,
        ar3k::{run, run_with_progress},
    },
    transport::{Transport, UsbTransport},
};
