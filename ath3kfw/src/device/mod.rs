//! Device discovery and classification.
//!
//! Radios are addressed by USB bus number and device address, written on
//! the command line as `ugenB.A` (or plain `B.A`). Enumeration goes through
//! libusb; classification uses a table of known boot-mode VID/PID pairs.

use crate::error::{Error, Result};
use crate::target::variant::Variant;

use {
    crate::transport::{UsbTransport, native::error_code},
    log::{debug, info, trace, warn},
    rusb::{Context, UsbContext},
};

/// Known radio kinds in their boot (firmware-less) personality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    /// AR3011 waiting for `ath3k-1.fw`.
    Ar3011,
    /// AR3012 waiting for patch and syscfg.
    Ar3012,
    /// Not a known AR3K boot device.
    Unknown,
}

/// Known boot-mode VID/PID pairs.
const KNOWN_USB_DEVICES: &[(u16, &[u16], DeviceKind)] = &[
    (0x0CF3, &[0x3000], DeviceKind::Ar3011),
    (0x0CF3, &[0x3004, 0x3008, 0x311D, 0x311E, 0x311F, 0x3121, 0x817A, 0xE004, 0xE005, 0xE006], DeviceKind::Ar3012),
    (0x0489, &[0xE04D, 0xE04E, 0xE056, 0xE057, 0xE05F, 0xE076], DeviceKind::Ar3012),
    (0x04CA, &[0x3004, 0x3005, 0x3006, 0x3007, 0x3008, 0x300B], DeviceKind::Ar3012),
    (0x13D3, &[0x3362, 0x3375, 0x3393, 0x3402, 0x3408, 0x3432], DeviceKind::Ar3012),
    (0x0930, &[0x0219, 0x021C, 0x0220, 0x0227], DeviceKind::Ar3012),
    (0x0B05, &[0x17D0], DeviceKind::Ar3012),
];

impl DeviceKind {
    /// Classify a VID/PID pair.
    #[must_use]
    pub fn from_vid_pid(vid: u16, pid: u16) -> Self {
        for (known_vid, pids, device) in KNOWN_USB_DEVICES {
            if vid == *known_vid && pids.contains(&pid) {
                return *device;
            }
        }
        Self::Unknown
    }

    /// Get a human-readable name for the device kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ar3011 => "AR3011",
            Self::Ar3012 => "AR3012",
            Self::Unknown => "Unknown",
        }
    }

    /// Check if this is a known device kind.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Boot plan suited to this kind, if known.
    pub fn variant(&self) -> Option<Variant> {
        match self {
            Self::Ar3011 => Some(Variant::Ar3011),
            Self::Ar3012 => Some(Variant::Ar3012),
            Self::Unknown => None,
        }
    }
}

/// Parse a device name of the form `ugenB.A` or `B.A` into `(bus, address)`.
pub fn parse_device_name(name: &str) -> Result<(u8, u8)> {
    let invalid = || Error::InvalidDeviceName(name.to_string());

    let rest = name.strip_prefix("ugen").unwrap_or(name);
    let (bus, address) = rest.split_once('.').ok_or_else(invalid)?;

    let parse = |s: &str| {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u8>().ok()
    };

    match (parse(bus), parse(address)) {
        (Some(bus), Some(address)) => Ok((bus, address)),
        _ => Err(invalid()),
    }
}

/// Discovered USB device information.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectedDevice {
    /// USB bus number.
    pub bus: u8,
    /// Device address on the bus.
    pub address: u8,
    /// USB Vendor ID.
    pub vid: u16,
    /// USB Product ID.
    pub pid: u16,
    /// Classified device kind.
    pub kind: DeviceKind,
}

impl DetectedDevice {
    /// Name in `ugenB.A` form.
    pub fn name(&self) -> String {
        format!("ugen{}.{}", self.bus, self.address)
    }
}

/// Create a libusb context.
///
/// Failing to initialize libusb is reported as [`Error::UsbInit`].
pub fn usb_context() -> Result<Context> {
    Context::new().map_err(|e| Error::UsbInit(error_code(e)))
}

/// Enumerate all USB devices.
pub fn list_devices() -> Result<Vec<DetectedDevice>> {
    let context = usb_context()?;
    let devices = context
        .devices()
        .map_err(|e| Error::UsbInit(error_code(e)))?;

    let mut result = Vec::new();
    for device in devices.iter() {
        let desc = match device.device_descriptor() {
            Ok(desc) => desc,
            Err(e) => {
                debug!(
                    "Skipping ugen{}.{}: {e}",
                    device.bus_number(),
                    device.address()
                );
                continue;
            },
        };

        let detected = DetectedDevice {
            bus: device.bus_number(),
            address: device.address(),
            vid: desc.vendor_id(),
            pid: desc.product_id(),
            kind: DeviceKind::from_vid_pid(desc.vendor_id(), desc.product_id()),
        };
        trace!(
            "Found {} (VID: {:04X}, PID: {:04X}, Device: {:?})",
            detected.name(),
            detected.vid,
            detected.pid,
            detected.kind
        );
        result.push(detected);
    }

    Ok(result)
}

/// Open the device at `bus`/`address` and claim its boot interface.
pub fn open_device(bus: u8, address: u8) -> Result<UsbTransport> {
    let context = usb_context()?;
    let devices = context
        .devices()
        .map_err(|e| Error::UsbInit(error_code(e)))?;

    let device = devices
        .iter()
        .find(|d| d.bus_number() == bus && d.address() == address)
        .ok_or(Error::DeviceNotFound { bus, address })?;

    let handle = device.open()?;
    let transport = UsbTransport::claim(handle)?;
    info!("Opened ugen{bus}.{address}");
    Ok(transport)
}

/// Compare a device's IDs with the ones the user expects.
///
/// Mismatches are only reported; the caller decides whether to go on.
pub fn check_ids(actual: (u16, u16), vendor: Option<u16>, product: Option<u16>) -> bool {
    let mut ok = true;
    if let Some(vid) = vendor.filter(|&v| v != actual.0) {
        warn!("Vendor ID mismatch: expected {vid:04x}, device has {:04x}", actual.0);
        ok = false;
    }
    if let Some(pid) = product.filter(|&p| p != actual.1) {
        warn!("Product ID mismatch: expected {pid:04x}, device has {:04x}", actual.1);
        ok = false;
    }
    ok
}

/// Format a list of detected devices for display.
pub fn format_device_list(devices: &[DetectedDevice]) -> Vec<String> {
    devices
        .iter()
        .map(|d| {
            let kind = if d.kind.is_known() {
                format!(" [{}]", d.kind.name())
            } else {
                String::new()
            };
            format!("{} {:04x}:{:04x}{kind}", d.name(), d.vid, d.pid)
        })
        .collect()
}
