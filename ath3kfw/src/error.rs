//! Error types for ath3kfw.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ath3kfw operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ath3kfw operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading a firmware file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Firmware file does not exist.
    #[error("Firmware file not found: {}", .0.display())]
    FirmwareNotFound(PathBuf),

    /// Firmware file is shorter than the minimum blob length.
    #[error("Firmware file {} is too short ({len} bytes, need at least {min})", .path.display())]
    FirmwareTooShort {
        /// Path of the offending file.
        path: PathBuf,
        /// Actual length in bytes.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// No USB device at the given bus/address.
    #[error("No USB device at bus {bus} address {address}")]
    DeviceNotFound {
        /// USB bus number.
        bus: u8,
        /// Device address on the bus.
        address: u8,
    },

    /// The USB stack could not be initialized or enumerated.
    #[error("USB initialization failed: {}", code_name(.0))]
    UsbInit(i32),

    /// Device name is not of the form `ugenB.A` or `B.A`.
    #[error("Invalid device name '{0}', expected ugenB.A")]
    InvalidDeviceName(String),

    /// The USB driver reported a failure.
    #[error("USB transfer failed: {} ({code})", code_name(.code))]
    Transport {
        /// libusb error code (negative).
        code: i32,
    },

    /// A transfer moved fewer bytes than requested.
    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer {
        /// Requested length.
        expected: usize,
        /// Length actually transferred.
        actual: usize,
    },

    /// A state or version query did not complete.
    #[error("{query} query failed: {source}")]
    QueryFailed {
        /// Query name (`GETSTATE` or `GETVERSION`).
        query: &'static str,
        /// Underlying transport error.
        #[source]
        source: Box<Error>,
    },

    /// The patch file does not fit the device ROM.
    #[error(
        "Patch version mismatch: patch rom={patch_rom:#010x} build={patch_build}, \
         device rom={device_rom:#010x} build={device_build}"
    )]
    VersionMismatch {
        /// ROM version embedded in the patch trailer.
        patch_rom: u32,
        /// Build version embedded in the patch trailer.
        patch_build: u32,
        /// ROM version reported by the device.
        device_rom: u32,
        /// Build version reported by the device.
        device_build: u32,
    },

    /// A firmware chunk failed mid-stream.
    #[error("Upload failed at offset {offset}: {source}")]
    UploadFailed {
        /// Byte offset of the chunk that failed.
        offset: usize,
        /// Underlying transport error.
        #[source]
        source: Box<Error>,
    },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn code_name(code: &i32) -> &'static str {
    crate::transport::error_name(*code)
}

impl Error {
    /// Whether the error happened before any device could be talked to.
    ///
    /// The CLI maps these to its initialization exit code.
    pub fn is_init_error(&self) -> bool {
        matches!(self, Self::UsbInit(_) | Self::InvalidDeviceName(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display_names_code() {
        let err = Error::Transport { code: -7 };
        let msg = err.to_string();
        assert!(msg.contains("LIBUSB_ERROR_TIMEOUT"));
        assert!(msg.contains("-7"));
    }

    #[test]
    fn test_upload_failed_keeps_source() {
        let err = Error::UploadFailed {
            offset: 4116,
            source: Box::new(Error::ShortTransfer {
                expected: 4096,
                actual: 2048,
            }),
        };
        assert!(err.to_string().contains("4116"));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("Short transfer: expected 4096 bytes, got 2048")
        );
    }

    #[test]
    fn test_init_errors() {
        assert!(Error::UsbInit(-99).is_init_error());
        assert!(Error::InvalidDeviceName("x".into()).is_init_error());
        assert!(!Error::Transport { code: -4 }.is_init_error());
    }
}
