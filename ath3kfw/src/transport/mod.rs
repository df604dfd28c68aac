//! Transport abstraction for vendor USB transfers.
//!
//! The boot protocol only ever needs three kinds of transfer: a vendor
//! control write, a vendor control read and a bulk write. The [`Transport`]
//! trait captures exactly those, so the protocol layer can run against a
//! real device or against a recording mock in tests.
//!
//! ```text
//! +------------------------+
//! |  Loader / Protocol     |
//! |  (queries, upload)     |
//! +-----------+------------+
//!             |
//!             v
//! +-----------+------------+
//! |    Transport trait     |
//! +-----------+------------+
//!             |
//!      +------+-------+
//!      v              v
//! +---------+   +-----------+
//! |  rusb   |   | test mock |
//! +---------+   +-----------+
//! ```
//!
//! Implementations provide the raw `write_control`/`read_control`/
//! `write_bulk` calls and report driver failures as
//! [`Error::Transport`]. The provided `control_out`/`control_in`/`bulk_out`
//! methods add the length checks, turning partial transfers into
//! [`Error::ShortTransfer`].

pub mod native;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

use rusb::ffi::constants::{
    LIBUSB_ERROR_ACCESS, LIBUSB_ERROR_BUSY, LIBUSB_ERROR_INTERRUPTED, LIBUSB_ERROR_INVALID_PARAM,
    LIBUSB_ERROR_IO, LIBUSB_ERROR_NO_DEVICE, LIBUSB_ERROR_NO_MEM, LIBUSB_ERROR_NOT_FOUND,
    LIBUSB_ERROR_NOT_SUPPORTED, LIBUSB_ERROR_OVERFLOW, LIBUSB_ERROR_PIPE, LIBUSB_ERROR_TIMEOUT,
    LIBUSB_SUCCESS,
};

use crate::error::{Error, Result};

/// Timeout applied to every transfer.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(1000);

/// Bulk OUT endpoint carrying the firmware body.
pub const BULK_OUT_ENDPOINT: u8 = 0x02;

/// Symbolic libusb name for an error code.
pub fn error_name(code: i32) -> &'static str {
    match code {
        LIBUSB_SUCCESS => "LIBUSB_SUCCESS",
        LIBUSB_ERROR_IO => "LIBUSB_ERROR_IO",
        LIBUSB_ERROR_INVALID_PARAM => "LIBUSB_ERROR_INVALID_PARAM",
        LIBUSB_ERROR_ACCESS => "LIBUSB_ERROR_ACCESS",
        LIBUSB_ERROR_NO_DEVICE => "LIBUSB_ERROR_NO_DEVICE",
        LIBUSB_ERROR_NOT_FOUND => "LIBUSB_ERROR_NOT_FOUND",
        LIBUSB_ERROR_BUSY => "LIBUSB_ERROR_BUSY",
        LIBUSB_ERROR_TIMEOUT => "LIBUSB_ERROR_TIMEOUT",
        LIBUSB_ERROR_OVERFLOW => "LIBUSB_ERROR_OVERFLOW",
        LIBUSB_ERROR_PIPE => "LIBUSB_ERROR_PIPE",
        LIBUSB_ERROR_INTERRUPTED => "LIBUSB_ERROR_INTERRUPTED",
        LIBUSB_ERROR_NO_MEM => "LIBUSB_ERROR_NO_MEM",
        LIBUSB_ERROR_NOT_SUPPORTED => "LIBUSB_ERROR_NOT_SUPPORTED",
        _ => "LIBUSB_ERROR_OTHER",
    }
}

fn check_len(expected: usize, actual: usize) -> Result<usize> {
    if actual == expected {
        Ok(actual)
    } else {
        Err(Error::ShortTransfer { expected, actual })
    }
}

/// Vendor-request transport to a claimed device.
///
/// All transfers are blocking and bounded by [`TRANSFER_TIMEOUT`]; a timeout
/// is reported as a transport error. Implementations must not retry.
pub trait Transport {
    /// Vendor host-to-device control transfer. Returns bytes accepted.
    fn write_control(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<usize>;

    /// Vendor device-to-host control transfer. Returns bytes received.
    fn read_control(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize>;

    /// Bulk OUT transfer. Returns bytes sent.
    fn write_bulk(&mut self, endpoint: u8, data: &[u8]) -> Result<usize>;

    /// Control write that must deliver every byte of `data`.
    fn control_out(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<usize> {
        let n = self.write_control(request, value, index, data)?;
        check_len(data.len(), n)
    }

    /// Control read that must return exactly `len` bytes.
    fn control_in(&mut self, request: u8, value: u16, index: u16, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self.read_control(request, value, index, &mut buf)?;
        check_len(len, n)?;
        Ok(buf)
    }

    /// Bulk write that must deliver every byte of `data`.
    fn bulk_out(&mut self, endpoint: u8, data: &[u8]) -> Result<usize> {
        let n = self.write_bulk(endpoint, data)?;
        check_len(data.len(), n)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_control(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<usize> {
        (**self).write_control(request, value, index, data)
    }

    fn read_control(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        (**self).read_control(request, value, index, buf)
    }

    fn write_bulk(&mut self, endpoint: u8, data: &[u8]) -> Result<usize> {
        (**self).write_bulk(endpoint, data)
    }
}

// Re-export the native implementation
pub use native::UsbTransport;
