//! Native USB transport using the `rusb` crate (libusb).

use {
    crate::{
        error::{Error, Result},
        transport::{TRANSFER_TIMEOUT, Transport},
    },
    log::{debug, trace},
    rusb::{
        Context, DeviceHandle, Direction, Recipient, RequestType, UsbContext,
        ffi::constants::{
            LIBUSB_ERROR_ACCESS, LIBUSB_ERROR_BUSY, LIBUSB_ERROR_INTERRUPTED,
            LIBUSB_ERROR_INVALID_PARAM, LIBUSB_ERROR_IO, LIBUSB_ERROR_NO_DEVICE,
            LIBUSB_ERROR_NO_MEM, LIBUSB_ERROR_NOT_FOUND, LIBUSB_ERROR_NOT_SUPPORTED,
            LIBUSB_ERROR_OTHER, LIBUSB_ERROR_OVERFLOW, LIBUSB_ERROR_PIPE, LIBUSB_ERROR_TIMEOUT,
        },
    },
};

/// libusb numeric code for a `rusb` error.
pub fn error_code(err: rusb::Error) -> i32 {
    match err {
        rusb::Error::Io => LIBUSB_ERROR_IO,
        rusb::Error::InvalidParam => LIBUSB_ERROR_INVALID_PARAM,
        rusb::Error::Access => LIBUSB_ERROR_ACCESS,
        rusb::Error::NoDevice => LIBUSB_ERROR_NO_DEVICE,
        rusb::Error::NotFound => LIBUSB_ERROR_NOT_FOUND,
        rusb::Error::Busy => LIBUSB_ERROR_BUSY,
        rusb::Error::Timeout => LIBUSB_ERROR_TIMEOUT,
        rusb::Error::Overflow => LIBUSB_ERROR_OVERFLOW,
        rusb::Error::Pipe => LIBUSB_ERROR_PIPE,
        rusb::Error::Interrupted => LIBUSB_ERROR_INTERRUPTED,
        rusb::Error::NoMem => LIBUSB_ERROR_NO_MEM,
        rusb::Error::NotSupported => LIBUSB_ERROR_NOT_SUPPORTED,
        _ => LIBUSB_ERROR_OTHER,
    }
}

impl From<rusb::Error> for Error {
    fn from(err: rusb::Error) -> Self {
        Error::Transport {
            code: error_code(err),
        }
    }
}

/// Interface claimed on the radio while the boot sequence runs.
pub const BOOT_INTERFACE: u8 = 0;

/// Transport over an opened libusb device handle.
///
/// Owns an exclusive claim on interface 0 for as long as it lives; the
/// claim is released on drop.
pub struct UsbTransport<C: UsbContext = Context> {
    handle: DeviceHandle<C>,
    interface: u8,
}

impl<C: UsbContext> UsbTransport<C> {
    /// Take over an opened handle and claim the boot interface.
    pub fn claim(mut handle: DeviceHandle<C>) -> Result<Self> {
        // Not supported on every platform; the claim below reports real conflicts.
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            trace!("Kernel driver auto-detach unavailable: {e}");
        }
        handle.claim_interface(BOOT_INTERFACE)?;
        debug!("Claimed interface {BOOT_INTERFACE}");

        Ok(Self {
            handle,
            interface: BOOT_INTERFACE,
        })
    }

    /// Vendor and product id from the device descriptor.
    pub fn ids(&self) -> Result<(u16, u16)> {
        let desc = self
            .handle
            .device()
            .device_descriptor()?;
        Ok((desc.vendor_id(), desc.product_id()))
    }
}

impl<C: UsbContext> Transport for UsbTransport<C> {
    fn write_control(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<usize> {
        let request_type = rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Device);
        trace!(
            "control OUT req=0x{request:02x} value={value} index={index} len={}",
            data.len()
        );
        Ok(self
            .handle
            .write_control(request_type, request, value, index, data, TRANSFER_TIMEOUT)?)
    }

    fn read_control(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        let request_type = rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Device);
        trace!(
            "control IN req=0x{request:02x} value={value} index={index} len={}",
            buf.len()
        );
        Ok(self
            .handle
            .read_control(request_type, request, value, index, buf, TRANSFER_TIMEOUT)?)
    }

    fn write_bulk(&mut self, endpoint: u8, data: &[u8]) -> Result<usize> {
        trace!("bulk OUT ep=0x{endpoint:02x} len={}", data.len());
        Ok(self
            .handle
            .write_bulk(endpoint, data, TRANSFER_TIMEOUT)?)
    }
}

impl<C: UsbContext> Drop for UsbTransport<C> {
    fn drop(&mut self) {
        // The radio may already have left the bus after SWITCH_VID_PID.
        if let Err(e) = self.handle.release_interface(self.interface) {
            trace!("Releasing interface {}: {e}", self.interface);
        }
    }
}
