//! Recording mock of an AR3K radio for tests.

use rusb::ffi::constants::{LIBUSB_ERROR_NO_DEVICE, LIBUSB_ERROR_PIPE};

use crate::error::{Error, Result};
use crate::protocol::ath3k::{
    MODE_MASK, NORMAL_MODE, PATCH_UPDATE, Request, SYSCFG_UPDATE, VersionRecord,
};
use crate::transport::Transport;

/// One transfer as seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transfer {
    ControlOut { request: u8, data: Vec<u8> },
    ControlIn { request: u8, len: usize },
    BulkOut { endpoint: u8, data: Vec<u8> },
}

pub(crate) struct MockDevice {
    state: u8,
    version: VersionRecord,
    transfers: Vec<Transfer>,
    state_machine: bool,
    drop_on_switch: bool,
    fail: Option<(u8, i32)>,
    short_bulk: Option<(usize, usize)>,
    short_version: Option<usize>,
    bulk_count: usize,
}

impl MockDevice {
    pub(crate) fn new(state: u8, version: VersionRecord) -> Self {
        Self {
            state,
            version,
            transfers: Vec::new(),
            state_machine: false,
            drop_on_switch: false,
            fail: None,
            short_bulk: None,
            short_version: None,
            bulk_count: 0,
        }
    }

    /// Advance the state byte the way a real radio does: the first DNLOAD
    /// marks the patch, the next one the syscfg, SET_NORMAL_MODE the mode.
    pub(crate) fn with_state_machine(mut self) -> Self {
        self.state_machine = true;
        self
    }

    /// Leave the bus on SWITCH_VID_PID without acknowledging it.
    pub(crate) fn drop_on_switch(mut self) -> Self {
        self.drop_on_switch = true;
        self
    }

    /// Fail every control transfer with `request` using libusb `code`.
    pub(crate) fn fail_request(mut self, request: u8, code: i32) -> Self {
        self.fail = Some((request, code));
        self
    }

    /// Report only `actual` bytes for the bulk transfer at `index`.
    pub(crate) fn short_bulk(mut self, index: usize, actual: usize) -> Self {
        self.short_bulk = Some((index, actual));
        self
    }

    /// Return only `len` bytes from GETVERSION.
    pub(crate) fn short_version(mut self, len: usize) -> Self {
        self.short_version = Some(len);
        self
    }

    pub(crate) fn state(&self) -> u8 {
        self.state
    }

    pub(crate) fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub(crate) fn clear_transfers(&mut self) {
        self.transfers.clear();
    }

    /// Requests of all control OUT transfers, in order.
    pub(crate) fn out_requests(&self) -> Vec<u8> {
        self.transfers
            .iter()
            .filter_map(|t| match t {
                Transfer::ControlOut { request, .. } => Some(*request),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn dnload_count(&self) -> usize {
        self.out_requests()
            .iter()
            .filter(|&&r| r == Request::Download.code())
            .count()
    }

    /// Concatenation of all bulk payloads.
    pub(crate) fn bulk_payload(&self) -> Vec<u8> {
        self.transfers
            .iter()
            .filter_map(|t| match t {
                Transfer::BulkOut { data, .. } => Some(data.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Payload sizes of all OUT transfers, in order.
    pub(crate) fn transfer_sizes(&self) -> Vec<usize> {
        self.transfers
            .iter()
            .filter_map(|t| match t {
                Transfer::ControlOut { data, .. } | Transfer::BulkOut { data, .. } => {
                    Some(data.len())
                },
                Transfer::ControlIn { .. } => None,
            })
            .collect()
    }

    fn check_fail(&self, request: u8) -> Result<()> {
        match self.fail {
            Some((r, code)) if r == request => Err(Error::Transport { code }),
            _ => Ok(()),
        }
    }
}

impl Transport for MockDevice {
    fn write_control(&mut self, request: u8, _value: u16, _index: u16, data: &[u8]) -> Result<usize> {
        self.transfers.push(Transfer::ControlOut {
            request,
            data: data.to_vec(),
        });
        self.check_fail(request)?;

        if request == Request::SwitchVidPid.code() && self.drop_on_switch {
            return Err(Error::Transport {
                code: LIBUSB_ERROR_NO_DEVICE,
            });
        }

        if self.state_machine {
            if request == Request::Download.code() {
                if self.state & PATCH_UPDATE == 0 {
                    self.state |= PATCH_UPDATE;
                } else {
                    self.state |= SYSCFG_UPDATE;
                }
            } else if request == Request::SetNormalMode.code() {
                self.state = (self.state & !MODE_MASK) | NORMAL_MODE;
            }
        }

        Ok(data.len())
    }

    fn read_control(&mut self, request: u8, _value: u16, _index: u16, buf: &mut [u8]) -> Result<usize> {
        self.transfers.push(Transfer::ControlIn {
            request,
            len: buf.len(),
        });
        self.check_fail(request)?;

        if request == Request::GetState.code() {
            buf[0] = self.state;
            Ok(1)
        } else if request == Request::GetVersion.code() {
            let bytes = self.version.to_bytes();
            let n = self
                .short_version
                .unwrap_or(bytes.len())
                .min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            Ok(n)
        } else {
            Err(Error::Transport {
                code: LIBUSB_ERROR_PIPE,
            })
        }
    }

    fn write_bulk(&mut self, endpoint: u8, data: &[u8]) -> Result<usize> {
        self.transfers.push(Transfer::BulkOut {
            endpoint,
            data: data.to_vec(),
        });
        let index = self.bulk_count;
        self.bulk_count += 1;

        match self.short_bulk {
            Some((i, actual)) if i == index => Ok(actual),
            _ => Ok(data.len()),
        }
    }
}
