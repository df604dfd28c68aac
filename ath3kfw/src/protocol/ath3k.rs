//! Atheros AR3K vendor boot protocol.
//!
//! A radio in boot mode exposes five vendor requests on its default control
//! pipe and a single bulk OUT endpoint:
//!
//! ```text
//! +-----------------+----------+-----+-------+-------+-------------------+
//! | Request         | bRequest | Dir | Value | Index | Payload           |
//! +-----------------+----------+-----+-------+-------+-------------------+
//! | DNLOAD          |   0x01   | OUT |   0   |   0   | first <=20 bytes  |
//! | GETSTATE        |   0x05   | IN  |   0   |   0   | 1 byte            |
//! | SET_NORMAL_MODE |   0x07   | OUT |   0   |   0   | empty             |
//! | GETVERSION      |   0x09   | IN  |   0   |   0   | 16 bytes          |
//! | SWITCH_VID_PID  |   0x0a   | OUT |   0   |   0   | empty             |
//! +-----------------+----------+-----+-------+-------+-------------------+
//! ```
//!
//! The version record is four little-endian 32-bit words:
//!
//! ```text
//! +-------------+---------------+-------------+-------------+
//! | rom_version | build_version | ram_version |  ref_clock  |
//! +-------------+---------------+-------------+-------------+
//! |   4 bytes   |    4 bytes    |   4 bytes   |   4 bytes   |
//! +-------------+---------------+-------------+-------------+
//! ```

use crate::error::{Error, Result};
use crate::transport::Transport;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use log::trace;
use std::fmt;

/// Maximum number of bytes carried by the initial DNLOAD control transfer.
pub const HDR_SIZE: usize = 20;

/// Maximum chunk size on the bulk OUT endpoint.
pub const BULK_SIZE: usize = 4096;

/// Size of the GETVERSION payload.
pub const VERSION_RECORD_SIZE: usize = 16;

/// State bit: the ROM patch is already resident.
pub const PATCH_UPDATE: u8 = 0x80;

/// State bit: the system configuration is already loaded.
pub const SYSCFG_UPDATE: u8 = 0x40;

/// Mask selecting the mode field of the state byte.
pub const MODE_MASK: u8 = 0x3f;

/// Mode value reported once the radio runs its normal firmware.
pub const NORMAL_MODE: u8 = 0x0e;

/// Vendor request codes (`bRequest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Request {
    /// Switch to download mode and deliver the firmware header (0x01).
    Download = 0x01,

    /// Read the 1-byte state (0x05).
    GetState = 0x05,

    /// Enter normal operating mode (0x07).
    SetNormalMode = 0x07,

    /// Read the 16-byte version record (0x09).
    GetVersion = 0x09,

    /// Re-enumerate under the runtime VID/PID (0x0a).
    SwitchVidPid = 0x0a,
}

impl Request {
    /// Raw `bRequest` value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Protocol name of the request.
    pub fn name(self) -> &'static str {
        match self {
            Self::Download => "DNLOAD",
            Self::GetState => "GETSTATE",
            Self::SetNormalMode => "SET_NORMAL_MODE",
            Self::GetVersion => "GETVERSION",
            Self::SwitchVidPid => "SWITCH_VID_PID",
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The state byte reported by GETSTATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceState(pub u8);

impl DeviceState {
    /// Raw state byte.
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Mode field (low bits).
    pub fn mode(self) -> u8 {
        self.0 & MODE_MASK
    }

    /// Whether the ROM patch is already resident.
    pub fn patch_installed(self) -> bool {
        self.0 & PATCH_UPDATE != 0
    }

    /// Whether the system configuration is already loaded.
    pub fn syscfg_installed(self) -> bool {
        self.0 & SYSCFG_UPDATE != 0
    }

    /// Whether the radio already runs in normal mode.
    pub fn is_normal_mode(self) -> bool {
        self.mode() == NORMAL_MODE
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x} (mode 0x{:02x}", self.0, self.mode())?;
        if self.is_normal_mode() {
            write!(f, ", normal")?;
        }
        if self.patch_installed() {
            write!(f, ", patched")?;
        }
        if self.syscfg_installed() {
            write!(f, ", configured")?;
        }
        write!(f, ")")
    }
}

/// Reference clock of the radio's crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefClock {
    /// 19.2 MHz (raw 0x00).
    Mhz19_2,
    /// 26 MHz (raw 0x01).
    Mhz26,
    /// 40 MHz (raw 0x02).
    Mhz40,
    /// Unrecognized raw value.
    Unknown(u32),
}

impl RefClock {
    /// Decode the raw `ref_clock` field.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0x00 => Self::Mhz19_2,
            0x01 => Self::Mhz26,
            0x02 => Self::Mhz40,
            other => Self::Unknown(other),
        }
    }

    /// Raw field value.
    pub fn raw(self) -> u32 {
        match self {
            Self::Mhz19_2 => 0x00,
            Self::Mhz26 => 0x01,
            Self::Mhz40 => 0x02,
            Self::Unknown(raw) => raw,
        }
    }

    /// Clock identifier used in syscfg file names (0 when unknown).
    pub fn file_id(self) -> u32 {
        match self {
            Self::Mhz19_2 => 19,
            Self::Mhz26 => 26,
            Self::Mhz40 => 40,
            Self::Unknown(_) => 0,
        }
    }
}

impl fmt::Display for RefClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mhz19_2 => write!(f, "19.2 MHz"),
            Self::Mhz26 => write!(f, "26 MHz"),
            Self::Mhz40 => write!(f, "40 MHz"),
            Self::Unknown(raw) => write!(f, "unknown (0x{raw:02x})"),
        }
    }
}

/// Version record returned by GETVERSION.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionRecord {
    /// ROM version; selects the patch and syscfg files.
    pub rom_version: u32,
    /// Build version of the resident code.
    pub build_version: u32,
    /// RAM version.
    pub ram_version: u32,
    /// Raw reference clock field; see [`VersionRecord::ref_clock`].
    pub ref_clock: u32,
}

impl VersionRecord {
    /// Decode a 16-byte little-endian record.
    pub fn from_bytes(mut data: &[u8]) -> Result<Self> {
        if data.len() != VERSION_RECORD_SIZE {
            return Err(Error::ShortTransfer {
                expected: VERSION_RECORD_SIZE,
                actual: data.len(),
            });
        }
        Ok(Self {
            rom_version: data.read_u32::<LittleEndian>()?,
            build_version: data.read_u32::<LittleEndian>()?,
            ram_version: data.read_u32::<LittleEndian>()?,
            ref_clock: data.read_u32::<LittleEndian>()?,
        })
    }

    /// Encode as the 16-byte little-endian wire record.
    pub fn to_bytes(&self) -> [u8; VERSION_RECORD_SIZE] {
        let mut buf = [0u8; VERSION_RECORD_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], self.rom_version);
        LittleEndian::write_u32(&mut buf[4..8], self.build_version);
        LittleEndian::write_u32(&mut buf[8..12], self.ram_version);
        LittleEndian::write_u32(&mut buf[12..16], self.ref_clock);
        buf
    }

    /// Decoded reference clock.
    pub fn ref_clock(&self) -> RefClock {
        RefClock::from_raw(self.ref_clock)
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ROM version: 0x{:08x}, build version: {}, RAM version: {}, ref clock: {}",
            self.rom_version,
            self.build_version,
            self.ram_version,
            self.ref_clock()
        )
    }
}

/// Read the state byte.
///
/// Fails with [`Error::QueryFailed`] on any transport error or short read.
pub fn get_state<T: Transport + ?Sized>(transport: &mut T) -> Result<DeviceState> {
    let data = transport
        .control_in(Request::GetState.code(), 0, 0, 1)
        .map_err(|e| Error::QueryFailed {
            query: Request::GetState.name(),
            source: Box::new(e),
        })?;
    let state = DeviceState(data[0]);
    trace!("state={state}");
    Ok(state)
}

/// Read the version record.
///
/// Fails with [`Error::QueryFailed`] on any transport error or short read.
pub fn get_version<T: Transport + ?Sized>(transport: &mut T) -> Result<VersionRecord> {
    let query_failed = |e| Error::QueryFailed {
        query: Request::GetVersion.name(),
        source: Box::new(e),
    };
    let data = transport
        .control_in(Request::GetVersion.code(), 0, 0, VERSION_RECORD_SIZE)
        .map_err(query_failed)?;
    let version = VersionRecord::from_bytes(&data).map_err(query_failed)?;
    trace!("{version}");
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockDevice, Transfer};
    use rusb::ffi::constants::LIBUSB_ERROR_TIMEOUT;

    #[test]
    fn test_request_codes() {
        assert_eq!(Request::Download.code(), 0x01);
        assert_eq!(Request::GetState.code(), 0x05);
        assert_eq!(Request::SetNormalMode.code(), 0x07);
        assert_eq!(Request::GetVersion.code(), 0x09);
        assert_eq!(Request::SwitchVidPid.code(), 0x0a);
    }

    #[test]
    fn test_state_bits() {
        let state = DeviceState(0x80);
        assert!(state.patch_installed());
        assert!(!state.syscfg_installed());
        assert!(!state.is_normal_mode());

        let state = DeviceState(PATCH_UPDATE | SYSCFG_UPDATE | NORMAL_MODE);
        assert!(state.patch_installed());
        assert!(state.syscfg_installed());
        assert!(state.is_normal_mode());
        assert_eq!(state.mode(), NORMAL_MODE);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DeviceState(0x8e).to_string(), "0x8e (mode 0x0e, normal, patched)");
        assert_eq!(DeviceState(0x00).to_string(), "0x00 (mode 0x00)");
    }

    #[test]
    fn test_ref_clock_mapping() {
        assert_eq!(RefClock::from_raw(0x00), RefClock::Mhz19_2);
        assert_eq!(RefClock::from_raw(0x01), RefClock::Mhz26);
        assert_eq!(RefClock::from_raw(0x02), RefClock::Mhz40);
        assert_eq!(RefClock::from_raw(0x07), RefClock::Unknown(7));

        assert_eq!(RefClock::Mhz19_2.file_id(), 19);
        assert_eq!(RefClock::Mhz26.file_id(), 26);
        assert_eq!(RefClock::Mhz40.file_id(), 40);
        assert_eq!(RefClock::Unknown(7).file_id(), 0);
        assert_eq!(RefClock::Unknown(7).raw(), 7);
    }

    #[test]
    fn test_version_record_decodes_little_endian() {
        let data = [
            0x00, 0x03, 0x00, 0x00, // rom 0x300
            0x05, 0x00, 0x00, 0x00, // build 5
            0x34, 0x12, 0x00, 0x00, // ram 0x1234
            0x01, 0x00, 0x00, 0x00, // 26 MHz
        ];
        let ver = VersionRecord::from_bytes(&data).unwrap();
        assert_eq!(ver.rom_version, 0x300);
        assert_eq!(ver.build_version, 5);
        assert_eq!(ver.ram_version, 0x1234);
        assert_eq!(ver.ref_clock(), RefClock::Mhz26);
        assert_eq!(ver.to_bytes(), data);
    }

    #[test]
    fn test_version_record_rejects_wrong_length() {
        assert!(matches!(
            VersionRecord::from_bytes(&[0; 12]),
            Err(Error::ShortTransfer {
                expected: 16,
                actual: 12
            })
        ));
    }

    #[test]
    fn test_get_state_issues_one_byte_read() {
        let mut dev = MockDevice::new(0x80, VersionRecord::default());
        let state = get_state(&mut dev).unwrap();
        assert_eq!(state, DeviceState(0x80));
        assert_eq!(
            dev.transfers(),
            &[Transfer::ControlIn {
                request: 0x05,
                len: 1
            }]
        );
    }

    #[test]
    fn test_get_version_issues_sixteen_byte_read() {
        let ver = VersionRecord {
            rom_version: 0x3101,
            build_version: 9,
            ram_version: 2,
            ref_clock: 2,
        };
        let mut dev = MockDevice::new(0, ver);
        assert_eq!(get_version(&mut dev).unwrap(), ver);
        assert_eq!(
            dev.transfers(),
            &[Transfer::ControlIn {
                request: 0x09,
                len: 16
            }]
        );
    }

    #[test]
    fn test_queries_wrap_transport_errors() {
        let mut dev = MockDevice::new(0, VersionRecord::default())
            .fail_request(Request::GetState.code(), LIBUSB_ERROR_TIMEOUT);
        match get_state(&mut dev) {
            Err(Error::QueryFailed { query, source }) => {
                assert_eq!(query, "GETSTATE");
                assert!(matches!(*source, Error::Transport { code: -7 }));
            },
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_short_version_read_is_query_failure() {
        let mut dev = MockDevice::new(0, VersionRecord::default()).short_version(8);
        match get_version(&mut dev) {
            Err(Error::QueryFailed { query, source }) => {
                assert_eq!(query, "GETVERSION");
                assert!(matches!(
                    *source,
                    Error::ShortTransfer {
                        expected: 16,
                        actual: 8
                    }
                ));
            },
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
