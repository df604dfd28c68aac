//! AR3K firmware files.
//!
//! Three kinds of file are loaded, all read whole into memory:
//!
//! ```text
//! <prefix>/ath3k-1.fw                     AR3011 monolithic image
//! <prefix>/ar3k/AthrBT_0x<rom>.dfu        AR3012 ROM patch
//! <prefix>/ar3k/ramps_0x<rom>_<clk>.dfu   AR3012 system configuration
//! ```
//!
//! Patch files carry their target version in the last 8 bytes:
//!
//! ```text
//! +----------------------------+-------------+---------------+
//! |         patch body         | rom_version | build_version |
//! +----------------------------+-------------+---------------+
//! |          variable          |  4 bytes LE |   4 bytes LE  |
//! +----------------------------+-------------+---------------+
//! ```
//!
//! The trailer is metadata only; the whole file, trailer included, is
//! uploaded.

use crate::error::{Error, Result};
use crate::protocol::ath3k::{RefClock, VersionRecord};
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Minimum accepted firmware length (room for a patch trailer).
pub const MIN_FIRMWARE_LEN: usize = 8;

/// Length of the version trailer at the end of a patch file.
pub const PATCH_TRAILER_LEN: usize = 8;

/// File name of the AR3011 image.
pub const LEGACY_FIRMWARE_NAME: &str = "ath3k-1.fw";

/// Subdirectory holding AR3012 patch and syscfg files.
pub const AR3K_SUBDIR: &str = "ar3k";

/// Build numbers above this are unlikely to come from a real patch.
const PLAUSIBLE_BUILD_MAX: u32 = 0x00ff_ffff;

/// A firmware blob read fully into memory.
#[derive(Debug, Clone)]
pub struct Firmware {
    name: String,
    data: Vec<u8>,
}

impl Firmware {
    /// Read a firmware file.
    ///
    /// Fails with [`Error::FirmwareNotFound`] if the file is missing and
    /// [`Error::FirmwareTooShort`] if it holds fewer than
    /// [`MIN_FIRMWARE_LEN`] bytes.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FirmwareNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        if data.len() < MIN_FIRMWARE_LEN {
            return Err(Error::FirmwareTooShort {
                path: path.to_path_buf(),
                len: data.len(),
                min: MIN_FIRMWARE_LEN,
            });
        }

        debug!("Read {} ({} bytes)", path.display(), data.len());

        Ok(Self {
            name: path.display().to_string(),
            data,
        })
    }

    /// Wrap an in-memory blob; `name` is used in diagnostics only.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let name = name.into();
        if data.len() < MIN_FIRMWARE_LEN {
            return Err(Error::FirmwareTooShort {
                path: PathBuf::from(name),
                len: data.len(),
                min: MIN_FIRMWARE_LEN,
            });
        }
        Ok(Self { name, data })
    }

    /// Diagnostic name (usually the file path).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blob contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Blob length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: blobs hold at least [`MIN_FIRMWARE_LEN`] bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Version trailer, for patch files.
    pub fn patch_trailer(&self) -> Result<PatchTrailer> {
        let tail = self
            .data
            .last_chunk::<PATCH_TRAILER_LEN>()
            .ok_or_else(|| Error::FirmwareTooShort {
                path: PathBuf::from(&self.name),
                len: self.data.len(),
                min: PATCH_TRAILER_LEN,
            })?;
        Ok(PatchTrailer::parse(tail))
    }
}

/// `(rom_version, build_version)` embedded at the tail of a patch file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchTrailer {
    /// ROM version the patch was built against.
    pub rom_version: u32,
    /// Build version the patch brings the radio to.
    pub build_version: u32,
}

impl PatchTrailer {
    /// Decode the 8 trailer bytes.
    pub fn parse(trailer: &[u8; PATCH_TRAILER_LEN]) -> Self {
        Self {
            rom_version: LittleEndian::read_u32(&trailer[0..4]),
            build_version: LittleEndian::read_u32(&trailer[4..8]),
        }
    }

    /// Whether the patch may be applied to a radio reporting `device`.
    ///
    /// The ROM versions must match and the patch build must be strictly
    /// newer than the resident one.
    pub fn accepts(&self, device: &VersionRecord) -> bool {
        self.rom_version == device.rom_version && self.build_version > device.build_version
    }

    /// Whether the trailer only matches the device when read big-endian.
    pub fn looks_byte_swapped(&self, device: &VersionRecord) -> bool {
        self.rom_version != device.rom_version
            && self.rom_version.swap_bytes() == device.rom_version
    }

    /// Whether the build number is too large to be genuine.
    pub fn is_implausible(&self) -> bool {
        self.build_version > PLAUSIBLE_BUILD_MAX
    }
}

/// Path of the AR3011 image under `prefix`.
pub fn legacy_firmware_path(prefix: &Path) -> PathBuf {
    prefix.join(LEGACY_FIRMWARE_NAME)
}

/// Path of the AR3012 ROM patch for `rom_version`.
pub fn patch_path(prefix: &Path, rom_version: u32) -> PathBuf {
    prefix
        .join(AR3K_SUBDIR)
        .join(format!("AthrBT_0x{rom_version:08x}.dfu"))
}

/// Path of the AR3012 system configuration for `rom_version` and `clock`.
pub fn syscfg_path(prefix: &Path, rom_version: u32, clock: RefClock) -> PathBuf {
    prefix.join(AR3K_SUBDIR).join(format!(
        "ramps_0x{rom_version:08x}_{}.dfu",
        clock.file_id()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn version(rom: u32, build: u32) -> VersionRecord {
        VersionRecord {
            rom_version: rom,
            build_version: build,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_file_reads_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ath3k-1.fw");
        fs::write(&path, vec![0xAAu8; 5000]).unwrap();

        let fw = Firmware::from_file(&path).unwrap();
        assert_eq!(fw.len(), 5000);
        assert!(!fw.is_empty());
        assert!(fw.name().ends_with("ath3k-1.fw"));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.dfu");
        match Firmware::from_file(&path) {
            Err(Error::FirmwareNotFound(p)) => assert_eq!(p, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_from_file_too_short() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.dfu");
        fs::write(&path, [1u8, 2, 3]).unwrap();
        assert!(matches!(
            Firmware::from_file(&path),
            Err(Error::FirmwareTooShort { len: 3, min: 8, .. })
        ));

        fs::write(&path, b"").unwrap();
        assert!(matches!(
            Firmware::from_file(&path),
            Err(Error::FirmwareTooShort { len: 0, .. })
        ));
    }

    #[test]
    fn test_from_bytes_minimum_length() {
        assert!(Firmware::from_bytes("x", vec![0; 7]).is_err());
        assert_eq!(Firmware::from_bytes("x", vec![0; 8]).unwrap().len(), 8);
    }

    #[test]
    fn test_patch_trailer_reads_tail() {
        let mut data = vec![0xFF; 32];
        data.extend_from_slice(&0x0000_0300u32.to_le_bytes());
        data.extend_from_slice(&11u32.to_le_bytes());
        let fw = Firmware::from_bytes("patch", data).unwrap();
        assert_eq!(
            fw.patch_trailer().unwrap(),
            PatchTrailer {
                rom_version: 0x300,
                build_version: 11
            }
        );
    }

    #[test]
    fn test_patch_trailer_of_minimal_blob() {
        let mut data = 0x0000_0300u32.to_le_bytes().to_vec();
        data.extend_from_slice(&2u32.to_le_bytes());
        let fw = Firmware::from_bytes("patch", data).unwrap();
        let trailer = fw.patch_trailer().unwrap();
        assert_eq!(trailer.rom_version, 0x300);
        assert_eq!(trailer.build_version, 2);

        let raw = [0x00, 0x03, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00];
        assert_eq!(
            PatchTrailer::parse(&raw),
            PatchTrailer {
                rom_version: 0x300,
                build_version: 7
            }
        );
    }

    #[test]
    fn test_patch_acceptance_rule() {
        let device = version(0x300, 10);
        let cases = [
            (0x300, 11, true),
            (0x300, 10, false),
            (0x300, 9, false),
            (0x301, 11, false),
            (0x2ff, 99, false),
        ];
        for (rom, build, expected) in cases {
            let trailer = PatchTrailer {
                rom_version: rom,
                build_version: build,
            };
            assert_eq!(trailer.accepts(&device), expected, "rom={rom:#x} build={build}");
        }
    }

    #[test]
    fn test_byte_swapped_trailer_detection() {
        let device = version(0x0000_0300, 1);
        let swapped = PatchTrailer {
            rom_version: 0x0003_0000,
            build_version: 2,
        };
        assert!(swapped.looks_byte_swapped(&device));
        assert!(!swapped.accepts(&device));

        let good = PatchTrailer {
            rom_version: 0x300,
            build_version: 2,
        };
        assert!(!good.looks_byte_swapped(&device));
        assert!(!good.is_implausible());
        assert!(
            PatchTrailer {
                rom_version: 0x300,
                build_version: 0x0200_0000
            }
            .is_implausible()
        );
    }

    #[test]
    fn test_file_paths() {
        let prefix = Path::new("/fw");
        assert_eq!(legacy_firmware_path(prefix), Path::new("/fw/ath3k-1.fw"));
        assert_eq!(
            patch_path(prefix, 0x300),
            Path::new("/fw/ar3k/AthrBT_0x00000300.dfu")
        );
        assert_eq!(
            syscfg_path(prefix, 0x300, RefClock::Mhz26),
            Path::new("/fw/ar3k/ramps_0x00000300_26.dfu")
        );
        assert_eq!(
            syscfg_path(prefix, 0x3101, RefClock::Unknown(7)),
            Path::new("/fw/ar3k/ramps_0x00003101_0.dfu")
        );
    }
}
