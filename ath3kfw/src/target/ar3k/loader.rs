//! AR3K boot sequence.
//!
//! The loader drives a radio from its boot state to normal operation:
//!
//! ```text
//! BOOT --upload(patch)--> PATCHED --upload(syscfg)--> CONFIGURED
//!                                                         |
//!                                                         | SET_NORMAL_MODE
//!                                                         v
//!                                                      NORMAL
//!                                                         | SWITCH_VID_PID
//!                                                         v
//!                                                  RE-ENUMERATING
//! ```
//!
//! AR3011 radios only take a single image. AR3012 radios take the three
//! stages above; the state byte tells which ones are already done, so a
//! second run against the same radio is harmless.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ath3kfw::{Ar3kLoader, Variant, open_device};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = open_device(1, 4)?;
//!     let mut loader = Ar3kLoader::new(transport, "/usr/share/firmware/ath3k");
//!     let report = loader.run(Variant::Ar3012, &mut |name, sent, total| {
//!         println!("{name}: {sent}/{total}");
//!     })?;
//!     println!("{report:?}");
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::image::{Firmware, legacy_firmware_path, patch_path, syscfg_path};
use crate::protocol::ath3k::{DeviceState, Request, VersionRecord, get_state, get_version};
use crate::protocol::upload::upload;
use crate::target::variant::Variant;
use crate::transport::Transport;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Progress callback: `(firmware name, bytes sent, total bytes)`.
pub type Progress<'a> = &'a mut dyn FnMut(&str, usize, usize);

/// Result of a single boot stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StageOutcome {
    /// The stage ran and the radio accepted it.
    Applied,
    /// The state byte showed the stage was already done; nothing was sent.
    AlreadyConfigured,
    /// The stage is not part of this variant's plan.
    NotApplicable,
}

/// Result of the final SWITCH_VID_PID request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SwitchOutcome {
    /// The radio acknowledged the request.
    Acknowledged,
    /// The request failed, usually because the radio already left the bus.
    Unacknowledged {
        /// Transport error text.
        error: String,
    },
    /// The variant's plan has no switch step.
    NotIssued,
}

/// Summary of a boot run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BootReport {
    /// Plan that was executed.
    pub variant: Variant,
    /// State byte read before anything was sent.
    pub initial_state: DeviceState,
    /// Version record read before anything was sent.
    pub version: VersionRecord,
    /// AR3011 image stage.
    pub firmware: StageOutcome,
    /// AR3012 ROM patch stage.
    pub patch: StageOutcome,
    /// AR3012 system configuration stage.
    pub syscfg: StageOutcome,
    /// AR3012 normal mode stage.
    pub normal_mode: StageOutcome,
    /// AR3012 VID/PID switch.
    pub switch: SwitchOutcome,
}

impl BootReport {
    fn new(variant: Variant, initial_state: DeviceState, version: VersionRecord) -> Self {
        Self {
            variant,
            initial_state,
            version,
            firmware: StageOutcome::NotApplicable,
            patch: StageOutcome::NotApplicable,
            syscfg: StageOutcome::NotApplicable,
            normal_mode: StageOutcome::NotApplicable,
            switch: SwitchOutcome::NotIssued,
        }
    }

    /// Whether any firmware was uploaded during the run.
    pub fn uploaded_anything(&self) -> bool {
        [self.firmware, self.patch, self.syscfg].contains(&StageOutcome::Applied)
    }
}

/// AR3K firmware loader.
///
/// Generic over the transport `T`, so it runs against a real device or a
/// test double alike. Transfers are strictly sequential; the loader holds
/// the transport exclusively for its whole lifetime.
pub struct Ar3kLoader<T: Transport> {
    transport: T,
    firmware_dir: PathBuf,
}

impl<T: Transport> Ar3kLoader<T> {
    /// Create a loader reading firmware files below `firmware_dir`.
    pub fn new(transport: T, firmware_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            firmware_dir: firmware_dir.into(),
        }
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the loader and return the underlying transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Firmware prefix directory.
    pub fn firmware_dir(&self) -> &Path {
        &self.firmware_dir
    }

    /// Read state byte and version record without changing anything.
    pub fn probe(&mut self) -> Result<(DeviceState, VersionRecord)> {
        let state = get_state(&mut self.transport)?;
        let version = get_version(&mut self.transport)?;
        debug!("state={state}");
        info!("{version}");
        Ok((state, version))
    }

    /// Run the boot plan for `variant`.
    ///
    /// Aborts on the first failing stage. A failed SWITCH_VID_PID is the
    /// only error that does not abort; it is recorded in the report.
    pub fn run(&mut self, variant: Variant, progress: Progress<'_>) -> Result<BootReport> {
        let (state, version) = self.probe()?;
        let mut report = BootReport::new(variant, state, version);

        match variant {
            Variant::Ar3011 => {
                report.firmware = if state.is_normal_mode() {
                    info!("Radio already in normal mode, nothing to load");
                    StageOutcome::AlreadyConfigured
                } else {
                    self.load_legacy_firmware(progress)?
                };
            },
            Variant::Ar3012 => {
                if state.is_normal_mode() {
                    info!("Radio already in normal mode, skipping patch and syscfg");
                    report.patch = StageOutcome::AlreadyConfigured;
                    report.syscfg = StageOutcome::AlreadyConfigured;
                } else {
                    report.patch = self.load_patch(progress)?;
                    report.syscfg = self.load_syscfg(progress)?;
                }
                report.normal_mode = self.set_normal_mode()?;
                report.switch = self.switch_pid();
            },
        }

        Ok(report)
    }

    /// Load the AR3011 image `<prefix>/ath3k-1.fw`.
    pub fn load_legacy_firmware(&mut self, progress: Progress<'_>) -> Result<StageOutcome> {
        let path = legacy_firmware_path(&self.firmware_dir);
        debug!("Loading {}", path.display());

        let firmware = Firmware::from_file(&path)?;
        self.upload(&firmware, progress)?;

        info!("Firmware {} loaded", path.display());
        Ok(StageOutcome::Applied)
    }

    /// Load the AR3012 ROM patch matching the radio's ROM version.
    ///
    /// Skipped when the state byte says a patch is already resident. The
    /// patch trailer must name the same ROM and a newer build than the
    /// radio reports, otherwise [`Error::VersionMismatch`] is returned and
    /// nothing is sent.
    pub fn load_patch(&mut self, progress: Progress<'_>) -> Result<StageOutcome> {
        let state = get_state(&mut self.transport)?;
        if state.patch_installed() {
            info!("Patch already downloaded");
            return Ok(StageOutcome::AlreadyConfigured);
        }

        let device = get_version(&mut self.transport)?;
        let path = patch_path(&self.firmware_dir, device.rom_version);
        let firmware = Firmware::from_file(&path)?;

        let trailer = firmware.patch_trailer()?;
        info!(
            "Patch {}: rom_version=0x{:08x}, build_version={}",
            path.display(),
            trailer.rom_version,
            trailer.build_version
        );

        if trailer.is_implausible() {
            warn!(
                "Patch build version {} is implausibly large; trailer may not be little-endian",
                trailer.build_version
            );
        }

        if !trailer.accepts(&device) {
            if trailer.looks_byte_swapped(&device) {
                warn!("Patch trailer matches the radio only when read big-endian");
            }
            return Err(Error::VersionMismatch {
                patch_rom: trailer.rom_version,
                patch_build: trailer.build_version,
                device_rom: device.rom_version,
                device_build: device.build_version,
            });
        }

        self.upload(&firmware, progress)?;
        info!("Patch loaded");
        Ok(StageOutcome::Applied)
    }

    /// Load the AR3012 system configuration for the radio's reference clock.
    pub fn load_syscfg(&mut self, progress: Progress<'_>) -> Result<StageOutcome> {
        // Confirms the radio still answers after the patch
        get_state(&mut self.transport)?;

        let device = get_version(&mut self.transport)?;
        let clock = device.ref_clock();
        let path = syscfg_path(&self.firmware_dir, device.rom_version, clock);
        info!("Syscfg file {} (ref clock {clock})", path.display());

        let firmware = Firmware::from_file(&path)?;
        self.upload(&firmware, progress)?;

        info!("Syscfg loaded");
        Ok(StageOutcome::Applied)
    }

    /// Put the radio into normal mode unless it already is.
    pub fn set_normal_mode(&mut self) -> Result<StageOutcome> {
        let state = get_state(&mut self.transport)?;
        if state.is_normal_mode() {
            info!("Firmware is already in normal mode");
            return Ok(StageOutcome::AlreadyConfigured);
        }

        self.transport
            .control_out(Request::SetNormalMode.code(), 0, 0, &[])?;
        debug!("{} accepted", Request::SetNormalMode);
        Ok(StageOutcome::Applied)
    }

    /// Ask the radio to re-enumerate under its runtime VID/PID.
    ///
    /// The radio may drop off the bus before acknowledging, so a failure
    /// is logged and reported but never returned as an error.
    pub fn switch_pid(&mut self) -> SwitchOutcome {
        match self
            .transport
            .control_out(Request::SwitchVidPid.code(), 0, 0, &[])
        {
            Ok(_) => {
                info!("Radio switching to runtime VID/PID");
                SwitchOutcome::Acknowledged
            },
            Err(e) => {
                warn!("{} not acknowledged: {e}", Request::SwitchVidPid);
                SwitchOutcome::Unacknowledged {
                    error: e.to_string(),
                }
            },
        }
    }

    fn upload(&mut self, firmware: &Firmware, progress: Progress<'_>) -> Result<()> {
        let name = firmware.name().to_string();
        upload(&mut self.transport, firmware, |sent, total| {
            progress(&name, sent, total);
        })
    }
}
