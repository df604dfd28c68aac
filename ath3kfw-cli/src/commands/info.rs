//! Radio info command implementation.

use {
    anyhow::{Context, Result},
    ath3kfw::{
        DeviceKind, DeviceState, VersionRecord, device::check_ids, get_state, get_version,
        image::{patch_path, syscfg_path},
        open_device, parse_device_name,
    },
    console::style,
    std::path::Path,
};

use crate::Settings;

fn info_json(
    name: &str,
    ids: (u16, u16),
    state: DeviceState,
    version: &VersionRecord,
    prefix: &Path,
) -> serde_json::Value {
    let clock = version.ref_clock();
    serde_json::json!({
        "device": name,
        "vid": format!("0x{:04x}", ids.0),
        "pid": format!("0x{:04x}", ids.1),
        "kind": DeviceKind::from_vid_pid(ids.0, ids.1).name(),
        "state": {
            "raw": format!("0x{:02x}", state.raw()),
            "mode": format!("0x{:02x}", state.mode()),
            "normal_mode": state.is_normal_mode(),
            "patch_installed": state.patch_installed(),
            "syscfg_installed": state.syscfg_installed(),
        },
        "version": {
            "rom_version": format!("0x{:08x}", version.rom_version),
            "build_version": version.build_version,
            "ram_version": version.ram_version,
            "ref_clock": clock.to_string(),
        },
        "files": {
            "patch": patch_path(prefix, version.rom_version),
            "syscfg": syscfg_path(prefix, version.rom_version, clock),
        },
    })
}

/// Info command implementation.
pub(crate) fn cmd_info(settings: &Settings, json: bool) -> Result<()> {
    let name = settings.require_device()?;
    let (bus, address) = parse_device_name(name)?;

    let mut transport = open_device(bus, address)
        .with_context(|| format!("Failed to open device {name}"))?;
    let ids = transport.ids()?;
    check_ids(ids, settings.vendor, settings.product);

    let state = get_state(&mut transport)?;
    let version = get_version(&mut transport)?;

    if json {
        let output = serde_json::json!({
            "ok": true,
            "data": info_json(name, ids, state, &version, &settings.firmware_path),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let kind = DeviceKind::from_vid_pid(ids.0, ids.1);
    eprintln!(
        "{} ({:04x}:{:04x}) {}",
        style(name).cyan().bold(),
        ids.0,
        ids.1,
        if kind.is_known() {
            style(format!("[{}]", kind.name())).yellow().to_string()
        } else {
            String::new()
        }
    );
    eprintln!("  State:         {state}");
    eprintln!("  ROM version:   0x{:08x}", version.rom_version);
    eprintln!("  Build version: {}", version.build_version);
    eprintln!("  RAM version:   {}", version.ram_version);
    eprintln!("  Ref clock:     {}", version.ref_clock());

    let prefix = &settings.firmware_path;
    eprintln!(
        "  Patch file:    {}",
        patch_path(prefix, version.rom_version).display()
    );
    eprintln!(
        "  Syscfg file:   {}",
        syscfg_path(prefix, version.rom_version, version.ref_clock()).display()
    );

    Ok(())
}
