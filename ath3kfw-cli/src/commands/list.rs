//! USB device listing command implementation.

use {
    anyhow::{Context, Result},
    ath3kfw::{DetectedDevice, format_device_list, list_devices},
    console::style,
};

fn device_json(device: &DetectedDevice) -> serde_json::Value {
    serde_json::json!({
        "name": device.name(),
        "bus": device.bus,
        "address": device.address,
        "vid": format!("0x{:04x}", device.vid),
        "pid": format!("0x{:04x}", device.pid),
        "kind": device.kind.name(),
        "known": device.kind.is_known(),
        "variant": device.kind.variant().map(|v| v.tag()),
    })
}

/// List command implementation.
pub(crate) fn cmd_list(json: bool) -> Result<()> {
    let detected = list_devices().context("Failed to enumerate USB devices")?;

    if json {
        let devices: Vec<serde_json::Value> = detected.iter().map(device_json).collect();
        let output = serde_json::json!({
            "ok": true,
            "data": {
                "devices": devices,
            }
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    eprintln!("{}", style("USB devices").bold().underlined());

    if detected.is_empty() {
        eprintln!("  {}", style("No USB devices found").dim());
        return Ok(());
    }

    for (device, line) in detected.iter().zip(format_device_list(&detected)) {
        let line = if device.kind.is_known() {
            style(line).yellow()
        } else {
            style(line)
        };
        eprintln!("  {} {line}", style("•").green());
    }

    if let Some(radio) = detected.iter().find(|d| d.kind.is_known()) {
        eprintln!(
            "\n{} Found {} radio: {}",
            style("→").green().bold(),
            radio.kind.name(),
            style(radio.name()).cyan().bold()
        );
    }

    Ok(())
}
