//! Boot sequence command implementation.

use anyhow::{Context, Result};
use ath3kfw::{
    Ar3kLoader, BootReport, DeviceKind, StageOutcome, SwitchOutcome, device::check_ids,
    open_device, parse_device_name,
};
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{info, warn};

use crate::{Settings, use_fancy_output};

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet || !use_fancy_output() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    #[allow(clippy::unwrap_used)] // Static template string
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb
}

fn stage_text(outcome: StageOutcome) -> String {
    match outcome {
        StageOutcome::Applied => style("loaded").green().to_string(),
        StageOutcome::AlreadyConfigured => style("already done").yellow().to_string(),
        StageOutcome::NotApplicable => style("n/a").dim().to_string(),
    }
}

fn print_report(report: &BootReport) {
    eprintln!("\n{}", style(format!("{} boot report", report.variant)).bold().underlined());
    eprintln!("  Initial state: {}", report.initial_state);
    eprintln!("  {}", report.version);
    if report.variant.is_staged() {
        eprintln!("  Patch:         {}", stage_text(report.patch));
        eprintln!("  Syscfg:        {}", stage_text(report.syscfg));
        eprintln!("  Normal mode:   {}", stage_text(report.normal_mode));
        let switch = match &report.switch {
            SwitchOutcome::Acknowledged => style("acknowledged".to_string()).green(),
            SwitchOutcome::Unacknowledged { error } => {
                style(format!("not acknowledged ({error})")).yellow()
            },
            SwitchOutcome::NotIssued => style("not issued".to_string()).dim(),
        };
        eprintln!("  VID/PID switch: {switch}");
    } else {
        eprintln!("  Firmware:      {}", stage_text(report.firmware));
    }
}

/// Load command implementation.
pub(crate) fn cmd_load(settings: &Settings) -> Result<()> {
    let name = settings.require_device()?;
    let (bus, address) = parse_device_name(name)?;

    let transport = open_device(bus, address)
        .with_context(|| format!("Failed to open device {name}"))?;

    let ids = transport.ids()?;
    check_ids(ids, settings.vendor, settings.product);

    let kind = DeviceKind::from_vid_pid(ids.0, ids.1);
    if !settings.variant_explicit {
        if let Some(detected) = kind.variant().filter(|v| *v != settings.variant) {
            warn!(
                "Device {:04x}:{:04x} looks like an {}, running the {} plan; pass -m {}",
                ids.0,
                ids.1,
                detected,
                settings.variant,
                detected.tag()
            );
        }
    }

    if !settings.quiet {
        eprintln!(
            "{} Loading {} ({:04x}:{:04x}) as {} from {}",
            style("→").cyan(),
            style(name).cyan().bold(),
            ids.0,
            ids.1,
            settings.variant,
            settings.firmware_path.display()
        );
    }

    let pb = progress_bar(settings.quiet);
    let mut current = String::new();

    let mut loader = Ar3kLoader::new(transport, &settings.firmware_path);
    let result = loader.run(settings.variant, &mut |file: &str, sent: usize, total: usize| {
        if file != current {
            current = file.to_string();
            pb.reset();
            pb.set_length(total as u64);
            pb.set_message(current.clone());
        }
        pb.set_position(sent as u64);
    });

    let report = match result {
        Ok(report) => {
            pb.finish_and_clear();
            report
        },
        Err(e) => {
            pb.abandon();
            return Err(e).with_context(|| format!("Boot sequence failed on {name}"));
        },
    };

    info!(
        "{} boot sequence finished on ugen{bus}.{address}",
        report.variant
    );

    if !settings.quiet {
        print_report(&report);
        eprintln!("\n{} {}", style("✓").green().bold(), "Done");
    }

    Ok(())
}
