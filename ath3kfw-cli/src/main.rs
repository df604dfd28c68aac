//! ath3kfw CLI - Command-line firmware loader for Atheros AR3011/AR3012 radios.
//!
//! ## Features
//!
//! - Load `ath3k-1.fw` into AR3011 radios
//! - Load ROM patch and system configuration into AR3012 radios
//! - Query the state byte and version record of a radio
//! - List USB devices, marking known radios
//! - Shell completion generation
//! - Environment variable and config file support

use anyhow::Result;
use ath3kfw::{DEFAULT_FIRMWARE_PATH, Variant};
use clap::{Parser, Subcommand, error::ErrorKind};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use log::{debug, warn};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

mod commands;
mod config;

use commands::{
    completions::cmd_completions, info::cmd_info, list::cmd_list, load::cmd_load,
};
use config::Config;

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Check if progress bars and colors should be used (TTY and colors enabled).
pub(crate) fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// Exit code for success.
const EXIT_OK: u8 = 0;
/// Exit code for runtime failures (device, transfer, firmware).
const EXIT_FAILURE: u8 = 1;
/// Exit code for usage and initialization errors.
const EXIT_USAGE: u8 = 127;

/// ath3kfw - Firmware loader for Atheros AR3011/AR3012 USB Bluetooth radios.
///
/// Environment variables:
///   ATH3KFW_DEVICE          - Default device (ugenB.A)
///   ATH3KFW_FIRMWARE_PATH   - Firmware prefix directory
///   ATH3KFW_VARIANT         - Variant tag (legacy, ar3012)
#[derive(Parser)]
#[command(name = "ath3kfw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Device to load, as ugenB.A (bus.address).
    #[arg(short, long, global = true, env = "ATH3KFW_DEVICE")]
    device: Option<String>,

    /// Firmware prefix directory [default: /usr/share/firmware/ath3k/].
    #[arg(short, long, global = true, env = "ATH3KFW_FIRMWARE_PATH")]
    firmware_path: Option<PathBuf>,

    /// Radio variant.
    #[arg(
        short,
        long = "mode",
        global = true,
        env = "ATH3KFW_VARIANT",
        value_name = "legacy|ar3012",
        value_parser = parse_variant
    )]
    mode: Option<Variant>,

    /// Expected USB vendor ID (decimal or 0x hex).
    #[arg(short, long, global = true, value_parser = parse_id)]
    vendor: Option<u16>,

    /// Expected USB product ID (decimal or 0x hex).
    #[arg(short, long, global = true, value_parser = parse_id)]
    product: Option<u16>,

    /// Debug output level (-D, -DD for increasing detail).
    #[arg(short = 'D', long, global = true, action = clap::ArgAction::Count)]
    debug: u8,

    /// Quiet mode (only warnings and errors).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the boot sequence (default).
    Load,

    /// Print the state byte and version record of a radio.
    Info {
        /// Output information as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// List USB devices, marking known radios.
    List {
        /// Output device list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type for completions.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Errors detected by the CLI itself, before the library is involved.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// A required option was not given on the command line, env or config.
    #[error("{0}")]
    Usage(String),
}

/// Parse a variant tag.
fn parse_variant(s: &str) -> Result<Variant, String> {
    Variant::from_name(s).ok_or_else(|| format!("Unknown variant '{s}', expected legacy or ar3012"))
}

/// Parse a USB ID (decimal, or hex with 0x prefix).
fn parse_id(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        s.parse::<u16>()
    };
    parsed.map_err(|e| format!("Invalid USB ID '{s}': {e}"))
}

/// Logging settings resolved from flags and config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LogConfig {
    /// Debug verbosity (0 = info, 1 = debug, 2+ = trace).
    pub(crate) debug: u8,
    /// Only warnings and errors.
    pub(crate) quiet: bool,
}

impl LogConfig {
    /// Combine command-line flags with the config file.
    fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            debug: if cli.debug > 0 {
                cli.debug
            } else {
                config.log.debug.unwrap_or(0)
            },
            quiet: cli.quiet || config.log.quiet,
        }
    }

    /// Default `env_logger` filter; `RUST_LOG` still wins.
    fn filter(self) -> &'static str {
        if self.quiet {
            "warn"
        } else {
            match self.debug {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    fn init(self) {
        env_logger::Builder::from_env(Env::default().default_filter_or(self.filter()))
            .format_target(self.debug >= 2)
            .format_timestamp(if self.debug >= 2 {
                Some(env_logger::TimestampPrecision::Millis)
            } else {
                None
            })
            .init();
    }
}

/// Everything a command needs, resolved from flags, env and config.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) device: Option<String>,
    pub(crate) firmware_path: PathBuf,
    pub(crate) variant: Variant,
    pub(crate) variant_explicit: bool,
    pub(crate) vendor: Option<u16>,
    pub(crate) product: Option<u16>,
    pub(crate) quiet: bool,
}

impl Settings {
    fn resolve(cli: &Cli, config: &Config, log: LogConfig) -> Self {
        let configured = cli.mode.or_else(|| config.firmware.variant());
        Self {
            device: cli.device.clone(),
            firmware_path: cli
                .firmware_path
                .clone()
                .or_else(|| config.firmware.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FIRMWARE_PATH)),
            variant: configured.unwrap_or_default(),
            variant_explicit: configured.is_some(),
            vendor: cli.vendor,
            product: cli.product,
            quiet: log.quiet,
        }
    }

    /// Device name, or a usage error when none was given anywhere.
    pub(crate) fn require_device(&self) -> Result<&str> {
        self.device.as_deref().ok_or_else(|| {
            CliError::Usage(
                "No device given; use -d ugenB.A or set ATH3KFW_DEVICE (see `ath3kfw list`)"
                    .to_string(),
            )
            .into()
        })
    }
}

/// Map an error to the process exit code.
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<CliError>().is_some() {
            return EXIT_USAGE;
        }
        if let Some(e) = cause.downcast_ref::<ath3kfw::Error>() {
            return if e.is_init_error() {
                EXIT_USAGE
            } else {
                EXIT_FAILURE
            };
        }
    }
    EXIT_FAILURE
}

fn run(cli: &Cli) -> Result<()> {
    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    let log = LogConfig::resolve(cli, &config);
    log.init();

    for warning in &config.warnings {
        warn!("{warning}");
    }

    debug!(
        "ath3kfw v{} (debug level: {})",
        env!("CARGO_PKG_VERSION"),
        log.debug
    );

    let settings = Settings::resolve(cli, &config, log);

    match &cli.command {
        None | Some(Commands::Load) => cmd_load(&settings),
        Some(Commands::Info { json }) => cmd_info(&settings, *json),
        Some(Commands::List { json }) => cmd_list(*json),
        Some(Commands::Completions { shell }) => {
            cmd_completions(*shell);
            Ok(())
        },
    }
}

fn main() -> ExitCode {
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => ExitCode::from(EXIT_OK),
                _ => ExitCode::from(EXIT_USAGE),
            };
        },
    };

    match run(&cli) {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            ExitCode::from(exit_code(&err))
        },
    }
}
