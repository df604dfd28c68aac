//! Configuration file support for ath3kfw.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (ATH3KFW_*)
//! 3. Local config file (./ath3kfw.toml)
//! 4. Global config file (~/.config/ath3kfw/config.toml)

use ath3kfw::Variant;
use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Local configuration file name.
pub const LOCAL_CONFIG_FILE: &str = "ath3kfw.toml";

/// Firmware configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirmwareConfig {
    /// Firmware prefix directory.
    pub path: Option<PathBuf>,
    /// Variant tag (`legacy` or `ar3012`).
    pub variant: Option<String>,
}

impl FirmwareConfig {
    /// Parsed variant, if one is configured and valid.
    pub fn variant(&self) -> Option<Variant> {
        let tag = self.variant.as_deref()?;
        let variant = Variant::from_name(tag);
        if variant.is_none() {
            warn!("Ignoring unknown variant '{tag}' in config");
        }
        variant
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSection {
    /// Debug verbosity (0 = info, 1 = debug, 2+ = trace).
    pub debug: Option<u8>,
    /// Only warnings and errors.
    #[serde(default)]
    pub quiet: bool,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Firmware configuration.
    #[serde(default)]
    pub firmware: FirmwareConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogSection,
    /// Problems met while loading, reported once logging is up.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path, &mut warnings) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE), &mut warnings)
        {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config.warnings = warnings;
        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        let mut warnings = Vec::new();
        let mut config = if let Some(config) = Self::load_from_file(path, &mut warnings) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warnings.push(format!(
                "Could not load config from {}, using defaults",
                path.display()
            ));
            Self::default()
        };
        config.warnings = warnings;
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path, warnings: &mut Vec<String>) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warnings.push(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ));
                    None
                },
            },
            Err(e) => {
                warnings.push(format!(
                    "Failed to read config file {}: {}",
                    path.display(),
                    e
                ));
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ath3kfw").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    fn merge(&mut self, other: Self) {
        if other.firmware.path.is_some() {
            self.firmware.path = other.firmware.path;
        }
        if other.firmware.variant.is_some() {
            self.firmware.variant = other.firmware.variant;
        }

        if other.log.debug.is_some() {
            self.log.debug = other.log.debug;
        }
        if other.log.quiet {
            self.log.quiet = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.firmware.path.is_none());
        assert!(config.firmware.variant.is_none());
        assert!(config.log.debug.is_none());
        assert!(!config.log.quiet);
    }

    #[test]
    fn test_config_merge_overrides() {
        let mut base = Config::default();
        base.firmware.path = Some(PathBuf::from("/usr/share/firmware/ath3k"));
        base.log.debug = Some(1);

        let mut other = Config::default();
        other.firmware.path = Some(PathBuf::from("/opt/fw"));
        other.firmware.variant = Some("ar3012".to_string());

        base.merge(other);

        assert_eq!(base.firmware.path.as_deref(), Some(Path::new("/opt/fw")));
        assert_eq!(base.firmware.variant(), Some(Variant::Ar3012));
        assert_eq!(base.log.debug, Some(1));
    }

    #[test]
    fn test_config_merge_does_not_overwrite_with_none() {
        let mut base = Config::default();
        base.firmware.variant = Some("legacy".to_string());
        base.log.quiet = true;

        base.merge(Config::default());

        assert_eq!(base.firmware.variant(), Some(Variant::Ar3011));
        assert!(base.log.quiet);
    }

    #[test]
    fn test_unknown_variant_is_ignored() {
        let config = FirmwareConfig {
            path: None,
            variant: Some("ar9271".to_string()),
        };
        assert_eq!(config.variant(), None);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[firmware]
path = "/opt/ath3k"
variant = "ar3012"

[log]
debug = 2
quiet = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.firmware.path.as_deref(), Some(Path::new("/opt/ath3k")));
        assert_eq!(config.firmware.variant.as_deref(), Some("ar3012"));
        assert_eq!(config.log.debug, Some(2));
        assert!(!config.log.quiet);
    }

    #[test]
    fn test_config_from_partial_toml() {
        let config: Config = toml::from_str("[log]\nquiet = true\n").unwrap();
        assert!(config.firmware.path.is_none());
        assert!(config.log.quiet);

        let config: Config = toml::from_str("").unwrap();
        assert!(config.firmware.variant.is_none());
    }

    #[test]
    fn test_load_from_path_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[firmware]\npath = \"/srv/fw\"\n").unwrap();

        let config = Config::load_from_path(&path);
        assert_eq!(config.firmware.path.as_deref(), Some(Path::new("/srv/fw")));
    }

    #[test]
    fn test_load_from_path_malformed_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "invalid toml [[[").unwrap();

        let config = Config::load_from_path(&path);
        assert!(config.firmware.path.is_none());
        assert!(config.warnings[0].starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_load_from_path_nonexistent() {
        let config = Config::load_from_path(Path::new("/nonexistent/path/config.toml"));
        assert!(config.firmware.path.is_none());
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn test_global_config_path() {
        if let Some(p) = Config::global_config_path() {
            assert!(p.to_string_lossy().contains("ath3kfw"));
            assert!(p.ends_with("config.toml"));
        }
    }
}
