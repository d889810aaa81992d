//! Configuration module for the results browser.
//!
//! # Module Structure
//!
//! - `loader`: results file parsing and settings/file path helpers
//! - `validator`: settings validation
//!
//! # Settings Management
//!
//! `BrowserSettings` holds the persisted view preferences (results location,
//! backend column order, grouping toggles, empty-selection and tie policies).
//! `SettingsManager` reads and writes them as JSON, defaulting to
//! `~/.config/bench-browser/settings.json`.

pub mod loader;
pub mod validator;

use crate::error::ConfigError;
use crate::results::{EmptySelection, TiePolicy};
use std::path::Path;

/// Persisted browser preferences.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Results JSON written by the benchmark harness
    pub results_path: String,
    /// Directory for log files
    pub log_dir: String,
    pub debug_logging: bool,

    // View settings
    /// Context selected on load; the first context when unset or unknown
    pub default_context: Option<String>,
    pub empty_selection: EmptySelection,
    /// Preferred backend column order; unlisted backends follow, sorted
    pub backend_order: Vec<String>,
    pub hidden_backends: Vec<String>,
    pub group_by_kernel: bool,
    pub group_by_firmware: bool,
    pub tie_policy: TiePolicy,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        BrowserSettings {
            results_path: "docs/results_new.json".to_string(),
            log_dir: "logs".to_string(),
            debug_logging: false,
            default_context: None,
            empty_selection: EmptySelection::MatchNothing,
            backend_order: Vec::new(),
            hidden_backends: Vec::new(),
            group_by_kernel: false,
            group_by_firmware: false,
            tie_policy: TiePolicy::default(),
        }
    }
}

/// Settings persistence.
pub struct SettingsManager;

impl SettingsManager {
    /// Load settings from the global settings path, or defaults.
    pub fn load() -> Result<BrowserSettings, ConfigError> {
        let path = loader::get_global_settings_path()?;
        Self::load_from(&path)
    }

    /// Load settings from `path`.
    ///
    /// A missing file yields defaults. A file that fails to parse or validate
    /// also yields defaults, with a warning, so a stale settings format never
    /// blocks startup.
    pub fn load_from(path: &Path) -> Result<BrowserSettings, ConfigError> {
        loader::validate_json_path(path)?;

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("[Config] No settings at {}, using defaults", path.display());
                return Ok(BrowserSettings::default());
            }
            Err(e) => return Err(ConfigError::IoError(e)),
        };

        match serde_json::from_str::<BrowserSettings>(&content) {
            Ok(settings) => match validator::validate_settings(&settings) {
                Ok(()) => Ok(settings),
                Err(e) => {
                    log::warn!("[Config] Invalid settings in {}, falling back to defaults: {}", path.display(), e);
                    Ok(BrowserSettings::default())
                }
            },
            Err(e) => {
                log::warn!("[Config] Failed to parse {}, falling back to defaults: {}", path.display(), e);
                Ok(BrowserSettings::default())
            }
        }
    }

    /// Save settings to the global settings path.
    pub fn save(settings: &BrowserSettings) -> Result<(), ConfigError> {
        let path = loader::get_global_settings_path()?;
        Self::save_to(settings, &path)
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save_to(settings: &BrowserSettings, path: &Path) -> Result<(), ConfigError> {
        loader::validate_json_path(path)?;
        validator::validate_settings(settings)?;
        loader::ensure_parent_dir_exists(path)?;

        let content = serde_json::to_string_pretty(settings).map_err(ConfigError::InvalidJson)?;
        std::fs::write(path, content).map_err(ConfigError::IoError)?;
        Ok(())
    }
}
