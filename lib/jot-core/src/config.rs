use crate::bus::ThemeMode;
use crate::hotkey::DEFAULT_ACCELERATOR;
use crate::paths;
use log::trace;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    /// Follow the OS appearance
    #[default]
    System,
    Light,
    Dark,
}

impl ThemePreference {
    /// Resolves to a concrete mode, using `system` when following the OS. Light when the OS
    /// does not say.
    pub fn resolve(&self, system: Option<ThemeMode>) -> ThemeMode {
        match self {
            ThemePreference::System => system.unwrap_or(ThemeMode::Light),
            ThemePreference::Light => ThemeMode::Light,
            ThemePreference::Dark => ThemeMode::Dark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Width of the entry field in logical pixels
    pub width: u32,
    /// Height of the entry field in logical pixels
    pub height: u32,
    /// Where the overlay sits vertically, 0.0 is the top of the screen and 1.0 the bottom
    pub vertical_offset: f32,
    /// Hide the overlay when it loses focus
    pub dismiss_on_blur: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 72,
            vertical_offset: 0.3,
            dismiss_on_blur: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// The path the config file was loaded from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Global shortcut that toggles the overlay. Empty uses the built-in default
    pub accelerator: Option<String>,
    pub theme: ThemePreference,
    pub overlay: OverlayConfig,
    /// Reload the config file and rebind the shortcut when the file changes
    pub watch_config: bool,
}

static CURRENT_CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

impl Config {
    /// Loads the config from `config_path`, or the default location. A missing file yields the
    /// defaults; nothing is written back.
    pub fn load(config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = match config_path {
            Some(p) => PathBuf::from(p),
            None => paths::default_config_path()
                .ok_or("Could not determine default config directory")?,
        };

        if !path.exists() {
            trace!("No config file at {}, using defaults", path.display());
            return Ok(Config {
                config_path: Some(path),
                ..Config::default()
            });
        }

        let mut config = Self::load_file(&path)?;
        config.config_path = Some(path);
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        Self::parse(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e).into())
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file is valid and means "all defaults".
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(contents)
    }

    /// The accelerator to bind, falling back to the built-in default.
    pub fn toggle_accelerator(&self) -> &str {
        match self.accelerator.as_deref().map(str::trim) {
            Some(accelerator) if !accelerator.is_empty() => accelerator,
            _ => DEFAULT_ACCELERATOR,
        }
    }

    pub fn set_config(config: Config) {
        if let Ok(mut global_config) = CURRENT_CONFIG.write() {
            *global_config = config;
        }
    }

    pub fn current() -> RwLockReadGuard<'static, Config> {
        CURRENT_CONFIG
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn theme() -> ThemePreference {
        Self::current().theme
    }
}
