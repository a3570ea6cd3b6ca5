//! Plugin configuration: TOML-based, loaded once at startup.
//!
//! The file is flat: a refresh cooldown, the mute/unmute icon names, an
//! optional icons directory, and a list of per-device icon overrides.
//!
//! ```toml
//! volume_change_cooldown_ms = 500
//! mute_icon = "mute.png"
//! unmute_icon = "unmute.png"
//!
//! [[custom_images]]
//! device_name = "Speakers (Realtek)"
//! image_name = "speakers.png"
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AudiodeckError, Result};

/// Name of the icons folder, relative to the config file's directory.
pub const ICONS_DIR_NAME: &str = "images";

/// A single device → icon override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomImage {
    /// Stable device identifier (the device's full name).
    pub device_name: String,
    /// Icon file name inside the icons directory.
    pub image_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Minimum interval between mute-state icon refreshes, in milliseconds.
    pub volume_change_cooldown_ms: u64,

    /// Icon shown when the default communications mic is muted.
    pub mute_icon: String,

    /// Icon shown when the default communications mic is live.
    pub unmute_icon: String,

    /// Icons directory. Relative paths are resolved against the config file's
    /// directory. `None` = `<config dir>/images`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons_dir: Option<PathBuf>,

    /// Per-device icon overrides.
    pub custom_images: Vec<CustomImage>,
}

/// On-disk shape. Required keys are optional here so that a missing key can
/// be reported by name instead of as a generic parse error.
#[derive(Deserialize)]
struct RawConfig {
    volume_change_cooldown_ms: Option<u64>,
    mute_icon: Option<String>,
    unmute_icon: Option<String>,
    #[serde(default)]
    icons_dir: Option<PathBuf>,
    #[serde(default)]
    custom_images: Vec<CustomImage>,
}

impl TryFrom<RawConfig> for Config {
    type Error = AudiodeckError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        Ok(Config {
            volume_change_cooldown_ms: raw.volume_change_cooldown_ms.ok_or(
                AudiodeckError::ConfigurationMissing {
                    key: "volume_change_cooldown_ms",
                },
            )?,
            mute_icon: raw
                .mute_icon
                .ok_or(AudiodeckError::ConfigurationMissing { key: "mute_icon" })?,
            unmute_icon: raw
                .unmute_icon
                .ok_or(AudiodeckError::ConfigurationMissing { key: "unmute_icon" })?,
            icons_dir: raw.icons_dir,
            custom_images: raw.custom_images,
        })
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// An icon name field is empty or whitespace-only.
    EmptyIconName { field: String },
    /// An icon name is not a plain file name (contains a path separator or `..`).
    InvalidIconName { field: String, name: String },
    /// A `custom_images` entry has an empty `device_name`.
    EmptyDeviceName { index: usize },
    /// Two `custom_images` entries target the same device.
    DuplicateDevice(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyIconName { field } => write!(f, "{field} cannot be empty"),
            ValidationError::InvalidIconName { field, name } => {
                write!(f, "Invalid {field}: \"{name}\" is not a plain file name")
            }
            ValidationError::EmptyDeviceName { index } => {
                write!(f, "custom_images[{index}].device_name cannot be empty")
            }
            ValidationError::DuplicateDevice(name) => {
                write!(f, "Duplicate custom_images entry for device \"{name}\"")
            }
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("audiodeck"))
    }

    /// Full path to the default config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Parse a config from TOML text.
    ///
    /// Missing required keys yield [`AudiodeckError::ConfigurationMissing`];
    /// malformed TOML or wrongly-typed values yield [`AudiodeckError::Config`].
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(contents).map_err(|e| AudiodeckError::Config(e.to_string()))?;
        Config::try_from(raw)
    }

    /// Load config from an arbitrary path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            AudiodeckError::Config(msg) => {
                AudiodeckError::Config(format!("{} ({msg})", path.display()))
            }
            other => other,
        })
    }

    /// Load config from the default platform path.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::path() else {
            return Err(AudiodeckError::Config("No config directory".into()));
        };
        Self::load_from(&path)
    }

    /// Refresh cooldown as a `Duration`.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.volume_change_cooldown_ms)
    }

    /// Resolve the icons directory for a config loaded from `config_path`.
    pub fn icons_dir_for(&self, config_path: &Path) -> PathBuf {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        match &self.icons_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => base.join(dir),
            None => base.join(ICONS_DIR_NAME),
        }
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_icon_name("mute_icon", &self.mute_icon, &mut errors);
        check_icon_name("unmute_icon", &self.unmute_icon, &mut errors);

        let mut seen = HashSet::new();
        for (i, entry) in self.custom_images.iter().enumerate() {
            if entry.device_name.trim().is_empty() {
                errors.push(ValidationError::EmptyDeviceName { index: i });
            } else if !seen.insert(entry.device_name.as_str()) {
                errors.push(ValidationError::DuplicateDevice(entry.device_name.clone()));
            }
            check_icon_name(
                &format!("custom_images[{i}].image_name"),
                &entry.image_name,
                &mut errors,
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Config {
    /// [`validate`](Self::validate), logging each problem and folding them
    /// into a single [`AudiodeckError::Config`].
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate().map_err(|errors| {
            for e in &errors {
                log::error!("[config] {e}");
            }
            AudiodeckError::Config(
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })
    }
}

fn check_icon_name(field: &str, name: &str, errors: &mut Vec<ValidationError>) {
    if name.trim().is_empty() {
        errors.push(ValidationError::EmptyIconName {
            field: field.to_string(),
        });
    } else if name.contains('/') || name.contains('\\') || name == ".." || name == "." {
        errors.push(ValidationError::InvalidIconName {
            field: field.to_string(),
            name: name.to_string(),
        });
    }
}
