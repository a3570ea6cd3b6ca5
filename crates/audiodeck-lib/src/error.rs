//! Unified error type for the audiodeck-lib crate.
//!
//! [`AudiodeckError`] wraps module-specific errors (`AudioError`, I/O) and the
//! domain error kinds raised while loading configuration and resolving icons.
//! `From` impls allow `?` to propagate across module boundaries.

use std::fmt;
use std::path::PathBuf;

use crate::audio::AudioError;

/// Unified error type for audiodeck-lib operations.
#[derive(Debug)]
pub enum AudiodeckError {
    /// A required configuration key is absent.
    ConfigurationMissing { key: &'static str },
    /// Configuration could not be parsed or failed validation.
    Config(String),
    /// An icon file exists but could not be read or decoded.
    IconLoad { name: String, reason: String },
    /// An icon file does not exist in the icons directory.
    IconNotFound { name: String, path: PathBuf },
    /// A command referenced a device that is not currently enumerated.
    DeviceNotFound(String),
    /// Requested render size is not a positive pixel count.
    InvalidSize(u32),
    /// Audio subsystem error.
    Audio(AudioError),
    /// Standard I/O error (config file read).
    Io(std::io::Error),
}

impl AudiodeckError {
    /// Whether this error means an icon could not be produced.
    ///
    /// `IconNotFound` is the existence-checked flavour of `IconLoad`; callers
    /// treat the two identically.
    pub fn is_icon_error(&self) -> bool {
        matches!(
            self,
            AudiodeckError::IconLoad { .. } | AudiodeckError::IconNotFound { .. }
        )
    }
}

impl fmt::Display for AudiodeckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudiodeckError::ConfigurationMissing { key } => {
                write!(f, "Missing required configuration key: {key}")
            }
            AudiodeckError::Config(e) => write!(f, "Config error: {e}"),
            AudiodeckError::IconLoad { name, reason } => {
                write!(f, "Cannot load icon {name}: {reason}")
            }
            AudiodeckError::IconNotFound { name, path } => {
                write!(f, "Icon {name} not found at {}", path.display())
            }
            AudiodeckError::DeviceNotFound(id) => write!(f, "Audio device not found: {id}"),
            AudiodeckError::InvalidSize(size) => write!(
                f,
                "Invalid icon size: {size} (must be 1..={})",
                crate::icons::resolver::MAX_ICON_SIZE
            ),
            AudiodeckError::Audio(e) => write!(f, "{e}"),
            AudiodeckError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for AudiodeckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AudiodeckError::Audio(e) => Some(e),
            AudiodeckError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AudioError> for AudiodeckError {
    fn from(e: AudioError) -> Self {
        AudiodeckError::Audio(e)
    }
}

impl From<std::io::Error> for AudiodeckError {
    fn from(e: std::io::Error) -> Self {
        AudiodeckError::Io(e)
    }
}

/// Crate-level Result alias using [`AudiodeckError`].
pub type Result<T> = std::result::Result<T, AudiodeckError>;
