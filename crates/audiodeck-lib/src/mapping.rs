//! Device → icon file name lookup.

use std::collections::HashMap;

use crate::config::CustomImage;

/// Icon rendered for devices without an override. Must exist in the icons
/// directory.
pub const FALLBACK_ICON: &str = "invalid.png";

/// Immutable device → icon name table, built once from configuration.
#[derive(Debug, Clone, Default)]
pub struct DeviceIconMapping {
    icons: HashMap<String, String>,
}

impl DeviceIconMapping {
    /// Build the table from config overrides. Later entries for the same
    /// device replace earlier ones (validation reports duplicates).
    pub fn from_custom_images(entries: &[CustomImage]) -> Self {
        let icons = entries
            .iter()
            .map(|e| (e.device_name.clone(), e.image_name.clone()))
            .collect();
        DeviceIconMapping { icons }
    }

    /// The configured icon for `device_id`, if any.
    pub fn get(&self, device_id: &str) -> Option<&str> {
        self.icons.get(device_id).map(String::as_str)
    }

    /// The icon to render for `device_id`: the override, or [`FALLBACK_ICON`].
    pub fn icon_for(&self, device_id: &str) -> &str {
        self.get(device_id).unwrap_or(FALLBACK_ICON)
    }

    /// Distinct icon names referenced by the table, sorted.
    pub fn icon_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.icons.values().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
