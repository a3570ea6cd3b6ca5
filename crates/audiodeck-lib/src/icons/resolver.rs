//! Device → display-ready icon bytes.

use std::sync::Arc;

use super::cache::{IconVariant, ImageTransformCache};
use super::source::IconSource;
use super::transform;
use crate::config::Config;
use crate::error::{AudiodeckError, Result};
use crate::mapping::{DeviceIconMapping, FALLBACK_ICON};

/// Mute/unmute icons are drawn at this fraction of the button size.
pub const MUTE_ICON_SCALE: f32 = 0.7;

/// Largest square icon edge, in pixels, a render request may ask for.
pub const MAX_ICON_SIZE: u32 = 1024;

/// Whether `size` is an acceptable render size (`1..=MAX_ICON_SIZE`).
pub fn check_size(size: u32) -> Result<()> {
    if size == 0 || size > MAX_ICON_SIZE {
        return Err(AudiodeckError::InvalidSize(size));
    }
    Ok(())
}

/// Picks, transforms and sizes icons for control-surface buttons.
///
/// Base images come from an [`ImageTransformCache`]; the final resize and
/// PNG encode run on every call because the requested size varies per button.
pub struct IconResolver {
    mapping: DeviceIconMapping,
    mute_icon: String,
    unmute_icon: String,
    cache: ImageTransformCache,
}

impl IconResolver {
    pub fn new(
        mapping: DeviceIconMapping,
        mute_icon: impl Into<String>,
        unmute_icon: impl Into<String>,
        source: Arc<dyn IconSource>,
    ) -> Self {
        IconResolver {
            mapping,
            mute_icon: mute_icon.into(),
            unmute_icon: unmute_icon.into(),
            cache: ImageTransformCache::new(source),
        }
    }

    pub fn from_config(config: &Config, source: Arc<dyn IconSource>) -> Self {
        Self::new(
            DeviceIconMapping::from_custom_images(&config.custom_images),
            config.mute_icon.clone(),
            config.unmute_icon.clone(),
            source,
        )
    }

    pub fn mapping(&self) -> &DeviceIconMapping {
        &self.mapping
    }

    pub fn cache(&self) -> &ImageTransformCache {
        &self.cache
    }

    /// PNG bytes for `device_id` at `size × size`.
    ///
    /// Unmapped devices use [`FALLBACK_ICON`]. A mapped device whose file is
    /// missing or broken is an error, not a fallback.
    pub fn resolve_icon(&self, device_id: &str, is_default: bool, size: u32) -> Result<Vec<u8>> {
        let name = self.mapping.icon_for(device_id);
        self.render(name, IconVariant::for_active(is_default), size)
    }

    /// Like [`resolve_icon`](Self::resolve_icon), but never fails on icon
    /// problems: logs and draws the fallback icon in the same variant.
    ///
    /// Returns an empty buffer only if the fallback itself cannot be drawn.
    pub fn render_icon(&self, device_id: &str, is_default: bool, size: u32) -> Vec<u8> {
        match self.resolve_icon(device_id, is_default, size) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("[icons] {device_id}: {e}; drawing {FALLBACK_ICON}");
                self.render_fallback(IconVariant::for_active(is_default), size)
            }
        }
    }

    /// PNG bytes for the mic mute button, scaled by [`MUTE_ICON_SCALE`].
    pub fn resolve_mute_icon(&self, muted: bool, size: u32) -> Result<Vec<u8>> {
        check_size(size)?;
        let name = if muted {
            &self.mute_icon
        } else {
            &self.unmute_icon
        };
        self.render(name, IconVariant::Normal, mute_icon_size(size))
    }

    /// Never-failing counterpart of [`resolve_mute_icon`](Self::resolve_mute_icon).
    pub fn render_mute_icon(&self, muted: bool, size: u32) -> Vec<u8> {
        match self.resolve_mute_icon(muted, size) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("[icons] mute icon: {e}; drawing {FALLBACK_ICON}");
                self.render_fallback(IconVariant::Normal, mute_icon_size(size))
            }
        }
    }

    /// Decode every configured icon up front.
    ///
    /// A broken fallback icon is fatal. Other failures are logged and left to
    /// surface on the render request that needs them.
    pub fn preload(&self) -> Result<()> {
        if let Err(e) = self.cache.get_or_create(FALLBACK_ICON, IconVariant::Normal) {
            log::error!("[icons] fallback icon unusable: {e}");
            return Err(e);
        }

        let mut names = self.mapping.icon_names();
        names.push(&self.mute_icon);
        names.push(&self.unmute_icon);
        for name in names {
            if let Err(e) = self.cache.get_or_create(name, IconVariant::Normal) {
                log::warn!("[icons] preload: {e}");
            }
        }
        Ok(())
    }

    fn render_fallback(&self, variant: IconVariant, size: u32) -> Vec<u8> {
        match self.render(FALLBACK_ICON, variant, size) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("[icons] fallback render failed: {e}");
                Vec::new()
            }
        }
    }

    fn render(&self, name: &str, variant: IconVariant, size: u32) -> Result<Vec<u8>> {
        check_size(size)?;
        let base = self.cache.get_or_create(name, variant)?;
        let sized = transform::resize_square(base.pixels(), size);
        transform::encode_png(&sized).map_err(|e| AudiodeckError::IconLoad {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

fn mute_icon_size(size: u32) -> u32 {
    ((size as f32 * MUTE_ICON_SCALE) as u32).max(1)
}
