//! Decoded icon cache: the single point of icon I/O and transform work.
//!
//! Entries are keyed by `(icon name, variant)` and live for the process
//! lifetime; icons on disk are assumed static. The washed-out variant is
//! derived from the cached normal one, so each file is read at most once.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbaImage;

use super::source::IconSource;
use super::transform;
use crate::error::{AudiodeckError, Result};

/// Which rendering of an icon to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconVariant {
    /// Pixels as stored on disk.
    Normal,
    /// RGB dimmed by [`transform::ColorMatrix::WASH_OUT`].
    WashedOut,
}

impl IconVariant {
    /// `Normal` for the active/default device, `WashedOut` otherwise.
    pub fn for_active(active: bool) -> Self {
        if active {
            IconVariant::Normal
        } else {
            IconVariant::WashedOut
        }
    }
}

/// Decoded RGBA pixels, ready to resize.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseImage {
    pixels: RgbaImage,
}

impl BaseImage {
    pub fn new(pixels: RgbaImage) -> Self {
        BaseImage { pixels }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

type CacheKey = (String, IconVariant);

pub struct ImageTransformCache {
    source: Arc<dyn IconSource>,
    entries: Mutex<HashMap<CacheKey, Arc<BaseImage>>>,
}

impl ImageTransformCache {
    pub fn new(source: Arc<dyn IconSource>) -> Self {
        ImageTransformCache {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached image for `(name, variant)`, loading and transforming
    /// it on first use.
    ///
    /// The lock is not held while loading. Two callers racing on the same
    /// missing key may both compute it; the first stored result wins.
    pub fn get_or_create(&self, name: &str, variant: IconVariant) -> Result<Arc<BaseImage>> {
        if let Some(hit) = self.get(name, variant) {
            return Ok(hit);
        }

        let image = match variant {
            IconVariant::Normal => self.load(name)?,
            IconVariant::WashedOut => {
                let normal = self.get_or_create(name, IconVariant::Normal)?;
                transform::wash_out(normal.pixels())
            }
        };
        log::debug!("[icons] cached {name} ({variant:?})");

        let mut entries = self.lock();
        let stored = entries
            .entry((name.to_string(), variant))
            .or_insert_with(|| Arc::new(BaseImage::new(image)));
        Ok(Arc::clone(stored))
    }

    /// Cached entry, without loading.
    pub fn get(&self, name: &str, variant: IconVariant) -> Option<Arc<BaseImage>> {
        self.lock().get(&(name.to_string(), variant)).cloned()
    }

    pub fn contains(&self, name: &str, variant: IconVariant) -> bool {
        self.get(name, variant).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn load(&self, name: &str) -> Result<RgbaImage> {
        let bytes = self.source.read(name).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AudiodeckError::IconNotFound {
                name: name.to_string(),
                path: self.source.locate(name),
            },
            _ => AudiodeckError::IconLoad {
                name: name.to_string(),
                reason: e.to_string(),
            },
        })?;
        transform::decode(&bytes).map_err(|e| AudiodeckError::IconLoad {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    // Entries are only ever inserted whole, so a poisoned map is still valid.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<BaseImage>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
