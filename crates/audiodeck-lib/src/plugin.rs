//! Plugin assembly: configuration in, ready-to-use commands out.
//!
//! Everything the commands need is built here once and handed down by
//! reference or `Arc`; there is no global instance.

use std::path::Path;
use std::sync::Arc;

use crate::audio::AudioController;
use crate::commands::{ChangeAudioDeviceCommand, MuteDefaultMicCommand, MuteObserver};
use crate::config::Config;
use crate::error::Result;
use crate::icons::{DirIconSource, IconResolver, IconSource};

pub struct AudioPlugin {
    config: Config,
    resolver: Arc<IconResolver>,
    change_device: ChangeAudioDeviceCommand,
    mute_mic: MuteDefaultMicCommand,
}

impl AudioPlugin {
    /// Build the plugin with icons read from `icons_dir`.
    pub fn new(
        config: Config,
        icons_dir: &Path,
        controller: Arc<dyn AudioController>,
        observer: Arc<dyn MuteObserver>,
    ) -> Result<Self> {
        log::debug!("[plugin] icons directory: {}", icons_dir.display());
        let source = Arc::new(DirIconSource::new(icons_dir));
        Self::with_source(config, source, controller, observer)
    }

    /// Build the plugin on top of any icon source.
    ///
    /// Fails if the configuration is invalid, the fallback icon is unusable,
    /// or the audio layer cannot enumerate devices.
    pub fn with_source(
        config: Config,
        source: Arc<dyn IconSource>,
        controller: Arc<dyn AudioController>,
        observer: Arc<dyn MuteObserver>,
    ) -> Result<Self> {
        config.ensure_valid()?;

        let resolver = Arc::new(IconResolver::from_config(&config, source));
        resolver.preload()?;

        let change_device = ChangeAudioDeviceCommand::new(controller.clone(), resolver.clone())
            .inspect_err(|e| log::error!("[plugin] cannot enumerate devices: {e}"))?;
        let mute_mic =
            MuteDefaultMicCommand::new(controller, resolver.clone(), observer, config.cooldown());

        log::info!(
            "[plugin] ready: {} device parameter(s), {} icon override(s)",
            change_device.parameters().len(),
            resolver.mapping().len()
        );

        Ok(AudioPlugin {
            config,
            resolver,
            change_device,
            mute_mic,
        })
    }

    /// Read the config file at `config_path` and build the plugin.
    ///
    /// `icons_dir` overrides the directory derived from the config.
    pub fn load(
        config_path: &Path,
        icons_dir: Option<&Path>,
        controller: Arc<dyn AudioController>,
        observer: Arc<dyn MuteObserver>,
    ) -> Result<Self> {
        let config = Config::load_from(config_path)
            .inspect_err(|e| log::error!("[config] {}: {e}", config_path.display()))?;
        let dir = match icons_dir {
            Some(dir) => dir.to_path_buf(),
            None => config.icons_dir_for(config_path),
        };
        Self::new(config, &dir, controller, observer)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<IconResolver> {
        &self.resolver
    }

    pub fn change_device(&self) -> &ChangeAudioDeviceCommand {
        &self.change_device
    }

    pub fn mute_mic(&self) -> &MuteDefaultMicCommand {
        &self.mute_mic
    }
}
