//! CLI subcommands: devices, switching, mic mute, icon rendering.

mod config_cmd;
mod devices;
mod mute;
mod render;
mod switch;
mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use audiodeck_lib::AudiodeckError;
pub(super) use audiodeck_lib::audio::{self, AudioController, DeviceSnapshot};
pub(super) use audiodeck_lib::commands::{MuteObserver, MuteStateChanged};
pub(super) use audiodeck_lib::config::Config;
pub(super) use audiodeck_lib::error::Result;
pub(super) use audiodeck_lib::icons::{DirIconSource, IconResolver};
pub(super) use audiodeck_lib::plugin::AudioPlugin;

const PADDING: usize = 2;

/// Global flags shared by every subcommand.
pub struct Options {
    pub json: bool,
    pub config: Option<PathBuf>,
    pub icons: Option<PathBuf>,
}

impl Options {
    /// `--config`, or the default platform path.
    pub(super) fn config_path(&self) -> Result<PathBuf> {
        self.config
            .clone()
            .or_else(Config::path)
            .ok_or_else(|| AudiodeckError::Config("No config directory".into()))
    }

    /// `--icons`, or the directory the config points at.
    pub(super) fn icons_dir(&self, config: &Config, config_path: &Path) -> PathBuf {
        self.icons
            .clone()
            .unwrap_or_else(|| config.icons_dir_for(config_path))
    }
}

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w.saturating_sub(2));
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{text}");
    Ok(())
}

/// Open the platform audio backend.
pub(super) fn open_controller() -> Result<Arc<dyn AudioController>> {
    Ok(Arc::from(audio::platform_controller()?))
}

/// Load the config, open the audio backend and assemble the plugin.
pub(super) fn open_plugin(opts: &Options, observer: Arc<dyn MuteObserver>) -> Result<AudioPlugin> {
    let config_path = opts.config_path()?;
    let controller = open_controller()?;
    AudioPlugin::load(&config_path, opts.icons.as_deref(), controller, observer)
}

/// Icon resolver only: rendering needs no audio backend.
pub(super) fn open_resolver(opts: &Options) -> Result<IconResolver> {
    let config_path = opts.config_path()?;
    let config = Config::load_from(&config_path)?;
    config.ensure_valid()?;
    let dir = opts.icons_dir(&config, &config_path);
    log::debug!("[icons] directory: {}", dir.display());
    let resolver = IconResolver::from_config(&config, Arc::new(DirIconSource::new(dir)));
    resolver.preload()?;
    Ok(resolver)
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct DevicesOutput {
    pub count: usize,
    pub devices: Vec<DeviceSnapshot>,
}

#[derive(Serialize)]
pub(super) struct SwitchOutput {
    pub device: DeviceSnapshot,
}

#[derive(Serialize)]
pub(super) struct MuteOutput {
    pub muted: bool,
}

#[derive(Serialize)]
pub(super) struct RenderOutput {
    pub icon: String,
    pub variant: &'static str,
    pub size: u32,
    pub bytes: usize,
    pub output: Option<String>,
    pub png_base64: Option<String>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Option<Config>,
    pub icons_dir: Option<String>,
    pub problems: Vec<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List playback and capture devices
    Devices,

    /// Make a device the default for its kind
    Switch {
        /// Device name, as listed by `devices`
        device: String,
    },

    /// Toggle mute on the default communications microphone
    Mute,

    /// Render the button icon for a device
    Render {
        /// Device name; unknown devices get the fallback icon
        device: String,
        /// Render as a non-default device (washed out)
        #[arg(long)]
        inactive: bool,
        #[command(flatten)]
        out: render::RenderArgs,
    },

    /// Render the mic mute button icon
    RenderMute {
        /// Render the muted icon instead of the live one
        #[arg(long)]
        muted: bool,
        #[command(flatten)]
        out: render::RenderArgs,
    },

    /// Show current configuration and file paths
    Config,

    /// Watch the mic mute state and report changes
    Watch {
        /// Rewrite this PNG with the mute icon on every change
        #[arg(long)]
        output: Option<PathBuf>,
        /// Icon size in pixels
        #[arg(long, default_value_t = 72)]
        size: u32,
    },
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, opts: &Options) -> Result<()> {
    match cmd {
        Command::Devices => devices::cmd_devices(opts),
        Command::Switch { device } => switch::cmd_switch(opts, &device),
        Command::Mute => mute::cmd_mute(opts),
        Command::Render {
            device,
            inactive,
            out,
        } => render::cmd_render(opts, &device, !inactive, &out),
        Command::RenderMute { muted, out } => render::cmd_render_mute(opts, muted, &out),
        Command::Config => config_cmd::cmd_config(opts),
        Command::Watch { output, size } => {
            if opts.json {
                warn_json_unsupported("watch");
            }
            watch::cmd_watch(opts, output.as_deref(), size)
        }
    }
}


#[cfg(test)]
mod json_struct_tests {
    use super::*;
    use audiodeck_lib::audio::DeviceKind;

    #[test]
    fn devices_output_serializes_kind_lowercase() {
        let output = DevicesOutput {
            count: 1,
            devices: vec![DeviceSnapshot {
                id: "Speakers (Realtek)".into(),
                display_name: "Speakers".into(),
                kind: DeviceKind::Playback,
                is_default: true,
                is_muted: false,
            }],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["devices"][0]["kind"], "playback");
        assert_eq!(parsed["devices"][0]["is_default"], true);
        assert_eq!(parsed["devices"][0]["display_name"], "Speakers");
    }

    #[test]
    fn config_output_missing_settings_is_null() {
        let output = ConfigOutput {
            config_file: None,
            config_file_exists: false,
            settings: None,
            icons_dir: None,
            problems: vec!["I/O error: gone".into()],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert!(parsed["settings"].is_null());
        assert_eq!(parsed["problems"][0], "I/O error: gone");
    }

    #[test]
    fn render_output_has_expected_fields() {
        let output = RenderOutput {
            icon: "Speakers".into(),
            variant: "washed_out",
            size: 64,
            bytes: 10,
            output: None,
            png_base64: Some("AAAA".into()),
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 6);
        assert_eq!(json["variant"], "washed_out");
    }
}

#[cfg(test)]
mod option_tests {
    use super::*;

    fn config() -> Config {
        Config::from_toml_str(
            "volume_change_cooldown_ms = 1\nmute_icon = \"m.png\"\nunmute_icon = \"u.png\"",
        )
        .unwrap()
    }

    #[test]
    fn explicit_config_path_wins() {
        let opts = Options {
            json: false,
            config: Some(PathBuf::from("/tmp/a.toml")),
            icons: None,
        };
        assert_eq!(opts.config_path().unwrap(), PathBuf::from("/tmp/a.toml"));
    }

    #[test]
    fn icons_flag_overrides_config() {
        let opts = Options {
            json: false,
            config: None,
            icons: Some(PathBuf::from("/opt/icons")),
        };
        assert_eq!(
            opts.icons_dir(&config(), Path::new("/etc/audiodeck/config.toml")),
            PathBuf::from("/opt/icons")
        );
    }

    #[test]
    fn icons_default_next_to_config() {
        let opts = Options {
            json: false,
            config: None,
            icons: None,
        };
        assert_eq!(
            opts.icons_dir(&config(), Path::new("/etc/audiodeck/config.toml")),
            PathBuf::from("/etc/audiodeck/images")
        );
    }
}
