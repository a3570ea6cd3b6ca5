//! `config` subcommand: show current configuration and file paths.

use audiodeck_lib::mapping::FALLBACK_ICON;

use super::{Config, ConfigOutput, Options, Result, kv, kv_indent, kv_width};

pub(super) fn cmd_config(opts: &Options) -> Result<()> {
    let config_path = opts.config.clone().or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    let mut problems = Vec::new();
    let config = match &config_path {
        Some(path) if config_exists => match Config::load_from(path) {
            Ok(c) => Some(c),
            Err(e) => {
                problems.push(e.to_string());
                None
            }
        },
        _ => None,
    };
    if let Some(Err(errors)) = config.as_ref().map(Config::validate) {
        problems.extend(errors.iter().map(|e| e.to_string()));
    }
    let icons_dir = match (&config, &config_path) {
        (Some(c), Some(p)) => Some(opts.icons_dir(c, p)),
        _ => opts.icons.clone(),
    };

    if opts.json {
        return super::print_json(&ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            icons_dir: icons_dir.as_ref().map(|p| p.display().to_string()),
            problems,
        });
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:", "Icons dir:"],
        &[
            "volume_change_cooldown_ms:",
            "mute_icon:",
            "unmute_icon:",
            "custom_images:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv("Config file:", format_args!("{} (not found)", p.display()), w),
        None => kv("Config file:", "(no config directory)", w),
    }
    match &icons_dir {
        Some(dir) => {
            let fallback = if dir.join(FALLBACK_ICON).is_file() {
                "present"
            } else {
                "MISSING"
            };
            kv(
                "Icons dir:",
                format_args!("{} ({FALLBACK_ICON} {fallback})", dir.display()),
                w,
            );
        }
        None => kv("Icons dir:", "(unknown)", w),
    }
    println!();

    if let Some(c) = &config {
        println!("Settings:");
        kv_indent("volume_change_cooldown_ms:", c.volume_change_cooldown_ms, w);
        kv_indent("mute_icon:", &c.mute_icon, w);
        kv_indent("unmute_icon:", &c.unmute_icon, w);
        kv_indent("custom_images:", c.custom_images.len(), w);
        for entry in &c.custom_images {
            println!("    {} -> {}", entry.device_name, entry.image_name);
        }
    }

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for p in &problems {
            println!("  - {p}");
        }
    }
    Ok(())
}
