//! `render` / `render-mute` subcommands: draw button icons to a file or stdout.

use std::io::Write;
use std::path::PathBuf;

use base64::Engine;
use clap::Args;

use super::{AudiodeckError, Options, RenderOutput, Result, open_resolver};
use audiodeck_lib::icons::check_size;
use audiodeck_lib::mapping::FALLBACK_ICON;

#[derive(Args)]
pub struct RenderArgs {
    /// Button size in pixels
    #[arg(long, default_value_t = 72)]
    pub size: u32,
    /// Write the PNG to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Print the PNG as base64
    #[arg(long)]
    pub base64: bool,
}

pub(super) fn cmd_render(opts: &Options, device: &str, is_default: bool, out: &RenderArgs) -> Result<()> {
    check_size(out.size)?;
    let resolver = open_resolver(opts)?;
    let png = resolver.render_icon(device, is_default, out.size);
    let variant = if is_default { "normal" } else { "washed_out" };
    emit(opts, device, variant, out, png)
}

pub(super) fn cmd_render_mute(opts: &Options, muted: bool, out: &RenderArgs) -> Result<()> {
    check_size(out.size)?;
    let resolver = open_resolver(opts)?;
    let png = resolver.render_mute_icon(muted, out.size);
    let label = if muted { "mute" } else { "unmute" };
    emit(opts, label, "normal", out, png)
}

fn emit(
    opts: &Options,
    label: &str,
    variant: &'static str,
    out: &RenderArgs,
    png: Vec<u8>,
) -> Result<()> {
    if png.is_empty() {
        return Err(AudiodeckError::IconLoad {
            name: FALLBACK_ICON.to_string(),
            reason: "fallback icon could not be rendered".into(),
        });
    }

    if let Some(path) = &out.output {
        std::fs::write(path, &png)?;
    }
    let encoded = out
        .base64
        .then(|| base64::engine::general_purpose::STANDARD.encode(&png));

    if opts.json {
        return super::print_json(&RenderOutput {
            icon: label.to_string(),
            variant,
            size: out.size,
            bytes: png.len(),
            output: out.output.as_ref().map(|p| p.display().to_string()),
            png_base64: encoded,
        });
    }

    if let Some(path) = &out.output {
        println!(
            "Wrote {label} icon ({variant}, {}px, {} bytes) to {}",
            out.size,
            png.len(),
            path.display()
        );
    }
    if let Some(text) = encoded {
        println!("{text}");
    } else if out.output.is_none() {
        // Raw PNG for shell redirection.
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&png)?;
        stdout.flush()?;
    }
    Ok(())
}
