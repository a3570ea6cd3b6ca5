//! `mute` subcommand: toggle mute on the default communications mic.

use std::sync::Arc;

use super::{MuteOutput, MuteStateChanged, Options, Result, open_plugin};

pub(super) fn cmd_mute(opts: &Options) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel::<MuteStateChanged>();
    let plugin = open_plugin(opts, Arc::new(tx))?;
    let muted = plugin.mute_mic().toggle()?;

    for event in rx.try_iter() {
        log::debug!("[mute] state changed: muted={}", event.muted);
    }

    if opts.json {
        return super::print_json(&MuteOutput { muted });
    }
    println!("Microphone: {}", if muted { "MUTED" } else { "LIVE" });
    Ok(())
}
