//! `watch` subcommand: report mic mute changes until Ctrl+C.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use audiodeck_lib::icons::check_size;

use super::{MuteStateChanged, Options, RUNNING, Result, open_plugin};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub(super) fn cmd_watch(opts: &Options, output: Option<&Path>, size: u32) -> Result<()> {
    check_size(size)?;
    let (tx, rx) = std::sync::mpsc::channel::<MuteStateChanged>();
    let plugin = open_plugin(opts, Arc::new(tx))?;
    let mic = plugin.mute_mic();

    println!(
        "Watching default communications mic (cooldown {} ms). Ctrl+C to stop.",
        plugin.config().volume_change_cooldown_ms
    );
    match mic.is_muted() {
        Ok(muted) => {
            println!("  {} (initial)", label(muted));
            write_icon(output, &mic.image(size));
        }
        Err(e) => log::warn!("[watch] {e}"),
    }

    while RUNNING.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);
        if let Err(e) = mic.poll(Instant::now()) {
            log::debug!("[watch] poll failed: {e}");
            continue;
        }
        for event in rx.try_iter() {
            println!("  {}", label(event.muted));
            write_icon(output, &mic.image(size));
        }
    }

    println!();
    println!("Done.");
    Ok(())
}

fn label(muted: bool) -> &'static str {
    if muted { "MUTED" } else { "LIVE" }
}

fn write_icon(output: Option<&Path>, png: &[u8]) {
    if let Some(path) = output
        && let Err(e) = std::fs::write(path, png)
    {
        log::warn!("[watch] cannot write {}: {e}", path.display());
    }
}
