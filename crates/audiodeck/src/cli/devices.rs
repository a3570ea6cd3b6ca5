//! `devices` subcommand: list playback and capture devices.

use super::{DevicesOutput, Options, Result, open_controller};
use audiodeck_lib::audio::DeviceKind;

pub(super) fn cmd_devices(opts: &Options) -> Result<()> {
    let devices = open_controller()?.devices()?;

    if opts.json {
        return super::print_json(&DevicesOutput {
            count: devices.len(),
            devices,
        });
    }

    if devices.is_empty() {
        println!("No audio devices found.");
        return Ok(());
    }

    for (kind, title) in [
        (DeviceKind::Playback, "Playback devices:"),
        (DeviceKind::Capture, "Recording devices:"),
    ] {
        println!("{title}");
        for dev in devices.iter().filter(|d| d.kind == kind) {
            let marker = if dev.is_default { "*" } else { " " };
            let muted = if dev.is_muted { "  [muted]" } else { "" };
            if dev.display_name == dev.id {
                println!("  {marker} {}{muted}", dev.id);
            } else {
                println!("  {marker} {} ({}){muted}", dev.id, dev.display_name);
            }
        }
        println!();
    }
    println!("* = default device");

    Ok(())
}
