//! `switch` subcommand: make a device the default for its kind.

use std::sync::Arc;

use super::{MuteStateChanged, Options, Result, SwitchOutput, open_plugin};

pub(super) fn cmd_switch(opts: &Options, device_id: &str) -> Result<()> {
    // Switching never changes mute state; nobody listens.
    let (tx, _rx) = std::sync::mpsc::channel::<MuteStateChanged>();
    let plugin = open_plugin(opts, Arc::new(tx))?;
    let device = plugin.change_device().switch_to(device_id)?;

    if opts.json {
        return super::print_json(&SwitchOutput { device });
    }
    println!("Default {} device: {}", device.kind, device.id);
    Ok(())
}
