//! Control-surface command handlers.
//!
//! [`ChangeAudioDeviceCommand`] switches the default playback/capture device;
//! [`MuteDefaultMicCommand`] toggles mute on the default communications mic
//! and tells a [`MuteObserver`] about it. Both draw their button icons through
//! a shared [`IconResolver`].

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;

use crate::audio::{AudioController, DeviceKind, DeviceSnapshot, Role};
use crate::error::{AudiodeckError, Result};
use crate::icons::IconResolver;
use crate::refresh::RefreshThrottle;

pub const PLAYBACK_GROUP: &str = "Set Playback Device";
pub const RECORDING_GROUP: &str = "Set Recording Device";

/// One selectable action parameter registered with the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandParameter {
    pub name: String,
    pub display_name: String,
    pub group: &'static str,
}

// ── Device switch ──

pub struct ChangeAudioDeviceCommand {
    controller: Arc<dyn AudioController>,
    resolver: Arc<IconResolver>,
    parameters: Vec<CommandParameter>,
}

impl ChangeAudioDeviceCommand {
    /// Enumerate devices once to build the parameter list: playback devices
    /// first, then capture devices.
    pub fn new(controller: Arc<dyn AudioController>, resolver: Arc<IconResolver>) -> Result<Self> {
        let devices = controller.devices()?;
        let parameters = [DeviceKind::Playback, DeviceKind::Capture]
            .into_iter()
            .flat_map(|kind| {
                devices
                    .iter()
                    .filter(move |d| d.kind == kind)
                    .map(move |d| CommandParameter {
                        name: d.id.clone(),
                        display_name: d.display_name.clone(),
                        group: match kind {
                            DeviceKind::Playback => PLAYBACK_GROUP,
                            DeviceKind::Capture => RECORDING_GROUP,
                        },
                    })
            })
            .collect();
        Ok(ChangeAudioDeviceCommand {
            controller,
            resolver,
            parameters,
        })
    }

    pub fn parameters(&self) -> &[CommandParameter] {
        &self.parameters
    }

    /// Make `device_id` the default device.
    ///
    /// Fails with [`AudiodeckError::DeviceNotFound`] when the device is not
    /// in the current enumeration.
    pub fn switch_to(&self, device_id: &str) -> Result<DeviceSnapshot> {
        let device = self
            .controller
            .devices()?
            .into_iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| AudiodeckError::DeviceNotFound(device_id.to_string()))?;
        self.controller.set_default(&device.id)?;
        log::info!("[switch] {} is now the default {} device", device.id, device.kind);
        Ok(device)
    }

    /// Host entry point: like [`switch_to`](Self::switch_to), but a device
    /// that has disappeared is silently ignored.
    pub fn run(&self, device_id: &str) -> Result<()> {
        match self.switch_to(device_id) {
            Ok(_) => Ok(()),
            Err(AudiodeckError::DeviceNotFound(id)) => {
                log::debug!("[switch] ignoring unknown device {id}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Button image for `device_id`: full color when it is the current
    /// default, washed out otherwise.
    pub fn image(&self, device_id: &str, size: u32) -> Vec<u8> {
        let is_default = match self.controller.devices() {
            Ok(devices) => devices.iter().any(|d| d.id == device_id && d.is_default),
            Err(e) => {
                log::warn!("[switch] cannot enumerate devices: {e}");
                false
            }
        };
        self.resolver.render_icon(device_id, is_default, size)
    }
}

// ── Mic mute ──

/// Emitted after the mic mute state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuteStateChanged {
    pub muted: bool,
}

/// Receives mute state change notifications so rendered icons can refresh.
pub trait MuteObserver: Send + Sync {
    fn mute_state_changed(&self, event: MuteStateChanged);
}

impl MuteObserver for Sender<MuteStateChanged> {
    fn mute_state_changed(&self, event: MuteStateChanged) {
        // A dropped receiver means nobody is drawing icons any more.
        let _ = self.send(event);
    }
}

pub struct MuteDefaultMicCommand {
    controller: Arc<dyn AudioController>,
    resolver: Arc<IconResolver>,
    observer: Arc<dyn MuteObserver>,
    throttle: Mutex<RefreshThrottle>,
}

impl MuteDefaultMicCommand {
    pub const NAME: &'static str = "Mute Default Mic";
    pub const DESCRIPTION: &'static str = "Toggles mute on the default communication device";

    pub fn new(
        controller: Arc<dyn AudioController>,
        resolver: Arc<IconResolver>,
        observer: Arc<dyn MuteObserver>,
        cooldown: std::time::Duration,
    ) -> Self {
        let initial = match default_mic(controller.as_ref()) {
            Ok(mic) => Some(mic.is_muted),
            Err(e) => {
                log::debug!("[mute] initial state unknown: {e}");
                None
            }
        };
        MuteDefaultMicCommand {
            controller,
            resolver,
            observer,
            throttle: Mutex::new(RefreshThrottle::new(cooldown, initial)),
        }
    }

    /// Whether the default communications mic is muted.
    pub fn is_muted(&self) -> Result<bool> {
        Ok(default_mic(self.controller.as_ref())?.is_muted)
    }

    /// Invert the mic's mute flag and notify the observer once.
    /// Returns the new state.
    pub fn toggle(&self) -> Result<bool> {
        let mic = default_mic(self.controller.as_ref())?;
        let muted = !mic.is_muted;
        self.controller.set_muted(&mic.id, muted)?;
        log::info!(
            "[mute] {} {}",
            mic.id,
            if muted { "muted" } else { "unmuted" }
        );

        self.throttle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .force_state(muted, Instant::now());
        self.observer.mute_state_changed(MuteStateChanged { muted });
        Ok(muted)
    }

    /// Host entry point: like [`toggle`](Self::toggle), but a missing
    /// default mic is silently ignored.
    pub fn run(&self) -> Result<()> {
        match self.toggle() {
            Ok(_) => Ok(()),
            Err(AudiodeckError::DeviceNotFound(what)) => {
                log::debug!("[mute] ignoring toggle: no {what}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Periodic refresh tick. Picks up mute changes made outside this
    /// command, at most once per cooldown, and notifies the observer.
    pub fn poll(&self, now: Instant) -> Result<Option<bool>> {
        let muted = self.is_muted()?;
        let changed = self
            .throttle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(muted, now);
        if let Some(muted) = changed {
            self.observer.mute_state_changed(MuteStateChanged { muted });
        }
        Ok(changed)
    }

    /// Button image for the current mute state.
    pub fn image(&self, size: u32) -> Vec<u8> {
        let muted = self.is_muted().unwrap_or_else(|e| {
            log::warn!("[mute] cannot read mute state: {e}");
            false
        });
        self.resolver.render_mute_icon(muted, size)
    }
}

fn default_mic(controller: &dyn AudioController) -> Result<DeviceSnapshot> {
    controller
        .default_device(DeviceKind::Capture, Role::Communications)?
        .ok_or_else(|| {
            AudiodeckError::DeviceNotFound("default communications capture device".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::stub::StubController;
    use crate::icons::source::stub::MemoryIconSource;
    use crate::icons::transform;
    use crate::mapping::{DeviceIconMapping, FALLBACK_ICON};
    use image::{Rgba, RgbaImage};
    use std::sync::mpsc;
    use std::time::Duration;

    fn png(px: [u8; 4]) -> Vec<u8> {
        transform::encode_png(&RgbaImage::from_pixel(8, 8, Rgba(px))).unwrap()
    }

    fn resolver() -> Arc<IconResolver> {
        let source = Arc::new(MemoryIconSource::new());
        source.insert(FALLBACK_ICON, png([255, 255, 255, 255]));
        source.insert("mute.png", png([255, 0, 0, 255]));
        source.insert("unmute.png", png([0, 255, 0, 255]));
        Arc::new(IconResolver::new(
            DeviceIconMapping::default(),
            "mute.png",
            "unmute.png",
            source,
        ))
    }

    fn controller() -> Arc<StubController> {
        Arc::new(StubController::new(vec![
            StubController::device("Desk Mic", DeviceKind::Capture, true),
            StubController::device("Speakers", DeviceKind::Playback, true),
            StubController::device("Headphones", DeviceKind::Playback, false),
        ]))
    }

    fn mute_command(
        controller: Arc<StubController>,
        cooldown: Duration,
    ) -> (MuteDefaultMicCommand, mpsc::Receiver<MuteStateChanged>) {
        let (tx, rx) = mpsc::channel();
        let cmd = MuteDefaultMicCommand::new(controller, resolver(), Arc::new(tx), cooldown);
        (cmd, rx)
    }

    // ── ChangeAudioDeviceCommand ──

    #[test]
    fn parameters_list_playback_then_capture() {
        let cmd = ChangeAudioDeviceCommand::new(controller(), resolver()).unwrap();
        let groups: Vec<_> = cmd
            .parameters()
            .iter()
            .map(|p| (p.name.as_str(), p.group))
            .collect();
        assert_eq!(
            groups,
            vec![
                ("Speakers", PLAYBACK_GROUP),
                ("Headphones", PLAYBACK_GROUP),
                ("Desk Mic", RECORDING_GROUP),
            ]
        );
    }

    #[test]
    fn run_sets_default() {
        let c = controller();
        let cmd = ChangeAudioDeviceCommand::new(c.clone(), resolver()).unwrap();
        cmd.run("Headphones").unwrap();
        assert_eq!(c.set_default_calls(), vec!["Headphones".to_string()]);
    }

    #[test]
    fn run_unknown_device_is_noop() {
        let c = controller();
        let cmd = ChangeAudioDeviceCommand::new(c.clone(), resolver()).unwrap();
        cmd.run("Gone").unwrap();
        assert!(c.set_default_calls().is_empty());
    }

    #[test]
    fn run_unplugged_device_is_noop() {
        let c = controller();
        let cmd = ChangeAudioDeviceCommand::new(c.clone(), resolver()).unwrap();
        c.unplug("Headphones");
        cmd.run("Headphones").unwrap();
        assert!(c.set_default_calls().is_empty());
    }

    #[test]
    fn switch_to_unknown_reports_device_not_found() {
        let cmd = ChangeAudioDeviceCommand::new(controller(), resolver()).unwrap();
        let err = cmd.switch_to("Gone").unwrap_err();
        assert!(matches!(err, AudiodeckError::DeviceNotFound(ref id) if id == "Gone"));
    }

    #[test]
    fn parameters_use_device_display_name() {
        let c = Arc::new(StubController::new(vec![StubController::named(
            "alsa_output.pci-0000_00_1f.3.analog-stereo",
            "Built-in Audio",
            DeviceKind::Playback,
            true,
        )]));
        let cmd = ChangeAudioDeviceCommand::new(c, resolver()).unwrap();
        let p = &cmd.parameters()[0];
        assert_eq!(p.name, "alsa_output.pci-0000_00_1f.3.analog-stereo");
        assert_eq!(p.display_name, "Built-in Audio");
    }

    #[test]
    fn rejected_switch_is_reported() {
        let c = controller();
        let cmd = ChangeAudioDeviceCommand::new(c.clone(), resolver()).unwrap();
        c.reject_operations(true);
        assert!(matches!(
            cmd.switch_to("Headphones"),
            Err(AudiodeckError::Audio(_))
        ));
        assert!(cmd.run("Headphones").is_err());
    }

    #[test]
    fn image_washes_out_non_default() {
        let cmd = ChangeAudioDeviceCommand::new(controller(), resolver()).unwrap();
        let active = transform::decode(&cmd.image("Speakers", 8)).unwrap();
        let inactive = transform::decode(&cmd.image("Headphones", 8)).unwrap();
        assert_eq!(*active.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*inactive.get_pixel(0, 0), Rgba([51, 51, 51, 255]));
    }

    // ── MuteDefaultMicCommand ──

    #[test]
    fn toggle_flips_state_and_notifies_once() {
        let c = controller();
        let (cmd, rx) = mute_command(c, Duration::ZERO);
        assert!(!cmd.is_muted().unwrap());

        cmd.run().unwrap();
        assert!(cmd.is_muted().unwrap());
        assert_eq!(rx.try_recv(), Ok(MuteStateChanged { muted: true }));
        assert!(rx.try_recv().is_err());

        cmd.run().unwrap();
        assert!(!cmd.is_muted().unwrap());
        assert_eq!(rx.try_recv(), Ok(MuteStateChanged { muted: false }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn toggle_targets_communications_device() {
        let c = controller();
        c.set_communications_capture("Desk Mic");
        let (cmd, _rx) = mute_command(c.clone(), Duration::ZERO);
        assert!(cmd.toggle().unwrap());
        let mic = c
            .devices()
            .unwrap()
            .into_iter()
            .find(|d| d.id == "Desk Mic")
            .unwrap();
        assert!(mic.is_muted);
    }

    #[test]
    fn no_default_mic_is_noop() {
        let c = controller();
        c.unplug("Desk Mic");
        let (cmd, rx) = mute_command(c, Duration::ZERO);
        cmd.run().unwrap();
        assert!(rx.try_recv().is_err());
        assert!(matches!(
            cmd.toggle(),
            Err(AudiodeckError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn rejected_mute_does_not_notify() {
        let c = controller();
        let (cmd, rx) = mute_command(c.clone(), Duration::ZERO);
        c.reject_operations(true);
        assert!(matches!(cmd.toggle(), Err(AudiodeckError::Audio(_))));
        assert!(cmd.run().is_err());
        assert!(rx.try_recv().is_err());
        assert!(!cmd.is_muted().unwrap());
    }

    #[test]
    fn poll_reports_external_change() {
        let c = controller();
        let (cmd, rx) = mute_command(c.clone(), Duration::from_millis(500));
        let t0 = Instant::now();
        assert_eq!(cmd.poll(t0).unwrap(), None);

        c.set_muted_externally("Desk Mic", true);
        assert_eq!(cmd.poll(t0).unwrap(), Some(true));
        assert_eq!(rx.try_recv(), Ok(MuteStateChanged { muted: true }));
    }

    #[test]
    fn poll_does_not_echo_own_toggle() {
        let c = controller();
        let (cmd, rx) = mute_command(c, Duration::from_millis(500));
        cmd.toggle().unwrap();
        let _ = rx.try_recv();
        assert_eq!(cmd.poll(Instant::now() + Duration::from_secs(1)).unwrap(), None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn mute_image_follows_state() {
        let c = controller();
        let (cmd, _rx) = mute_command(c, Duration::ZERO);
        let live = transform::decode(&cmd.image(10)).unwrap();
        assert_eq!(live.dimensions(), (7, 7));
        cmd.toggle().unwrap();
        let muted = transform::decode(&cmd.image(10)).unwrap();
        assert_ne!(live, muted);
    }

    #[test]
    fn sender_observer_ignores_dropped_receiver() {
        let (tx, rx) = mpsc::channel::<MuteStateChanged>();
        drop(rx);
        tx.mute_state_changed(MuteStateChanged { muted: true });
    }
}
