//! OS audio collaborator: trait + Linux PulseAudio backend.
//!
//! The plugin only needs four things from the audio layer: enumerate
//! devices, make one the default, find the default for a role, and set mute.

use std::fmt;

use serde::Serialize;

#[derive(Debug)]
pub enum AudioError {
    InitFailed(String),
    OperationFailed(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::InitFailed(e) => write!(f, "Audio init failed: {e}"),
            AudioError::OperationFailed(e) => write!(f, "Audio operation failed: {e}"),
        }
    }
}

impl std::error::Error for AudioError {}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Playback (render) or capture (recording) endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Playback,
    Capture,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Playback => write!(f, "playback"),
            DeviceKind::Capture => write!(f, "capture"),
        }
    }
}

/// Functional role a default device is assigned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Console,
    Multimedia,
    Communications,
}

/// One audio endpoint as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSnapshot {
    /// Stable full name; also the key used in `custom_images`.
    pub id: String,
    /// Short human-readable name for button labels.
    pub display_name: String,
    pub kind: DeviceKind,
    pub is_default: bool,
    pub is_muted: bool,
}

/// Synchronous access to the OS audio layer.
pub trait AudioController: Send + Sync {
    /// All active playback and capture devices.
    fn devices(&self) -> Result<Vec<DeviceSnapshot>>;

    /// Make `id` the default device for its kind.
    fn set_default(&self, id: &str) -> Result<()>;

    fn set_muted(&self, id: &str, muted: bool) -> Result<()>;

    /// Current default device for `kind` and `role`.
    ///
    /// The default ignores `role`; backends with per-role defaults override it.
    fn default_device(&self, kind: DeviceKind, role: Role) -> Result<Option<DeviceSnapshot>> {
        let _ = role;
        Ok(self
            .devices()?
            .into_iter()
            .find(|d| d.kind == kind && d.is_default))
    }
}

/// Open the audio backend for this platform.
pub fn platform_controller() -> Result<Box<dyn AudioController>> {
    #[cfg(target_os = "linux")]
    {
        let controller = PulseAudioController::new()?;
        Ok(Box::new(controller))
    }

    #[cfg(not(target_os = "linux"))]
    {
        Err(AudioError::InitFailed(
            "Audio device control is not yet supported on this platform.".into(),
        ))
    }
}

// ── Linux PulseAudio implementation ──

#[cfg(target_os = "linux")]
mod pulse {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use libpulse_binding::callbacks::ListResult;
    use libpulse_binding::context::{Context, FlagSet as ContextFlagSet, State as ContextState};
    use libpulse_binding::mainloop::threaded::Mainloop;
    use libpulse_binding::operation::{Operation, State as OperationState};

    /// Upper bound for a single introspection or control round-trip.
    const OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

    /// Property holding the hardware product name, when the driver sets one.
    const PRODUCT_NAME_PROP: &str = "device.product.name";

    struct PulseInner {
        mainloop: Mainloop,
        context: Context,
    }

    /// A device as PulseAudio knows it: internal name plus the public snapshot.
    struct PulseDevice {
        pa_name: String,
        snapshot: DeviceSnapshot,
    }

    pub struct PulseAudioController {
        inner: Mutex<PulseInner>,
    }

    // PulseAudio threaded mainloop is designed for concurrent access.
    // The Mutex<PulseInner> ensures safe mutable access from &self methods.
    unsafe impl Send for PulseAudioController {}
    unsafe impl Sync for PulseAudioController {}

    impl PulseAudioController {
        /// Connect to the default PulseAudio/PipeWire server.
        pub fn new() -> Result<Self> {
            let mut mainloop = Mainloop::new().ok_or_else(|| {
                AudioError::InitFailed("PulseAudio mainloop creation failed".into())
            })?;

            let mut context = Context::new(&mainloop, "audiodeck").ok_or_else(|| {
                AudioError::InitFailed("PulseAudio context creation failed".into())
            })?;

            context
                .connect(None, ContextFlagSet::NOFLAGS, None)
                .map_err(|e| AudioError::InitFailed(format!("PulseAudio connect: {e}")))?;

            mainloop
                .start()
                .map_err(|e| AudioError::InitFailed(format!("PulseAudio mainloop start: {e}")))?;

            // Wait for context to be ready
            loop {
                mainloop.lock();
                let state = context.get_state();
                mainloop.unlock();
                match state {
                    ContextState::Ready => break,
                    ContextState::Failed | ContextState::Terminated => {
                        return Err(AudioError::InitFailed(
                            "PulseAudio context connection failed".into(),
                        ));
                    }
                    _ => {
                        std::thread::sleep(Duration::from_millis(10));
                    }
                }
            }

            Ok(PulseAudioController {
                inner: Mutex::new(PulseInner { mainloop, context }),
            })
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, PulseInner>> {
            self.inner
                .lock()
                .map_err(|e| AudioError::OperationFailed(format!("PulseAudio mutex poisoned: {e}")))
        }

        fn list(&self) -> Result<Vec<PulseDevice>> {
            let mut inner = self.lock()?;

            let defaults: Arc<Mutex<(Option<String>, Option<String>)>> =
                Arc::new(Mutex::new((None, None)));
            let found: Arc<Mutex<Vec<PulseDevice>>> = Arc::new(Mutex::new(Vec::new()));

            inner.mainloop.lock();
            let introspect = inner.context.introspect();

            let defaults_cb = Arc::clone(&defaults);
            let server_op = introspect.get_server_info(move |info| {
                if let Ok(mut d) = defaults_cb.lock() {
                    d.0 = info.default_sink_name.as_ref().map(|s| s.to_string());
                    d.1 = info.default_source_name.as_ref().map(|s| s.to_string());
                }
            });

            let sinks_cb = Arc::clone(&found);
            let sink_op = introspect.get_sink_info_list(move |result| {
                if let ListResult::Item(info) = result
                    && let Some(name) = info.name.as_ref()
                    && let Ok(mut devices) = sinks_cb.lock()
                {
                    devices.push(PulseDevice {
                        pa_name: name.to_string(),
                        snapshot: snapshot(
                            display_id(info.description.as_deref(), name),
                            info.proplist.get_str(PRODUCT_NAME_PROP),
                            DeviceKind::Playback,
                            info.mute,
                        ),
                    });
                }
            });

            let sources_cb = Arc::clone(&found);
            let source_op = introspect.get_source_info_list(move |result| {
                // Monitor sources mirror a sink's output; they are not microphones.
                if let ListResult::Item(info) = result
                    && info.monitor_of_sink.is_none()
                    && let Some(name) = info.name.as_ref()
                    && let Ok(mut devices) = sources_cb.lock()
                {
                    devices.push(PulseDevice {
                        pa_name: name.to_string(),
                        snapshot: snapshot(
                            display_id(info.description.as_deref(), name),
                            info.proplist.get_str(PRODUCT_NAME_PROP),
                            DeviceKind::Capture,
                            info.mute,
                        ),
                    });
                }
            });
            inner.mainloop.unlock();

            wait_for(&mut inner, server_op)?;
            wait_for(&mut inner, sink_op)?;
            wait_for(&mut inner, source_op)?;

            let (default_sink, default_source) = defaults
                .lock()
                .map(|d| d.clone())
                .map_err(|e| AudioError::OperationFailed(format!("defaults poisoned: {e}")))?;
            let mut devices = std::mem::take(
                &mut *found
                    .lock()
                    .map_err(|e| AudioError::OperationFailed(format!("device list poisoned: {e}")))?,
            );
            for dev in &mut devices {
                let default = match dev.snapshot.kind {
                    DeviceKind::Playback => default_sink.as_deref(),
                    DeviceKind::Capture => default_source.as_deref(),
                };
                dev.snapshot.is_default = default == Some(dev.pa_name.as_str());
            }
            Ok(devices)
        }

        fn find(&self, id: &str) -> Result<PulseDevice> {
            self.list()?
                .into_iter()
                .find(|d| d.snapshot.id == id)
                .ok_or_else(|| AudioError::OperationFailed(format!("no such device: {id}")))
        }
    }

    impl AudioController for PulseAudioController {
        fn devices(&self) -> Result<Vec<DeviceSnapshot>> {
            Ok(self.list()?.into_iter().map(|d| d.snapshot).collect())
        }

        fn set_default(&self, id: &str) -> Result<()> {
            let dev = self.find(id)?;
            let mut inner = self.lock()?;
            let success = Arc::new(AtomicBool::new(false));
            let success_cb = Arc::clone(&success);
            let on_done = move |ok: bool| success_cb.store(ok, Ordering::SeqCst);
            inner.mainloop.lock();
            let op = match dev.snapshot.kind {
                DeviceKind::Playback => inner.context.set_default_sink(&dev.pa_name, on_done),
                DeviceKind::Capture => inner.context.set_default_source(&dev.pa_name, on_done),
            };
            inner.mainloop.unlock();
            wait_for(&mut inner, op)?;
            confirm(&success, "set default device", id)
        }

        fn set_muted(&self, id: &str, muted: bool) -> Result<()> {
            let dev = self.find(id)?;
            let mut inner = self.lock()?;
            let success = Arc::new(AtomicBool::new(false));
            let success_cb = Arc::clone(&success);
            let on_done: Box<dyn FnMut(bool) + 'static> =
                Box::new(move |ok| success_cb.store(ok, Ordering::SeqCst));
            inner.mainloop.lock();
            let mut introspect = inner.context.introspect();
            let op = match dev.snapshot.kind {
                DeviceKind::Playback => {
                    introspect.set_sink_mute_by_name(&dev.pa_name, muted, Some(on_done))
                }
                DeviceKind::Capture => {
                    introspect.set_source_mute_by_name(&dev.pa_name, muted, Some(on_done))
                }
            };
            inner.mainloop.unlock();
            wait_for(&mut inner, op)?;
            confirm(&success, "set mute", id)
        }
    }

    impl Drop for PulseAudioController {
        fn drop(&mut self) {
            if let Ok(mut inner) = self.inner.lock() {
                inner.mainloop.lock();
                inner.context.disconnect();
                inner.mainloop.unlock();
                inner.mainloop.stop();
            }
        }
    }

    /// Poll an operation until PulseAudio reports it finished.
    fn wait_for<T: ?Sized>(inner: &mut PulseInner, mut op: Operation<T>) -> Result<()> {
        let deadline = Instant::now() + OPERATION_TIMEOUT;
        loop {
            inner.mainloop.lock();
            let state = op.get_state();
            inner.mainloop.unlock();
            match state {
                OperationState::Done => break,
                OperationState::Cancelled => {
                    return Err(AudioError::OperationFailed(
                        "PulseAudio operation cancelled".into(),
                    ));
                }
                OperationState::Running => {}
            }
            if Instant::now() >= deadline {
                inner.mainloop.lock();
                op.cancel();
                inner.mainloop.unlock();
                return Err(AudioError::OperationFailed(
                    "PulseAudio operation timed out".into(),
                ));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        inner.mainloop.lock();
        drop(op);
        inner.mainloop.unlock();
        Ok(())
    }

    /// Turn the success flag reported by an operation callback into a result.
    /// The flag stays `false` if the server rejected the request.
    fn confirm(success: &AtomicBool, what: &str, id: &str) -> Result<()> {
        if success.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AudioError::OperationFailed(format!(
                "PulseAudio rejected {what} for {id}"
            )))
        }
    }

    fn snapshot(
        id: String,
        product_name: Option<String>,
        kind: DeviceKind,
        is_muted: bool,
    ) -> DeviceSnapshot {
        let display_name = product_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| id.clone());
        DeviceSnapshot {
            id,
            display_name,
            kind,
            is_default: false,
            is_muted,
        }
    }

    fn display_id(description: Option<&str>, name: &str) -> String {
        description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(name)
            .to_string()
    }

}

#[cfg(target_os = "linux")]
pub use pulse::PulseAudioController;

// ── Test stub ──

/// Scriptable [`AudioController`] for unit and integration tests.
pub mod stub {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub struct StubController {
        devices: Mutex<Vec<DeviceSnapshot>>,
        communications_capture: Mutex<Option<String>>,
        set_default_calls: Mutex<Vec<String>>,
        reject_operations: AtomicBool,
    }

    impl StubController {
        pub fn new(devices: Vec<DeviceSnapshot>) -> Self {
            StubController {
                devices: Mutex::new(devices),
                ..Default::default()
            }
        }

        /// Convenience constructor for a device snapshot.
        pub fn device(id: &str, kind: DeviceKind, is_default: bool) -> DeviceSnapshot {
            Self::named(id, id, kind, is_default)
        }

        /// Like [`device`](Self::device), with a label distinct from the id.
        pub fn named(
            id: &str,
            display_name: &str,
            kind: DeviceKind,
            is_default: bool,
        ) -> DeviceSnapshot {
            DeviceSnapshot {
                id: id.to_string(),
                display_name: display_name.to_string(),
                kind,
                is_default,
                is_muted: false,
            }
        }

        /// Make `set_default` and `set_muted` fail as if the server refused
        /// the request. Device state is left untouched.
        pub fn reject_operations(&self, reject: bool) {
            self.reject_operations.store(reject, Ordering::SeqCst);
        }

        fn check_accepted(&self, what: &str, id: &str) -> Result<()> {
            if self.reject_operations.load(Ordering::SeqCst) {
                return Err(AudioError::OperationFailed(format!(
                    "server rejected {what} for {id}"
                )));
            }
            Ok(())
        }

        /// Use `id` as the default capture device for the Communications role
        /// instead of the console default.
        pub fn set_communications_capture(&self, id: &str) {
            if let Ok(mut c) = self.communications_capture.lock() {
                *c = Some(id.to_string());
            }
        }

        /// Remove a device, as if it was unplugged.
        pub fn unplug(&self, id: &str) {
            if let Ok(mut devices) = self.devices.lock() {
                devices.retain(|d| d.id != id);
            }
        }

        /// Change mute state behind the controller's back (another app did it).
        pub fn set_muted_externally(&self, id: &str, muted: bool) {
            if let Ok(mut devices) = self.devices.lock() {
                for d in devices.iter_mut().filter(|d| d.id == id) {
                    d.is_muted = muted;
                }
            }
        }

        /// Device ids passed to `set_default`, in call order.
        pub fn set_default_calls(&self) -> Vec<String> {
            self.set_default_calls
                .lock()
                .map(|c| c.clone())
                .unwrap_or_default()
        }

        fn with_devices<T>(&self, f: impl FnOnce(&mut Vec<DeviceSnapshot>) -> T) -> Result<T> {
            let mut devices = self
                .devices
                .lock()
                .map_err(|e| AudioError::OperationFailed(format!("stub poisoned: {e}")))?;
            Ok(f(&mut devices))
        }
    }

    impl AudioController for StubController {
        fn devices(&self) -> Result<Vec<DeviceSnapshot>> {
            self.with_devices(|d| d.clone())
        }

        fn set_default(&self, id: &str) -> Result<()> {
            if let Ok(mut calls) = self.set_default_calls.lock() {
                calls.push(id.to_string());
            }
            self.check_accepted("set default device", id)?;
            self.with_devices(|devices| {
                let kind = devices
                    .iter()
                    .find(|d| d.id == id)
                    .map(|d| d.kind)
                    .ok_or_else(|| AudioError::OperationFailed(format!("no such device: {id}")))?;
                for d in devices.iter_mut().filter(|d| d.kind == kind) {
                    d.is_default = d.id == id;
                }
                Ok(())
            })?
        }

        fn set_muted(&self, id: &str, muted: bool) -> Result<()> {
            self.check_accepted("set mute", id)?;
            self.with_devices(|devices| {
                let dev = devices
                    .iter_mut()
                    .find(|d| d.id == id)
                    .ok_or_else(|| AudioError::OperationFailed(format!("no such device: {id}")))?;
                dev.is_muted = muted;
                Ok(())
            })?
        }

        fn default_device(&self, kind: DeviceKind, role: Role) -> Result<Option<DeviceSnapshot>> {
            let comms = self
                .communications_capture
                .lock()
                .map(|c| c.clone())
                .unwrap_or_default();
            let devices = self.devices()?;
            if kind == DeviceKind::Capture
                && role == Role::Communications
                && let Some(id) = comms
            {
                return Ok(devices.into_iter().find(|d| d.id == id));
            }
            Ok(devices
                .into_iter()
                .find(|d| d.kind == kind && d.is_default))
        }
    }
}
