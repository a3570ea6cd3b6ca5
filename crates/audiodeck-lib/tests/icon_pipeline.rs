//! Integration tests: device icons and mic mute through the public API.
//!
//! Icons are generated in-test and served from memory, so read counts can be
//! checked; the audio layer is the scriptable stub controller.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use audiodeck_lib::AudiodeckError;
use audiodeck_lib::audio::DeviceKind;
use audiodeck_lib::audio::stub::StubController;
use audiodeck_lib::commands::{MuteStateChanged, RECORDING_GROUP};
use audiodeck_lib::config::Config;
use audiodeck_lib::icons::source::stub::MemoryIconSource;
use audiodeck_lib::icons::{IconResolver, IconVariant, transform};
use audiodeck_lib::mapping::FALLBACK_ICON;
use audiodeck_lib::plugin::AudioPlugin;
use image::{Rgba, RgbaImage};

const CONFIG: &str = r#"
volume_change_cooldown_ms = 0
mute_icon = "mute.png"
unmute_icon = "unmute.png"

[[custom_images]]
device_name = "Speakers (Realtek)"
image_name = "speakers.png"

[[custom_images]]
device_name = "USB Headset"
image_name = "headset.png"
"#;

fn png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    transform::encode_png(&RgbaImage::from_pixel(w, h, Rgba(px))).unwrap()
}

/// Speakers and fallback icons; the headset mapping points at a missing file.
fn icon_source() -> Arc<MemoryIconSource> {
    let source = Arc::new(MemoryIconSource::new());
    source.insert("speakers.png", png(32, 32, [200, 100, 50, 255]));
    source.insert(FALLBACK_ICON, png(32, 32, [128, 128, 128, 255]));
    source.insert("mute.png", png(32, 32, [255, 0, 0, 255]));
    source.insert("unmute.png", png(32, 32, [0, 255, 0, 255]));
    source
}

fn resolver(source: Arc<MemoryIconSource>) -> IconResolver {
    let config = Config::from_toml_str(CONFIG).unwrap();
    IconResolver::from_config(&config, source)
}

fn decode(bytes: &[u8]) -> RgbaImage {
    transform::decode(bytes).unwrap()
}

fn assert_near(px: Rgba<u8>, want: [u8; 4]) {
    for ch in 0..4 {
        assert!(
            px[ch].abs_diff(want[ch]) <= 1,
            "pixel {px:?} not within 1 of {want:?}"
        );
    }
}

// ── Icon resolution ──

#[test]
fn default_speakers_render_full_color_at_64() {
    let r = resolver(icon_source());
    let img = decode(&r.resolve_icon("Speakers (Realtek)", true, 64).unwrap());
    assert_eq!(img.dimensions(), (64, 64));
    assert_near(*img.get_pixel(32, 32), [200, 100, 50, 255]);
}

#[test]
fn washed_out_is_one_fifth_of_normal() {
    let r = resolver(icon_source());
    let normal = decode(&r.resolve_icon("Speakers (Realtek)", true, 32).unwrap());
    let washed = decode(&r.resolve_icon("Speakers (Realtek)", false, 32).unwrap());
    for (n, w) in normal.pixels().zip(washed.pixels()) {
        for ch in 0..3 {
            let expected = (n[ch] as f32 * 0.2).round() as u8;
            assert!(w[ch].abs_diff(expected) <= 1, "{n:?} -> {w:?}");
        }
        assert_eq!(n[3], w[3]);
    }
}

#[test]
fn unknown_device_renders_washed_out_fallback_at_48() {
    let r = resolver(icon_source());
    let img = decode(&r.resolve_icon("unknown-device-id", false, 48).unwrap());
    assert_eq!(img.dimensions(), (48, 48));
    assert_near(*img.get_pixel(0, 0), [26, 26, 26, 255]);
}

#[test]
fn mapped_but_missing_file_is_an_error() {
    let r = resolver(icon_source());
    let err = r.resolve_icon("USB Headset", true, 48).unwrap_err();
    assert!(
        matches!(err, AudiodeckError::IconNotFound { ref name, .. } if name == "headset.png"),
        "got: {err}"
    );
}

#[test]
fn repeated_requests_never_read_twice() {
    let source = icon_source();
    let r = resolver(source.clone());
    source.fail_on_repeat(true);

    let first = r.resolve_icon("Speakers (Realtek)", false, 40).unwrap();
    for size in [40, 16, 96] {
        r.resolve_icon("Speakers (Realtek)", false, size).unwrap();
        r.resolve_icon("Speakers (Realtek)", true, size).unwrap();
    }
    let again = r.resolve_icon("Speakers (Realtek)", false, 40).unwrap();

    assert_eq!(first, again);
    assert_eq!(source.reads("speakers.png"), 1);
    assert!(r.cache().contains("speakers.png", IconVariant::WashedOut));
}

#[test]
fn concurrent_renders_share_one_cache() {
    let source = icon_source();
    let r = Arc::new(resolver(source.clone()));
    r.preload().unwrap();
    source.fail_on_repeat(true);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let r = Arc::clone(&r);
            std::thread::spawn(move || r.render_icon("Speakers (Realtek)", i % 2 == 0, 24))
        })
        .collect();
    for h in handles {
        assert!(!h.join().unwrap().is_empty());
    }
    assert_eq!(source.reads("speakers.png"), 1);
}

// ── Plugin + commands ──

fn plugin(
    controller: Arc<StubController>,
) -> (AudioPlugin, mpsc::Receiver<MuteStateChanged>) {
    let (tx, rx) = mpsc::channel();
    let config = Config::from_toml_str(CONFIG).unwrap();
    let plugin = AudioPlugin::with_source(config, icon_source(), controller, Arc::new(tx)).unwrap();
    (plugin, rx)
}

fn devices() -> Arc<StubController> {
    Arc::new(StubController::new(vec![
        StubController::device("Speakers (Realtek)", DeviceKind::Playback, true),
        StubController::device("USB Headset", DeviceKind::Playback, false),
        StubController::device("Microphone (USB)", DeviceKind::Capture, true),
    ]))
}

#[test]
fn switching_device_changes_which_icon_is_washed_out() {
    let controller = devices();
    let (plugin, _rx) = plugin(controller.clone());
    let cmd = plugin.change_device();

    let before = decode(&cmd.image("Speakers (Realtek)", 32));
    assert_near(*before.get_pixel(0, 0), [200, 100, 50, 255]);

    cmd.run("USB Headset").unwrap();
    let after = decode(&cmd.image("Speakers (Realtek)", 32));
    assert_near(*after.get_pixel(0, 0), [40, 20, 10, 255]);

    // Headset icon file is missing: fallback, now in full color.
    let headset = decode(&cmd.image("USB Headset", 32));
    assert_near(*headset.get_pixel(0, 0), [128, 128, 128, 255]);
}

#[test]
fn capture_devices_are_grouped_for_recording() {
    let (plugin, _rx) = plugin(devices());
    let last = plugin.change_device().parameters().last().unwrap().clone();
    assert_eq!(last.name, "Microphone (USB)");
    assert_eq!(last.group, RECORDING_GROUP);
}

#[test]
fn mute_toggle_round_trip_notifies_once_per_call() {
    let controller = devices();
    let (plugin, rx) = plugin(controller);
    let mute = plugin.mute_mic();

    assert!(!mute.is_muted().unwrap());
    mute.run().unwrap();
    assert!(mute.is_muted().unwrap());
    mute.run().unwrap();
    assert!(!mute.is_muted().unwrap());

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            MuteStateChanged { muted: true },
            MuteStateChanged { muted: false },
        ]
    );
}

#[test]
fn mute_icon_tracks_external_changes() {
    let controller = devices();
    let (plugin, rx) = plugin(controller.clone());
    let mute = plugin.mute_mic();

    controller.set_muted_externally("Microphone (USB)", true);
    let now = std::time::Instant::now() + Duration::from_millis(1);
    assert_eq!(mute.poll(now).unwrap(), Some(true));
    assert_eq!(rx.try_recv(), Ok(MuteStateChanged { muted: true }));

    let img = decode(&mute.image(100));
    assert_eq!(img.dimensions(), (70, 70));
    assert_near(*img.get_pixel(10, 10), [255, 0, 0, 255]);
}
