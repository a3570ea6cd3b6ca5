//! audiodeck: switch default audio devices and toggle mic mute from a
//! control surface, with a per-device icon on every button.

pub mod audio;
pub mod commands;
pub mod config;
pub mod error;
pub mod icons;
pub mod mapping;
pub mod plugin;
pub mod refresh;

pub use error::AudiodeckError;
