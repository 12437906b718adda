//! morseFlow: Morse code translation and timed tone playback.
//!
//! The codec, playback runtime and settings live here.
//! The `morseflow` CLI consumes this crate.

pub mod codec;
pub mod device;
pub mod error;
pub mod message;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod tone;
pub mod trainer;
