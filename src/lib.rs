//! xtts-rs: Voice-cloning text-to-speech CLI.
//!
//! This crate drives an XTTS v2 model server to speak text in a voice cloned
//! from a short reference sample, and can mix the result over an ambient
//! background track with ffmpeg.

pub mod audio;
pub mod backend;
pub mod cli;
pub mod engine;
pub mod mix;
