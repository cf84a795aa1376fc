//! Ambient mixing through an external ffmpeg binary.

mod ffmpeg;

pub use ffmpeg::{
    MixError, MixSettings, mix_command, mix_with_ambient, resolve_ffmpeg, resolve_ffmpeg_from,
};
