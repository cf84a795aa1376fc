//! ffmpeg discovery and ambient mixing.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

/// File name of the ffmpeg build that imageio-ffmpeg ships for Apple Silicon.
const BUNDLED_FFMPEG: &str = "ffmpeg-macos-aarch64-v7.1";

/// Where a Homebrew Python keeps imageio-ffmpeg's binaries.
const HOMEBREW_IMAGEIO_DIR: &str = "/opt/homebrew/lib/python3.11/site-packages/imageio_ffmpeg/binaries";

/// Errors that can occur while locating or running ffmpeg.
#[derive(Error, Debug)]
pub enum MixError {
    #[error("ffmpeg not found; install ffmpeg or imageio-ffmpeg.")]
    FfmpegNotFound,

    #[error("ffmpeg not found at {0}")]
    ExplicitNotFound(PathBuf),

    #[error("Failed to run ffmpeg: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ffmpeg exited with {code}: {stderr}")]
    Failed { code: String, stderr: String },
}

/// Parameters of the ambient mix filter graph.
#[derive(Debug, Clone, PartialEq)]
pub struct MixSettings {
    pub ambient_volume: f32,
    pub voice_volume: f32,
    /// Integrated loudness target (LUFS).
    pub loudness: f32,
    /// Loudness range target (LU).
    pub loudness_range: f32,
    /// True peak ceiling (dBTP).
    pub true_peak: f32,
    pub sample_rate: u32,
    /// Output duration limit in seconds.
    pub duration: f32,
    pub codec: String,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            ambient_volume: 0.6,
            voice_volume: 1.2,
            loudness: -16.0,
            loudness_range: 11.0,
            true_peak: -1.0,
            sample_rate: 48000,
            duration: 10.1,
            codec: "pcm_s16le".to_string(),
        }
    }
}

impl MixSettings {
    /// Render the `-filter_complex` graph.
    ///
    /// Input 0 is the ambient track, input 1 the voice.
    pub fn filter_graph(&self) -> String {
        format!(
            "[0:a]volume={}[a0];[1:a]volume={}[a1];\
             [a0][a1]amix=inputs=2:normalize=0,\
             loudnorm=I={}:LRA={}:TP={:.1},aresample={}",
            self.ambient_volume,
            self.voice_volume,
            self.loudness,
            self.loudness_range,
            self.true_peak,
            self.sample_rate
        )
    }
}

/// Build the ffmpeg argument list (without the program name).
pub fn mix_command(
    voice: &Path,
    ambient: &Path,
    out_path: &Path,
    settings: &MixSettings,
) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        ambient.as_os_str().to_owned(),
        "-i".into(),
        voice.as_os_str().to_owned(),
        "-filter_complex".into(),
        settings.filter_graph().into(),
        "-t".into(),
        settings.duration.to_string().into(),
        "-c:a".into(),
        settings.codec.clone().into(),
        out_path.as_os_str().to_owned(),
    ]
}

/// Mix `voice` over `ambient` into `out_path`.
pub fn mix_with_ambient(
    ffmpeg: &Path,
    voice: &Path,
    ambient: &Path,
    out_path: &Path,
    settings: &MixSettings,
) -> Result<(), MixError> {
    let args = mix_command(voice, ambient, out_path, settings);
    debug!(ffmpeg = %ffmpeg.display(), ?args, "Running ffmpeg");

    let output = Command::new(ffmpeg).args(&args).output()?;

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        return Err(MixError::Failed {
            code,
            stderr: stderr_tail(&output.stderr),
        });
    }

    info!(out = %out_path.display(), "Ambient mix complete");
    Ok(())
}

/// Locate an ffmpeg binary.
///
/// An explicit path wins; otherwise `PATH` is searched, then the bundled
/// imageio-ffmpeg build next to the executable, then the Homebrew Python
/// install.
pub fn resolve_ffmpeg(explicit: Option<&Path>) -> Result<PathBuf, MixError> {
    let mut fallbacks = Vec::new();
    if let Some(dir) = env::current_exe().ok().as_deref().and_then(Path::parent) {
        fallbacks.push(dir.join("outputs").join(BUNDLED_FFMPEG));
    }
    fallbacks.push(Path::new(HOMEBREW_IMAGEIO_DIR).join(BUNDLED_FFMPEG));

    resolve_ffmpeg_from(explicit, env::var_os("PATH").as_deref(), &fallbacks)
}

/// Resolution with the search inputs spelled out.
pub fn resolve_ffmpeg_from(
    explicit: Option<&Path>,
    path_var: Option<&OsStr>,
    fallbacks: &[PathBuf],
) -> Result<PathBuf, MixError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(MixError::ExplicitNotFound(path.to_path_buf()))
        };
    }

    if let Some(found) = path_var.and_then(search_path) {
        debug!(ffmpeg = %found.display(), "Found ffmpeg on PATH");
        return Ok(found);
    }

    fallbacks
        .iter()
        .find(|candidate| candidate.exists())
        .cloned()
        .ok_or(MixError::FfmpegNotFound)
}

fn search_path(path_var: &OsStr) -> Option<PathBuf> {
    let name = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
    env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Last few lines of ffmpeg's stderr; the banner before them is noise.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join("\n")
}
