//! Speech engine implementation.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio::{self, AudioError, RECOMMENDED_REFERENCE_SECONDS, REFERENCE_SAMPLE_RATE};
use crate::backend::{Backend, BackendError, SynthesizeRequest};
use crate::cli::{DEFAULT_MODEL, Device, Language};
use crate::mix::{self, MixError, MixSettings};

/// Errors that can occur during a speak run.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Speaker WAV not found: {0}")]
    SpeakerNotFound(PathBuf),

    #[error("Ambient WAV not found: {0}")]
    AmbientNotFound(PathBuf),

    #[error("Text to synthesize is empty")]
    EmptyText,

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Mix error: {0}")]
    Mix(#[from] MixError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct SpeakOptions {
    pub text: String,
    pub speaker_wav: PathBuf,
    pub language: Language,
    pub model: String,
    pub out: PathBuf,
    /// Explicit device; `None` asks the backend what it has.
    pub device: Option<Device>,
    pub ambient: Option<PathBuf>,
    pub mix_out: PathBuf,
    /// Explicit ffmpeg binary; `None` searches for one.
    pub ffmpeg: Option<PathBuf>,
    pub mix: MixSettings,
}

impl SpeakOptions {
    /// Options with the CLI defaults for everything but text and speaker.
    pub fn new(text: impl Into<String>, speaker_wav: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            speaker_wav: speaker_wav.into(),
            language: Language::default(),
            model: DEFAULT_MODEL.to_string(),
            out: PathBuf::from("outputs/xtts_voice.wav"),
            device: None,
            ambient: None,
            mix_out: PathBuf::from("outputs/xtts_voice_mix.wav"),
            ffmpeg: None,
            mix: MixSettings::default(),
        }
    }
}

/// Where a run left its audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Voice only.
    Voice(PathBuf),
    /// Voice plus the ambient mix.
    Mixed { voice: PathBuf, mix: PathBuf },
}

impl SpeakOutcome {
    /// The file the user asked for last.
    pub fn final_path(&self) -> &Path {
        match self {
            SpeakOutcome::Voice(path) => path,
            SpeakOutcome::Mixed { mix, .. } => mix,
        }
    }
}

/// Drives the backend through one text-to-speech run.
pub struct SpeechEngine<B: Backend> {
    backend: B,
}

impl<B: Backend> SpeechEngine<B> {
    /// Create a new speech engine.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Pick the compute device.
    ///
    /// An explicit choice wins. Otherwise the backend is asked and the first
    /// available of cuda, mps, cpu is used.
    pub fn resolve_device(&self, preferred: Option<Device>) -> Result<Device, EngineError> {
        if let Some(device) = preferred {
            return Ok(device);
        }

        let health = self.backend.health()?;
        debug!(status = %health.status, gpu = ?health.gpu, "Backend health");

        let device = if health.cuda_available {
            Device::Cuda(None)
        } else if health.mps_available {
            Device::Mps
        } else {
            Device::Cpu
        };

        if !device.is_accelerated() {
            warn!("No accelerator reported by backend, synthesizing on cpu");
        }
        Ok(device)
    }

    /// Synthesize `options.text` in the speaker's voice and optionally mix it.
    pub fn speak(&self, options: &SpeakOptions) -> Result<SpeakOutcome, EngineError> {
        if !options.speaker_wav.exists() {
            return Err(EngineError::SpeakerNotFound(options.speaker_wav.clone()));
        }
        if options.text.trim().is_empty() {
            return Err(EngineError::EmptyText);
        }

        create_parent_dir(&options.out)?;

        let device = self.resolve_device(options.device)?;
        info!(%device, model = %options.model, language = %options.language, "Using device");

        let reference = audio::load_reference(&options.speaker_wav, REFERENCE_SAMPLE_RATE)?;
        let seconds = reference.len() as f32 / REFERENCE_SAMPLE_RATE as f32;
        if !RECOMMENDED_REFERENCE_SECONDS.contains(&seconds) {
            warn!(seconds, "Reference sample is outside the 10-30s range that clones best");
        }
        let speaker_wav = audio::encode_wav(&reference, REFERENCE_SAMPLE_RATE)?;

        let request = SynthesizeRequest::new(options.text.clone(), speaker_wav)
            .with_language(options.language.clone())
            .with_model(options.model.clone())
            .with_device(device);

        info!(chars = options.text.chars().count(), "Synthesizing speech");
        let voice = self.backend.synthesize(&request)?;
        fs::write(&options.out, &voice)?;
        match audio::wav_duration(&options.out) {
            Ok(seconds) => info!(out = %options.out.display(), seconds, "Voice audio saved"),
            Err(err) => debug!(out = %options.out.display(), %err, "Saved voice is not a readable WAV"),
        }

        let Some(ambient) = &options.ambient else {
            return Ok(SpeakOutcome::Voice(options.out.clone()));
        };

        let ffmpeg = mix::resolve_ffmpeg(options.ffmpeg.as_deref())?;
        if !ambient.exists() {
            return Err(EngineError::AmbientNotFound(ambient.clone()));
        }
        create_parent_dir(&options.mix_out)?;

        info!(ambient = %ambient.display(), "Mixing with ambient track");
        mix::mix_with_ambient(&ffmpeg, &options.out, ambient, &options.mix_out, &options.mix)?;

        Ok(SpeakOutcome::Mixed {
            voice: options.out.clone(),
            mix: options.mix_out.clone(),
        })
    }
}

fn create_parent_dir(path: &Path) -> Result<(), std::io::Error> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
