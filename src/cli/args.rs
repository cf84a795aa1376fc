//! CLI argument definitions and parsing.

use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

/// Default XTTS model identifier.
pub const DEFAULT_MODEL: &str = "tts_models/multilingual/multi-dataset/xtts_v2";

/// Language codes understood by XTTS v2.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh-cn", "hu", "ko",
    "ja", "hi",
];

/// Generate speech with XTTS v2, optionally mixed over an ambient track.
#[derive(Parser, Debug)]
#[command(name = "xtts-rs")]
#[command(about = "Generate TTS with Coqui XTTS v2")]
#[command(version)]
pub struct Args {
    /// Text to synthesize
    #[arg(long)]
    pub text: String,

    /// Reference speaker WAV (10-30s clean voice works best)
    #[arg(long)]
    pub speaker_wav: PathBuf,

    /// Language code
    #[arg(long, default_value = "en")]
    pub language: String,

    /// XTTS model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Output WAV path
    #[arg(long, default_value = "outputs/xtts_voice.wav")]
    pub out: PathBuf,

    /// Override device (cuda/mps/cpu)
    #[arg(long)]
    pub device: Option<String>,

    /// Optional ambient WAV to mix with voice
    #[arg(long)]
    pub ambient: Option<PathBuf>,

    /// Output path for mixed audio when --ambient is provided
    #[arg(long, default_value = "outputs/xtts_voice_mix.wav")]
    pub mix_out: PathBuf,

    /// Backend host address
    #[arg(long, env = "XTTS_HOST", default_value = "localhost")]
    pub host: String,

    /// Backend port
    #[arg(long, env = "XTTS_PORT", default_value_t = 8020)]
    pub port: u16,

    /// Path to an ffmpeg binary (skips discovery)
    #[arg(long, env = "XTTS_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Errors that can occur when parsing a device name.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeviceParseError {
    #[error("Unknown device: {0}. Expected cuda, cuda:N, mps or cpu")]
    Unknown(String),

    #[error("Invalid CUDA device index: {0}")]
    InvalidIndex(String),
}

/// Compute device the model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// NVIDIA GPU, optionally pinned to an index.
    Cuda(Option<u32>),
    /// Apple Metal Performance Shaders.
    Mps,
    Cpu,
}

impl Device {
    /// Parse a device from "cuda", "cuda:N", "mps" or "cpu".
    ///
    /// # Examples
    /// ```
    /// use xtts_rs::cli::Device;
    /// assert_eq!(Device::parse("cuda:1").unwrap(), Device::Cuda(Some(1)));
    /// ```
    pub fn parse(input: &str) -> Result<Self, DeviceParseError> {
        let normalized = input.trim().to_ascii_lowercase();

        match normalized.as_str() {
            "cuda" => return Ok(Device::Cuda(None)),
            "mps" => return Ok(Device::Mps),
            "cpu" => return Ok(Device::Cpu),
            _ => {}
        }

        match normalized.strip_prefix("cuda:") {
            Some(index) => index
                .parse()
                .map(|i| Device::Cuda(Some(i)))
                .map_err(|_| DeviceParseError::InvalidIndex(index.to_string())),
            None => Err(DeviceParseError::Unknown(input.to_string())),
        }
    }

    /// Returns true for accelerators (anything but the CPU).
    pub fn is_accelerated(&self) -> bool {
        !matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda(None) => write!(f, "cuda"),
            Device::Cuda(Some(index)) => write!(f, "cuda:{index}"),
            Device::Mps => write!(f, "mps"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Errors that can occur when parsing a language code.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LanguageParseError {
    #[error("Unsupported language: {0}. Supported: {supported}", supported = SUPPORTED_LANGUAGES.join(", "))]
    Unsupported(String),
}

/// A language code XTTS v2 can speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language(String);

impl Language {
    /// Parse and validate a language code.
    ///
    /// Matching ignores case and surrounding whitespace; bare "zh" maps to "zh-cn".
    pub fn parse(input: &str) -> Result<Self, LanguageParseError> {
        let mut code = input.trim().to_ascii_lowercase();
        if code == "zh" {
            code = "zh-cn".to_string();
        }

        if SUPPORTED_LANGUAGES.contains(&code.as_str()) {
            Ok(Self(code))
        } else {
            Err(LanguageParseError::Unsupported(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self("en".to_string())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
