//! Backend request/response types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::{DEFAULT_MODEL, Device, Language};

/// Errors that can occur when communicating with the backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Health check response from backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    #[serde(default)]
    pub cuda_available: bool,
    #[serde(default)]
    pub mps_available: bool,
    #[serde(default)]
    pub gpu: Option<String>,
    pub device: String,
}

/// Request for speech synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizeRequest {
    pub text: String,
    /// Normalized reference sample, encoded as WAV.
    pub speaker_wav: Vec<u8>,
    pub language: Language,
    pub model: String,
    pub device: Device,
}

impl SynthesizeRequest {
    /// Create a new synthesis request with the default model on CPU.
    pub fn new(text: impl Into<String>, speaker_wav: Vec<u8>) -> Self {
        Self {
            text: text.into(),
            speaker_wav,
            language: Language::default(),
            model: DEFAULT_MODEL.to_string(),
            device: Device::Cpu,
        }
    }

    /// Set the language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the compute device.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}
