//! HTTP client for backend communication.

use reqwest::blocking::{Response, multipart};
use tracing::debug;

use super::Backend;
use super::types::{BackendError, HealthResponse, SynthesizeRequest};

/// HTTP-based backend client.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    /// Create a new HTTP backend client.
    pub fn new(host: &str, port: u16) -> Self {
        let base_url = format!("http://{host}:{port}");

        Self {
            base_url,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Get the base URL for this backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Turn a non-2xx response into a `RequestFailed`, keeping any body text.
fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        Err(BackendError::RequestFailed(format!("Status: {status}")))
    } else {
        Err(BackendError::RequestFailed(format!("Status: {status}: {body}")))
    }
}

impl Backend for HttpBackend {
    fn health(&self) -> Result<HealthResponse, BackendError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        check_status(response)?
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/synthesize", self.base_url);

        let speaker_part = multipart::Part::bytes(request.speaker_wav.clone())
            .file_name("speaker.wav")
            .mime_str("audio/wav")
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let form = multipart::Form::new()
            .part("speaker_wav", speaker_part)
            .text("text", request.text.clone())
            .text("language", request.language.to_string())
            .text("model", request.model.clone())
            .text("device", request.device.to_string());

        debug!(%url, language = %request.language, device = %request.device, "Sending synthesis request");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        let audio = check_status(response)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        if !audio.starts_with(b"RIFF") {
            return Err(BackendError::InvalidResponse(format!(
                "Expected WAV audio, got {} bytes",
                audio.len()
            )));
        }

        Ok(audio)
    }
}
