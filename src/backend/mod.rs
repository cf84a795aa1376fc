//! Backend communication with the XTTS model server.
//!
//! Provides the trait and HTTP implementation for talking to the process
//! that hosts the pretrained XTTS v2 model.

mod client;
mod types;

pub use client::HttpBackend;
pub use types::{BackendError, HealthResponse, SynthesizeRequest};

/// Trait for TTS backend communication.
///
/// This trait abstracts the HTTP communication with the model server,
/// allowing for mock implementations in tests.
#[cfg_attr(test, mockall::automock)]
pub trait Backend: Send + Sync {
    /// Check backend health and accelerator availability.
    fn health(&self) -> Result<HealthResponse, BackendError>;

    /// Synthesize speech from text in the reference speaker's voice.
    ///
    /// # Returns
    /// Raw WAV audio data
    fn synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, BackendError>;
}

/// Create a backend for the given server address.
pub fn create_backend(host: &str, port: u16) -> HttpBackend {
    HttpBackend::new(host, port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Device, Language};
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    /// Serve a single canned HTTP response on an ephemeral port.
    ///
    /// The handle yields the raw request the client sent.
    fn serve_once(status_line: &'static str, body: &'static [u8]) -> (u16, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);

            let head = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(body).unwrap();
            request
        });

        (port, handle)
    }

    /// Read one full request: headers, then a sized or chunked body.
    fn read_request(stream: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];

        let header_end = loop {
            let n = stream.read(&mut buf).unwrap();
            raw.extend_from_slice(&buf[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                return String::from_utf8_lossy(&raw).into_owned();
            }
        };

        let head = String::from_utf8_lossy(&raw[..header_end]).to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok());
        let chunked = head.contains("transfer-encoding: chunked");

        loop {
            let body = &raw[header_end..];
            let complete = match content_length {
                Some(len) => body.len() >= len,
                None if chunked => body.ends_with(b"0\r\n\r\n"),
                None => true,
            };
            if complete {
                break;
            }
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }

        String::from_utf8_lossy(&raw).into_owned()
    }

    // ===========================================
    // Backend trait tests with mocks
    // ===========================================

    #[test]
    fn test_mock_backend_health_success() {
        let mut mock = MockBackend::new();

        mock.expect_health().times(1).returning(|| {
            Ok(HealthResponse {
                status: "healthy".to_string(),
                model: "xtts_v2".to_string(),
                cuda_available: true,
                mps_available: false,
                gpu: Some("NVIDIA RTX 4090".to_string()),
                device: "cuda:0".to_string(),
            })
        });

        let health = mock.health().unwrap();
        assert_eq!(health.status, "healthy");
        assert!(health.cuda_available);
    }

    #[test]
    fn test_mock_backend_synthesize() {
        let mut mock = MockBackend::new();

        mock.expect_synthesize()
            .withf(|req| req.text == "Hello world" && req.language.as_str() == "fr")
            .times(1)
            .returning(|_| Ok(b"RIFF\x00\x00\x00\x00WAVEfmt ".to_vec()));

        let request = SynthesizeRequest::new("Hello world", b"RIFF".to_vec())
            .with_language(Language::parse("fr").unwrap());

        let audio = mock.synthesize(&request).unwrap();
        assert!(audio.starts_with(b"RIFF"));
    }

    // ===========================================
    // Request/response types
    // ===========================================

    #[test]
    fn test_synthesize_request_builder() {
        let request = SynthesizeRequest::new("Hello", vec![1, 2, 3])
            .with_language(Language::parse("de").unwrap())
            .with_model("my/model")
            .with_device(Device::Mps);

        assert_eq!(request.text, "Hello");
        assert_eq!(request.speaker_wav, vec![1, 2, 3]);
        assert_eq!(request.language.as_str(), "de");
        assert_eq!(request.model, "my/model");
        assert_eq!(request.device, Device::Mps);
    }

    #[test]
    fn test_synthesize_request_defaults() {
        let request = SynthesizeRequest::new("Hello", Vec::new());

        assert_eq!(request.language.as_str(), "en");
        assert_eq!(request.model, crate::cli::DEFAULT_MODEL);
        assert_eq!(request.device, Device::Cpu);
    }

    #[test]
    fn test_health_response_deserialize_defaults() {
        let json = r#"{"status": "healthy", "model": "xtts_v2", "device": "cpu"}"#;

        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert!(!response.cuda_available);
        assert!(!response.mps_available);
        assert_eq!(response.gpu, None);
    }

    // ===========================================
    // HttpBackend tests
    // ===========================================

    #[test]
    fn test_create_backend_url() {
        let backend = create_backend("localhost", 8020);
        assert_eq!(backend.base_url(), "http://localhost:8020");
    }

    #[test]
    fn test_http_health_success() {
        let (port, server) = serve_once(
            "200 OK",
            br#"{"status":"healthy","model":"xtts_v2","cuda_available":false,"mps_available":true,"device":"mps"}"#,
        );
        let backend = HttpBackend::new("127.0.0.1", port);

        let health = backend.health().unwrap();
        assert!(health.mps_available);
        assert_eq!(health.device, "mps");
        assert!(server.join().unwrap().starts_with("GET /health "));
    }

    #[test]
    fn test_http_health_error_status() {
        let (port, _server) = serve_once("503 Service Unavailable", b"model loading");
        let backend = HttpBackend::new("127.0.0.1", port);

        let err = backend.health().unwrap_err();
        match err {
            BackendError::RequestFailed(message) => {
                assert!(message.contains("503"));
                assert!(message.contains("model loading"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_http_synthesize_sends_multipart_fields() {
        let (port, server) = serve_once("200 OK", b"RIFF\x24\x00\x00\x00WAVEfmt ");
        let backend = HttpBackend::new("127.0.0.1", port);

        let request = SynthesizeRequest::new("Bonjour tout le monde", b"RIFFspeaker".to_vec())
            .with_language(Language::parse("fr").unwrap())
            .with_model("tts_models/custom/xtts")
            .with_device(Device::Cuda(Some(1)));

        let audio = backend.synthesize(&request).unwrap();
        assert!(audio.starts_with(b"RIFF"));

        let sent = server.join().unwrap();
        assert!(sent.starts_with("POST /synthesize "));
        assert!(sent.contains(r#"name="speaker_wav"; filename="speaker.wav""#));
        assert!(sent.contains("audio/wav"));
        assert!(sent.contains("RIFFspeaker"));
        for (field, value) in [
            ("text", "Bonjour tout le monde"),
            ("language", "fr"),
            ("model", "tts_models/custom/xtts"),
            ("device", "cuda:1"),
        ] {
            let part = format!("name=\"{field}\"\r\n\r\n{value}\r\n");
            assert!(sent.contains(&part), "missing field {field}");
        }
    }

    #[test]
    fn test_http_synthesize_rejects_non_wav_body() {
        let (port, _server) = serve_once("200 OK", b"<html>oops</html>");
        let backend = HttpBackend::new("127.0.0.1", port);

        let result = backend.synthesize(&SynthesizeRequest::new("Hello", b"RIFF".to_vec()));
        assert!(matches!(result, Err(BackendError::InvalidResponse(_))));
    }

    #[test]
    fn test_http_synthesize_rejects_empty_body() {
        let (port, _server) = serve_once("200 OK", b"");
        let backend = HttpBackend::new("127.0.0.1", port);

        let result = backend.synthesize(&SynthesizeRequest::new("Hello", b"RIFF".to_vec()));
        assert!(matches!(result, Err(BackendError::InvalidResponse(_))));
    }

    #[test]
    fn test_http_synthesize_error_status_without_body() {
        let (port, _server) = serve_once("500 Internal Server Error", b"");
        let backend = HttpBackend::new("127.0.0.1", port);

        let err = backend
            .synthesize(&SynthesizeRequest::new("Hello", b"RIFF".to_vec()))
            .unwrap_err();

        match err {
            BackendError::RequestFailed(message) => {
                assert_eq!(message, "Status: 500 Internal Server Error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_http_connection_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let backend = HttpBackend::new("127.0.0.1", port);

        assert!(matches!(
            backend.health(),
            Err(BackendError::ConnectionFailed(_))
        ));
    }
}
