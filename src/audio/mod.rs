//! Reference audio preparation.
//!
//! Speaker samples are normalized here before they are sent to the model:
//! mixed down to mono, resampled to the rate the conditioning encoder
//! expects, and clamped to the valid sample range.

mod loader;

pub use loader::{
    AudioError, RECOMMENDED_REFERENCE_SECONDS, REFERENCE_SAMPLE_RATE, encode_wav, load_reference,
    wav_duration,
};
