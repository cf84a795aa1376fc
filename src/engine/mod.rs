//! Speech engine orchestrator.
//!
//! This module provides the engine that takes a validated set of options
//! through device selection, reference preparation, synthesis on the
//! backend, and the optional ambient mix.

mod tts;

pub use tts::{EngineError, SpeakOptions, SpeakOutcome, SpeechEngine};
