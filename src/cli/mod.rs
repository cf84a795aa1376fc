//! CLI argument parsing and validation.

mod args;

pub use args::{
    Args, DEFAULT_MODEL, Device, DeviceParseError, Language, LanguageParseError,
    SUPPORTED_LANGUAGES,
};
