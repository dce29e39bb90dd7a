//! Error types for ambia-engine
//!
//! Defines engine-specific error types using thiserror for clear error
//! propagation. Late callbacks and stale step timers are deliberately not
//! errors: teardown races are expected and handled by guard checks, so
//! they never surface here.

use thiserror::Error;

/// Main error type for ambia-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (bad values, unreadable config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio session / output device setup errors
    #[error("Audio session error: {0}")]
    AudioSession(String),

    /// Asset failed to open or decode during slot load
    #[error("Load error: {0}")]
    Load(String),

    /// Mid-stream I/O failure on a loaded slot
    #[error("Playback error: {0}")]
    Playback(String),

    /// Engine is tearing down; the request was dropped, not queued
    #[error("Engine busy: {0}")]
    Busy(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the ambia-engine Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short machine-readable kind string, used by diagnostic events.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::AudioSession(_) => "audio_session",
            Error::Load(_) => "load",
            Error::Playback(_) => "playback",
            Error::Busy(_) => "busy",
            Error::Io(_) => "io",
        }
    }
}
