//! Error types for the Chorus gateway

use thiserror::Error;

/// Result type alias for Chorus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Chorus gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation was requested in the wrong turn state
    #[error("conflict: {0}")]
    Conflict(&'static str),

    /// Audio artifact missing or unreadable
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Transcript contained no usable speech
    #[error("no speech detected")]
    EmptySpeech,

    /// Language-model responder error
    #[error("generation error: {0}")]
    Generation(String),

    /// Text-to-speech error (all playback paths failed)
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
