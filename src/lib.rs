//! Chorus Gateway - voice assistant gateway over local STT/LLM/TTS
//!
//! This library glues four external collaborators into push-to-talk
//! conversation turns and exposes the turn lifecycle over HTTP:
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                   Frontend                        │
//! │   /voice/start │ /voice/stop │ /voice/status │ … │
//! └───────────────────────┬──────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────┐
//! │               Turn Controller                     │
//! │   capture → transcribe → respond → speak          │
//! └───────────────────────┬──────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────┐
//! │   Microphone │ Whisper API │ Ollama │ TTS API    │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The controller ([`turn::TurnController`]) is the only piece with real
//! logic: it serializes concurrent start/stop/cancel requests against a
//! single logical turn and keeps status polls consistent while background
//! tasks run the pipeline.

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod turn;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use llm::OllamaResponder;
pub use turn::{
    Recorder, RecordingStarted, Responder, Speaker, Transcriber, TurnController, TurnStatus,
};
pub use voice::{AudioPlayback, MicRecorder, VoiceSpeaker, WhisperClient};
