//! Voice processing module
//!
//! Microphone capture, speaker playback, and the HTTP-backed STT/TTS
//! collaborators consumed by the turn controller.

mod capture;
mod playback;
mod stt;
mod tts;

pub use capture::{MicRecorder, SAMPLE_RATE, samples_to_wav};
pub use playback::AudioPlayback;
pub use stt::WhisperClient;
pub use tts::{TextToSpeech, VoiceSpeaker};
