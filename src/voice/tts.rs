//! Text-to-speech synthesis and spoken playback

use async_trait::async_trait;

use crate::config::TtsConfig;
use crate::turn::Speaker;
use crate::voice::AudioPlayback;
use crate::{Error, Result};

/// Synthesizes speech via an OpenAI-compatible TTS endpoint
pub struct TextToSpeech {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    voice: String,
    speed: f64,
}

impl TextToSpeech {
    /// Create a synthesizer from TTS configuration
    #[must_use]
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            speed: config.speed,
        }
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if the synthesis request fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f64,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let mut builder = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .json(&request);

        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("TTS API error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;
        Ok(audio.to_vec())
    }
}

/// Speaks text through the output device, with a local command fallback
///
/// The primary path synthesizes MP3 audio and plays it back. When either
/// step fails, the configured fallback command (e.g. `say -v Anna`) gets the
/// text appended as its final argument; an error propagates only when all
/// paths fail.
pub struct VoiceSpeaker {
    tts: TextToSpeech,
    fallback_command: Option<Vec<String>>,
}

impl VoiceSpeaker {
    /// Create a speaker from TTS configuration
    #[must_use]
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            tts: TextToSpeech::new(config),
            fallback_command: config.fallback_command.clone(),
        }
    }

    /// Primary path: synthesize, then play the decoded audio
    async fn speak_synthesized(&self, text: &str) -> Result<()> {
        let mp3 = self.tts.synthesize(text).await?;
        tracing::debug!(audio_bytes = mp3.len(), "playing synthesized speech");

        // cpal streams are not Send; play on a blocking thread
        tokio::task::spawn_blocking(move || {
            let playback = AudioPlayback::new()?;
            playback.play_mp3(&mp3)
        })
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }

    /// Fallback path: hand the text to a local TTS command
    async fn speak_fallback(&self, text: &str) -> Result<()> {
        let argv = self
            .fallback_command
            .as_deref()
            .ok_or_else(|| Error::Synthesis("no fallback command configured".to_string()))?;

        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Synthesis("empty fallback command".to_string()))?;

        let status = tokio::process::Command::new(program)
            .args(args)
            .arg(text)
            .status()
            .await
            .map_err(|e| Error::Synthesis(format!("fallback command failed: {e}")))?;

        if !status.success() {
            return Err(Error::Synthesis(format!(
                "fallback command exited with {status}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Speaker for VoiceSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        match self.speak_synthesized(text).await {
            Ok(()) => Ok(()),
            Err(primary) => {
                tracing::warn!(error = %primary, "synthesis path failed, trying fallback");
                self.speak_fallback(text).await.map_err(|fallback| {
                    Error::Synthesis(format!("{primary}; fallback: {fallback}"))
                })
            }
        }
    }
}
