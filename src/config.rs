//! Configuration management for the Chorus gateway
//!
//! Settings come from an optional `chorus.toml` (every field has a default)
//! with environment overrides for ports and API keys.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "chorus.toml";

/// Chorus gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the HTTP API listens on
    pub port: u16,

    /// Fixed recording duration for one voice turn, in seconds
    pub record_secs: u64,

    /// Directory for transient audio artifacts
    pub artifact_dir: PathBuf,

    /// Language-model responder configuration
    pub llm: LlmConfig,

    /// Speech-to-text configuration
    pub stt: SttConfig,

    /// Text-to-speech configuration
    pub tts: TtsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            record_secs: 4,
            artifact_dir: std::env::temp_dir(),
            llm: LlmConfig::default(),
            stt: SttConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

/// Ollama responder configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,

    /// Model identifier (e.g. "gpt-oss:20b")
    pub model: String,

    /// System instructions sent with every prompt
    pub system_prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Context window size in tokens
    pub num_ctx: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "gpt-oss:20b".to_string(),
            system_prompt: "Du bist ein hilfreicher Assistent. \
                            Interpretiere Fragen ausschließlich als Deutsch \
                            und antworte immer auf Deutsch. \
                            Nutze keine anderen Sprachen."
                .to_string(),
            temperature: 0.7,
            num_ctx: 4096,
        }
    }
}

/// Speech-to-text configuration (OpenAI-Whisper-compatible endpoint)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// API base URL (any Whisper-compatible server works)
    pub base_url: String,

    /// API key, normally from `OPENAI_API_KEY`
    pub api_key: Option<String>,

    /// Transcription model (e.g. "whisper-1")
    pub model: String,

    /// Spoken language hint
    pub language: Option<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            language: Some("de".to_string()),
        }
    }
}

/// Text-to-speech configuration (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// API base URL
    pub base_url: String,

    /// API key, normally from `OPENAI_API_KEY`
    pub api_key: Option<String>,

    /// Synthesis model (e.g. "tts-1")
    pub model: String,

    /// Voice identifier
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: f64,

    /// Local command used when synthesis or playback fails
    /// (argv form; the text is appended as the final argument)
    pub fallback_command: Option<Vec<String>>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            fallback_command: Some(vec![
                "say".to_string(),
                "-v".to_string(),
                "Anna".to_string(),
            ]),
        }
    }
}

impl Config {
    /// Load configuration from an optional file path plus environment
    ///
    /// An explicit `path` must exist; otherwise `chorus.toml` in the working
    /// directory is used when present, and pure defaults when not.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML config file
    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply environment variable overrides
    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("CHORUS_PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => tracing::warn!(value = %port, "ignoring invalid CHORUS_PORT"),
            }
        }

        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.llm.base_url = url;
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if self.stt.api_key.is_none() {
                self.stt.api_key = Some(key.clone());
            }
            if self.tts.api_key.is_none() {
                self.tts.api_key = Some(key);
            }
        }
    }
}
