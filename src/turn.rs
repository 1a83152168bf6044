//! Voice-turn lifecycle controller
//!
//! One turn runs capture → transcribe → respond → speak. The controller
//! serializes concurrent start/stop/cancel requests against that turn and
//! keeps a single mutex-guarded state record that status polls snapshot.
//!
//! External collaborators (microphone, STT, LLM, TTS) run only inside
//! spawned background tasks; the operations exposed here return immediately.
//! Every spawned task carries the generation number of the turn it belongs
//! to and refuses to write state once a cancel or a newer turn has bumped
//! the generation past it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::{Error, Result};

/// Records the microphone for a fixed duration and produces a WAV artifact
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Capture audio for `duration` and return the artifact path
    async fn capture(&self, duration: Duration) -> Result<PathBuf>;
}

/// Maps an audio artifact to text; returns empty text for silence
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio`
    async fn transcribe(&self, audio: &Path) -> Result<String>;
}

/// Maps a prompt to a language-model reply
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply to `prompt`
    async fn respond(&self, prompt: &str) -> Result<String>;
}

/// Synthesizes text and plays it back
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speak `text` through the output device
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Accepted `begin_recording` response
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RecordingStarted {
    /// Configured capture duration in seconds
    pub duration_secs: u64,
}

/// Read-only snapshot of the turn state
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnStatus {
    pub recording: bool,
    pub processing: bool,
    pub speaking: bool,
    pub last_transcription: String,
    pub last_response: String,
    pub error: Option<String>,
    /// Seconds since the Unix epoch when the snapshot was taken
    pub timestamp: f64,
}

/// Mutable turn state, only ever touched under the controller's mutex
#[derive(Default)]
struct TurnState {
    recording: bool,
    processing: bool,
    speaking: bool,
    audio_path: Option<PathBuf>,
    last_transcription: String,
    last_response: String,
    error: Option<String>,
    /// Bumped by `begin_recording` and `cancel`; tags spawned tasks
    generation: u64,
    /// In-flight capture task, awaited by the processing task
    capture_task: Option<JoinHandle<()>>,
}

/// Coordinates a single logical conversation turn
///
/// Cheap to clone; clones share the same state and collaborators.
#[derive(Clone)]
pub struct TurnController {
    inner: Arc<TurnInner>,
}

struct TurnInner {
    state: Mutex<TurnState>,
    recorder: Arc<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,
    responder: Arc<dyn Responder>,
    speaker: Arc<dyn Speaker>,
    record_duration: Duration,
}

impl TurnController {
    /// Create a controller over the given collaborators
    #[must_use]
    pub fn new(
        recorder: Arc<dyn Recorder>,
        transcriber: Arc<dyn Transcriber>,
        responder: Arc<dyn Responder>,
        speaker: Arc<dyn Speaker>,
        record_duration: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(TurnInner {
                state: Mutex::new(TurnState::default()),
                recorder,
                transcriber,
                responder,
                speaker,
                record_duration,
            }),
        }
    }

    /// Configured capture duration
    #[must_use]
    pub fn record_duration(&self) -> Duration {
        self.inner.record_duration
    }

    /// Start a new voice turn
    ///
    /// Spawns a fixed-duration capture task and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` if a recording or processing step is
    /// already active. Speaking does not conflict; starting a new turn
    /// while the previous reply plays supersedes it.
    pub fn begin_recording(&self) -> Result<RecordingStarted> {
        let generation;
        {
            let mut state = self.inner.lock();
            if state.recording || state.processing {
                return Err(Error::Conflict("a recording is already active"));
            }

            state.generation += 1;
            generation = state.generation;
            state.recording = true;
            state.processing = false;
            state.speaking = false;
            state.audio_path = None;
            state.last_transcription.clear();
            state.last_response.clear();
            state.error = None;

            let inner = Arc::clone(&self.inner);
            state.capture_task = Some(tokio::spawn(async move {
                inner.run_capture(generation).await;
            }));
        }

        let duration_secs = self.inner.record_duration.as_secs();
        tracing::info!(generation, duration_secs, "recording started");
        Ok(RecordingStarted { duration_secs })
    }

    /// Stop the recording and run transcription, generation and speech
    ///
    /// Spawns the processing task and returns immediately; its outcome is
    /// visible only through subsequent [`get_status`](Self::get_status)
    /// reads.
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` when there is neither an active recording
    /// nor a pending artifact to process.
    pub fn end_recording_and_process(&self) -> Result<()> {
        let generation;
        {
            let mut state = self.inner.lock();
            if !state.recording && state.audio_path.is_none() {
                return Err(Error::Conflict("no active recording"));
            }

            state.recording = false;
            state.processing = true;
            generation = state.generation;

            let capture_task = state.capture_task.take();
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                inner.run_processing(generation, capture_task).await;
            });
        }

        tracing::info!(generation, "processing started");
        Ok(())
    }

    /// Cancel whatever the turn is doing
    ///
    /// Always succeeds. Resets all visible state, deletes any pending
    /// artifact and supersedes in-flight background tasks; it does not
    /// interrupt a collaborator call that is already running.
    pub fn cancel(&self) {
        let pending_artifact;
        {
            let mut state = self.inner.lock();
            pending_artifact = state.audio_path.take();
            state.generation += 1;
            state.recording = false;
            state.processing = false;
            state.speaking = false;
            state.error = None;
            // detach; the task's writes are discarded by the generation bump
            state.capture_task = None;
        }

        if let Some(path) = pending_artifact {
            remove_artifact(&path);
        }
        tracing::info!("turn cancelled");
    }

    /// Snapshot the current turn state
    ///
    /// Never mutates and never waits on in-flight background work.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn get_status(&self) -> TurnStatus {
        let state = self.inner.lock();
        TurnStatus {
            recording: state.recording,
            processing: state.processing,
            speaking: state.speaking,
            last_transcription: state.last_transcription.clone(),
            last_response: state.last_response.clone(),
            error: state.error.clone(),
            timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }
}

impl TurnInner {
    fn lock(&self) -> MutexGuard<'_, TurnState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `apply` only if `generation` is still the current turn
    ///
    /// Returns false when a cancel or newer turn has superseded the caller,
    /// in which case state is left untouched.
    fn update_if_current(&self, generation: u64, apply: impl FnOnce(&mut TurnState)) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(
                generation,
                current = state.generation,
                "discarding stale turn update"
            );
            return false;
        }
        apply(&mut state);
        true
    }

    /// Background capture task body
    async fn run_capture(&self, generation: u64) {
        match self.recorder.capture(self.record_duration).await {
            Ok(path) => {
                // `recording` stays true here: the flag transition belongs
                // to the explicit stop call, not to capture completion.
                let current = self.update_if_current(generation, |state| {
                    state.audio_path = Some(path.clone());
                });
                if current {
                    tracing::debug!(generation, path = %path.display(), "capture complete");
                } else {
                    // turn superseded mid-capture; reclaim the orphan
                    remove_artifact(&path);
                }
            }
            Err(e) => {
                tracing::warn!(generation, error = %e, "capture failed");
                self.update_if_current(generation, |state| {
                    state.recording = false;
                    state.error = Some(e.to_string());
                });
            }
        }
    }

    /// Background processing task body
    async fn run_processing(&self, generation: u64, capture_task: Option<JoinHandle<()>>) {
        // The capture duration is fixed and short; wait it out rather than
        // racing the artifact write.
        if let Some(task) = capture_task {
            if let Err(e) = task.await {
                tracing::warn!(generation, error = %e, "capture task failed to join");
            }
        }

        if let Err(e) = self.process_turn(generation).await {
            tracing::warn!(generation, error = %e, "turn failed");
            self.update_if_current(generation, |state| {
                state.recording = false;
                state.processing = false;
                state.speaking = false;
                state.error = Some(e.to_string());
            });
        }
    }

    /// Transcribe the artifact, generate a reply and speak it
    async fn process_turn(&self, generation: u64) -> Result<()> {
        let audio_path = {
            let state = self.lock();
            if state.generation != generation {
                return Ok(());
            }
            state.audio_path.clone()
        };

        let audio_path = audio_path
            .filter(|p| p.exists())
            .ok_or_else(|| Error::Artifact("audio artifact not found".to_string()))?;

        let transcript = self.transcriber.transcribe(&audio_path).await?;
        remove_artifact(&audio_path);

        let current = self.update_if_current(generation, |state| {
            state.audio_path = None;
            state.last_transcription = transcript.clone();
        });
        if !current {
            return Ok(());
        }

        tracing::info!(generation, transcript = %transcript, "transcription stored");

        if transcript.trim().is_empty() {
            return Err(Error::EmptySpeech);
        }

        let response = self.responder.respond(&transcript).await?;

        let current = self.update_if_current(generation, |state| {
            state.last_response = response.clone();
            state.processing = false;
            state.speaking = true;
        });
        if !current {
            return Ok(());
        }

        tracing::info!(generation, "speaking response");
        self.speaker.speak(&response).await?;

        self.update_if_current(generation, |state| {
            state.speaking = false;
        });
        tracing::debug!(generation, "turn complete");
        Ok(())
    }
}

/// Best-effort artifact cleanup; deletion failures never surface
fn remove_artifact(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "artifact cleanup failed");
    }
}
