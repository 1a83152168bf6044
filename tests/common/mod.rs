//! Shared test doubles for the turn controller
//!
//! Collaborators are stubbed so turn tests run without audio hardware or
//! network services.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chorus_gateway::{
    Error, Recorder, Responder, Result, Speaker, Transcriber, TurnController, TurnStatus,
};
use tokio::sync::Notify;

/// Recorder writing a dummy artifact into a directory
pub struct StubRecorder {
    dir: PathBuf,
    delay: Duration,
    fail: bool,
    counter: AtomicUsize,
}

impl StubRecorder {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            delay: Duration::ZERO,
            fail: false,
            counter: AtomicUsize::new(0),
        }
    }

    /// Simulate a slow capture
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Simulate a broken microphone
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Recorder for StubRecorder {
    async fn capture(&self, _duration: Duration) -> Result<PathBuf> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(Error::Audio("microphone unavailable".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("input_{n}.wav"));
        std::fs::write(&path, b"RIFF")?;
        Ok(path)
    }
}

/// Transcriber returning a fixed transcript, optionally gated or failing
pub struct StubTranscriber {
    transcript: String,
    pub calls: Arc<AtomicUsize>,
    gate: Option<Arc<Notify>>,
    fail: bool,
}

impl StubTranscriber {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
            gate: None,
            fail: false,
        }
    }

    /// Block inside transcription until the returned handle is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(Error::Transcription("model crashed".to_string()));
        }
        Ok(self.transcript.clone())
    }
}

/// Responder returning a fixed reply
pub struct StubResponder {
    reply: String,
    pub calls: Arc<AtomicUsize>,
    fail: bool,
}

impl StubResponder {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Responder for StubResponder {
    async fn respond(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Generation("connection refused".to_string()));
        }
        Ok(self.reply.clone())
    }
}

/// Speaker that records invocations, optionally gated
pub struct StubSpeaker {
    pub calls: Arc<AtomicUsize>,
    gate: Option<Arc<Notify>>,
}

impl StubSpeaker {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            gate: None,
        }
    }

    /// Block inside speak until the returned handle is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl Speaker for StubSpeaker {
    async fn speak(&self, _text: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        Ok(())
    }
}

/// Build a controller over the given stubs with a 4-second nominal duration
pub fn controller(
    recorder: StubRecorder,
    transcriber: StubTranscriber,
    responder: StubResponder,
    speaker: StubSpeaker,
) -> Arc<TurnController> {
    Arc::new(TurnController::new(
        Arc::new(recorder),
        Arc::new(transcriber),
        Arc::new(responder),
        Arc::new(speaker),
        Duration::from_secs(4),
    ))
}

/// Poll the status until `pred` holds, panicking after two seconds
pub async fn wait_for(
    controller: &TurnController,
    pred: impl Fn(&TurnStatus) -> bool,
) -> TurnStatus {
    for _ in 0..200 {
        let status = controller.get_status();
        if pred(&status) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "condition not met within 2s; last status: {:?}",
        controller.get_status()
    );
}

/// Invariant from the turn design: the pipeline is strictly sequential
pub fn assert_at_most_one_active(status: &TurnStatus) {
    let active = [status.recording, status.processing, status.speaking]
        .iter()
        .filter(|f| **f)
        .count();
    assert!(active <= 1, "more than one activity flag set: {status:?}");
}
