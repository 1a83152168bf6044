//! Turn controller lifecycle tests
//!
//! Exercises the state machine, conflict handling, cancellation and the
//! generation check against stubbed collaborators.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chorus_gateway::Error;
use tokio::sync::Notify;

mod common;
use common::{
    StubRecorder, StubResponder, StubSpeaker, StubTranscriber, assert_at_most_one_active,
    controller, wait_for,
};

#[tokio::test]
async fn begin_recording_reports_duration_and_flags() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()).with_delay(Duration::from_millis(100)),
        StubTranscriber::new("hallo"),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    let started = turn.begin_recording().unwrap();
    assert_eq!(started.duration_secs, 4);

    let status = turn.get_status();
    assert!(status.recording);
    assert!(!status.processing);
    assert!(!status.speaking);
    assert!(status.error.is_none());
}

#[tokio::test]
async fn begin_recording_conflicts_while_recording() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()).with_delay(Duration::from_millis(200)),
        StubTranscriber::new("hallo"),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    turn.begin_recording().unwrap();
    let err = turn.begin_recording().unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // rejected request left the state untouched
    let status = turn.get_status();
    assert!(status.recording);
    assert!(status.error.is_none());
}

#[tokio::test]
async fn begin_recording_conflicts_while_processing() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(Notify::new());
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        StubTranscriber::new("hallo").gated(gate.clone()),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    turn.begin_recording().unwrap();
    turn.end_recording_and_process().unwrap();
    wait_for(&turn, |s| s.processing).await;

    let err = turn.begin_recording().unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    gate.notify_one();
    wait_for(&turn, |s| !s.processing && !s.speaking).await;
}

#[tokio::test]
async fn stop_without_recording_or_artifact_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        StubTranscriber::new("hallo"),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    let err = turn.end_recording_and_process().unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let status = turn.get_status();
    assert!(!status.recording && !status.processing && !status.speaking);
}

#[tokio::test]
async fn full_turn_stores_transcript_and_response() {
    let dir = tempfile::tempdir().unwrap();
    let transcriber = StubTranscriber::new("wie spät ist es");
    let responder = StubResponder::new("es ist drei uhr");
    let speaker = StubSpeaker::new();
    let responder_calls = responder.calls.clone();
    let speaker_calls = speaker.calls.clone();

    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        transcriber,
        responder,
        speaker,
    );

    turn.begin_recording().unwrap();
    turn.end_recording_and_process().unwrap();

    let status = wait_for(&turn, |s| !s.processing && !s.speaking).await;
    assert_eq!(status.last_transcription, "wie spät ist es");
    assert_eq!(status.last_response, "es ist drei uhr");
    assert!(status.error.is_none());
    assert_eq!(responder_calls.load(Ordering::SeqCst), 1);
    assert_eq!(speaker_calls.load(Ordering::SeqCst), 1);

    // the artifact was consumed and deleted
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn stop_waits_out_a_capture_still_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()).with_delay(Duration::from_millis(100)),
        StubTranscriber::new("hallo"),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    turn.begin_recording().unwrap();
    // stop immediately, long before the fixed-duration capture finishes
    turn.end_recording_and_process().unwrap();

    let status = wait_for(&turn, |s| !s.processing && !s.speaking).await;
    assert_eq!(status.last_transcription, "hallo");
    assert!(status.error.is_none());
}

#[tokio::test]
async fn whitespace_transcript_reports_no_speech_and_skips_downstream() {
    let dir = tempfile::tempdir().unwrap();
    let transcriber = StubTranscriber::new("  \n ");
    let responder = StubResponder::new("unreachable");
    let speaker = StubSpeaker::new();
    let responder_calls = responder.calls.clone();
    let speaker_calls = speaker.calls.clone();

    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        transcriber,
        responder,
        speaker,
    );

    turn.begin_recording().unwrap();
    turn.end_recording_and_process().unwrap();

    let status = wait_for(&turn, |s| s.error.is_some()).await;
    assert_eq!(status.error.as_deref(), Some("no speech detected"));
    assert!(!status.processing);
    assert_eq!(responder_calls.load(Ordering::SeqCst), 0);
    assert_eq!(speaker_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn capture_failure_surfaces_through_status() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()).failing(),
        StubTranscriber::new("hallo"),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    turn.begin_recording().unwrap();

    let status = wait_for(&turn, |s| s.error.is_some()).await;
    assert!(!status.recording);
    assert!(status.error.unwrap().contains("microphone unavailable"));
}

#[tokio::test]
async fn responder_failure_clears_flags_and_sets_error() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        StubTranscriber::new("hallo"),
        StubResponder::new("unused").failing(),
        StubSpeaker::new(),
    );

    turn.begin_recording().unwrap();
    turn.end_recording_and_process().unwrap();

    let status = wait_for(&turn, |s| s.error.is_some()).await;
    assert!(!status.recording && !status.processing && !status.speaking);
    assert!(status.error.unwrap().contains("generation error"));
}

#[tokio::test]
async fn new_turn_clears_previous_results_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        StubTranscriber::new("erste frage"),
        StubResponder::new("erste antwort"),
        StubSpeaker::new(),
    );

    turn.begin_recording().unwrap();
    turn.end_recording_and_process().unwrap();
    let status = wait_for(&turn, |s| !s.processing && !s.speaking).await;
    assert_eq!(status.last_response, "erste antwort");

    // before any background work completes, the slate is already clean
    turn.begin_recording().unwrap();
    let status = turn.get_status();
    assert!(status.recording);
    assert_eq!(status.last_transcription, "");
    assert_eq!(status.last_response, "");
    assert!(status.error.is_none());
}

#[tokio::test]
async fn cancel_resets_everything_and_deletes_the_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        StubTranscriber::new("hallo"),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    turn.begin_recording().unwrap();
    // wait for the capture to publish its artifact
    for _ in 0..100 {
        if std::fs::read_dir(dir.path()).unwrap().count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    turn.cancel();

    let status = turn.get_status();
    assert!(!status.recording && !status.processing && !status.speaking);
    assert!(status.error.is_none());

    // deletion may happen in a superseded background task
    for _ in 0..100 {
        if std::fs::read_dir(dir.path()).unwrap().count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn cancel_on_idle_is_harmless() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        StubTranscriber::new("hallo"),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    turn.cancel();
    turn.cancel();

    let status = turn.get_status();
    assert!(!status.recording && !status.processing && !status.speaking);
    assert!(status.error.is_none());
}

#[tokio::test]
async fn stale_processing_task_cannot_write_after_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(Notify::new());
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        StubTranscriber::new("verspätet").gated(gate.clone()),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    turn.begin_recording().unwrap();
    turn.end_recording_and_process().unwrap();
    wait_for(&turn, |s| s.processing).await;

    turn.cancel();
    let status = turn.get_status();
    assert!(!status.processing);

    // let the superseded transcription finish; its writes must be discarded
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = turn.get_status();
    assert!(!status.recording && !status.processing && !status.speaking);
    assert_eq!(status.last_transcription, "");
    assert!(status.error.is_none());
}

#[tokio::test]
async fn stale_speaking_task_cannot_flip_flags_after_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(Notify::new());
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()),
        StubTranscriber::new("hallo"),
        StubResponder::new("guten tag"),
        StubSpeaker::new().gated(gate.clone()),
    );

    turn.begin_recording().unwrap();
    turn.end_recording_and_process().unwrap();
    wait_for(&turn, |s| s.speaking).await;

    turn.cancel();
    let status = turn.get_status();
    assert!(!status.speaking && status.error.is_none());

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = turn.get_status();
    assert!(!status.recording && !status.processing && !status.speaking);
}

#[tokio::test]
async fn at_most_one_activity_flag_throughout_a_turn() {
    let dir = tempfile::tempdir().unwrap();
    let turn = controller(
        StubRecorder::new(dir.path().to_path_buf()).with_delay(Duration::from_millis(30)),
        StubTranscriber::new("hallo"),
        StubResponder::new("guten tag"),
        StubSpeaker::new(),
    );

    turn.begin_recording().unwrap();
    assert_at_most_one_active(&turn.get_status());

    turn.end_recording_and_process().unwrap();

    for _ in 0..200 {
        let status = turn.get_status();
        assert_at_most_one_active(&status);
        if !status.recording && !status.processing && !status.speaking {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let status = turn.get_status();
    assert!(status.error.is_none());
    assert_eq!(status.last_response, "guten tag");
}
