use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chorus_gateway::api::{ApiServer, ApiState};
use chorus_gateway::turn::Recorder;
use chorus_gateway::voice::AudioPlayback;
use chorus_gateway::{
    Config, MicRecorder, OllamaResponder, Speaker, TurnController, VoiceSpeaker, WhisperClient,
};

/// Chorus - voice assistant gateway over local STT/LLM/TTS
#[derive(Parser)]
#[command(name = "chorus", version, about)]
struct Cli {
    /// Config file path (defaults to ./chorus.toml when present)
    #[arg(short, long, env = "CHORUS_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long, env = "CHORUS_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "4")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output through the production speaker path
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hallo! Dies ist ein Test der Sprachausgabe.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,chorus_gateway=info",
        1 => "info,chorus_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(&config, duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    let port = cli.port.unwrap_or(config.port);
    std::fs::create_dir_all(&config.artifact_dir)?;

    tracing::info!(
        port,
        record_secs = config.record_secs,
        llm_model = %config.llm.model,
        "starting chorus gateway"
    );

    let responder = Arc::new(OllamaResponder::new(&config.llm));
    let controller = Arc::new(TurnController::new(
        Arc::new(MicRecorder::new(config.artifact_dir.clone())),
        Arc::new(WhisperClient::new(&config.stt)),
        responder.clone(),
        Arc::new(VoiceSpeaker::new(&config.tts)),
        Duration::from_secs(config.record_secs),
    ));

    let state = Arc::new(ApiState {
        controller,
        responder,
        llm_model: config.llm.model.clone(),
        stt_model: config.stt.model.clone(),
        record_secs: config.record_secs,
        system_prompt: config.llm.system_prompt.clone(),
    });

    ApiServer::new(state, port).run().await?;

    Ok(())
}

/// Record a short clip and report its levels
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Recording for {duration} seconds... speak into your microphone!");

    std::fs::create_dir_all(&config.artifact_dir)?;
    let recorder = MicRecorder::new(config.artifact_dir.clone());
    let path = recorder.capture(Duration::from_secs(duration)).await?;

    let mut reader = hound::WavReader::open(&path)?;
    let samples: Vec<f32> = reader
        .samples::<i16>()
        .filter_map(std::result::Result::ok)
        .map(|s| f32::from(s) / 32768.0)
        .collect();

    let rms = calculate_rms(&samples);
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

    println!("Captured {} samples", samples.len());
    println!("RMS: {rms:.4} | Peak: {peak:.4}");
    println!("---");
    if rms > 0.001 {
        println!("Your mic is working!");
    } else {
        println!("RMS stayed near 0. Check:");
        println!("  1. Is your mic plugged in?");
        println!("  2. Run: pactl info | grep 'Default Source'");
        println!("  3. Run: arecord -l (to list devices)");
    }

    let _ = std::fs::remove_file(&path);
    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Play a 440Hz test tone
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 24000_f32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    playback.play_samples(samples)?;

    println!("If you heard the tone, your speakers are working!");
    Ok(())
}

/// Synthesize and play text through the production speaker path
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let speaker = VoiceSpeaker::new(&config.tts);
    speaker.speak(text).await?;

    println!("If you heard the speech, TTS is working!");
    Ok(())
}
