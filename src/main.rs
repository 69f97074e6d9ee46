use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pinky_trust::api::ApiServerBuilder;
use pinky_trust::voice::{
    CpalMicrophone, Language, Progress, Recorder, TranscriptionOutcome, play_mp3, play_wav,
};
use pinky_trust::{Config, SpeechPipeline};

/// Pinky Trust - voice gateway for the women's-health chat assistant
#[derive(Parser)]
#[command(name = "pinky", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long, env = "PINKY_PORT")]
    port: Option<u16>,

    /// Directory of web UI files to serve (overrides config)
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Run the HTTP API server (default)
    Serve,
    /// Record from the microphone, validate, replay and optionally transcribe
    TestMic {
        /// Recording length in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
        /// Skip replaying the recording
        #[arg(long)]
        no_replay: bool,
        /// Send the recording for transcription
        #[arg(short, long)]
        transcribe: bool,
        /// Recording language code (e.g. tw, gaa, ee)
        #[arg(short, long)]
        language: Option<Language>,
    },
    /// Synthesize text and play it
    TestTts {
        /// Text to speak
        #[arg(default_value = "Akwaaba! Yɛfrɛ me Pinky. Mepɛ sɛ meboa wo.")]
        text: String,
        /// Language code (e.g. tw, gaa, ee)
        #[arg(short, long)]
        language: Option<Language>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,pinky_trust=info",
        1 => "info,pinky_trust=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = cli.static_dir {
        config.server.static_dir = Some(dir);
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::TestMic {
            duration,
            no_replay,
            transcribe,
            language,
        } => {
            let language = language.unwrap_or(config.default_language);
            test_mic(&config, duration, !no_replay, transcribe.then_some(language)).await
        }
        Command::TestTts { text, language } => {
            test_tts(&config, &text, language.unwrap_or(config.default_language)).await
        }
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        port = config.server.port,
        static_dir = ?config.server.static_dir,
        default_language = %config.default_language,
        "starting pinky trust voice gateway"
    );

    let server = ApiServerBuilder::from_config(config)?.build();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

fn require_pipeline(config: &Config) -> anyhow::Result<SpeechPipeline> {
    config
        .speech_pipeline()?
        .context("GHANANLP_API_KEY is not set; add it to the environment or config file")
}

/// Record from the default microphone with a live level meter
#[allow(clippy::future_not_send)]
async fn test_mic(
    config: &Config,
    duration: u64,
    replay: bool,
    transcribe: Option<Language>,
) -> anyhow::Result<()> {
    println!("Recording for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut recorder = Recorder::new(CpalMicrophone::new(), config.capture);
    recorder.start()?;

    let ticks = duration * 4;
    for _ in 0..ticks {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let level = recorder.level().unwrap_or_default();
        let elapsed = recorder.elapsed().unwrap_or_default();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (level * 200.0).min(50.0) as usize;
        let meter = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);
        println!("[{:5.2}s] RMS: {level:.4} | [{meter}]", elapsed.as_secs_f32());
    }

    if let Err(e) = recorder.stop() {
        println!("\n---");
        println!("Recording rejected: {e}");
        println!("Speak for longer, or check:");
        println!("  1. Is your mic plugged in and unmuted?");
        println!("  2. Run: arecord -l (to list devices)");
        return Err(e.into());
    }

    if let Some(clip) = recorder.recording() {
        println!(
            "\nCaptured {} bytes ({}) over {:.1}s",
            clip.audio.len(),
            clip.mime_type,
            clip.duration.as_secs_f32()
        );
        if replay {
            println!("Replaying...");
            play_wav(clip.audio.clone()).await?;
        }
    }

    let Some(language) = transcribe else {
        recorder.discard()?;
        println!("\nYour mic is working!");
        return Ok(());
    };

    let pipeline = require_pipeline(config)?;
    let recording = recorder.take()?;
    println!("Transcribing ({})...", language.name());

    match pipeline
        .transcribe_recording(&recording, language, &Progress::none())
        .await
    {
        TranscriptionOutcome::Text(text) => println!("Transcript: {text}"),
        TranscriptionOutcome::NoSpeechDetected => println!("No speech detected. Try again."),
        TranscriptionOutcome::Failure(detail) => anyhow::bail!("transcription failed: {detail}"),
    }

    Ok(())
}

/// Synthesize text through the chunking pipeline and play the result
async fn test_tts(config: &Config, text: &str, language: Language) -> anyhow::Result<()> {
    println!("Testing TTS ({}) with text: \"{text}\"\n", language.name());

    let pipeline = require_pipeline(config)?;
    let (progress, mut stages) = Progress::channel();
    let reporter = tokio::spawn(async move {
        while let Some(stage) = stages.recv().await {
            println!("  {stage}");
        }
    });

    let result = pipeline.synthesize_combined(text, language, &progress).await;
    drop(progress);
    let _ = reporter.await;
    let (audio, failed) = result?;

    println!("Got {} bytes of audio", audio.len());
    for chunk in &failed {
        println!("  chunk {} skipped: \"{}\" ({})", chunk.index, chunk.text, chunk.error);
    }

    println!("Playing audio...");
    play_mp3(audio).await?;

    println!("\n---");
    if failed.is_empty() {
        println!("If you heard the speech, TTS is working!");
    } else {
        println!("Partial audio: {} chunk(s) could not be synthesized.", failed.len());
    }

    Ok(())
}
