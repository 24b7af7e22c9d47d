use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use sysaudio_stt::{
    AudioBackendConfig, AudioBackendFactory, AudioSource, Config, Credentials, SessionCoordinator,
    TokenManager,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Stream live system audio to a realtime STT service and print captions
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to a TOML config file overriding the built-in defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Transcribe a 16-bit WAV file instead of capturing system audio
    #[arg(long)]
    wav: Option<String>,
}

/// Grace period after stopping, letting in-flight network closes finish
const SETTLE_DELAY: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;
    let credentials = Credentials::from_env()?;

    info!("System audio STT starting (press Ctrl+C to quit)");

    let source = match cli.wav {
        Some(path) => AudioSource::File(path),
        None => AudioSource::System,
    };
    let backend = AudioBackendFactory::create(
        source,
        AudioBackendConfig {
            sample_rate: cfg.stt.sample_rate,
            channels: cfg.stt.channels,
        },
    )?;

    let tokens = TokenManager::new(
        cfg.api.token_url,
        credentials.client_id,
        credentials.client_secret,
    );

    let coordinator = SessionCoordinator::new(cfg.api.stream_url, cfg.stt, tokens, backend);

    // Ctrl+C cancels; the pump loop observes the token and tears down.
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        }
    });

    let result = coordinator.run(shutdown).await;

    tokio::time::sleep(SETTLE_DELAY).await;
    info!("System audio STT stopped");

    result
}
