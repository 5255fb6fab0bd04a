use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parla_live::{Config, Language, SessionConfig, SessionController, Voice, WsLiveClient};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "parla-live", about = "Realtime voice conversation practice")]
struct Cli {
    /// Practice language (english, spanish, french, german, italian,
    /// portuguese, japanese, korean)
    #[arg(long, default_value = "french")]
    language: Language,

    /// Voice for synthesized speech (puck, charon, kore, fenrir, aoede,
    /// leda, orus, zephyr)
    #[arg(long, default_value = "kore")]
    voice: Voice,

    /// Config file path (extension optional)
    #[arg(long, default_value = "config/parla-live")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let api_key = std::env::var(&cfg.live.api_key_env)
        .with_context(|| format!("{} is not set", cfg.live.api_key_env))?;
    let live = Arc::new(WsLiveClient::new(cfg.live.url.clone(), api_key));

    let session_config = SessionConfig {
        input_sample_rate: cfg.audio.input_sample_rate,
        output_sample_rate: cfg.audio.output_sample_rate,
        frame_samples: cfg.audio.frame_samples,
        ..SessionConfig::default()
    };

    let mut controller = SessionController::new(live, session_config);

    let mut status_rx = controller.subscribe_status();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow();
            info!(?status, "Status changed");
        }
    });

    controller.start(cli.language, cli.voice).await?;
    info!(
        "Practicing {} with voice {} - press Ctrl-C to stop",
        cli.language, cli.voice
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    controller.stop().await;

    for turn in controller.transcript() {
        if turn.user_text.is_empty() && turn.model_text.is_empty() {
            continue;
        }
        println!("you:   {}", turn.user_text);
        println!("model: {}", turn.model_text);
    }

    Ok(())
}
