use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod collaborators;
mod config;
mod detector;
mod dispatch;
mod error;
mod gmail_client;
mod poller;
mod robot;
mod shutdown;
mod speech;
mod state_store;
#[cfg(test)]
mod testing;

use collaborators::{MotionController, Speaker};
use config::NotifierConfig;
use dispatch::Dispatcher;
use gmail_client::GmailClient;
use poller::{Poller, PollerConfig};
use robot::{DemoMotion, ReachyClient};
use shared_types::Tier;
use shutdown::Shutdown;
use speech::{HttpSpeaker, LogSpeaker};
use state_store::StateStore;

#[derive(Parser)]
#[command(name = "reachy-notifier")]
#[command(about = "Watch a Gmail inbox and let Reachy announce new mail")]
struct Cli {
    /// TOML config file. Environment variables (and `.env`) are used when omitted.
    #[arg(short, long, value_name = "FILE", env = "NOTIFIER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the inbox until interrupted (default)
    Run,

    /// Check the inbox once and print how many messages are new
    ///
    /// Uses and updates the persisted state when STATE_PATH is set;
    /// without it the first check always reports zero.
    Check,

    /// Perform one tier's speech and gesture, to test the robot setup
    Gesture {
        /// Tier to perform: a, b or c
        tier: Tier,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before the subscriber so RUST_LOG may come from .env
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reachy_notifier=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A second provider may already be installed by a dependency
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NotifierConfig::load(path)?,
        None => NotifierConfig::from_env()?,
    };
    config.validate()?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Check => check(config).await,
        Command::Gesture { tier } => {
            let dispatcher = build_dispatcher(&config).await?;
            dispatcher
                .perform(tier, dispatch::sample_count(tier))
                .await;
            Ok(())
        }
    }
}

async fn run(config: NotifierConfig) -> Result<()> {
    tracing::info!("Starting Reachy email notifier");

    let mail = connect_gmail(&config).await?;
    let dispatcher = build_dispatcher(&config).await?;

    let mut poller = Poller::new(mail, dispatcher, PollerConfig::from(&config));
    if let Some(path) = &config.state_path {
        poller = poller.with_store(StateStore::new(path));
    }

    let shutdown = Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    tracing::info!(
        "Checking for emails every {} seconds. Press Ctrl+C to stop.",
        config.check_interval_secs
    );
    poller.run(shutdown.subscribe()).await;

    tracing::info!("Goodbye!");
    Ok(())
}

async fn check(config: NotifierConfig) -> Result<()> {
    let mail = connect_gmail(&config).await?;
    let dispatcher = Dispatcher::new(Arc::new(LogSpeaker), Arc::new(DemoMotion));

    let mut poller = Poller::new(mail, dispatcher, PollerConfig::from(&config));
    if let Some(path) = &config.state_path {
        poller = poller.with_store(StateStore::new(path));
    }

    let new_count = poller.check().await.context("Mail check failed")?;
    println!("{} new email(s)", new_count);
    Ok(())
}

async fn connect_gmail(config: &NotifierConfig) -> Result<Arc<GmailClient>> {
    config.require_credentials()?;

    tracing::info!(
        "Connecting to Gmail (credentials: {}, token cache: {})",
        config.gmail_credentials_path.display(),
        config.gmail_token_path.display()
    );
    let client = GmailClient::connect(config)
        .await
        .context("Failed to create Gmail client")?;

    Ok(Arc::new(client))
}

async fn build_dispatcher(config: &NotifierConfig) -> Result<Dispatcher> {
    let speaker: Arc<dyn Speaker> = match &config.tts_url {
        Some(url) => {
            tracing::info!("Speech endpoint: {}", url);
            Arc::new(HttpSpeaker::new(url.clone(), config.request_timeout())?)
        }
        None => Arc::new(LogSpeaker),
    };

    let motion: Arc<dyn MotionController> = if config.demo_mode {
        tracing::info!("Demo mode: gestures will only be logged");
        Arc::new(DemoMotion)
    } else {
        let robot = ReachyClient::new(config.reachy_base_url(), config.request_timeout())?;
        if robot.ping().await {
            tracing::info!("Connected to Reachy at {}", robot.base_url());
            Arc::new(robot)
        } else {
            tracing::warn!(
                "Reachy not reachable at {}, continuing in demo mode",
                robot.base_url()
            );
            Arc::new(DemoMotion)
        }
    };

    Ok(Dispatcher::new(speaker, motion))
}
