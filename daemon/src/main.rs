mod config;
mod export;
mod protocol;
mod server;
mod translator;

use std::path::PathBuf;
use std::sync::Arc;

use adaptive_tamil_core::{FeedbackSink, SessionController};
use anyhow::Result;
use clap::Parser;
use config::DaemonConfig;
use export::Exporters;
use server::{AppState, TranslationServer};
use tracing::info;
use tracing_subscriber::EnvFilter;
use translator::TranslatorRouter;

#[derive(Debug, Parser)]
#[command(name = "adaptive-tamild", version, about = "Adaptive Tamil translation daemon")]
struct Cli {
    /// Config file to load instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve one session on stdin/stdout instead of the unix socket.
    #[arg(long)]
    stdio: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = DaemonConfig::load(cli.config.as_deref())?;
    info!(
        socket = %config.server.socket_path.display(),
        backend = ?config.model.backend,
        target = %config.model.target_language,
        cache_capacity = config.translate.cache_capacity,
        guard_enabled = config.guard.enable,
        feedback_log = %config.feedback.path.display(),
        "loaded adaptive tamil config"
    );

    let simplifier = config.simplify.build()?;
    info!(rules = simplifier.rules().len(), "simplification rules loaded");

    let translator = TranslatorRouter::new(config.model.clone(), config.translate.clone());
    let controller = SessionController::new(
        Arc::new(translator),
        Arc::new(simplifier),
        config.guard.script_guard(),
        Arc::new(FeedbackSink::new(config.feedback.path.clone())),
    );
    let exporters = Exporters::from_config(&config.export);

    let server = TranslationServer::new(
        config.server.clone(),
        AppState::new(controller, exporters),
    );
    if cli.stdio {
        server.run_stdio().await
    } else {
        server.run().await
    }
}
