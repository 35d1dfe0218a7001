//! Serve command - run the HTTP API until interrupted.

use std::path::PathBuf;

use pile::app::{AppConfig, PileApp};
use pile::logging::init_logging;
use pile::server;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;

/// Overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct ServeArgs {
    pub config: Option<PathBuf>,
    pub port: Option<u16>,
    pub workers: Option<usize>,
}

pub fn run(args: ServeArgs) -> Result<(), CliError> {
    let path = super::config_path(args.config);
    let mut file = super::load_config(&path)?;
    if let Some(port) = args.port {
        file.server.port = port;
    }
    if let Some(workers) = args.workers {
        file.render.workers = (workers > 0).then_some(workers);
    }

    let _logging = init_logging(&file.logging.directory, &file.logging.file)
        .map_err(CliError::LoggingInit)?;
    info!(config = %path.display(), "Loaded configuration");

    let config = AppConfig::from_config_file(&file).map_err(CliError::InvalidConfig)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<(), CliError> {
    let app = PileApp::start(config).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let result = server::serve(
        app.router(),
        app.config().listen,
        shutdown.clone().cancelled_owned(),
    )
    .await;

    app.shutdown().await;
    result.map_err(CliError::Serve)
}

async fn wait_for_signal(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received, shutting down"),
        Err(e) => warn!(error = %e, "Could not listen for Ctrl-C, shutting down"),
    }
    shutdown.cancel();
}
