//! window-cap-mcp: MCP server for monitor and window capture

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use windowcap_mcp_server::{cli::Cli, config::ServerConfig, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::from_cli(&cli)?;
    logging::init(config.log_format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = config.transport.name(),
        backend = ?config.backend,
        "window-cap-mcp starting"
    );

    let dispatcher = windowcap_mcp_server::start_dispatcher(&config)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("interrupt received, shutting down");
        signal_cancel.cancel();
    });

    let result = windowcap_mcp_server::run(&config, dispatcher.clone(), cancel.clone()).await;
    cancel.cancel();
    dispatcher.shutdown();

    tracing::info!("window-cap-mcp stopped");
    result
}
