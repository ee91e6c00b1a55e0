//! stdio transport: one session over the process's stdin and stdout

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::{ServiceExt, transport::stdio};
use tokio_util::sync::CancellationToken;
use windowcap_core::Dispatcher;

use crate::mcp::WindowCapServer;

/// Serves a single client until stdin closes or `cancel` fires.
pub async fn serve(dispatcher: Arc<Dispatcher>, cancel: CancellationToken) -> Result<()> {
    let server = WindowCapServer::new(dispatcher);
    let service = server
        .serve_with_ct(stdio(), cancel.child_token())
        .await
        .context("stdio session failed to initialize")?;

    tracing::info!(peer = ?service.peer_info(), "stdio session initialized");
    let reason = service.waiting().await.context("stdio session task failed")?;
    tracing::info!(?reason, "stdio session ended");
    Ok(())
}
