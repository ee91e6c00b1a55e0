//! windowcap-mcp-server: MCP tool server for monitor and window capture
//!
//! Exposes the `windowcap-core` operations as MCP tools over one of three
//! transports (stdio, HTTP+SSE, streamable HTTP). Every session, whatever
//! its transport, submits work to the same [`Dispatcher`] so platform
//! captures stay serialized on the one capture context.
//!
//! [`Dispatcher`]: windowcap_core::Dispatcher

pub mod cli;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod mcp_content;
pub mod transport;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use windowcap_core::{
    CaptureEngine, Dispatcher,
    capture::{create_default_backend, create_mock_backend},
};

use crate::{
    config::{BackendChoice, ServerConfig, TransportConfig},
    transport::{HttpServer, SseServer},
};

/// Builds the engine and starts the capture context for `config`.
pub fn start_dispatcher(config: &ServerConfig) -> Result<Arc<Dispatcher>> {
    let backend = match config.backend {
        BackendChoice::Mock => create_mock_backend(),
        BackendChoice::Auto => create_default_backend(config.engine.capture_timeout)
            .context("no capture backend for this session; use --mock to run without a display")?,
    };
    let engine = Arc::new(CaptureEngine::with_config(backend, config.engine));
    Dispatcher::start(engine).context("failed to start the capture context")
}

/// Runs the configured transport until it finishes or `cancel` fires.
pub async fn run(config: &ServerConfig, dispatcher: Arc<Dispatcher>, cancel: CancellationToken) -> Result<()> {
    tracing::info!(transport = config.transport.name(), "starting transport");
    match &config.transport {
        TransportConfig::Stdio => transport::stdio::serve(dispatcher, cancel).await,
        TransportConfig::Sse(sse) => {
            let server = SseServer::bind(sse, dispatcher, cancel)
                .await
                .with_context(|| format!("failed to bind SSE listener on {}", sse.bind))?;
            server.run().await;
            Ok(())
        }
        TransportConfig::Http(http) => {
            let server = HttpServer::bind(http, dispatcher, cancel)
                .await
                .with_context(|| format!("failed to bind HTTP listener on {}", http.bind))?;
            server.run().await;
            Ok(())
        }
    }
}
