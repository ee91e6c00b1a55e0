//! Streamable HTTP transport
//!
//! `/mcp` is served by rmcp's [`StreamableHttpService`]. The first POST of a
//! session must be `initialize`; its response carries the new
//! `Mcp-Session-Id` header, which every later request repeats. Each request
//! POST is answered with a `text/event-stream` body that ends after the
//! response, so large captures are streamed rather than buffered.
//! `GET /mcp` opens the session's stream for server-initiated messages and
//! `DELETE /mcp` ends the session.
//!
//! Sessions that see no client traffic for [`HttpConfig::session_idle`] are
//! closed, so clients that vanish without a DELETE do not pile up.

use std::{net::SocketAddr, sync::Arc};

use http_body_util::BodyExt;
use hyper::{Request, StatusCode, body::Incoming};
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService,
    session::local::{LocalSessionManager, SessionConfig},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use windowcap_core::Dispatcher;

use super::{ResponseFuture, accept_loop, bind, status};
use crate::{config::HttpConfig, mcp::WindowCapServer};

pub const MCP_PATH: &str = "/mcp";
pub const SESSION_HEADER: &str = "mcp-session-id";

type McpService = StreamableHttpService<WindowCapServer, LocalSessionManager>;

/// A bound streamable-HTTP listener; call [`HttpServer::run`] to serve it.
pub struct HttpServer {
    listener: TcpListener,
    service:  McpService,
    sessions: Arc<LocalSessionManager>,
    cancel:   CancellationToken,
}

impl HttpServer {
    pub async fn bind(
        config: &HttpConfig,
        dispatcher: Arc<Dispatcher>,
        cancel: CancellationToken,
    ) -> std::io::Result<Self> {
        let listener = bind(config.bind, "http").await?;

        let sessions = Arc::new(LocalSessionManager {
            sessions:       Default::default(),
            session_config: SessionConfig {
                keep_alive: Some(config.session_idle),
                ..SessionConfig::default()
            },
        });
        let service = StreamableHttpService::new(
            move || Ok(WindowCapServer::new(dispatcher.clone())),
            sessions.clone(),
            StreamableHttpServerConfig {
                sse_keep_alive:     Some(config.sse_keep_alive),
                stateful_mode:      true,
                cancellation_token: cancel.child_token(),
            },
        );

        Ok(Self {
            listener,
            service,
            sessions,
            cancel,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Session table shared with the running service.
    pub fn session_manager(&self) -> Arc<LocalSessionManager> {
        self.sessions.clone()
    }

    /// Serves until the cancellation token fires.
    pub async fn run(self) {
        let service = self.service;
        accept_loop(self.listener, self.cancel, "http", move |req| {
            handle(service.clone(), req)
        })
        .await;
    }
}

fn handle(service: McpService, req: Request<Incoming>) -> ResponseFuture {
    Box::pin(async move {
        if req.uri().path() != MCP_PATH {
            return status(StatusCode::NOT_FOUND, "not found");
        }
        tracing::trace!(method = %req.method(), "mcp request");
        service.handle(req).await.map(|body| body.boxed_unsync())
    })
}
