//! Transports carrying MCP sessions
//!
//! Exactly one transport runs per process:
//!
//! - [`stdio`]: a single session over stdin/stdout
//! - [`sse`]: HTTP+SSE, one session per `GET /sse` stream
//! - [`http`]: streamable HTTP, sessions keyed by `Mcp-Session-Id`
//!
//! Every network session gets its own
//! [`WindowCapServer`](crate::mcp::WindowCapServer): SSE attaches it through
//! [`session::SessionBridge`], streamable HTTP through rmcp's session
//! manager. None of them touches the capture engine; all work goes through
//! the shared dispatcher.

pub mod http;
pub mod session;
pub mod sse;
pub mod stdio;

use std::{convert::Infallible, net::SocketAddr};

use http_body_util::{BodyExt, Empty, Full, combinators::UnsyncBoxBody};
use hyper::{Response, StatusCode, body::Bytes, header};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use windowcap_core::CaptureError;

use crate::mcp_content::error_body;

pub use self::{http::HttpServer, session::SessionBridge, sse::SseServer};

pub(crate) type BoxBody = UnsyncBoxBody<Bytes, Infallible>;

pub(crate) fn full(bytes: impl Into<Bytes>) -> BoxBody {
    Full::new(bytes.into()).boxed_unsync()
}

pub(crate) fn empty() -> BoxBody {
    Empty::new().boxed_unsync()
}

pub(crate) fn status(code: StatusCode, message: &str) -> Response<BoxBody> {
    let mut response = Response::new(full(message.to_string()));
    *response.status_mut() = code;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// JSON error body for a fault in the transport itself rather than in a tool
/// call, e.g. a message that is not JSON-RPC or a session that has closed.
pub(crate) fn transport_error(
    code: StatusCode,
    session: &str,
    reason: impl Into<String>,
) -> Response<BoxBody> {
    let error = CaptureError::Transport {
        reason: reason.into(),
    };
    tracing::debug!(session, kind = %error.kind(), error = %error, "transport fault");

    let mut response = Response::new(full(error_body(&error)));
    *response.status_mut() = code;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

pub(crate) fn method_not_allowed(allow: &'static str) -> Response<BoxBody> {
    let mut response = status(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    response
        .headers_mut()
        .insert(header::ALLOW, header::HeaderValue::from_static(allow));
    response
}

/// Accepts connections until `cancel` fires, serving each with `handler`.
pub(crate) async fn accept_loop<S>(
    listener: TcpListener,
    cancel: CancellationToken,
    transport: &'static str,
    service: S,
) where
    S: Fn(hyper::Request<hyper::body::Incoming>) -> ResponseFuture + Clone + Send + 'static,
{
    loop {
        let (stream, peer) = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(transport, error = %e, "accept failed");
                    continue;
                }
            },
        };
        tracing::debug!(transport, %peer, "connection accepted");

        let service = service.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let hyper_service = hyper::service::service_fn(move |req| {
                let fut = service(req);
                async move { Ok::<_, Infallible>(fut.await) }
            });
            let conn = hyper::server::conn::http1::Builder::new().serve_connection(io, hyper_service);
            tokio::pin!(conn);
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(e) = result {
                        tracing::debug!(transport, %peer, error = %e, "connection closed with error");
                    }
                }
                _ = cancel.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    let _ = conn.await;
                }
            }
        });
    }
    tracing::info!(transport, "accept loop stopped");
}

pub(crate) type ResponseFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Response<BoxBody>> + Send>>;

/// Binds a listener, logging the address actually bound.
pub(crate) async fn bind(addr: SocketAddr, transport: &'static str) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(transport, addr = %listener.local_addr()?, "listening");
    Ok(listener)
}
