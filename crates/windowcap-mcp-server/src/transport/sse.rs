//! HTTP+SSE transport
//!
//! `GET /sse` opens a session. The stream starts with an `endpoint` event
//! naming the URL to post to; every server message then arrives as a
//! `message` event. Clients post JSON-RPC to
//! `POST /message?sessionId=<id>` and get `202 Accepted` back; the actual
//! response shows up on the stream.
//!
//! Closing the stream ends its session and nothing else.

use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use futures::stream;
use http_body_util::{BodyExt, StreamBody};
use hyper::{
    Method, Request, Response, StatusCode,
    body::{Bytes, Frame, Incoming},
    header,
};
use parking_lot::Mutex;
use tokio::{net::TcpListener, sync::mpsc, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use windowcap_core::Dispatcher;

use super::{
    BoxBody, ResponseFuture, SessionBridge, accept_loop, bind, empty, method_not_allowed, status,
    transport_error,
};
use crate::{config::SseConfig, mcp::WindowCapServer};

pub const SSE_PATH: &str = "/sse";
pub const MESSAGE_PATH: &str = "/message";

type Sessions = Arc<Mutex<HashMap<String, SessionBridge>>>;

struct SseState {
    dispatcher: Arc<Dispatcher>,
    sessions:   Sessions,
    keep_alive: Duration,
    cancel:     CancellationToken,
}

/// A bound SSE listener; call [`SseServer::run`] to serve it.
pub struct SseServer {
    listener: TcpListener,
    state:    Arc<SseState>,
}

impl SseServer {
    pub async fn bind(
        config: &SseConfig,
        dispatcher: Arc<Dispatcher>,
        cancel: CancellationToken,
    ) -> std::io::Result<Self> {
        let listener = bind(config.bind, "sse").await?;
        Ok(Self {
            listener,
            state: Arc::new(SseState {
                dispatcher,
                sessions: Arc::default(),
                keep_alive: config.keep_alive,
                cancel,
            }),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until the cancellation token fires.
    pub async fn run(self) {
        let state = self.state;
        let cancel = state.cancel.clone();
        accept_loop(self.listener, cancel, "sse", move |req| -> ResponseFuture {
            let state = Arc::clone(&state);
            Box::pin(async move { handle(state, req).await })
        })
        .await;
    }
}

async fn handle(state: Arc<SseState>, req: Request<Incoming>) -> Response<BoxBody> {
    match req.uri().path() {
        SSE_PATH => match *req.method() {
            Method::GET => open_stream(&state),
            _ => method_not_allowed("GET"),
        },
        MESSAGE_PATH => match *req.method() {
            Method::POST => post_message(&state, req).await,
            _ => method_not_allowed("POST"),
        },
        _ => status(StatusCode::NOT_FOUND, "not found"),
    }
}

fn open_stream(state: &Arc<SseState>) -> Response<BoxBody> {
    let id = uuid::Uuid::new_v4().to_string();
    let server = WindowCapServer::new(Arc::clone(&state.dispatcher));
    let (bridge, outbound) = SessionBridge::spawn(id.clone(), server, &state.cancel);
    state.sessions.lock().insert(id.clone(), bridge.clone());
    tracing::info!(session = %id, "sse session opened");

    let mut keep_alive = tokio::time::interval(state.keep_alive);
    keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let stream_state = StreamState {
        endpoint: Some(format!("{MESSAGE_PATH}?sessionId={id}")),
        outbound,
        keep_alive,
        cancel: state.cancel.clone(),
        _guard: SessionGuard {
            id,
            sessions: Arc::clone(&state.sessions),
            bridge,
        },
    };

    let events = stream::unfold(stream_state, |mut st| async move {
        if let Some(endpoint) = st.endpoint.take() {
            // Consume the immediate first tick so keep-alives start one period out
            st.keep_alive.reset();
            return Some((Ok::<_, Infallible>(Frame::data(event("endpoint", &endpoint))), st));
        }
        let chunk = tokio::select! {
            _ = st.cancel.cancelled() => return None,
            message = st.outbound.recv() => match message {
                Some(message) => event("message", &message),
                None => return None,
            },
            _ = st.keep_alive.tick() => Bytes::from_static(b": keep-alive\n\n"),
        };
        Some((Ok(Frame::data(chunk)), st))
    });

    let mut response = Response::new(StreamBody::new(events).boxed_unsync());
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
    response
}

async fn post_message(state: &Arc<SseState>, req: Request<Incoming>) -> Response<BoxBody> {
    let Some(session_id) = session_param(req.uri().query()) else {
        return status(StatusCode::BAD_REQUEST, "missing sessionId query parameter");
    };
    let Some(bridge) = state.sessions.lock().get(&session_id).cloned() else {
        return status(StatusCode::NOT_FOUND, "unknown session");
    };

    let body = match req.into_body().collect().await {
        Ok(body) => body.to_bytes(),
        Err(e) => {
            return transport_error(
                StatusCode::BAD_REQUEST,
                &session_id,
                format!("unreadable request body: {e}"),
            );
        }
    };
    let message: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            return transport_error(
                StatusCode::BAD_REQUEST,
                &session_id,
                format!("malformed JSON-RPC message: {e}"),
            );
        }
    };

    if !bridge.send(message.to_string()) {
        return transport_error(StatusCode::NOT_FOUND, &session_id, "session closed");
    }
    let mut response = Response::new(empty());
    *response.status_mut() = StatusCode::ACCEPTED;
    response
}

fn session_param(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "sessionId")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn event(name: &str, data: &str) -> Bytes {
    let mut out = format!("event: {name}\n");
    for line in data.lines() {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    Bytes::from(out)
}

struct StreamState {
    endpoint:   Option<String>,
    outbound:   mpsc::UnboundedReceiver<String>,
    keep_alive: tokio::time::Interval,
    cancel:     CancellationToken,
    _guard:     SessionGuard,
}

/// Removes and closes the session when its stream is dropped.
struct SessionGuard {
    id:       String,
    sessions: Sessions,
    bridge:   SessionBridge,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.lock().remove(&self.id);
        self.bridge.close();
        tracing::info!(session = %self.id, "sse session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_param() {
        assert_eq!(session_param(Some("sessionId=abc")), Some("abc".to_string()));
        assert_eq!(session_param(Some("x=1&sessionId=abc")), Some("abc".to_string()));
        assert_eq!(session_param(Some("sessionId=")), None);
        assert_eq!(session_param(Some("other=1")), None);
        assert_eq!(session_param(None), None);
    }

    #[test]
    fn test_event_framing() {
        assert_eq!(
            event("endpoint", "/message?sessionId=1"),
            Bytes::from_static(b"event: endpoint\ndata: /message?sessionId=1\n\n")
        );
        assert_eq!(
            event("message", "a\nb"),
            Bytes::from_static(b"event: message\ndata: a\ndata: b\n\n")
        );
    }
}
