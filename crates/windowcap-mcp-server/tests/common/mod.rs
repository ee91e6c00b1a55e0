//! Shared fixtures for server integration tests
//!
//! [`McpClient`] speaks newline-delimited JSON-RPC to an in-process
//! [`WindowCapServer`], the same framing the stdio transport uses. The
//! `http_*`/`spawn_*` helpers drive the network transports with a plain
//! hyper client on an ephemeral loopback port.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use http_body_util::{BodyExt, Full};
use hyper::{
    HeaderMap, Method, Request, Response, StatusCode,
    body::{Bytes, Incoming},
};
use hyper_util::rt::TokioIo;
use rmcp::{ServiceExt, transport::streamable_http_server::session::local::LocalSessionManager};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf},
    net::TcpStream,
};
use tokio_util::sync::CancellationToken;
use windowcap_core::{
    CaptureEngine, Dispatcher,
    capture::{MockBackend, composite_from_mock},
};
use windowcap_mcp_server::{
    config::{HttpConfig, SseConfig},
    mcp::WindowCapServer,
    transport::{HttpServer, SseServer},
};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Running dispatcher over a mock backend; the mock is returned for probing.
pub fn mock_dispatcher(mock: MockBackend) -> (Arc<Dispatcher>, Arc<MockBackend>) {
    let mock = Arc::new(mock);
    let engine = CaptureEngine::new(Arc::new(composite_from_mock(mock.clone())));
    let dispatcher = Dispatcher::start(Arc::new(engine)).expect("capture context should start");
    (dispatcher, mock)
}

pub fn initialize_request(id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "windowcap-tests", "version": "0.0.0"}
        }
    })
}

pub fn initialized_notification() -> Value {
    json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
}

pub fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

/// First text block of a `tools/call` result.
pub fn result_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .unwrap_or_else(|| panic!("no text content in {response}"))
}

pub fn is_error_result(response: &Value) -> bool {
    response["result"]["isError"].as_bool() == Some(true)
}

/// JSON-RPC client over an in-memory duplex connected to a server session.
pub struct McpClient {
    lines:   Lines<BufReader<ReadHalf<tokio::io::DuplexStream>>>,
    writer:  WriteHalf<tokio::io::DuplexStream>,
    next_id: u64,
}

impl McpClient {
    /// Connects and completes the initialize handshake.
    pub async fn connect(server: WindowCapServer) -> Self {
        let (client_side, server_side) = tokio::io::duplex(1 << 20);
        tokio::spawn(async move {
            if let Ok(running) = server.serve(tokio::io::split(server_side)).await {
                let _ = running.waiting().await;
            }
        });
        let (read, writer) = tokio::io::split(client_side);
        let mut client = Self {
            lines: BufReader::new(read).lines(),
            writer,
            next_id: 1,
        };

        let init = client.request("initialize", initialize_request(0)["params"].clone()).await;
        assert_eq!(init["result"]["serverInfo"]["name"], "window-cap-mcp");
        client.send(&initialized_notification()).await;
        client
    }

    pub async fn send(&mut self, message: &Value) {
        let mut line = message.to_string().into_bytes();
        line.push(b'\n');
        self.writer.write_all(&line).await.expect("write to session");
    }

    /// Sends a request and returns its response, skipping notifications.
    pub async fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        self.response_for(id).await
    }

    pub async fn response_for(&mut self, id: u64) -> Value {
        loop {
            let line = tokio::time::timeout(TIMEOUT, self.lines.next_line())
                .await
                .expect("timed out waiting for response")
                .expect("read from session")
                .expect("session closed");
            let message: Value = serde_json::from_str(&line).expect("server sent invalid JSON");
            if message["id"] == json!(id) {
                return message;
            }
        }
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Value {
        self.request("tools/call", json!({"name": name, "arguments": arguments}))
            .await
    }
}

/// Status, headers and collected body of an HTTP exchange.
pub struct HttpReply {
    pub status:  StatusCode,
    pub headers: HeaderMap,
    pub body:    Bytes,
}

impl HttpReply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("body is not JSON ({e}): {:?}", self.body))
    }

    /// JSON-RPC messages carried by a `text/event-stream` body.
    pub fn messages(&self) -> Vec<Value> {
        let text = std::str::from_utf8(&self.body).expect("utf-8 event stream");
        sse_data(text)
            .iter()
            .map(|data| serde_json::from_str(data).expect("event data is JSON"))
            .collect()
    }

    /// The JSON-RPC response in an event-stream body.
    pub fn response(&self) -> Value {
        self.messages()
            .into_iter()
            .find(|m| m.get("id").is_some())
            .unwrap_or_else(|| panic!("no response in {:?}", self.body))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Sends one request on a fresh connection and returns the streaming response.
pub async fn http_open(
    addr: SocketAddr,
    method: Method,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<String>,
) -> Response<Incoming> {
    let stream = TcpStream::connect(addr).await.expect("connect");
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .expect("http handshake");
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("host", addr.to_string());
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(Full::new(Bytes::from(body.unwrap_or_default())))
        .expect("valid request");

    tokio::time::timeout(TIMEOUT, sender.send_request(request))
        .await
        .expect("timed out waiting for response headers")
        .expect("send request")
}

/// Sends one request and collects the whole response.
pub async fn http_send(
    addr: SocketAddr,
    method: Method,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<String>,
) -> HttpReply {
    let response = http_open(addr, method, path, headers, body).await;
    let status = response.status();
    let headers = response.headers().clone();
    let body = tokio::time::timeout(TIMEOUT, response.into_body().collect())
        .await
        .expect("timed out reading body")
        .expect("read body")
        .to_bytes();
    HttpReply {
        status,
        headers,
        body,
    }
}

/// Loopback address with an OS-assigned port.
pub fn ephemeral() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

pub struct RunningTransport {
    pub addr:   SocketAddr,
    pub cancel: CancellationToken,
}

impl Drop for RunningTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Streamable-HTTP listener plus its session table.
pub async fn spawn_http(
    dispatcher: Arc<Dispatcher>,
    session_idle: Duration,
) -> (RunningTransport, Arc<LocalSessionManager>) {
    let cancel = CancellationToken::new();
    let config = HttpConfig {
        bind: ephemeral(),
        sse_keep_alive: Duration::from_secs(15),
        session_idle,
    };
    let server = HttpServer::bind(&config, dispatcher, cancel.clone())
        .await
        .expect("bind http");
    let addr = server.local_addr().expect("local addr");
    let sessions = server.session_manager();
    tokio::spawn(server.run());
    (RunningTransport { addr, cancel }, sessions)
}

pub async fn session_count(sessions: &LocalSessionManager) -> usize {
    sessions.sessions.read().await.len()
}

pub async fn spawn_sse(dispatcher: Arc<Dispatcher>, keep_alive: Duration) -> RunningTransport {
    let cancel = CancellationToken::new();
    let config = SseConfig {
        bind: ephemeral(),
        keep_alive,
    };
    let server = SseServer::bind(&config, dispatcher, cancel.clone())
        .await
        .expect("bind sse");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.run());
    RunningTransport { addr, cancel }
}

/// One parsed SSE block; comments have an empty `event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data:  String,
}

/// Incremental reader over an open `text/event-stream` body.
pub struct SseReader {
    body:   Incoming,
    buffer: String,
}

impl SseReader {
    pub fn new(response: Response<Incoming>) -> Self {
        Self {
            body:   response.into_body(),
            buffer: String::new(),
        }
    }

    /// Next block, or `None` when the stream ended.
    pub async fn next(&mut self) -> Option<SseEvent> {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                return Some(parse_block(block.trim_end()));
            }
            let frame = tokio::time::timeout(TIMEOUT, self.body.frame())
                .await
                .expect("timed out waiting for an SSE event")?
                .expect("read SSE frame");
            if let Ok(data) = frame.into_data() {
                self.buffer.push_str(std::str::from_utf8(&data).expect("utf-8 event stream"));
            }
        }
    }

    /// Next `message` event parsed as JSON, skipping comments.
    pub async fn next_message(&mut self) -> Value {
        loop {
            let event = self.next().await.expect("stream ended before a message");
            if event.event == "message" {
                return serde_json::from_str(&event.data).expect("message data is JSON");
            }
        }
    }
}

/// `data` payloads of every event in a complete event-stream body.
fn sse_data(text: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut data: Vec<&str> = Vec::new();
    for line in text.lines().chain(std::iter::once("")) {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !data.is_empty() {
                events.push(data.join("\n"));
                data.clear();
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    events
}

fn parse_block(block: &str) -> SseEvent {
    let mut event = String::new();
    let mut data = Vec::new();
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("event: ") {
            event = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("data: ") {
            data.push(rest);
        } else if let Some(rest) = line.strip_prefix(':') {
            data.push(rest.trim());
        }
    }
    SseEvent {
        event,
        data: data.join("\n"),
    }
}
