//! Validated server configuration
//!
//! [`ServerConfig::from_cli`] turns raw flags into a configuration the rest
//! of the server can trust: exactly one transport, a resolved bind address
//! that is loopback unless remote binding was explicitly allowed, and the
//! engine settings.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use windowcap_core::EngineConfig;

use crate::cli::{Cli, DEFAULT_SESSION_IDLE_SECS, DEFAULT_SSE_KEEP_ALIVE_SECS, LogFormat};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "refusing to bind non-loopback address {host}; pass --allow-remote to expose the server \
         to other hosts"
    )]
    RemoteBindNotAllowed { host: String },

    #[error("invalid bind host '{host}': {reason}")]
    InvalidAddress { host: String, reason: String },

    #[error("port 0 is not allowed for the {transport} transport")]
    InvalidPort { transport: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseConfig {
    pub bind:       SocketAddr,
    /// Interval between `: keep-alive` comments on idle streams
    pub keep_alive: Duration,
}

impl SseConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            keep_alive: Duration::from_secs(DEFAULT_SSE_KEEP_ALIVE_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub bind:           SocketAddr,
    /// Interval between keep-alive comments on response streams
    pub sse_keep_alive: Duration,
    /// Sessions without client traffic for this long are closed
    pub session_idle:   Duration,
}

impl HttpConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            sse_keep_alive: Duration::from_secs(DEFAULT_SSE_KEEP_ALIVE_SECS),
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Stdio,
    Sse(SseConfig),
    Http(HttpConfig),
}

impl TransportConfig {
    pub fn name(&self) -> &'static str {
        match self {
            TransportConfig::Stdio => "stdio",
            TransportConfig::Sse(_) => "sse",
            TransportConfig::Http(_) => "http",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    /// Detect the platform session
    Auto,
    /// Synthetic monitors and windows
    Mock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub transport:  TransportConfig,
    pub backend:    BackendChoice,
    pub engine:     EngineConfig,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let transport = if cli.sse {
            let bind = resolve_bind(&cli.host, cli.port, cli.allow_remote, "sse")?;
            TransportConfig::Sse(SseConfig {
                bind,
                keep_alive: Duration::from_secs(cli.sse_keep_alive_secs.max(1)),
            })
        } else if cli.http {
            let bind = resolve_bind(&cli.host, cli.port, cli.allow_remote, "http")?;
            TransportConfig::Http(HttpConfig {
                bind,
                sse_keep_alive: Duration::from_secs(cli.sse_keep_alive_secs.max(1)),
                session_idle: Duration::from_secs(cli.session_idle_secs.max(1)),
            })
        } else {
            TransportConfig::Stdio
        };

        Ok(Self {
            transport,
            backend: if cli.mock {
                BackendChoice::Mock
            } else {
                BackendChoice::Auto
            },
            engine: EngineConfig {
                compression:     cli.png_compression,
                capture_timeout: Duration::from_millis(cli.capture_timeout_ms.max(1)),
            },
            log_format: cli.log_format,
        })
    }
}

/// Resolves a host literal (or `localhost`) and enforces the loopback rule.
pub fn resolve_bind(
    host: &str,
    port: u16,
    allow_remote: bool,
    transport: &'static str,
) -> Result<SocketAddr, ConfigError> {
    if port == 0 {
        return Err(ConfigError::InvalidPort { transport });
    }

    let ip = if host.eq_ignore_ascii_case("localhost") {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        host.trim_matches(['[', ']'])
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidAddress {
                host:   host.to_string(),
                reason: e.to_string(),
            })?
    };

    if !ip.is_loopback() && !allow_remote {
        return Err(ConfigError::RemoteBindNotAllowed {
            host: host.to_string(),
        });
    }
    Ok(SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use windowcap_core::util::encode::PngCompression;

    use super::*;

    fn config(args: &[&str]) -> Result<ServerConfig, ConfigError> {
        let mut argv = vec!["window-cap-mcp"];
        argv.extend_from_slice(args);
        ServerConfig::from_cli(&Cli::parse_from(argv))
    }

    #[test]
    fn test_default_is_stdio() {
        let config = config(&[]).unwrap();
        assert_eq!(config.transport, TransportConfig::Stdio);
        assert_eq!(config.backend, BackendChoice::Auto);
        assert_eq!(config.engine.compression, PngCompression::Fast);
        assert_eq!(config.engine.capture_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_sse_config() {
        let config = config(&["--sse", "--port", "9000", "--sse-keep-alive-secs", "3"]).unwrap();
        let TransportConfig::Sse(sse) = config.transport else {
            panic!("expected sse transport");
        };
        assert_eq!(sse.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(sse.keep_alive, Duration::from_secs(3));
    }

    #[test]
    fn test_http_config() {
        let config =
            config(&["--http", "--host", "localhost", "--session-idle-secs", "60", "--mock"]).unwrap();
        assert_eq!(config.backend, BackendChoice::Mock);
        let TransportConfig::Http(http) = config.transport else {
            panic!("expected http transport");
        };
        assert_eq!(http.bind, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(http.session_idle, Duration::from_secs(60));
        assert_eq!(http.sse_keep_alive, Duration::from_secs(15));
    }

    #[test]
    fn test_remote_bind_requires_opt_in() {
        assert_eq!(
            config(&["--http", "--host", "0.0.0.0"]).unwrap_err(),
            ConfigError::RemoteBindNotAllowed {
                host: "0.0.0.0".to_string()
            }
        );
        assert!(config(&["--http", "--host", "0.0.0.0", "--allow-remote"]).is_ok());
    }

    #[test]
    fn test_ipv6_loopback() {
        let addr = resolve_bind("[::1]", 8080, false, "sse").unwrap();
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_invalid_host_and_port() {
        assert!(matches!(
            config(&["--sse", "--host", "my host"]).unwrap_err(),
            ConfigError::InvalidAddress { .. }
        ));
        assert_eq!(
            config(&["--sse", "--port", "0"]).unwrap_err(),
            ConfigError::InvalidPort { transport: "sse" }
        );
    }

    #[test]
    fn test_stdio_ignores_network_flags() {
        let config = config(&["--host", "0.0.0.0", "--port", "0"]).unwrap();
        assert_eq!(config.transport, TransportConfig::Stdio);
    }
}
