//! Command-line flags for the `window-cap-mcp` binary

use clap::{ArgGroup, Parser, ValueEnum};
use windowcap_core::{capture::constants::DEFAULT_CAPTURE_TIMEOUT_MS, util::encode::PngCompression};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SSE_KEEP_ALIVE_SECS: u64 = 15;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// MCP server for monitor and window capture
///
/// Speaks MCP over stdio by default. `--sse` or `--http` serve it over the
/// network instead; exactly one transport is active per process.
#[derive(Debug, Clone, Parser)]
#[command(name = "window-cap-mcp", version, about)]
#[command(group(ArgGroup::new("transport").args(["sse", "http"])))]
pub struct Cli {
    /// Serve MCP over Server-Sent Events (GET /sse, POST /message)
    #[arg(long)]
    pub sse: bool,

    /// Serve MCP over streamable HTTP (/mcp)
    #[arg(long)]
    pub http: bool,

    /// Bind address for --sse/--http
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port for --sse/--http
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Allow binding to a non-loopback address
    #[arg(long)]
    pub allow_remote: bool,

    /// Use the synthetic mock backend instead of the platform backend
    #[arg(long)]
    pub mock: bool,

    /// PNG compression level: fast, default or best
    #[arg(long, default_value_t = PngCompression::Fast)]
    pub png_compression: PngCompression,

    /// Upper bound for a single platform capture call, in milliseconds
    #[arg(long, default_value_t = DEFAULT_CAPTURE_TIMEOUT_MS)]
    pub capture_timeout_ms: u64,

    /// Interval between keep-alive comments on idle event streams, in seconds
    #[arg(long, default_value_t = DEFAULT_SSE_KEEP_ALIVE_SECS)]
    pub sse_keep_alive_secs: u64,

    /// Close --http sessions after this many seconds without client traffic
    #[arg(long, default_value_t = DEFAULT_SESSION_IDLE_SECS)]
    pub session_idle_secs: u64,

    /// Log output format (logs always go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["window-cap-mcp"]);
        assert!(!cli.sse && !cli.http);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.png_compression, PngCompression::Fast);
        assert_eq!(cli.capture_timeout_ms, 5000);
        assert_eq!(cli.session_idle_secs, 300);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_transports_are_exclusive() {
        assert!(Cli::try_parse_from(["window-cap-mcp", "--sse", "--http"]).is_err());
    }

    #[test]
    fn test_compression_flag() {
        let cli = Cli::parse_from(["window-cap-mcp", "--png-compression", "best"]);
        assert_eq!(cli.png_compression, PngCompression::Best);
        assert!(Cli::try_parse_from(["window-cap-mcp", "--png-compression", "zip"]).is_err());
    }
}
