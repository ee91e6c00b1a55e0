//! Tracing subscriber setup
//!
//! Logs always go to stderr: on the stdio transport stdout carries the
//! protocol stream. `RUST_LOG` overrides the default filter.

use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogFormat;

pub const DEFAULT_FILTER: &str = "window_cap_mcp=info,windowcap_mcp_server=info,windowcap_core=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Calling it twice is a no-op.
pub fn init(format: LogFormat) {
    let builder = fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .with_line_number(false);

    let result = match format {
        LogFormat::Text => builder.with_target(false).try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}
