//! windowcap-cli: Command-line tool for capture debugging
//!
//! Runs the same engine and capture context as the MCP server, without the
//! protocol: list, count, capture and close monitors and windows, or dump
//! the tool catalog.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use windowcap_core::{
    CaptureEngine, Dispatcher, Invocation, ToolPayload,
    capture::{constants::default_capture_timeout, create_default_backend, create_mock_backend},
    model::{CapturedImage, MonitorSelector},
    registry::catalog,
};

#[derive(Parser)]
#[command(name = "windowcap-cli", version)]
#[command(about = "CLI tool for monitor and window capture debugging and testing")]
struct Cli {
    /// Use the synthetic mock backend instead of the platform backend
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all monitors
    ListMonitors,
    /// Print the number of monitors
    CountMonitors,
    /// Capture an entire monitor to a PNG file
    #[command(group(ArgGroup::new("which").args(["index", "primary"])))]
    CaptureMonitor {
        /// Monitor index from list-monitors
        #[arg(long)]
        index: Option<usize>,
        /// Capture the primary monitor (the default)
        #[arg(long)]
        primary: bool,
        /// Output file path
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List open windows
    ListWindows {
        /// Only windows that are not minimized and have a non-zero size
        #[arg(long)]
        visible: bool,
    },
    /// Print the number of open windows
    CountWindows,
    /// Capture one window to a PNG file
    CaptureWindow {
        /// Window id from list-windows
        #[arg(long)]
        id: u32,
        /// Output file path
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Ask a window to close
    CloseWindow {
        /// Window id from list-windows
        #[arg(long)]
        id: u32,
    },
    /// Print the tool catalog with argument schemas as JSON
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("windowcap_cli=info".parse()?)
                .add_directive("windowcap_core=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Tools = cli.command {
        return print_catalog(&mut std::io::stdout());
    }

    let dispatcher = start_dispatcher(cli.mock)?;
    let result = run(&dispatcher, cli.command, &mut std::io::stdout()).await;
    dispatcher.shutdown();
    result
}

fn start_dispatcher(mock: bool) -> Result<Arc<Dispatcher>> {
    let backend = if mock {
        create_mock_backend()
    } else {
        create_default_backend(default_capture_timeout())
            .context("no capture backend for this session (try --mock)")?
    };
    Dispatcher::start(Arc::new(CaptureEngine::new(backend))).context("failed to start the capture context")
}

async fn run(dispatcher: &Dispatcher, command: Commands, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::ListMonitors => {
            let ToolPayload::Monitors(monitors) = dispatcher.dispatch(Invocation::ListMonitors).await?
            else {
                anyhow::bail!("list_monitors returned no monitor list");
            };
            writeln!(out, "Found {} monitors:\n", monitors.len())?;
            for monitor in monitors {
                writeln!(
                    out,
                    "  [{}] {}{}",
                    monitor.index,
                    monitor.name,
                    if monitor.is_primary { " (primary)" } else { "" }
                )?;
                writeln!(
                    out,
                    "      {}x{} at ({}, {})",
                    monitor.width, monitor.height, monitor.x, monitor.y
                )?;
            }
        }
        Commands::CountMonitors | Commands::CountWindows => {
            let invocation = if matches!(command, Commands::CountMonitors) {
                Invocation::CountMonitors
            } else {
                Invocation::CountWindows
            };
            if let ToolPayload::Count(count) = dispatcher.dispatch(invocation).await? {
                writeln!(out, "{count}")?;
            }
        }
        Commands::CaptureMonitor {
            index, out: path, ..
        } => {
            let selector = index.map_or(MonitorSelector::Primary, MonitorSelector::Index);
            writeln!(out, "Capturing monitor {selector}...")?;
            let payload = dispatcher
                .dispatch(Invocation::CaptureMonitor { selector })
                .await?;
            save(payload, &path, out)?;
        }
        Commands::ListWindows { visible } => {
            let ToolPayload::Windows(windows) = dispatcher.dispatch(Invocation::ListWindows).await?
            else {
                anyhow::bail!("list_windows returned no window list");
            };
            let windows: Vec<_> = windows
                .into_iter()
                .filter(|w| !visible || w.is_visible())
                .collect();

            writeln!(out, "Found {} windows:\n", windows.len())?;
            for window in windows {
                writeln!(out, "  ID: {}", window.id)?;
                writeln!(out, "  Title: {}", window.title)?;
                if !window.app_name.is_empty() {
                    writeln!(out, "  App: {}", window.app_name)?;
                }
                writeln!(
                    out,
                    "  Geometry: {}x{} at ({}, {})",
                    window.width, window.height, window.x, window.y
                )?;
                if window.is_minimized {
                    writeln!(out, "  State: minimized")?;
                } else if window.is_maximized {
                    writeln!(out, "  State: maximized")?;
                }
                writeln!(out)?;
            }
        }
        Commands::CaptureWindow { id, out: path } => {
            writeln!(out, "Capturing window {id}...")?;
            let payload = dispatcher
                .dispatch(Invocation::capture_window(id))
                .await?;
            save(payload, &path, out)?;
        }
        Commands::CloseWindow { id } => {
            if let ToolPayload::Closed(ack) = dispatcher.dispatch(Invocation::close_window(id)).await? {
                writeln!(out, "✓ {}", ack.message())?;
            }
        }
        Commands::Tools => print_catalog(out)?,
    }
    Ok(())
}

fn save(payload: ToolPayload, path: &Path, out: &mut dyn Write) -> Result<()> {
    let ToolPayload::Image(CapturedImage {
        png, width, height, ..
    }) = payload
    else {
        anyhow::bail!("capture returned no image");
    };
    fs::write(path, &png).with_context(|| format!("failed to write {}", path.display()))?;
    writeln!(
        out,
        "✓ Screenshot saved to {} ({width}x{height}, {} bytes)",
        path.display(),
        png.len()
    )?;
    Ok(())
}

fn print_catalog(out: &mut dyn Write) -> Result<()> {
    let json = serde_json::to_string_pretty(&catalog()).context("failed to serialize the catalog")?;
    writeln!(out, "{json}")?;
    Ok(())
}
