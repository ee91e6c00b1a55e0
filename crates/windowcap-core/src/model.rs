//! Data models and type definitions for window-cap-mcp
//!
//! This module defines the records exchanged with clients:
//! - Platform and backend detection types
//! - [`Monitor`] and [`Window`] snapshots (field names are part of the wire
//!   contract and must not change)
//! - Capture results and close acknowledgements

use base64::Engine as _;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Represents the display backend type for the current platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// No backend detected or not yet initialized
    None,
    /// Wayland display server (Linux)
    Wayland,
    /// X11 display server (Linux)
    X11,
    /// Windows desktop
    Windows,
    /// macOS desktop
    #[serde(rename = "macos")]
    MacOS,
    /// Synthetic backend for tests and demos
    Mock,
}

impl BackendType {
    /// Returns the backend type as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::None => "none",
            BackendType::Wayland => "wayland",
            BackendType::X11 => "x11",
            BackendType::Windows => "windows",
            BackendType::MacOS => "macos",
            BackendType::Mock => "mock",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Platform information including OS and display backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlatformInfo {
    /// Operating system name (e.g., "linux", "windows", "macos")
    pub os:      String,
    /// Detected display backend
    pub backend: BackendType,
}

impl PlatformInfo {
    /// Creates a new PlatformInfo instance
    pub fn new(os: String, backend: BackendType) -> Self {
        Self { os, backend }
    }
}

/// A display surface as seen by one enumeration call.
///
/// `index` is only meaningful within the enumeration that produced it.
/// Coordinates are virtual-desktop coordinates with the primary monitor's
/// top-left at the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Monitor {
    pub index:      usize,
    pub name:       String,
    pub x:          i32,
    pub y:          i32,
    pub width:      u32,
    pub height:     u32,
    pub is_primary: bool,
}

/// An OS window snapshot taken at enumeration time.
///
/// The snapshot goes stale as soon as the window moves or closes; `id` is the
/// only field callers should use for identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Window {
    pub id:           u32,
    pub title:        String,
    pub app_name:     String,
    pub x:            i32,
    pub y:            i32,
    pub width:        u32,
    pub height:       u32,
    pub is_minimized: bool,
    pub is_maximized: bool,
}

impl Window {
    /// True when the window is not minimized and has a non-empty surface.
    pub fn is_visible(&self) -> bool {
        !self.is_minimized && self.width > 0 && self.height > 0
    }
}

/// Selects which monitor `capture_monitor` grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorSelector {
    /// The monitor flagged primary, or index 0 when none is flagged
    #[default]
    Primary,
    /// A 0-based index from the current enumeration
    Index(usize),
}

impl std::fmt::Display for MonitorSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorSelector::Primary => write!(f, "primary"),
            MonitorSelector::Index(index) => write!(f, "{index}"),
        }
    }
}

/// What a capture was taken of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureTarget {
    Monitor { index: usize, name: String },
    Window { id: u32, title: String, app_name: String },
}

impl std::fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureTarget::Monitor { index, name } => write!(f, "Monitor: {name} (Index: {index})"),
            CaptureTarget::Window {
                id,
                title,
                app_name,
            } => write!(f, "Window: {title} [{app_name}] (ID: {id})"),
        }
    }
}

/// PNG-encoded capture of a monitor or window.
///
/// The engine does not keep a copy; once returned, the bytes belong to the
/// caller.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// PNG bytes, always starting with the 8-byte PNG signature
    pub png:         Vec<u8>,
    pub width:       u32,
    pub height:      u32,
    pub target:      CaptureTarget,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    /// Base64 (standard alphabet, padded) form for text-only transports.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.png)
    }

    pub fn size_bytes(&self) -> usize {
        self.png.len()
    }

    /// Metadata sent alongside the image payload.
    pub fn metadata(&self) -> CaptureMetadata {
        CaptureMetadata {
            target:      self.target.clone(),
            description: self.target.to_string(),
            width:       self.width,
            height:      self.height,
            format:      "png",
            size_bytes:  self.png.len(),
            captured_at: self.captured_at.to_rfc3339(),
        }
    }
}

/// Serializable description of a [`CapturedImage`] without the pixel data.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureMetadata {
    pub target:      CaptureTarget,
    pub description: String,
    pub width:       u32,
    pub height:      u32,
    pub format:      &'static str,
    pub size_bytes:  usize,
    pub captured_at: String,
}

/// Acknowledgement that the OS accepted a close request.
///
/// This does not confirm the window has gone; applications may prompt or
/// ignore the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CloseAck {
    pub window_id: u32,
    pub title:     String,
    pub app_name:  String,
}

impl CloseAck {
    pub fn message(&self) -> String {
        format!(
            "Close request sent to window: {} [{}] (ID: {})",
            self.title, self.app_name, self.window_id
        )
    }
}
