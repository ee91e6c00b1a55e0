//! Composable capability traits for platform capture backends
//!
//! Backends implement only the capabilities they support:
//!
//! - [`MonitorSource`] - Enumerate displays and grab their pixels
//! - [`WindowSource`] - Enumerate windows and grab their pixels
//! - [`WindowCloser`] - Ask the OS to close a window
//!
//! The traits are synchronous. Every call made through them runs on the
//! dispatcher's single capture context (or on a backend-owned platform
//! thread), never concurrently from arbitrary threads unless the backend
//! certifies it via [`BackendCapabilities`].
//!
//! # Raw Records
//!
//! Backends return [`RawMonitor`] and [`RawWindow`] records exactly as the
//! platform reports them. Index assignment, primary normalization and
//! coordinate translation happen in the engine.

use serde::Serialize;

use super::PixelBuffer;
use crate::error::CaptureResult;

/// Backend-native window id (HWND on Windows, X11 window id, CGWindowID).
pub type WindowId = u32;

/// Backend-native monitor handle, valid only for the backend that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorHandle(pub u32);

impl std::fmt::Display for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display record as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMonitor {
    pub handle:     MonitorHandle,
    pub name:       String,
    pub x:          i32,
    pub y:          i32,
    pub width:      u32,
    pub height:     u32,
    pub is_primary: bool,
}

/// Window record as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWindow {
    pub id:           WindowId,
    pub title:        String,
    pub app_name:     String,
    pub x:            i32,
    pub y:            i32,
    pub width:        u32,
    pub height:       u32,
    pub is_minimized: bool,
    pub is_maximized: bool,
}

/// What `grab_window_pixels` returns for a partly covered window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowCaptureMode {
    /// The window's own surface, including regions hidden by other windows
    Offscreen,
    /// The visible composited region; occluding windows show through
    Composited,
}

/// Static facts about a backend, queried by the engine and dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendCapabilities {
    /// Enumeration may run outside the capture context
    pub thread_safe_enumeration: bool,
    /// Close requests may run outside the capture context
    pub thread_safe_close:       bool,
    /// Occluded vs composited window capture
    pub window_capture_mode:     WindowCaptureMode,
    /// Minimized windows can be rasterized
    pub captures_minimized:      bool,
    /// A [`WindowCloser`] is available
    pub supports_close:          bool,
}

impl BackendCapabilities {
    /// Conservative capabilities: everything goes through the capture queue.
    pub fn serialized() -> Self {
        Self {
            thread_safe_enumeration: false,
            thread_safe_close:       false,
            window_capture_mode:     WindowCaptureMode::Composited,
            captures_minimized:      false,
            supports_close:          false,
        }
    }
}

/// Display enumeration and capture.
pub trait MonitorSource: Send + Sync {
    /// Lists displays in platform order.
    ///
    /// An empty list is a valid (degraded) answer, not an error.
    fn enumerate_monitors(&self) -> CaptureResult<Vec<RawMonitor>>;

    /// Grabs the full pixel extent of a display at its current resolution.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::CaptureFailed`](crate::error::CaptureError::CaptureFailed) -
    ///   display vanished or the platform returned no pixels
    /// - [`CaptureError::PermissionDenied`](crate::error::CaptureError::PermissionDenied) -
    ///   screen recording consent missing
    fn grab_monitor_pixels(&self, handle: MonitorHandle) -> CaptureResult<PixelBuffer>;
}

/// Window enumeration and capture.
pub trait WindowSource: Send + Sync {
    /// Lists windows in backend-defined order (commonly z-order).
    fn enumerate_windows(&self) -> CaptureResult<Vec<RawWindow>>;

    /// Grabs the pixels of one window.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::WindowNotFound`](crate::error::CaptureError::WindowNotFound) -
    ///   the id is stale
    /// - [`CaptureError::WindowMinimized`](crate::error::CaptureError::WindowMinimized) or
    ///   [`CaptureError::CaptureFailed`](crate::error::CaptureError::CaptureFailed) -
    ///   the window exists but cannot be rasterized
    fn grab_window_pixels(&self, id: WindowId) -> CaptureResult<PixelBuffer>;
}

/// Graceful window close requests.
///
/// # Platform Support
///
/// - **Linux/X11**: `WM_DELETE_WINDOW` client message
/// - **Windows**: `WM_CLOSE` posted to the window
/// - **macOS**: not available
pub trait WindowCloser: Send + Sync {
    /// Asks the OS to close the window. Success means the request was
    /// accepted, not that the window has closed.
    fn request_close(&self, id: WindowId) -> CaptureResult<()>;
}
