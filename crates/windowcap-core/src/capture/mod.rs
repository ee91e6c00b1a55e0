//! Capture backend traits and implementations
//!
//! This module provides the platform abstraction used by the engine.
//!
//! # Architecture
//!
//! Backends implement composable capability traits:
//!
//! - [`MonitorSource`] - enumerate and grab displays (all backends)
//! - [`WindowSource`] - enumerate and grab windows (all backends)
//! - [`WindowCloser`] - graceful close requests (X11, Windows, Mock)
//!
//! [`create_default_backend()`] detects the session and returns a
//! [`CompositeBackend`] bundling the right implementations:
//!
//! | Session | Monitors/Windows | Closer |
//! |---------|------------------|--------|
//! | Windows | xcap | `PostMessageW(WM_CLOSE)` |
//! | macOS   | xcap | - |
//! | X11     | xcap | `WM_DELETE_WINDOW` |
//! | Wayland | xcap | `WM_DELETE_WINDOW` via XWayland when `$DISPLAY` is set |
//! | Mock    | mock | mock |
//!
//! # Core Types
//!
//! - [`PixelBuffer`] - raw RGBA pixels returned by grabs
//! - [`BackendCapabilities`] - static facts the dispatcher and engine consult

use std::{sync::Arc, time::Duration};

use crate::{
    error::{CaptureError, CaptureResult},
    model::BackendType,
    util::detect::detect_platform,
};

pub mod composite;
pub mod constants;
pub mod mock;
pub mod pixel_buffer;
pub mod platform_thread;
pub mod traits;
pub mod xcap_backend;

#[cfg(target_os = "linux")]
pub mod x11_close;

#[cfg(target_os = "windows")]
pub mod win32_close;

pub use composite::{CompositeBackend, composite_from_mock, composite_from_xcap};
pub use mock::MockBackend;
pub use pixel_buffer::PixelBuffer;
pub use traits::{
    BackendCapabilities, MonitorHandle, MonitorSource, RawMonitor, RawWindow, WindowCaptureMode,
    WindowCloser, WindowId, WindowSource,
};
#[cfg(target_os = "windows")]
pub use win32_close::Win32WindowCloser;
#[cfg(target_os = "linux")]
pub use x11_close::X11WindowCloser;
pub use xcap_backend::XcapBackend;

/// Creates the capture backend for the current platform.
///
/// `capture_timeout` bounds every individual platform call.
///
/// - **Windows**: xcap plus the Win32 closer
/// - **macOS**: xcap, no closer
/// - **Linux**: xcap, plus the X11 closer when `$DISPLAY` is set
/// - **No display session**: a structured `BackendNotAvailable` error
pub fn create_default_backend(capture_timeout: Duration) -> CaptureResult<Arc<CompositeBackend>> {
    let platform = detect_platform();
    tracing::info!(os = %platform.os, backend = %platform.backend, "detected platform");

    match platform.backend {
        BackendType::None | BackendType::Mock => Err(CaptureError::BackendNotAvailable {
            backend: platform.backend,
        }),
        session => {
            let xcap = Arc::new(XcapBackend::new(session, capture_timeout)?);
            Ok(Arc::new(composite_from_xcap(xcap, default_closer())))
        }
    }
}

/// Creates a composite over a fresh [`MockBackend`].
pub fn create_mock_backend() -> Arc<CompositeBackend> {
    Arc::new(composite_from_mock(Arc::new(MockBackend::new())))
}

#[cfg(target_os = "linux")]
fn default_closer() -> Option<Arc<dyn WindowCloser>> {
    match X11WindowCloser::new() {
        Ok(closer) => Some(Arc::new(closer)),
        Err(e) => {
            tracing::info!(error = %e, "window close unavailable without an X display");
            None
        }
    }
}

#[cfg(target_os = "windows")]
fn default_closer() -> Option<Arc<dyn WindowCloser>> {
    Some(Arc::new(Win32WindowCloser::new()))
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn default_closer() -> Option<Arc<dyn WindowCloser>> {
    None
}
