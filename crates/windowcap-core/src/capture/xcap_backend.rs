//! xcap-based reference backend for Linux, Windows and macOS
//!
//! [`XcapBackend`] implements [`MonitorSource`] and [`WindowSource`] on top
//! of the `xcap` crate. Every xcap call is executed on one backend-owned
//! [`PlatformThread`], so the library is never entered from two threads at
//! once, and every call is bounded by the configured timeout.
//!
//! # Window capture behavior
//!
//! | Platform | Mode | Notes |
//! |----------|------|-------|
//! | Windows  | offscreen | window DC via PrintWindow; apps that draw with DirectComposition may come out black |
//! | macOS    | offscreen | CGWindowListCreateImage for the window id |
//! | X11      | composited | XGetImage on the window; without a compositor, overlapping windows show through |
//! | Wayland  | composited | window capture generally refused by the compositor |
//!
//! Minimized windows are never rasterized; they fail with
//! [`CaptureError::WindowMinimized`].

use std::time::Duration;

use super::{
    BackendCapabilities, MonitorHandle, MonitorSource, PixelBuffer, RawMonitor, RawWindow,
    WindowCaptureMode, WindowId, WindowSource, constants::PLATFORM_THREAD,
    platform_thread::PlatformThread,
};
use crate::{
    error::{CaptureError, CaptureResult},
    model::BackendType,
};

/// Capture backend built on `xcap`
#[derive(Debug)]
pub struct XcapBackend {
    platform: PlatformThread,
    backend:  BackendType,
}

impl XcapBackend {
    /// Creates the backend and its platform thread.
    ///
    /// `backend` identifies the session type for error reporting and
    /// capability selection; `timeout` bounds each xcap call.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::BackendNotAvailable`] - `backend` is `None` or `Mock`
    /// - [`CaptureError::ContextUnavailable`] - the platform thread could not start
    pub fn new(backend: BackendType, timeout: Duration) -> CaptureResult<Self> {
        if matches!(backend, BackendType::None | BackendType::Mock) {
            return Err(CaptureError::BackendNotAvailable { backend });
        }

        let platform = PlatformThread::spawn(PLATFORM_THREAD, timeout)?;
        tracing::debug!(
            backend = %backend,
            timeout_ms = timeout.as_millis() as u64,
            "xcap backend initialized"
        );
        Ok(Self { platform, backend })
    }

    pub fn backend_type(&self) -> BackendType {
        self.backend
    }

    /// Capabilities for the session this backend was created for.
    ///
    /// Enumeration is certified thread-safe because every xcap call is
    /// already serialized on the platform thread.
    pub fn capabilities(&self) -> BackendCapabilities {
        let window_capture_mode = match self.backend {
            BackendType::Windows | BackendType::MacOS => WindowCaptureMode::Offscreen,
            _ => WindowCaptureMode::Composited,
        };
        BackendCapabilities {
            thread_safe_enumeration: true,
            thread_safe_close: true,
            window_capture_mode,
            captures_minimized: false,
            supports_close: false,
        }
    }
}

/// Maps an xcap failure to a capture error.
///
/// xcap reports everything as a string-carrying error, so consent problems
/// are recognised by message text.
pub(crate) fn map_xcap_error(
    backend: BackendType,
    target: &str,
    error: &dyn std::fmt::Display,
) -> CaptureError {
    let message = error.to_string();
    let lowered = message.to_lowercase();

    if lowered.contains("permission")
        || lowered.contains("denied")
        || lowered.contains("not authorized")
    {
        tracing::warn!(backend = %backend, target, error = %message, "screen capture permission denied");
        return CaptureError::PermissionDenied {
            backend,
            reason: message,
        };
    }

    tracing::error!(backend = %backend, target, error = %message, "xcap call failed");
    CaptureError::CaptureFailed {
        target: target.to_string(),
        reason: message,
    }
}

fn raw_monitor(monitor: &xcap::Monitor) -> Option<RawMonitor> {
    let handle = MonitorHandle(monitor.id().ok()?);
    Some(RawMonitor {
        handle,
        name: monitor.name().unwrap_or_default(),
        x: monitor.x().unwrap_or(0),
        y: monitor.y().unwrap_or(0),
        width: monitor.width().unwrap_or(0),
        height: monitor.height().unwrap_or(0),
        is_primary: monitor.is_primary().unwrap_or(false),
    })
}

fn raw_window(window: &xcap::Window) -> Option<RawWindow> {
    let id = window.id().ok()?;
    Some(RawWindow {
        id,
        title: window.title().unwrap_or_default(),
        app_name: window.app_name().unwrap_or_default(),
        x: window.x().unwrap_or(0),
        y: window.y().unwrap_or(0),
        width: window.width().unwrap_or(0),
        height: window.height().unwrap_or(0),
        is_minimized: window.is_minimized().unwrap_or(false),
        is_maximized: window.is_maximized().unwrap_or(false),
    })
}

impl MonitorSource for XcapBackend {
    fn enumerate_monitors(&self) -> CaptureResult<Vec<RawMonitor>> {
        let backend = self.backend;
        self.platform.run("monitor enumeration", move || {
            let monitors = xcap::Monitor::all()
                .map_err(|e| map_xcap_error(backend, "monitor enumeration", &e))?;
            Ok(monitors.iter().filter_map(raw_monitor).collect())
        })
    }

    fn grab_monitor_pixels(&self, handle: MonitorHandle) -> CaptureResult<PixelBuffer> {
        let backend = self.backend;
        self.platform.run("monitor capture", move || {
            let target = format!("monitor handle {handle}");
            let monitors =
                xcap::Monitor::all().map_err(|e| map_xcap_error(backend, &target, &e))?;
            let monitor = monitors
                .into_iter()
                .find(|m| m.id().ok() == Some(handle.0))
                .ok_or_else(|| CaptureError::CaptureFailed {
                    target: target.clone(),
                    reason: "display disconnected before capture".to_string(),
                })?;

            let image = monitor
                .capture_image()
                .map_err(|e| map_xcap_error(backend, &target, &e))?;
            Ok(PixelBuffer::new(image))
        })
    }
}

impl WindowSource for XcapBackend {
    fn enumerate_windows(&self) -> CaptureResult<Vec<RawWindow>> {
        let backend = self.backend;
        self.platform.run("window enumeration", move || {
            let windows = xcap::Window::all()
                .map_err(|e| map_xcap_error(backend, "window enumeration", &e))?;
            Ok(windows.iter().filter_map(raw_window).collect())
        })
    }

    fn grab_window_pixels(&self, id: WindowId) -> CaptureResult<PixelBuffer> {
        let backend = self.backend;
        self.platform.run("window capture", move || {
            let target = format!("window {id}");
            // xcap has no lookup by id, so find it in a fresh enumeration.
            let windows =
                xcap::Window::all().map_err(|e| map_xcap_error(backend, &target, &e))?;
            let window = windows
                .into_iter()
                .find(|w| w.id().ok() == Some(id))
                .ok_or(CaptureError::WindowNotFound { id })?;

            if window.is_minimized().unwrap_or(false) {
                return Err(CaptureError::WindowMinimized { id });
            }

            let image = window.capture_image().map_err(|e| {
                let lowered = e.to_string().to_lowercase();
                if lowered.contains("not found") || lowered.contains("destroyed") {
                    CaptureError::WindowNotFound { id }
                } else {
                    map_xcap_error(backend, &target, &e)
                }
            })?;
            Ok(PixelBuffer::new(image))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_new_rejects_non_platform_backends() {
        for backend in [BackendType::None, BackendType::Mock] {
            let err = XcapBackend::new(backend, Duration::from_secs(1)).unwrap_err();
            assert!(matches!(err, CaptureError::BackendNotAvailable { .. }));
        }
    }

    #[test]
    fn test_capabilities_by_session() {
        let x11 = XcapBackend::new(BackendType::X11, Duration::from_secs(1)).unwrap();
        let caps = x11.capabilities();
        assert_eq!(caps.window_capture_mode, WindowCaptureMode::Composited);
        assert!(caps.thread_safe_enumeration);
        assert!(!caps.captures_minimized);

        let windows = XcapBackend::new(BackendType::Windows, Duration::from_secs(1)).unwrap();
        assert_eq!(windows.capabilities().window_capture_mode, WindowCaptureMode::Offscreen);
        assert_eq!(windows.backend_type(), BackendType::Windows);
    }

    #[test]
    fn test_map_error_permission_denied() {
        for message in [
            "Permission denied accessing X11",
            "Access denied",
            "Screen recording not authorized",
        ] {
            let err = map_xcap_error(BackendType::X11, "monitor 0", &message);
            assert_eq!(err.kind(), ErrorKind::PermissionDenied, "{message}");
        }
    }

    #[test]
    fn test_map_error_generic_failure() {
        let err = map_xcap_error(BackendType::MacOS, "window 3", &"CGImage was null");
        assert!(matches!(err, CaptureError::CaptureFailed { .. }));
        let msg = err.to_string();
        assert!(msg.contains("window 3"));
        assert!(msg.contains("CGImage was null"));
    }
}
