//! Mock capture backend for testing
//!
//! [`MockBackend`] implements every capability trait without touching a real
//! windowing system. It serves a fixed (but replaceable) topology, generates
//! deterministic test-pattern pixels, and records how it was called so tests
//! can assert on serialization.
//!
//! # Features
//!
//! - **Synthetic topology:** two monitors and three windows by default
//!   (Firefox, VSCode, a minimized Terminal)
//! - **Configurable Delay:** simulate slow platform calls
//! - **Error Injection:** every call fails with the injected error
//! - **Stale ids:** windows that enumerate but are gone by the time they are
//!   grabbed or closed
//! - **Grab tally:** counts grabs, the peak number of concurrent grabs, and
//!   the threads they ran on
//!
//! # Examples
//!
//! ```
//! use windowcap_core::capture::{MockBackend, MonitorSource, WindowSource};
//!
//! let backend = MockBackend::new();
//! assert_eq!(backend.enumerate_monitors().unwrap().len(), 2);
//! assert_eq!(backend.enumerate_windows().unwrap().len(), 3);
//! ```
//!
//! ## With Error Injection
//!
//! ```
//! use windowcap_core::{
//!     capture::{MockBackend, MonitorSource},
//!     error::CaptureError,
//!     model::BackendType,
//! };
//!
//! let backend = MockBackend::new().with_error(CaptureError::PermissionDenied {
//!     backend: BackendType::Mock,
//!     reason:  "test".to_string(),
//! });
//! assert!(backend.enumerate_monitors().is_err());
//! ```

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use parking_lot::{Mutex, RwLock};

use super::{
    BackendCapabilities, MonitorHandle, MonitorSource, PixelBuffer, RawMonitor, RawWindow,
    WindowCaptureMode, WindowCloser, WindowId, WindowSource,
};
use crate::error::{CaptureError, CaptureResult};

/// Mock capture backend for testing and development
///
/// # Thread Safety
///
/// `MockBackend` is thread-safe and certifies thread-safe enumeration and
/// close, so the dispatcher may run those outside the capture queue.
#[derive(Debug)]
pub struct MockBackend {
    /// Optional delay applied to every grab
    delay:           Option<Duration>,
    /// Optional error to inject for testing error handling
    error_injection: Option<CaptureError>,
    monitors:        RwLock<Vec<RawMonitor>>,
    windows:         RwLock<Vec<RawWindow>>,
    /// Ids that enumerate but fail grab/close with `WindowNotFound`
    stale_windows:   Vec<WindowId>,
    closed:          Mutex<Vec<WindowId>>,
    tally:           GrabTally,
}

#[derive(Debug, Default)]
struct GrabTally {
    grabs:         AtomicUsize,
    in_flight:     AtomicUsize,
    max_in_flight: AtomicUsize,
    threads:       Mutex<Vec<String>>,
}

impl GrabTally {
    fn enter(&self) {
        self.grabs.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let name = thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_string();
        self.threads.lock().push(name);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockBackend {
    /// Creates a new MockBackend with the default topology
    ///
    /// Monitors:
    /// - 0: "DP-1" 640x360 at (0, 0), primary
    /// - 1: "HDMI-1" 480x270 at (640, 0)
    ///
    /// Windows:
    /// - 101: Mozilla Firefox (firefox), 400x300
    /// - 102: Visual Studio Code (code), maximized
    /// - 103: Terminal - Alacritty (alacritty), minimized with 0x0 geometry
    pub fn new() -> Self {
        Self {
            delay:           None,
            error_injection: None,
            monitors:        RwLock::new(Self::create_mock_monitors()),
            windows:         RwLock::new(Self::create_mock_windows()),
            stale_windows:   Vec::new(),
            closed:          Mutex::new(Vec::new()),
            tally:           GrabTally::default(),
        }
    }

    /// Creates a MockBackend with no monitors and no windows
    pub fn empty() -> Self {
        Self::new().with_monitors(Vec::new()).with_windows(Vec::new())
    }

    /// Sets a delay applied to every pixel grab
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Injects an error that will be returned by all operations
    pub fn with_error(mut self, error: CaptureError) -> Self {
        self.error_injection = Some(error);
        self
    }

    /// Replaces the monitor topology
    pub fn with_monitors(self, monitors: Vec<RawMonitor>) -> Self {
        *self.monitors.write() = monitors;
        self
    }

    /// Replaces the window list
    pub fn with_windows(self, windows: Vec<RawWindow>) -> Self {
        *self.windows.write() = windows;
        self
    }

    /// Keeps `id` in enumeration results but fails grabs and closes for it,
    /// as if the window closed between enumeration and use
    pub fn with_stale_window(mut self, id: WindowId) -> Self {
        self.stale_windows.push(id);
        self
    }

    /// Simulates a topology change on a live backend
    pub fn set_monitors(&self, monitors: Vec<RawMonitor>) {
        *self.monitors.write() = monitors;
    }

    /// Simulates windows opening or closing on a live backend
    pub fn set_windows(&self, windows: Vec<RawWindow>) {
        *self.windows.write() = windows;
    }

    /// Ids whose close request was accepted, in order
    pub fn closed_windows(&self) -> Vec<WindowId> {
        self.closed.lock().clone()
    }

    /// Total number of pixel grabs performed
    pub fn grab_count(&self) -> usize {
        self.tally.grabs.load(Ordering::SeqCst)
    }

    /// Peak number of grabs that were running at the same time
    pub fn max_concurrent_grabs(&self) -> usize {
        self.tally.max_in_flight.load(Ordering::SeqCst)
    }

    /// Names of the threads each grab ran on, in order
    pub fn grab_threads(&self) -> Vec<String> {
        self.tally.threads.lock().clone()
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            thread_safe_enumeration: true,
            thread_safe_close:       true,
            window_capture_mode:     WindowCaptureMode::Offscreen,
            captures_minimized:      false,
            supports_close:          true,
        }
    }

    /// A raw monitor record, for building custom topologies
    pub fn monitor(
        handle: u32,
        name: &str,
        (x, y): (i32, i32),
        (width, height): (u32, u32),
        is_primary: bool,
    ) -> RawMonitor {
        RawMonitor {
            handle: MonitorHandle(handle),
            name: name.to_string(),
            x,
            y,
            width,
            height,
            is_primary,
        }
    }

    /// A raw, non-minimized window record, for building custom window lists
    pub fn window(
        id: WindowId,
        title: &str,
        app_name: &str,
        (x, y): (i32, i32),
        (width, height): (u32, u32),
    ) -> RawWindow {
        RawWindow {
            id,
            title: title.to_string(),
            app_name: app_name.to_string(),
            x,
            y,
            width,
            height,
            is_minimized: false,
            is_maximized: false,
        }
    }

    fn create_mock_monitors() -> Vec<RawMonitor> {
        vec![
            Self::monitor(1, "DP-1", (0, 0), (640, 360), true),
            Self::monitor(2, "HDMI-1", (640, 0), (480, 270), false),
        ]
    }

    fn create_mock_windows() -> Vec<RawWindow> {
        let firefox = Self::window(101, "Mozilla Firefox", "firefox", (40, 30), (400, 300));
        let code = RawWindow {
            is_maximized: true,
            ..Self::window(102, "Visual Studio Code", "code", (0, 0), (640, 360))
        };
        let terminal = RawWindow {
            is_minimized: true,
            ..Self::window(103, "Terminal - Alacritty", "alacritty", (0, 0), (0, 0))
        };
        vec![firefox, code, terminal]
    }

    fn apply_delay(&self) {
        if let Some(duration) = self.delay {
            thread::sleep(duration);
        }
    }

    fn check_error_injection(&self) -> CaptureResult<()> {
        match &self.error_injection {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Looks up a live (non-stale) window
    fn validate_window(&self, id: WindowId) -> CaptureResult<RawWindow> {
        if self.stale_windows.contains(&id) {
            return Err(CaptureError::WindowNotFound { id });
        }
        self.windows
            .read()
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or(CaptureError::WindowNotFound { id })
    }

    fn grab(&self, width: u32, height: u32) -> PixelBuffer {
        self.tally.enter();
        self.apply_delay();
        let pixels = PixelBuffer::from_test_pattern(width, height);
        self.tally.exit();
        pixels
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorSource for MockBackend {
    fn enumerate_monitors(&self) -> CaptureResult<Vec<RawMonitor>> {
        self.check_error_injection()?;
        Ok(self.monitors.read().clone())
    }

    fn grab_monitor_pixels(&self, handle: MonitorHandle) -> CaptureResult<PixelBuffer> {
        self.check_error_injection()?;
        let (width, height) = self
            .monitors
            .read()
            .iter()
            .find(|m| m.handle == handle)
            .map(|m| (m.width, m.height))
            .ok_or_else(|| CaptureError::CaptureFailed {
                target: format!("monitor handle {handle}"),
                reason: "display disconnected".to_string(),
            })?;
        Ok(self.grab(width, height))
    }
}

impl WindowSource for MockBackend {
    fn enumerate_windows(&self) -> CaptureResult<Vec<RawWindow>> {
        self.check_error_injection()?;
        Ok(self.windows.read().clone())
    }

    fn grab_window_pixels(&self, id: WindowId) -> CaptureResult<PixelBuffer> {
        self.check_error_injection()?;
        let window = self.validate_window(id)?;
        if window.is_minimized {
            return Err(CaptureError::WindowMinimized { id });
        }
        Ok(self.grab(window.width, window.height))
    }
}

impl WindowCloser for MockBackend {
    fn request_close(&self, id: WindowId) -> CaptureResult<()> {
        self.check_error_injection()?;
        self.validate_window(id)?;
        self.windows.write().retain(|w| w.id != id);
        self.closed.lock().push(id);
        Ok(())
    }
}
