//! Platform-independent capture orchestration
//!
//! [`CaptureEngine`] turns the raw records and pixel buffers a backend
//! produces into the client-facing model:
//!
//! - monitor indices are assigned per enumeration, contiguous from 0, after
//!   zero-area displays are dropped
//! - at most one monitor keeps `is_primary` (the first one flagged)
//! - monitor and window coordinates are translated so the primary monitor's
//!   top-left is the origin
//! - pixel buffers are encoded to PNG, never resized or recompressed
//! - window existence is re-validated at the moment of every by-id operation
//!
//! The engine is synchronous and holds no per-call state. It does not
//! enforce timeouts; backends bound their own platform calls. Callers that
//! need the single capture context go through
//! [`Dispatcher`](crate::dispatch::Dispatcher) rather than calling the
//! capture methods directly.

use std::{sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
    capture::{CompositeBackend, PixelBuffer, RawMonitor, RawWindow},
    error::{CaptureError, CaptureResult},
    model::{CaptureTarget, CapturedImage, CloseAck, Monitor, MonitorSelector, Window},
    registry::{Invocation, ToolOutcome, ToolPayload},
    util::encode::{PngCompression, encode_png_with_compression},
};

/// Engine settings fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// PNG compression level for every capture
    pub compression:     PngCompression,
    /// Upper bound for one platform call, enforced by the backend
    pub capture_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compression:     PngCompression::default(),
            capture_timeout: crate::capture::constants::default_capture_timeout(),
        }
    }
}

/// One consistent monitor enumeration: client-facing records plus the
/// handles needed to grab them.
struct MonitorSnapshot {
    monitors: Vec<Monitor>,
    handles:  Vec<crate::capture::MonitorHandle>,
}

/// Capture engine over a [`CompositeBackend`]
#[derive(Debug, Clone)]
pub struct CaptureEngine {
    backend: Arc<CompositeBackend>,
    config:  EngineConfig,
}

impl CaptureEngine {
    pub fn new(backend: Arc<CompositeBackend>) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    pub fn with_config(backend: Arc<CompositeBackend>, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &Arc<CompositeBackend> {
        &self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lists monitors with contiguous indices and normalized coordinates.
    ///
    /// An empty list means the backend reports no displays; it is not an
    /// error.
    pub fn list_monitors(&self) -> CaptureResult<Vec<Monitor>> {
        Ok(self.monitor_snapshot()?.monitors)
    }

    /// Equals `list_monitors().len()` for an unchanged topology.
    pub fn count_monitors(&self) -> CaptureResult<usize> {
        Ok(self.monitor_snapshot()?.monitors.len())
    }

    /// Captures a full monitor as PNG.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NoMonitors`] when the backend reports no displays
    /// - [`CaptureError::MonitorNotFound`] when the index is outside `0..count`
    /// - backend grab errors, unchanged
    pub fn capture_monitor(&self, selector: MonitorSelector) -> CaptureResult<CapturedImage> {
        let snapshot = self.monitor_snapshot()?;
        let available = snapshot.monitors.len();
        if available == 0 {
            return Err(CaptureError::NoMonitors);
        }

        let index = match selector {
            MonitorSelector::Primary => snapshot
                .monitors
                .iter()
                .position(|m| m.is_primary)
                .unwrap_or(0),
            MonitorSelector::Index(index) if index < available => index,
            MonitorSelector::Index(index) => {
                return Err(CaptureError::MonitorNotFound { index, available });
            }
        };

        let monitor = &snapshot.monitors[index];
        let target = CaptureTarget::Monitor {
            index,
            name: monitor.name.clone(),
        };
        tracing::debug!(%selector, index, handle = %snapshot.handles[index], "capturing monitor");

        let pixels = self
            .backend
            .monitors
            .grab_monitor_pixels(snapshot.handles[index])?;
        let image = self.finish_capture(pixels, target)?;

        tracing::info!(
            event = "core.capture.monitor_completed",
            index,
            width = image.width,
            height = image.height,
            bytes = image.size_bytes(),
        );
        Ok(image)
    }

    /// Lists windows in backend order with normalized coordinates.
    pub fn list_windows(&self) -> CaptureResult<Vec<Window>> {
        let raw = self.backend.windows.enumerate_windows()?;
        let (dx, dy) = self.desktop_origin();
        Ok(raw.into_iter().map(|w| to_window(w, dx, dy)).collect())
    }

    /// Equals `list_windows().len()` for an unchanged window set.
    pub fn count_windows(&self) -> CaptureResult<usize> {
        Ok(self.backend.windows.enumerate_windows()?.len())
    }

    /// Captures one window as PNG.
    ///
    /// The window list is re-read first, so a stale id is always reported
    /// as [`CaptureError::WindowNotFound`] and a window that exists but has
    /// nothing to rasterize as a capture failure.
    pub fn capture_window(&self, id: u32) -> CaptureResult<CapturedImage> {
        let window = self.find_window(id)?;
        let capabilities = self.backend.capabilities;

        if window.width == 0 || window.height == 0 {
            if window.is_minimized {
                return Err(CaptureError::WindowMinimized { id });
            }
            return Err(CaptureError::EmptySurface {
                target: format!("window {id}"),
                width:  window.width,
                height: window.height,
            });
        }
        if window.is_minimized && !capabilities.captures_minimized {
            return Err(CaptureError::WindowMinimized { id });
        }

        let target = CaptureTarget::Window {
            id,
            title: window.title,
            app_name: window.app_name,
        };
        tracing::debug!(
            window_id = id,
            mode = ?capabilities.window_capture_mode,
            "capturing window"
        );

        let pixels = self.backend.windows.grab_window_pixels(id)?;
        let image = self.finish_capture(pixels, target)?;

        tracing::info!(
            event = "core.capture.window_completed",
            window_id = id,
            width = image.width,
            height = image.height,
            bytes = image.size_bytes(),
        );
        Ok(image)
    }

    /// Asks the OS to close a window.
    ///
    /// Existence is checked before capability, so an unknown id is
    /// `NotFound` on every backend.
    pub fn close_window(&self, id: u32) -> CaptureResult<CloseAck> {
        let window = self.find_window(id)?;
        let Some(closer) = &self.backend.closer else {
            return Err(CaptureError::NotSupported {
                feature: "close_window".to_string(),
                backend: self.backend.backend,
            });
        };

        closer.request_close(id)?;
        tracing::info!(
            event = "core.window.close_requested",
            window_id = id,
            app_name = %window.app_name,
        );
        Ok(CloseAck {
            window_id: id,
            title:     window.title,
            app_name:  window.app_name,
        })
    }

    /// Runs a validated invocation and wraps the result as a tool payload.
    pub fn execute(&self, invocation: &Invocation) -> ToolOutcome {
        match invocation {
            Invocation::ListMonitors => self.list_monitors().map(ToolPayload::Monitors),
            Invocation::CountMonitors => self.count_monitors().map(ToolPayload::Count),
            Invocation::CaptureMonitor { selector } => {
                self.capture_monitor(*selector).map(ToolPayload::Image)
            }
            Invocation::ListWindows => self.list_windows().map(ToolPayload::Windows),
            Invocation::CountWindows => self.count_windows().map(ToolPayload::Count),
            Invocation::CaptureWindow { window_id } => {
                self.capture_window(*window_id).map(ToolPayload::Image)
            }
            Invocation::CloseWindow { window_id } => {
                self.close_window(*window_id).map(ToolPayload::Closed)
            }
        }
    }

    fn monitor_snapshot(&self) -> CaptureResult<MonitorSnapshot> {
        let raw = self.backend.monitors.enumerate_monitors()?;
        Ok(build_snapshot(raw))
    }

    /// Top-left of the primary monitor in backend coordinates.
    fn desktop_origin(&self) -> (i32, i32) {
        match self.backend.monitors.enumerate_monitors() {
            Ok(raw) => primary_origin(&raw),
            Err(e) => {
                tracing::debug!(error = %e, "monitor enumeration failed; window coordinates left as reported");
                (0, 0)
            }
        }
    }

    fn find_window(&self, id: u32) -> CaptureResult<RawWindow> {
        self.backend
            .windows
            .enumerate_windows()?
            .into_iter()
            .find(|w| w.id == id)
            .ok_or(CaptureError::WindowNotFound { id })
    }

    fn finish_capture(
        &self,
        pixels: PixelBuffer,
        target: CaptureTarget,
    ) -> CaptureResult<CapturedImage> {
        let (width, height) = pixels.dimensions();
        if pixels.is_empty() {
            return Err(CaptureError::EmptySurface {
                target: target.to_string(),
                width,
                height,
            });
        }

        let png = encode_png_with_compression(&pixels, self.config.compression)?;
        Ok(CapturedImage {
            png,
            width,
            height,
            target,
            captured_at: Utc::now(),
        })
    }
}

fn usable(raw: &RawMonitor) -> bool {
    raw.width > 0 && raw.height > 0
}

fn primary_origin(raw: &[RawMonitor]) -> (i32, i32) {
    raw.iter()
        .filter(|m| usable(m))
        .find(|m| m.is_primary)
        .map(|m| (m.x, m.y))
        .unwrap_or((0, 0))
}

fn build_snapshot(raw: Vec<RawMonitor>) -> MonitorSnapshot {
    let (dx, dy) = primary_origin(&raw);
    let mut seen_primary = false;
    let mut monitors = Vec::with_capacity(raw.len());
    let mut handles = Vec::with_capacity(raw.len());

    for m in raw.into_iter().filter(usable) {
        let is_primary = m.is_primary && !seen_primary;
        seen_primary |= is_primary;
        monitors.push(Monitor {
            index: monitors.len(),
            name: m.name,
            x: m.x.saturating_sub(dx),
            y: m.y.saturating_sub(dy),
            width: m.width,
            height: m.height,
            is_primary,
        });
        handles.push(m.handle);
    }

    MonitorSnapshot { monitors, handles }
}

fn to_window(raw: RawWindow, dx: i32, dy: i32) -> Window {
    Window {
        id:           raw.id,
        title:        raw.title,
        app_name:     raw.app_name,
        x:            raw.x.saturating_sub(dx),
        y:            raw.y.saturating_sub(dy),
        width:        raw.width,
        height:       raw.height,
        is_minimized: raw.is_minimized,
        is_maximized: raw.is_maximized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capture::{MockBackend, composite_from_mock},
        error::ErrorKind,
        model::BackendType,
        util::encode::has_png_signature,
    };

    fn engine_with(mock: MockBackend) -> (CaptureEngine, Arc<MockBackend>) {
        let mock = Arc::new(mock);
        let engine = CaptureEngine::new(Arc::new(composite_from_mock(mock.clone())));
        (engine, mock)
    }

    fn engine() -> CaptureEngine {
        engine_with(MockBackend::new()).0
    }

    #[test]
    fn test_list_monitors_indices_are_contiguous() {
        let monitors = engine().list_monitors().unwrap();
        let indices: Vec<usize> = monitors.iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(monitors.iter().filter(|m| m.is_primary).count(), 1);
    }

    #[test]
    fn test_count_matches_list() {
        let engine = engine();
        assert_eq!(engine.count_monitors().unwrap(), engine.list_monitors().unwrap().len());
        assert_eq!(engine.count_windows().unwrap(), engine.list_windows().unwrap().len());
    }

    #[test]
    fn test_zero_area_monitors_are_dropped_before_indexing() {
        let (engine, _) = engine_with(MockBackend::new().with_monitors(vec![
            MockBackend::monitor(1, "ghost", (0, 0), (0, 0), false),
            MockBackend::monitor(2, "A", (0, 0), (100, 100), true),
            MockBackend::monitor(3, "B", (100, 0), (100, 100), false),
        ]));
        let monitors = engine.list_monitors().unwrap();
        assert_eq!(monitors.len(), 2);
        assert_eq!(monitors[0].name, "A");
        assert_eq!(monitors[1].index, 1);
    }

    #[test]
    fn test_only_first_primary_survives() {
        let (engine, _) = engine_with(MockBackend::new().with_monitors(vec![
            MockBackend::monitor(1, "A", (0, 0), (100, 100), true),
            MockBackend::monitor(2, "B", (100, 0), (100, 100), true),
        ]));
        let monitors = engine.list_monitors().unwrap();
        assert!(monitors[0].is_primary);
        assert!(!monitors[1].is_primary);
    }

    #[test]
    fn test_coordinates_are_relative_to_primary() {
        let (engine, _) = engine_with(
            MockBackend::new()
                .with_monitors(vec![
                    MockBackend::monitor(1, "left", (0, 0), (1920, 1080), false),
                    MockBackend::monitor(2, "main", (1920, 0), (2560, 1440), true),
                ])
                .with_windows(vec![MockBackend::window(7, "w", "app", (2000, 100), (300, 200))]),
        );

        let monitors = engine.list_monitors().unwrap();
        assert_eq!((monitors[0].x, monitors[0].y), (-1920, 0));
        assert_eq!((monitors[1].x, monitors[1].y), (0, 0));

        let windows = engine.list_windows().unwrap();
        assert_eq!((windows[0].x, windows[0].y), (80, 100));
    }

    #[test]
    fn test_extreme_origins_saturate() {
        let (engine, _) = engine_with(
            MockBackend::new()
                .with_monitors(vec![
                    MockBackend::monitor(1, "far", (i32::MIN, 0), (100, 100), false),
                    MockBackend::monitor(2, "main", (1000, 0), (100, 100), true),
                ])
                .with_windows(vec![MockBackend::window(7, "w", "app", (i32::MIN + 5, 0), (10, 10))]),
        );

        let monitors = engine.list_monitors().unwrap();
        assert_eq!(monitors[0].x, i32::MIN);
        assert_eq!(monitors[1].x, 0);
        assert_eq!(engine.list_windows().unwrap()[0].x, i32::MIN);
    }

    #[test]
    fn test_no_primary_leaves_coordinates() {
        let (engine, _) = engine_with(MockBackend::new().with_monitors(vec![
            MockBackend::monitor(1, "A", (50, 60), (100, 100), false),
        ]));
        let monitors = engine.list_monitors().unwrap();
        assert_eq!((monitors[0].x, monitors[0].y), (50, 60));
        assert!(!monitors[0].is_primary);
    }

    #[test]
    fn test_empty_topology_is_valid() {
        let (engine, _) = engine_with(MockBackend::empty());
        assert!(engine.list_monitors().unwrap().is_empty());
        assert_eq!(engine.count_windows().unwrap(), 0);
    }

    #[test]
    fn test_capture_primary_monitor() {
        let image = engine().capture_monitor(MonitorSelector::Primary).unwrap();
        assert!(has_png_signature(&image.png));
        assert_eq!((image.width, image.height), (640, 360));
        assert!(matches!(image.target, CaptureTarget::Monitor { index: 0, .. }));
    }

    #[test]
    fn test_capture_primary_without_flag_uses_index_zero() {
        let (engine, _) = engine_with(MockBackend::new().with_monitors(vec![
            MockBackend::monitor(1, "A", (0, 0), (30, 20), false),
            MockBackend::monitor(2, "B", (30, 0), (40, 20), false),
        ]));
        let image = engine.capture_monitor(MonitorSelector::Primary).unwrap();
        assert_eq!(image.width, 30);
    }

    #[test]
    fn test_capture_every_monitor_index() {
        let engine = engine();
        let count = engine.count_monitors().unwrap();
        for index in 0..count {
            let image = engine.capture_monitor(MonitorSelector::Index(index)).unwrap();
            assert!(has_png_signature(&image.png));
        }

        let err = engine
            .capture_monitor(MonitorSelector::Index(count))
            .unwrap_err();
        assert!(matches!(err, CaptureError::MonitorNotFound { index: 2, available: 2 }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_capture_with_no_monitors() {
        let (engine, _) = engine_with(MockBackend::empty());
        let err = engine.capture_monitor(MonitorSelector::Primary).unwrap_err();
        assert!(matches!(err, CaptureError::NoMonitors));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_capture_window() {
        let image = engine().capture_window(101).unwrap();
        assert!(has_png_signature(&image.png));
        assert_eq!((image.width, image.height), (400, 300));
        assert!(image.target.to_string().contains("Mozilla Firefox"));
    }

    #[test]
    fn test_capture_unknown_window_is_not_found() {
        let err = engine().capture_window(999_999_999).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_capture_minimized_window_is_capture_failure() {
        let (engine, mock) = engine_with(MockBackend::new());
        let err = engine.capture_window(103).unwrap_err();
        assert!(matches!(err, CaptureError::WindowMinimized { id: 103 }));
        assert_eq!(err.kind(), ErrorKind::CaptureFailure);
        assert!(!err.to_string().contains("does not exist"));
        assert_eq!(mock.grab_count(), 0);
    }

    #[test]
    fn test_capture_zero_size_window_is_empty_surface() {
        let (engine, _) = engine_with(MockBackend::new().with_windows(vec![MockBackend::window(
            5,
            "tooltip",
            "app",
            (0, 0),
            (0, 12),
        )]));
        let err = engine.capture_window(5).unwrap_err();
        assert!(matches!(err, CaptureError::EmptySurface { width: 0, height: 12, .. }));
        assert_eq!(err.kind(), ErrorKind::CaptureFailure);
    }

    #[test]
    fn test_stale_window_stays_not_found() {
        let (engine, _) = engine_with(MockBackend::new().with_stale_window(101));
        let err = engine.capture_window(101).unwrap_err();
        assert!(matches!(err, CaptureError::WindowNotFound { id: 101 }));
    }

    #[test]
    fn test_close_window() {
        let (engine, mock) = engine_with(MockBackend::new());
        let ack = engine.close_window(102).unwrap();
        assert_eq!(ack.window_id, 102);
        assert_eq!(ack.app_name, "code");
        assert_eq!(mock.closed_windows(), vec![102]);
        assert!(engine.list_windows().unwrap().iter().all(|w| w.id != 102));
    }

    #[test]
    fn test_close_unknown_window_is_not_found() {
        let err = engine().close_window(999_999_999).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_close_without_closer_is_unsupported() {
        let mock = Arc::new(MockBackend::new());
        let backend = CompositeBackend::new(
            mock.clone(),
            mock,
            None,
            crate::capture::BackendCapabilities::serialized(),
            BackendType::MacOS,
            "test",
        );
        let engine = CaptureEngine::new(Arc::new(backend));

        let err = engine.close_window(101).unwrap_err();
        assert!(matches!(err, CaptureError::NotSupported { .. }));
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        // existence is checked first
        assert!(engine.close_window(999_999_999).unwrap_err().is_not_found());
    }

    #[test]
    fn test_injected_error_propagates() {
        let (engine, _) = engine_with(MockBackend::new().with_error(CaptureError::PermissionDenied {
            backend: BackendType::Mock,
            reason:  "screen recording not authorized".to_string(),
        }));
        let err = engine.list_monitors().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_execute_maps_payloads() {
        let engine = engine();
        assert!(matches!(
            engine.execute(&Invocation::CountMonitors),
            Ok(ToolPayload::Count(2))
        ));
        assert!(matches!(
            engine.execute(&Invocation::ListWindows),
            Ok(ToolPayload::Windows(ref w)) if w.len() == 3
        ));
        assert!(matches!(
            engine.execute(&Invocation::CaptureWindow { window_id: 101 }),
            Ok(ToolPayload::Image(_))
        ));
        assert!(matches!(
            engine.execute(&Invocation::CloseWindow { window_id: 101 }),
            Ok(ToolPayload::Closed(_))
        ));
    }

    #[test]
    fn test_compression_config_is_applied() {
        let mock = Arc::new(MockBackend::new());
        let backend = Arc::new(composite_from_mock(mock));
        let fast = CaptureEngine::with_config(backend.clone(), EngineConfig {
            compression: PngCompression::Fast,
            ..EngineConfig::default()
        });
        let best = CaptureEngine::with_config(backend, EngineConfig {
            compression: PngCompression::Best,
            ..EngineConfig::default()
        });

        let a = fast.capture_monitor(MonitorSelector::Primary).unwrap();
        let b = best.capture_monitor(MonitorSelector::Primary).unwrap();
        assert!(has_png_signature(&a.png) && has_png_signature(&b.png));
        assert_eq!((a.width, a.height), (b.width, b.height));
    }
}
