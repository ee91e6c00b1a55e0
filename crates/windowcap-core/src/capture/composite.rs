//! Composite backend that holds capability trait objects
//!
//! The engine never sees a concrete backend. It talks to a
//! [`CompositeBackend`], which bundles the capability trait objects the active
//! backend provides together with its [`BackendCapabilities`].
//!
//! # Example
//!
//! ```rust,ignore
//! use windowcap_core::capture::create_default_backend;
//!
//! let backend = create_default_backend(timeout)?;
//!
//! // Close is optional
//! if let Some(closer) = &backend.closer {
//!     closer.request_close(window_id)?;
//! }
//! ```

use std::sync::Arc;

use super::{BackendCapabilities, MonitorSource, WindowCloser, WindowSource};
use crate::model::BackendType;

/// Composite backend holding capability trait objects.
///
/// # Capabilities
///
/// - `monitors`: display enumeration and capture (all backends)
/// - `windows`: window enumeration and capture (all backends)
/// - `closer`: graceful close (X11, Windows, Mock; not macOS)
pub struct CompositeBackend {
    pub monitors: Arc<dyn MonitorSource>,

    pub windows: Arc<dyn WindowSource>,

    /// Absent when the platform has no graceful close mechanism.
    pub closer: Option<Arc<dyn WindowCloser>>,

    /// Capability flags for runtime queries.
    pub capabilities: BackendCapabilities,

    /// Session type, for diagnostics and error messages.
    pub backend: BackendType,

    /// Backend name for diagnostics.
    pub name: &'static str,
}

impl CompositeBackend {
    /// Creates a new CompositeBackend.
    ///
    /// `capabilities.supports_close` is derived from `closer`.
    pub fn new(
        monitors: Arc<dyn MonitorSource>,
        windows: Arc<dyn WindowSource>,
        closer: Option<Arc<dyn WindowCloser>>,
        capabilities: BackendCapabilities,
        backend: BackendType,
        name: &'static str,
    ) -> Self {
        let capabilities = BackendCapabilities {
            supports_close: closer.is_some(),
            ..capabilities
        };
        Self {
            monitors,
            windows,
            closer,
            capabilities,
            backend,
            name,
        }
    }

    pub fn has_close(&self) -> bool {
        self.closer.is_some()
    }
}

impl std::fmt::Debug for CompositeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeBackend")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("has_closer", &self.closer.is_some())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates a CompositeBackend from a MockBackend.
pub fn composite_from_mock(backend: Arc<super::MockBackend>) -> CompositeBackend {
    let capabilities = backend.capabilities();
    CompositeBackend::new(
        backend.clone() as Arc<dyn MonitorSource>,
        backend.clone() as Arc<dyn WindowSource>,
        Some(backend as Arc<dyn WindowCloser>),
        capabilities,
        BackendType::Mock,
        "mock",
    )
}

/// Creates a CompositeBackend from an XcapBackend and an optional closer.
pub fn composite_from_xcap(
    backend: Arc<super::XcapBackend>,
    closer: Option<Arc<dyn WindowCloser>>,
) -> CompositeBackend {
    let capabilities = backend.capabilities();
    let session = backend.backend_type();
    CompositeBackend::new(
        backend.clone() as Arc<dyn MonitorSource>,
        backend as Arc<dyn WindowSource>,
        closer,
        capabilities,
        session,
        "xcap",
    )
}
