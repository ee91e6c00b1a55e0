//! Error types for capture operations
//!
//! Every failure is a [`CaptureError`]. Each variant maps onto exactly one
//! externally visible [`ErrorKind`], which is what clients match on. Message
//! text is part of the contract as well: `NotFound` errors always contain
//! "does not exist" or "not found", and no other kind does.
//!
//! # Structured Error Hints
//!
//! Errors also provide structured metadata via [`ErrorHint`] so that clients
//! can attempt recovery without parsing prose.
//!
//! ```rust,ignore
//! let error = CaptureError::WindowNotFound { id: 42 };
//! let hint = error.structured_hint();
//!
//! if let Some(tool) = hint.suggested_tool {
//!     println!("Try calling: {}", tool);
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::model::BackendType;

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Externally visible error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Monitor index or window id does not currently exist
    NotFound,
    /// Target exists but pixels (or the close request) could not be obtained
    CaptureFailure,
    /// OS-level consent not granted
    PermissionDenied,
    /// Arguments failed validation before reaching the engine
    InvalidArgument,
    /// Framing or connection fault
    TransportError,
    /// The active backend lacks the capability
    Unsupported,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::CaptureFailure => "CaptureFailure",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::TransportError => "TransportError",
            ErrorKind::Unsupported => "Unsupported",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error hint for client auto-recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHint {
    /// Human-readable description of how to fix the error
    pub message: String,

    /// Category of recovery action to attempt
    pub recovery_action: RecoveryAction,

    /// Tool to call for recovery (if applicable)
    pub suggested_tool: Option<String>,

    /// Parameters to pass to the suggested tool
    pub tool_params: Option<serde_json::Value>,

    /// Whether the error is likely transient (retry may succeed)
    pub is_transient: bool,

    /// Error category for grouping/filtering
    pub category: ErrorCategory,
}

/// Category of recovery action a client can attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Call a different tool to get more information
    CallTool,
    /// Retry the same operation
    Retry,
    /// Modify parameters and retry
    ModifyParams,
    /// Require user intervention (permission grant, restoring a window)
    RequireUser,
    /// No automated recovery possible
    None,
}

/// High-level error category for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NotFound,
    PermissionDenied,
    InvalidInput,
    Unavailable,
    Timeout,
    SystemError,
    ProcessingError,
}

/// Error type for capture operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    /// Monitor index outside the current `0..count` range
    #[error("Monitor index {index} does not exist ({available} monitors available)")]
    MonitorNotFound {
        index:     usize,
        available: usize,
    },

    /// The backend reports zero displays
    #[error("Monitor not found: no displays are available")]
    NoMonitors,

    /// No currently-open window has this id
    #[error("Window ID {id} does not exist")]
    WindowNotFound { id: u32 },

    /// The window exists but is minimized and the backend cannot rasterize it
    #[error("Window ID {id} is minimized and cannot be captured")]
    WindowMinimized { id: u32 },

    /// The target has a zero-area surface
    #[error("Capture of {target} produced an empty surface ({width}x{height})")]
    EmptySurface {
        target: String,
        width:  u32,
        height: u32,
    },

    /// The platform refused or failed to produce pixels
    #[error("Capture of {target} failed: {reason}")]
    CaptureFailed { target: String, reason: String },

    /// A backend call did not finish within its bounded wait
    #[error("Capture operation timed out after {duration_ms}ms")]
    CaptureTimeout { duration_ms: u64 },

    /// Permission denied for the capture operation
    #[error("Permission denied for screen capture on {backend}: {reason}")]
    PermissionDenied {
        backend: BackendType,
        reason:  String,
    },

    /// Invalid parameter provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    /// Invocation named an operation outside the catalog
    #[error("Unknown tool '{name}'")]
    UnknownOperation { name: String },

    /// Image encoding failed
    #[error("Failed to encode image as {format}: {reason}")]
    EncodingFailed { format: String, reason: String },

    /// Capability missing on the active backend
    #[error("{feature} is not supported by the {backend} backend")]
    NotSupported {
        feature: String,
        backend: BackendType,
    },

    /// Backend could not be initialized on this platform/session
    #[error("Capture backend '{backend}' is not available")]
    BackendNotAvailable { backend: BackendType },

    /// The capture context stopped before producing a result
    #[error("Capture context unavailable: {reason}")]
    ContextUnavailable { reason: String },

    /// Framing or connection fault
    #[error("Transport error: {reason}")]
    Transport { reason: String },
}

impl CaptureError {
    /// The externally visible kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::MonitorNotFound { .. }
            | CaptureError::NoMonitors
            | CaptureError::WindowNotFound { .. } => ErrorKind::NotFound,
            CaptureError::WindowMinimized { .. }
            | CaptureError::EmptySurface { .. }
            | CaptureError::CaptureFailed { .. }
            | CaptureError::CaptureTimeout { .. }
            | CaptureError::EncodingFailed { .. }
            | CaptureError::BackendNotAvailable { .. }
            | CaptureError::ContextUnavailable { .. } => ErrorKind::CaptureFailure,
            CaptureError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            CaptureError::InvalidParameter { .. } | CaptureError::UnknownOperation { .. } => {
                ErrorKind::InvalidArgument
            }
            CaptureError::NotSupported { .. } => ErrorKind::Unsupported,
            CaptureError::Transport { .. } => ErrorKind::TransportError,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns a user-facing remediation hint for this error.
    ///
    /// ```
    /// use windowcap_core::error::CaptureError;
    ///
    /// let error = CaptureError::WindowNotFound { id: 42 };
    /// assert!(error.remediation_hint().contains("list_windows"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            CaptureError::MonitorNotFound { .. } | CaptureError::NoMonitors => {
                "Use the list_monitors tool to see the current displays. Monitor indices are \
                 reassigned on every enumeration and change when displays are connected or \
                 removed."
            }
            CaptureError::WindowNotFound { .. } => {
                "Use the list_windows tool to get current window ids. The window may have been \
                 closed, and ids can be reused by the OS after a window closes."
            }
            CaptureError::WindowMinimized { .. } => {
                "Restore the window before capturing it. Minimized surfaces cannot be rasterized \
                 by this backend."
            }
            CaptureError::EmptySurface { .. } => {
                "The target has no visible area. Pick a window with a non-zero size from \
                 list_windows."
            }
            CaptureError::CaptureFailed { .. } => {
                "The platform could not produce pixels for the target. Retry, or check that the \
                 display session is still active."
            }
            CaptureError::CaptureTimeout { .. } => {
                "The platform capture call took too long. The display server may be busy or \
                 unresponsive; retry shortly."
            }
            CaptureError::PermissionDenied { backend, .. } => match backend {
                BackendType::MacOS => {
                    "Grant screen recording permission in System Settings > Privacy & Security > \
                     Screen Recording, then restart the server."
                }
                BackendType::Windows => {
                    "Grant screen capture access in Windows Settings > Privacy and ensure the \
                     server runs with sufficient privileges."
                }
                BackendType::Wayland => {
                    "Grant screenshot permission when prompted by the desktop environment. Window \
                     capture is restricted on Wayland."
                }
                BackendType::X11 => {
                    "Ensure the X server allows screen capture. Check xhost settings if running in \
                     a restricted environment."
                }
                BackendType::None | BackendType::Mock => {
                    "Screen capture permission was refused by the platform."
                }
            },
            CaptureError::InvalidParameter { parameter, .. } => match parameter.as_str() {
                "monitor_index" => "monitor_index must be a non-negative integer or \"primary\".",
                "window_id" => "window_id must be an id returned by list_windows.",
                _ => "Check the arguments against the tool's input schema.",
            },
            CaptureError::UnknownOperation { .. } => {
                "Use tools/list to see the available tools."
            }
            CaptureError::EncodingFailed { .. } => {
                "PNG encoding failed. This usually means the backend returned a malformed pixel \
                 buffer; retry the capture."
            }
            CaptureError::NotSupported { .. } => {
                "This operation is not available on the current platform."
            }
            CaptureError::BackendNotAvailable { backend } => match backend {
                BackendType::None => {
                    "No display session detected. Set DISPLAY or WAYLAND_DISPLAY, or start the \
                     server with --mock."
                }
                _ => "The capture backend failed to initialize for this session.",
            },
            CaptureError::ContextUnavailable { .. } => {
                "The capture worker stopped. Restart the server."
            }
            CaptureError::Transport { .. } => {
                "The client connection failed. Reconnect and retry the request."
            }
        }
    }

    /// Returns structured hint metadata for client auto-recovery.
    ///
    /// ```
    /// use windowcap_core::error::{CaptureError, RecoveryAction};
    ///
    /// let hint = CaptureError::WindowNotFound { id: 42 }.structured_hint();
    /// assert_eq!(hint.recovery_action, RecoveryAction::CallTool);
    /// assert_eq!(hint.suggested_tool.as_deref(), Some("list_windows"));
    /// ```
    pub fn structured_hint(&self) -> ErrorHint {
        let hint = |recovery_action, suggested_tool: Option<&str>, is_transient, category| {
            ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action,
                suggested_tool: suggested_tool.map(str::to_string),
                tool_params: None,
                is_transient,
                category,
            }
        };

        match self {
            CaptureError::MonitorNotFound { index, available } => ErrorHint {
                tool_params: Some(serde_json::json!({
                    "requested_index": index,
                    "available": available,
                })),
                ..hint(
                    RecoveryAction::CallTool,
                    Some("list_monitors"),
                    false,
                    ErrorCategory::NotFound,
                )
            },
            CaptureError::NoMonitors => hint(
                RecoveryAction::CallTool,
                Some("list_monitors"),
                true,
                ErrorCategory::NotFound,
            ),
            CaptureError::WindowNotFound { id } => ErrorHint {
                tool_params: Some(serde_json::json!({ "stale_window_id": id })),
                ..hint(
                    RecoveryAction::CallTool,
                    Some("list_windows"),
                    false,
                    ErrorCategory::NotFound,
                )
            },
            CaptureError::WindowMinimized { .. } => hint(
                RecoveryAction::RequireUser,
                None,
                false,
                ErrorCategory::Unavailable,
            ),
            CaptureError::EmptySurface { .. } => hint(
                RecoveryAction::CallTool,
                Some("list_windows"),
                false,
                ErrorCategory::Unavailable,
            ),
            CaptureError::CaptureFailed { .. } => {
                hint(RecoveryAction::Retry, None, true, ErrorCategory::SystemError)
            }
            CaptureError::CaptureTimeout { duration_ms } => ErrorHint {
                tool_params: Some(serde_json::json!({ "timeout_ms": duration_ms })),
                ..hint(RecoveryAction::Retry, None, true, ErrorCategory::Timeout)
            },
            CaptureError::PermissionDenied { .. } => hint(
                RecoveryAction::RequireUser,
                None,
                false,
                ErrorCategory::PermissionDenied,
            ),
            CaptureError::InvalidParameter { parameter, reason } => ErrorHint {
                tool_params: Some(serde_json::json!({
                    "invalid_parameter": parameter,
                    "reason": reason,
                })),
                ..hint(
                    RecoveryAction::ModifyParams,
                    None,
                    false,
                    ErrorCategory::InvalidInput,
                )
            },
            CaptureError::UnknownOperation { .. } => hint(
                RecoveryAction::ModifyParams,
                None,
                false,
                ErrorCategory::InvalidInput,
            ),
            CaptureError::EncodingFailed { .. } => hint(
                RecoveryAction::Retry,
                None,
                true,
                ErrorCategory::ProcessingError,
            ),
            CaptureError::NotSupported { .. } | CaptureError::BackendNotAvailable { .. } => {
                hint(RecoveryAction::None, None, false, ErrorCategory::Unavailable)
            }
            CaptureError::ContextUnavailable { .. } => {
                hint(RecoveryAction::None, None, false, ErrorCategory::SystemError)
            }
            CaptureError::Transport { .. } => {
                hint(RecoveryAction::Retry, None, true, ErrorCategory::SystemError)
            }
        }
    }
}
