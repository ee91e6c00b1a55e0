//! Timeout and naming constants shared by backends and the dispatcher.
//!
//! # Timeouts
//!
//! The engine itself never times out. A stuck platform call would block the
//! capture queue forever, so every backend bounds its own waits and reports
//! exhaustion as [`CaptureError::CaptureTimeout`](crate::error::CaptureError::CaptureTimeout),
//! which clients see as a `CaptureFailure`.
//!
//! | Setting | Default | Override |
//! |---------|---------|----------|
//! | platform call timeout | 5000 ms | `--capture-timeout-ms` |

use std::time::Duration;

/// Default bound on a single platform call made by the xcap backend.
///
/// High-resolution multi-monitor grabs on a loaded compositor can take a
/// second or more; five seconds still detects a hung display server.
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 5000;

/// Thread name of the dispatcher's capture context.
pub const CAPTURE_CONTEXT_THREAD: &str = "capture-context";

/// Thread name of the xcap backend's platform thread.
pub const PLATFORM_THREAD: &str = "xcap-platform";

/// [`DEFAULT_CAPTURE_TIMEOUT_MS`] as a `Duration`.
pub fn default_capture_timeout() -> Duration {
    Duration::from_millis(DEFAULT_CAPTURE_TIMEOUT_MS)
}
