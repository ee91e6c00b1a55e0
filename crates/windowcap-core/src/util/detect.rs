//! Runtime detection of the OS and display session
//!
//! Windows and macOS have exactly one session type. On Linux the session is
//! read from the environment:
//!
//! 1. `XDG_SESSION_TYPE=x11` with `$DISPLAY` set selects X11 even when a
//!    Wayland socket is also advertised (nested compositors do this)
//! 2. a non-empty `$WAYLAND_DISPLAY` selects Wayland
//! 3. a non-empty `$DISPLAY` selects X11
//! 4. otherwise there is no display session

use crate::model::{BackendType, PlatformInfo};

/// Detects the current platform and display session.
///
/// ```
/// use windowcap_core::util::detect::detect_platform;
///
/// let platform = detect_platform();
/// assert!(!platform.os.is_empty());
/// ```
pub fn detect_platform() -> PlatformInfo {
    detect_platform_from(|key| std::env::var(key).ok())
}

/// Platform detection with an injectable environment lookup.
pub(crate) fn detect_platform_from<F>(lookup: F) -> PlatformInfo
where
    F: Fn(&str) -> Option<String>,
{
    let (os, backend) = if cfg!(target_os = "windows") {
        ("windows", BackendType::Windows)
    } else if cfg!(target_os = "macos") {
        ("macos", BackendType::MacOS)
    } else if cfg!(target_os = "linux") {
        ("linux", linux_session(&lookup))
    } else {
        ("unknown", BackendType::None)
    };
    PlatformInfo::new(os.to_string(), backend)
}

fn linux_session<F>(lookup: &F) -> BackendType
where
    F: Fn(&str) -> Option<String>,
{
    let set = |key: &str| lookup(key).is_some_and(|value| !value.trim().is_empty());
    let session_type = lookup("XDG_SESSION_TYPE").map(|value| value.to_lowercase());

    if session_type.as_deref() == Some("x11") && set("DISPLAY") {
        BackendType::X11
    } else if set("WAYLAND_DISPLAY") {
        BackendType::Wayland
    } else if set("DISPLAY") {
        BackendType::X11
    } else {
        BackendType::None
    }
}
