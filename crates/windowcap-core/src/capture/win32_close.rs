//! Graceful window close on Windows
//!
//! Posts `WM_CLOSE` to the window, which is what the system menu's Close
//! item does. `PostMessageW` returns once the message is queued; it does not
//! wait for the owning thread to process it.

use windows_sys::Win32::{
    Foundation::{FALSE, HWND},
    UI::WindowsAndMessaging::{IsWindow, PostMessageW, WM_CLOSE},
};

use super::{WindowCloser, WindowId};
use crate::error::{CaptureError, CaptureResult};

/// [`WindowCloser`] backed by `PostMessageW(WM_CLOSE)`
#[derive(Debug, Default)]
pub struct Win32WindowCloser;

impl Win32WindowCloser {
    pub fn new() -> Self {
        Self
    }
}

fn to_hwnd(id: WindowId) -> HWND {
    id as usize as HWND
}

impl WindowCloser for Win32WindowCloser {
    fn request_close(&self, id: WindowId) -> CaptureResult<()> {
        let hwnd = to_hwnd(id);

        // SAFETY: IsWindow accepts arbitrary handle values and only reads
        // the window table.
        if unsafe { IsWindow(hwnd) } == FALSE {
            return Err(CaptureError::WindowNotFound { id });
        }

        // SAFETY: the handle was validated above; WM_CLOSE carries no
        // pointer parameters.
        let posted = unsafe { PostMessageW(hwnd, WM_CLOSE, 0, 0) };
        if posted == FALSE {
            let os_error = std::io::Error::last_os_error();
            return Err(CaptureError::CaptureFailed {
                target: format!("window {id}"),
                reason: format!("PostMessageW(WM_CLOSE) failed: {os_error}"),
            });
        }

        tracing::info!(window_id = id, "posted WM_CLOSE");
        Ok(())
    }
}
