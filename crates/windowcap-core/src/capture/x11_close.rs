//! Graceful window close on X11
//!
//! Sends the ICCCM `WM_PROTOCOLS` / `WM_DELETE_WINDOW` client message to the
//! target window, the same request a window manager sends when the user
//! clicks the close button. The application decides what to do with it (it
//! may ask to save, or ignore the request entirely).
//!
//! A fresh connection is opened per request, so the closer is safe to call
//! from any thread.

use x11rb::{
    connection::Connection as _,
    protocol::xproto::{ClientMessageEvent, ConnectionExt as _, EventMask},
    rust_connection::RustConnection,
};

use super::{WindowCloser, WindowId};
use crate::{
    error::{CaptureError, CaptureResult},
    model::BackendType,
};

/// [`WindowCloser`] for X11 sessions (including XWayland clients)
#[derive(Debug, Default)]
pub struct X11WindowCloser;

impl X11WindowCloser {
    /// Creates the closer if an X display is configured.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::BackendNotAvailable`] when `$DISPLAY` is unset.
    pub fn new() -> CaptureResult<Self> {
        match std::env::var("DISPLAY") {
            Ok(display) if !display.is_empty() => Ok(Self),
            _ => Err(CaptureError::BackendNotAvailable {
                backend: BackendType::X11,
            }),
        }
    }

    fn connect(id: WindowId) -> CaptureResult<RustConnection> {
        let (conn, _screen) = x11rb::connect(None).map_err(|e| close_failed(id, &e))?;
        Ok(conn)
    }

    fn intern(conn: &RustConnection, id: WindowId, name: &[u8]) -> CaptureResult<u32> {
        let atom = conn
            .intern_atom(false, name)
            .map_err(|e| close_failed(id, &e))?
            .reply()
            .map_err(|e| close_failed(id, &e))?
            .atom;
        Ok(atom)
    }
}

fn close_failed(id: WindowId, error: &dyn std::fmt::Display) -> CaptureError {
    CaptureError::CaptureFailed {
        target: format!("window {id}"),
        reason: format!("X11 close request failed: {error}"),
    }
}

impl WindowCloser for X11WindowCloser {
    fn request_close(&self, id: WindowId) -> CaptureResult<()> {
        let conn = Self::connect(id)?;

        // A BadWindow reply means the id is stale.
        let exists = conn
            .get_window_attributes(id)
            .map_err(|e| close_failed(id, &e))?
            .reply()
            .is_ok();
        if !exists {
            return Err(CaptureError::WindowNotFound { id });
        }

        let wm_protocols = Self::intern(&conn, id, b"WM_PROTOCOLS")?;
        let wm_delete_window = Self::intern(&conn, id, b"WM_DELETE_WINDOW")?;

        let event = ClientMessageEvent::new(
            32,
            id,
            wm_protocols,
            [wm_delete_window, x11rb::CURRENT_TIME, 0, 0, 0],
        );
        conn.send_event(false, id, EventMask::NO_EVENT, event)
            .map_err(|e| close_failed(id, &e))?
            .check()
            .map_err(|e| close_failed(id, &e))?;
        conn.flush().map_err(|e| close_failed(id, &e))?;

        tracing::info!(window_id = id, "sent WM_DELETE_WINDOW");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_display() {
        temp_env::with_var("DISPLAY", None::<&str>, || {
            let err = X11WindowCloser::new().unwrap_err();
            assert!(matches!(
                err,
                CaptureError::BackendNotAvailable {
                    backend: BackendType::X11
                }
            ));
        });
    }

    #[test]
    fn test_new_with_display() {
        temp_env::with_var("DISPLAY", Some(":99"), || {
            assert!(X11WindowCloser::new().is_ok());
        });
    }

    #[test]
    fn test_close_failed_is_capture_failure() {
        let err = close_failed(12, &"connection refused");
        let msg = err.to_string();
        assert!(msg.contains("window 12"));
        assert!(msg.contains("connection refused"));
        assert!(!msg.contains("does not exist"));
    }
}
