//! A real X11 window with a known title and size, for live tests

use std::time::Duration;

use x11rb::{
    connection::Connection as _,
    protocol::xproto::{
        AtomEnum, ConnectionExt as _, CreateWindowAux, EventMask, PropMode, WindowClass,
    },
    rust_connection::RustConnection,
    wrapper::ConnectionExt as _,
};

pub const TEST_WINDOW_TITLE: &str = "windowcap-live-test-window";

/// Keeps the connection (and therefore the window) alive.
pub struct TestWindow {
    pub conn: RustConnection,
    pub id:   u32,
}

impl TestWindow {
    /// Creates and maps a 320x240 window.
    ///
    /// It also opts into `WM_DELETE_WINDOW` so close requests are delivered
    /// as client messages instead of being ignored.
    pub fn create() -> Result<Self, Box<dyn std::error::Error>> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let screen = &conn.setup().roots[screen_num];
        let id = conn.generate_id()?;

        let aux = CreateWindowAux::new()
            .background_pixel(screen.white_pixel)
            .event_mask(EventMask::EXPOSURE | EventMask::STRUCTURE_NOTIFY);
        conn.create_window(
            screen.root_depth,
            id,
            screen.root,
            50,
            50,
            320,
            240,
            0,
            WindowClass::INPUT_OUTPUT,
            screen.root_visual,
            &aux,
        )?;

        let net_wm_name = conn.intern_atom(false, b"_NET_WM_NAME")?.reply()?.atom;
        let utf8_string = conn.intern_atom(false, b"UTF8_STRING")?.reply()?.atom;
        conn.change_property8(
            PropMode::REPLACE,
            id,
            net_wm_name,
            utf8_string,
            TEST_WINDOW_TITLE.as_bytes(),
        )?;
        conn.change_property8(
            PropMode::REPLACE,
            id,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            TEST_WINDOW_TITLE.as_bytes(),
        )?;

        let wm_protocols = conn.intern_atom(false, b"WM_PROTOCOLS")?.reply()?.atom;
        let wm_delete = conn.intern_atom(false, b"WM_DELETE_WINDOW")?.reply()?.atom;
        conn.change_property32(PropMode::REPLACE, id, wm_protocols, AtomEnum::ATOM, &[
            wm_delete,
        ])?;

        conn.map_window(id)?;
        conn.flush()?;
        std::thread::sleep(Duration::from_millis(150));

        Ok(Self { conn, id })
    }
}
