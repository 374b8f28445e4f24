use std::fs;

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

use crate::error::{Result, TrackerError};
use crate::identity::{AppIdentity, IdentityResolver};

/// Reads the EWMH active window and maps it to `/proc/<pid>/exe`.
pub struct X11Resolver {
    conn: RustConnection,
    root: Window,
    net_active_window: Atom,
    net_wm_pid: Atom,
}

impl X11Resolver {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| resolver_error("failed to connect to X server", e))?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| TrackerError::Resolver(format!("X screen {screen_num} missing")))?;

        let net_active_window = intern_atom(&conn, "_NET_ACTIVE_WINDOW")?;
        let net_wm_pid = intern_atom(&conn, "_NET_WM_PID")?;

        Ok(Self {
            conn,
            root,
            net_active_window,
            net_wm_pid,
        })
    }

    fn property_u32(&self, window: Window, property: Atom, kind: AtomEnum) -> Result<Option<u32>> {
        let reply = self
            .conn
            .get_property(false, window, property, kind, 0, 1)
            .map_err(|e| resolver_error("get_property request failed", e))?
            .reply()
            .map_err(|e| resolver_error("get_property reply failed", e))?;

        Ok(reply.value32().and_then(|mut values| values.next()))
    }
}

impl IdentityResolver for X11Resolver {
    fn resolve(&mut self) -> Result<Option<AppIdentity>> {
        let window = self.property_u32(self.root, self.net_active_window, AtomEnum::WINDOW)?;
        let Some(window) = window.filter(|&w| w != x11rb::NONE) else {
            return Ok(None);
        };

        let identity = match self.property_u32(window, self.net_wm_pid, AtomEnum::CARDINAL)? {
            Some(pid) if pid != 0 => identity_for_pid(pid),
            _ => AppIdentity::unknown(),
        };
        Ok(Some(identity))
    }
}

fn identity_for_pid(pid: u32) -> AppIdentity {
    match fs::read_link(format!("/proc/{pid}/exe")) {
        Ok(path) => AppIdentity::from_path(path.to_string_lossy().into_owned()),
        Err(_) => AppIdentity::unknown(),
    }
}

fn intern_atom(conn: &RustConnection, name: &str) -> Result<Atom> {
    let atom = conn
        .intern_atom(false, name.as_bytes())
        .map_err(|e| resolver_error("intern_atom request failed", e))?
        .reply()
        .map_err(|e| resolver_error("intern_atom reply failed", e))?
        .atom;
    Ok(atom)
}

fn resolver_error(context: &str, err: impl std::fmt::Display) -> TrackerError {
    TrackerError::Resolver(format!("{context}: {err}"))
}
