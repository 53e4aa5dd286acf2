//! Protocol objects owned by the client and the requests sent through them

use anyhow::{Context, Result};
use log::{debug, warn};
use wayland_client::protocol::{
    wl_buffer::WlBuffer, wl_registry::WlRegistry, wl_shm, wl_surface::WlSurface,
};
use wayland_client::{Proxy, QueueHandle};
use wayland_protocols::xdg::shell::client::{xdg_surface::XdgSurface, xdg_toplevel::XdgToplevel};

use super::registry::Globals;
use super::AppState;
use crate::renderer::{Canvas, FrameError, ShmFrame};
use crate::session::WindowBackend;

/// The surface stack making up the toplevel window
#[derive(Debug)]
struct Window {
    surface: WlSurface,
    xdg_surface: XdgSurface,
    toplevel: XdgToplevel,
}

/// Every protocol object the client holds
#[derive(Debug)]
pub struct ClientHandles {
    qh: QueueHandle<AppState>,
    canvas: Canvas,
    pub(crate) registry: Option<WlRegistry>,
    pub(crate) globals: Globals,
    window: Option<Window>,
    /// Rendered but not yet attached
    pending: Option<WlBuffer>,
}

impl ClientHandles {
    pub fn new(qh: QueueHandle<AppState>, canvas: Canvas) -> Self {
        Self {
            qh,
            canvas,
            registry: None,
            globals: Globals::default(),
            window: None,
            pending: None,
        }
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn has_window(&self) -> bool {
        self.window.is_some()
    }

    /// Create the surface, wrap it as an xdg toplevel and set its title.
    ///
    /// Nothing is committed here.
    pub fn create_window(&mut self, title: &str) -> Result<()> {
        let compositor = self
            .globals
            .compositor
            .as_ref()
            .context("wl_compositor is not bound")?;
        let wm_base = self
            .globals
            .wm_base
            .as_ref()
            .context("xdg_wm_base is not bound")?;

        let surface = compositor.create_surface(&self.qh, ());
        let xdg_surface = wm_base.get_xdg_surface(&surface, &self.qh, ());
        let toplevel = xdg_surface.get_toplevel(&self.qh, ());
        toplevel.set_title(title.to_string());

        debug!("created toplevel {:?} titled {:?}", toplevel.id(), title);
        self.window = Some(Window {
            surface,
            xdg_surface,
            toplevel,
        });
        Ok(())
    }

    fn surface(&self) -> Option<&WlSurface> {
        self.window.as_ref().map(|w| &w.surface)
    }
}

impl WindowBackend for ClientHandles {
    fn pong(&mut self, serial: u32) {
        match &self.globals.wm_base {
            Some(wm_base) => wm_base.pong(serial),
            None => warn!("⚠️ ping {} without xdg_wm_base", serial),
        }
    }

    fn ack_configure(&mut self, serial: u32) {
        match &self.window {
            Some(window) => window.xdg_surface.ack_configure(serial),
            None => warn!("⚠️ configure {} without an xdg_surface", serial),
        }
    }

    fn prepare_frame(&mut self, offset: f64) -> Result<(), FrameError> {
        if self.window.is_none() {
            return Err(FrameError::NoSurface);
        }
        let shm = self
            .globals
            .shm
            .as_ref()
            .ok_or(FrameError::MissingGlobal("wl_shm"))?;

        let canvas = self.canvas;
        let layout = canvas.shm_layout()?;

        let frame = ShmFrame::allocate(canvas)?;

        // The pool holds its own reference to the memory, so both the pool
        // and our descriptor can go as soon as the buffer exists.
        let pool = shm.create_pool(frame.fd(), layout.size, &self.qh, ());
        let buffer = pool.create_buffer(
            0,
            layout.width,
            layout.height,
            layout.stride,
            wl_shm::Format::Xrgb8888,
            &self.qh,
            (),
        );
        pool.destroy();

        if let Err(e) = frame.paint(offset) {
            buffer.destroy();
            return Err(e.into());
        }

        if let Some(stale) = self.pending.replace(buffer) {
            stale.destroy();
        }
        Ok(())
    }

    fn request_frame(&mut self) {
        if let Some(surface) = self.surface() {
            let _callback = surface.frame(&self.qh, ());
        }
    }

    fn attach_pending(&mut self) {
        let Some(buffer) = self.pending.take() else {
            return;
        };
        let Some(surface) = self.surface() else {
            buffer.destroy();
            return;
        };

        surface.attach(Some(&buffer), 0, 0);
        if surface.version() >= 4 {
            surface.damage_buffer(0, 0, i32::MAX, i32::MAX);
        } else {
            surface.damage(0, 0, i32::MAX, i32::MAX);
        }
    }

    fn commit(&mut self) {
        if let Some(surface) = self.surface() {
            surface.commit();
        }
    }
}

impl Drop for ClientHandles {
    fn drop(&mut self) {
        if let Some(buffer) = self.pending.take() {
            buffer.destroy();
        }
        if let Some(window) = self.window.take() {
            window.toplevel.destroy();
            window.xdg_surface.destroy();
            window.surface.destroy();
        }
    }
}
