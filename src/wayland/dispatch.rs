//! Protocol event handlers
//!
//! Each handler either deals with the event on the spot (registry, buffer
//! release) or turns it into a [`ClientEvent`] for the session.

use log::{debug, trace};
use wayland_client::protocol::{
    wl_buffer::{self, WlBuffer},
    wl_callback::{self, WlCallback},
    wl_compositor::WlCompositor,
    wl_registry::{self, WlRegistry},
    wl_shm::{self, WlShm},
    wl_shm_pool::WlShmPool,
    wl_surface::WlSurface,
};
use wayland_client::{delegate_noop, Connection, Dispatch, Proxy, QueueHandle};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};

use super::AppState;
use crate::session::ClientEvent;

impl Dispatch<WlRegistry, ()> for AppState {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => {
                state
                    .handles
                    .globals
                    .bind(registry, name, &interface, version, qh);
            }
            wl_registry::Event::GlobalRemove { name } => {
                // No hot-plug handling; bindings stay as they are.
                debug!("global {} removed", name);
            }
            _ => {}
        }
    }
}

impl Dispatch<WlShm, ()> for AppState {
    fn event(
        _state: &mut Self,
        _shm: &WlShm,
        event: wl_shm::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_shm::Event::Format { format } = event {
            debug!("wl_shm supports {:?}", format);
        }
    }
}

impl Dispatch<XdgWmBase, ()> for AppState {
    fn event(
        state: &mut Self,
        _wm_base: &XdgWmBase,
        event: xdg_wm_base::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            state.handle_event(ClientEvent::Ping { serial });
        }
    }
}

impl Dispatch<XdgSurface, ()> for AppState {
    fn event(
        state: &mut Self,
        _xdg_surface: &XdgSurface,
        event: xdg_surface::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            state.handle_event(ClientEvent::Configure { serial });
        }
    }
}

impl Dispatch<XdgToplevel, ()> for AppState {
    fn event(
        state: &mut Self,
        _toplevel: &XdgToplevel,
        event: xdg_toplevel::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, .. } => {
                // Size hints are ignored; the buffer size is fixed.
                trace!("toplevel configure hint {}x{}", width, height);
            }
            xdg_toplevel::Event::Close => state.handle_event(ClientEvent::Close),
            _ => {}
        }
    }
}

impl Dispatch<WlCallback, ()> for AppState {
    fn event(
        state: &mut Self,
        _callback: &WlCallback,
        event: wl_callback::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { callback_data } = event {
            state.handle_event(ClientEvent::FrameDone {
                time: callback_data,
            });
        }
    }
}

impl Dispatch<WlBuffer, ()> for AppState {
    fn event(
        _state: &mut Self,
        buffer: &WlBuffer,
        event: wl_buffer::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            trace!("{} released", buffer.id());
            buffer.destroy();
        }
    }
}

delegate_noop!(AppState: WlCompositor);
delegate_noop!(AppState: WlShmPool);
delegate_noop!(AppState: ignore WlSurface);
