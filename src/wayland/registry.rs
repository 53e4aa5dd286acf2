//! Global registry bindings
//!
//! Only three globals matter to this client. Everything else the compositor
//! advertises is ignored.

use anyhow::{bail, Result};
use log::{debug, info};
use wayland_client::protocol::{wl_compositor::WlCompositor, wl_registry::WlRegistry, wl_shm::WlShm};
use wayland_client::QueueHandle;
use wayland_protocols::xdg::shell::client::xdg_wm_base::XdgWmBase;

use super::AppState;

/// The globals this client binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKind {
    Shm,
    Compositor,
    WmBase,
}

impl GlobalKind {
    pub const ALL: [GlobalKind; 3] = [GlobalKind::Shm, GlobalKind::Compositor, GlobalKind::WmBase];

    /// Recognise an advertised interface name
    pub fn from_interface(interface: &str) -> Option<Self> {
        match interface {
            "wl_shm" => Some(GlobalKind::Shm),
            "wl_compositor" => Some(GlobalKind::Compositor),
            "xdg_wm_base" => Some(GlobalKind::WmBase),
            _ => None,
        }
    }

    pub fn interface(self) -> &'static str {
        match self {
            GlobalKind::Shm => "wl_shm",
            GlobalKind::Compositor => "wl_compositor",
            GlobalKind::WmBase => "xdg_wm_base",
        }
    }

    /// Highest version we speak; `damage_buffer` needs wl_compositor 4
    pub fn max_version(self) -> u32 {
        match self {
            GlobalKind::Shm => 1,
            GlobalKind::Compositor => 4,
            GlobalKind::WmBase => 1,
        }
    }

    /// Version to bind given what the compositor advertises
    pub fn bind_version(self, advertised: u32) -> u32 {
        advertised.min(self.max_version())
    }
}

/// One bound global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryBinding {
    pub name: u32,
    pub interface: &'static str,
    pub version: u32,
}

/// Handles to the bound globals
#[derive(Debug, Default)]
pub struct Globals {
    pub shm: Option<WlShm>,
    pub compositor: Option<WlCompositor>,
    pub wm_base: Option<XdgWmBase>,
    bindings: Vec<RegistryBinding>,
}

impl Globals {
    /// Bind `name` if it is one of ours. Returns whether anything was bound.
    pub fn bind(
        &mut self,
        registry: &WlRegistry,
        name: u32,
        interface: &str,
        version: u32,
        qh: &QueueHandle<AppState>,
    ) -> bool {
        let Some(kind) = GlobalKind::from_interface(interface) else {
            debug!("ignoring global {} ({} v{})", name, interface, version);
            return false;
        };

        let version = kind.bind_version(version);
        match kind {
            GlobalKind::Shm => {
                self.shm = Some(registry.bind::<WlShm, _, _>(name, version, qh, ()));
            }
            GlobalKind::Compositor => {
                self.compositor = Some(registry.bind::<WlCompositor, _, _>(name, version, qh, ()));
            }
            GlobalKind::WmBase => {
                self.wm_base = Some(registry.bind::<XdgWmBase, _, _>(name, version, qh, ()));
            }
        }

        info!("📎 Bound {} v{} (name {})", kind.interface(), version, name);
        self.record(name, kind, version);
        true
    }

    fn record(&mut self, name: u32, kind: GlobalKind, version: u32) {
        self.bindings.push(RegistryBinding {
            name,
            interface: kind.interface(),
            version,
        });
    }

    /// Every binding made so far, in registry order
    pub fn bindings(&self) -> &[RegistryBinding] {
        &self.bindings
    }

    pub fn is_bound(&self, kind: GlobalKind) -> bool {
        match kind {
            GlobalKind::Shm => self.shm.is_some(),
            GlobalKind::Compositor => self.compositor.is_some(),
            GlobalKind::WmBase => self.wm_base.is_some(),
        }
    }

    /// Interfaces still missing after the initial roundtrip
    pub fn missing(&self) -> Vec<&'static str> {
        GlobalKind::ALL
            .into_iter()
            .filter(|kind| !self.is_bound(*kind))
            .map(GlobalKind::interface)
            .collect()
    }

    /// Fail unless all three globals are bound
    pub fn ensure_complete(&self) -> Result<()> {
        let missing = self.missing();
        if !missing.is_empty() {
            bail!(
                "Compositor does not advertise required globals: {}",
                missing.join(", ")
            );
        }
        Ok(())
    }
}
