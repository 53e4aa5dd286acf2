//! # wlcheck
//!
//! A minimal Wayland client: it binds `wl_shm`, `wl_compositor` and
//! `xdg_wm_base`, maps an `xdg_toplevel`, and paints a checkerboard into a
//! shared-memory buffer every time the compositor configures the window.
//!
//! ## Architecture
//!
//! - `shm`: anonymous shared-memory files for `wl_shm` pools
//! - `renderer`: per-frame shm allocation and the checkerboard fill
//! - `session`: handshake phases, event dispatch and frame scheduling
//! - `wayland`: connection, registry bindings and protocol handlers
//! - `config`: configuration parsing and validation
//! - `logging`: logger setup and periodic frame notices
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wlcheck::{ClientConfig, WaylandClient};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::default();
//!     let client = WaylandClient::connect(&config)?;
//!     client.run()
//! }
//! ```

pub mod config;
pub mod logging;
pub mod renderer;
pub mod session;
pub mod shm;
pub mod wayland;

// Re-export main types for easy access
pub use config::ClientConfig;
pub use renderer::{Canvas, ShmFrame};
pub use session::{ClientEvent, Phase, Session, WindowBackend};
pub use wayland::WaylandClient;

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for wlcheck
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
