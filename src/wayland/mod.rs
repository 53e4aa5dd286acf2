//! Wayland connection and event loop
//!
//! [`WaylandClient::connect`] walks the handshake up to the point where the
//! toplevel has been committed without a buffer; [`WaylandClient::run`] then
//! blocks on the event queue until the connection drops or the window is
//! closed. All protocol events land in [`AppState`], which forwards the ones
//! the session cares about as [`ClientEvent`]s.

pub mod handles;
pub mod registry;

mod dispatch;

use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use wayland_client::{Connection, EventQueue};

use crate::config::ClientConfig;
use crate::session::{ClientEvent, Flow, Phase, Session, WindowBackend};

pub use handles::ClientHandles;
pub use registry::{GlobalKind, Globals, RegistryBinding};

/// Context passed to every event handler
#[derive(Debug)]
pub struct AppState {
    pub session: Session,
    pub handles: ClientHandles,
    running: bool,
}

impl AppState {
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Route one event through the session
    pub(crate) fn handle_event(&mut self, event: ClientEvent) {
        trace!("event: {:?}", event);
        if self.session.handle(event, &mut self.handles) == Flow::Exit {
            self.running = false;
        }
    }
}

/// A connected client with its window set up
pub struct WaylandClient {
    conn: Connection,
    queue: EventQueue<AppState>,
    state: AppState,
}

impl WaylandClient {
    /// Connect to the compositor named by the environment and map a window.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let conn = Connection::connect_to_env().context("Failed to connect to Wayland display")?;
        info!("🔗 Connection established!");
        Self::from_connection(conn, config)
    }

    /// Run the handshake on an already open connection
    pub fn from_connection(conn: Connection, config: &ClientConfig) -> Result<Self> {
        let mut queue = conn.new_event_queue::<AppState>();
        let qh = queue.handle();

        let mut state = AppState {
            session: Session::new(&config.animation, config.general.frame_log_interval),
            handles: ClientHandles::new(qh.clone(), config.window.canvas()),
            running: true,
        };
        state.session.advance(Phase::Connected)?;

        state.handles.registry = Some(conn.display().get_registry(&qh, ()));
        queue
            .roundtrip(&mut state)
            .context("Initial registry roundtrip failed")?;
        state.handles.globals().ensure_complete()?;
        state.session.advance(Phase::RegistryBound)?;

        state.handles.create_window(&config.window.title)?;
        state.session.advance(Phase::SurfaceCreated)?;

        // First commit carries no buffer; the compositor answers with configure.
        state.handles.commit();
        state.session.advance(Phase::WindowMapped)?;
        conn.flush().context("Failed to flush initial requests")?;

        info!("🪟 Window \"{}\" created, waiting for configure", config.window.title);
        Ok(Self { conn, queue, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Block until at least one batch of events has been dispatched
    pub fn dispatch_once(&mut self) -> Result<usize> {
        let n = self
            .queue
            .blocking_dispatch(&mut self.state)
            .context("Event dispatch failed")?;
        trace!("dispatched {} events", n);
        Ok(n)
    }

    /// Dispatch events until the connection ends or the window is closed.
    ///
    /// A dropped connection or protocol error ends the loop; it is not
    /// reported as a failure.
    pub fn run(mut self) -> Result<()> {
        info!("🎬 Entering event loop");

        while self.state.running {
            if let Err(e) = self.dispatch_once() {
                warn!("🔌 Connection ended: {:#}", e);
                break;
            }
        }

        self.disconnect();
        Ok(())
    }

    fn disconnect(self) {
        let WaylandClient { conn, queue, state } = self;
        info!(
            "🛑 Disconnecting after {} frames",
            state.session.frames_presented()
        );
        drop(state);
        drop(queue);
        if let Err(e) = conn.flush() {
            debug!("flush on disconnect failed: {}", e);
        }
    }
}
