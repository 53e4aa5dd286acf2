//! Handshake and frame scheduling
//!
//! The session is the protocol-agnostic half of the client. It tracks how
//! far the window handshake has got, owns the animation clock, and turns
//! each [`ClientEvent`] into calls on a [`WindowBackend`] in the order the
//! xdg-shell protocol demands:
//!
//! ```text
//! configure(serial) -> ack_configure(serial) -> prepare_frame
//!                   -> [request_frame] -> attach_pending -> commit
//! ```
//!
//! A frame whose buffer could not be prepared is skipped: nothing is
//! attached. Without animation nothing is committed either; with animation
//! the surface is committed bare, carrying only the next frame callback.

use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::config::AnimationConfig;
use crate::logging::FrameLog;
use crate::renderer::FrameError;

/// Handshake progress, in the order the client walks through it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Disconnected,
    Connected,
    RegistryBound,
    SurfaceCreated,
    /// Toplevel committed without a buffer; waiting for the first configure
    WindowMapped,
    /// At least one configure acknowledged; frames are being presented
    Configured,
}

impl Phase {
    /// The phase that follows this one, if any
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Disconnected => Some(Phase::Connected),
            Phase::Connected => Some(Phase::RegistryBound),
            Phase::RegistryBound => Some(Phase::SurfaceCreated),
            Phase::SurfaceCreated => Some(Phase::WindowMapped),
            Phase::WindowMapped => Some(Phase::Configured),
            Phase::Configured => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid handshake transition {from:?} -> {to:?}")]
pub struct PhaseError {
    pub from: Phase,
    pub to: Phase,
}

/// Events the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// `xdg_wm_base.ping`
    Ping { serial: u32 },
    /// `xdg_surface.configure`
    Configure { serial: u32 },
    /// `wl_callback.done` for a frame callback; `time` in milliseconds
    FrameDone { time: u32 },
    /// `xdg_toplevel.close`
    Close,
}

/// Whether the event loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Protocol requests the session needs from the window it drives
#[cfg_attr(test, mockall::automock)]
pub trait WindowBackend {
    /// Answer a liveness ping
    fn pong(&mut self, serial: u32);

    /// Acknowledge the configure carrying `serial`
    fn ack_configure(&mut self, serial: u32);

    /// Render a frame at `offset` into a new buffer held until attached
    fn prepare_frame(&mut self, offset: f64) -> Result<(), FrameError>;

    /// Ask for a `wl_surface.frame` callback on the next commit
    fn request_frame(&mut self);

    /// Attach the prepared buffer to the surface
    fn attach_pending(&mut self);

    fn commit(&mut self);
}

/// Client-side state of one window
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    animate: bool,
    speed: f64,
    offset: f64,
    last_frame: Option<u32>,
    frame_pending: bool,
    last_serial: Option<u32>,
    frames: FrameLog,
}

impl Session {
    pub fn new(animation: &AnimationConfig, frame_log_interval: u32) -> Self {
        Self {
            phase: Phase::Disconnected,
            animate: animation.enabled,
            speed: f64::from(animation.speed),
            offset: 0.0,
            last_frame: None,
            frame_pending: false,
            last_serial: None,
            frames: FrameLog::new(frame_log_interval),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current animation offset in pixels
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Serial of the most recently acknowledged configure
    pub fn last_serial(&self) -> Option<u32> {
        self.last_serial
    }

    /// Frames attached and committed so far
    pub fn frames_presented(&self) -> u64 {
        self.frames.presented()
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Move the handshake forward by exactly one phase
    pub fn advance(&mut self, to: Phase) -> Result<(), PhaseError> {
        if self.phase.next() != Some(to) {
            return Err(PhaseError {
                from: self.phase,
                to,
            });
        }
        debug!("handshake: {:?} -> {:?}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Single entry point for every event the client cares about
    pub fn handle<B: WindowBackend>(&mut self, event: ClientEvent, backend: &mut B) -> Flow {
        match event {
            ClientEvent::Ping { serial } => {
                trace!("ping {} -> pong", serial);
                backend.pong(serial);
                Flow::Continue
            }
            ClientEvent::Configure { serial } => {
                self.on_configure(serial, backend);
                Flow::Continue
            }
            ClientEvent::FrameDone { time } => {
                self.on_frame_done(time, backend);
                Flow::Continue
            }
            ClientEvent::Close => {
                info!("🚪 Window close requested");
                Flow::Exit
            }
        }
    }

    /// Advance the animation clock to `time` (milliseconds).
    ///
    /// The first timestamp only starts the clock.
    pub fn advance_clock(&mut self, time: u32) {
        if let Some(last) = self.last_frame {
            let elapsed = time.wrapping_sub(last);
            self.offset += f64::from(elapsed) / 1000.0 * self.speed;
        }
        self.last_frame = Some(time);
    }

    fn on_configure<B: WindowBackend>(&mut self, serial: u32, backend: &mut B) {
        if self.phase < Phase::WindowMapped {
            warn!("⚠️ configure {} before the window was mapped, ignoring", serial);
            return;
        }

        backend.ack_configure(serial);
        self.last_serial = Some(serial);

        if self.phase == Phase::WindowMapped {
            self.phase = Phase::Configured;
            info!("✅ Window configured (serial {})", serial);
        } else {
            debug!("reconfigure (serial {})", serial);
        }

        self.present(backend);
    }

    fn on_frame_done<B: WindowBackend>(&mut self, time: u32, backend: &mut B) {
        self.frame_pending = false;
        if !self.animate || self.phase != Phase::Configured {
            return;
        }

        self.advance_clock(time);
        self.present(backend);
    }

    fn present<B: WindowBackend>(&mut self, backend: &mut B) {
        if let Err(e) = backend.prepare_frame(self.offset) {
            warn!("⚠️ Skipping frame: {}", e);
            // Commit without a buffer so the callback chain survives the
            // failure; the previous frame stays on screen.
            if self.schedule_frame(backend) {
                backend.commit();
            }
            return;
        }

        self.schedule_frame(backend);
        backend.attach_pending();
        backend.commit();

        if let Some(n) = self.frames.record() {
            info!("🖼️ Presented frame {} (offset {:.1})", n, self.offset);
        }
    }

    /// Request a frame callback when animating and none is outstanding.
    ///
    /// Returns whether a request was made.
    fn schedule_frame<B: WindowBackend>(&mut self, backend: &mut B) -> bool {
        if !self.animate || self.frame_pending {
            return false;
        }
        backend.request_frame();
        self.frame_pending = true;
        true
    }
}
