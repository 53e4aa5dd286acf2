//! End-to-end handshake scenarios without a compositor
//!
//! A recording backend stands in for the protocol objects. It renders into
//! real shm files and keeps a duplicate descriptor of each, the way the
//! compositor would, so the tests can check what actually landed in memory.

use anyhow::Result;
use memmap2::Mmap;
use std::fs::File;

use wlcheck::config::AnimationConfig;
use wlcheck::renderer::{pattern, FrameError};
use wlcheck::shm::ShmError;
use wlcheck::{Canvas, ClientEvent, Phase, Session, ShmFrame, WindowBackend};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Pong(u32),
    Ack(u32),
    Prepare(f64),
    RequestFrame,
    Attach,
    Commit,
}

/// Backend that records every request and keeps the "server side" of each buffer
struct RecordingBackend {
    canvas: Canvas,
    calls: Vec<Call>,
    fail_allocation: bool,
    pending: Option<File>,
    attached: Vec<File>,
}

impl RecordingBackend {
    fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            calls: Vec::new(),
            fail_allocation: false,
            pending: None,
            attached: Vec::new(),
        }
    }

    fn attached_pixels(&self, index: usize) -> Result<Vec<u32>> {
        let map = unsafe { Mmap::map(&self.attached[index])? };
        Ok(bytemuck::cast_slice::<u8, u32>(&map[..]).to_vec())
    }
}

impl WindowBackend for RecordingBackend {
    fn pong(&mut self, serial: u32) {
        self.calls.push(Call::Pong(serial));
    }

    fn ack_configure(&mut self, serial: u32) {
        self.calls.push(Call::Ack(serial));
    }

    fn prepare_frame(&mut self, offset: f64) -> Result<(), FrameError> {
        self.calls.push(Call::Prepare(offset));
        if self.fail_allocation {
            return Err(ShmError::NamesExhausted { attempts: 100 }.into());
        }
        let frame = ShmFrame::allocate(self.canvas)?;
        let server_side = File::from(
            frame
                .fd()
                .try_clone_to_owned()
                .map_err(|e| FrameError::Shm(ShmError::Map(e)))?,
        );
        frame.paint(offset)?;
        self.pending = Some(server_side);
        Ok(())
    }

    fn request_frame(&mut self) {
        self.calls.push(Call::RequestFrame);
    }

    fn attach_pending(&mut self) {
        self.calls.push(Call::Attach);
        if let Some(buffer) = self.pending.take() {
            self.attached.push(buffer);
        }
    }

    fn commit(&mut self) {
        self.calls.push(Call::Commit);
    }
}

fn mapped_session(animate: bool) -> Session {
    let animation = AnimationConfig {
        enabled: animate,
        speed: 24.0,
    };
    let mut session = Session::new(&animation, 0);
    for phase in [
        Phase::Connected,
        Phase::RegistryBound,
        Phase::SurfaceCreated,
        Phase::WindowMapped,
    ] {
        session.advance(phase).unwrap();
    }
    session
}

/// First configure: ack, then a 640x480 checkerboard at offset 0, attach, commit
#[test]
fn test_first_configure_presents_checkerboard() -> Result<()> {
    let mut session = mapped_session(false);
    let mut backend = RecordingBackend::new(Canvas::default());

    session.handle(ClientEvent::Configure { serial: 1234 }, &mut backend);

    assert_eq!(
        backend.calls,
        vec![Call::Ack(1234), Call::Prepare(0.0), Call::Attach, Call::Commit]
    );
    assert_eq!(session.phase(), Phase::Configured);
    assert_eq!(backend.attached.len(), 1);

    let pixels = backend.attached_pixels(0)?;
    assert_eq!(pixels.len(), 640 * 480);
    assert_eq!(pixels[0], pattern::DARK);
    assert_eq!(pixels[8], pattern::LIGHT);
    assert_eq!(pixels[8 * 640], pattern::LIGHT);
    assert_eq!(pixels[8 * 640 + 8], pattern::DARK);
    // (639, 479): (639 + 59 * 8) % 16 = 7
    assert_eq!(pixels[640 * 480 - 1], pattern::DARK);

    Ok(())
}

#[test]
fn test_ack_always_precedes_attach() {
    let mut session = mapped_session(false);
    let mut backend = RecordingBackend::new(Canvas::new(16, 16));

    for serial in 1..=5 {
        session.handle(ClientEvent::Configure { serial }, &mut backend);
    }

    let mut acked = None;
    for call in &backend.calls {
        match call {
            Call::Ack(serial) => acked = Some(*serial),
            Call::Attach | Call::Commit => assert!(acked.is_some()),
            _ => {}
        }
    }
    assert_eq!(acked, Some(5));
    assert_eq!(backend.attached.len(), 5);
    assert_eq!(session.frames_presented(), 5);
}

#[test]
fn test_exhausted_allocation_never_attaches() {
    let mut session = mapped_session(false);
    let mut backend = RecordingBackend::new(Canvas::default());
    backend.fail_allocation = true;

    session.handle(ClientEvent::Configure { serial: 8 }, &mut backend);

    assert_eq!(backend.calls, vec![Call::Ack(8), Call::Prepare(0.0)]);
    assert!(backend.attached.is_empty());

    // The next configure recovers once memory is available again.
    backend.fail_allocation = false;
    session.handle(ClientEvent::Configure { serial: 9 }, &mut backend);
    assert_eq!(backend.attached.len(), 1);
}

#[test]
fn test_ping_interleaved_with_configure() {
    let mut session = mapped_session(false);
    let mut backend = RecordingBackend::new(Canvas::new(8, 8));

    session.handle(ClientEvent::Ping { serial: 1 }, &mut backend);
    session.handle(ClientEvent::Configure { serial: 2 }, &mut backend);
    session.handle(ClientEvent::Ping { serial: 3 }, &mut backend);

    assert_eq!(
        backend.calls,
        vec![
            Call::Pong(1),
            Call::Ack(2),
            Call::Prepare(0.0),
            Call::Attach,
            Call::Commit,
            Call::Pong(3),
        ]
    );
}

#[test]
fn test_animation_scrolls_the_pattern() -> Result<()> {
    let mut session = mapped_session(true);
    let mut backend = RecordingBackend::new(Canvas::new(16, 1));

    session.handle(ClientEvent::Configure { serial: 1 }, &mut backend);
    session.handle(ClientEvent::FrameDone { time: 100 }, &mut backend);
    // 125 ms at 24 px/s is 3 px.
    session.handle(ClientEvent::FrameDone { time: 225 }, &mut backend);

    assert_eq!(backend.attached.len(), 3);
    assert_eq!(session.offset(), 3.0);

    let first = backend.attached_pixels(0)?;
    let last = backend.attached_pixels(2)?;
    assert_eq!(first[5], pattern::DARK);
    assert_eq!(last[5], pattern::LIGHT);

    let frame_requests = backend
        .calls
        .iter()
        .filter(|c| **c == Call::RequestFrame)
        .count();
    assert_eq!(frame_requests, 3);
    Ok(())
}
