// Integration test: without a compositor, connecting fails with a readable
// error instead of panicking.
//
// The environment is process-wide, so this binary holds a single test.

use anyhow::Result;
use std::env;

use wlcheck::{ClientConfig, WaylandClient};

#[test]
fn test_connect_without_compositor_fails() -> Result<()> {
    let _ = env_logger::try_init();

    let runtime = tempfile::tempdir()?;
    env::remove_var("WAYLAND_SOCKET");
    env::set_var("XDG_RUNTIME_DIR", runtime.path());
    env::set_var("WAYLAND_DISPLAY", "wlcheck-missing-display");

    let err = match WaylandClient::connect(&ClientConfig::default()) {
        Ok(_) => panic!("connected to a display that does not exist"),
        Err(e) => e,
    };
    assert!(
        format!("{:#}", err).contains("Failed to connect to Wayland display"),
        "unexpected error: {:#}",
        err
    );

    Ok(())
}
