//! # wlcheck - checkerboard Wayland client
//!
//! Connects to the compositor named by `WAYLAND_DISPLAY`, opens a toplevel
//! window and paints a checkerboard into it on every configure.

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use wlcheck::{logging, ClientConfig, WaylandClient};

#[derive(Parser)]
#[command(name = "wlcheck")]
#[command(about = "A minimal Wayland client that paints a checkerboard")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/wlcheck/wlcheck.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Keep re-rendering on frame callbacks so the pattern scrolls
    #[arg(short, long)]
    animate: bool,

    /// Window title (overrides the configuration file)
    #[arg(short, long)]
    title: Option<String>,
}

impl Cli {
    /// Apply command line overrides on top of the loaded configuration
    fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if self.animate {
            config.animation.enabled = true;
        }
        if let Some(title) = &self.title {
            config.window.title = title.clone();
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.debug);

    info!("🚀 Starting wlcheck");
    info!(
        "📄 Version: {} (built {}, commit {})",
        wlcheck::VERSION,
        env!("BUILD_DATE"),
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    );

    let config = match ClientConfig::load(&cli.config) {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            ClientConfig::default()
        }
    };

    let config = cli.apply(config);
    config.validate()?;

    if config.animation.enabled {
        info!("🎞️ Animation enabled ({} px/s)", config.animation.speed);
    }

    let client = WaylandClient::connect(&config)?;
    client.run()?;

    info!("👋 wlcheck shutting down");
    Ok(())
}
