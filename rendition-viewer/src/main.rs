//! # Rendition Viewer
//!
//! Desktop model and text viewer.

use clap::Parser;
use rendition_viewer::{CliArgs, ViewerApp, ViewerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use winit::event_loop::EventLoop;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rendition_viewer=debug,rendition_core=info,rendition_opengl=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Rendition Viewer");

    let args = CliArgs::parse();
    let config = ViewerConfig::from(args);

    tracing::info!(
        "Window config: {}x{} \"{}\"",
        config.width,
        config.height,
        config.title
    );

    let mut app = ViewerApp::new(config)?;

    let event_loop = EventLoop::new()?;
    tracing::debug!("Event loop created, starting run_app");
    event_loop.run_app(&mut app)?;

    tracing::info!("Rendition Viewer exited");
    Ok(())
}
