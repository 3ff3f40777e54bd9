// Wirescape: a wireframe arc of cubes under a wireframe sun

// Module declarations
mod app;
mod camera;
mod clock;
mod config;
mod controls;
mod debug;
mod geometry;
mod material;
mod math;
mod panel;
mod renderer;
mod scene;
mod tween;
mod viewport;

use clap::Parser;
use winit::event_loop::EventLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = config::Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.default_log_filter()),
    )
    .init();

    // Create event loop
    let event_loop = EventLoop::new()?;

    // Build the scene, camera and renderer
    let app = app::App::new(&event_loop, &cli).await?;

    // Render until the window closes
    app.run(event_loop)
}
