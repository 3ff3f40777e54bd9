// Command line configuration for Wirescape

use clap::{Parser, ValueEnum};

use crate::viewport::Viewport;

/// How the camera aspect ratio is chosen at startup. Resizes always use the
/// live window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AspectMode {
    /// Width over height of the window.
    Viewport,
    /// A fixed 1920x1080 ratio.
    Fixed,
}

impl AspectMode {
    pub fn initial_aspect(self, viewport: &Viewport) -> f32 {
        match self {
            AspectMode::Viewport => viewport.aspect(),
            AspectMode::Fixed => 1920.0 / 1080.0,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "wirescape", about = "Wireframe arc of cubes under a wireframe sun")]
pub struct Cli {
    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1280, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 720, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,

    /// Startup camera aspect ratio
    #[arg(long, value_enum, default_value_t = AspectMode::Viewport)]
    pub aspect: AspectMode,

    /// Start without the debug panel
    #[arg(long)]
    pub no_debug_panel: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn debug_panel(&self) -> bool {
        !self.no_debug_panel
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "wirescape=debug,info"
        } else {
            "info"
        }
    }
}
