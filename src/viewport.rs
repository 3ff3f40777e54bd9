// Viewport, fullscreen and double-click handling for Wirescape

use glam::Vec2;
use std::time::{Duration, Instant};
use winit::window::{Fullscreen, Window};

/// Upper bound on the renderer pixel ratio; denser displays are rendered at 2x.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

pub fn clamp_pixel_ratio(device_ratio: f32) -> f32 {
    device_ratio.min(MAX_PIXEL_RATIO)
}

/// Logical size of the drawable surface plus the pixel ratio it is rendered at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: clamp_pixel_ratio(device_ratio),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Backing buffer size in physical pixels.
    pub fn buffer_size(&self) -> (u32, u32) {
        buffer_size(self.width, self.height, self.pixel_ratio)
    }
}

pub fn buffer_size(width: f32, height: f32, pixel_ratio: f32) -> (u32, u32) {
    (
        ((width * pixel_ratio).round() as u32).max(1),
        ((height * pixel_ratio).round() as u32).max(1),
    )
}

/// One way of putting the window into fullscreen. `enter` and `exit` return
/// `false` when this API is not available on the host.
pub trait FullscreenApi {
    fn is_fullscreen(&self) -> bool;
    fn enter(&self) -> bool;
    fn exit(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenChange {
    Entered,
    Exited,
    Unsupported,
}

/// Leaves fullscreen if either API reports it, otherwise enters it. The
/// primary API is tried first and the fallback only when the primary one is
/// unavailable.
pub fn toggle_fullscreen(
    primary: &dyn FullscreenApi,
    fallback: &dyn FullscreenApi,
) -> FullscreenChange {
    if primary.is_fullscreen() || fallback.is_fullscreen() {
        if primary.exit() || fallback.exit() {
            FullscreenChange::Exited
        } else {
            FullscreenChange::Unsupported
        }
    } else if primary.enter() || fallback.enter() {
        FullscreenChange::Entered
    } else {
        FullscreenChange::Unsupported
    }
}

/// Borderless fullscreen on the monitor the window currently occupies.
/// Unavailable when the platform cannot tell which monitor that is.
pub struct MonitorFullscreen<'a>(pub &'a Window);

impl FullscreenApi for MonitorFullscreen<'_> {
    fn is_fullscreen(&self) -> bool {
        self.0.fullscreen().is_some()
    }

    fn enter(&self) -> bool {
        match self.0.current_monitor() {
            Some(monitor) => {
                self.0.set_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
                true
            }
            None => false,
        }
    }

    fn exit(&self) -> bool {
        self.0.set_fullscreen(None);
        true
    }
}

/// Borderless fullscreen on whatever monitor the platform picks.
pub struct PlatformFullscreen<'a>(pub &'a Window);

impl FullscreenApi for PlatformFullscreen<'_> {
    fn is_fullscreen(&self) -> bool {
        self.0.fullscreen().is_some()
    }

    fn enter(&self) -> bool {
        self.0.set_fullscreen(Some(Fullscreen::Borderless(None)));
        true
    }

    fn exit(&self) -> bool {
        self.0.set_fullscreen(None);
        true
    }
}

pub const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(500);
pub const DOUBLE_CLICK_DISTANCE: f32 = 4.0;

/// Turns a stream of button presses into double clicks.
#[derive(Debug, Default)]
pub struct ClickTracker {
    last: Option<(Instant, Vec2)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a press and reports whether it completes a double click.
    pub fn press(&mut self, at: Instant, position: Vec2) -> bool {
        let is_double = self.last.is_some_and(|(time, pos)| {
            at.saturating_duration_since(time) <= DOUBLE_CLICK_INTERVAL
                && pos.distance(position) <= DOUBLE_CLICK_DISTANCE
        });
        self.last = if is_double { None } else { Some((at, position)) };
        is_double
    }
}
