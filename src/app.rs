// Application context and event loop for Wirescape

use glam::{Vec2, Vec3};
use std::sync::Arc;
use std::time::Instant;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, MouseButton, Touch, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::camera::PerspectiveCamera;
use crate::clock::Clock;
use crate::config::{AspectMode, Cli};
use crate::controls::{OrbitControls, PointerState};
use crate::debug::{CommandError, DebugCommand, DebugParams, DebugTarget};
use crate::material::Color;
use crate::panel::DebugPanel;
use crate::renderer::{Renderer, RendererError, SceneRenderer};
use crate::scene::{build_scene, DemoScene};
use crate::tween::Tween;
use crate::viewport::{
    self, clamp_pixel_ratio, ClickTracker, FullscreenChange, MonitorFullscreen, PlatformFullscreen,
    Viewport,
};

pub const CAMERA_FOV: f32 = 40.0;
pub const CAMERA_NEAR: f32 = 1.0;
pub const CAMERA_FAR: f32 = 1000.0;
pub const CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.5, 25.0);
pub const CLEAR_COLOR: Color = Color::BLUE;

/// Everything the render loop mutates, independent of the window and GPU.
pub struct AppContext {
    pub demo: DemoScene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub pointer: PointerState,
    pub viewport: Viewport,
    pub clock: Clock,
    pub params: DebugParams,
    pub spin: Option<Tween>,
    frames_rendered: u64,
}

impl AppContext {
    /// Builds the scene first, then a camera aimed at the group's origin.
    pub fn new(viewport: Viewport, aspect_mode: AspectMode) -> Self {
        let params = DebugParams::default();
        let demo = build_scene(params.color, params.sun_color);

        let mut camera = PerspectiveCamera::new(
            CAMERA_FOV,
            aspect_mode.initial_aspect(&viewport),
            CAMERA_NEAR,
            CAMERA_FAR,
        );
        camera.position = CAMERA_POSITION;
        // Aimed once; later group transforms do not re-aim the camera
        camera.look_at(demo.scene.world_matrix(demo.group).transform_point3(Vec3::ZERO));
        let controls = OrbitControls::new(&camera).with_damping(true);

        let mut pointer = PointerState::new();
        pointer.handle_resize(viewport.width, viewport.height);

        Self {
            demo,
            camera,
            controls,
            pointer,
            viewport,
            clock: Clock::new(),
            params,
            spin: None,
            frames_rendered: 0,
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Sizes a freshly created renderer to the current viewport.
    pub fn attach<R: SceneRenderer>(&self, renderer: &mut R) {
        renderer.set_pixel_ratio(self.viewport.pixel_ratio);
        renderer.set_size(self.viewport.width, self.viewport.height);
    }

    /// Brings viewport, camera and renderer to the new logical size in one go.
    pub fn handle_resize<R: SceneRenderer>(
        &mut self,
        renderer: &mut R,
        width: f32,
        height: f32,
        device_ratio: f32,
    ) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.viewport.width = width;
        self.viewport.height = height;
        self.viewport.pixel_ratio = clamp_pixel_ratio(device_ratio);

        self.camera.aspect = width / height;
        self.camera.update_projection_matrix();

        renderer.set_size(width, height);
        renderer.set_pixel_ratio(self.viewport.pixel_ratio);

        self.pointer.handle_resize(width, height);
        log::debug!("resized to {width}x{height} @ {}", self.viewport.pixel_ratio);
    }

    pub fn debug_target(&mut self) -> DebugTarget<'_> {
        DebugTarget {
            scene: &mut self.demo,
            params: &mut self.params,
            spin: &mut self.spin,
        }
    }

    pub fn apply(&mut self, command: DebugCommand) -> Result<(), CommandError> {
        self.debug_target().apply(command)
    }

    pub fn tick<R: SceneRenderer>(&mut self, renderer: &mut R) -> Result<(), RendererError> {
        self.tick_at(renderer, Instant::now())
    }

    /// One frame: advance time, the spin tween and the controls, then render once.
    pub fn tick_at<R: SceneRenderer>(
        &mut self,
        renderer: &mut R,
        now: Instant,
    ) -> Result<(), RendererError> {
        self.clock.tick_at(now);
        log::trace!("frame {} at {:.3}s", self.clock.frame_count, self.clock.elapsed_seconds());

        if let Some(spin) = &mut self.spin {
            let y = spin.advance(self.clock.delta);
            self.demo.scene.node_mut(self.demo.group).transform.rotation.y = y;
        }
        if self.spin.as_ref().is_some_and(Tween::is_finished) {
            self.spin = None;
        }

        self.controls
            .update(&mut self.camera, &self.pointer, self.clock.dt_seconds());
        self.pointer.end_frame();

        renderer.render(&self.demo.scene, &self.camera)?;
        self.frames_rendered += 1;
        Ok(())
    }
}

/// Window, GPU renderer, optional panel and the context they drive.
pub struct App {
    renderer: Renderer,
    context: AppContext,
    panel: Option<DebugPanel>,
    clicks: ClickTracker,
}

impl App {
    pub async fn new(event_loop: &EventLoop<()>, cli: &Cli) -> anyhow::Result<Self> {
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("Wirescape")
                .with_inner_size(LogicalSize::new(cli.width, cli.height))
                .build(event_loop)?,
        );

        let scale = window.scale_factor();
        let size = window.inner_size().to_logical::<f32>(scale);
        let viewport = Viewport::new(size.width, size.height, scale as f32);
        let context = AppContext::new(viewport, cli.aspect);

        let mut renderer = Renderer::new(window.clone(), viewport, CLEAR_COLOR).await?;
        context.attach(&mut renderer);

        let panel = cli
            .debug_panel()
            .then(|| DebugPanel::new(&window, renderer.max_texture_side()));

        log::info!(
            "window {}x{} (pixel ratio {}), debug panel {}",
            viewport.width,
            viewport.height,
            viewport.pixel_ratio,
            if panel.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            renderer,
            context,
            panel,
            clicks: ClickTracker::new(),
        })
    }

    /// Runs until the window closes or the renderer hits a fatal error.
    pub fn run(mut self, event_loop: EventLoop<()>) -> anyhow::Result<()> {
        let mut fatal: Option<RendererError> = None;
        event_loop.set_control_flow(ControlFlow::Wait);
        self.renderer.window().request_redraw();

        event_loop.run(|event, target| {
            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != self.renderer.window().id() {
                return;
            }
            if let Err(err) = self.handle_window_event(event, target) {
                log::error!("render failed: {err}");
                fatal = Some(err);
                target.exit();
            }
        })?;

        log::info!("rendered {} frames", self.context.frames_rendered());
        match fatal {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn handle_window_event(
        &mut self,
        event: WindowEvent,
        target: &EventLoopWindowTarget<()>,
    ) -> Result<(), RendererError> {
        let window = self.renderer.window().clone();
        let consumed = match &mut self.panel {
            Some(panel) => panel.on_window_event(&window, &event),
            None => false,
        };

        match event {
            WindowEvent::CloseRequested => target.exit(),
            WindowEvent::Resized(size) => {
                let scale = window.scale_factor();
                let size = size.to_logical::<f32>(scale);
                self.context
                    .handle_resize(&mut self.renderer, size.width, size.height, scale as f32);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = window.inner_size().to_logical::<f32>(scale_factor);
                self.context.handle_resize(
                    &mut self.renderer,
                    size.width,
                    size.height,
                    scale_factor as f32,
                );
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = position.to_logical::<f64>(window.scale_factor());
                self.context.pointer.handle_cursor_move(position.x, position.y);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                // Releases always go through so no button stays stuck
                if consumed && state == ElementState::Pressed {
                    return Ok(());
                }
                self.context.pointer.handle_button(state, button);
                if button == MouseButton::Left
                    && state == ElementState::Pressed
                    && self.clicks.press(Instant::now(), self.context.pointer.position)
                {
                    toggle_fullscreen(&window);
                }
            }
            WindowEvent::Touch(Touch {
                phase, location, id, ..
            }) => {
                // Ends always go through so the finger never stays down
                if consumed && phase == TouchPhase::Started {
                    return Ok(());
                }
                let location = location.to_logical::<f64>(window.scale_factor());
                if self
                    .context
                    .pointer
                    .handle_touch(phase, id, location.x, location.y)
                    && self.clicks.press(Instant::now(), self.context.pointer.position)
                {
                    toggle_fullscreen(&window);
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                self.context.pointer.handle_wheel(delta);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(&window)?;
                // Schedule the next frame
                window.request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn redraw(&mut self, window: &Window) -> Result<(), RendererError> {
        if let Some(panel) = &mut self.panel {
            let (commands, overlay) = panel.run(window, &self.context.debug_target());
            for command in commands {
                if let Err(err) = self.context.apply(command) {
                    log::warn!("ignored debug command: {err}");
                }
            }
            self.renderer.set_overlay(overlay);

            // Keep a slider drag from also orbiting the camera
            if panel.wants_pointer() {
                self.context.pointer.delta = Vec2::ZERO;
            }
        }
        self.context.tick(&mut self.renderer)
    }
}

fn toggle_fullscreen(window: &Window) {
    match viewport::toggle_fullscreen(&MonitorFullscreen(window), &PlatformFullscreen(window)) {
        FullscreenChange::Unsupported => log::warn!("fullscreen is not available on this platform"),
        change => log::debug!("fullscreen toggled: {change:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::{ControlId, ControlValue, SPIN_ANGLE};
    use crate::scene::{NodeKind, Scene};
    use approx::assert_relative_eq;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeRenderer {
        size: (f32, f32),
        pixel_ratio: f32,
        /// Camera aspect seen by each render call
        renders: Vec<f32>,
    }

    impl SceneRenderer for FakeRenderer {
        fn set_size(&mut self, width: f32, height: f32) {
            self.size = (width, height);
        }

        fn set_pixel_ratio(&mut self, ratio: f32) {
            self.pixel_ratio = ratio;
        }

        fn render(
            &mut self,
            _scene: &Scene,
            camera: &PerspectiveCamera,
        ) -> Result<(), RendererError> {
            self.renders.push(camera.aspect);
            Ok(())
        }
    }

    fn context() -> AppContext {
        AppContext::new(Viewport::new(1280.0, 720.0, 1.0), AspectMode::Viewport)
    }

    #[test]
    fn camera_starts_behind_the_arc() {
        let ctx = context();
        assert_eq!(ctx.camera.position, Vec3::new(0.0, 0.5, 25.0));
        assert_eq!(ctx.camera.target, Vec3::ZERO);
        assert_eq!(ctx.camera.fov, 40.0);
        assert_eq!((ctx.camera.near, ctx.camera.far), (1.0, 1000.0));
        assert_relative_eq!(ctx.camera.aspect, 1280.0 / 720.0);
        assert!(ctx.controls.enable_damping);
    }

    #[test]
    fn attach_sizes_renderer() {
        let ctx = AppContext::new(Viewport::new(1280.0, 720.0, 3.0), AspectMode::Viewport);
        let mut renderer = FakeRenderer::default();
        ctx.attach(&mut renderer);
        assert_eq!(renderer.size, (1280.0, 720.0));
        assert_eq!(renderer.pixel_ratio, 2.0);
    }

    #[test]
    fn resize_updates_everything_before_next_render() {
        let mut ctx = context();
        let mut renderer = FakeRenderer::default();
        ctx.attach(&mut renderer);
        ctx.tick(&mut renderer).unwrap();

        let projection_before = ctx.camera.projection();
        ctx.handle_resize(&mut renderer, 600.0, 800.0, 2.5);
        assert_eq!((ctx.viewport.width, ctx.viewport.height), (600.0, 800.0));
        assert_relative_eq!(ctx.camera.aspect, 0.75);
        assert_ne!(ctx.camera.projection(), projection_before);
        assert_eq!(renderer.size, (600.0, 800.0));
        assert_eq!(renderer.pixel_ratio, 2.0);

        ctx.tick(&mut renderer).unwrap();
        assert_relative_eq!(*renderer.renders.last().unwrap(), 0.75);
    }

    #[test]
    fn minimised_window_is_ignored() {
        let mut ctx = context();
        let mut renderer = FakeRenderer::default();
        ctx.attach(&mut renderer);
        ctx.handle_resize(&mut renderer, 0.0, 0.0, 1.0);
        assert_eq!(renderer.size, (1280.0, 720.0));
        assert_relative_eq!(ctx.camera.aspect, 1280.0 / 720.0);
    }

    #[test]
    fn fixed_aspect_only_holds_until_first_resize() {
        let mut ctx = AppContext::new(Viewport::new(800.0, 800.0, 1.0), AspectMode::Fixed);
        assert_relative_eq!(ctx.camera.aspect, 1920.0 / 1080.0);
        let mut renderer = FakeRenderer::default();
        ctx.handle_resize(&mut renderer, 800.0, 800.0, 1.0);
        assert_relative_eq!(ctx.camera.aspect, 1.0);
    }

    #[test]
    fn one_render_per_tick() {
        let mut ctx = context();
        let mut renderer = FakeRenderer::default();
        let t0 = Instant::now();
        for i in 0..120 {
            ctx.tick_at(&mut renderer, t0 + Duration::from_millis(16 * i)).unwrap();
        }
        assert_eq!(renderer.renders.len(), 120);
        assert_eq!(ctx.frames_rendered(), 120);
    }

    #[test]
    fn spin_ends_exactly_ten_radians_later() {
        let mut ctx = context();
        let mut renderer = FakeRenderer::default();
        let group = ctx.demo.group;
        ctx.demo.scene.node_mut(group).transform.rotation.y = 0.25;

        let t0 = Instant::now();
        ctx.tick_at(&mut renderer, t0).unwrap();
        ctx.apply(DebugCommand::new(ControlId::Spin, ControlValue::Trigger)).unwrap();

        let mut t = t0;
        let mut previous = 0.25;
        for _ in 0..40 {
            t += Duration::from_millis(16);
            ctx.tick_at(&mut renderer, t).unwrap();
            let y = ctx.demo.scene.node(group).transform.rotation.y;
            assert!(y >= previous);
            previous = y;
        }
        assert!(ctx.spin.is_some());

        for _ in 0..40 {
            t += Duration::from_millis(16);
            ctx.tick_at(&mut renderer, t).unwrap();
        }
        assert!(ctx.spin.is_none());
        assert_eq!(ctx.demo.scene.node(group).transform.rotation.y, 0.25 + SPIN_ANGLE);
    }

    #[test]
    fn panel_color_reaches_every_cube() {
        let mut ctx = context();
        let teal = Color::from_hex(0x00aaaa);
        ctx.apply(DebugCommand::new(ControlId::CubeColor, ControlValue::Color(teal)))
            .unwrap();
        for &cube in &ctx.demo.cubes {
            let NodeKind::Mesh { material, .. } = ctx.demo.scene.node(cube).kind else {
                panic!("cube must be a mesh");
            };
            assert_eq!(ctx.demo.scene.material(material).color, teal);
        }
        assert_eq!(ctx.demo.scene.material(ctx.demo.sun_material).color, Color::YELLOW);
    }

    #[test]
    fn idle_ticks_keep_camera_still() {
        let mut ctx = context();
        let mut renderer = FakeRenderer::default();
        let t0 = Instant::now();
        for i in 0..30 {
            ctx.tick_at(&mut renderer, t0 + Duration::from_millis(16 * i)).unwrap();
        }
        assert!(ctx.camera.position.abs_diff_eq(CAMERA_POSITION, 1e-4));
    }
}
