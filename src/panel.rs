// Debug panel for Wirescape

use winit::event::WindowEvent;
use winit::window::Window;

use crate::debug::{Control, ControlKind, ControlValue, DebugCommand, DebugTarget, CONTROLS};
use crate::material::Color;

/// Tessellated panel output handed to the renderer for one frame.
pub struct Overlay {
    pub paint_jobs: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Floating egui window with one widget per entry in [`CONTROLS`].
pub struct DebugPanel {
    ctx: egui::Context,
    state: egui_winit::State,
}

impl DebugPanel {
    pub fn new(window: &Window, max_texture_side: usize) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            Some(max_texture_side),
        );
        // TODO: drop this dump once the panel layout settles
        log::debug!("debug panel bindings: {CONTROLS:#?}");
        Self { ctx, state }
    }

    /// Feeds a window event to the panel. Returns `true` when the panel used
    /// it and the scene should not react.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// True while the pointer is over the panel or dragging one of its widgets.
    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    /// Lays out the panel against the current values and collects the edits
    /// the user made this frame.
    pub fn run(
        &mut self,
        window: &Window,
        target: &DebugTarget<'_>,
    ) -> (Vec<DebugCommand>, Overlay) {
        let raw_input = self.state.take_egui_input(window);
        let mut commands = Vec::new();

        let full_output = self.ctx.run(raw_input, |ctx| {
            egui::Window::new("Debug")
                .default_width(260.0)
                .resizable(false)
                .show(ctx, |ui| {
                    for control in &CONTROLS {
                        if let Some(value) = control_widget(ui, control, target.read(control.id)) {
                            commands.push(DebugCommand::new(control.id, value));
                        }
                    }
                });
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);
        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (
            commands,
            Overlay {
                paint_jobs,
                textures_delta: full_output.textures_delta,
                pixels_per_point: full_output.pixels_per_point,
            },
        )
    }
}

fn control_widget(
    ui: &mut egui::Ui,
    control: &Control,
    current: ControlValue,
) -> Option<ControlValue> {
    match (control.kind, current) {
        (ControlKind::Action, _) => ui
            .button(control.label)
            .clicked()
            .then_some(ControlValue::Trigger),
        (ControlKind::Color, ControlValue::Color(color)) => {
            let mut rgb = color.to_srgb_array();
            let changed = ui
                .horizontal(|ui| {
                    let changed = ui.color_edit_button_srgb(&mut rgb).changed();
                    ui.label(control.label);
                    changed
                })
                .inner;
            changed.then(|| ControlValue::Color(Color::from_srgb_array(rgb)))
        }
        (ControlKind::Range { min, max, step }, ControlValue::Number(mut value)) => {
            let changed = ui
                .add(
                    egui::Slider::new(&mut value, min..=max)
                        .step_by(f64::from(step))
                        .text(control.label),
                )
                .changed();
            changed.then_some(ControlValue::Number(value))
        }
        (ControlKind::Toggle, ControlValue::Flag(mut on)) => {
            let changed = ui.checkbox(&mut on, control.label).changed();
            changed.then_some(ControlValue::Flag(on))
        }
        _ => None,
    }
}
