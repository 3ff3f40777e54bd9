// Orbit controls for Wirescape

use glam::{Vec2, Vec3};
use std::collections::HashSet;
use std::f32::consts::PI;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase};

use crate::camera::PerspectiveCamera;

/// Pointer input gathered between two ticks.
#[derive(Default, Debug, Clone)]
pub struct PointerState {
    /// Cursor position inside the window
    pub position: Vec2,
    /// Cursor movement since the last tick
    pub delta: Vec2,
    /// Wheel movement since the last tick, in lines
    pub scroll: f32,
    /// Drawable surface size in pixels
    pub surface_size: Vec2,
    buttons: HashSet<MouseButton>,
    has_position: bool,
    /// Finger that drives the pointer; further fingers are ignored
    touch: Option<u64>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears per-tick deltas so a held button does not keep rotating.
    pub fn end_frame(&mut self) {
        self.delta = Vec2::ZERO;
        self.scroll = 0.0;
    }

    pub fn handle_resize(&mut self, width: f32, height: f32) {
        self.surface_size = Vec2::new(width, height);
    }

    pub fn handle_cursor_move(&mut self, x: f64, y: f64) {
        let position = Vec2::new(x as f32, y as f32);
        if self.has_position {
            self.delta += position - self.position;
        }
        self.position = position;
        self.has_position = true;
    }

    pub fn handle_button(&mut self, state: ElementState, button: MouseButton) {
        match state {
            ElementState::Pressed => {
                self.buttons.insert(button);
            }
            ElementState::Released => {
                self.buttons.remove(&button);
            }
        }
    }

    pub fn handle_wheel(&mut self, delta: MouseScrollDelta) {
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            // Pixel deltas from touchpads are much larger than line deltas
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
        };
    }

    /// Maps one finger onto the cursor and the left button. Returns true when
    /// that finger has just touched down.
    pub fn handle_touch(&mut self, phase: TouchPhase, id: u64, x: f64, y: f64) -> bool {
        match phase {
            TouchPhase::Started if self.touch.is_none() => {
                self.touch = Some(id);
                // A new touch point is a jump, not a drag
                self.has_position = false;
                self.handle_cursor_move(x, y);
                self.handle_button(ElementState::Pressed, MouseButton::Left);
                true
            }
            TouchPhase::Moved if self.touch == Some(id) => {
                self.handle_cursor_move(x, y);
                false
            }
            TouchPhase::Ended | TouchPhase::Cancelled if self.touch == Some(id) => {
                self.touch = None;
                self.handle_button(ElementState::Released, MouseButton::Left);
                false
            }
            _ => false,
        }
    }

    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }
}

/// Orbits the camera around a target point. Left drag rotates, right drag
/// pans the target, the wheel zooms. With damping enabled rotation and pan
/// keep easing after the button is released.
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub damping_factor: f32,
    pub enable_damping: bool,
    pub min_distance: f32,
    pub max_distance: f32,

    pub target: Vec3,
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,

    rotate_delta: Vec2,
    pan_offset: Vec3,
}

impl OrbitControls {
    /// Picks up the camera's current position relative to its target.
    pub fn new(camera: &PerspectiveCamera) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.length().max(f32::EPSILON);
        Self {
            rotate_speed: 1.0,
            zoom_speed: 0.05,
            pan_speed: 1.0,
            damping_factor: 0.05,
            enable_damping: false,
            min_distance: 1.0,
            max_distance: 1000.0,

            target: camera.target,
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),

            rotate_delta: Vec2::ZERO,
            pan_offset: Vec3::ZERO,
        }
    }

    pub fn with_damping(mut self, enabled: bool) -> Self {
        self.enable_damping = enabled;
        self
    }

    /// True while a released drag is still easing out.
    #[cfg(test)]
    pub fn is_settling(&self) -> bool {
        self.rotate_delta.length_squared() > 1e-10 || self.pan_offset.length_squared() > 1e-10
    }

    pub fn update(&mut self, camera: &mut PerspectiveCamera, pointer: &PointerState, dt: f32) {
        let screen_height = pointer.surface_size.y.max(1.0);

        if pointer.is_pressed(MouseButton::Left) {
            let rotate_per_pixel = 2.0 * PI / screen_height;
            self.rotate_delta -= pointer.delta * rotate_per_pixel * self.rotate_speed;
        }

        if pointer.is_pressed(MouseButton::Right) && pointer.delta != Vec2::ZERO {
            let half_fov = camera.fov.to_radians() / 2.0;
            let world_height = 2.0 * self.radius * half_fov.tan();
            let pixels_to_world = world_height / screen_height;

            let forward = -self.offset_direction();
            let right = forward.cross(Vec3::Y).normalize();
            let up = right.cross(forward).normalize();
            let pan = right * -pointer.delta.x + up * pointer.delta.y;
            self.pan_offset += pan * pixels_to_world * self.pan_speed;
        }

        if self.enable_damping {
            let target_fps = 60.0;
            let retention = (1.0 - self.damping_factor).powf(dt * target_fps);
            let applied = self.rotate_delta * (1.0 - retention);
            self.theta += applied.x;
            self.phi += applied.y;
            self.rotate_delta *= retention;
            self.target += self.pan_offset * (1.0 - retention);
            self.pan_offset *= retention;
        } else {
            self.theta += self.rotate_delta.x;
            self.phi += self.rotate_delta.y;
            self.rotate_delta = Vec2::ZERO;
            self.target += self.pan_offset;
            self.pan_offset = Vec3::ZERO;
        }

        const EPS: f32 = 0.0001;
        self.phi = self.phi.clamp(EPS, PI - EPS);

        if pointer.scroll != 0.0 {
            let scale = (1.0 - self.zoom_speed).powf(pointer.scroll.abs());
            if pointer.scroll > 0.0 {
                self.radius *= scale;
            } else {
                self.radius /= scale;
            }
            self.radius = self.radius.clamp(self.min_distance, self.max_distance);
        }

        camera.position = self.target + self.offset_direction() * self.radius;
        camera.look_at(self.target);
    }

    fn offset_direction(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta)
    }
}
