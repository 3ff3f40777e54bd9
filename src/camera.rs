// Camera module for Wirescape

use glam::{Mat4, Vec3};

/// Perspective camera. `projection` is cached and only refreshed by
/// [`PerspectiveCamera::update_projection_matrix`], so callers that change
/// `fov`, `aspect`, `near` or `far` must call it afterwards.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn projection_is_cached_until_updated() {
        let mut camera = PerspectiveCamera::new(40.0, 16.0 / 9.0, 1.0, 1000.0);
        let before = camera.projection();
        camera.aspect = 1.0;
        assert_eq!(camera.projection(), before);
        camera.update_projection_matrix();
        assert_ne!(camera.projection(), before);
    }

    #[test]
    fn projection_encodes_aspect() {
        let camera = PerspectiveCamera::new(40.0, 2.0, 1.0, 1000.0);
        let p = camera.projection();
        // x scale is y scale divided by the aspect ratio
        assert_relative_eq!(p.x_axis.x * 2.0, p.y_axis.y, epsilon = 1e-5);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let mut camera = PerspectiveCamera::new(40.0, 1.5, 1.0, 1000.0);
        camera.position = Vec3::new(0.0, 0.5, 25.0);
        camera.look_at(Vec3::ZERO);
        let clip = camera.view_projection().project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&clip.z));
    }
}
