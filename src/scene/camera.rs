//! Camera system

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::uniforms::CommonUniforms;

/// Perspective projection with OpenGL clip space (-1..1 depth)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self::perspective(60.0, 16.0 / 9.0, 0.01, 1000.0)
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect = width / height;
        }
    }
}

/// Camera orbiting a pivot point.
///
/// Yaw turns about the world Y axis, pitch about the camera's local X axis;
/// at zero yaw and pitch the camera sits on +Z looking at the pivot.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub pivot: Vec3,
    pub distance: f32,
    /// Radians about -Y
    pub yaw: f32,
    /// Radians about -X
    pub pitch: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per pixel of drag
    pub sensitivity: f32,
    /// Distance multiplier per scroll unit
    pub zoom_factor: f32,
    pub projection: Projection,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            pivot: Vec3::ZERO,
            distance: 5.0,
            yaw: 0.0,
            pitch: 0.0,
            min_distance: 0.5,
            max_distance: 100.0,
            sensitivity: 0.005,
            zoom_factor: 1.1,
            projection: Projection::default(),
        }
    }
}

impl OrbitCamera {
    pub fn new(pivot: Vec3, distance: f32, projection: Projection) -> Self {
        Self {
            pivot,
            distance,
            projection,
            ..Default::default()
        }
    }

    /// Orbit by a drag of `delta` pixels. Pitch stops short of the poles.
    pub fn rotate(&mut self, delta: Vec2) {
        const LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;
        self.yaw += delta.x * self.sensitivity;
        self.pitch = (self.pitch + delta.y * self.sensitivity).clamp(-LIMIT, LIMIT);
    }

    /// Move closer for positive `scroll`, further for negative.
    pub fn zoom(&mut self, scroll: f32) {
        if scroll > 0.0 {
            self.distance /= self.zoom_factor;
        } else if scroll < 0.0 {
            self.distance *= self.zoom_factor;
        }
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_axis_angle(Vec3::NEG_Y, self.yaw) * Quat::from_axis_angle(Vec3::NEG_X, self.pitch)
    }

    /// Camera-to-world transform.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_translation(self.pivot)
            * Mat4::from_quat(self.rotation())
            * Mat4::from_translation(Vec3::new(0.0, 0.0, self.distance))
    }

    pub fn position(&self) -> Vec3 {
        self.transform().w_axis.truncate()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.transform().inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// Per-frame `ubCommon` contents as seen from this camera.
    pub fn common_uniforms(&self, time: f32, viewport_size: Vec2) -> CommonUniforms {
        CommonUniforms::new(
            self.projection_matrix(),
            self.view_matrix(),
            self.position(),
            time,
            viewport_size,
            self.projection.near,
            self.projection.far,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = OrbitCamera::default();
        assert!(approx(camera.position(), Vec3::new(0.0, 0.0, 5.0)));
        let pivot_in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(approx(pivot_in_view, Vec3::new(0.0, 0.0, -5.0)));
    }

    #[test]
    fn test_yaw_keeps_distance() {
        let mut camera = OrbitCamera::default();
        camera.yaw = std::f32::consts::FRAC_PI_2;
        let position = camera.position();
        assert!((position.length() - 5.0).abs() < 1e-4);
        assert!(position.y.abs() < 1e-4);
        // a quarter turn about -Y swings +Z round to -X
        assert!(approx(position, Vec3::new(-5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_pitch_clamped() {
        let mut camera = OrbitCamera::default();
        camera.rotate(Vec2::new(0.0, 10_000.0));
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut camera = OrbitCamera::default();
        for _ in 0..100 {
            camera.zoom(1.0);
        }
        assert_eq!(camera.distance, camera.min_distance);
        camera.zoom(0.0);
        assert_eq!(camera.distance, camera.min_distance);
    }

    #[test]
    fn test_common_uniforms() {
        let camera = OrbitCamera::default();
        let uniforms = camera.common_uniforms(1.5, Vec2::new(1280.0, 720.0));
        assert_eq!(uniforms.time, 1.5);
        assert_eq!(uniforms.z_near, 0.01);
        assert_eq!(uniforms.z_far, 1000.0);
        assert_eq!(uniforms.view, camera.view_matrix().to_cols_array_2d());
    }

    #[test]
    fn test_projection_aspect() {
        let mut projection = Projection::default();
        projection.set_aspect(100.0, 0.0);
        assert_eq!(projection.aspect, 16.0 / 9.0);
        projection.set_aspect(100.0, 50.0);
        assert_eq!(projection.aspect, 2.0);
    }
}
