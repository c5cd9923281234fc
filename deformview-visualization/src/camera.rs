//! Camera utilities for 3D visualization
//!
//! A perspective camera described by position, focal point and view-up, with
//! the azimuth/elevation/dolly/pan/zoom operations a trackball interaction
//! needs. Angles are in degrees.

use deformview_core::Bounds;
use nalgebra::{Matrix4, Perspective3, Point3, Rotation3, Unit, Vector3};

/// Maps OpenGL clip depth [-1, 1] to the [0, 1] range wgpu expects
#[rustfmt::skip]
fn opengl_to_wgpu() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// A 3D camera for viewing meshes
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub focal_point: Point3<f32>,
    pub view_up: Vector3<f32>,
    /// Vertical view angle in degrees
    pub view_angle: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a new camera; the view-up is orthogonalized against the view direction
    pub fn new(position: Point3<f32>, focal_point: Point3<f32>, view_up: Vector3<f32>) -> Self {
        let mut camera = Self {
            position,
            focal_point,
            view_up,
            ..Self::default()
        };
        camera.orthogonalize_view_up();
        camera
    }

    /// Camera placed off the lower-left of the mesh looking at its center of mass
    ///
    /// The position is (-5·|dx|/2, -3·|dy|/2, 0) where dx and dy are the bounds'
    /// extents, the view-up is +Z.
    pub fn for_mesh(bounds: &Bounds, center_of_mass: Point3<f32>) -> Self {
        let size = bounds.size();
        let mut camera = Self::new(
            Point3::new(-5.0 * size.x.abs() / 2.0, -3.0 * size.y.abs() / 2.0, 0.0),
            center_of_mass,
            Vector3::z(),
        );
        camera.reset_clipping_range(bounds);
        camera
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.focal_point, &self.view_up)
    }

    /// Get the projection matrix in wgpu clip space
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let perspective = Perspective3::new(
            self.aspect_ratio.max(1e-6),
            self.view_angle.to_radians(),
            self.near,
            self.far,
        );
        opengl_to_wgpu() * perspective.into_inner()
    }

    /// Distance from position to focal point
    pub fn distance(&self) -> f32 {
        (self.focal_point - self.position).norm()
    }

    /// Unit vector from position towards the focal point
    pub fn direction(&self) -> Vector3<f32> {
        (self.focal_point - self.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vector3::z())
    }

    /// Rotate the position about the view-up vector centered at the focal point
    pub fn azimuth(&mut self, degrees: f32) {
        let Some(axis) = Unit::try_new(self.view_up, f32::EPSILON) else {
            return;
        };
        let rotation = Rotation3::from_axis_angle(&axis, degrees.to_radians());
        self.position = self.focal_point + rotation * (self.position - self.focal_point);
    }

    /// Rotate the position about the camera's right axis centered at the focal point
    pub fn elevation(&mut self, degrees: f32) {
        let right = self.direction().cross(&self.view_up);
        let Some(axis) = Unit::try_new(right, f32::EPSILON) else {
            return;
        };
        let rotation = Rotation3::from_axis_angle(&axis, -degrees.to_radians());
        self.position = self.focal_point + rotation * (self.position - self.focal_point);
        self.view_up = rotation * self.view_up;
    }

    /// Narrow (factor > 1) or widen (factor < 1) the view angle
    pub fn zoom(&mut self, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        self.view_angle = (self.view_angle / factor).clamp(0.01, 179.0);
    }

    /// Move the position towards (factor > 1) or away from the focal point
    pub fn dolly(&mut self, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        let distance = self.distance() / factor;
        self.position = self.focal_point - self.direction() * distance;
    }

    /// Translate position and focal point in the view plane, in world units
    pub fn pan(&mut self, right: f32, up: f32) {
        let right_axis = self
            .direction()
            .cross(&self.view_up)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::x);
        let up_axis = self.view_up.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z);
        let motion = right_axis * right + up_axis * up;
        self.position += motion;
        self.focal_point += motion;
    }

    /// Make the view-up perpendicular to the view direction
    pub fn orthogonalize_view_up(&mut self) {
        let direction = self.direction();
        let up = self.view_up - direction * direction.dot(&self.view_up);
        if let Some(up) = up.try_normalize(f32::EPSILON) {
            self.view_up = up;
        }
    }

    /// Keep the view direction and move so that `bounds` fills the view
    pub fn reset(&mut self, bounds: &Bounds) {
        let direction = self.direction();
        let radius = (bounds.diagonal() / 2.0).max(1e-3);
        let half_angle = (self.view_angle.to_radians() / 2.0).sin().max(1e-3);
        self.focal_point = bounds.center();
        self.position = self.focal_point - direction * (radius / half_angle);
        self.orthogonalize_view_up();
        self.reset_clipping_range(bounds);
    }

    /// Fit near/far planes around `bounds`
    pub fn reset_clipping_range(&mut self, bounds: &Bounds) {
        let radius = (bounds.diagonal() / 2.0).max(1e-3);
        let center_distance = (bounds.center() - self.position).dot(&self.direction());
        let far = (center_distance + radius) * 1.01;
        let far = far.max(radius * 2.0);
        let near = (center_distance - radius) * 0.99;
        self.near = near.max(far * 1e-3);
        self.far = far;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 1.0),
            focal_point: Point3::origin(),
            view_up: Vector3::y(),
            view_angle: 30.0,
            aspect_ratio: 1.0,
            near: 0.01,
            far: 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_bounds() -> Bounds {
        Bounds {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(2.0, 4.0, 1.0),
        }
    }

    #[test]
    fn test_for_mesh_placement() {
        let camera = Camera::for_mesh(&unit_bounds(), Point3::new(1.0, 2.0, 0.5));
        assert_relative_eq!(camera.position, Point3::new(-5.0, -6.0, 0.0));
        assert_relative_eq!(camera.focal_point, Point3::new(1.0, 2.0, 0.5));
        // view-up stays close to +Z after orthogonalization
        assert!(camera.view_up.z > 0.9);
        assert_relative_eq!(camera.view_up.dot(&camera.direction()), 0.0, epsilon = 1e-5);
        assert!(camera.near > 0.0 && camera.near < camera.far);
    }

    #[test]
    fn test_zoom_changes_view_angle() {
        let mut camera = Camera::default();
        camera.zoom(0.8);
        assert_relative_eq!(camera.view_angle, 37.5);
        camera.zoom(1.25);
        assert_relative_eq!(camera.view_angle, 30.0, epsilon = 1e-4);
    }

    #[test]
    fn test_azimuth_keeps_distance() {
        let mut camera = Camera::new(Point3::new(10.0, 0.0, 0.0), Point3::origin(), Vector3::z());
        camera.azimuth(90.0);
        assert_relative_eq!(camera.position, Point3::new(0.0, 10.0, 0.0), epsilon = 1e-4);
        assert_relative_eq!(camera.distance(), 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_elevation_moves_up() {
        let mut camera = Camera::new(Point3::new(10.0, 0.0, 0.0), Point3::origin(), Vector3::z());
        camera.elevation(30.0);
        assert!(camera.position.z > 0.0);
        assert_relative_eq!(camera.distance(), 10.0, epsilon = 1e-4);
        assert_relative_eq!(camera.view_up.dot(&camera.direction()), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_dolly_and_pan() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 10.0), Point3::origin(), Vector3::y());
        camera.dolly(2.0);
        assert_relative_eq!(camera.position, Point3::new(0.0, 0.0, 5.0), epsilon = 1e-5);
        camera.pan(1.0, 0.0);
        assert_relative_eq!(camera.focal_point.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(camera.focal_point.x.abs(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.distance(), 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_reset_frames_bounds_along_current_direction() {
        let mut camera = Camera::default();
        let bounds = Bounds {
            min: Point3::new(-1.0, -1.0, -1.0),
            max: Point3::new(3.0, 1.0, 1.0),
        };
        camera.reset(&bounds);
        assert_relative_eq!(camera.focal_point, Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(camera.direction(), -Vector3::z(), epsilon = 1e-5);
        let expected = (bounds.diagonal() / 2.0) / 15f32.to_radians().sin();
        assert_relative_eq!(camera.distance(), expected, epsilon = 1e-3);
        assert!(camera.near < camera.distance() && camera.far > camera.distance());
    }

    #[test]
    fn test_projection_maps_depth_to_unit_range() {
        let camera = Camera {
            near: 1.0,
            far: 10.0,
            ..Camera::default()
        };
        let proj = camera.projection_matrix();
        let near = proj * nalgebra::Vector4::new(0.0, 0.0, -1.0, 1.0);
        let far = proj * nalgebra::Vector4::new(0.0, 0.0, -10.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }
}
