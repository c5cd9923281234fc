//! 3D transformation utilities

use nalgebra::{Matrix4, Point3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D transformation that can be applied to points and meshes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f32>,
}

impl Transform3D {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a translation transformation
    pub fn translation(translation: Vector3<f32>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&translation),
        }
    }

    /// Create a rotation transformation from a quaternion
    pub fn rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self {
            matrix: rotation.to_homogeneous(),
        }
    }

    /// Rotation of `angle_degrees` about `axis` (the W-XYZ convention).
    /// A zero axis yields the identity.
    pub fn rotation_wxyz(angle_degrees: f32, axis: Vector3<f32>) -> Self {
        match Unit::try_new(axis, f32::EPSILON) {
            Some(axis) => Self::rotation(UnitQuaternion::from_axis_angle(
                &axis,
                angle_degrees.to_radians(),
            )),
            None => Self::identity(),
        }
    }

    /// Create a uniform scaling transformation
    pub fn uniform_scaling(scale: f32) -> Self {
        Self {
            matrix: Matrix4::new_scaling(scale),
        }
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        let homogeneous = self.matrix * point.to_homogeneous();
        Point3::from_homogeneous(homogeneous).unwrap_or(*point)
    }

    /// Apply the linear part of the transformation to a vector
    pub fn transform_vector(&self, vector: &Vector3<f32>) -> Vector3<f32> {
        self.matrix.fixed_view::<3, 3>(0, 0) * vector
    }

    /// Compose this transformation with another (`other` is applied first)
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform3D {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

impl From<Matrix4<f32>> for Transform3D {
    fn from(matrix: Matrix4<f32>) -> Self {
        Self { matrix }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataArray, PolyData, Transformable};
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_wxyz_about_x() {
        let t = Transform3D::rotation_wxyz(90.0, Vector3::x());
        let p = t.transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_axis_is_identity() {
        let t = Transform3D::rotation_wxyz(30.0, Vector3::zeros());
        assert_eq!(t, Transform3D::identity());
    }

    #[test]
    fn test_translation_leaves_vectors_alone() {
        let t = Transform3D::translation(Vector3::new(1.0, 2.0, 3.0));
        let v = t.transform_vector(&Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(v, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_polydata_transform_rotates_vectors() {
        let mut mesh = PolyData::from_points_and_polys(vec![Point3::new(0.0, 1.0, 0.0)], vec![]);
        mesh.add_point_array(DataArray::vectors("v", &[Vector3::new(0.0, 1.0, 0.0)]))
            .unwrap();
        mesh.add_point_array(DataArray::scalars("s", vec![4.0])).unwrap();
        mesh.transform(&Transform3D::rotation_wxyz(90.0, Vector3::x()));
        assert_relative_eq!(mesh.points[0].z, 1.0, epsilon = 1e-6);
        let v = mesh.point_data.get("v").unwrap().vector(0).unwrap();
        assert_relative_eq!(v.z, 1.0, epsilon = 1e-6);
        assert_eq!(mesh.point_data.get("s").unwrap().values, vec![4.0]);
    }
}
