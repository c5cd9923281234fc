//! Point and vector aliases plus the axis-aligned bounds type

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point3f,
    pub max: Point3f,
}

impl Bounds {
    /// Bounds enclosing every point, `None` for an empty slice
    pub fn from_points(points: &[Point3f]) -> Option<Self> {
        let first = *points.first()?;
        let mut bounds = Self { min: first, max: first };
        for p in &points[1..] {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.min.z = bounds.min.z.min(p.z);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
            bounds.max.z = bounds.max.z.max(p.z);
        }
        Some(bounds)
    }

    /// Extent along each axis
    pub fn size(&self) -> Vector3f {
        self.max - self.min
    }

    /// Center of the box
    pub fn center(&self) -> Point3f {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the box diagonal
    pub fn diagonal(&self) -> f32 {
        self.size().norm()
    }

    /// Flat `[xmin, xmax, ymin, ymax, zmin, zmax]` layout
    pub fn as_array(&self) -> [f32; 6] {
        [
            self.min.x, self.max.x,
            self.min.y, self.max.y,
            self.min.z, self.max.z,
        ]
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: Point3f::origin(),
            max: Point3f::origin(),
        }
    }
}
