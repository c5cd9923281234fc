//! Core traits for deformview

use crate::{point::*, polydata::PolyData, transform::Transform3D};

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> Bounds;

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        self.bounding_box().center()
    }
}

/// Trait for objects that can be transformed
pub trait Transformable {
    /// Apply a transformation to the object
    fn transform(&mut self, transform: &Transform3D);
}

impl Drawable for PolyData {
    fn bounding_box(&self) -> Bounds {
        self.bounds().unwrap_or_default()
    }
}

impl Transformable for PolyData {
    /// Moves the points and rotates every three-component array with them,
    /// matching how a transform filter treats vectors and normals.
    fn transform(&mut self, transform: &Transform3D) {
        for p in &mut self.points {
            *p = transform.transform_point(p);
        }
        let names: Vec<String> = self
            .point_data
            .arrays()
            .iter()
            .filter(|a| a.is_vector())
            .map(|a| a.name.clone())
            .collect();
        for name in names {
            if let Some(array) = self.point_data.get_mut(&name) {
                for chunk in array.values.chunks_exact_mut(3) {
                    let v = transform.transform_vector(&Vector3f::new(chunk[0], chunk[1], chunk[2]));
                    chunk.copy_from_slice(&[v.x, v.y, v.z]);
                }
            }
        }
    }
}
