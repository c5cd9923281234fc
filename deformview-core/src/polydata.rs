//! Triangle mesh with attached point data

use crate::{point::*, DataArray, Error, PointData, Result};
use serde::{Deserialize, Serialize};

/// A triangle mesh whose points carry named scalar and vector arrays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolyData {
    pub points: Vec<Point3f>,
    pub polys: Vec<[usize; 3]>,
    pub point_data: PointData,
}

impl PolyData {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from points and triangles
    pub fn from_points_and_polys(points: Vec<Point3f>, polys: Vec<[usize; 3]>) -> Self {
        Self {
            points,
            polys,
            point_data: PointData::new(),
        }
    }

    /// Get the number of points
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Get the number of triangles
    pub fn poly_count(&self) -> usize {
        self.polys.len()
    }

    /// Check if the mesh has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the mesh
    pub fn add_point(&mut self, point: Point3f) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    /// Add a polygon, fan-triangulating anything with more than three corners
    pub fn add_polygon(&mut self, corners: &[usize]) {
        if corners.len() < 3 {
            return;
        }
        for i in 1..corners.len() - 1 {
            self.polys.push([corners[0], corners[i], corners[i + 1]]);
        }
    }

    /// Attach a point array; its tuple count must match the point count
    pub fn add_point_array(&mut self, array: DataArray) -> Result<usize> {
        if array.len() != self.points.len() {
            return Err(Error::InvalidData(format!(
                "array '{}' has {} tuples but the mesh has {} points",
                array.name,
                array.len(),
                self.points.len()
            )));
        }
        Ok(self.point_data.add_array(array))
    }

    /// Check that every triangle references an existing point
    pub fn validate(&self) -> Result<()> {
        let n = self.points.len();
        if let Some(face) = self.polys.iter().find(|f| f.iter().any(|&i| i >= n)) {
            return Err(Error::InvalidData(format!(
                "triangle {:?} references a point outside 0..{}",
                face, n
            )));
        }
        for array in self.point_data.arrays() {
            if array.len() != n {
                return Err(Error::InvalidData(format!(
                    "array '{}' has {} tuples for {} points",
                    array.name,
                    array.len(),
                    n
                )));
            }
        }
        Ok(())
    }

    /// Axis-aligned bounds, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    /// Unweighted mean of the points
    pub fn center_of_mass(&self) -> Point3f {
        if self.points.is_empty() {
            return Point3f::origin();
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3f::zeros(), |acc, p| acc + p.coords);
        Point3f::from(sum / self.points.len() as f32)
    }

    /// Range of the active scalars, if any
    pub fn scalar_range(&self) -> Option<(f32, f32)> {
        self.point_data.scalars().and_then(|a| a.range())
    }

    /// Whether the mesh carries a vector field
    pub fn has_vectors(&self) -> bool {
        self.point_data.vectors().is_some()
    }

    /// Calculate face normals
    pub fn face_normals(&self) -> Vec<Vector3f> {
        self.polys
            .iter()
            .map(|face| {
                let v0 = self.points[face[0]];
                let v1 = self.points[face[1]];
                let v2 = self.points[face[2]];
                (v1 - v0).cross(&(v2 - v0)).try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::z)
            })
            .collect()
    }

    /// Area-weighted vertex normals; isolated points get +Z
    pub fn vertex_normals(&self) -> Vec<Vector3f> {
        let mut normals = vec![Vector3f::zeros(); self.points.len()];
        for face in &self.polys {
            let v0 = self.points[face[0]];
            let v1 = self.points[face[1]];
            let v2 = self.points[face[2]];
            // Unnormalised cross product weights by twice the triangle area
            let n = (v1 - v0).cross(&(v2 - v0));
            for &i in face {
                normals[i] += n;
            }
        }
        normals
            .into_iter()
            .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::z))
            .collect()
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.points.clear();
        self.polys.clear();
        self.point_data = PointData::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> PolyData {
        let mut mesh = PolyData::from_points_and_polys(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
                Point3f::new(2.0, 2.0, 0.0),
                Point3f::new(0.0, 2.0, 0.0),
            ],
            Vec::new(),
        );
        mesh.add_polygon(&[0, 1, 2, 3]);
        mesh
    }

    #[test]
    fn test_add_polygon_fan_triangulates() {
        let mesh = quad();
        assert_eq!(mesh.polys, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_center_of_mass_and_bounds() {
        let mesh = quad();
        let c = mesh.center_of_mass();
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
        let b = mesh.bounds().unwrap();
        assert_eq!(b.as_array(), [0.0, 2.0, 0.0, 2.0, 0.0, 0.0]);
        assert!(PolyData::new().bounds().is_none());
    }

    #[test]
    fn test_add_point_array_checks_length() {
        let mut mesh = quad();
        assert!(mesh
            .add_point_array(DataArray::scalars("t", vec![1.0, 2.0]))
            .is_err());
        assert!(mesh
            .add_point_array(DataArray::scalars("t", vec![1.0, 2.0, 3.0, 4.0]))
            .is_ok());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mut mesh = quad();
        mesh.polys.push([0, 1, 9]);
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_vertex_normals_point_up_for_flat_quad() {
        let mesh = quad();
        for n in mesh.vertex_normals() {
            assert_relative_eq!(n.z, 1.0, epsilon = 1e-6);
        }
    }
}
