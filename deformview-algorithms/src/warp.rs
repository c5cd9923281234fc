//! Displacement of mesh points along a vector field

use deformview_core::{Error, PolyData, Point3f, Result};
use rayon::prelude::*;

/// Warp a mesh along its vector field
///
/// Every point is moved to `p + scale_factor * v(p)` where `v` is the mesh's
/// active vector array (or its first three-component array). Connectivity and
/// point data are copied unchanged, so the result can replace the input as the
/// displayed geometry.
///
/// # Arguments
/// * `mesh` - Input mesh carrying a vector field
/// * `scale_factor` - Displacement scale; 0 reproduces the input
///
/// # Returns
/// * `Result<PolyData>` - The displaced copy
///
/// # Example
/// ```rust
/// use deformview_core::{DataArray, PolyData, Point3f, Vector3f};
/// use deformview_algorithms::warp_vector;
///
/// fn main() -> deformview_core::Result<()> {
///     let mut mesh = PolyData::from_points_and_polys(vec![Point3f::origin()], vec![]);
///     mesh.add_point_array(DataArray::vectors("disp", &[Vector3f::new(0.0, 0.0, 2.0)]))?;
///
///     let warped = warp_vector(&mesh, 0.5)?;
///     assert_eq!(warped.points[0], Point3f::new(0.0, 0.0, 1.0));
///     Ok(())
/// }
/// ```
pub fn warp_vector(mesh: &PolyData, scale_factor: f32) -> Result<PolyData> {
    let vectors = mesh.point_data.vectors().ok_or(Error::MissingVectors("warp"))?;

    if vectors.len() != mesh.points.len() {
        return Err(Error::InvalidData(format!(
            "vector array '{}' has {} tuples for {} points",
            vectors.name,
            vectors.len(),
            mesh.points.len()
        )));
    }

    let points: Vec<Point3f> = mesh
        .points
        .par_iter()
        .zip(vectors.values.par_chunks_exact(3))
        .map(|(p, v)| {
            Point3f::new(
                p.x + scale_factor * v[0],
                p.y + scale_factor * v[1],
                p.z + scale_factor * v[2],
            )
        })
        .collect();

    Ok(PolyData {
        points,
        polys: mesh.polys.clone(),
        point_data: mesh.point_data.clone(),
    })
}
