//! Parametric mesh sources

use deformview_core::{PolyData, Point3f};
use std::f32::consts::PI;

/// UV sphere with poles on the Z axis
///
/// `phi_resolution` is the number of latitude bands, `theta_resolution` the
/// number of longitude segments; both are raised to 3 if smaller.
pub fn sphere_source(
    center: Point3f,
    radius: f32,
    phi_resolution: usize,
    theta_resolution: usize,
) -> PolyData {
    let n_phi = phi_resolution.max(3);
    let n_theta = theta_resolution.max(3);
    let mut mesh = PolyData::new();

    let north = mesh.add_point(center + nalgebra::Vector3::new(0.0, 0.0, radius));
    let south = mesh.add_point(center - nalgebra::Vector3::new(0.0, 0.0, radius));

    // interior latitude rings, top to bottom
    let ring_start = mesh.points.len();
    for i in 1..n_phi {
        let phi = PI * i as f32 / n_phi as f32;
        for j in 0..n_theta {
            let theta = 2.0 * PI * j as f32 / n_theta as f32;
            mesh.add_point(Point3f::new(
                center.x + radius * phi.sin() * theta.cos(),
                center.y + radius * phi.sin() * theta.sin(),
                center.z + radius * phi.cos(),
            ));
        }
    }
    let ring = |i: usize, j: usize| ring_start + i * n_theta + (j % n_theta);

    for j in 0..n_theta {
        mesh.polys.push([north, ring(0, j), ring(0, j + 1)]);
        mesh.polys.push([south, ring(n_phi - 2, j + 1), ring(n_phi - 2, j)]);
    }
    for i in 0..n_phi - 2 {
        for j in 0..n_theta {
            mesh.add_polygon(&[ring(i, j), ring(i + 1, j), ring(i + 1, j + 1), ring(i, j + 1)]);
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_counts() {
        let sphere = sphere_source(Point3f::origin(), 2.0, 30, 30);
        assert_eq!(sphere.point_count(), 2 + 29 * 30);
        assert_eq!(sphere.poly_count(), 2 * 30 + 2 * 28 * 30);
        assert!(sphere.validate().is_ok());
    }

    #[test]
    fn test_sphere_points_lie_on_surface() {
        let center = Point3f::new(1.0, -1.0, 0.5);
        let sphere = sphere_source(center, 2.0, 8, 8);
        for p in &sphere.points {
            assert_relative_eq!((p - center).norm(), 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_sphere_normals_point_outward() {
        let sphere = sphere_source(Point3f::origin(), 1.0, 10, 10);
        for (p, n) in sphere.points.iter().zip(sphere.vertex_normals()) {
            assert!(p.coords.dot(&n) > 0.0);
        }
    }
}
