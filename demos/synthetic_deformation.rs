//! Generate a bending plate with temperature and displacement fields, write it
//! as legacy VTK, read it back and open it in the viewer.
//!
//! Usage: synthetic_deformation [OUTPUT.vtk]

use anyhow::{Context, Result};
use deformview_core::{DataArray, PolyData, Point3f, Vector3f};
use deformview_visualization::{plot, MeshInput, ViewerConfig};
use std::f32::consts::PI;
use std::path::PathBuf;

const DIVISIONS: usize = 24;

/// A unit-square plate in the XY plane, bending up along X under load
fn bending_plate() -> Result<PolyData> {
    let mut mesh = PolyData::new();
    let n = DIVISIONS + 1;
    for j in 0..n {
        for i in 0..n {
            let x = i as f32 / DIVISIONS as f32;
            let y = j as f32 / DIVISIONS as f32;
            mesh.add_point(Point3f::new(x * 4.0, y * 2.0, 0.0));
        }
    }
    for j in 0..DIVISIONS {
        for i in 0..DIVISIONS {
            let a = j * n + i;
            mesh.add_polygon(&[a, a + 1, a + n + 1, a + n]);
        }
    }

    let temperature = mesh
        .points
        .iter()
        .map(|p| 20.0 + 15.0 * (PI * p.x / 4.0).sin() * (PI * p.y / 2.0).cos())
        .collect();
    let displacement: Vec<Vector3f> = mesh
        .points
        .iter()
        .map(|p| {
            let t = p.x / 4.0;
            Vector3f::new(-0.1 * t, 0.0, 1.5 * t * t)
        })
        .collect();
    let stress = mesh.points.iter().map(|p| (p.x / 4.0).powi(2) * 100.0).collect();

    mesh.add_point_array(DataArray::scalars("temperature", temperature))?;
    mesh.add_point_array(DataArray::scalars("stress", stress))?;
    mesh.add_point_array(DataArray::vectors("displacement", &displacement))?;
    mesh.point_data.set_active_scalars("temperature");
    mesh.point_data.set_active_vectors("displacement");
    Ok(mesh)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("deformview_plate.vtk"));

    let plate = bending_plate()?;
    deformview_io::write_mesh(&plate, &path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("Wrote {} points to {}", plate.point_count(), path.display());

    let mesh = deformview_io::read_mesh(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    plot(MeshInput::Single(mesh), None, ViewerConfig::default())?;
    Ok(())
}
