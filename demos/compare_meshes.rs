//! Compare two meshes with copies of themselves rotated 10 degrees about X
//!
//! Usage: compare_meshes <FIRST.vtk> <SECOND.vtk>

use anyhow::{Context, Result};
use deformview_core::{Transform3D, Transformable, Vector3f};
use deformview_visualization::{plot, MeshInput, ViewerConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    let [first, second] = paths.as_slice() else {
        anyhow::bail!("usage: compare_meshes <FIRST> <SECOND>");
    };

    let meshes = deformview_io::read_meshes(&[first, second])
        .with_context(|| format!("failed to read {} and {}", first, second))?;

    let transform = Transform3D::rotation_wxyz(10.0, Vector3f::x());
    let rotated = meshes
        .iter()
        .map(|mesh| {
            let mut mesh = mesh.clone();
            mesh.transform(&transform);
            mesh
        })
        .collect();

    plot(
        MeshInput::List(meshes),
        Some(MeshInput::List(rotated)),
        ViewerConfig::default(),
    )?;
    Ok(())
}
