//! Mesh readers and writers
//!
//! Loads surface meshes together with their per-point data arrays from
//! legacy VTK, OBJ and PLY files, and writes them back out.

pub mod error;
pub mod obj;
pub mod ply;
pub mod vtk;

pub use error::*;
pub use vtk::{VtkEncoding, VtkHeader, VtkReader, VtkWriteOptions, VtkWriter};

use deformview_core::{PolyData, Result};
use std::path::Path;
use tracing::info;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<PolyData>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &PolyData, path: P) -> Result<()>;
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<PolyData> {
    let path = path.as_ref();
    let mesh = match extension(path).as_deref() {
        Some("vtk") => vtk::VtkReader::read_mesh(path),
        Some("obj") => obj::ObjReader::read_mesh(path),
        Some("ply") => ply::PlyReader::read_mesh(path),
        _ => Err(deformview_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }?;
    info!(
        "Loaded {}: {} points, {} triangles, arrays {:?}",
        path.display(),
        mesh.point_count(),
        mesh.poly_count(),
        mesh.point_data.array_names()
    );
    Ok(mesh)
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<Path>>(mesh: &PolyData, path: P) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("vtk") => vtk::VtkWriter::write_mesh(mesh, path),
        Some("obj") => obj::ObjWriter::write_mesh(mesh, path),
        Some("ply") => ply::PlyWriter::write_mesh(mesh, path),
        _ => Err(deformview_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// Read several meshes, stopping at the first failure
pub fn read_meshes<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PolyData>> {
    paths.iter().map(read_mesh).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deformview_core::{DataArray, Point3f};

    fn sample_mesh() -> PolyData {
        let mut mesh = PolyData::from_points_and_polys(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        mesh.add_point_array(DataArray::scalars("temperature", vec![1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        mesh.point_data.set_active_scalars("temperature");
        mesh
    }

    #[test]
    fn test_auto_detect_formats() {
        let dir = std::env::temp_dir();
        for ext in ["vtk", "VTK", "ply", "obj"] {
            let path = dir.join(format!("deformview_auto_detect.{}", ext));
            write_mesh(&sample_mesh(), &path).unwrap();
            let loaded = read_mesh(&path).unwrap();
            assert_eq!(loaded.point_count(), 4, "format {}", ext);
            assert_eq!(loaded.polys, vec![[0, 1, 2], [0, 2, 3]], "format {}", ext);
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            read_mesh("mesh.stl"),
            Err(deformview_core::Error::UnsupportedFormat(_))
        ));
        assert!(write_mesh(&sample_mesh(), "mesh").is_err());
    }

    #[test]
    fn test_read_meshes_fails_on_missing_file() {
        let path = std::env::temp_dir().join("deformview_read_meshes_ok.vtk");
        write_mesh(&sample_mesh(), &path).unwrap();
        assert_eq!(read_meshes(&[&path]).unwrap().len(), 1);
        let missing = std::env::temp_dir().join("deformview_read_meshes_missing.vtk");
        assert!(read_meshes(&[&path, &missing]).is_err());
        let _ = std::fs::remove_file(path);
    }
}
