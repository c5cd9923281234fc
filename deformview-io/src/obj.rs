//! OBJ format support
//!
//! Only geometry is carried: positions and polygon faces. Per-vertex normals
//! referenced by the faces are stored as the `Normals` point array.

use crate::{MeshReader, MeshWriter};
use deformview_core::{DataArray, Error, PolyData, Point3f, Result, Vector3f};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct ObjReader;
pub struct ObjWriter;

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<PolyData> {
        let path = path.as_ref();
        let loaded = obj::Obj::load(path)
            .map_err(|e| Error::InvalidData(format!("{}: {}", path.display(), e)))?;
        let data = loaded.data;

        let mut mesh = PolyData::new();
        mesh.points = data
            .position
            .iter()
            .map(|p| Point3f::new(p[0], p[1], p[2]))
            .collect();

        let mut normals: Vec<Option<Vector3f>> = vec![None; mesh.points.len()];
        for object in &data.objects {
            for group in &object.groups {
                for poly in &group.polys {
                    let indices: Vec<usize> = poly.0.iter().map(|t| t.0).collect();
                    for tuple in &poly.0 {
                        if let Some(n) = tuple.2.and_then(|ni| data.normal.get(ni)) {
                            if let Some(slot) = normals.get_mut(tuple.0) {
                                *slot = Some(Vector3f::new(n[0], n[1], n[2]));
                            }
                        }
                    }
                    mesh.add_polygon(&indices);
                }
            }
        }

        if !normals.is_empty() && normals.iter().all(|n| n.is_some()) {
            let normals: Vec<Vector3f> = normals.into_iter().flatten().collect();
            mesh.point_data.add_array(DataArray::vectors("Normals", &normals));
            mesh.point_data.set_active_normals("Normals");
        }

        mesh.validate()?;
        Ok(mesh)
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &PolyData, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let normals = mesh.point_data.normals();

        writeln!(writer, "# deformview")?;
        for p in &mesh.points {
            writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
        }
        if let Some(normals) = normals {
            for n in normals.iter_vectors() {
                writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
            }
        }
        for face in &mesh.polys {
            // OBJ indices are 1-based
            let [a, b, c] = face.map(|i| i + 1);
            if normals.is_some() {
                writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}")?;
            } else {
                writeln!(writer, "f {a} {b} {c}")?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
