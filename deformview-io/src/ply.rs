//! PLY format support
//!
//! Vertex properties other than the coordinates become point arrays: `nx/ny/nz`
//! form the `Normals` array, every other scalar property its own array.

use crate::{MeshReader, MeshWriter};
use deformview_core::{DataArray, Error, PolyData, Point3f, Result, Vector3f};
use ply_rs::{
    parser::Parser,
    ply::{Addable, DefaultElement, ElementDef, Ply, Property, PropertyDef, PropertyType, ScalarType},
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub struct PlyReader;
pub struct PlyWriter;

const COORDINATES: [&str; 3] = ["x", "y", "z"];
const NORMALS: [&str; 3] = ["nx", "ny", "nz"];

impl MeshReader for PlyReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<PolyData> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        let mut mesh = PolyData::new();
        let empty = Vec::new();
        let vertices = ply.payload.get("vertex").unwrap_or(&empty);
        for vertex in vertices {
            let x = extract_property_value(vertex, "x")?;
            let y = extract_property_value(vertex, "y")?;
            let z = extract_property_value(vertex, "z")?;
            mesh.points.push(Point3f::new(x, y, z));
        }

        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                mesh.add_polygon(&indices);
            }
        }

        // Extra vertex properties, in header order
        let property_names: Vec<String> = ply
            .header
            .elements
            .get("vertex")
            .map(|e| e.properties.keys().cloned().collect())
            .unwrap_or_default();

        let has_normals = NORMALS.iter().all(|n| property_names.iter().any(|p| p == n));
        if has_normals && !vertices.is_empty() {
            let normals = vertices
                .iter()
                .map(|v| {
                    Ok(Vector3f::new(
                        extract_property_value(v, "nx")?,
                        extract_property_value(v, "ny")?,
                        extract_property_value(v, "nz")?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            mesh.point_data.add_array(DataArray::vectors("Normals", &normals));
            mesh.point_data.set_active_normals("Normals");
        }

        for name in property_names
            .iter()
            .filter(|p| !COORDINATES.contains(&p.as_str()) && !NORMALS.contains(&p.as_str()))
        {
            let values: Option<Vec<f32>> = vertices
                .iter()
                .map(|v| extract_property_value(v, name).ok())
                .collect();
            // list properties have no scalar value
            if let Some(values) = values {
                mesh.point_data.add_array(DataArray::scalars(name.clone(), values));
            }
        }

        mesh.validate()?;
        Ok(mesh)
    }
}

impl MeshWriter for PlyWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &PolyData, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let mut ply = Ply::<DefaultElement>::new();

        let scalar_arrays: Vec<&DataArray> = mesh
            .point_data
            .arrays()
            .iter()
            .filter(|a| a.components == 1)
            .collect();
        let normals = mesh.point_data.normals();

        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = mesh.points.len();
        let mut float_properties: Vec<&str> = COORDINATES.to_vec();
        if normals.is_some() {
            float_properties.extend(NORMALS);
        }
        float_properties.extend(scalar_arrays.iter().map(|a| a.name.as_str()));
        for name in &float_properties {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::Float),
            ));
        }
        ply.header.elements.add(vertex_element);

        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = mesh.polys.len();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_element);

        let mut vertices = Vec::with_capacity(mesh.points.len());
        for (i, p) in mesh.points.iter().enumerate() {
            let mut vertex = DefaultElement::new();
            vertex.insert("x".to_string(), Property::Float(p.x));
            vertex.insert("y".to_string(), Property::Float(p.y));
            vertex.insert("z".to_string(), Property::Float(p.z));
            if let Some(n) = normals.and_then(|n| n.vector(i)) {
                vertex.insert("nx".to_string(), Property::Float(n.x));
                vertex.insert("ny".to_string(), Property::Float(n.y));
                vertex.insert("nz".to_string(), Property::Float(n.z));
            }
            for array in &scalar_arrays {
                vertex.insert(array.name.clone(), Property::Float(array.values[i]));
            }
            vertices.push(vertex);
        }
        ply.payload.insert("vertex".to_string(), vertices);

        let faces = mesh
            .polys
            .iter()
            .map(|face| {
                let mut element = DefaultElement::new();
                element.insert(
                    "vertex_indices".to_string(),
                    Property::ListInt(face.iter().map(|&i| i as i32).collect()),
                );
                element
            })
            .collect();
        ply.payload.insert("face".to_string(), faces);

        let writer_instance = Writer::new();
        writer_instance.write_ply(&mut writer, &mut ply)?;

        Ok(())
    }
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        Some(Property::Char(val)) => Ok(*val as f32),
        Some(Property::UChar(val)) => Ok(*val as f32),
        _ => Err(Error::InvalidData(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUShort(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUChar(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        _ => Err(Error::InvalidData("Face indices not found".to_string())),
    }
}
