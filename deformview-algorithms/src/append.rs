//! Appending several meshes into one

use deformview_core::{DataArray, PolyData, Result};
use tracing::debug;

/// Name of the array that records which input a point came from
pub const LABEL_ARRAY: &str = "label_color";

/// Append meshes into a single mesh
///
/// Inputs that do not already carry a `label_color` array get one filled with
/// their position in the list, and it becomes their active scalars, so the
/// combined mesh can be coloured by input. Point arrays present (with the same
/// width) on every input are concatenated; any other array is dropped.
pub fn append_polydata(inputs: &[PolyData]) -> Result<PolyData> {
    let labelled: Vec<PolyData> = inputs
        .iter()
        .enumerate()
        .map(|(i, mesh)| {
            let mut mesh = mesh.clone();
            if mesh.point_data.get(LABEL_ARRAY).is_none() {
                let labels = vec![i as f32; mesh.point_count()];
                mesh.point_data.add_array(DataArray::scalars(LABEL_ARRAY, labels));
                mesh.point_data.set_active_scalars(LABEL_ARRAY);
            }
            mesh
        })
        .collect();

    let mut output = PolyData::new();
    let Some(first) = labelled.first() else {
        return Ok(output);
    };

    for mesh in &labelled {
        let offset = output.points.len();
        output.points.extend_from_slice(&mesh.points);
        output.polys.extend(
            mesh.polys
                .iter()
                .map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]),
        );
    }

    for array in first.point_data.arrays() {
        let shared = labelled.iter().all(|m| {
            m.point_data
                .get(&array.name)
                .is_some_and(|a| a.components == array.components)
        });
        if !shared {
            debug!("append: dropping array '{}' missing from some inputs", array.name);
            continue;
        }
        let values = labelled
            .iter()
            .filter_map(|m| m.point_data.get(&array.name))
            .flat_map(|a| a.values.iter().copied())
            .collect();
        output
            .point_data
            .add_array(DataArray::new(array.name.clone(), array.components, values)?);
    }

    if let Some(active) = first.point_data.scalars() {
        output.point_data.set_active_scalars(&active.name);
    }
    if let Some(vectors) = first.point_data.vectors() {
        output.point_data.set_active_vectors(&vectors.name);
    }
    if let Some(normals) = first.point_data.normals() {
        output.point_data.set_active_normals(&normals.name);
    }

    Ok(output)
}
