//! Arrow glyphs for vector fields

use deformview_core::{DataArray, Error, PolyData, Point3f, Result, Vector3f};
use nalgebra::{Unit, UnitQuaternion};
use rayon::prelude::*;
use std::f32::consts::PI;

/// Shape of the arrow glyph, in the unit-length arrow's own frame (+X)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowShape {
    pub tip_length: f32,
    pub tip_radius: f32,
    pub shaft_radius: f32,
    pub resolution: usize,
}

impl Default for ArrowShape {
    fn default() -> Self {
        Self {
            tip_length: 0.35,
            tip_radius: 0.1,
            shaft_radius: 0.03,
            resolution: 6,
        }
    }
}

/// Build a unit arrow from the origin to (1, 0, 0)
pub fn arrow_source(shape: &ArrowShape) -> PolyData {
    let res = shape.resolution.max(3);
    let shaft_end = 1.0 - shape.tip_length;
    let ring = |x: f32, r: f32| -> Vec<Point3f> {
        (0..res)
            .map(|i| {
                let a = 2.0 * PI * i as f32 / res as f32;
                Point3f::new(x, r * a.cos(), r * a.sin())
            })
            .collect()
    };

    let mut mesh = PolyData::new();
    let shaft_back = ring(0.0, shape.shaft_radius);
    let shaft_front = ring(shaft_end, shape.shaft_radius);
    let cone_base = ring(shaft_end, shape.tip_radius);

    let back_start = mesh.points.len();
    mesh.points.extend(shaft_back);
    let front_start = mesh.points.len();
    mesh.points.extend(shaft_front);
    let base_start = mesh.points.len();
    mesh.points.extend(cone_base);
    let back_center = mesh.add_point(Point3f::new(0.0, 0.0, 0.0));
    let base_center = mesh.add_point(Point3f::new(shaft_end, 0.0, 0.0));
    let tip = mesh.add_point(Point3f::new(1.0, 0.0, 0.0));

    for i in 0..res {
        let j = (i + 1) % res;
        // shaft wall
        mesh.add_polygon(&[back_start + i, back_start + j, front_start + j, front_start + i]);
        // back cap faces -X
        mesh.polys.push([back_center, back_start + j, back_start + i]);
        // cone base faces -X
        mesh.polys.push([base_center, base_start + j, base_start + i]);
        // cone wall
        mesh.polys.push([base_start + i, base_start + j, tip]);
    }

    mesh
}

/// Place an arrow at every point, oriented along and scaled by its vector
///
/// The arrow length is `|v| * scale_factor`. Points with a zero vector get no
/// glyph. Each glyph vertex inherits the point arrays of the point it was
/// placed on, so the glyphs can be coloured by the same fields as the surface.
///
/// # Arguments
/// * `mesh` - Input mesh carrying a vector field
/// * `shape` - Arrow proportions
/// * `scale_factor` - Multiplier applied to the vector magnitude
pub fn glyph_arrows(mesh: &PolyData, shape: &ArrowShape, scale_factor: f32) -> Result<PolyData> {
    let vectors = mesh.point_data.vectors().ok_or(Error::MissingVectors("glyphing"))?;
    if vectors.len() != mesh.points.len() {
        return Err(Error::InvalidData(format!(
            "vector array '{}' has {} tuples for {} points",
            vectors.name,
            vectors.len(),
            mesh.points.len()
        )));
    }

    let arrow = arrow_source(shape);

    // (source point index, placed glyph points)
    let placed: Vec<(usize, Vec<Point3f>)> = mesh
        .points
        .par_iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let v = vectors.vector(i)?;
            let length = v.norm() * scale_factor;
            if length <= f32::EPSILON {
                return None;
            }
            let rotation = orient_x_to(&v);
            let points = arrow
                .points
                .iter()
                .map(|a| p + rotation * (a.coords * length))
                .collect();
            Some((i, points))
        })
        .collect();

    let mut glyphs = PolyData::new();
    let mut sources = Vec::with_capacity(placed.len() * arrow.points.len());
    for (source, points) in placed {
        let offset = glyphs.points.len();
        glyphs.points.extend(points);
        glyphs.polys.extend(
            arrow
                .polys
                .iter()
                .map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]),
        );
        sources.extend(std::iter::repeat(source).take(arrow.points.len()));
    }

    for array in mesh.point_data.arrays() {
        let values = sources
            .iter()
            .flat_map(|&s| array.tuple(s).iter().copied())
            .collect();
        glyphs.point_data.add_array(DataArray::new(array.name.clone(), array.components, values)?);
    }
    if let Some(scalars) = mesh.point_data.scalars() {
        glyphs.point_data.set_active_scalars(&scalars.name);
    }

    Ok(glyphs)
}

fn orient_x_to(direction: &Vector3f) -> UnitQuaternion<f32> {
    UnitQuaternion::rotation_between(&Vector3f::x(), direction).unwrap_or_else(|| {
        // Antiparallel to +X
        UnitQuaternion::from_axis_angle(&Unit::new_unchecked(Vector3f::z()), PI)
    })
}
