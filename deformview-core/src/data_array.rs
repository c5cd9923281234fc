//! Named per-point data arrays
//!
//! A mesh carries any number of point arrays. Single-component arrays are
//! scalar fields, three-component arrays are vector fields; other widths are
//! kept but only ever used for colouring.

use crate::{Error, Result, Vector3f};
use serde::{Deserialize, Serialize};

/// A named array with `components` values per tuple, stored flat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataArray {
    pub name: String,
    pub components: usize,
    pub values: Vec<f32>,
}

impl DataArray {
    /// Create an array from flat values
    pub fn new(name: impl Into<String>, components: usize, values: Vec<f32>) -> Result<Self> {
        let name = name.into();
        if components == 0 {
            return Err(Error::InvalidData(format!(
                "array '{}' must have at least one component",
                name
            )));
        }
        if values.len() % components != 0 {
            return Err(Error::InvalidData(format!(
                "array '{}' has {} values, not a multiple of {} components",
                name,
                values.len(),
                components
            )));
        }
        Ok(Self { name, components, values })
    }

    /// Create a single-component array
    pub fn scalars(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            components: 1,
            values,
        }
    }

    /// Create a three-component array from vectors
    pub fn vectors(name: impl Into<String>, vectors: &[Vector3f]) -> Self {
        Self {
            name: name.into(),
            components: 3,
            values: vectors.iter().flat_map(|v| [v.x, v.y, v.z]).collect(),
        }
    }

    /// Number of tuples
    pub fn len(&self) -> usize {
        self.values.len() / self.components
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_vector(&self) -> bool {
        self.components == 3
    }

    /// Values of the i-th tuple
    pub fn tuple(&self, i: usize) -> &[f32] {
        &self.values[i * self.components..(i + 1) * self.components]
    }

    /// The i-th tuple as a vector; `None` unless the array has three components
    pub fn vector(&self, i: usize) -> Option<Vector3f> {
        if !self.is_vector() || i >= self.len() {
            return None;
        }
        let t = self.tuple(i);
        Some(Vector3f::new(t[0], t[1], t[2]))
    }

    /// Iterate over tuples as vectors (empty for non-vector arrays)
    pub fn iter_vectors(&self) -> impl Iterator<Item = Vector3f> + '_ {
        let n = if self.is_vector() { self.len() } else { 0 };
        self.values[..n * 3]
            .chunks_exact(3)
            .map(|c| Vector3f::new(c[0], c[1], c[2]))
    }

    /// The value used for colour mapping: the value itself for scalars,
    /// the tuple magnitude otherwise
    pub fn color_value(&self, i: usize) -> f32 {
        let t = self.tuple(i);
        if t.len() == 1 {
            t[0]
        } else {
            t.iter().map(|v| v * v).sum::<f32>().sqrt()
        }
    }

    /// Range of the colour-mapped value, `None` for an empty array
    pub fn range(&self) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for i in 0..self.len() {
            let v = self.color_value(i);
            if v.is_nan() {
                continue;
            }
            min = min.min(v);
            max = max.max(v);
        }
        if min > max {
            return None;
        }
        Some((min, max))
    }
}

/// The collection of point arrays attached to a mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointData {
    arrays: Vec<DataArray>,
    active_scalars: Option<usize>,
    active_vectors: Option<usize>,
    active_normals: Option<usize>,
}

impl PointData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an array, replacing any array with the same name. Returns its index.
    pub fn add_array(&mut self, array: DataArray) -> usize {
        if let Some(index) = self.index_of(&array.name) {
            self.arrays[index] = array;
            index
        } else {
            self.arrays.push(array);
            self.arrays.len() - 1
        }
    }

    /// Remove an array by name, fixing up the active indices
    pub fn remove_array(&mut self, name: &str) -> Option<DataArray> {
        let index = self.index_of(name)?;
        let removed = self.arrays.remove(index);
        let fix = |active: &mut Option<usize>| match *active {
            Some(i) if i == index => *active = None,
            Some(i) if i > index => *active = Some(i - 1),
            _ => {}
        };
        fix(&mut self.active_scalars);
        fix(&mut self.active_vectors);
        fix(&mut self.active_normals);
        Some(removed)
    }

    pub fn arrays(&self) -> &[DataArray] {
        &self.arrays
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn array_names(&self) -> Vec<String> {
        self.arrays.iter().map(|a| a.name.clone()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.arrays.iter().position(|a| a.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataArray> {
        self.arrays.iter_mut().find(|a| a.name == name)
    }

    pub fn by_index(&self, index: usize) -> Option<&DataArray> {
        self.arrays.get(index)
    }

    /// Mark an array as the active scalars; returns false if it does not exist
    pub fn set_active_scalars(&mut self, name: &str) -> bool {
        match self.index_of(name) {
            Some(i) => {
                self.active_scalars = Some(i);
                true
            }
            None => false,
        }
    }

    pub fn clear_active_scalars(&mut self) {
        self.active_scalars = None;
    }

    /// Mark a three-component array as the active vectors
    pub fn set_active_vectors(&mut self, name: &str) -> bool {
        match self.index_of(name) {
            Some(i) if self.arrays[i].is_vector() => {
                self.active_vectors = Some(i);
                true
            }
            _ => false,
        }
    }

    /// Mark a three-component array as the surface normals
    pub fn set_active_normals(&mut self, name: &str) -> bool {
        match self.index_of(name) {
            Some(i) if self.arrays[i].is_vector() => {
                self.active_normals = Some(i);
                true
            }
            _ => false,
        }
    }

    /// Whether vectors were explicitly marked, as opposed to found by fallback
    pub fn has_active_vectors(&self) -> bool {
        self.active_vectors.is_some()
    }

    pub fn scalars(&self) -> Option<&DataArray> {
        self.active_scalars.and_then(|i| self.arrays.get(i))
    }

    pub fn normals(&self) -> Option<&DataArray> {
        self.active_normals.and_then(|i| self.arrays.get(i))
    }

    /// The active vectors, or the first three-component array that is not
    /// the normals if none is marked
    pub fn vectors(&self) -> Option<&DataArray> {
        match self.active_vectors {
            Some(i) => self.arrays.get(i),
            None => self
                .arrays
                .iter()
                .enumerate()
                .find(|(i, a)| a.is_vector() && Some(*i) != self.active_normals)
                .map(|(_, a)| a),
        }
    }
}
