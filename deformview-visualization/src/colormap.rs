//! Scalar-to-colour lookup tables

use deformview_core::DataArray;
use serde::{Deserialize, Serialize};

/// Number of entries in the default table
pub const DEFAULT_TABLE_SIZE: usize = 256;

/// A table of RGBA colours indexed by a scalar value
///
/// The default table sweeps hue from red (0.0) to blue (0.667) at full
/// saturation and value, so low values map to red and high values to blue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTable {
    colors: Vec<[f32; 4]>,
}

impl LookupTable {
    /// Build a table by sweeping hue linearly between two values
    pub fn from_hue_range(size: usize, hue_start: f32, hue_end: f32) -> Self {
        let size = size.max(2);
        let colors = (0..size)
            .map(|i| {
                let t = i as f32 / (size - 1) as f32;
                let [r, g, b] = hsv_to_rgb(hue_start + t * (hue_end - hue_start), 1.0, 1.0);
                [r, g, b, 1.0]
            })
            .collect();
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colour at a table index, clamped to the last entry
    pub fn entry(&self, index: usize) -> [f32; 4] {
        self.colors
            .get(index)
            .or_else(|| self.colors.last())
            .copied()
            .unwrap_or([0.0, 0.0, 0.0, 1.0])
    }

    /// Table index for `value` within `range`
    ///
    /// Values outside the range clamp to the end entries; a degenerate or
    /// non-finite range maps everything to entry 0.
    pub fn index_of(&self, value: f32, range: (f32, f32)) -> usize {
        let (min, max) = range;
        let span = max - min;
        if !span.is_finite() || span <= 0.0 || value.is_nan() {
            return 0;
        }
        let t = ((value - min) / span).clamp(0.0, 1.0);
        ((t * self.colors.len() as f32) as usize).min(self.colors.len().saturating_sub(1))
    }

    pub fn map_value(&self, value: f32, range: (f32, f32)) -> [f32; 4] {
        self.entry(self.index_of(value, range))
    }

    /// Colour every tuple of an array; vectors are coloured by magnitude
    pub fn map_array(&self, array: &DataArray, range: (f32, f32)) -> Vec<[f32; 4]> {
        (0..array.len())
            .map(|i| self.map_value(array.color_value(i), range))
            .collect()
    }
}

impl Default for LookupTable {
    fn default() -> Self {
        Self::from_hue_range(DEFAULT_TABLE_SIZE, 0.0, 0.667)
    }
}

/// Convert HSV (all components in [0, 1]) to RGB
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));
    match sector as u32 {
        0 => [value, t, p],
        1 => [q, value, p],
        2 => [p, value, t],
        3 => [p, q, value],
        4 => [t, p, value],
        _ => [value, p, q],
    }
}
