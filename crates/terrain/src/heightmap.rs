use tilestream_common::GridCoord;
use tilestream_field::NoiseField;

use crate::payload::SynthSettings;

/// Square row-major grid of `f32` samples. Rows run along Z, columns along X.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarMap {
    resolution: usize,
    data: Vec<f32>,
}

/// Normalized elevation samples in [0, 1].
pub type HeightMap = ScalarMap;
/// Per-cell local maximum elevation difference.
pub type SteepnessMap = ScalarMap;

impl ScalarMap {
    /// A zero-filled map with `resolution` samples per edge.
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution,
            data: vec![0.0; resolution * resolution],
        }
    }

    pub fn from_fn(resolution: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(resolution * resolution);
        for row in 0..resolution {
            for col in 0..resolution {
                data.push(f(row, col));
            }
        }
        Self { resolution, data }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.resolution + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.resolution + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.resolution;
        &self.data[start..start + self.resolution]
    }

    pub fn column(&self, col: usize) -> Vec<f32> {
        (0..self.resolution).map(|row| self.get(row, col)).collect()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }
}

/// Sample the noise field into a heightmap for one tile.
///
/// Row samples are offset by the tile's Z coordinate and column samples by
/// its X coordinate, each scaled by `resolution - 1`, so the last row/column
/// of a tile lands on exactly the same noise position as the first row/column
/// of its neighbour.
pub fn sample_heightmap(
    field: &NoiseField,
    coord: GridCoord,
    settings: &SynthSettings,
) -> HeightMap {
    let resolution = settings.height_map_resolution;
    let span = (resolution - 1) as f64;
    let row_base = span * coord.z as f64;
    let col_base = span * coord.x as f64;

    ScalarMap::from_fn(resolution, |row, col| {
        let u = (row as f64 + row_base) / settings.noise_scale;
        let v = (col as f64 + col_base) / settings.noise_scale;
        field.sample(u, v, settings.noise_phase) as f32
    })
}

/// Steepness of one cell: the largest absolute height difference to any cell
/// of its 3x3 neighbourhood, clipped at the map edges.
pub(crate) fn cell_steepness(heights: &HeightMap, row: usize, col: usize) -> f32 {
    let last = heights.resolution() - 1;
    let center = heights.get(row, col);
    let mut steepest = 0.0f32;
    for r in row.saturating_sub(1)..=(row + 1).min(last) {
        for c in col.saturating_sub(1)..=(col + 1).min(last) {
            steepest = steepest.max((center - heights.get(r, c)).abs());
        }
    }
    steepest
}

pub fn steepness_map(heights: &HeightMap) -> SteepnessMap {
    ScalarMap::from_fn(heights.resolution(), |row, col| {
        cell_steepness(heights, row, col)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(resolution: usize) -> SynthSettings {
        SynthSettings {
            height_map_resolution: resolution,
            alpha_map_resolution: resolution,
            noise_scale: 40.0,
            noise_phase: 0.0,
        }
    }

    #[test]
    fn heights_are_normalized() {
        let field = NoiseField::with_seed(11);
        let map = sample_heightmap(&field, GridCoord::new(250, 250), &settings(33));
        assert_eq!(map.resolution(), 33);
        assert!(map.min() >= 0.0);
        assert!(map.max() <= 1.0);
    }

    #[test]
    fn horizontal_neighbours_share_edge_column() {
        let field = NoiseField::with_seed(4);
        let s = settings(17);
        let left = sample_heightmap(&field, GridCoord::new(250, 250), &s);
        let right = sample_heightmap(&field, GridCoord::new(251, 250), &s);
        assert_eq!(left.column(16), right.column(0));
    }

    #[test]
    fn vertical_neighbours_share_edge_row() {
        let field = NoiseField::with_seed(4);
        let s = settings(17);
        let near = sample_heightmap(&field, GridCoord::new(250, 250), &s);
        let far = sample_heightmap(&field, GridCoord::new(250, 251), &s);
        assert_eq!(near.row(16), far.row(0));
    }

    #[test]
    fn steepness_of_flat_map_is_zero() {
        let flat = ScalarMap::from_fn(5, |_, _| 0.4);
        let steep = steepness_map(&flat);
        assert!(steep.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn steepness_takes_max_over_neighbourhood() {
        let mut map = ScalarMap::new(5);
        map.set(2, 2, 0.5);
        map.set(3, 3, 0.2);
        let steep = steepness_map(&map);
        assert_eq!(steep.get(2, 2), 0.5);
        // (3,3) neighbours the peak: |0.2 - 0.5|
        assert!((steep.get(3, 3) - 0.3).abs() < 1e-6);
        // (1,1) neighbours the peak diagonally
        assert_eq!(steep.get(1, 1), 0.5);
        // (0,0) is two cells away from anything raised
        assert_eq!(steep.get(0, 0), 0.0);
    }

    #[test]
    fn steepness_clamps_at_edges_without_wrapping() {
        let mut map = ScalarMap::new(4);
        map.set(0, 3, 1.0);
        let steep = steepness_map(&map);
        // Corner (0,0) would see (0,3) only if indexing wrapped around.
        assert_eq!(steep.get(0, 0), 0.0);
        assert_eq!(steep.get(0, 3), 1.0);
        assert_eq!(steep.get(1, 2), 1.0);
    }

    #[test]
    fn row_and_column_accessors() {
        let map = ScalarMap::from_fn(3, |r, c| (r * 10 + c) as f32);
        assert_eq!(map.row(1), &[10.0, 11.0, 12.0]);
        assert_eq!(map.column(2), vec![2.0, 12.0, 22.0]);
        assert!((map.mean() - 11.0).abs() < 1e-6);
    }
}
