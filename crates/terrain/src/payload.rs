use std::time::Instant;

use tilestream_common::{GridCoord, TerrainConfig};
use tilestream_field::NoiseField;

use crate::heightmap::{HeightMap, SteepnessMap, cell_steepness, sample_heightmap, steepness_map};
use crate::splat::{SplatMap, splat_map};

/// Resolution and sampling settings for payload synthesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthSettings {
    pub height_map_resolution: usize,
    pub alpha_map_resolution: usize,
    pub noise_scale: f64,
    pub noise_phase: f64,
}

impl From<&TerrainConfig> for SynthSettings {
    fn from(config: &TerrainConfig) -> Self {
        Self {
            height_map_resolution: config.height_map_resolution,
            alpha_map_resolution: config.alpha_map_resolution,
            noise_scale: config.noise_scale,
            noise_phase: config.noise_phase,
        }
    }
}

/// Generated data for one tile: elevation, steepness, and splat weights.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePayload {
    pub coord: GridCoord,
    pub heights: HeightMap,
    pub steepness: SteepnessMap,
    pub splat: SplatMap,
}

impl TilePayload {
    pub fn height_at(&self, row: usize, col: usize) -> f32 {
        self.heights.get(row, col)
    }

    pub fn steepness_at(&self, row: usize, col: usize) -> f32 {
        self.steepness.get(row, col)
    }

    /// Raise or lower one heightmap cell, clamped to [0, 1].
    ///
    /// Steepness is refreshed for the edited cell and its neighbours; splat
    /// weights keep their generated values. Returns `false` if the cell is
    /// outside the map.
    pub fn adjust_height(&mut self, row: usize, col: usize, delta: f32) -> bool {
        let resolution = self.heights.resolution();
        if row >= resolution || col >= resolution {
            return false;
        }
        let height = (self.heights.get(row, col) + delta).clamp(0.0, 1.0);
        self.heights.set(row, col, height);

        let last = resolution - 1;
        for r in row.saturating_sub(1)..=(row + 1).min(last) {
            for c in col.saturating_sub(1)..=(col + 1).min(last) {
                self.steepness.set(r, c, cell_steepness(&self.heights, r, c));
            }
        }
        true
    }
}

/// Generate the complete payload for a tile.
///
/// Pure with respect to its inputs: the same field, coordinate, and settings
/// always produce the same payload.
pub fn synthesize(field: &NoiseField, coord: GridCoord, settings: &SynthSettings) -> TilePayload {
    let start = Instant::now();
    let heights = sample_heightmap(field, coord, settings);
    let steepness = steepness_map(&heights);
    let splat = splat_map(&heights, &steepness, settings.alpha_map_resolution);
    tracing::trace!(%coord, elapsed = ?start.elapsed(), "tile payload synthesized");
    TilePayload {
        coord,
        heights,
        steepness,
        splat,
    }
}
