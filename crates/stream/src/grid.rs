use glam::{DVec2, DVec3};
use tilestream_common::{GridCoord, TerrainConfig};

/// A world position decomposed into its tile and in-tile offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalCoordinate {
    pub coord: GridCoord,
    /// Fractional position inside the tile on X and Z, each in [0, 1).
    pub offset: DVec2,
    /// Nearest heightmap cell as `(row, col)`; rows follow Z, columns follow X.
    pub cell: (usize, usize),
}

/// Fixed-size square tiling of the XZ plane.
///
/// Tile coordinates are `floor(world / tile_size) + bias`, so the tile at the
/// world origin is `(bias, bias)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    tile_size: f64,
    bias: i64,
}

impl TileGrid {
    pub fn new(tile_size: f64, bias: i64) -> Self {
        assert!(tile_size > 0.0, "tile_size must be positive");
        Self { tile_size, bias }
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.tile_size, config.origin_bias)
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn bias(&self) -> i64 {
        self.bias
    }

    /// Convert a world position to the coordinate of the tile containing it.
    pub fn to_grid_coordinate(&self, pos: DVec3) -> GridCoord {
        GridCoord {
            x: (pos.x / self.tile_size).floor() as i64 + self.bias,
            z: (pos.z / self.tile_size).floor() as i64 + self.bias,
        }
    }

    /// World position of a tile's minimum-X, minimum-Z corner (at Y = 0).
    pub fn grid_to_world_corner(&self, coord: GridCoord) -> DVec3 {
        DVec3::new(
            (coord.x - self.bias) as f64 * self.tile_size,
            0.0,
            (coord.z - self.bias) as f64 * self.tile_size,
        )
    }

    pub fn grid_to_world_center(&self, coord: GridCoord) -> DVec3 {
        let half = self.tile_size * 0.5;
        self.grid_to_world_corner(coord) + DVec3::new(half, 0.0, half)
    }

    /// Split a world position into tile coordinate, fractional offset, and the
    /// nearest cell of a heightmap with `resolution` samples per edge.
    pub fn world_to_local(&self, pos: DVec3, resolution: usize) -> LocalCoordinate {
        let coord = self.to_grid_coordinate(pos);
        let corner = self.grid_to_world_corner(coord);
        let max_fraction = 1.0 - f64::EPSILON;
        let offset = DVec2::new(
            ((pos.x - corner.x) / self.tile_size).clamp(0.0, max_fraction),
            ((pos.z - corner.z) / self.tile_size).clamp(0.0, max_fraction),
        );

        let span = resolution.saturating_sub(1);
        let to_cell = |fraction: f64| ((fraction * span as f64).round() as usize).min(span);
        LocalCoordinate {
            coord,
            offset,
            cell: (to_cell(offset.y), to_cell(offset.x)),
        }
    }
}

/// Floor of the Euclidean distance between two tiles, in tiles.
///
/// Uses an exact integer square root over 128-bit intermediates, so the result
/// is symmetric and zero only for equal coordinates across the whole `i64` range.
pub fn grid_distance(a: GridCoord, b: GridCoord) -> u64 {
    let dx = (a.x as i128 - b.x as i128).unsigned_abs();
    let dz = (a.z as i128 - b.z as i128).unsigned_abs();
    let squared = dx.saturating_mul(dx).saturating_add(dz.saturating_mul(dz));
    squared.isqrt().min(u64::MAX as u128) as u64
}

/// All coordinates within `radius` of `center` (inclusive), scanning the
/// square bounding box and keeping those whose [`grid_distance`] qualifies.
pub fn coords_within(center: GridCoord, radius: u32) -> Vec<GridCoord> {
    let r = radius as i64;
    let mut result = Vec::new();
    for dx in -r..=r {
        for dz in -r..=r {
            let coord = center.offset(dx, dz);
            if grid_distance(coord, center) <= radius as u64 {
                result.push(coord);
            }
        }
    }
    result
}
