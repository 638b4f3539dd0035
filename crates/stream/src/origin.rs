use glam::{DVec3, Vec3};
use tilestream_common::GridCoord;

use crate::grid::TileGrid;

/// Published origin value: which tile anchors the local frame, and how many
/// times it has moved. Collaborators poll this instead of subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginStamp {
    pub coord: GridCoord,
    pub epoch: u64,
}

/// Floating origin for the rendered frame.
///
/// Local positions are `f32` offsets from the world-space corner of the origin
/// tile. Keeping the origin on the viewer's tile bounds local magnitudes to
/// roughly one tile regardless of distance travelled.
#[derive(Debug, Clone)]
pub struct FloatingOrigin {
    grid: TileGrid,
    coord: GridCoord,
    epoch: u64,
}

impl FloatingOrigin {
    pub fn new(grid: TileGrid, coord: GridCoord) -> Self {
        Self {
            grid,
            coord,
            epoch: 0,
        }
    }

    /// Origin anchored on the tile containing world zero, so local == world.
    pub fn at_world_zero(grid: TileGrid) -> Self {
        let coord = grid.to_grid_coordinate(DVec3::ZERO);
        Self::new(grid, coord)
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stamp(&self) -> OriginStamp {
        OriginStamp {
            coord: self.coord,
            epoch: self.epoch,
        }
    }

    /// Whether the origin moved after `epoch` was observed.
    pub fn changed_since(&self, epoch: u64) -> bool {
        self.epoch > epoch
    }

    /// World-space position of local zero.
    pub fn world_offset(&self) -> DVec3 {
        self.grid.grid_to_world_corner(self.coord)
    }

    pub fn to_local(&self, world: DVec3) -> Vec3 {
        (world - self.world_offset()).as_vec3()
    }

    pub fn to_world(&self, local: Vec3) -> DVec3 {
        self.world_offset() + local.as_dvec3()
    }

    /// Local position of a tile's corner.
    pub fn tile_position(&self, coord: GridCoord) -> Vec3 {
        let size = self.grid.tile_size();
        DVec3::new(
            (coord.x - self.coord.x) as f64 * size,
            0.0,
            (coord.z - self.coord.z) as f64 * size,
        )
        .as_vec3()
    }

    /// Move the origin to `coord`. Returns `false` (and keeps the epoch) when
    /// it is already there.
    pub fn shift_to(&mut self, coord: GridCoord) -> bool {
        if coord == self.coord {
            return false;
        }
        self.coord = coord;
        self.epoch += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TileGrid {
        TileGrid::new(100.0, 250)
    }

    #[test]
    fn world_zero_origin_is_identity() {
        let origin = FloatingOrigin::at_world_zero(grid());
        assert_eq!(origin.coord(), GridCoord::new(250, 250));
        let p = DVec3::new(12.5, 3.0, -40.0);
        assert_eq!(origin.to_local(p), Vec3::new(12.5, 3.0, -40.0));
    }

    #[test]
    fn local_world_roundtrip_after_shift() {
        let mut origin = FloatingOrigin::at_world_zero(grid());
        assert!(origin.shift_to(GridCoord::new(260, 245)));
        let world = DVec3::new(1_030.0, 7.0, -480.0);
        let local = origin.to_local(world);
        assert_eq!(local, Vec3::new(30.0, 7.0, 20.0));
        assert_eq!(origin.to_world(local), world);
    }

    #[test]
    fn shift_bumps_epoch_only_on_change() {
        let mut origin = FloatingOrigin::at_world_zero(grid());
        let seen = origin.epoch();
        assert!(!origin.shift_to(GridCoord::new(250, 250)));
        assert!(!origin.changed_since(seen));
        assert!(origin.shift_to(GridCoord::new(251, 250)));
        assert!(origin.changed_since(seen));
        assert_eq!(origin.stamp().epoch, seen + 1);
    }

    #[test]
    fn tile_position_is_relative_to_origin() {
        let mut origin = FloatingOrigin::at_world_zero(grid());
        origin.shift_to(GridCoord::new(11, 10));
        assert_eq!(
            origin.tile_position(GridCoord::new(9, 10)),
            Vec3::new(-200.0, 0.0, 0.0)
        );
        assert_eq!(origin.tile_position(GridCoord::new(11, 10)), Vec3::ZERO);
    }

    #[test]
    fn far_travel_keeps_local_precision() {
        let g = grid();
        let mut origin = FloatingOrigin::at_world_zero(g);
        let world = DVec3::new(123_456_789.25, 0.0, -98_765_432.75);
        origin.shift_to(g.to_grid_coordinate(world));
        let local = origin.to_local(world);
        assert!(local.x >= 0.0 && local.x < 100.0);
        assert!(local.z >= 0.0 && local.z < 100.0);
        assert!((local.x - 89.25).abs() < 1e-4);
        assert!((local.z - 67.25).abs() < 1e-4);
    }
}
