use glam::Vec3;
use tilestream_common::GridCoord;
use tilestream_terrain::{HeightMap, SplatMap, TilePayload};

/// Read-only view of a tile handed to the renderer when it loads.
#[derive(Debug, Clone, Copy)]
pub struct TileView<'a> {
    pub coord: GridCoord,
    pub name: &'a str,
    /// Tile corner in the local (origin-relative) frame.
    pub local_position: Vec3,
    /// Tile extent: `(tile_size, ceiling_height, tile_size)`.
    pub size: Vec3,
    /// Normalized water height.
    pub sea_level: f32,
    pub payload: &'a TilePayload,
}

impl TileView<'_> {
    pub fn heights(&self) -> &HeightMap {
        &self.payload.heights
    }

    pub fn splat(&self) -> &SplatMap {
        &self.payload.splat
    }
}

/// Host-side consumer of finished tiles.
///
/// Every method is called from the tick thread only. For a given tile,
/// `on_tile_loaded` happens exactly once and strictly before the matching
/// `on_tile_evicted`.
pub trait TileRenderer {
    /// Opaque token identifying the renderer's representation of one tile.
    type Handle;

    fn on_tile_loaded(&mut self, view: TileView<'_>) -> Self::Handle;

    fn on_tile_evicted(&mut self, handle: Self::Handle);

    /// The floating origin moved; place the tile's corner at `local_position`.
    fn on_tile_repositioned(&mut self, handle: &Self::Handle, local_position: Vec3);

    /// The tile's heightmap was edited in place.
    fn on_tile_modified(&mut self, _handle: &Self::Handle, _payload: &TilePayload) {}
}

/// The moving observer terrain is streamed around.
///
/// Positions are in the local (rendered) frame; the streamer converts them
/// to world space through the floating origin.
pub trait Viewer {
    fn position(&self) -> Vec3;

    /// Move the viewer to `local` after the origin shifted. The world
    /// position is unchanged.
    fn recenter(&mut self, local: Vec3);
}

impl Viewer for Vec3 {
    fn position(&self) -> Vec3 {
        *self
    }

    fn recenter(&mut self, local: Vec3) {
        *self = local;
    }
}
