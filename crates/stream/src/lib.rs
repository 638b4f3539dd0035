//! Streaming: tile grid, tile lifecycle, generation workers, floating origin.
//!
//! [`TerrainStreamer::tick`] keeps every tile within `render_distance` of the
//! viewer loaded and everything farther away evicted, generating payloads on
//! a bounded set of workers and handing finished tiles to a [`TileRenderer`].
//!
//! # Invariants
//! - A coordinate is never pending and loaded at the same time.
//! - At most `max_render_threads` generation jobs run at once.
//! - A completion only loads the tile if it belongs to that tile's current job.
//! - The renderer sees `on_tile_loaded` exactly once per tile, before its eviction.
//! - After a tick the viewer's local position lies inside the origin tile.

mod error;
mod grid;
mod interface;
mod origin;
mod scheduler;
mod stats;
mod tile;
mod worker;

pub use error::StreamError;
pub use grid::{LocalCoordinate, TileGrid, coords_within, grid_distance};
pub use interface::{TileRenderer, TileView, Viewer};
pub use origin::{FloatingOrigin, OriginStamp};
pub use scheduler::{TerrainStreamer, prioritize};
pub use stats::{TickReport, TickTimer};
pub use tile::{JobId, TerrainTile, TileState};
pub use worker::{
    Completion, GenerationPool, InlineSpawner, Job, JobSpawner, ManualSpawner, ThreadSpawner,
};

pub fn crate_info() -> &'static str {
    "tilestream-stream v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("stream"));
    }
}
