use tilestream_common::GridCoord;

use crate::tile::TileState;

/// Errors surfaced by the streaming engine. None of them abort a tick.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("tile {name}: invalid transition {from} -> {to}")]
    InvalidTransition {
        name: String,
        from: TileState,
        to: TileState,
    },
    #[error("failed to dispatch generation job for {coord}: {source}")]
    Dispatch {
        coord: GridCoord,
        #[source]
        source: std::io::Error,
    },
    #[error("no loaded tile at {0}")]
    NotLoaded(GridCoord),
}
