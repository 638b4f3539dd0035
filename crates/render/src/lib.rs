//! Rendering adapter: a headless [`TileRenderer`](tilestream_stream::TileRenderer).
//!
//! # Invariants
//! - The renderer never mutates streamed payloads; it keeps summaries only.
//! - One instance per loaded tile, keyed by an opaque handle.
//!
//! # Workaround
//! Stands in for a GPU terrain backend. It records what a real backend would
//! draw and where, which is enough for the CLI and for tests. A GPU
//! implementation plugs into the same trait without changing the streamer.

mod debug;

pub use debug::{DebugTileRenderer, RenderCounters, RenderHandle, TileInstance};

pub fn crate_info() -> &'static str {
    "tilestream-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
