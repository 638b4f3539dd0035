//! Developer tooling: streamer inspector, tile digests, state maps.
//!
//! # Invariants
//! - Tools only read streamer state; nothing here mutates tiles.
//! - Digests depend on payload bytes alone, so equal payloads hash equal.

mod digest;
mod inspector;

pub use digest::tile_digest;
pub use inspector::{StreamInspector, StreamSummary, TileInfo};

pub fn crate_info() -> &'static str {
    "tilestream-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
