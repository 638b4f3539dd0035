//! Terrain payload synthesis: the work a generation job performs for one tile.
//!
//! # Invariants
//! - Heightmap values lie in [0, 1].
//! - Adjacent tiles share identical edge samples.
//! - Every splat texel's layer weights sum to 1.
//! - A payload is complete when returned; nothing partial is ever observable.

mod heightmap;
mod payload;
mod splat;

pub use heightmap::{HeightMap, ScalarMap, SteepnessMap, sample_heightmap, steepness_map};
pub use payload::{SynthSettings, TilePayload, synthesize};
pub use splat::{
    CLIFF_THRESHOLD, DEFAULT_LAYER, Layer, SplatMap, nearest_cell, normalize_weights,
    raw_weights, splat_map,
};
