//! Shared types for the tilestream engine: grid coordinates and startup configuration.
//!
//! # Invariants
//! - Configuration is fixed once streaming starts; no runtime reconfiguration.
//! - A `GridCoord` maps to exactly one tile name.

pub mod config;
pub mod types;

pub use config::{ConfigError, TerrainConfig};
pub use types::GridCoord;
