use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or validating a [`TerrainConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Startup configuration for terrain streaming and generation.
///
/// All values are read once when the streamer is built. Missing fields in a
/// YAML file fall back to [`TerrainConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Maximum grid distance (in tiles) from the viewer at which tiles stay loaded.
    pub render_distance: u32,
    /// Edge length of one tile in world units.
    pub tile_size: f64,
    /// World-space height corresponding to a heightmap value of 1.0.
    pub ceiling_height: f64,
    /// Heightmap samples per tile edge.
    pub height_map_resolution: usize,
    /// Splat texels per tile edge.
    pub alpha_map_resolution: usize,
    /// Divisor applied to heightmap sample positions before querying the noise field.
    pub noise_scale: f64,
    /// Third noise coordinate; shifts the whole terrain to a different slice of the field.
    pub noise_phase: f64,
    pub seed: u32,
    /// Upper bound on concurrently running generation jobs.
    pub max_render_threads: usize,
    /// Normalized water height in [0, 1], forwarded to the renderer.
    pub sea_level: f32,
    /// Added to floored tile coordinates so practical travel ranges stay non-negative.
    pub origin_bias: i64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            render_distance: 4,
            tile_size: 256.0,
            ceiling_height: 600.0,
            height_map_resolution: 129,
            alpha_map_resolution: 128,
            noise_scale: 1000.0,
            noise_phase: 0.0,
            seed: 0,
            max_render_threads: 4,
            sea_level: 0.25,
            origin_bias: 250,
        }
    }
}

impl TerrainConfig {
    /// Parse and validate a config from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check the invariants the generator and scheduler rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(invalid("tile_size", "must be a positive finite number"));
        }
        if !(self.ceiling_height.is_finite() && self.ceiling_height > 0.0) {
            return Err(invalid("ceiling_height", "must be a positive finite number"));
        }
        if !(self.noise_scale.is_finite() && self.noise_scale > 0.0) {
            return Err(invalid("noise_scale", "must be a positive finite number"));
        }
        if !self.noise_phase.is_finite() {
            return Err(invalid("noise_phase", "must be finite"));
        }
        if self.height_map_resolution < 2 {
            return Err(invalid("height_map_resolution", "must be at least 2"));
        }
        if self.alpha_map_resolution < 2 {
            return Err(invalid("alpha_map_resolution", "must be at least 2"));
        }
        if self.max_render_threads == 0 {
            return Err(invalid("max_render_threads", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.sea_level) {
            return Err(invalid("sea_level", "must lie in [0, 1]"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.origin_bias, 250);
        assert_eq!(config.max_render_threads, 4);
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let config = TerrainConfig::from_yaml_str("render_distance: 2\nseed: 9\n").unwrap();
        assert_eq!(config.render_distance, 2);
        assert_eq!(config.seed, 9);
        assert_eq!(config.tile_size, TerrainConfig::default().tile_size);
    }

    #[test]
    fn yaml_roundtrip_preserves_values() {
        let config = TerrainConfig {
            render_distance: 7,
            noise_phase: 0.5,
            ..TerrainConfig::default()
        };
        let text = config.to_yaml_string().unwrap();
        assert_eq!(TerrainConfig::from_yaml_str(&text).unwrap(), config);
    }

    #[test]
    fn rejects_zero_threads() {
        let err = TerrainConfig::from_yaml_str("max_render_threads: 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_render_threads",
                ..
            }
        ));
    }

    #[test]
    fn rejects_tiny_resolution() {
        let config = TerrainConfig {
            height_map_resolution: 1,
            ..TerrainConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_tile_size() {
        let config = TerrainConfig {
            tile_size: -1.0,
            ..TerrainConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_sea_level_out_of_range() {
        let config = TerrainConfig {
            sea_level: 1.5,
            ..TerrainConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tile_size: 128.0").unwrap();
        writeln!(file, "alpha_map_resolution: 64").unwrap();

        let config = TerrainConfig::load(file.path()).unwrap();
        assert_eq!(config.tile_size, 128.0);
        assert_eq!(config.alpha_map_resolution, 64);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TerrainConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_yaml_is_yaml_error() {
        let err = TerrainConfig::from_yaml_str("render_distance: [not a number").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
