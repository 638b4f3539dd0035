use serde::{Deserialize, Serialize};

/// One fractal octave stack: base frequency, octave count, and per-octave falloff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub frequency: f64,
    pub octaves: usize,
    pub lacunarity: f64,
    pub persistence: f64,
}

impl Band {
    pub const fn new(frequency: f64, octaves: usize) -> Self {
        Self {
            frequency,
            octaves,
            lacunarity: 2.0,
            persistence: 0.5,
        }
    }
}

/// Parameters for building a [`NoiseField`](crate::NoiseField).
///
/// The four bands are seeded from `seed` with fixed per-band offsets so one
/// seed reproduces the whole world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldParams {
    pub seed: u32,
    /// Large-scale mask deciding where mountains rise out of lowlands.
    pub continents: Band,
    pub lowlands: Band,
    /// Ridged stack for mountain ranges.
    pub mountains: Band,
    /// Low-frequency mask deciding where land gives way to ocean floor.
    pub ocean: Band,

    /// Distortion applied to the mountain ridges.
    pub turbulence_frequency: f64,
    pub turbulence_power: f64,
    pub turbulence_roughness: usize,

    /// Continents mask value above which mountains are selected.
    pub mountain_threshold: f64,
    pub mountain_falloff: f64,
    /// Ocean mask value above which land is selected.
    pub ocean_threshold: f64,
    pub ocean_falloff: f64,

    pub lowland_scale: f64,
    pub lowland_bias: f64,
    pub mountain_scale: f64,
    pub mountain_bias: f64,
    /// Raw elevation of the ocean floor, in the pre-normalization [-1, 1] range.
    pub ocean_floor: f64,
}

impl FieldParams {
    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            seed: 0,
            continents: Band::new(1.0, 6),
            lowlands: Band::new(1.5, 4),
            mountains: Band::new(2.0, 6),
            ocean: Band::new(0.4, 3),
            turbulence_frequency: 4.0,
            turbulence_power: 0.125,
            turbulence_roughness: 3,
            mountain_threshold: 0.1,
            mountain_falloff: 0.15,
            ocean_threshold: -0.35,
            ocean_falloff: 0.1,
            lowland_scale: 0.25,
            lowland_bias: -0.2,
            mountain_scale: 0.6,
            mountain_bias: 0.25,
            ocean_floor: -0.55,
        }
    }
}
