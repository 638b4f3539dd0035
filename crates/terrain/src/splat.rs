use crate::heightmap::{HeightMap, SteepnessMap};

/// Ground texture layers, in splat channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Sand,
    Grass,
    RockyGrass,
    Cliff,
}

impl Layer {
    pub const COUNT: usize = 4;
    pub const ALL: [Layer; Self::COUNT] =
        [Layer::Sand, Layer::Grass, Layer::RockyGrass, Layer::Cliff];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Layer::Sand => "sand",
            Layer::Grass => "grass",
            Layer::RockyGrass => "rocky-grass",
            Layer::Cliff => "cliff",
        }
    }
}

/// Steepness at or above which the cliff layer contributes.
pub const CLIFF_THRESHOLD: f32 = 0.009;

/// Layer painted when no rule produces any weight for a texel.
pub const DEFAULT_LAYER: Layer = Layer::Grass;

/// Unnormalized layer weights for one texel.
pub fn raw_weights(height: f32, steepness: f32) -> [f32; Layer::COUNT] {
    let slope = 3.0 * steepness;
    let sand = ((1.0 - height) - 0.75 - slope).max(0.0);
    let grass = ((height - 0.1) - slope).max(0.0);
    let rocky = ((height - 0.5) - slope).max(0.0);
    let cliff = if steepness >= CLIFF_THRESHOLD {
        steepness * 10.0
    } else {
        0.0
    };
    [sand, grass, rocky, cliff]
}

/// Scale weights to sum to 1. A zero (or non-finite) sum yields [`DEFAULT_LAYER`].
pub fn normalize_weights(raw: [f32; Layer::COUNT]) -> [f32; Layer::COUNT] {
    let total: f32 = raw.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        let mut fallback = [0.0; Layer::COUNT];
        fallback[DEFAULT_LAYER.index()] = 1.0;
        return fallback;
    }
    raw.map(|w| w / total)
}

/// Nearest heightmap cell for a splat texel index.
///
/// Corners map to corners: texel 0 to cell 0 and the last texel to the last cell.
pub fn nearest_cell(texel: usize, alpha_resolution: usize, height_resolution: usize) -> usize {
    if alpha_resolution <= 1 || height_resolution <= 1 {
        return 0;
    }
    let scaled = texel as f64 * (height_resolution - 1) as f64 / (alpha_resolution - 1) as f64;
    (scaled.round() as usize).min(height_resolution - 1)
}

/// Per-texel layer weights for one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct SplatMap {
    resolution: usize,
    texels: Vec<[f32; Layer::COUNT]>,
}

impl SplatMap {
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn get(&self, row: usize, col: usize) -> [f32; Layer::COUNT] {
        self.texels[row * self.resolution + col]
    }

    pub fn weight(&self, row: usize, col: usize, layer: Layer) -> f32 {
        self.get(row, col)[layer.index()]
    }

    pub fn texels(&self) -> &[[f32; Layer::COUNT]] {
        &self.texels
    }

    /// Layer with the largest weight at a texel.
    pub fn dominant(&self, row: usize, col: usize) -> Layer {
        Layer::ALL.into_iter().fold(Layer::Sand, |best, layer| {
            if self.weight(row, col, layer) > self.weight(row, col, best) {
                layer
            } else {
                best
            }
        })
    }

    /// Fraction of texels each layer dominates, in [`Layer::ALL`] order.
    pub fn coverage(&self) -> [f32; Layer::COUNT] {
        let mut counts = [0usize; Layer::COUNT];
        for row in 0..self.resolution {
            for col in 0..self.resolution {
                counts[self.dominant(row, col).index()] += 1;
            }
        }
        let total = self.texels.len().max(1) as f32;
        counts.map(|c| c as f32 / total)
    }
}

/// Derive splat weights by resampling height and steepness onto the alpha grid.
pub fn splat_map(
    heights: &HeightMap,
    steepness: &SteepnessMap,
    alpha_resolution: usize,
) -> SplatMap {
    let height_resolution = heights.resolution();
    let mut texels = Vec::with_capacity(alpha_resolution * alpha_resolution);
    for row in 0..alpha_resolution {
        let hr = nearest_cell(row, alpha_resolution, height_resolution);
        for col in 0..alpha_resolution {
            let hc = nearest_cell(col, alpha_resolution, height_resolution);
            let raw = raw_weights(heights.get(hr, hc), steepness.get(hr, hc));
            texels.push(normalize_weights(raw));
        }
    }
    SplatMap {
        resolution: alpha_resolution,
        texels,
    }
}
