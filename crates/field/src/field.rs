use noise::{Billow, Fbm, MultiFractal, NoiseFn, Perlin, RidgedMulti, Seedable, Turbulence};

use crate::params::{Band, FieldParams};
use crate::select::threshold_select;

type Mountains = Turbulence<RidgedMulti<Perlin>, Perlin>;

/// Composite terrain elevation field.
///
/// Four octave generators are combined by threshold selection: ridged
/// mountains replace lowlands where the continents mask is high, and the
/// resulting land replaces a flat ocean floor where the ocean mask is high.
/// Every generator is immutable after construction, so a `NoiseField` can be
/// shared behind an `Arc` by any number of worker threads.
pub struct NoiseField {
    params: FieldParams,
    continents: Fbm<Perlin>,
    lowlands: Billow<Perlin>,
    mountains: Mountains,
    ocean: Fbm<Perlin>,
}

fn fbm(seed: u32, band: &Band) -> Fbm<Perlin> {
    Fbm::<Perlin>::new(seed)
        .set_frequency(band.frequency)
        .set_octaves(band.octaves)
        .set_lacunarity(band.lacunarity)
        .set_persistence(band.persistence)
}

impl NoiseField {
    pub fn new(params: FieldParams) -> Self {
        let seed = params.seed;
        let continents = fbm(seed, &params.continents);
        let ocean = fbm(seed.wrapping_add(3), &params.ocean);

        let lowlands = Billow::<Perlin>::new(seed.wrapping_add(1))
            .set_frequency(params.lowlands.frequency)
            .set_octaves(params.lowlands.octaves)
            .set_lacunarity(params.lowlands.lacunarity)
            .set_persistence(params.lowlands.persistence);

        let ridges = RidgedMulti::<Perlin>::new(seed.wrapping_add(2))
            .set_frequency(params.mountains.frequency)
            .set_octaves(params.mountains.octaves)
            .set_lacunarity(params.mountains.lacunarity)
            .set_persistence(params.mountains.persistence);
        let mountains = Turbulence::<_, Perlin>::new(ridges)
            .set_seed(seed.wrapping_add(4))
            .set_frequency(params.turbulence_frequency)
            .set_power(params.turbulence_power)
            .set_roughness(params.turbulence_roughness);

        tracing::debug!(seed, "noise field built");

        Self {
            params,
            continents,
            lowlands,
            mountains,
            ocean,
        }
    }

    pub fn with_seed(seed: u32) -> Self {
        Self::new(FieldParams::with_seed(seed))
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    /// Raw composite elevation, roughly in [-1, 1].
    pub fn sample_raw(&self, x: f64, z: f64, phase: f64) -> f64 {
        let p = &self.params;
        let point = [x, z, phase];

        let lowland = self.lowlands.get(point) * p.lowland_scale + p.lowland_bias;
        let mountain = self.mountains.get(point) * p.mountain_scale + p.mountain_bias;
        let land = threshold_select(
            self.continents.get(point),
            p.mountain_threshold,
            f64::MAX,
            p.mountain_falloff,
            lowland,
            mountain,
        );

        threshold_select(
            self.ocean.get(point),
            p.ocean_threshold,
            f64::MAX,
            p.ocean_falloff,
            p.ocean_floor,
            land,
        )
    }

    /// Elevation normalized into [0, 1].
    pub fn sample(&self, x: f64, z: f64, phase: f64) -> f64 {
        let v = self.sample_raw(x, z, phase) * 0.5 + 0.5;
        if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn field_is_shareable_across_threads() {
        assert_send_sync::<NoiseField>();
    }

    #[test]
    fn samples_stay_in_unit_range() {
        let field = NoiseField::with_seed(7);
        for i in 0..50 {
            for j in 0..50 {
                let v = field.sample(i as f64 * 0.37, j as f64 * 0.41, 0.0);
                assert!((0.0..=1.0).contains(&v), "sample {v} out of range");
            }
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let a = NoiseField::with_seed(42);
        let b = NoiseField::with_seed(42);
        for i in 0..20 {
            let (x, z) = (i as f64 * 0.13, i as f64 * -0.29);
            assert_eq!(a.sample(x, z, 0.0), b.sample(x, z, 0.0));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let a = NoiseField::with_seed(1);
        let b = NoiseField::with_seed(2);
        let differs = (0..50).any(|i| {
            let (x, z) = (i as f64 * 0.173 + 0.05, i as f64 * 0.311 + 0.05);
            a.sample(x, z, 0.0) != b.sample(x, z, 0.0)
        });
        assert!(differs);
    }

    #[test]
    fn field_varies_over_space() {
        let field = NoiseField::with_seed(3);
        let first = field.sample(0.05, 0.05, 0.0);
        let varies = (1..100).any(|i| field.sample(i as f64 * 0.21 + 0.05, 0.05, 0.0) != first);
        assert!(varies);
    }

    #[test]
    fn phase_selects_a_different_slice() {
        let field = NoiseField::with_seed(5);
        let differs = (0..50).any(|i| {
            let x = i as f64 * 0.19 + 0.07;
            field.sample(x, 0.3, 0.0) != field.sample(x, 0.3, 0.77)
        });
        assert!(differs);
    }
}
