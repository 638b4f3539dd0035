use tilestream_common::GridCoord;
use tilestream_stream::{JobSpawner, OriginStamp, TerrainStreamer, TileRenderer, TileState};
use tilestream_terrain::{Layer, TilePayload};

use crate::digest::tile_digest;

/// Streamer inspector for developer tooling.
///
/// Read-only queries against a [`TerrainStreamer`] for debugging and CLI output.
pub struct StreamInspector;

impl StreamInspector {
    pub fn summary<R: TileRenderer, S: JobSpawner>(
        streamer: &TerrainStreamer<R, S>,
    ) -> StreamSummary {
        StreamSummary {
            ticks: streamer.ticks(),
            viewer: streamer.viewer_coord(),
            origin: streamer.origin_stamp(),
            render_distance: streamer.config().render_distance,
            loaded: streamer.loaded_count(),
            pending: streamer.pending_count(),
            active_jobs: streamer.active_jobs(),
            distance_travelled: streamer.distance_travelled(),
        }
    }

    /// Describe one generated payload.
    pub fn inspect_tile(payload: &TilePayload) -> TileInfo {
        let steepness = payload.steepness.as_slice();
        TileInfo {
            coord: payload.coord,
            name: payload.coord.tile_name(),
            resolution: payload.heights.resolution(),
            alpha_resolution: payload.splat.resolution(),
            min_height: payload.heights.min(),
            max_height: payload.heights.max(),
            mean_height: payload.heights.mean(),
            max_steepness: steepness.iter().copied().fold(0.0, f32::max),
            coverage: payload.splat.coverage(),
            digest: tile_digest(payload),
        }
    }

    /// ASCII map of tile states in a square of `radius` tiles around the viewer.
    ///
    /// Rows run from low to high Z. `@` marks the viewer's tile, `#` loaded,
    /// `+` generating, `*` generated but not yet loaded, `.` nothing.
    pub fn state_map<R: TileRenderer, S: JobSpawner>(
        streamer: &TerrainStreamer<R, S>,
        radius: u32,
    ) -> String {
        let Some(center) = streamer.viewer_coord() else {
            return String::from("(no viewer yet)\n");
        };
        let r = i64::from(radius);
        let mut out = String::new();
        for dz in -r..=r {
            for dx in -r..=r {
                let coord = center.offset(dx, dz);
                let glyph = if coord == center {
                    '@'
                } else {
                    match streamer.tile_state(coord) {
                        Some(TileState::Loaded) => '#',
                        Some(TileState::Generating) => '+',
                        Some(TileState::Generated) => '*',
                        _ => '.',
                    }
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

/// Snapshot of the streamer for the inspector.
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub ticks: u64,
    pub viewer: Option<GridCoord>,
    pub origin: OriginStamp,
    pub render_distance: u32,
    pub loaded: usize,
    pub pending: usize,
    pub active_jobs: usize,
    pub distance_travelled: f64,
}

impl std::fmt::Display for StreamSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let viewer = self
            .viewer
            .map_or_else(|| String::from("-"), |c| c.to_string());
        write!(
            f,
            "Stream: ticks={} viewer={} origin={}@{} r={} ",
            self.ticks, viewer, self.origin.coord, self.origin.epoch, self.render_distance
        )?;
        write!(
            f,
            "loaded={} pending={} jobs={} travelled={:.1}",
            self.loaded, self.pending, self.active_jobs, self.distance_travelled
        )
    }
}

/// Statistics of one tile payload.
#[derive(Debug, Clone)]
pub struct TileInfo {
    pub coord: GridCoord,
    pub name: String,
    pub resolution: usize,
    pub alpha_resolution: usize,
    pub min_height: f32,
    pub max_height: f32,
    pub mean_height: f32,
    pub max_steepness: f32,
    pub coverage: [f32; Layer::COUNT],
    pub digest: String,
}

impl std::fmt::Display for TileInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} ({r}x{r} heights, {a}x{a} splat)",
            self.name,
            r = self.resolution,
            a = self.alpha_resolution
        )?;
        writeln!(
            f,
            "  height min={:.4} max={:.4} mean={:.4}",
            self.min_height, self.max_height, self.mean_height
        )?;
        writeln!(f, "  steepness max={:.5}", self.max_steepness)?;
        for layer in Layer::ALL {
            writeln!(f, "  {:<11} {:>6.2}%", layer.name(), self.coverage[layer.index()] * 100.0)?;
        }
        write!(f, "  sha256 {}", self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::sync::Arc;
    use tilestream_common::TerrainConfig;
    use tilestream_field::NoiseField;
    use tilestream_render::DebugTileRenderer;
    use tilestream_stream::{InlineSpawner, ManualSpawner};
    use tilestream_terrain::{SynthSettings, synthesize};

    fn config() -> TerrainConfig {
        TerrainConfig {
            render_distance: 1,
            tile_size: 100.0,
            height_map_resolution: 9,
            alpha_map_resolution: 8,
            noise_scale: 50.0,
            max_render_threads: 16,
            ..TerrainConfig::default()
        }
    }

    fn streamer<S: JobSpawner>(spawner: S) -> TerrainStreamer<DebugTileRenderer, S> {
        TerrainStreamer::with_spawner(
            config(),
            Arc::new(NoiseField::with_seed(0)),
            DebugTileRenderer::new(),
            spawner,
        )
        .unwrap()
    }

    #[test]
    fn summary_before_first_tick() {
        let s = streamer(InlineSpawner);
        let summary = StreamInspector::summary(&s);
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.viewer, None);
        assert!(format!("{summary}").contains("viewer=-"));
        assert_eq!(StreamInspector::state_map(&s, 1), "(no viewer yet)\n");
    }

    #[test]
    fn summary_after_tick() {
        let mut s = streamer(InlineSpawner);
        let mut viewer = Vec3::new(10.0, 0.0, 10.0);
        s.tick(&mut viewer);

        let summary = StreamInspector::summary(&s);
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.viewer, Some(GridCoord::new(250, 250)));
        assert_eq!(summary.loaded, 9);
        assert_eq!(summary.pending, 0);
        let text = format!("{summary}");
        assert!(text.contains("loaded=9"));
        assert!(text.contains("viewer=(250, 250)"));
    }

    #[test]
    fn state_map_shows_loaded_ring() {
        let mut s = streamer(InlineSpawner);
        let mut viewer = Vec3::new(10.0, 0.0, 10.0);
        s.tick(&mut viewer);
        assert_eq!(
            StreamInspector::state_map(&s, 2),
            ".....\n.###.\n.#@#.\n.###.\n.....\n"
        );
    }

    #[test]
    fn state_map_shows_generating_tiles() {
        let spawner = ManualSpawner::new();
        let mut s = streamer(spawner.clone());
        let mut viewer = Vec3::new(10.0, 0.0, 10.0);
        s.tick(&mut viewer);
        assert_eq!(StreamInspector::state_map(&s, 1), "+++\n+@+\n+++\n");
    }

    #[test]
    fn inspect_tile_reports_stats() {
        let settings = SynthSettings::from(&config());
        let payload = synthesize(&NoiseField::with_seed(0), GridCoord::new(250, 250), &settings);
        let info = StreamInspector::inspect_tile(&payload);

        assert_eq!(info.name, "Terrain:250,250");
        assert_eq!(info.resolution, 9);
        assert!(info.min_height <= info.mean_height && info.mean_height <= info.max_height);
        assert_eq!(info.digest, tile_digest(&payload));
        let text = format!("{info}");
        assert!(text.contains("sha256"));
        assert!(text.contains("rocky-grass"));
    }
}
