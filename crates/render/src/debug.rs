use std::collections::HashMap;
use std::fmt::Write;

use glam::Vec3;
use tilestream_common::GridCoord;
use tilestream_stream::{TileRenderer, TileView};
use tilestream_terrain::{HeightMap, Layer, SplatMap, TilePayload};
use uuid::Uuid;

/// Opaque token for one rendered tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub Uuid);

impl RenderHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and text dumps.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

/// What the renderer keeps about a loaded tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileInstance {
    pub coord: GridCoord,
    pub name: String,
    pub local_position: Vec3,
    pub size: Vec3,
    pub mean_height: f32,
    pub max_height: f32,
    /// Share of heightmap cells at or below sea level.
    pub submerged: f32,
    /// Share of splat texels each layer dominates.
    pub coverage: [f32; Layer::COUNT],
    /// Number of in-place edits applied since load.
    pub revision: u32,
    sea_level: f32,
}

impl TileInstance {
    fn summarize(&mut self, heights: &HeightMap, splat: &SplatMap) {
        let cells = heights.as_slice();
        self.mean_height = heights.mean();
        self.max_height = heights.max();
        let below = cells.iter().filter(|h| **h <= self.sea_level).count();
        self.submerged = if cells.is_empty() {
            0.0
        } else {
            below as f32 / cells.len() as f32
        };
        self.coverage = splat.coverage();
    }

    /// Layer that dominates the most texels.
    pub fn dominant_layer(&self) -> Layer {
        let mut best = Layer::ALL[0];
        for layer in Layer::ALL {
            if self.coverage[layer.index()] > self.coverage[best.index()] {
                best = layer;
            }
        }
        best
    }
}

/// Callback counts since the renderer was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderCounters {
    pub loaded: usize,
    pub evicted: usize,
    pub repositioned: usize,
    pub modified: usize,
}

/// Headless renderer. Keeps a summary per loaded tile and can dump the scene
/// as text.
#[derive(Debug, Default)]
pub struct DebugTileRenderer {
    instances: HashMap<RenderHandle, TileInstance>,
    counters: RenderCounters,
}

impl DebugTileRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn counters(&self) -> RenderCounters {
        self.counters
    }

    pub fn instance(&self, handle: &RenderHandle) -> Option<&TileInstance> {
        self.instances.get(handle)
    }

    /// Instances ordered by tile coordinate.
    pub fn instances(&self) -> Vec<(&RenderHandle, &TileInstance)> {
        let mut all: Vec<_> = self.instances.iter().collect();
        all.sort_by_key(|(_, instance)| instance.coord);
        all
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let c = self.counters;
        let _ = writeln!(out, "=== Terrain (tiles={}) ===", self.instances.len());
        let _ = writeln!(
            out,
            "Callbacks: loaded={} evicted={} repositioned={} modified={}",
            c.loaded, c.evicted, c.repositioned, c.modified
        );

        for (handle, instance) in self.instances() {
            let p = instance.local_position;
            let _ = writeln!(
                out,
                "  [{}] {} at ({:.1}, {:.1}, {:.1}) mean={:.3} max={:.3} water={:.0}% {} rev={}",
                handle.short(),
                instance.name,
                p.x,
                p.y,
                p.z,
                instance.mean_height,
                instance.max_height,
                instance.submerged * 100.0,
                instance.dominant_layer().name(),
                instance.revision
            );
        }
        out
    }
}

impl TileRenderer for DebugTileRenderer {
    type Handle = RenderHandle;

    fn on_tile_loaded(&mut self, view: TileView<'_>) -> RenderHandle {
        let handle = RenderHandle::new();
        let mut instance = TileInstance {
            coord: view.coord,
            name: view.name.to_string(),
            local_position: view.local_position,
            size: view.size,
            mean_height: 0.0,
            max_height: 0.0,
            submerged: 0.0,
            coverage: [0.0; Layer::COUNT],
            revision: 0,
            sea_level: view.sea_level,
        };
        instance.summarize(view.heights(), view.splat());
        tracing::trace!(handle = %handle.short(), name = view.name, "instance created");

        self.instances.insert(handle, instance);
        self.counters.loaded += 1;
        handle
    }

    fn on_tile_evicted(&mut self, handle: RenderHandle) {
        if self.instances.remove(&handle).is_none() {
            tracing::warn!(handle = %handle.short(), "evicted unknown instance");
        }
        self.counters.evicted += 1;
    }

    fn on_tile_repositioned(&mut self, handle: &RenderHandle, local_position: Vec3) {
        if let Some(instance) = self.instances.get_mut(handle) {
            instance.local_position = local_position;
        }
        self.counters.repositioned += 1;
    }

    fn on_tile_modified(&mut self, handle: &RenderHandle, payload: &TilePayload) {
        if let Some(instance) = self.instances.get_mut(handle) {
            instance.summarize(&payload.heights, &payload.splat);
            instance.revision += 1;
        }
        self.counters.modified += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilestream_field::NoiseField;
    use tilestream_terrain::{SynthSettings, synthesize};

    fn payload(coord: GridCoord) -> TilePayload {
        let settings = SynthSettings {
            height_map_resolution: 9,
            alpha_map_resolution: 8,
            noise_scale: 40.0,
            noise_phase: 0.0,
        };
        synthesize(&NoiseField::with_seed(3), coord, &settings)
    }

    fn view<'a>(coord: GridCoord, name: &'a str, payload: &'a TilePayload) -> TileView<'a> {
        TileView {
            coord,
            name,
            local_position: Vec3::new(100.0, 0.0, 0.0),
            size: Vec3::new(100.0, 600.0, 100.0),
            sea_level: 0.25,
            payload,
        }
    }

    #[test]
    fn empty_renderer_dump() {
        let renderer = DebugTileRenderer::new();
        let output = renderer.render_text();
        assert!(output.contains("tiles=0"));
        assert!(renderer.is_empty());
    }

    #[test]
    fn load_summarizes_payload() {
        let coord = GridCoord::new(251, 250);
        let data = payload(coord);
        let mut renderer = DebugTileRenderer::new();
        let handle = renderer.on_tile_loaded(view(coord, "Terrain:251,250", &data));

        let instance = renderer.instance(&handle).unwrap();
        assert_eq!(instance.coord, coord);
        assert_eq!(instance.mean_height, data.heights.mean());
        assert!((0.0..=1.0).contains(&instance.submerged));
        let total: f32 = instance.coverage.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);

        let output = renderer.render_text();
        assert!(output.contains("Terrain:251,250"));
        assert!(output.contains(&handle.short()));
    }

    #[test]
    fn reposition_and_evict() {
        let coord = GridCoord::new(0, 0);
        let data = payload(coord);
        let mut renderer = DebugTileRenderer::new();
        let handle = renderer.on_tile_loaded(view(coord, "Terrain:0,0", &data));

        renderer.on_tile_repositioned(&handle, Vec3::new(-100.0, 0.0, 0.0));
        assert_eq!(
            renderer.instance(&handle).unwrap().local_position,
            Vec3::new(-100.0, 0.0, 0.0)
        );

        renderer.on_tile_evicted(handle);
        assert!(renderer.is_empty());
        assert_eq!(
            renderer.counters(),
            RenderCounters {
                loaded: 1,
                evicted: 1,
                repositioned: 1,
                modified: 0,
            }
        );
    }

    #[test]
    fn modification_bumps_revision() {
        let coord = GridCoord::new(0, 0);
        let mut data = payload(coord);
        let mut renderer = DebugTileRenderer::new();
        let handle = renderer.on_tile_loaded(view(coord, "Terrain:0,0", &data));

        data.adjust_height(4, 4, 0.5);
        renderer.on_tile_modified(&handle, &data);
        let instance = renderer.instance(&handle).unwrap();
        assert_eq!(instance.revision, 1);
        assert_eq!(instance.max_height, data.heights.max());
    }

    #[test]
    fn handles_are_unique() {
        let coord = GridCoord::new(0, 0);
        let data = payload(coord);
        let mut renderer = DebugTileRenderer::new();
        let a = renderer.on_tile_loaded(view(coord, "Terrain:0,0", &data));
        let b = renderer.on_tile_loaded(view(GridCoord::new(1, 0), "Terrain:1,0", &data));
        assert_ne!(a, b);
        assert_eq!(renderer.instances().len(), 2);
        assert_eq!(renderer.instances()[0].1.coord, coord);
    }
}
