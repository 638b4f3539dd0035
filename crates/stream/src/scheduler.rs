use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use glam::{DVec3, Vec3};
use tilestream_common::{ConfigError, GridCoord, TerrainConfig};
use tilestream_field::NoiseField;
use tilestream_terrain::SynthSettings;

use crate::error::StreamError;
use crate::grid::{TileGrid, coords_within, grid_distance};
use crate::interface::{TileRenderer, TileView, Viewer};
use crate::origin::{FloatingOrigin, OriginStamp};
use crate::stats::TickReport;
use crate::tile::{JobId, TerrainTile, TileState};
use crate::worker::{GenerationPool, JobSpawner, ThreadSpawner};

/// Order candidates nearest first; ties break on coordinate so the order is
/// reproducible.
pub fn prioritize(candidates: &mut [(u64, GridCoord)]) {
    candidates.sort_unstable();
}

/// Keeps the set of loaded tiles matched to the viewer's neighbourhood.
///
/// Owns both tile maps. `pending` holds tiles between request and load;
/// `loaded` holds tiles the renderer knows about. A coordinate is never in
/// both at once.
pub struct TerrainStreamer<R: TileRenderer, S = ThreadSpawner> {
    config: TerrainConfig,
    grid: TileGrid,
    origin: FloatingOrigin,
    pool: GenerationPool<S>,
    renderer: R,
    pending: HashMap<GridCoord, TerrainTile<R::Handle>>,
    loaded: HashMap<GridCoord, TerrainTile<R::Handle>>,
    next_job: JobId,
    viewer_coord: Option<GridCoord>,
    viewer_world: DVec3,
    distance_travelled: f64,
    ticks: u64,
    last_report: TickReport,
}

impl<R: TileRenderer> TerrainStreamer<R, ThreadSpawner> {
    /// Build a streamer that generates tiles on background threads.
    pub fn new(config: TerrainConfig, renderer: R) -> Result<Self, ConfigError> {
        let field = Arc::new(NoiseField::with_seed(config.seed));
        Self::with_spawner(config, field, renderer, ThreadSpawner)
    }
}

impl<R: TileRenderer, S: JobSpawner> TerrainStreamer<R, S> {
    pub fn with_spawner(
        config: TerrainConfig,
        field: Arc<NoiseField>,
        renderer: R,
        spawner: S,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = TileGrid::from_config(&config);
        let pool = GenerationPool::new(
            field,
            SynthSettings::from(&config),
            config.max_render_threads,
            spawner,
        );
        tracing::info!(
            render_distance = config.render_distance,
            tile_size = config.tile_size,
            max_render_threads = config.max_render_threads,
            "terrain streamer ready"
        );
        Ok(Self {
            origin: FloatingOrigin::at_world_zero(grid),
            grid,
            pool,
            renderer,
            pending: HashMap::new(),
            loaded: HashMap::new(),
            next_job: 0,
            viewer_coord: None,
            viewer_world: DVec3::ZERO,
            distance_travelled: 0.0,
            ticks: 0,
            last_report: TickReport::default(),
            config,
        })
    }

    /// Run one streaming pass: recenter, cull, request, harvest.
    ///
    /// Never blocks on generation. Work that does not fit the worker budget
    /// waits for a later tick.
    pub fn tick(&mut self, viewer: &mut impl Viewer) -> TickReport {
        self.ticks += 1;
        let _span = tracing::info_span!("stream_tick", tick = self.ticks).entered();
        let start = Instant::now();

        let world = self.origin.to_world(viewer.position());
        if self.viewer_coord.is_some() {
            self.distance_travelled += world.distance(self.viewer_world);
        }
        self.viewer_world = world;
        let coord = self.grid.to_grid_coordinate(world);

        let mut report = TickReport {
            tick: self.ticks,
            viewer: Some(coord),
            ..TickReport::default()
        };

        if self.viewer_coord != Some(coord) {
            report.recentered = self.recenter(coord, world, viewer);
            self.viewer_coord = Some(coord);
        }

        report.evicted = self.cull();
        let candidates = self.candidates_around(coord);
        self.dispatch(candidates, &mut report);
        self.harvest(coord, &mut report);

        debug_assert!(
            self.maps_are_disjoint(),
            "tile present in both pending and loaded maps"
        );

        report.total_loaded = self.loaded.len();
        report.total_pending = self.pending.len();
        report.active_jobs = self.pool.active();
        report.tick_time = start.elapsed();

        tracing::trace!(
            evicted = report.evicted,
            dispatched = report.dispatched,
            loaded = report.loaded,
            total = report.total_loaded,
            pending = report.total_pending,
            "stream tick complete"
        );

        self.last_report = report.clone();
        report
    }

    /// Move the origin onto `coord` and shift everything rendered with it.
    fn recenter(&mut self, coord: GridCoord, world: DVec3, viewer: &mut impl Viewer) -> bool {
        let previous = self.origin.coord();
        if !self.origin.shift_to(coord) {
            return false;
        }

        for tile in self.loaded.values() {
            if let Some(handle) = tile.handle() {
                let position = self.origin.tile_position(tile.coord());
                self.renderer.on_tile_repositioned(handle, position);
            }
        }
        viewer.recenter(self.origin.to_local(world));

        tracing::debug!(
            from = %previous,
            to = %coord,
            epoch = self.origin.epoch(),
            "origin recentered"
        );
        true
    }

    /// Evict every loaded tile farther than the render distance from the
    /// viewer. Returns how many were evicted; a second call without moving
    /// the viewer evicts nothing.
    pub fn cull(&mut self) -> usize {
        let Some(viewer) = self.viewer_coord else {
            return 0;
        };
        let limit = u64::from(self.config.render_distance);

        let mut doomed: Vec<GridCoord> = self
            .loaded
            .keys()
            .filter(|c| grid_distance(**c, viewer) > limit)
            .copied()
            .collect();
        doomed.sort_unstable();

        for coord in &doomed {
            let Some(mut tile) = self.loaded.remove(coord) else {
                continue;
            };
            match tile.evict() {
                Ok(Some(handle)) => self.renderer.on_tile_evicted(handle),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "eviction skipped"),
            }
            tracing::debug!(%coord, "tile evicted");
        }

        for (coord, tile) in self.loaded.iter_mut() {
            tile.set_distance(grid_distance(*coord, viewer));
        }
        doomed.len()
    }

    /// Coordinates within range of `viewer` that are neither pending nor
    /// loaded, nearest first.
    pub fn candidates_around(&self, viewer: GridCoord) -> Vec<(u64, GridCoord)> {
        let mut candidates: Vec<(u64, GridCoord)> =
            coords_within(viewer, self.config.render_distance)
                .into_iter()
                .filter(|c| !self.pending.contains_key(c) && !self.loaded.contains_key(c))
                .map(|c| (grid_distance(c, viewer), c))
                .collect();
        prioritize(&mut candidates);
        candidates
    }

    fn dispatch(&mut self, candidates: Vec<(u64, GridCoord)>, report: &mut TickReport) {
        let mut remaining = candidates.into_iter();
        for (distance, coord) in remaining.by_ref() {
            if !self.pool.has_capacity() {
                report.deferred += 1;
                continue;
            }

            let job = self.next_job;
            self.next_job += 1;
            let mut tile = TerrainTile::new(coord, distance);
            if let Err(err) = tile.begin_generating(job) {
                tracing::warn!(error = %err, "tile not requested");
                continue;
            }
            self.pending.insert(coord, tile);

            match self.pool.dispatch(coord, job) {
                Ok(()) => report.dispatched += 1,
                Err(err) => {
                    if let Some(mut tile) = self.pending.remove(&coord)
                        && let Err(revert) = tile.revert_to_requested()
                    {
                        tracing::warn!(error = %revert, "refused tile in unexpected state");
                    }
                    tracing::warn!(error = %err, "generation dispatch refused; retrying next tick");
                    report.dispatch_failures += 1;
                    break;
                }
            }
        }
        report.deferred += remaining.count();
    }

    fn harvest(&mut self, viewer: GridCoord, report: &mut TickReport) {
        let mut failed = Vec::new();
        for done in self.pool.drain_completions() {
            match self.pending.get_mut(&done.coord) {
                Some(tile) if tile.job() == Some(done.job) => match done.payload {
                    Some(payload) => match tile.complete(payload) {
                        Ok(()) => tracing::debug!(
                            coord = %done.coord,
                            elapsed_ms = done.elapsed.as_secs_f64() * 1000.0,
                            "tile generated"
                        ),
                        Err(err) => tracing::warn!(error = %err, "completion rejected"),
                    },
                    None => failed.push(done.coord),
                },
                _ => {
                    report.stale += 1;
                    tracing::trace!(
                        coord = %done.coord,
                        job = done.job,
                        "stale completion dropped"
                    );
                }
            }
        }

        // Failed tiles leave pending so the next tick requests them again.
        for coord in failed {
            if let Some(mut tile) = self.pending.remove(&coord)
                && let Err(err) = tile.revert_to_requested()
            {
                tracing::warn!(error = %err, "failed tile in unexpected state");
            }
            report.failed += 1;
            tracing::warn!(%coord, "generation failed; retrying next tick");
        }

        let limit = u64::from(self.config.render_distance);
        let mut order: Vec<(u64, GridCoord)> = self
            .pending
            .keys()
            .map(|c| (grid_distance(*c, viewer), *c))
            .collect();
        prioritize(&mut order);

        for (distance, coord) in order {
            if distance > limit {
                self.pending.remove(&coord);
                report.cancelled += 1;
                tracing::debug!(%coord, distance, "pending tile out of range");
                continue;
            }

            let ready = match self.pending.get_mut(&coord) {
                Some(tile) => {
                    tile.set_distance(distance);
                    tile.state() == TileState::Generated
                }
                None => false,
            };
            if !ready {
                continue;
            }
            if let Some(tile) = self.pending.remove(&coord)
                && self.promote(tile)
            {
                report.loaded += 1;
            }
        }
    }

    /// Hand a generated tile to the renderer and move it into `loaded`.
    fn promote(&mut self, mut tile: TerrainTile<R::Handle>) -> bool {
        let coord = tile.coord();
        let handle = {
            let Some(payload) = tile.payload() else {
                return false;
            };
            let size = Vec3::new(
                self.config.tile_size as f32,
                self.config.ceiling_height as f32,
                self.config.tile_size as f32,
            );
            self.renderer.on_tile_loaded(TileView {
                coord,
                name: tile.name(),
                local_position: self.origin.tile_position(coord),
                size,
                sea_level: self.config.sea_level,
                payload,
            })
        };

        match tile.mark_loaded(handle) {
            Ok(()) => {
                tracing::debug!(%coord, "tile loaded");
                self.loaded.insert(coord, tile);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "load rejected");
                false
            }
        }
    }

    fn loaded_cell(
        &self,
        world: DVec3,
    ) -> Result<(&TerrainTile<R::Handle>, (usize, usize)), StreamError> {
        let local = self
            .grid
            .world_to_local(world, self.config.height_map_resolution);
        let tile = self
            .loaded
            .get(&local.coord)
            .filter(|t| t.payload().is_some())
            .ok_or(StreamError::NotLoaded(local.coord))?;
        Ok((tile, local.cell))
    }

    /// Normalized height at the heightmap cell nearest `world`.
    pub fn height_at(&self, world: DVec3) -> Result<f32, StreamError> {
        let (tile, (row, col)) = self.loaded_cell(world)?;
        tile.payload()
            .map(|p| p.height_at(row, col))
            .ok_or(StreamError::NotLoaded(tile.coord()))
    }

    pub fn steepness_at(&self, world: DVec3) -> Result<f32, StreamError> {
        let (tile, (row, col)) = self.loaded_cell(world)?;
        tile.payload()
            .map(|p| p.steepness_at(row, col))
            .ok_or(StreamError::NotLoaded(tile.coord()))
    }

    /// World-space ground height under `world`.
    pub fn ground_elevation(&self, world: DVec3) -> Result<f64, StreamError> {
        Ok(f64::from(self.height_at(world)?) * self.config.ceiling_height)
    }

    /// Raise (or lower, for negative `delta`) the terrain under `world` and
    /// notify the renderer. Returns the new normalized height.
    pub fn adjust_height(&mut self, world: DVec3, delta: f32) -> Result<f32, StreamError> {
        let local = self
            .grid
            .world_to_local(world, self.config.height_map_resolution);
        let (row, col) = local.cell;
        let tile = self
            .loaded
            .get_mut(&local.coord)
            .ok_or(StreamError::NotLoaded(local.coord))?;
        let (payload, handle) = tile.edit().ok_or(StreamError::NotLoaded(local.coord))?;

        payload.adjust_height(row, col, delta);
        let height = payload.height_at(row, col);
        self.renderer.on_tile_modified(handle, payload);
        tracing::debug!(coord = %local.coord, row, col, height, "terrain edited");
        Ok(height)
    }

    pub fn local_to_world(&self, local: Vec3) -> DVec3 {
        self.origin.to_world(local)
    }

    pub fn world_to_local(&self, world: DVec3) -> Vec3 {
        self.origin.to_local(world)
    }

    pub fn maps_are_disjoint(&self) -> bool {
        self.pending.keys().all(|c| !self.loaded.contains_key(c))
    }

    pub fn tile_state(&self, coord: GridCoord) -> Option<TileState> {
        self.loaded
            .get(&coord)
            .or_else(|| self.pending.get(&coord))
            .map(TerrainTile::state)
    }

    pub fn loaded_tile(&self, coord: GridCoord) -> Option<&TerrainTile<R::Handle>> {
        self.loaded.get(&coord)
    }

    pub fn loaded_tiles(&self) -> impl Iterator<Item = &TerrainTile<R::Handle>> {
        self.loaded.values()
    }

    /// Loaded coordinates in ascending order.
    pub fn loaded_coords(&self) -> Vec<GridCoord> {
        let mut coords: Vec<GridCoord> = self.loaded.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    pub fn pending_coords(&self) -> Vec<GridCoord> {
        let mut coords: Vec<GridCoord> = self.pending.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn active_jobs(&self) -> usize {
        self.pool.active()
    }

    pub fn viewer_coord(&self) -> Option<GridCoord> {
        self.viewer_coord
    }

    pub fn viewer_world(&self) -> DVec3 {
        self.viewer_world
    }

    /// World distance the viewer covered across all ticks.
    pub fn distance_travelled(&self) -> f64 {
        self.distance_travelled
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    pub fn origin(&self) -> &FloatingOrigin {
        &self.origin
    }

    pub fn origin_stamp(&self) -> OriginStamp {
        self.origin.stamp()
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn field(&self) -> &Arc<NoiseField> {
        self.pool.field()
    }

    pub fn spawner(&self) -> &S {
        self.pool.spawner()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
