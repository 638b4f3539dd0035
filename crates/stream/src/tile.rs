use std::sync::Arc;

use tilestream_common::GridCoord;
use tilestream_terrain::TilePayload;

use crate::error::StreamError;

/// Identifier of one dispatched generation job.
pub type JobId = u64;

/// Lifecycle of a terrain tile.
///
/// `Requested → Generating → Generated → Loaded → Evicted`, with
/// `Generating → Requested` allowed only when a dispatch is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    Requested,
    Generating,
    Generated,
    Loaded,
    Evicted,
}

impl std::fmt::Display for TileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TileState::Requested => "requested",
            TileState::Generating => "generating",
            TileState::Generated => "generated",
            TileState::Loaded => "loaded",
            TileState::Evicted => "evicted",
        };
        f.write_str(name)
    }
}

/// One streamed chunk of terrain, generic over the renderer's handle type.
#[derive(Debug)]
pub struct TerrainTile<H> {
    coord: GridCoord,
    name: String,
    distance: u64,
    state: TileState,
    job: Option<JobId>,
    payload: Option<Arc<TilePayload>>,
    handle: Option<H>,
}

impl<H> TerrainTile<H> {
    pub fn new(coord: GridCoord, distance: u64) -> Self {
        Self {
            coord,
            name: coord.tile_name(),
            distance,
            state: TileState::Requested,
            job: None,
            payload: None,
            handle: None,
        }
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn distance(&self) -> u64 {
        self.distance
    }

    pub fn set_distance(&mut self, distance: u64) {
        self.distance = distance;
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn job(&self) -> Option<JobId> {
        self.job
    }

    pub fn payload(&self) -> Option<&TilePayload> {
        self.payload.as_deref()
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    /// Mutable access to the payload and handle together, for in-place edits.
    /// Clones the payload first if a worker still shares it.
    pub fn edit(&mut self) -> Option<(&mut TilePayload, &H)> {
        match (self.payload.as_mut(), self.handle.as_ref()) {
            (Some(payload), Some(handle)) => Some((Arc::make_mut(payload), handle)),
            _ => None,
        }
    }

    fn transition(&mut self, expected: TileState, to: TileState) -> Result<(), StreamError> {
        if self.state != expected {
            return Err(StreamError::InvalidTransition {
                name: self.name.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn begin_generating(&mut self, job: JobId) -> Result<(), StreamError> {
        self.transition(TileState::Requested, TileState::Generating)?;
        self.job = Some(job);
        Ok(())
    }

    /// Return a tile whose dispatch was refused to `Requested`.
    pub fn revert_to_requested(&mut self) -> Result<(), StreamError> {
        self.transition(TileState::Generating, TileState::Requested)?;
        self.job = None;
        Ok(())
    }

    pub fn complete(&mut self, payload: Arc<TilePayload>) -> Result<(), StreamError> {
        self.transition(TileState::Generating, TileState::Generated)?;
        self.payload = Some(payload);
        Ok(())
    }

    pub fn mark_loaded(&mut self, handle: H) -> Result<(), StreamError> {
        self.transition(TileState::Generated, TileState::Loaded)?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Evict a loaded tile, handing back its renderer handle. The tile's
    /// payload is released; an evicted tile is never reused.
    pub fn evict(&mut self) -> Result<Option<H>, StreamError> {
        self.transition(TileState::Loaded, TileState::Evicted)?;
        self.payload = None;
        Ok(self.handle.take())
    }
}
