use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tilestream_common::GridCoord;
use tilestream_field::NoiseField;
use tilestream_terrain::{SynthSettings, TilePayload, synthesize};

use crate::error::StreamError;
use crate::tile::JobId;

/// A unit of generation work handed to a [`JobSpawner`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Launches generation jobs.
///
/// A spawner that cannot start a job returns an error and drops the job
/// without running it; dropping it releases the job's budget slot.
pub trait JobSpawner {
    fn spawn(&self, name: String, job: Job) -> std::io::Result<()>;
}

/// Runs every job on its own named OS thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl JobSpawner for ThreadSpawner {
    fn spawn(&self, name: String, job: Job) -> std::io::Result<()> {
        std::thread::Builder::new().name(name).spawn(job).map(|_| ())
    }
}

/// Runs each job to completion inside `spawn`. Deterministic; useful for
/// headless hosts and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineSpawner;

impl JobSpawner for InlineSpawner {
    fn spawn(&self, _name: String, job: Job) -> std::io::Result<()> {
        job();
        Ok(())
    }
}

/// Queues jobs until the host runs them explicitly.
///
/// Clones share one queue, so a test can keep a handle while the streamer
/// owns another.
#[derive(Clone, Default)]
pub struct ManualSpawner {
    queue: Arc<Mutex<VecDeque<(String, Job)>>>,
}

impl ManualSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<(String, Job)>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of jobs waiting to run.
    pub fn queued(&self) -> usize {
        self.lock().len()
    }

    /// Names of the waiting jobs, oldest first.
    pub fn queued_names(&self) -> Vec<String> {
        self.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Run the oldest queued job. Returns its name.
    pub fn run_next(&self) -> Option<String> {
        let (name, job) = self.lock().pop_front()?;
        job();
        Some(name)
    }

    /// Run every queued job, including any queued while running. Returns the count.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next().is_some() {
            ran += 1;
        }
        ran
    }

    /// Drop every queued job without running it.
    pub fn discard_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain(..).collect();
        drained.len()
    }
}

impl JobSpawner for ManualSpawner {
    fn spawn(&self, name: String, job: Job) -> std::io::Result<()> {
        self.lock().push_back((name, job));
        Ok(())
    }
}

/// One unit of the worker budget. Held by a job for its whole lifetime and
/// released on drop, whether the job finished, panicked, or never started.
struct BudgetSlot(Arc<AtomicUsize>);

impl BudgetSlot {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for BudgetSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A finished generation job.
#[derive(Debug)]
pub struct Completion {
    pub coord: GridCoord,
    pub job: JobId,
    /// `None` when the job was dropped before producing a payload.
    pub payload: Option<Arc<TilePayload>>,
    pub elapsed: Duration,
}

/// Owned by a job closure. Publishes exactly one [`Completion`] per job:
/// the payload if [`Reporter::deliver`] ran, a failure otherwise.
struct Reporter {
    tx: Sender<Completion>,
    coord: GridCoord,
    job: JobId,
    start: Instant,
    delivered: bool,
    // Released after the completion is queued.
    _slot: BudgetSlot,
}

impl Reporter {
    fn publish(&self, payload: Option<Arc<TilePayload>>) {
        // The receiver only disappears with the pool; nothing to report to then.
        let _ = self.tx.send(Completion {
            coord: self.coord,
            job: self.job,
            payload,
            elapsed: self.start.elapsed(),
        });
    }

    fn deliver(mut self, payload: TilePayload) {
        self.delivered = true;
        self.publish(Some(Arc::new(payload)));
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if !self.delivered {
            tracing::warn!(
                coord = %self.coord,
                job = self.job,
                "generation job dropped unfinished"
            );
            self.publish(None);
        }
    }
}

/// Dispatches payload synthesis under a concurrency budget and collects the
/// results on a single-consumer completion queue.
///
/// Workers only read the shared field and write into their own payload; the
/// tick thread is the only reader of the queue.
pub struct GenerationPool<S = ThreadSpawner> {
    field: Arc<NoiseField>,
    settings: SynthSettings,
    spawner: S,
    capacity: usize,
    active: Arc<AtomicUsize>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl<S: JobSpawner> GenerationPool<S> {
    pub fn new(
        field: Arc<NoiseField>,
        settings: SynthSettings,
        capacity: usize,
        spawner: S,
    ) -> Self {
        let (tx, rx) = unbounded();
        Self {
            field,
            settings,
            spawner,
            capacity,
            active: Arc::new(AtomicUsize::new(0)),
            tx,
            rx,
        }
    }

    /// Jobs dispatched and not yet finished.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn has_capacity(&self) -> bool {
        self.active() < self.capacity
    }

    pub fn field(&self) -> &Arc<NoiseField> {
        &self.field
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Start generating `coord` as job `job`. The budget slot is taken before
    /// the spawn and given back if the spawner refuses the job.
    ///
    /// Every dispatched job publishes one completion. A job that panics, is
    /// discarded by its spawner, or is refused publishes one without a payload.
    pub fn dispatch(&self, coord: GridCoord, job: JobId) -> Result<(), StreamError> {
        let reporter = Reporter {
            tx: self.tx.clone(),
            coord,
            job,
            start: Instant::now(),
            delivered: false,
            _slot: BudgetSlot::acquire(&self.active),
        };
        let field = Arc::clone(&self.field);
        let settings = self.settings;

        let work: Job = Box::new(move || {
            let payload = synthesize(&field, coord, &settings);
            reporter.deliver(payload);
        });

        self.spawner
            .spawn(format!("terrain-gen {},{}", coord.x, coord.z), work)
            .map_err(|source| StreamError::Dispatch { coord, source })?;

        tracing::debug!(%coord, job, active = self.active(), "generation job dispatched");
        Ok(())
    }

    /// Take every completion published so far without blocking.
    pub fn drain_completions(&self) -> Vec<Completion> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Refuses every job, like a host that has run out of threads.
    struct RefusingSpawner;

    impl JobSpawner for RefusingSpawner {
        fn spawn(&self, _name: String, _job: Job) -> io::Result<()> {
            Err(io::Error::other("thread limit reached"))
        }
    }

    fn pool<S: JobSpawner>(capacity: usize, spawner: S) -> GenerationPool<S> {
        let settings = SynthSettings {
            height_map_resolution: 9,
            alpha_map_resolution: 8,
            noise_scale: 20.0,
            noise_phase: 0.0,
        };
        GenerationPool::new(Arc::new(NoiseField::with_seed(0)), settings, capacity, spawner)
    }

    #[test]
    fn inline_job_completes_and_releases_budget() {
        let p = pool(2, InlineSpawner);
        p.dispatch(GridCoord::new(250, 250), 17).unwrap();
        assert_eq!(p.active(), 0);

        let done = p.drain_completions();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].job, 17);
        assert_eq!(done[0].coord, GridCoord::new(250, 250));
        let payload = done[0].payload.as_ref().unwrap();
        assert_eq!(payload.heights.resolution(), 9);
    }

    #[test]
    fn manual_jobs_hold_budget_until_run() {
        let spawner = ManualSpawner::new();
        let p = pool(2, spawner.clone());
        p.dispatch(GridCoord::new(0, 0), 0).unwrap();
        p.dispatch(GridCoord::new(1, 0), 1).unwrap();
        assert_eq!(p.active(), 2);
        assert!(!p.has_capacity());
        assert!(p.drain_completions().is_empty());

        assert_eq!(spawner.run_next().as_deref(), Some("terrain-gen 0,0"));
        assert_eq!(p.active(), 1);
        assert!(p.has_capacity());

        spawner.run_all();
        assert_eq!(p.active(), 0);
        assert_eq!(p.drain_completions().len(), 2);
    }

    #[test]
    fn refused_dispatch_releases_budget() {
        let p = pool(1, RefusingSpawner);
        let err = p.dispatch(GridCoord::new(3, 3), 0).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Dispatch { coord, .. } if coord == GridCoord::new(3, 3)
        ));
        assert_eq!(p.active(), 0);
        assert!(p.has_capacity());

        let done = p.drain_completions();
        assert_eq!(done.len(), 1);
        assert!(done[0].payload.is_none());
    }

    #[test]
    fn discarded_jobs_release_budget() {
        let spawner = ManualSpawner::new();
        let p = pool(1, spawner.clone());
        p.dispatch(GridCoord::new(0, 0), 4).unwrap();
        assert_eq!(spawner.discard_all(), 1);
        assert_eq!(p.active(), 0);

        let done = p.drain_completions();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].job, 4);
        assert!(done[0].payload.is_none());
    }

    #[test]
    fn job_lost_to_a_panic_publishes_failure() {
        /// Panics while holding the job, like a worker thread dying mid-flight.
        struct PanickingSpawner;

        impl JobSpawner for PanickingSpawner {
            fn spawn(&self, _name: String, job: Job) -> io::Result<()> {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                    let _job = job;
                    panic!("worker crashed");
                }));
                assert!(result.is_err());
                Ok(())
            }
        }

        let p = pool(1, PanickingSpawner);
        p.dispatch(GridCoord::new(2, 2), 9).unwrap();
        assert_eq!(p.active(), 0);
        let done = p.drain_completions();
        assert_eq!(done.len(), 1);
        assert!(done[0].payload.is_none());
    }

    #[test]
    fn thread_spawner_publishes_completion() {
        let p = pool(1, ThreadSpawner);
        p.dispatch(GridCoord::new(250, 251), 5).unwrap();
        let done = p
            .rx
            .recv_timeout(Duration::from_secs(30))
            .expect("worker should finish");
        assert_eq!(done.coord, GridCoord::new(250, 251));
        assert!(done.payload.is_some());
    }
}
