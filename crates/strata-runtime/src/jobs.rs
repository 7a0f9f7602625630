use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use strata_chunk::ChunkField;
use strata_world::TerrainSource;
use strata_world::voxel::ChunkCoord;

pub struct GenJob {
    pub coord: ChunkCoord,
    pub job_id: u64,
    pub origin: [i32; 3],
    pub size: usize,
    /// Buffers moved out of the chunk; they come back in [`GenOut::field`].
    pub field: ChunkField,
    /// Set when the owning chunk is retired.
    pub cancel: Arc<AtomicBool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenStatus {
    Completed,
    Cancelled,
}

pub struct GenOut {
    pub coord: ChunkCoord,
    pub job_id: u64,
    pub field: ChunkField,
    pub status: GenStatus,
    pub t_gen_us: u32,
}

fn process_gen_job(job: GenJob, source: &dyn TerrainSource, cancel_all: &AtomicBool, tx: &Sender<GenOut>) {
    let GenJob {
        coord,
        job_id,
        origin,
        size,
        mut field,
        cancel,
    } = job;
    let cancelled = || cancel_all.load(Ordering::Relaxed) || cancel.load(Ordering::Relaxed);
    let t0 = Instant::now();
    let status = if cancelled() {
        GenStatus::Cancelled
    } else {
        let filled = source.fill_chunk(origin, size, &mut field.density, &mut field.material, &cancelled);
        if filled && !cancelled() {
            GenStatus::Completed
        } else {
            GenStatus::Cancelled
        }
    };
    let t_gen_us = t0.elapsed().as_micros().min(u128::from(u32::MAX)) as u32;
    let _ = tx.send(GenOut {
        coord,
        job_id,
        field,
        status,
        t_gen_us,
    });
}

/// Background generation lane. Every submitted job produces exactly one [`GenOut`], completed or
/// cancelled, which is what [`GenWorkers::shutdown`] waits for.
pub struct GenWorkers {
    job_tx: Option<Sender<GenJob>>,
    res_rx: Receiver<GenOut>,
    _pool: ThreadPool,
    cancel_all: Arc<AtomicBool>,
    /// Submitted minus received; only touched by the owning thread.
    outstanding: usize,
    pub workers: usize,
}

/// Worker count for a configured value, where 0 means one per spare core.
pub fn resolve_workers(configured: usize) -> usize {
    if configured > 0 {
        return configured;
    }
    thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(4)
        .max(1)
}

impl GenWorkers {
    pub fn new(source: Arc<dyn TerrainSource>, workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("strata-gen-{i}"))
            .build()?;
        let (job_tx, job_rx) = unbounded::<GenJob>();
        let (res_tx, res_rx) = unbounded::<GenOut>();
        let cancel_all = Arc::new(AtomicBool::new(false));
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let source = source.clone();
            let cancel_all = cancel_all.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    process_gen_job(job, source.as_ref(), &cancel_all, &tx);
                }
            });
        }
        log::info!(target: "events", "generation workers started: {}", workers);
        Ok(Self {
            job_tx: Some(job_tx),
            res_rx,
            _pool: pool,
            cancel_all,
            outstanding: 0,
            workers,
        })
    }

    /// Queues a job. On a closed lane the job comes back to the caller.
    pub fn submit(&mut self, job: GenJob) -> Result<(), GenJob> {
        let Some(tx) = self.job_tx.as_ref() else {
            return Err(job);
        };
        match tx.send(job) {
            Ok(()) => {
                self.outstanding += 1;
                Ok(())
            }
            Err(e) => Err(e.into_inner()),
        }
    }

    pub fn drain_results(&mut self) -> Vec<GenOut> {
        let out: Vec<GenOut> = self.res_rx.try_iter().collect();
        self.outstanding = self.outstanding.saturating_sub(out.len());
        out
    }

    /// Jobs submitted whose result has not been drained yet.
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Signals every queued and running job to stop early.
    pub fn cancel_all(&self) {
        self.cancel_all.store(true, Ordering::Relaxed);
    }

    /// Cancels everything, closes the lane and waits up to `timeout` for every outstanding result.
    /// Returns the results received and whether the wait completed.
    pub fn shutdown(&mut self, timeout: Duration) -> (Vec<GenOut>, bool) {
        self.cancel_all();
        self.job_tx = None;
        let deadline = Instant::now() + timeout;
        let mut out = Vec::with_capacity(self.outstanding);
        while self.outstanding > 0 {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.res_rx.recv_timeout(deadline - now) {
                Ok(res) => {
                    self.outstanding -= 1;
                    out.push(res);
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        let complete = self.outstanding == 0;
        if !complete {
            log::warn!(
                target: "events",
                "generation shutdown timed out after {:?} with {} job(s) outstanding",
                timeout,
                self.outstanding
            );
        }
        (out, complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_world::voxel::VoxelKind;

    struct Slow;

    impl TerrainSource for Slow {
        fn density(&self, _x: i32, _y: i32, z: i32) -> f32 {
            thread::sleep(Duration::from_micros(50));
            if z <= 2 { -1.0 } else { 1.0 }
        }

        fn material(&self, _x: i32, _y: i32, z: i32) -> VoxelKind {
            if z <= 2 { VoxelKind::Stone } else { VoxelKind::Air }
        }

        fn surface_height(&self, _x: i32, _y: i32) -> f32 {
            2.0
        }
    }

    fn job(id: u64, cancel: Arc<AtomicBool>) -> GenJob {
        let mut field = ChunkField::default();
        field.resize_zeroed(4);
        GenJob {
            coord: ChunkCoord::new(id as i32, 0, 0),
            job_id: id,
            origin: [id as i32 * 4, 0, 0],
            size: 4,
            field,
            cancel,
        }
    }

    #[test]
    fn every_job_reports_once() {
        let mut w = GenWorkers::new(Arc::new(Slow), 2).unwrap();
        let retired = Arc::new(AtomicBool::new(true));
        for id in 0..6 {
            let flag = if id == 3 {
                retired.clone()
            } else {
                Arc::new(AtomicBool::new(false))
            };
            assert!(w.submit(job(id, flag)).is_ok());
        }
        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while seen.len() < 6 && Instant::now() < deadline {
            seen.extend(w.drain_results());
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(w.outstanding(), 0);
        for out in &seen {
            let expected = if out.job_id == 3 {
                GenStatus::Cancelled
            } else {
                GenStatus::Completed
            };
            assert_eq!(out.status, expected);
            assert!(out.field.is_sized_for(4));
        }
    }

    #[test]
    fn shutdown_collects_outstanding_results() {
        let mut w = GenWorkers::new(Arc::new(Slow), 1).unwrap();
        for id in 0..4 {
            assert!(w.submit(job(id, Arc::new(AtomicBool::new(false)))).is_ok());
        }
        let (out, complete) = w.shutdown(Duration::from_secs(10));
        assert!(complete);
        assert_eq!(out.len(), 4);
        assert!(w.submit(job(9, Arc::new(AtomicBool::new(false)))).is_err());
    }

    #[test]
    fn configured_workers_win_over_auto() {
        assert_eq!(resolve_workers(3), 3);
        assert!(resolve_workers(0) >= 1);
    }
}
