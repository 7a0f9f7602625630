mod edit;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use hashbrown::{HashMap, HashSet};
use strata_chunk::{Chunk, ChunkField, ChunkPool, ChunkPoolStats, ChunkState};
use strata_geom::Vec3;
use strata_mesh_cpu::{ChunkMesh, ChunkMesher, MeshOptions};
use strata_world::voxel::ChunkCoord;
use strata_world::{ColumnCacheStats, FieldGenerator, MeshingMode, TerrainSource, WorldConfig};

use crate::jobs::{GenJob, GenOut, GenStatus, GenWorkers, resolve_workers};
use crate::policy::{LodPolicy, desired_set, loaded_footprint_bytes};
use crate::sampler::NeighborSampler;

/// Fully loaded render discs above this size get a warning at startup.
const LARGE_FOOTPRINT_BYTES: u64 = 4 << 30;

/// `(loaded, pending, voxel estimate)` snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkStats {
    /// Chunks holding a generated field.
    pub loaded: usize,
    /// Desired chunks waiting for, or running, generation.
    pub pending: usize,
    pub voxel_estimate: u64,
}

/// What one [`ChunkStore::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub generation_started: usize,
    pub meshes_built: usize,
    pub policy_updated: bool,
}

/// Outbound notifications for a rendering consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshEvent {
    /// A new mesh replaced the chunk's previous one; fetch it with [`ChunkStore::mesh`].
    Updated { coord: ChunkCoord, collision: bool },
    /// The chunk was retired and its mesh dropped.
    Removed(ChunkCoord),
}

struct Inflight {
    coord: ChunkCoord,
    cancel: Arc<AtomicBool>,
}

/// Owns every loaded chunk, both work queues and the pool. All mutation happens on the caller's
/// thread; background workers only ever hold a job's field buffers.
pub struct ChunkStore {
    cfg: WorldConfig,
    size: usize,
    voxel_size: f32,
    source: Option<Arc<dyn TerrainSource>>,
    chunks: HashMap<ChunkCoord, Chunk>,
    meshes: HashMap<ChunkCoord, ChunkMesh>,
    events: Vec<MeshEvent>,
    desired: HashSet<ChunkCoord>,
    gen_queue: VecDeque<ChunkCoord>,
    mesh_queue: VecDeque<ChunkCoord>,
    mesh_queued: HashSet<ChunkCoord>,
    retry: Vec<ChunkCoord>,
    inflight: HashMap<u64, Inflight>,
    /// Retired chunks whose generation job has not reported back yet, by job id.
    retiring: HashMap<u64, Chunk>,
    next_job_id: u64,
    workers: Option<GenWorkers>,
    pool: ChunkPool,
    mesher: ChunkMesher,
    policy: LodPolicy,
    center: Option<ChunkCoord>,
    since_policy: Duration,
    warned_missing_source: bool,
    shut_down: bool,
}

impl ChunkStore {
    /// A store over `source`. Without a source nothing is ever generated; the store still answers
    /// queries with open defaults.
    pub fn new(cfg: &WorldConfig, source: Option<Arc<dyn TerrainSource>>) -> Self {
        let size = cfg.chunk_size();
        let workers = match (&source, cfg.streaming.async_generation) {
            (Some(src), true) => {
                match GenWorkers::new(src.clone(), resolve_workers(cfg.streaming.workers)) {
                    Ok(w) => Some(w),
                    Err(e) => {
                        log::warn!("generation thread pool unavailable ({e}); generating synchronously");
                        None
                    }
                }
            }
            _ => None,
        };
        if source.is_none() {
            log::warn!("chunk store created without a terrain source; generation disabled");
        }
        let footprint = loaded_footprint_bytes(cfg);
        if footprint as u64 > LARGE_FOOTPRINT_BYTES {
            log::warn!(
                "render disc needs ~{} MiB of chunk fields (render_distance={}, height_chunks={})",
                footprint >> 20,
                cfg.world.render_distance,
                cfg.world.height_chunks
            );
        }
        log::info!(
            target: "events",
            "chunk store init: chunk_size={} voxel_size={} render_distance={} height_chunks={} mode={:?} async={}",
            size,
            cfg.world.voxel_size,
            cfg.world.render_distance,
            cfg.world.height_chunks,
            cfg.meshing.mode,
            workers.is_some()
        );
        Self {
            cfg: cfg.clone(),
            size,
            voxel_size: cfg.world.voxel_size,
            source,
            chunks: HashMap::new(),
            meshes: HashMap::new(),
            events: Vec::new(),
            desired: HashSet::new(),
            gen_queue: VecDeque::new(),
            mesh_queue: VecDeque::new(),
            mesh_queued: HashSet::new(),
            retry: Vec::new(),
            inflight: HashMap::new(),
            retiring: HashMap::new(),
            next_job_id: 1,
            workers,
            pool: ChunkPool::new(cfg.streaming.pool_capacity),
            mesher: ChunkMesher::new(MeshOptions::from_config(cfg)),
            policy: LodPolicy::from_config(cfg),
            center: None,
            since_policy: Duration::ZERO,
            warned_missing_source: false,
            shut_down: false,
        }
    }

    /// A store backed by a fresh [`FieldGenerator`] for `cfg`.
    pub fn with_generator(cfg: &WorldConfig) -> Self {
        let source: Arc<dyn TerrainSource> = Arc::new(FieldGenerator::new(cfg));
        Self::new(cfg, Some(source))
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.cfg
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    #[inline]
    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    pub fn source(&self) -> Option<&dyn TerrainSource> {
        self.source.as_deref()
    }

    pub fn is_async(&self) -> bool {
        self.workers.is_some()
    }

    // --- streaming ---

    /// Moves the observer. When the chunk under `position` changes, the desired set is rebuilt:
    /// chunks that left it are retired at once and new ones are queued closest-first.
    pub fn set_load_center(&mut self, position: Vec3) {
        if self.shut_down {
            return;
        }
        let center = self.world_to_chunk_coord(position);
        if self.center == Some(center) {
            return;
        }
        self.center = Some(center);
        let wanted = desired_set(center, self.cfg.world.render_distance, self.cfg.world.height_chunks);
        self.desired = wanted.iter().copied().collect();

        let stale: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|c| !self.desired.contains(*c))
            .copied()
            .collect();
        let retired = stale.len();
        for coord in stale {
            self.retire(coord);
        }
        self.gen_queue = wanted
            .into_iter()
            .filter(|c| !self.chunks.contains_key(c))
            .collect();
        log::debug!(
            target: "events",
            "load center {}: desired={} queued={} retired={}",
            center,
            self.desired.len(),
            self.gen_queue.len(),
            retired
        );
    }

    fn retire(&mut self, coord: ChunkCoord) {
        let Some(mut chunk) = self.chunks.remove(&coord) else {
            return;
        };
        self.mesh_queued.remove(&coord);
        if self.meshes.remove(&coord).is_some() {
            self.events.push(MeshEvent::Removed(coord));
        }
        log::trace!(target: "events", "unload {}", coord);
        let job = chunk.job;
        match job {
            Some(id) => {
                if let Some(job) = self.inflight.remove(&id) {
                    job.cancel.store(true, Ordering::Relaxed);
                }
                chunk.state = ChunkState::PendingUnload;
                self.retiring.insert(id, chunk);
            }
            None => {
                self.pool.release(chunk);
            }
        }
    }

    /// Applies every finished background job. Returns how many results were received.
    pub fn poll_generation(&mut self) -> usize {
        let Some(workers) = self.workers.as_mut() else {
            return 0;
        };
        let results = workers.drain_results();
        let n = results.len();
        for out in results {
            self.apply_gen_result(out);
        }
        n
    }

    fn apply_gen_result(&mut self, out: GenOut) {
        if let Some(mut chunk) = self.retiring.remove(&out.job_id) {
            chunk.recycle_field(out.field);
            self.pool.release(chunk);
            return;
        }
        let Some(job) = self.inflight.remove(&out.job_id) else {
            log::debug!("dropping result for unknown job {}", out.job_id);
            return;
        };
        let coord = job.coord;
        let owned = self
            .chunks
            .get(&coord)
            .is_some_and(|c| c.job == Some(out.job_id));
        if !owned {
            return;
        }
        match out.status {
            GenStatus::Completed => {
                if let Some(chunk) = self.chunks.get_mut(&coord) {
                    chunk.job = None;
                    chunk.install_field(out.field);
                }
                log::trace!(target: "events", "generated {} in {}us", coord, out.t_gen_us);
                self.enqueue_mesh(coord);
            }
            GenStatus::Cancelled => {
                // Still wanted: try again later.
                if let Some(mut chunk) = self.chunks.remove(&coord) {
                    chunk.recycle_field(out.field);
                    self.pool.release(chunk);
                }
                if self.desired.contains(&coord) {
                    self.gen_queue.push_front(coord);
                }
            }
        }
    }

    /// Starts generation for up to `max` queued coordinates, closest first.
    pub fn drain_generation_queue(&mut self, max: usize) -> usize {
        self.poll_generation();
        if self.source.is_none() {
            if !self.gen_queue.is_empty() && !self.warned_missing_source {
                log::warn!(
                    "no terrain source; {} chunk(s) stay ungenerated",
                    self.gen_queue.len()
                );
                self.warned_missing_source = true;
            }
            return 0;
        }
        let mut started = 0;
        while started < max {
            let Some(coord) = self.gen_queue.pop_front() else {
                break;
            };
            if self.chunks.contains_key(&coord) || !self.desired.contains(&coord) {
                continue;
            }
            let mut chunk = self.pool.acquire(coord, self.size);
            if let Some(center) = self.center {
                apply_policy(&self.policy, self.mesher.opts.mode, center, &mut chunk);
            }
            chunk.state = ChunkState::Loading;
            let field = chunk.take_field_for_generation();
            if self.workers.is_some() {
                self.submit_generation(chunk, field);
            } else {
                self.generate_now(chunk, field);
            }
            started += 1;
        }
        started
    }

    fn submit_generation(&mut self, mut chunk: Chunk, field: ChunkField) {
        let coord = chunk.coord;
        let job_id = self.next_job_id;
        let cancel = Arc::new(AtomicBool::new(false));
        let job = GenJob {
            coord,
            job_id,
            origin: chunk.origin(),
            size: self.size,
            field,
            cancel: cancel.clone(),
        };
        let Some(workers) = self.workers.as_mut() else {
            self.generate_now(chunk, job.field);
            return;
        };
        match workers.submit(job) {
            Ok(()) => {
                self.next_job_id += 1;
                chunk.job = Some(job_id);
                self.inflight.insert(job_id, Inflight { coord, cancel });
                self.chunks.insert(coord, chunk);
            }
            Err(job) => {
                log::warn!("generation lane closed; generating {} synchronously", coord);
                self.generate_now(chunk, job.field);
            }
        }
    }

    fn generate_now(&mut self, mut chunk: Chunk, mut field: ChunkField) {
        let coord = chunk.coord;
        let Some(source) = self.source.clone() else {
            chunk.recycle_field(field);
            self.pool.release(chunk);
            return;
        };
        source.fill_chunk(chunk.origin(), self.size, &mut field.density, &mut field.material, &|| false);
        chunk.install_field(field);
        self.chunks.insert(coord, chunk);
        self.enqueue_mesh(coord);
    }

    fn enqueue_mesh(&mut self, coord: ChunkCoord) {
        if self.mesh_queued.insert(coord) {
            self.mesh_queue.push_back(coord);
        }
    }

    /// Rebuilds up to `max` queued meshes. Chunks still generating go to the back of the queue;
    /// clean chunks are skipped. Returns how many meshes were built.
    pub fn drain_mesh_queue(&mut self, max: usize) -> usize {
        self.poll_generation();
        let mut built = 0;
        let mut popped = 0;
        while popped < max {
            let Some(coord) = self.mesh_queue.pop_front() else {
                break;
            };
            popped += 1;
            let Some(chunk) = self.chunks.get(&coord) else {
                self.mesh_queued.remove(&coord);
                continue;
            };
            if !chunk.state.has_field() {
                self.retry.push(coord);
                continue;
            }
            self.mesh_queued.remove(&coord);
            if !chunk.is_dirty() {
                continue;
            }
            self.rebuild(coord);
            built += 1;
        }
        self.mesh_queue.extend(self.retry.drain(..));
        built
    }

    fn rebuild(&mut self, coord: ChunkCoord) {
        let neighbors: [Option<ChunkCoord>; 6] = std::array::from_fn(|i| {
            let n = coord.neighbor(i);
            self.chunks.get(&n).filter(|c| c.has_field()).map(|_| n)
        });
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        chunk.neighbors = neighbors;
        let Some(chunk) = self.chunks.get(&coord) else {
            return;
        };
        let outside = NeighborSampler::new(&self.chunks, self.source.as_deref(), coord, self.size);
        let mesh = self.mesher.build(chunk, &outside);
        let collision = mesh.collision;
        log::trace!(
            target: "events",
            "meshed {} lod={} tris={}",
            coord,
            mesh.lod,
            mesh.buffer.triangle_count()
        );
        self.meshes.insert(coord, mesh);
        if let Some(chunk) = self.chunks.get_mut(&coord) {
            chunk.mark_built();
        }
        self.events.push(MeshEvent::Updated { coord, collision });
    }

    /// Re-evaluates LOD and collision tiers for every loaded chunk and queues the ones that changed.
    pub fn update_policies(&mut self) -> usize {
        let Some(center) = self.center else {
            return 0;
        };
        let mode = self.mesher.opts.mode;
        let mut changed = Vec::new();
        for (coord, chunk) in self.chunks.iter_mut() {
            if apply_policy(&self.policy, mode, center, chunk) && chunk.state.has_field() {
                changed.push(*coord);
            }
        }
        let n = changed.len();
        for coord in changed {
            self.enqueue_mesh(coord);
        }
        if n > 0 {
            log::debug!("policy update: {} chunk(s) changed tier", n);
        }
        n
    }

    /// One frame: the policy pass on its cadence, then both drains with the configured caps.
    pub fn tick(&mut self, dt: Duration) -> TickReport {
        let mut report = TickReport::default();
        if self.shut_down {
            return report;
        }
        self.since_policy += dt;
        if self.since_policy >= Duration::from_millis(self.cfg.streaming.policy_interval_ms) {
            self.since_policy = Duration::ZERO;
            self.update_policies();
            report.policy_updated = true;
        }
        report.generation_started = self.drain_generation_queue(self.cfg.streaming.chunks_per_frame);
        report.meshes_built = self.drain_mesh_queue(self.cfg.streaming.meshes_per_frame);
        report
    }

    /// Nothing queued, in flight or waiting for a mesh.
    pub fn is_idle(&self) -> bool {
        self.gen_queue.is_empty() && self.inflight.is_empty() && self.mesh_queue.is_empty()
    }

    /// Cancels outstanding generation, waits for it with the configured timeout and releases every
    /// chunk. A timeout is logged and shutdown proceeds.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Some(mut workers) = self.workers.take() {
            let timeout = Duration::from_millis(self.cfg.streaming.shutdown_timeout_ms);
            let (results, _complete) = workers.shutdown(timeout);
            for out in results {
                if let Some(mut chunk) = self.retiring.remove(&out.job_id) {
                    chunk.recycle_field(out.field);
                    self.pool.release(chunk);
                }
            }
        }
        let released = self.chunks.len();
        self.chunks.clear();
        self.meshes.clear();
        self.retiring.clear();
        self.inflight.clear();
        self.desired.clear();
        self.gen_queue.clear();
        self.mesh_queue.clear();
        self.mesh_queued.clear();
        self.retry.clear();
        self.pool.clear();
        self.center = None;
        log::info!(target: "events", "chunk store shut down; released {} chunk(s)", released);
    }

    // --- queries ---

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn mesh(&self, coord: ChunkCoord) -> Option<&ChunkMesh> {
        self.meshes.get(&coord)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &ChunkMesh> {
        self.meshes.values()
    }

    /// Mesh notifications since the last call.
    pub fn take_mesh_events(&mut self) -> Vec<MeshEvent> {
        std::mem::take(&mut self.events)
    }

    /// Flags a loaded chunk for rebuild. Returns false when the chunk is not loaded.
    pub fn mark_dirty(&mut self, coord: ChunkCoord) -> bool {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        chunk.mark_dirty();
        self.enqueue_mesh(coord);
        true
    }

    /// Drops every pooled chunk. Returns how many were freed.
    pub fn force_cleanup(&mut self) -> usize {
        let n = self.pool.clear();
        log::debug!("chunk pool cleared: {} chunk(s) freed", n);
        n
    }

    pub fn pool_stats(&self) -> ChunkPoolStats {
        self.pool.stats()
    }

    pub fn column_cache_stats(&self) -> Option<ColumnCacheStats> {
        self.source.as_ref().and_then(|s| s.column_cache_stats())
    }

    /// Terrain surface height at world `(x, y)`, in world units.
    pub fn terrain_height_at(&self, x: f32, y: f32) -> f32 {
        let vx = (x / self.voxel_size).floor() as i32;
        let vy = (y / self.voxel_size).floor() as i32;
        let h = match self.source.as_ref() {
            Some(s) => s.surface_height(vx, vy),
            None => self.cfg.terrain.base_height,
        };
        h * self.voxel_size
    }

    pub fn chunk_stats(&self) -> ChunkStats {
        let loaded = self.chunks.values().filter(|c| c.has_field()).count();
        let queued = self
            .gen_queue
            .iter()
            .filter(|c| !self.chunks.contains_key(*c))
            .count();
        let n = self.size as u64;
        ChunkStats {
            loaded,
            pending: queued + self.inflight.len(),
            voxel_estimate: loaded as u64 * n * n * n,
        }
    }

    /// Bytes held by chunk fields (live, retiring and pooled) plus mesh buffers.
    pub fn memory_usage_estimate(&self) -> usize {
        let chunks: usize = self.chunks.values().map(Chunk::memory_bytes).sum();
        let retiring: usize = self.retiring.values().map(Chunk::memory_bytes).sum();
        let meshes: usize = self.meshes.values().map(|m| m.buffer.memory_bytes()).sum();
        chunks + retiring + meshes + self.pool.memory_bytes()
    }
}

impl Drop for ChunkStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Updates a chunk's LOD and collision tier for `center`. Returns whether either changed; a change
/// dirties the chunk. Blocky meshing has no LOD, so only collision can change there.
fn apply_policy(policy: &LodPolicy, mode: MeshingMode, center: ChunkCoord, chunk: &mut Chunk) -> bool {
    let d = chunk.coord.horizontal_distance(center);
    let lod = match mode {
        MeshingMode::Smooth => policy.lod_for(d),
        MeshingMode::Blocky => 0,
    };
    let collision = policy.collision_for(d);
    if lod == chunk.lod && collision == chunk.collision {
        return false;
    }
    chunk.lod = lod;
    chunk.collision = collision;
    chunk.mark_dirty();
    true
}
