use std::error::Error;
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use strata_geom::Vec3;
use strata_runtime::{ChunkStore, MeshEvent, loaded_footprint_bytes};
use strata_world::WorldConfig;

#[derive(clap::Args, Debug)]
pub struct StreamArgs {
    /// Frames to simulate.
    #[arg(long, default_value_t = 600)]
    pub ticks: u32,
    /// Simulated frame length in milliseconds.
    #[arg(long, default_value_t = 16)]
    pub frame_ms: u64,
    /// Observer speed along +X, in chunks per second.
    #[arg(long, default_value_t = 1.0)]
    pub speed: f32,
    /// Generate on the main thread even if the config enables workers.
    #[arg(long)]
    pub sync: bool,
    /// Reload the config file when it changes and rebuild the world.
    #[arg(long)]
    pub watch: bool,
    /// Carve a crater under the observer every N frames (0 disables).
    #[arg(long, default_value_t = 0)]
    pub sculpt_every: u32,
    /// Sleep out the rest of each frame instead of running flat out.
    #[arg(long)]
    pub realtime: bool,
    /// Shrink the render distance until a fully loaded disc fits in this many MiB (0 disables).
    #[arg(long, default_value_t = 1024)]
    pub max_memory_mb: usize,
}

#[derive(Default, Debug)]
struct Totals {
    meshes: usize,
    removed: usize,
    triangles: usize,
    craters: usize,
}

/// Lowers `render_distance` until the loaded disc fits `budget_mb`. Returns whether it changed.
fn fit_render_distance(cfg: &mut WorldConfig, budget_mb: usize) -> bool {
    if budget_mb == 0 {
        return false;
    }
    let budget = budget_mb.saturating_mul(1 << 20);
    let requested = cfg.world.render_distance;
    while cfg.world.render_distance > 1 && loaded_footprint_bytes(cfg) > budget {
        cfg.world.render_distance -= 1;
    }
    if cfg.world.render_distance == requested {
        return false;
    }
    log::warn!(
        "render_distance {} needs more than {} MiB; streaming with {} (~{} MiB)",
        requested,
        budget_mb,
        cfg.world.render_distance,
        loaded_footprint_bytes(cfg) >> 20
    );
    true
}

fn build_store(cfg: &WorldConfig, opts: &StreamArgs) -> ChunkStore {
    let mut cfg = cfg.clone();
    if opts.sync {
        cfg.streaming.async_generation = false;
    }
    fit_render_distance(&mut cfg, opts.max_memory_mb);
    ChunkStore::with_generator(&cfg)
}

fn watch_config(path: &Path) -> Result<(RecommendedWatcher, Receiver<()>), notify::Error> {
    let (tx, rx) = mpsc::channel::<()>();
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res {
            match event.kind {
                EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any => {
                    let _ = tx.send(());
                }
                _ => {}
            }
        }
    })?;
    watcher.watch(path, RecursiveMode::NonRecursive)?;
    log::info!("watching {} for changes", path.display());
    Ok((watcher, rx))
}

/// Swaps in a world built from the file on disk. A bad file keeps the current world.
fn reload(path: &Path, store: &mut ChunkStore, opts: &StreamArgs) {
    match WorldConfig::load(path) {
        Ok(cfg) => {
            store.shutdown();
            *store = build_store(&cfg, opts);
            log::info!(target: "events", "world rebuilt from {}", path.display());
        }
        Err(e) => log::warn!("config reload failed, keeping current world: {e}"),
    }
}

fn collect(store: &mut ChunkStore, totals: &mut Totals) {
    for event in store.take_mesh_events() {
        match event {
            MeshEvent::Updated { coord, .. } => {
                totals.meshes += 1;
                totals.triangles += store.mesh(coord).map_or(0, |m| m.buffer.triangle_count());
            }
            MeshEvent::Removed(_) => totals.removed += 1,
        }
    }
}

/// Ticks until outstanding work finishes or `limit` passes.
fn settle(store: &mut ChunkStore, dt: Duration, limit: Duration) {
    let deadline = Instant::now() + limit;
    while !store.is_idle() && Instant::now() < deadline {
        store.tick(dt);
        thread::sleep(Duration::from_millis(1));
    }
}

pub fn run(cfg: WorldConfig, path: Option<&Path>, opts: &StreamArgs) -> Result<(), Box<dyn Error>> {
    let mut store = build_store(&cfg, opts);
    let watch = match (opts.watch, path) {
        (true, Some(p)) => Some(watch_config(p)?),
        (true, None) => {
            log::warn!("--watch needs --config; not watching");
            None
        }
        _ => None,
    };

    let dt = Duration::from_millis(opts.frame_ms.max(1));
    let mut x = 0.0f32;
    let y = 0.0f32;
    let mut totals = Totals::default();
    let started = Instant::now();

    for frame in 0..opts.ticks {
        let frame_start = Instant::now();
        if let (Some((_, rx)), Some(p)) = (&watch, path) {
            if rx.try_iter().count() > 0 {
                reload(p, &mut store, opts);
            }
        }
        let vs = store.voxel_size();
        let chunk_world = store.chunk_size() as f32 * vs;
        let eye = Vec3::new(x, y, store.terrain_height_at(x, y) + 2.0 * vs);
        store.set_load_center(eye);
        store.tick(dt);

        if opts.sculpt_every > 0 && frame % opts.sculpt_every == 0 {
            let below = eye - Vec3::new(0.0, 0.0, 4.0 * chunk_world);
            if let Some(hit) = store.raycast(eye, below) {
                if !store.modify_density(hit.position, 3.0 * vs, 0.5, false).is_empty() {
                    totals.craters += 1;
                }
            }
        }
        collect(&mut store, &mut totals);

        if frame % 60 == 0 {
            let stats = store.chunk_stats();
            log::info!(
                "frame {frame}: center={:?} loaded={} pending={} meshes={} tris={}",
                store.center(),
                stats.loaded,
                stats.pending,
                totals.meshes,
                totals.triangles
            );
        }

        x += opts.speed * chunk_world * dt.as_secs_f32();
        if opts.realtime {
            if let Some(rest) = dt.checked_sub(frame_start.elapsed()) {
                thread::sleep(rest);
            }
        }
    }

    settle(&mut store, dt, Duration::from_secs(10));
    collect(&mut store, &mut totals);

    let stats = store.chunk_stats();
    let pool = store.pool_stats();
    println!("streamed {} frame(s) in {:.2?}", opts.ticks, started.elapsed());
    println!(
        "chunks: loaded={} pending={} voxels~{}",
        stats.loaded, stats.pending, stats.voxel_estimate
    );
    println!(
        "meshes: built={} removed={} triangles={} craters={}",
        totals.meshes, totals.removed, totals.triangles, totals.craters
    );
    println!(
        "pool: pooled={}/{} created={} reused={} dropped={}",
        pool.pooled, pool.capacity, pool.created, pool.reused, pool.dropped
    );
    if let Some(cache) = store.column_cache_stats() {
        println!(
            "column cache: entries={} hits={} misses={} evictions={} build={:.1}ms",
            cache.entries,
            cache.hits,
            cache.misses,
            cache.evictions,
            cache.build_us as f64 / 1000.0
        );
    }
    println!("memory: ~{:.1} MiB", store.memory_usage_estimate() as f64 / (1024.0 * 1024.0));
    store.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_world_is_shrunk_to_the_budget() {
        let mut cfg = WorldConfig::default();
        assert!(fit_render_distance(&mut cfg, 1024));
        assert!(cfg.world.render_distance < 64);
        assert!(cfg.world.render_distance >= 1);
        assert!(loaded_footprint_bytes(&cfg) <= 1024 << 20);
        cfg.world.render_distance += 1;
        assert!(loaded_footprint_bytes(&cfg) > 1024 << 20);
    }

    #[test]
    fn small_worlds_and_disabled_budgets_are_left_alone() {
        let mut cfg = WorldConfig::default();
        cfg.world.render_distance = 4;
        assert!(!fit_render_distance(&mut cfg, 1024));
        assert_eq!(cfg.world.render_distance, 4);

        let mut cfg = WorldConfig::default();
        assert!(!fit_render_distance(&mut cfg, 0));
        assert_eq!(cfg.world.render_distance, 64);
    }
}
