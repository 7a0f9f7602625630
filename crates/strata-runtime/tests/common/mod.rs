#![allow(dead_code)]

use std::thread;
use std::time::Duration;

use strata_runtime::ChunkStore;
use strata_world::field::TerrainSource;
use strata_world::voxel::VoxelKind;
use strata_world::WorldConfig;

/// Level ground: stone up to and including voxel layer `top`, air above.
pub struct FlatTerrain {
    pub top: i32,
    /// Per-sample delay, to keep background jobs busy.
    pub delay: Option<Duration>,
}

impl FlatTerrain {
    pub fn at(top: i32) -> Self {
        Self { top, delay: None }
    }
}

impl TerrainSource for FlatTerrain {
    fn density(&self, _x: i32, _y: i32, z: i32) -> f32 {
        if let Some(d) = self.delay {
            thread::sleep(d);
        }
        (((z - self.top) as f32 - 0.5) / 4.0).clamp(-1.0, 1.0)
    }

    fn material(&self, _x: i32, _y: i32, z: i32) -> VoxelKind {
        if z <= self.top {
            VoxelKind::Stone
        } else {
            VoxelKind::Air
        }
    }

    fn surface_height(&self, _x: i32, _y: i32) -> f32 {
        self.top as f32
    }
}

/// Small world: 8-voxel chunks of 100 units, a radius-2 disc two layers tall.
pub fn small_config(async_generation: bool) -> WorldConfig {
    let mut cfg = WorldConfig::default();
    cfg.world.chunk_size = 8;
    cfg.world.voxel_size = 100.0;
    cfg.world.render_distance = 2;
    cfg.world.height_chunks = 2;
    cfg.streaming.async_generation = async_generation;
    cfg.streaming.workers = 2;
    cfg.streaming.chunks_per_frame = 64;
    cfg.streaming.meshes_per_frame = 64;
    cfg.streaming.pool_capacity = 64;
    cfg.streaming.policy_interval_ms = 0;
    cfg.streaming.shutdown_timeout_ms = 5_000;
    cfg.lod.collision_distance = 1.0;
    cfg
}

/// Ticks until nothing is queued or in flight. Panics after a generous deadline.
pub fn run_until_idle(store: &mut ChunkStore) {
    for _ in 0..10_000 {
        store.tick(Duration::from_millis(16));
        if store.is_idle() {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("store never went idle: {:?}", store.chunk_stats());
}
