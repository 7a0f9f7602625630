use strata_chunk::{Chunk, ChunkField};
use strata_world::WorldConfig;
use strata_world::voxel::ChunkCoord;

/// Distance-driven LOD and collision tiers. Distances are horizontal, in chunks.
#[derive(Clone, Debug, PartialEq)]
pub struct LodPolicy {
    /// Ascending upper bounds; tier `i` covers distances up to `thresholds[i]`.
    pub thresholds: Vec<f32>,
    pub collision_distance: f32,
}

impl LodPolicy {
    pub fn from_config(cfg: &WorldConfig) -> Self {
        Self {
            thresholds: cfg.lod.thresholds.clone(),
            collision_distance: cfg.lod.collision_distance,
        }
    }

    /// First tier whose threshold covers `distance`; beyond the last threshold, the coarsest tier.
    pub fn lod_for(&self, distance: f32) -> u8 {
        self.thresholds
            .iter()
            .position(|t| distance <= *t)
            .unwrap_or(self.thresholds.len().saturating_sub(1)) as u8
    }

    #[inline]
    pub fn collision_for(&self, distance: f32) -> bool {
        distance <= self.collision_distance
    }
}

/// Chunk columns inside a horizontal disc of radius `render_distance`.
pub fn disc_columns(render_distance: i32) -> usize {
    let r = render_distance.max(0) as i64;
    (-r..=r)
        .map(|dy| {
            let reach = r * r - dy * dy;
            // Widest dx with dx^2 <= reach.
            let mut dx = (reach as f64).sqrt() as i64;
            while dx * dx > reach {
                dx -= 1;
            }
            while (dx + 1) * (dx + 1) <= reach {
                dx += 1;
            }
            (2 * dx + 1) as usize
        })
        .sum()
}

/// Field memory for a fully loaded render disc under `cfg`.
pub fn loaded_footprint_bytes(cfg: &WorldConfig) -> usize {
    let per_chunk = ChunkField::bytes_for(cfg.chunk_size()) + std::mem::size_of::<Chunk>();
    disc_columns(cfg.world.render_distance)
        .saturating_mul(cfg.world.height_chunks.max(0) as usize)
        .saturating_mul(per_chunk)
}

/// Every chunk within `render_distance` (horizontal) of `center`, all vertical layers,
/// sorted closest-first by full Euclidean chunk distance.
pub fn desired_set(center: ChunkCoord, render_distance: i32, height_chunks: i32) -> Vec<ChunkCoord> {
    let r = render_distance.max(0);
    let r2 = (r as i64) * (r as i64);
    let mut out = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx as i64) * (dx as i64) + (dy as i64) * (dy as i64) > r2 {
                continue;
            }
            for cz in 0..height_chunks.max(0) {
                out.push(ChunkCoord::new(center.cx + dx, center.cy + dy, cz));
            }
        }
    }
    out.sort_by_key(|c| (c.distance_sq(center), c.cz, c.cy, c.cx));
    out
}
