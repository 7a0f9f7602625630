//! Terrain field: density (negative = solid) and material for any world voxel coordinate.

mod column_cache;
mod generator;

pub use column_cache::{ColumnCache, ColumnCacheStats, ColumnKey, ColumnTile};
pub use generator::FieldGenerator;

use crate::biome::BiomeKind;
use crate::voxel::VoxelKind;
use crate::voxel::layout::{density_index, material_index};

/// Solid band below the surface that may never be thinner than this (raw voxels, before normalisation).
pub const MIN_SOLID_THICKNESS: f32 = 1.0;
/// Raw `z - height` distances are divided by this before clamping to `[-1, 1]`.
pub const DENSITY_NORMALIZER: f32 = 5.0;
/// Smallest normalised density magnitude a solid sample can have.
pub const MIN_SOLID_DENSITY: f32 = MIN_SOLID_THICKNESS / DENSITY_NORMALIZER;
/// Caves stay at least this many voxels below the surface.
pub const CAVE_SURFACE_MARGIN: f32 = 20.0;
/// Only raw densities below this are considered for cave carving.
pub const CAVE_SOLID_THRESHOLD: f32 = -0.8;
pub const BEDROCK_DENSITY: f32 = -10.0;
/// Height of the bedrock blend band above `z = 0`.
pub const BEDROCK_BAND: i32 = 3;

/// Everything about one `(x, y)` column that does not depend on `z`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColumnSample {
    pub height: f32,
    pub continentalness: f32,
    pub erosion: f32,
    pub peaks: f32,
    pub temperature: f32,
    pub moisture: f32,
    pub plateau: f32,
    pub valley: f32,
    pub canyon: f32,
    pub biome: BiomeKind,
    pub feature: BiomeKind,
}

/// Source of terrain samples for chunk generation and seam fallbacks.
pub trait TerrainSource: Send + Sync {
    fn density(&self, x: i32, y: i32, z: i32) -> f32;
    fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind;
    /// Surface height in voxels for the column at `(x, y)`.
    fn surface_height(&self, x: i32, y: i32) -> f32;

    /// Column cache counters, for sources that keep one.
    fn column_cache_stats(&self) -> Option<ColumnCacheStats> {
        None
    }

    /// Fills a chunk's corner densities (`(size+1)^3`) and cell materials (`size^3`) starting at world
    /// voxel `origin`. Returns `false` if `cancel` fired, in which case the buffers are unspecified.
    fn fill_chunk(
        &self,
        origin: [i32; 3],
        size: usize,
        density: &mut [f32],
        material: &mut [VoxelKind],
        cancel: &dyn Fn() -> bool,
    ) -> bool {
        for lz in 0..=size {
            if cancel() {
                return false;
            }
            let z = origin[2] + lz as i32;
            for ly in 0..=size {
                let y = origin[1] + ly as i32;
                for lx in 0..=size {
                    let x = origin[0] + lx as i32;
                    density[density_index(lx, ly, lz, size)] = self.density(x, y, z);
                    if lx < size && ly < size && lz < size {
                        material[material_index(lx, ly, lz, size)] = self.material(x, y, z);
                    }
                }
            }
        }
        true
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite step: 0 below `e0`, 1 at or above `e1`.
#[inline]
pub fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    if x < e0 {
        return 0.0;
    }
    if x >= e1 {
        return 1.0;
    }
    let t = (x - e0) / (e1 - e0);
    t * t * (3.0 - 2.0 * t)
}
