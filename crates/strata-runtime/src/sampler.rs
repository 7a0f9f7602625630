use hashbrown::HashMap;
use strata_chunk::{Chunk, OPEN_DENSITY};
use strata_mesh_cpu::FieldSampler;
use strata_world::TerrainSource;
use strata_world::voxel::{ChunkCoord, VoxelKind};

/// Resolves lattice queries around one chunk through the store's map by coordinate.
/// Unloaded or ungenerated neighbours fall back to the terrain source at the same world position.
pub struct NeighborSampler<'a> {
    pub chunks: &'a HashMap<ChunkCoord, Chunk>,
    pub source: Option<&'a dyn TerrainSource>,
    pub origin: [i32; 3],
    pub size: usize,
}

impl<'a> NeighborSampler<'a> {
    pub fn new(
        chunks: &'a HashMap<ChunkCoord, Chunk>,
        source: Option<&'a dyn TerrainSource>,
        coord: ChunkCoord,
        size: usize,
    ) -> Self {
        Self {
            chunks,
            source,
            origin: coord.origin(size),
            size,
        }
    }

    /// Generated chunk owning world voxel `w`, with `w` in its local coordinates.
    #[inline]
    fn owner(&self, w: [i32; 3]) -> Option<(&'a Chunk, [i32; 3])> {
        let coord = ChunkCoord::from_voxel(w[0], w[1], w[2], self.size);
        let chunk = self.chunks.get(&coord).filter(|c| c.has_field())?;
        let o = coord.origin(self.size);
        Some((chunk, [w[0] - o[0], w[1] - o[1], w[2] - o[2]]))
    }

    #[inline]
    fn world(&self, x: i32, y: i32, z: i32) -> [i32; 3] {
        [self.origin[0] + x, self.origin[1] + y, self.origin[2] + z]
    }
}

impl FieldSampler for NeighborSampler<'_> {
    fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        let w = self.world(x, y, z);
        if let Some((chunk, [lx, ly, lz])) = self.owner(w) {
            return chunk.density(lx, ly, lz);
        }
        match self.source {
            Some(src) => src.density(w[0], w[1], w[2]),
            None => OPEN_DENSITY,
        }
    }

    fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind {
        let w = self.world(x, y, z);
        if let Some((chunk, [lx, ly, lz])) = self.owner(w) {
            return chunk.material(lx, ly, lz);
        }
        match self.source {
            Some(src) => src.material(w[0], w[1], w[2]),
            None => VoxelKind::Air,
        }
    }
}
