//! CPU meshing crate: Marching Cubes and greedy block meshers over chunk density fields.
#![forbid(unsafe_code)]

mod block;
mod face;
mod iso;
mod mesh_buffer;
mod sampler;
pub mod tables;

pub use block::{BlockMesher, BlockStats, visible_faces};
pub use face::Face;
pub use iso::{IsosurfaceMesher, MeshStats, lod_step, vertex_key};
pub use mesh_buffer::MeshBuffer;
pub use sampler::{ChunkView, FieldSampler, FnSampler, SourceSampler};

use strata_chunk::Chunk;
use strata_geom::Vec3;
use strata_world::voxel::ChunkCoord;
use strata_world::{MeshingMode, WorldConfig};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshOptions {
    pub mode: MeshingMode,
    pub voxel_size: f32,
    pub dedup: bool,
    pub skip_empty: bool,
}

impl MeshOptions {
    pub fn from_config(cfg: &WorldConfig) -> Self {
        Self {
            mode: cfg.meshing.mode,
            voxel_size: cfg.world.voxel_size,
            dedup: cfg.meshing.dedup_vertices,
            skip_empty: cfg.meshing.skip_empty_chunks,
        }
    }
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self::from_config(&WorldConfig::default())
    }
}

/// Finished geometry for one chunk rebuild, as handed to a renderer.
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
    pub coord: ChunkCoord,
    /// World-space position of the chunk's local origin; mesh positions are relative to it.
    pub origin: Vec3,
    pub lod: u8,
    /// Whether the consumer should build collision from this mesh.
    pub collision: bool,
    /// Chunk revision the mesh was built from.
    pub rev: u64,
    pub buffer: MeshBuffer,
}

/// Owns both meshers and their scratch state; picks one per [`MeshOptions::mode`].
pub struct ChunkMesher {
    pub opts: MeshOptions,
    iso: IsosurfaceMesher,
    block: BlockMesher,
}

impl ChunkMesher {
    pub fn new(opts: MeshOptions) -> Self {
        Self {
            opts,
            iso: IsosurfaceMesher::new(opts.voxel_size, opts.dedup),
            block: BlockMesher::new(opts.voxel_size),
        }
    }

    /// Whether `chunk` can produce no geometry of its own under the current mode.
    pub fn skips(&self, chunk: &Chunk) -> bool {
        if !self.opts.skip_empty {
            return false;
        }
        match (self.opts.mode, chunk.occupancy) {
            (MeshingMode::Smooth, Some(o)) => o.is_uniform(),
            (MeshingMode::Blocky, Some(_)) => !chunk.solid_material,
            (_, None) => false,
        }
    }

    /// Meshes `chunk` at its own LOD. `outside` answers lattice queries beyond the chunk grid.
    pub fn build<S: FieldSampler + ?Sized>(&mut self, chunk: &Chunk, outside: &S) -> ChunkMesh {
        let [ox, oy, oz] = chunk.origin();
        let vs = self.opts.voxel_size;
        let mut mesh = ChunkMesh {
            coord: chunk.coord,
            origin: Vec3::new(ox as f32 * vs, oy as f32 * vs, oz as f32 * vs),
            lod: chunk.lod,
            collision: chunk.collision,
            rev: chunk.rev,
            buffer: MeshBuffer::default(),
        };
        if self.skips(chunk) {
            log::trace!("skip uniform chunk {}", chunk.coord);
            return mesh;
        }
        let view = ChunkView::new(chunk, outside);
        match self.opts.mode {
            MeshingMode::Smooth => {
                self.iso
                    .mesh_into(&view, chunk.size, chunk.lod, &mut mesh.buffer);
            }
            MeshingMode::Blocky => {
                self.block.mesh_into(&view, chunk.size, &mut mesh.buffer);
            }
        }
        mesh
    }
}
