mod chunk_coord;
mod kind;
pub mod layout;

pub use chunk_coord::{ChunkCoord, NEIGHBOR_OFFSETS};
pub use kind::{
    DENSITY_OPEN, DENSITY_SOLID, DENSITY_STEP, Voxel, VoxelKind, decode_density, encode_density,
};
