//! Chunk streaming runtime: the chunk store, background generation workers, LOD and collision
//! policy, voxel edits and raycasts.
#![forbid(unsafe_code)]

mod jobs;
mod policy;
mod raycast;
mod sampler;
mod store;

pub use jobs::{GenJob, GenOut, GenStatus, GenWorkers, resolve_workers};
pub use policy::{LodPolicy, desired_set, disc_columns, loaded_footprint_bytes};
pub use raycast::{RayHit, raycast_cells};
pub use sampler::NeighborSampler;
pub use store::{ChunkStats, ChunkStore, MeshEvent, TickReport};
