//! World configuration, voxel vocabulary, and the procedural terrain field.
#![forbid(unsafe_code)]

pub mod biome;
pub mod config;
pub mod field;
pub mod voxel;

pub use biome::{BiomeKind, Climate};
pub use config::{ConfigError, MeshingMode, TerrainParams, WorldConfig};
pub use field::{ColumnCacheStats, ColumnSample, FieldGenerator, TerrainSource};
pub use voxel::{ChunkCoord, Voxel, VoxelKind};
