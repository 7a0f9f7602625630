use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Session configuration, loaded once from TOML. Every field has a default so partial files work.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub terrain: TerrainSettings,
    #[serde(default)]
    pub caves: CaveSettings,
    #[serde(default)]
    pub biomes: BiomeSettings,
    #[serde(default)]
    pub streaming: StreamingSettings,
    #[serde(default)]
    pub lod: LodSettings,
    #[serde(default)]
    pub meshing: MeshingSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WorldSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_voxel_size")]
    pub voxel_size: f32,
    #[serde(default = "default_render_distance")]
    pub render_distance: i32,
    #[serde(default = "default_height_chunks")]
    pub height_chunks: i32,
    #[serde(default = "default_seed")]
    pub seed: i32,
}
fn default_chunk_size() -> usize {
    32
}
fn default_voxel_size() -> f32 {
    100.0
}
fn default_render_distance() -> i32 {
    64
}
fn default_height_chunks() -> i32 {
    16
}
fn default_seed() -> i32 {
    12345
}
impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            voxel_size: default_voxel_size(),
            render_distance: default_render_distance(),
            height_chunks: default_height_chunks(),
            seed: default_seed(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TerrainSettings {
    #[serde(default = "default_base_height")]
    pub base_height: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
}
fn default_base_height() -> f32 {
    96.0
}
fn default_amplitude() -> f32 {
    32.0
}
fn default_frequency() -> f32 {
    0.01
}
fn default_octaves() -> u32 {
    4
}
impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            base_height: default_base_height(),
            amplitude: default_amplitude(),
            frequency: default_frequency(),
            octaves: default_octaves(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CaveSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cave_threshold")]
    pub threshold: f32,
}
fn default_true() -> bool {
    true
}
fn default_cave_threshold() -> f32 {
    0.5
}
impl Default for CaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: default_cave_threshold(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BiomeSettings {
    #[serde(default = "default_biome_scale")]
    pub scale: f32,
    #[serde(default = "default_plateau_height")]
    pub plateau_height: f32,
    #[serde(default = "default_plateau_flatness")]
    pub plateau_flatness: f32,
    #[serde(default = "default_valley_depth")]
    pub valley_depth: f32,
    #[serde(default = "default_true")]
    pub plateaus: bool,
    #[serde(default = "default_true")]
    pub valleys: bool,
    #[serde(default = "default_true")]
    pub canyons: bool,
}
fn default_biome_scale() -> f32 {
    0.002
}
fn default_plateau_height() -> f32 {
    60.0
}
fn default_plateau_flatness() -> f32 {
    0.85
}
fn default_valley_depth() -> f32 {
    40.0
}
impl Default for BiomeSettings {
    fn default() -> Self {
        Self {
            scale: default_biome_scale(),
            plateau_height: default_plateau_height(),
            plateau_flatness: default_plateau_flatness(),
            valley_depth: default_valley_depth(),
            plateaus: true,
            valleys: true,
            canyons: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StreamingSettings {
    #[serde(default = "default_true")]
    pub async_generation: bool,
    #[serde(default = "default_chunks_per_frame")]
    pub chunks_per_frame: usize,
    #[serde(default = "default_meshes_per_frame")]
    pub meshes_per_frame: usize,
    /// Retired chunks kept for reuse; 0 disables pooling.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    /// Generation threads; 0 picks the rayon default.
    #[serde(default)]
    pub workers: usize,
    #[serde(default = "default_policy_interval_ms")]
    pub policy_interval_ms: u64,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}
fn default_chunks_per_frame() -> usize {
    8
}
fn default_meshes_per_frame() -> usize {
    6
}
fn default_pool_capacity() -> usize {
    64
}
fn default_policy_interval_ms() -> u64 {
    500
}
fn default_shutdown_timeout_ms() -> u64 {
    5000
}
impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            async_generation: true,
            chunks_per_frame: default_chunks_per_frame(),
            meshes_per_frame: default_meshes_per_frame(),
            pool_capacity: default_pool_capacity(),
            workers: 0,
            policy_interval_ms: default_policy_interval_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LodSettings {
    /// Horizontal chunk distances, ascending. Index `i` is the farthest distance drawn at tier `i`.
    #[serde(default = "default_lod_thresholds")]
    pub thresholds: Vec<f32>,
    #[serde(default = "default_collision_distance")]
    pub collision_distance: f32,
}
fn default_lod_thresholds() -> Vec<f32> {
    vec![4.0, 12.0, 28.0, 48.0]
}
fn default_collision_distance() -> f32 {
    3.0
}
impl Default for LodSettings {
    fn default() -> Self {
        Self {
            thresholds: default_lod_thresholds(),
            collision_distance: default_collision_distance(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MeshingMode {
    #[default]
    Smooth,
    Blocky,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MeshingSettings {
    #[serde(default)]
    pub mode: MeshingMode,
    #[serde(default = "default_true")]
    pub dedup_vertices: bool,
    #[serde(default = "default_true")]
    pub skip_empty_chunks: bool,
}
impl Default for MeshingSettings {
    fn default() -> Self {
        Self {
            mode: MeshingMode::Smooth,
            dedup_vertices: true,
            skip_empty_chunks: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Chunk columns of precomputed height/climate samples; 0 disables the cache.
    #[serde(default = "default_column_capacity")]
    pub column_capacity: usize,
}
fn default_column_capacity() -> usize {
    256
}
impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            column_capacity: default_column_capacity(),
        }
    }
}

pub const MAX_LOD_TIERS: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("world.chunk_size must be in 8..=64, got {0}")]
    ChunkSize(usize),
    #[error("world.voxel_size must be positive, got {0}")]
    VoxelSize(f32),
    #[error("world.render_distance must be at least 1, got {0}")]
    RenderDistance(i32),
    #[error("world.height_chunks must be at least 1, got {0}")]
    HeightChunks(i32),
    #[error("terrain.octaves must be in 1..=8, got {0}")]
    Octaves(u32),
    #[error("caves.threshold must be in [0, 1], got {0}")]
    CaveThreshold(f32),
    #[error("streaming.{name} must be at least 1")]
    FrameCap { name: &'static str },
    #[error("lod.thresholds must hold 1..={max} entries, got {len}")]
    LodTierCount { len: usize, max: usize },
    #[error("lod.thresholds must be strictly ascending: {0:?}")]
    LodNotAscending(Vec<f32>),
    #[error("biomes.plateau_flatness must be in [0, 1], got {0}")]
    PlateauFlatness(f32),
}

impl WorldConfig {
    /// Reads, parses and validates a TOML file. Returns the first problem found.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_toml_str(&text)?;
        if let Err(mut errors) = cfg.validate() {
            return Err(errors.remove(0));
        }
        Ok(cfg)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Collects every rule violation rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        let w = &self.world;
        if !(8..=64).contains(&w.chunk_size) {
            errors.push(ConfigError::ChunkSize(w.chunk_size));
        } else if !w.chunk_size.is_power_of_two() {
            log::warn!(
                "world.chunk_size {} is not a power of two; coarse LOD steps will clamp at the chunk edge",
                w.chunk_size
            );
        }
        if !(w.voxel_size > 0.0) {
            errors.push(ConfigError::VoxelSize(w.voxel_size));
        }
        if w.render_distance < 1 {
            errors.push(ConfigError::RenderDistance(w.render_distance));
        }
        if w.height_chunks < 1 {
            errors.push(ConfigError::HeightChunks(w.height_chunks));
        }
        if !(1..=8).contains(&self.terrain.octaves) {
            errors.push(ConfigError::Octaves(self.terrain.octaves));
        }
        if !(0.0..=1.0).contains(&self.caves.threshold) {
            errors.push(ConfigError::CaveThreshold(self.caves.threshold));
        }
        if self.streaming.chunks_per_frame < 1 {
            errors.push(ConfigError::FrameCap {
                name: "chunks_per_frame",
            });
        }
        if self.streaming.meshes_per_frame < 1 {
            errors.push(ConfigError::FrameCap {
                name: "meshes_per_frame",
            });
        }
        let t = &self.lod.thresholds;
        if t.is_empty() || t.len() > MAX_LOD_TIERS {
            errors.push(ConfigError::LodTierCount {
                len: t.len(),
                max: MAX_LOD_TIERS,
            });
        }
        if t.windows(2).any(|w| w[0] >= w[1]) {
            errors.push(ConfigError::LodNotAscending(t.clone()));
        }
        if !(0.0..=1.0).contains(&self.biomes.plateau_flatness) {
            errors.push(ConfigError::PlateauFlatness(self.biomes.plateau_flatness));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Voxels per chunk edge.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.world.chunk_size
    }

    /// World-space height of the column stack.
    pub fn world_height_voxels(&self) -> i32 {
        self.world.height_chunks * self.world.chunk_size as i32
    }
}

/// Flattened terrain parameters for hot loops.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainParams {
    pub seed: i32,
    pub chunk_size: usize,
    pub height_chunks: i32,
    pub base_height: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub octaves: u32,
    pub caves: bool,
    pub cave_threshold: f32,
    pub biome_scale: f32,
    pub plateau_height: f32,
    pub plateau_flatness: f32,
    pub valley_depth: f32,
    pub plateaus: bool,
    pub valleys: bool,
    pub canyons: bool,
    pub column_cache_capacity: usize,
}

impl TerrainParams {
    pub fn from_config(cfg: &WorldConfig) -> Self {
        Self {
            seed: cfg.world.seed,
            chunk_size: cfg.world.chunk_size,
            height_chunks: cfg.world.height_chunks,
            base_height: cfg.terrain.base_height,
            amplitude: cfg.terrain.amplitude,
            frequency: cfg.terrain.frequency,
            octaves: cfg.terrain.octaves,
            caves: cfg.caves.enabled,
            cave_threshold: cfg.caves.threshold,
            biome_scale: cfg.biomes.scale,
            plateau_height: cfg.biomes.plateau_height,
            plateau_flatness: cfg.biomes.plateau_flatness,
            valley_depth: cfg.biomes.valley_depth,
            plateaus: cfg.biomes.plateaus,
            valleys: cfg.biomes.valleys,
            canyons: cfg.biomes.canyons,
            column_cache_capacity: cfg.cache.column_capacity,
        }
    }

    #[inline]
    pub fn max_height(&self) -> f32 {
        (self.height_chunks.max(0) as usize * self.chunk_size) as f32
    }
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self::from_config(&WorldConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg = WorldConfig::from_toml_str(
            r#"
            [world]
            seed = 7
            [terrain]
            base_height = 64
            [meshing]
            mode = "blocky"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.world.seed, 7);
        assert_eq!(cfg.world.chunk_size, 32);
        assert_eq!(cfg.terrain.base_height, 64.0);
        assert_eq!(cfg.terrain.amplitude, 32.0);
        assert_eq!(cfg.meshing.mode, MeshingMode::Blocky);
        assert_eq!(cfg.lod.thresholds, vec![4.0, 12.0, 28.0, 48.0]);
    }

    #[test]
    fn validate_collects_every_violation() {
        let mut cfg = WorldConfig::default();
        cfg.world.chunk_size = 4;
        cfg.world.voxel_size = 0.0;
        cfg.terrain.octaves = 0;
        cfg.lod.thresholds = vec![10.0, 5.0];
        cfg.streaming.meshes_per_frame = 0;
        let errs = cfg.validate().unwrap_err();
        assert_eq!(errs.len(), 5);
        assert!(matches!(errs[0], ConfigError::ChunkSize(4)));
        assert!(
            errs.iter()
                .any(|e| matches!(e, ConfigError::LodNotAscending(_)))
        );
        assert!(errs.iter().any(|e| matches!(
            e,
            ConfigError::FrameCap {
                name: "meshes_per_frame"
            }
        )));
    }

    #[test]
    fn too_many_lod_tiers_rejected() {
        let mut cfg = WorldConfig::default();
        cfg.lod.thresholds = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let errs = cfg.validate().unwrap_err();
        assert!(matches!(
            errs[0],
            ConfigError::LodTierCount { len: 5, max: 4 }
        ));
    }

    #[test]
    fn non_power_of_two_chunk_is_only_a_warning() {
        let mut cfg = WorldConfig::default();
        cfg.world.chunk_size = 24;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn serialized_config_parses_back() {
        let cfg = WorldConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = WorldConfig::from_toml_str(&text).unwrap();
        assert_eq!(
            TerrainParams::from_config(&back),
            TerrainParams::from_config(&cfg)
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let err = WorldConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
