use std::sync::Arc;
use std::time::Instant;

use strata_noise::NoiseEngine;

use super::{
    BEDROCK_BAND, BEDROCK_DENSITY, CAVE_SOLID_THRESHOLD, CAVE_SURFACE_MARGIN, ColumnCache,
    ColumnCacheStats, ColumnKey, ColumnSample, ColumnTile, DENSITY_NORMALIZER,
    MIN_SOLID_THICKNESS, TerrainSource, lerp, smoothstep,
};
use crate::biome::{self, BiomeKind, Climate};
use crate::config::{TerrainParams, WorldConfig};
use crate::voxel::VoxelKind;
use crate::voxel::layout::{density_index, material_index};

/// Depth (voxels below the surface) above which surface materials apply.
const SURFACE_LAYER: f32 = 5.0;
/// Caves never open this close to the surface regardless of the outer margin.
const CAVE_SURFACE_CLEARANCE: f32 = 5.0;

/// Pure terrain function of world voxel coordinates, plus a column cache for chunk fills.
///
/// Without a noise engine every query answers the documented defaults: density `1.0` (open),
/// material air, height = base height, climate channels `0.5`, influences `0`.
pub struct FieldGenerator {
    params: TerrainParams,
    noise: Option<NoiseEngine>,
    columns: ColumnCache,
}

impl FieldGenerator {
    pub fn new(cfg: &WorldConfig) -> Self {
        Self::from_params(TerrainParams::from_config(cfg))
    }

    pub fn from_params(params: TerrainParams) -> Self {
        log::info!(
            target: "events",
            "terrain generator seed={} plateaus={} valleys={} canyons={} caves={}",
            params.seed,
            params.plateaus,
            params.valleys,
            params.canyons,
            params.caves
        );
        let noise = Some(NoiseEngine::new(params.seed));
        let columns = ColumnCache::new(params.column_cache_capacity);
        Self {
            params,
            noise,
            columns,
        }
    }

    /// Generator with no noise engine; answers defaults only.
    pub fn uninitialized(params: TerrainParams) -> Self {
        let columns = ColumnCache::new(0);
        Self {
            params,
            noise: None,
            columns,
        }
    }

    #[inline]
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn column_cache_stats(&self) -> ColumnCacheStats {
        self.columns.stats()
    }

    pub fn clear_column_cache(&self) {
        self.columns.clear();
    }

    // ---- climate channels ----

    pub fn continentalness(&self, x: i32, y: i32) -> f32 {
        let Some(n) = &self.noise else { return 0.5 };
        let f = self.params.frequency * 0.3;
        n.fractal_2d(x as f32 * f, y as f32 * f, 3, 0.5, 2.0)
    }

    pub fn erosion(&self, x: i32, y: i32) -> f32 {
        let Some(n) = &self.noise else { return 0.5 };
        let f = self.params.frequency * 0.5;
        n.fractal_2d(x as f32 * f + 1000.0, y as f32 * f + 1000.0, 4, 0.5, 2.0)
    }

    pub fn peaks(&self, x: i32, y: i32) -> f32 {
        let Some(n) = &self.noise else { return 0.5 };
        let f = self.params.frequency * 2.0;
        n.ridged_2d(x as f32 * f + 2000.0, y as f32 * f + 2000.0, 3, 0.4, 2.0)
    }

    pub fn temperature(&self, x: i32, y: i32) -> f32 {
        let Some(n) = &self.noise else { return 0.5 };
        let f = self.params.frequency * 0.2;
        n.fractal_2d(x as f32 * f + 5000.0, y as f32 * f + 5000.0, 2, 0.5, 2.0)
    }

    pub fn moisture(&self, x: i32, y: i32) -> f32 {
        let Some(n) = &self.noise else { return 0.5 };
        let f = self.params.frequency * 0.25;
        n.fractal_2d(x as f32 * f + 7000.0, y as f32 * f + 7000.0, 2, 0.5, 2.0)
    }

    // ---- terrain feature influences ----

    pub fn plateau_influence(&self, x: i32, y: i32) -> f32 {
        let Some(n) = &self.noise else { return 0.0 };
        if !self.params.plateaus {
            return 0.0;
        }
        let s = self.params.biome_scale;
        let (xf, yf) = (x as f32, y as f32);
        let primary = n.fractal_2d(xf * s + 10000.0, yf * s + 10000.0, 2, 0.5, 2.0);
        let edge = n.fractal_2d(xf * s * 2.0 + 15000.0, yf * s * 2.0 + 15000.0, 2, 0.5, 2.0);
        smoothstep(0.45, 0.65, primary * 0.7 + edge * 0.3)
    }

    pub fn valley_influence(&self, x: i32, y: i32) -> f32 {
        let Some(n) = &self.noise else { return 0.0 };
        if !self.params.valleys {
            return 0.0;
        }
        let s = self.params.biome_scale;
        let (xf, yf) = (x as f32, y as f32);
        let ridges = n.ridged_2d(xf * s * 0.8 + 20000.0, yf * s * 0.8 + 20000.0, 3, 0.5, 2.0);
        let factor = 1.0 - ridges;
        if factor <= 0.65 {
            return 0.0;
        }
        let variation = n.fractal_2d(xf * s * 2.0 + 25000.0, yf * s * 2.0 + 25000.0, 2, 0.5, 2.0);
        smoothstep(0.65, 0.85, factor) * lerp(0.6, 1.0, variation)
    }

    pub fn canyon_influence(&self, x: i32, y: i32) -> f32 {
        let Some(n) = &self.noise else { return 0.0 };
        if !self.params.canyons {
            return 0.0;
        }
        let s = self.params.biome_scale;
        let (xf, yf) = (x as f32, y as f32);
        let warp_x = n.fractal_2d(xf * s * 2.0 + 30000.0, yf * s * 2.0 + 30000.0, 2, 0.5, 2.0) * 50.0;
        let warp_y = n.fractal_2d(xf * s * 2.0 + 35000.0, yf * s * 2.0 + 35000.0, 2, 0.5, 2.0) * 50.0;
        let cut = n.ridged_2d((xf + warp_x) * s * 2.0, (yf + warp_y) * s * 2.0, 2, 0.6, 2.0);
        if cut > 0.88 {
            smoothstep(0.88, 0.95, cut)
        } else {
            0.0
        }
    }

    // ---- column queries ----

    /// All z-independent values for one column.
    pub fn sample_column(&self, x: i32, y: i32) -> ColumnSample {
        if self.noise.is_none() {
            return self.default_column();
        }
        let continentalness = self.continentalness(x, y);
        let erosion = self.erosion(x, y);
        let peaks = self.peaks(x, y);
        let temperature = self.temperature(x, y);
        let moisture = self.moisture(x, y);
        let plateau = self.plateau_influence(x, y);
        let valley = self.valley_influence(x, y);
        let canyon = self.canyon_influence(x, y);
        let biome = biome::classify(&Climate {
            temperature,
            moisture,
            continentalness,
            erosion,
            plateau,
            valley,
        });
        let feature = biome::terrain_feature(biome, plateau, valley, canyon);
        let height = self.shape_height(x, y, continentalness, erosion, peaks, plateau, valley, canyon);
        ColumnSample {
            height,
            continentalness,
            erosion,
            peaks,
            temperature,
            moisture,
            plateau,
            valley,
            canyon,
            biome,
            feature,
        }
    }

    fn default_column(&self) -> ColumnSample {
        let p = &self.params;
        let climate = Climate {
            temperature: 0.5,
            moisture: 0.5,
            continentalness: 0.5,
            erosion: 0.5,
            plateau: 0.0,
            valley: 0.0,
        };
        let biome = biome::classify(&climate);
        ColumnSample {
            height: p.base_height.clamp(0.0, p.max_height()),
            continentalness: 0.5,
            erosion: 0.5,
            peaks: 0.5,
            temperature: 0.5,
            moisture: 0.5,
            plateau: 0.0,
            valley: 0.0,
            canyon: 0.0,
            biome,
            feature: biome,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn shape_height(
        &self,
        x: i32,
        y: i32,
        continentalness: f32,
        erosion: f32,
        peaks: f32,
        plateau: f32,
        valley: f32,
        canyon: f32,
    ) -> f32 {
        let p = &self.params;
        let Some(n) = &self.noise else {
            return p.base_height;
        };
        let f = p.frequency;
        let (xf, yf) = (x as f32, y as f32);

        let continent = lerp(-20.0, 20.0, continentalness);
        let smoothing = lerp(0.3, 1.0, 1.0 - erosion);
        let variation = (peaks - 0.5) * p.amplitude * smoothing;
        let detail = (n.fractal_2d(xf * f * 4.0, yf * f * 4.0, p.octaves, 0.5, 2.0) - 0.5) * 2.0;
        let mut height = p.base_height + continent + variation + detail;

        height += plateau * p.plateau_height * 2.0;
        height -= valley * p.valley_depth;
        height -= canyon * p.valley_depth * 1.5;

        if plateau > 0.5 {
            let top = p.base_height + p.plateau_height * 2.0;
            let mut flat = lerp(height, top, p.plateau_flatness * plateau);
            let bumps = n.fractal_2d(xf * f * 8.0 + 15000.0, yf * f * 8.0 + 15000.0, 2, 0.5, 2.0);
            flat += (bumps - 0.5) * (1.0 - p.plateau_flatness);
            height = flat;
        }

        height.clamp(0.0, p.max_height())
    }

    pub fn terrain_height(&self, x: i32, y: i32) -> f32 {
        self.sample_column(x, y).height
    }

    pub fn biome(&self, x: i32, y: i32) -> BiomeKind {
        self.sample_column(x, y).biome
    }

    /// Canyon > valley > plateau at influence above 0.5, else the climate biome.
    pub fn terrain_feature(&self, x: i32, y: i32) -> BiomeKind {
        self.sample_column(x, y).feature
    }

    pub fn water_level(&self, x: i32, y: i32) -> f32 {
        self.water_level_in(&self.sample_column(x, y))
    }

    fn water_level_in(&self, col: &ColumnSample) -> f32 {
        let p = &self.params;
        if col.biome == BiomeKind::DeepValley {
            p.base_height - p.valley_depth * col.valley + 5.0
        } else {
            p.base_height - 5.0
        }
    }

    // ---- caves ----

    /// Positive inside a cave. `-1` wherever caves are not allowed.
    pub fn cave_density(&self, x: i32, y: i32, z: i32) -> f32 {
        self.cave_density_in(&self.sample_column(x, y), x, y, z)
    }

    pub fn is_cave(&self, x: i32, y: i32, z: i32) -> bool {
        self.cave_density(x, y, z) > 0.0
    }

    fn cave_density_in(&self, col: &ColumnSample, x: i32, y: i32, z: i32) -> f32 {
        let p = &self.params;
        let Some(n) = &self.noise else { return -1.0 };
        if !p.caves {
            return -1.0;
        }
        let zf = z as f32;
        if zf > col.height - CAVE_SURFACE_CLEARANCE || z < BEDROCK_BAND {
            return -1.0;
        }
        if col.plateau > 0.7 {
            return -1.0;
        }
        let cf = p.frequency * 3.0;
        let (xf, yf) = (x as f32, y as f32);
        let a = n.fractal_3d(xf * cf, yf * cf, zf * cf, 3, 0.5, 2.0);
        let b = n.fractal_3d(
            xf * cf * 0.5 + 3000.0,
            yf * cf * 0.5 + 3000.0,
            zf * cf * 0.5 + 3000.0,
            2,
            0.5,
            2.0,
        );
        let combined = (a + b) * 0.5;
        let depth = 1.0 - zf / col.height;
        let mut threshold = p.cave_threshold - depth * 0.1;
        if col.valley > 0.3 {
            threshold -= 0.1 * col.valley;
        }
        (combined - threshold) * 5.0
    }

    // ---- density ----

    pub fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        if self.noise.is_none() {
            return 1.0;
        }
        self.density_in(&self.sample_column(x, y), x, y, z)
    }

    /// Normalised density in `[-1, 1]` for `z` in a precomputed column.
    fn density_in(&self, col: &ColumnSample, x: i32, y: i32, z: i32) -> f32 {
        let zf = z as f32;
        let raw = zf - col.height;
        let mut d = raw;

        if self.params.caves
            && zf < col.height - CAVE_SURFACE_MARGIN
            && z > BEDROCK_BAND
            && d < CAVE_SOLID_THRESHOLD
        {
            let cave = self.cave_density_in(col, x, y, z);
            if cave > 0.0 {
                d = lerp(d, cave, smoothstep(0.0, 0.5, cave));
            }
        }

        if z <= 0 {
            d = BEDROCK_DENSITY;
        } else if z < BEDROCK_BAND {
            let band = BEDROCK_BAND as f32;
            let t = (band - zf) / band;
            d = d.min(lerp(d, BEDROCK_DENSITY, t));
        }

        if d < 0.0 && d > -MIN_SOLID_THICKNESS {
            d = -MIN_SOLID_THICKNESS;
        }

        d = (d / DENSITY_NORMALIZER).clamp(-1.0, 1.0);

        // A near-zero sample well below the surface is forced solid.
        if d > -0.15 && d < 0.15 && raw < -0.5 {
            d = -0.2;
        }
        d
    }

    // ---- material ----

    pub fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind {
        if self.noise.is_none() {
            return VoxelKind::Air;
        }
        let col = self.sample_column(x, y);
        let d = self.density_in(&col, x, y, z);
        self.material_in(&col, x, y, z, d)
    }

    fn material_in(&self, col: &ColumnSample, x: i32, y: i32, z: i32, density: f32) -> VoxelKind {
        let zf = z as f32;
        if density > 0.0 {
            if col.biome.holds_water() && zf <= self.water_level_in(col) {
                return VoxelKind::Water;
            }
            return VoxelKind::Air;
        }
        if z <= 0 {
            return VoxelKind::Bedrock;
        }
        let depth = col.height - zf;
        if depth < SURFACE_LAYER {
            self.surface_material(col, z, depth)
        } else {
            self.underground_material(col, x, y, z)
        }
    }

    fn surface_material(&self, col: &ColumnSample, z: i32, depth: f32) -> VoxelKind {
        let p = &self.params;
        let zf = z as f32;
        if col.plateau > 0.5 {
            if depth < 1.0 && col.plateau > 0.7 {
                return if col.temperature < 0.3 {
                    VoxelKind::Snow
                } else {
                    VoxelKind::Grass
                };
            }
            if col.plateau > 0.3 && col.plateau < 0.8 {
                return VoxelKind::PlateauStone;
            }
            if depth < 5.0 {
                return VoxelKind::Dirt;
            }
            return VoxelKind::Stone;
        }
        if col.valley > 0.5 || col.canyon > 0.5 {
            let floor = p.base_height - p.valley_depth * col.valley;
            if zf < floor + 3.0 {
                return if col.moisture > 0.6 {
                    VoxelKind::Clay
                } else {
                    VoxelKind::Gravel
                };
            }
            if depth < 2.0 {
                return VoxelKind::DarkStone;
            }
            return VoxelKind::Stone;
        }

        match col.biome {
            BiomeKind::Desert | BiomeKind::Badlands => {
                if depth < 4.0 {
                    return if col.biome == BiomeKind::Badlands {
                        VoxelKind::RedRock
                    } else {
                        VoxelKind::Sand
                    };
                }
            }
            BiomeKind::Tundra => {
                if depth < 1.0 {
                    return VoxelKind::Snow;
                }
                if depth < 3.0 {
                    return VoxelKind::Dirt;
                }
            }
            BiomeKind::Mountains => {
                if col.height > p.base_height + 20.0 && depth < 1.0 {
                    return VoxelKind::Snow;
                }
            }
            BiomeKind::Ocean => {
                if zf < p.base_height - 10.0 || depth < 3.0 {
                    return VoxelKind::Sand;
                }
            }
            BiomeKind::Swamp => {
                if depth < 1.0 {
                    return VoxelKind::Grass;
                }
                if depth < 2.0 {
                    return VoxelKind::Clay;
                }
                if depth < 4.0 {
                    return VoxelKind::Dirt;
                }
            }
            BiomeKind::HighlandPlains => {
                if depth < 1.0 {
                    return VoxelKind::Grass;
                }
                if depth < 3.0 {
                    return VoxelKind::Dirt;
                }
            }
            _ => {
                if depth < 1.0 {
                    return VoxelKind::Grass;
                }
                if depth < 4.0 {
                    return VoxelKind::Dirt;
                }
            }
        }
        VoxelKind::Stone
    }

    fn underground_material(&self, col: &ColumnSample, x: i32, y: i32, z: i32) -> VoxelKind {
        if z <= 0 {
            return VoxelKind::Bedrock;
        }
        let (xf, yf, zf) = (x as f32, y as f32, z as f32);
        if let Some(n) = &self.noise {
            if z < BEDROCK_BAND && n.value_2d(xf * 0.25 + zf * 10.0, yf * 0.25) > 0.3 * zf {
                return VoxelKind::Bedrock;
            }
            if zf < col.height - 10.0 && n.value_3d(xf * 0.1, yf * 0.1, zf * 0.1) > 0.8 {
                return VoxelKind::Gravel;
            }
        }
        if matches!(col.feature, BiomeKind::Plateau | BiomeKind::Canyon) {
            return VoxelKind::DarkStone;
        }
        VoxelKind::Stone
    }

    // ---- chunk fill ----

    /// Column tile for a chunk stack, from the cache when possible.
    pub fn columns_for(&self, origin_x: i32, origin_y: i32, size: usize) -> Arc<ColumnTile> {
        let key = ColumnKey::new(origin_x, origin_y, size);
        if self.columns.is_enabled() {
            if let Some(tile) = self.columns.get(&key) {
                return tile;
            }
        }
        let t0 = Instant::now();
        let side = size + 1;
        let mut samples = Vec::with_capacity(side * side);
        for ly in 0..side {
            for lx in 0..side {
                samples.push(self.sample_column(origin_x + lx as i32, origin_y + ly as i32));
            }
        }
        let us = t0.elapsed().as_micros().min(u128::from(u32::MAX)) as u32;
        let tile = ColumnTile::new(key, samples, us);
        self.columns.insert(Arc::clone(&tile));
        tile
    }
}

impl TerrainSource for FieldGenerator {
    fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        FieldGenerator::density(self, x, y, z)
    }

    fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind {
        FieldGenerator::material(self, x, y, z)
    }

    fn surface_height(&self, x: i32, y: i32) -> f32 {
        self.terrain_height(x, y)
    }

    fn column_cache_stats(&self) -> Option<ColumnCacheStats> {
        Some(FieldGenerator::column_cache_stats(self))
    }

    fn fill_chunk(
        &self,
        origin: [i32; 3],
        size: usize,
        density: &mut [f32],
        material: &mut [VoxelKind],
        cancel: &dyn Fn() -> bool,
    ) -> bool {
        if cancel() {
            return false;
        }
        if self.noise.is_none() {
            density.fill(1.0);
            material.fill(VoxelKind::Air);
            return true;
        }
        let tile = self.columns_for(origin[0], origin[1], size);
        for lz in 0..=size {
            if cancel() {
                return false;
            }
            let z = origin[2] + lz as i32;
            for ly in 0..=size {
                let y = origin[1] + ly as i32;
                for lx in 0..=size {
                    let x = origin[0] + lx as i32;
                    let col = tile.at(lx, ly);
                    let d = self.density_in(col, x, y, z);
                    density[density_index(lx, ly, lz, size)] = d;
                    if lx < size && ly < size && lz < size {
                        material[material_index(lx, ly, lz, size)] =
                            self.material_in(col, x, y, z, d);
                    }
                }
            }
        }
        true
    }
}
