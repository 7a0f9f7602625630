//! Chunk storage: corner densities, cell materials, lifecycle state, and the retire/reuse pool.
#![forbid(unsafe_code)]

mod pool;

pub use pool::{ChunkPool, ChunkPoolStats};

use strata_world::field::smoothstep;
use strata_world::voxel::layout::{
    cell_in_bounds, corner_in_bounds, density_index, density_len, material_index, material_len,
};
use strata_world::voxel::{ChunkCoord, Voxel, VoxelKind, decode_density, encode_density};

/// Density read outside a chunk's corner grid or from an unpopulated chunk.
pub const OPEN_DENSITY: f32 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChunkState {
    #[default]
    Unloaded,
    Loading,
    Generated,
    Meshed,
    PendingUnload,
}

impl ChunkState {
    /// Field data is present and readable.
    #[inline]
    pub fn has_field(self) -> bool {
        matches!(self, ChunkState::Generated | ChunkState::Meshed)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkOccupancy {
    /// No solid corner.
    Empty,
    /// Every corner solid.
    Solid,
    Mixed,
}

impl ChunkOccupancy {
    pub fn classify(density: &[f32]) -> Self {
        let mut solid = 0usize;
        for d in density {
            if *d <= 0.0 {
                solid += 1;
            }
        }
        if solid == 0 {
            ChunkOccupancy::Empty
        } else if solid == density.len() {
            ChunkOccupancy::Solid
        } else {
            ChunkOccupancy::Mixed
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, ChunkOccupancy::Empty)
    }

    /// No sign change inside, so no isosurface can cross the chunk's own corners.
    #[inline]
    pub fn is_uniform(self) -> bool {
        !matches!(self, ChunkOccupancy::Mixed)
    }
}

/// The two arrays a generator fills. Either both sized for a chunk or both empty.
#[derive(Clone, Debug, Default)]
pub struct ChunkField {
    pub density: Vec<f32>,
    pub material: Vec<VoxelKind>,
}

impl ChunkField {
    /// Zeroed field sized for edge `n`.
    pub fn zeroed(n: usize) -> Self {
        let mut f = Self::default();
        f.resize_zeroed(n);
        f
    }

    /// Sets both arrays to exactly the lengths for edge `n`, every entry zero / air.
    pub fn resize_zeroed(&mut self, n: usize) {
        self.density.clear();
        self.density.resize(density_len(n), 0.0);
        self.material.clear();
        self.material.resize(material_len(n), VoxelKind::Air);
    }

    /// Drops contents but keeps allocations for reuse.
    pub fn clear_keep_capacity(&mut self) {
        self.density.clear();
        self.material.clear();
    }

    #[inline]
    pub fn is_sized_for(&self, n: usize) -> bool {
        self.density.len() == density_len(n) && self.material.len() == material_len(n)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.density.is_empty() && self.material.is_empty()
    }

    /// Bytes a field for edge `n` needs once populated.
    pub fn bytes_for(n: usize) -> usize {
        density_len(n) * std::mem::size_of::<f32>() + material_len(n) * std::mem::size_of::<VoxelKind>()
    }

    pub fn capacity_bytes(&self) -> usize {
        self.density.capacity() * std::mem::size_of::<f32>()
            + self.material.capacity() * std::mem::size_of::<VoxelKind>()
    }
}

#[derive(Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub size: usize,
    field: ChunkField,
    pub state: ChunkState,
    /// LOD tier 0..=3; mesh step is `1 << lod`.
    pub lod: u8,
    pub collision: bool,
    /// Bumped by every edit or policy change that needs a new mesh.
    pub rev: u64,
    /// `rev` at the time the current mesh was built.
    pub built_rev: u64,
    /// Face neighbours present in the store when last resolved (+X, -X, +Y, -Y, +Z, -Z).
    pub neighbors: [Option<ChunkCoord>; 6],
    pub occupancy: Option<ChunkOccupancy>,
    /// Any cell holds a solid material. Tracked apart from `occupancy` since a placed block may
    /// carry an open density byte.
    pub solid_material: bool,
    /// Id of the background job that currently owns the field, if any.
    pub job: Option<u64>,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, size: usize) -> Self {
        Self {
            coord,
            size,
            field: ChunkField::default(),
            state: ChunkState::Unloaded,
            lod: 0,
            collision: false,
            rev: 0,
            built_rev: 0,
            neighbors: [None; 6],
            occupancy: None,
            solid_material: false,
            job: None,
        }
    }

    /// Returns the chunk to its freshly constructed state for `coord`, keeping buffer capacity.
    pub fn reset(&mut self, coord: ChunkCoord, size: usize) {
        self.coord = coord;
        self.size = size;
        self.field.clear_keep_capacity();
        self.state = ChunkState::Unloaded;
        self.lod = 0;
        self.collision = false;
        self.rev = 0;
        self.built_rev = 0;
        self.neighbors = [None; 6];
        self.occupancy = None;
        self.solid_material = false;
        self.job = None;
    }

    /// World voxel coordinate of local corner `(0, 0, 0)`.
    #[inline]
    pub fn origin(&self) -> [i32; 3] {
        self.coord.origin(self.size)
    }

    #[inline]
    pub fn field(&self) -> &ChunkField {
        &self.field
    }

    #[inline]
    pub fn has_field(&self) -> bool {
        self.field.is_sized_for(self.size)
    }

    /// Moves the field buffers out for a generator, sized and zeroed. The chunk reads as open
    /// until [`Chunk::install_field`] hands them back.
    pub fn take_field_for_generation(&mut self) -> ChunkField {
        let mut f = std::mem::take(&mut self.field);
        f.resize_zeroed(self.size);
        f
    }

    /// Installs a filled field and marks the chunk generated.
    pub fn install_field(&mut self, field: ChunkField) {
        debug_assert!(field.is_sized_for(self.size));
        self.occupancy = Some(ChunkOccupancy::classify(&field.density));
        self.solid_material = field.material.iter().any(|k| k.is_solid());
        self.field = field;
        self.state = ChunkState::Generated;
        self.mark_dirty();
    }

    /// Takes back buffers from an abandoned job for their capacity only; contents are dropped.
    pub fn recycle_field(&mut self, mut field: ChunkField) {
        field.clear_keep_capacity();
        self.field = field;
        self.occupancy = None;
        self.solid_material = false;
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.rev = self.rev.wrapping_add(1);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.rev != self.built_rev
    }

    #[inline]
    pub fn mark_built(&mut self) {
        self.built_rev = self.rev;
        if self.state == ChunkState::Generated {
            self.state = ChunkState::Meshed;
        }
    }

    /// Density at local corner `(x, y, z)`; open outside `[0, size]` or when unpopulated.
    #[inline]
    pub fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        match corner_in_bounds(x, y, z, self.size) {
            Some((x, y, z)) => self
                .field
                .density
                .get(density_index(x, y, z, self.size))
                .copied()
                .unwrap_or(OPEN_DENSITY),
            None => OPEN_DENSITY,
        }
    }

    /// Material at local cell `(x, y, z)`; air outside `[0, size)` or when unpopulated.
    #[inline]
    pub fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind {
        match cell_in_bounds(x, y, z, self.size) {
            Some((x, y, z)) => self
                .field
                .material
                .get(material_index(x, y, z, self.size))
                .copied()
                .unwrap_or(VoxelKind::Air),
            None => VoxelKind::Air,
        }
    }

    /// Writes a corner density. Returns whether the stored value changed.
    pub fn set_density(&mut self, x: i32, y: i32, z: i32, d: f32) -> bool {
        let Some((x, y, z)) = corner_in_bounds(x, y, z, self.size) else {
            return false;
        };
        let i = density_index(x, y, z, self.size);
        match self.field.density.get_mut(i) {
            Some(slot) if *slot != d => {
                *slot = d;
                true
            }
            _ => false,
        }
    }

    pub fn set_material(&mut self, x: i32, y: i32, z: i32, kind: VoxelKind) -> bool {
        let Some((x, y, z)) = cell_in_bounds(x, y, z, self.size) else {
            return false;
        };
        let i = material_index(x, y, z, self.size);
        match self.field.material.get_mut(i) {
            Some(slot) if *slot != kind => {
                *slot = kind;
                true
            }
            _ => false,
        }
    }

    /// Material of cell `(x, y, z)` with the density of its minimum corner, byte-encoded.
    pub fn voxel(&self, x: i32, y: i32, z: i32) -> Voxel {
        if cell_in_bounds(x, y, z, self.size).is_none() {
            return Voxel::AIR;
        }
        Voxel::new(self.material(x, y, z), encode_density(self.density(x, y, z)))
    }

    /// Writes the cell material and its minimum-corner density. Returns whether anything changed.
    pub fn set_voxel(&mut self, x: i32, y: i32, z: i32, v: Voxel) -> bool {
        if cell_in_bounds(x, y, z, self.size).is_none() {
            return false;
        }
        let m = self.set_material(x, y, z, v.kind);
        let d = self.set_density(x, y, z, decode_density(v.density));
        if m || d {
            self.recompute_occupancy();
        }
        m || d
    }

    /// Spherical sculpt centred at `local` (world units from the chunk origin). `add` makes the
    /// field more solid. Falloff is `smoothstep(0, 1, 1 - dist/radius)`, results clamp to `[-1, 1]`.
    /// Returns the local corners whose stored value changed.
    pub fn modify_density(
        &mut self,
        local: [f32; 3],
        radius: f32,
        strength: f32,
        add: bool,
        voxel_size: f32,
    ) -> Vec<[i32; 3]> {
        let mut changed = Vec::new();
        if !self.has_field() || radius <= 0.0 || voxel_size <= 0.0 {
            return changed;
        }
        let vr = (radius / voxel_size).ceil() as i32 + 1;
        let cx = (local[0] / voxel_size).floor() as i32;
        let cy = (local[1] / voxel_size).floor() as i32;
        let cz = (local[2] / voxel_size).floor() as i32;
        let n = self.size as i32;
        for z in (cz - vr).max(0)..=(cz + vr).min(n) {
            for y in (cy - vr).max(0)..=(cy + vr).min(n) {
                for x in (cx - vr).max(0)..=(cx + vr).min(n) {
                    let dx = x as f32 * voxel_size - local[0];
                    let dy = y as f32 * voxel_size - local[1];
                    let dz = z as f32 * voxel_size - local[2];
                    let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                    if dist > radius {
                        continue;
                    }
                    let falloff = smoothstep(0.0, 1.0, 1.0 - dist / radius);
                    let delta = strength * falloff;
                    let cur = self.density(x, y, z);
                    let next = if add { cur - delta } else { cur + delta }.clamp(-1.0, 1.0);
                    if self.set_density(x, y, z, next) {
                        changed.push([x, y, z]);
                    }
                }
            }
        }
        if !changed.is_empty() {
            self.recompute_occupancy();
        }
        changed
    }

    pub fn recompute_occupancy(&mut self) {
        if self.has_field() {
            self.occupancy = Some(ChunkOccupancy::classify(&self.field.density));
            self.solid_material = self.field.material.iter().any(|k| k.is_solid());
        }
    }

    /// Bytes held by this chunk's field buffers, including spare capacity.
    pub fn memory_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.field.capacity_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated(n: usize) -> Chunk {
        let mut c = Chunk::new(ChunkCoord::new(0, 0, 0), n);
        let mut f = c.take_field_for_generation();
        for (i, d) in f.density.iter_mut().enumerate() {
            *d = if i % 2 == 0 { -1.0 } else { 1.0 };
        }
        f.material.fill(VoxelKind::Stone);
        c.install_field(f);
        c
    }

    #[test]
    fn out_of_bounds_reads_are_open_air() {
        let c = generated(4);
        assert_eq!(c.density(-1, 0, 0), OPEN_DENSITY);
        assert_eq!(c.density(5, 0, 0), OPEN_DENSITY);
        assert_eq!(c.material(4, 0, 0), VoxelKind::Air);
        assert_eq!(c.voxel(0, 0, 4), Voxel::AIR);
        // Corner (4, 4, 4) is in the density grid even though it is not a cell.
        assert_eq!(c.density(4, 4, 4), -1.0);
    }

    #[test]
    fn unpopulated_chunk_reads_open() {
        let c = Chunk::new(ChunkCoord::new(1, 2, 3), 4);
        assert_eq!(c.density(0, 0, 0), OPEN_DENSITY);
        assert_eq!(c.material(0, 0, 0), VoxelKind::Air);
        assert!(!c.has_field());
    }

    #[test]
    fn install_sets_state_occupancy_and_dirty() {
        let c = generated(4);
        assert_eq!(c.state, ChunkState::Generated);
        assert_eq!(c.occupancy, Some(ChunkOccupancy::Mixed));
        assert!(c.is_dirty());
    }

    #[test]
    fn solid_material_tracks_cells_not_corners() {
        let mut c = Chunk::new(ChunkCoord::new(0, 0, 0), 4);
        let mut f = c.take_field_for_generation();
        f.density.fill(OPEN_DENSITY);
        f.material.fill(VoxelKind::Air);
        c.install_field(f);
        assert!(!c.solid_material);
        assert!(c.set_voxel(1, 1, 1, Voxel::new(VoxelKind::Stone, 0)));
        assert_eq!(c.occupancy, Some(ChunkOccupancy::Empty));
        assert!(c.solid_material);
        c.reset(ChunkCoord::new(1, 0, 0), 4);
        assert!(!c.solid_material);
    }

    #[test]
    fn mark_built_clears_dirty_and_advances_state() {
        let mut c = generated(4);
        c.mark_built();
        assert!(!c.is_dirty());
        assert_eq!(c.state, ChunkState::Meshed);
        c.mark_dirty();
        assert!(c.is_dirty());
    }

    #[test]
    fn field_is_absent_while_taken() {
        let mut c = generated(4);
        let f = c.take_field_for_generation();
        assert!(f.is_sized_for(4));
        assert!(f.density.iter().all(|d| *d == 0.0));
        assert!(!c.has_field());
        assert_eq!(c.density(1, 1, 1), OPEN_DENSITY);
    }

    #[test]
    fn recycled_field_keeps_capacity_not_data() {
        let mut c = generated(4);
        let f = c.take_field_for_generation();
        let cap = f.density.capacity();
        c.recycle_field(f);
        assert!(!c.has_field());
        assert_eq!(c.density(0, 0, 0), OPEN_DENSITY);
        assert!(c.field().density.capacity() >= cap);
    }

    #[test]
    fn sculpt_only_touches_corners_in_radius() {
        let mut c = generated(8);
        let changed = c.modify_density([400.0, 400.0, 400.0], 50.0, 0.5, false, 100.0);
        // Only the corner exactly at the centre lies within 50 units.
        assert_eq!(changed, vec![[4, 4, 4]]);
        assert_eq!(c.density(4, 4, 4), -0.5);
    }

    #[test]
    fn sculpt_clamps_to_unit_range() {
        let mut c = generated(8);
        for _ in 0..10 {
            c.modify_density([400.0, 400.0, 400.0], 300.0, 0.9, true, 100.0);
        }
        assert_eq!(c.density(4, 4, 4), -1.0);
        for _ in 0..10 {
            c.modify_density([400.0, 400.0, 400.0], 300.0, 0.9, false, 100.0);
        }
        assert_eq!(c.density(4, 4, 4), 1.0);
    }

    #[test]
    fn occupancy_classification() {
        assert_eq!(ChunkOccupancy::classify(&[1.0, 0.5]), ChunkOccupancy::Empty);
        assert_eq!(ChunkOccupancy::classify(&[-1.0, 0.0]), ChunkOccupancy::Solid);
        assert_eq!(ChunkOccupancy::classify(&[-1.0, 0.5]), ChunkOccupancy::Mixed);
        assert!(ChunkOccupancy::Solid.is_uniform());
    }
}
