use strata_geom::Vec3;
use strata_world::voxel::{ChunkCoord, Voxel, VoxelKind};

use super::ChunkStore;
use crate::raycast::{RayHit, raycast_cells};

impl ChunkStore {
    /// World voxel containing `pos` (world units).
    pub fn world_to_voxel(&self, pos: Vec3) -> [i32; 3] {
        [
            (pos.x / self.voxel_size).floor() as i32,
            (pos.y / self.voxel_size).floor() as i32,
            (pos.z / self.voxel_size).floor() as i32,
        ]
    }

    pub fn world_to_chunk_coord(&self, pos: Vec3) -> ChunkCoord {
        let [x, y, z] = self.world_to_voxel(pos);
        ChunkCoord::from_voxel(x, y, z, self.size)
    }

    /// Owning chunk and the voxel's position inside it.
    pub fn world_to_local_voxel(&self, pos: Vec3) -> (ChunkCoord, [i32; 3]) {
        self.split_voxel(self.world_to_voxel(pos))
    }

    fn split_voxel(&self, w: [i32; 3]) -> (ChunkCoord, [i32; 3]) {
        let coord = ChunkCoord::from_voxel(w[0], w[1], w[2], self.size);
        let o = coord.origin(self.size);
        (coord, [w[0] - o[0], w[1] - o[1], w[2] - o[2]])
    }

    /// Voxel at world voxel coordinate `w`; air where no generated chunk holds it.
    pub fn voxel_at(&self, w: [i32; 3]) -> Voxel {
        let (coord, [x, y, z]) = self.split_voxel(w);
        match self.chunks.get(&coord) {
            Some(chunk) if chunk.has_field() => chunk.voxel(x, y, z),
            _ => Voxel::AIR,
        }
    }

    pub fn get_voxel(&self, pos: Vec3) -> Voxel {
        self.voxel_at(self.world_to_voxel(pos))
    }

    /// Writes the voxel's material and density. The density corner is written in every loaded chunk
    /// that stores it. Dirties the owner, every chunk whose copy changed and the face neighbours the
    /// voxel borders. Returns false when the owner is not generated or nothing changed.
    pub fn set_voxel(&mut self, pos: Vec3, v: Voxel) -> bool {
        let (owner, local) = self.world_to_local_voxel(pos);
        let Some(chunk) = self.chunks.get_mut(&owner).filter(|c| c.has_field()) else {
            return false;
        };
        let changed = chunk.set_material(local[0], local[1], local[2], v.kind);
        let density = v.field_density();
        let n = self.size as i32;
        let mut touched = Vec::new();
        for dz in 0..2 {
            for dy in 0..2 {
                for dx in 0..2 {
                    let d = [dx, dy, dz];
                    if (0..3).any(|a| d[a] == 1 && local[a] != 0) {
                        continue;
                    }
                    let coord = owner.offset(-dx, -dy, -dz);
                    let Some(c) = self.chunks.get_mut(&coord).filter(|c| c.has_field()) else {
                        continue;
                    };
                    if c.set_density(local[0] + dx * n, local[1] + dy * n, local[2] + dz * n, density) {
                        touched.push(coord);
                    }
                }
            }
        }
        if !changed && touched.is_empty() {
            return false;
        }
        if let Some(c) = self.chunks.get_mut(&owner) {
            c.recompute_occupancy();
        }
        for &coord in &touched {
            if let Some(c) = self.chunks.get_mut(&coord) {
                c.recompute_occupancy();
            }
        }
        touched.push(owner);
        for (a, &l) in local.iter().enumerate() {
            if l == 0 {
                touched.push(owner.neighbor(a * 2 + 1));
            }
            if l == n - 1 {
                touched.push(owner.neighbor(a * 2));
            }
        }
        touched.sort_unstable_by_key(|c| (c.cz, c.cy, c.cx));
        touched.dedup();
        for coord in touched {
            self.mark_dirty(coord);
        }
        log::trace!("set_voxel {:?} -> {}", self.world_to_voxel(pos), v.kind);
        true
    }

    /// Spherical sculpt around `pos` (world units). `add` makes terrain more solid. Every generated
    /// chunk storing a sample inside the sphere is updated; cells whose corner crosses the surface
    /// switch between air and dirt. Returns the chunks that changed, which are queued for remeshing.
    pub fn modify_density(&mut self, pos: Vec3, radius: f32, strength: f32, add: bool) -> Vec<ChunkCoord> {
        let mut dirtied = Vec::new();
        if radius <= 0.0 || !pos.is_finite() {
            return dirtied;
        }
        let vs = self.voxel_size;
        let n = self.size as i32;
        let lo = self.world_to_voxel(pos - Vec3::splat(radius));
        let hi = self.world_to_voxel(pos + Vec3::splat(radius));
        let cmin = ChunkCoord::from_voxel(lo[0] - 1, lo[1] - 1, lo[2] - 1, self.size);
        let cmax = ChunkCoord::from_voxel(hi[0] + 1, hi[1] + 1, hi[2] + 1, self.size);
        for cz in cmin.cz..=cmax.cz {
            for cy in cmin.cy..=cmax.cy {
                for cx in cmin.cx..=cmax.cx {
                    let coord = ChunkCoord::new(cx, cy, cz);
                    let Some(chunk) = self.chunks.get_mut(&coord).filter(|c| c.has_field()) else {
                        continue;
                    };
                    let o = chunk.origin();
                    let local = [
                        pos.x - o[0] as f32 * vs,
                        pos.y - o[1] as f32 * vs,
                        pos.z - o[2] as f32 * vs,
                    ];
                    let changed = chunk.modify_density(local, radius, strength, add, vs);
                    if changed.is_empty() {
                        continue;
                    }
                    for [x, y, z] in changed {
                        if x >= n || y >= n || z >= n {
                            continue;
                        }
                        let solid = chunk.density(x, y, z) <= 0.0;
                        let kind = chunk.material(x, y, z);
                        if solid && !kind.is_solid() {
                            chunk.set_material(x, y, z, VoxelKind::Dirt);
                        } else if !solid && kind.is_solid() {
                            chunk.set_material(x, y, z, VoxelKind::Air);
                        }
                    }
                    dirtied.push(coord);
                }
            }
        }
        for &coord in &dirtied {
            self.mark_dirty(coord);
        }
        if !dirtied.is_empty() {
            log::debug!("sculpt at {:?} r={} touched {} chunk(s)", pos, radius, dirtied.len());
        }
        dirtied
    }

    pub fn destroy_voxel(&mut self, pos: Vec3) -> bool {
        self.set_voxel(pos, Voxel::AIR)
    }

    pub fn place_voxel(&mut self, pos: Vec3, kind: VoxelKind) -> bool {
        self.set_voxel(pos, Voxel::solid(kind))
    }

    /// First solid voxel along `start..end`, all in world units.
    pub fn raycast(&self, start: Vec3, end: Vec3) -> Option<RayHit> {
        raycast_cells(start, end, self.voxel_size, |cell| self.voxel_at(cell))
    }
}
