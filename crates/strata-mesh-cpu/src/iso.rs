use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use strata_geom::Vec3;
use strata_world::voxel::VoxelKind;

use crate::mesh_buffer::MeshBuffer;
use crate::sampler::FieldSampler;
use crate::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};

/// Solid cubes whose corners carry no solid material (sculpted-in volume) render as this.
const FALLBACK_MATERIAL: VoxelKind = VoxelKind::Stone;

/// Vertex keys keep three decimal places of lattice position.
const KEY_SCALE: f32 = 1000.0;
const KEY_BITS: u32 = 21;
const KEY_OFFSET: i64 = 1 << (KEY_BITS - 1);
const KEY_MASK: u64 = (1 << KEY_BITS) - 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub cubes_crossed: usize,
    pub vertices: usize,
    pub triangles: usize,
    /// Vertex emissions answered from the dedup map.
    pub shared_vertices: usize,
}

#[derive(Clone, Copy, Default)]
struct EdgeVertex {
    /// Lattice units, chunk-local.
    pos: Vec3,
    normal: Vec3,
}

/// Cube edge for LOD `lod` on an `n`-cell chunk: `1 << lod`, halved until it divides `n`.
pub fn lod_step(n: usize, lod: u8) -> usize {
    let mut s = 1usize << lod.min(3);
    while s > 1 && (s > n || n % s != 0) {
        s >>= 1;
    }
    s
}

/// Packs a lattice position into a 64-bit key, 21 bits per axis.
#[inline]
pub fn vertex_key(p: Vec3) -> u64 {
    let q = |v: f32| (((v * KEY_SCALE).round() as i64 + KEY_OFFSET) as u64) & KEY_MASK;
    q(p.x) | (q(p.y) << KEY_BITS) | (q(p.z) << (2 * KEY_BITS))
}

/// LOD-aware Marching Cubes over a density lattice.
pub struct IsosurfaceMesher {
    pub voxel_size: f32,
    pub dedup: bool,
    lookup: HashMap<u64, u32>,
}

impl IsosurfaceMesher {
    pub fn new(voxel_size: f32, dedup: bool) -> Self {
        Self {
            voxel_size,
            dedup,
            lookup: HashMap::new(),
        }
    }

    pub fn mesh<S: FieldSampler + ?Sized>(&mut self, field: &S, n: usize, lod: u8) -> MeshBuffer {
        let mut out = MeshBuffer::default();
        self.mesh_into(field, n, lod, &mut out);
        out
    }

    /// Meshes cubes `[0, n)^3` at the LOD step into `out`, replacing its contents.
    pub fn mesh_into<S: FieldSampler + ?Sized>(
        &mut self,
        field: &S,
        n: usize,
        lod: u8,
        out: &mut MeshBuffer,
    ) -> MeshStats {
        out.clear_keep_capacity();
        self.lookup.clear();
        let mut stats = MeshStats::default();
        let s = lod_step(n, lod) as i32;
        let cells = n as i32 / s;

        for cz in 0..cells {
            for cy in 0..cells {
                for cx in 0..cells {
                    let base = [cx * s, cy * s, cz * s];
                    let mut d = [0.0f32; 8];
                    let mut config = 0usize;
                    for (i, o) in CORNER_OFFSETS.iter().enumerate() {
                        d[i] = field.density(base[0] + o[0] * s, base[1] + o[1] * s, base[2] + o[2] * s);
                        if d[i] <= 0.0 {
                            config |= 1 << i;
                        }
                    }
                    let edges = EDGE_TABLE[config];
                    if edges == 0 {
                        continue;
                    }
                    stats.cubes_crossed += 1;
                    let rgba = dominant_material(field, base, s).color();

                    let mut verts = [EdgeVertex::default(); 12];
                    for (e, [a, b]) in EDGE_CORNERS.iter().enumerate() {
                        if edges & (1 << e) == 0 {
                            continue;
                        }
                        let ca = corner(base, *a, s);
                        let cb = corner(base, *b, s);
                        let t = d[*a] / (d[*a] - d[*b]);
                        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
                        let pa = Vec3::new(ca[0] as f32, ca[1] as f32, ca[2] as f32);
                        let pb = Vec3::new(cb[0] as f32, cb[1] as f32, cb[2] as f32);
                        let g = gradient(field, ca).lerp(gradient(field, cb), t);
                        verts[e] = EdgeVertex {
                            pos: pa.lerp(pb, t),
                            normal: if g.length_squared() > 1e-12 {
                                g.normalized()
                            } else {
                                Vec3::UP
                            },
                        };
                    }

                    for tri in TRI_TABLE[config].chunks_exact(3) {
                        if tri[0] < 0 {
                            break;
                        }
                        let v = [
                            verts[tri[0] as usize],
                            verts[tri[1] as usize],
                            verts[tri[2] as usize],
                        ];
                        let mut ids = [0u32; 3];
                        for k in 0..3 {
                            ids[k] = self.emit(out, v[k], rgba, &mut stats);
                        }
                        // Counter-clockwise seen from the air side.
                        let face = (v[1].pos - v[0].pos).cross(v[2].pos - v[0].pos);
                        if face.dot(v[0].normal + v[1].normal + v[2].normal) < 0.0 {
                            ids.swap(1, 2);
                        }
                        out.push_triangle(ids[0], ids[1], ids[2]);
                        stats.triangles += 1;
                    }
                }
            }
        }
        stats.vertices = out.vertex_count();
        log::trace!(
            "iso mesh n={} step={} cubes={} verts={} tris={} shared={}",
            n,
            s,
            stats.cubes_crossed,
            stats.vertices,
            stats.triangles,
            stats.shared_vertices
        );
        stats
    }

    fn emit(&mut self, out: &mut MeshBuffer, v: EdgeVertex, rgba: [u8; 4], stats: &mut MeshStats) -> u32 {
        let world = v.pos * self.voxel_size;
        let uv = planar_uv(v.pos, v.normal);
        if !self.dedup {
            return out.push_vertex(world, v.normal, uv, rgba);
        }
        match self.lookup.entry(vertex_key(v.pos)) {
            Entry::Occupied(e) => {
                stats.shared_vertices += 1;
                *e.get()
            }
            Entry::Vacant(e) => *e.insert(out.push_vertex(world, v.normal, uv, rgba)),
        }
    }
}

#[inline]
fn corner(base: [i32; 3], i: usize, s: i32) -> [i32; 3] {
    let o = CORNER_OFFSETS[i];
    [base[0] + o[0] * s, base[1] + o[1] * s, base[2] + o[2] * s]
}

/// Central difference at unit spacing; points toward increasing density (out of the solid).
fn gradient<S: FieldSampler + ?Sized>(field: &S, p: [i32; 3]) -> Vec3 {
    let [x, y, z] = p;
    Vec3::new(
        field.density(x + 1, y, z) - field.density(x - 1, y, z),
        field.density(x, y + 1, z) - field.density(x, y - 1, z),
        field.density(x, y, z + 1) - field.density(x, y, z - 1),
    )
}

/// Most frequent solid material among the cube's corner cells; ties go to the lower corner index.
fn dominant_material<S: FieldSampler + ?Sized>(field: &S, base: [i32; 3], s: i32) -> VoxelKind {
    let mut kinds = [VoxelKind::Air; 8];
    let mut counts = [0u8; VoxelKind::COUNT];
    for (i, k) in kinds.iter_mut().enumerate() {
        let [x, y, z] = corner(base, i, s);
        *k = field.material(x, y, z);
        if k.is_solid() {
            counts[k.id() as usize] += 1;
        }
    }
    let mut best = FALLBACK_MATERIAL;
    let mut best_n = 0;
    for k in kinds {
        let c = counts[k.id() as usize];
        if k.is_solid() && c > best_n {
            best = k;
            best_n = c;
        }
    }
    best
}

fn planar_uv(p: Vec3, n: Vec3) -> (f32, f32) {
    match n.dominant_axis() {
        0 => (p.y, p.z),
        1 => (p.x, p.z),
        _ => (p.x, p.y),
    }
}
