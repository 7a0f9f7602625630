use strata_geom::Vec3;
use strata_world::voxel::VoxelKind;

use crate::face::Face;
use crate::mesh_buffer::MeshBuffer;
use crate::sampler::FieldSampler;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockStats {
    /// Visible unit faces before merging.
    pub faces: usize,
    /// Quads emitted after merging.
    pub quads: usize,
}

/// Greedy face-merging mesher for cubic voxels.
pub struct BlockMesher {
    pub voxel_size: f32,
    mask: Vec<Option<VoxelKind>>,
}

#[inline]
fn lattice(axis: usize, slice: i32, ua: usize, u: i32, va: usize, v: i32) -> [i32; 3] {
    let mut p = [0i32; 3];
    p[axis] = slice;
    p[ua] = u;
    p[va] = v;
    p
}

/// A cell face is visible when the cell is solid and its neighbour across the face is transparent.
#[inline]
fn face_visible<S: FieldSampler + ?Sized>(field: &S, p: [i32; 3], face: Face) -> Option<VoxelKind> {
    let k = field.material(p[0], p[1], p[2]);
    if !k.is_solid() {
        return None;
    }
    let (dx, dy, dz) = face.delta();
    field
        .material(p[0] + dx, p[1] + dy, p[2] + dz)
        .is_transparent()
        .then_some(k)
}

/// Number of visible unit faces, i.e. the quad count of a one-quad-per-face mesher.
pub fn visible_faces<S: FieldSampler + ?Sized>(field: &S, n: usize) -> usize {
    let n = n as i32;
    let mut count = 0;
    for face in Face::ALL {
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    if face_visible(field, [x, y, z], face).is_some() {
                        count += 1;
                    }
                }
            }
        }
    }
    count
}

impl BlockMesher {
    pub fn new(voxel_size: f32) -> Self {
        Self {
            voxel_size,
            mask: Vec::new(),
        }
    }

    pub fn mesh<S: FieldSampler + ?Sized>(&mut self, field: &S, n: usize) -> MeshBuffer {
        let mut out = MeshBuffer::default();
        self.mesh_into(field, n, &mut out);
        out
    }

    /// Sweeps each face direction slice by slice, merging same-material visible faces into
    /// maximal rectangles (widest first, then tallest).
    pub fn mesh_into<S: FieldSampler + ?Sized>(
        &mut self,
        field: &S,
        n: usize,
        out: &mut MeshBuffer,
    ) -> BlockStats {
        out.clear_keep_capacity();
        let mut stats = BlockStats::default();
        let ni = n as i32;
        for face in Face::ALL {
            let axis = face.axis();
            let (ua, va) = face.plane_axes();
            let normal = face.normal();
            let plane_offset = if face.is_positive() { 1 } else { 0 };
            for slice in 0..ni {
                self.mask.clear();
                self.mask.resize(n * n, None);
                for v in 0..ni {
                    for u in 0..ni {
                        let p = lattice(axis, slice, ua, u, va, v);
                        if let Some(k) = face_visible(field, p, face) {
                            self.mask[u as usize + v as usize * n] = Some(k);
                            stats.faces += 1;
                        }
                    }
                }
                for v in 0..n {
                    let mut u = 0;
                    while u < n {
                        let Some(k) = self.mask[u + v * n] else {
                            u += 1;
                            continue;
                        };
                        let mut w = 1;
                        while u + w < n && self.mask[u + w + v * n] == Some(k) {
                            w += 1;
                        }
                        let mut h = 1;
                        'grow: while v + h < n {
                            for i in 0..w {
                                if self.mask[u + i + (v + h) * n] != Some(k) {
                                    break 'grow;
                                }
                            }
                            h += 1;
                        }
                        for j in 0..h {
                            for i in 0..w {
                                self.mask[u + i + (v + j) * n] = None;
                            }
                        }
                        let plane = slice + plane_offset;
                        let at = |du: usize, dv: usize| {
                            let p = lattice(axis, plane, ua, (u + du) as i32, va, (v + dv) as i32);
                            Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32) * self.voxel_size
                        };
                        let (wf, hf) = (w as f32, h as f32);
                        out.add_quad_uv(
                            at(0, 0),
                            at(w, 0),
                            at(w, h),
                            at(0, h),
                            normal,
                            [(0.0, 0.0), (wf, 0.0), (wf, hf), (0.0, hf)],
                            k.color(),
                        );
                        stats.quads += 1;
                        u += w;
                    }
                }
            }
        }
        log::trace!(
            "block mesh n={} faces={} quads={}",
            n,
            stats.faces,
            stats.quads
        );
        stats
    }
}
