use strata_geom::{Aabb, Vec3};

/// Flat vertex streams for one chunk. Per vertex: 3 floats of position, normal and tangent,
/// 2 floats of UV, 4 bytes of RGBA. Positions are chunk-local world units.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct MeshBuffer {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub col: Vec<u8>,
    pub tangent: Vec<f32>,
    pub idx: Vec<u32>,
}

impl MeshBuffer {
    /// Clears all arrays but retains capacity for reuse across frames.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.pos.clear();
        self.norm.clear();
        self.uv.clear();
        self.col.clear();
        self.tangent.clear();
        self.idx.clear();
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Every stream holds the same vertex count and indices form whole triangles in range.
    pub fn is_consistent(&self) -> bool {
        let n = self.vertex_count();
        self.pos.len() == n * 3
            && self.norm.len() == n * 3
            && self.tangent.len() == n * 3
            && self.uv.len() == n * 2
            && self.col.len() == n * 4
            && self.idx.len() % 3 == 0
            && self.idx.iter().all(|&i| (i as usize) < n)
    }

    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos[i * 3], self.pos[i * 3 + 1], self.pos[i * 3 + 2])
    }

    #[inline]
    pub fn normal(&self, i: usize) -> Vec3 {
        Vec3::new(self.norm[i * 3], self.norm[i * 3 + 1], self.norm[i * 3 + 2])
    }

    /// Appends one vertex and returns its index.
    pub fn push_vertex(&mut self, p: Vec3, n: Vec3, uv: (f32, f32), rgba: [u8; 4]) -> u32 {
        let i = self.vertex_count() as u32;
        let t = tangent_for(n);
        self.pos.extend_from_slice(&[p.x, p.y, p.z]);
        self.norm.extend_from_slice(&[n.x, n.y, n.z]);
        self.tangent.extend_from_slice(&[t.x, t.y, t.z]);
        self.uv.extend_from_slice(&[uv.0, uv.1]);
        self.col.extend_from_slice(&rgba);
        i
    }

    #[inline]
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.idx.extend_from_slice(&[a, b, c]);
    }

    /// Appends a quad (two triangles) with explicit per-vertex UVs.
    /// Corners are reordered so the winding faces along `n`.
    pub fn add_quad_uv(
        &mut self,
        a: Vec3,
        b: Vec3,
        c: Vec3,
        d: Vec3,
        n: Vec3,
        mut uvs: [(f32, f32); 4],
        rgba: [u8; 4],
    ) {
        let mut vs = [a, b, c, d];
        let cross = (vs[1] - vs[0]).cross(vs[2] - vs[0]);
        if cross.dot(n) < 0.0 {
            vs.swap(1, 3);
            uvs.swap(1, 3);
        }
        let base = self.vertex_count() as u32;
        for i in 0..4 {
            self.push_vertex(vs[i], n, uvs[i], rgba);
        }
        self.idx
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Axis-aligned bounds of all vertices, `None` when empty.
    pub fn bounds(&self) -> Option<Aabb> {
        let n = self.vertex_count();
        if n == 0 {
            return None;
        }
        let first = self.position(0);
        let mut b = Aabb::new(first, first);
        for i in 1..n {
            let p = self.position(i);
            b = Aabb::new(b.min.min(p), b.max.max(p));
        }
        Some(b)
    }

    pub fn memory_bytes(&self) -> usize {
        (self.pos.capacity() + self.norm.capacity() + self.tangent.capacity() + self.uv.capacity())
            * std::mem::size_of::<f32>()
            + self.col.capacity()
            + self.idx.capacity() * std::mem::size_of::<u32>()
    }
}

/// A unit vector perpendicular to `n`, taken from the axis least aligned with it.
fn tangent_for(n: Vec3) -> Vec3 {
    let reference = if n.dominant_axis() == 0 { Vec3::Y } else { Vec3::X };
    let t = reference - n * n.dot(reference);
    let len = t.length();
    if len > 1e-6 { t / len } else { Vec3::X }
}
