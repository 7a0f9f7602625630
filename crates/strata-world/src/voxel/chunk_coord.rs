/// Chunk-space position. `cx`/`cy` are horizontal, `cz` is the vertical layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

/// Unit offsets to the six face neighbours, in +X, -X, +Y, -Y, +Z, -Z order.
pub const NEIGHBOR_OFFSETS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    /// Chunk holding world voxel `(x, y, z)`.
    #[inline]
    pub fn from_voxel(x: i32, y: i32, z: i32, chunk_size: usize) -> Self {
        let n = chunk_size as i32;
        Self {
            cx: x.div_euclid(n),
            cy: y.div_euclid(n),
            cz: z.div_euclid(n),
        }
    }

    /// World voxel coordinate of local `(0, 0, 0)`.
    #[inline]
    pub fn origin(self, chunk_size: usize) -> [i32; 3] {
        let n = chunk_size as i32;
        [self.cx * n, self.cy * n, self.cz * n]
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn neighbor(self, index: usize) -> Self {
        let (dx, dy, dz) = NEIGHBOR_OFFSETS[index % 6];
        self.offset(dx, dy, dz)
    }

    pub fn neighbors(self) -> [ChunkCoord; 6] {
        std::array::from_fn(|i| self.neighbor(i))
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dy = i64::from(self.cy - other.cy);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance in the horizontal plane, ignoring layers.
    #[inline]
    pub fn horizontal_distance(self, other: ChunkCoord) -> f32 {
        let dx = (self.cx - other.cx) as f32;
        let dy = (self.cy - other.cy) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.cx, self.cy, self.cz)
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}
