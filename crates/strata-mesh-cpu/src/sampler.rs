use strata_chunk::Chunk;
use strata_world::TerrainSource;
use strata_world::voxel::VoxelKind;

/// Density and material lookups in the local lattice of the chunk being meshed.
/// Coordinates may fall outside `[0, N]`; implementations resolve those from neighbours.
pub trait FieldSampler {
    fn density(&self, x: i32, y: i32, z: i32) -> f32;
    fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind;
}

impl<S: FieldSampler + ?Sized> FieldSampler for &S {
    #[inline]
    fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        (**self).density(x, y, z)
    }

    #[inline]
    fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind {
        (**self).material(x, y, z)
    }
}

/// Samples a terrain source directly, offset by a chunk origin.
pub struct SourceSampler<'a> {
    pub source: &'a dyn TerrainSource,
    pub origin: [i32; 3],
}

impl FieldSampler for SourceSampler<'_> {
    #[inline]
    fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        let [ox, oy, oz] = self.origin;
        self.source.density(ox + x, oy + y, oz + z)
    }

    #[inline]
    fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind {
        let [ox, oy, oz] = self.origin;
        self.source.material(ox + x, oy + y, oz + z)
    }
}

/// Closure pair, mostly for tests and tools.
pub struct FnSampler<D, M> {
    pub density: D,
    pub material: M,
}

impl<D, M> FieldSampler for FnSampler<D, M>
where
    D: Fn(i32, i32, i32) -> f32,
    M: Fn(i32, i32, i32) -> VoxelKind,
{
    #[inline]
    fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        (self.density)(x, y, z)
    }

    #[inline]
    fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind {
        (self.material)(x, y, z)
    }
}

/// A chunk's own field, falling through to `outside` beyond its grid.
pub struct ChunkView<'a, S: ?Sized> {
    pub chunk: &'a Chunk,
    pub outside: &'a S,
}

impl<'a, S: FieldSampler + ?Sized> ChunkView<'a, S> {
    pub fn new(chunk: &'a Chunk, outside: &'a S) -> Self {
        Self { chunk, outside }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.chunk.size
    }
}

impl<S: FieldSampler + ?Sized> FieldSampler for ChunkView<'_, S> {
    #[inline]
    fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        let n = self.chunk.size as i32;
        if (0..=n).contains(&x) && (0..=n).contains(&y) && (0..=n).contains(&z) {
            self.chunk.density(x, y, z)
        } else {
            self.outside.density(x, y, z)
        }
    }

    #[inline]
    fn material(&self, x: i32, y: i32, z: i32) -> VoxelKind {
        let n = self.chunk.size as i32;
        if (0..n).contains(&x) && (0..n).contains(&y) && (0..n).contains(&z) {
            self.chunk.material(x, y, z)
        } else {
            self.outside.material(x, y, z)
        }
    }
}
