use strata_world::voxel::ChunkCoord;

use crate::Chunk;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkPoolStats {
    pub pooled: usize,
    pub capacity: usize,
    pub created: u64,
    pub reused: u64,
    pub dropped: u64,
}

/// Bounded stack of retired chunks. Reset happens inside [`ChunkPool::acquire`], so a chunk taken
/// from the pool can never carry another coordinate's data, neighbours or state.
pub struct ChunkPool {
    free: Vec<Chunk>,
    capacity: usize,
    created: u64,
    reused: u64,
    dropped: u64,
}

impl ChunkPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity.min(1024)),
            capacity,
            created: 0,
            reused: 0,
            dropped: 0,
        }
    }

    /// A reset chunk for `coord`, reusing pooled buffers when available.
    pub fn acquire(&mut self, coord: ChunkCoord, size: usize) -> Chunk {
        match self.free.pop() {
            Some(mut chunk) => {
                chunk.reset(coord, size);
                self.reused += 1;
                chunk
            }
            None => {
                self.created += 1;
                Chunk::new(coord, size)
            }
        }
    }

    /// Retires a chunk. Its data is cleared immediately; buffers are kept if the pool has room,
    /// otherwise the chunk is dropped. Returns whether it was pooled.
    pub fn release(&mut self, mut chunk: Chunk) -> bool {
        if self.free.len() >= self.capacity {
            self.dropped += 1;
            log::debug!("chunk pool full ({}), dropping {}", self.capacity, chunk.coord);
            return false;
        }
        let (coord, size) = (chunk.coord, chunk.size);
        chunk.reset(coord, size);
        self.free.push(chunk);
        true
    }

    /// Frees every pooled chunk.
    pub fn clear(&mut self) -> usize {
        let n = self.free.len();
        self.free.clear();
        self.free.shrink_to_fit();
        n
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn memory_bytes(&self) -> usize {
        self.free.iter().map(Chunk::memory_bytes).sum()
    }

    pub fn stats(&self) -> ChunkPoolStats {
        ChunkPoolStats {
            pooled: self.free.len(),
            capacity: self.capacity,
            created: self.created,
            reused: self.reused,
            dropped: self.dropped,
        }
    }
}
