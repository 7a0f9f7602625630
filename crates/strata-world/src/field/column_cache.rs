use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use super::ColumnSample;

/// Identifies the `(size+1)^2` column grid starting at a chunk's horizontal origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub origin_x: i32,
    pub origin_y: i32,
    pub size: usize,
}

impl ColumnKey {
    #[inline]
    pub fn new(origin_x: i32, origin_y: i32, size: usize) -> Self {
        Self {
            origin_x,
            origin_y,
            size,
        }
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.size + 1
    }
}

/// Precomputed columns shared by every chunk in one vertical stack.
#[derive(Debug)]
pub struct ColumnTile {
    key: ColumnKey,
    samples: Box<[ColumnSample]>,
    build_us: u32,
}

impl ColumnTile {
    pub fn new(key: ColumnKey, samples: Vec<ColumnSample>, build_us: u32) -> Arc<Self> {
        debug_assert_eq!(samples.len(), key.side() * key.side());
        Arc::new(Self {
            key,
            samples: samples.into_boxed_slice(),
            build_us,
        })
    }

    #[inline]
    pub fn key(&self) -> &ColumnKey {
        &self.key
    }

    /// Column at local `(lx, ly)`, both in `0..=size`.
    #[inline]
    pub fn at(&self, lx: usize, ly: usize) -> &ColumnSample {
        &self.samples[ly * self.key.side() + lx]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColumnCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    /// Time spent sampling the tiles that were inserted.
    pub build_us: u64,
}

/// Recently used column tiles, evicted least recently used first.
///
/// Capacity 0 turns every lookup into a miss and drops inserts. Tiles are plain data, so a
/// lock poisoned by a panicking worker is recovered rather than propagated.
pub struct ColumnCache {
    tiles: Option<Mutex<LruCache<ColumnKey, Arc<ColumnTile>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    build_us: AtomicU64,
}

impl ColumnCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            tiles: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            build_us: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.tiles.is_some()
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<ColumnKey, Arc<ColumnTile>>>> {
        self.tiles
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn get(&self, key: &ColumnKey) -> Option<Arc<ColumnTile>> {
        let found = self.lock().and_then(|mut tiles| tiles.get(key).cloned());
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, tile: Arc<ColumnTile>) {
        let Some(mut tiles) = self.lock() else {
            return;
        };
        let key = *tile.key();
        self.build_us.fetch_add(u64::from(tile.build_us), Ordering::Relaxed);
        // `push` hands back either the replaced entry for `key` or the evicted tail.
        if let Some((old, _)) = tiles.push(key, tile) {
            if old != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> ColumnCacheStats {
        ColumnCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.lock().map_or(0, |tiles| tiles.len()),
            build_us: self.build_us.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        if let Some(mut tiles) = self.lock() {
            self.evictions.fetch_add(tiles.len() as u64, Ordering::Relaxed);
            tiles.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn tile(x: i32, y: i32) -> Arc<ColumnTile> {
        let key = ColumnKey::new(x, y, 2);
        let samples = (0..9)
            .map(|i| ColumnSample {
                height: i as f32,
                ..ColumnSample::default()
            })
            .collect();
        ColumnTile::new(key, samples, 5)
    }

    #[test]
    fn lru_evicts_oldest_untouched() {
        let cache = ColumnCache::new(2);
        cache.insert(tile(0, 0));
        cache.insert(tile(2, 0));
        assert!(cache.get(&ColumnKey::new(0, 0, 2)).is_some());
        cache.insert(tile(4, 0));
        assert!(cache.get(&ColumnKey::new(2, 0, 2)).is_none());
        assert!(cache.get(&ColumnKey::new(0, 0, 2)).is_some());
        let s = cache.stats();
        assert_eq!(s.entries, 2);
        assert_eq!(s.evictions, 1);
        assert_eq!(s.hits, 2);
        assert_eq!(s.misses, 1);
        assert_eq!(s.build_us, 15);
    }

    #[test]
    fn reinserting_a_key_is_not_an_eviction() {
        let cache = ColumnCache::new(2);
        cache.insert(tile(0, 0));
        cache.insert(tile(0, 0));
        let s = cache.stats();
        assert_eq!(s.entries, 1);
        assert_eq!(s.evictions, 0);
    }

    #[test]
    fn zero_capacity_never_stores() {
        let cache = ColumnCache::new(0);
        assert!(!cache.is_enabled());
        cache.insert(tile(0, 0));
        assert!(cache.get(&ColumnKey::new(0, 0, 2)).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn tile_indexes_row_major() {
        let t = tile(10, 20);
        assert_eq!(t.at(1, 2).height, 7.0);
        assert_eq!(t.key().side(), 3);
    }

    #[test]
    fn clear_counts_evictions() {
        let cache = ColumnCache::new(4);
        cache.insert(tile(0, 0));
        cache.insert(tile(2, 0));
        cache.clear();
        let s = cache.stats();
        assert_eq!(s.entries, 0);
        assert_eq!(s.evictions, 2);
    }

    #[test]
    fn survives_a_poisoned_lock() {
        let cache = Arc::new(ColumnCache::new(4));
        cache.insert(tile(0, 0));
        let poisoner = Arc::clone(&cache);
        let joined = thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("worker died holding the cache");
        })
        .join();
        assert!(joined.is_err());
        assert!(cache.get(&ColumnKey::new(0, 0, 2)).is_some());
        cache.insert(tile(2, 0));
        assert_eq!(cache.stats().entries, 2);
    }
}
