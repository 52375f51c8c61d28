//! Kernel cache
//!
//! LRU cache of kernel matrix entries shared by the solvers. The matrix is
//! symmetric, so K(i,j) and K(j,i) share one slot.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Approximate footprint of one cached entry (key + value + list overhead)
const BYTES_PER_ENTRY: usize = 48;

/// Cache key for kernel values, normalized so that i <= j
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    i: usize,
    j: usize,
}

impl CacheKey {
    fn new(i: usize, j: usize) -> Self {
        if i <= j {
            Self { i, j }
        } else {
            Self { i: j, j: i }
        }
    }
}

/// LRU cache for kernel matrix values
pub struct KernelCache {
    cache: LruCache<CacheKey, f64>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a kernel cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a kernel cache sized from a byte budget
    ///
    /// The capacity never exceeds the number of distinct entries of an
    /// `n_samples` x `n_samples` symmetric matrix.
    pub fn with_memory_limit(memory_bytes: usize, n_samples: usize) -> Self {
        let distinct = n_samples.saturating_mul(n_samples + 1) / 2;
        Self::new((memory_bytes / BYTES_PER_ENTRY).min(distinct).max(1))
    }

    /// Return K(i,j), computing and storing it on a miss
    pub fn get_or_compute<F: FnOnce() -> f64>(&mut self, i: usize, j: usize, compute: F) -> f64 {
        let key = CacheKey::new(i, j);
        if let Some(&value) = self.cache.get(&key) {
            self.hits += 1;
            return value;
        }
        self.misses += 1;
        let value = compute();
        self.cache.put(key, value);
        value
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
