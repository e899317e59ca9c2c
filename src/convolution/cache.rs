//! Compile-once cache for kernel procedures.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::kernel::{KernelKey, KernelSpec};
use crate::error::Result;

/// Maps kernel content to a compiled procedure of type `T`.
///
/// Compilation runs while the lock is held, so concurrent lookups of the same
/// kernel compile it at most once.
pub struct KernelCache<T> {
    entries: Mutex<HashMap<KernelKey, Arc<T>>>,
}

impl<T> KernelCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached procedure for `spec`, compiling it on first use.
    ///
    /// A failed compilation is not cached.
    pub fn get_or_compile<F>(&self, spec: &KernelSpec, compile: F) -> Result<Arc<T>>
    where
        F: FnOnce(&KernelSpec) -> Result<T>,
    {
        let key = spec.key();
        let mut entries = self.entries.lock();
        if let Some(found) = entries.get(&key) {
            return Ok(Arc::clone(found));
        }
        let compiled = Arc::new(compile(spec)?);
        tracing::trace!(target: "terrain_shaper::convolution", kernel = %key, "compiled kernel");
        entries.insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<T> Default for KernelCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerrainError;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_compiles_once_per_content() {
        let cache: KernelCache<usize> = KernelCache::new();
        let compiled = AtomicUsize::new(0);
        let compile = |spec: &KernelSpec| -> Result<usize> {
            compiled.fetch_add(1, Ordering::SeqCst);
            Ok(spec.kernel.size())
        };

        let dilation = KernelSpec::named("dilation").unwrap();
        let erosion = KernelSpec::named("erosion").unwrap();
        assert_eq!(*cache.get_or_compile(&dilation, compile).unwrap(), 5);
        assert_eq!(*cache.get_or_compile(&dilation.clone(), compile).unwrap(), 5);
        assert_eq!(*cache.get_or_compile(&erosion, compile).unwrap(), 5);
        assert_eq!(compiled.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_lookups_compile_once() {
        let cache: KernelCache<u32> = KernelCache::new();
        let compiled = AtomicUsize::new(0);
        let spec = KernelSpec::named("gaussian5").unwrap();

        (0..64).into_par_iter().for_each(|_| {
            let value = cache
                .get_or_compile(&spec, |_| {
                    compiled.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*value, 7);
        });
        assert_eq!(compiled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_compile_not_cached() {
        let cache: KernelCache<u32> = KernelCache::new();
        let spec = KernelSpec::named("avg3").unwrap();
        let failed = cache.get_or_compile(&spec, |_| Err(TerrainError::Gpu("no device".into())));
        assert!(failed.is_err());
        assert!(cache.is_empty());
        assert_eq!(*cache.get_or_compile(&spec, |_| Ok(1)).unwrap(), 1);
    }
}
