//! Process-wide memoization of translated kernels.

use crate::ast::FunctionSpec;
use crate::cuda_codegen::{CudaCodegen, Kernel};
use crate::error::TranspileError;
use crate::options::KernelOptions;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Two requests share a kernel only when both the function and the options
/// that shape its text are structurally equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    function: FunctionSpec,
    options: KernelOptions,
}

/// Translation cache (function + options -> kernel).
/// Unbounded; entries live for the life of the cache. Failed translations are
/// not recorded.
#[derive(Default)]
pub struct TranslationCache {
    entries: parking_lot::RwLock<FxHashMap<CacheKey, Arc<Kernel>>>,
}

static GLOBAL_CACHE: OnceLock<TranslationCache> = OnceLock::new();

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every caller in the process
    pub fn global() -> &'static TranslationCache {
        GLOBAL_CACHE.get_or_init(TranslationCache::new)
    }

    pub fn get_or_translate(
        &self,
        func: &FunctionSpec,
        options: &KernelOptions,
    ) -> Result<Arc<Kernel>, TranspileError> {
        let key = CacheKey {
            function: func.clone(),
            options: options.clone(),
        };

        if let Some(kernel) = self.entries.read().get(&key) {
            debug!(kernel = %func.name, "translation cache hit");
            return Ok(Arc::clone(kernel));
        }

        // Translate without holding the lock. A racing request for the same
        // function produces identical text; the first insert wins.
        let kernel = Arc::new(CudaCodegen::with_options(options.clone()).generate(func)?);
        let mut entries = self.entries.write();
        let kernel = Arc::clone(entries.entry(key).or_insert(kernel));
        debug!(kernel = %func.name, cached = entries.len(), "translation cache insert");
        Ok(kernel)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
