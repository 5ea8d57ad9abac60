//! Per-function specialization cache
//!
//! The [`Specializer`] is the entry point hosts use: it lowers a resolved
//! function, loads the result and hands back code behind the common
//! [`FunctionCode`] interface. Results are cached per [`FunctionId`].
//!
//! ## Concurrency
//! Each function gets one cache entry holding a `OnceLock`. The first thread
//! to ask for a function compiles it while later threads wait on the same
//! entry, so a cached function is compiled at most once. Different functions
//! compile in parallel. Failed compiles are cached too: the function keeps
//! running interpreted and is not retried while its entry lives.
//!
//! ## Eviction
//! The cache is an LRU bounded by `SpecializerConfig::cache_size`. Evicting
//! an entry drops the cache's hold on its unit and nested definitions;
//! callables already built keep their own reference. A function looked up
//! again after eviction is compiled again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::compiler;
use super::loader::{LoadedUnit, SpecializedCode, UnitLoader};
use crate::backend::config::SpecializerConfig;
use crate::backend::error::{SpecializeError, SpecializeResult};
use crate::backend::eval::Interpreter;
use crate::backend::models::{Callable, FunctionCode};
use crate::backend::syntax::{FunctionId, ResolvedFunction};

/// Write-once compile result for one function
#[derive(Debug, Default)]
struct CacheEntry {
    result: OnceLock<SpecializeResult<Arc<LoadedUnit>>>,
}

/// Specializer counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecializerStats {
    /// Compile attempts, cached or not
    pub compiles: u64,

    /// Attempts that ended in an error
    pub failures: u64,

    /// Lookups answered from the cache
    pub cache_hits: u64,

    /// Functions with a cached result
    pub cached_functions: usize,

    /// Entries dropped to stay within the cache size
    pub evictions: u64,

    /// Units accepted by the loader
    pub units_loaded: u64,
}

/// Lowers, loads and caches specialized code
#[derive(Debug)]
pub struct Specializer {
    config: SpecializerConfig,
    loader: UnitLoader,
    cache: Mutex<LruCache<FunctionId, Arc<CacheEntry>>>,

    // Atomic statistics counters
    compiles: AtomicU64,
    failures: AtomicU64,
    cache_hits: AtomicU64,
    evictions: AtomicU64,
}

impl Default for Specializer {
    fn default() -> Self {
        Self::new(SpecializerConfig::default())
    }
}

impl Specializer {
    pub fn new(config: SpecializerConfig) -> Self {
        Self {
            loader: UnitLoader::new(config.log_disassembly),
            cache: Mutex::new(LruCache::new(config.cache_size)),
            config,
            compiles: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Specializer configured from `HOTPATH_*` environment variables
    pub fn from_env() -> Self {
        Self::new(SpecializerConfig::from_env())
    }

    pub fn config(&self) -> &SpecializerConfig {
        &self.config
    }

    pub fn loader(&self) -> &UnitLoader {
        &self.loader
    }

    /// Lower and load `def`, bypassing the cache
    ///
    /// Every call produces a new unit with a new loader name. A failure
    /// leaves nothing behind.
    pub fn compile(&self, def: &ResolvedFunction) -> SpecializeResult<Arc<LoadedUnit>> {
        if !self.config.enabled {
            return Err(SpecializeError::Disabled);
        }
        self.compiles.fetch_add(1, Ordering::Relaxed);

        let result = compiler::compile(def).and_then(|lowered| self.loader.load(lowered));
        match &result {
            Ok(unit) => {
                debug!(target: "hotpath::specializer", function = def.name(), unit = unit.name(), "specialized")
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    /// Cached compile of `def`
    pub fn lookup(&self, def: &ResolvedFunction) -> SpecializeResult<Arc<LoadedUnit>> {
        let entry = self.entry(def);

        let mut compiled_here = false;
        let result = entry.result.get_or_init(|| {
            compiled_here = true;
            let result = self.compile(def);
            if let Err(e) = &result {
                if !matches!(e, SpecializeError::Disabled) {
                    warn!(target: "hotpath::specializer", function = def.name(), id = %def.id(), error = %e, "falling back to interpreter");
                }
            }
            result
        });
        if !compiled_here {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        result.clone()
    }

    /// Cache entry for `def`, created (and possibly evicting another) on a miss.
    /// The entry is cloned out so the cache lock is not held while compiling.
    fn entry(&self, def: &ResolvedFunction) -> Arc<CacheEntry> {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(&def.id()) {
            return Arc::clone(entry);
        }

        let entry = Arc::new(CacheEntry::default());
        if let Some((evicted, _)) = cache.push(def.id(), Arc::clone(&entry)) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(target: "hotpath::specializer", evicted = %evicted, "cache entry evicted");
        }
        entry
    }

    /// Code for `def`: specialized when possible, interpreted otherwise
    pub fn code_for(&self, def: &Arc<ResolvedFunction>) -> Arc<dyn FunctionCode> {
        match self.lookup(def) {
            Ok(unit) => Arc::new(SpecializedCode::new(unit)),
            Err(_) => Arc::new(Interpreter),
        }
    }

    /// Top-level function value for `def`
    pub fn specialize(&self, def: &Arc<ResolvedFunction>) -> Arc<Callable> {
        Callable::new(Arc::clone(def), self.code_for(def))
    }

    pub fn stats(&self) -> SpecializerStats {
        SpecializerStats {
            compiles: self.compiles.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cached_functions: self.cache.lock().len(),
            evictions: self.evictions.load(Ordering::Relaxed),
            units_loaded: self.loader.loaded_count(),
        }
    }
}
