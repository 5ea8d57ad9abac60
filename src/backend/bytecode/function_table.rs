//! Auxiliary function table
//!
//! Maps the identity of every nested definition in a specialized function to
//! its resolved form, so that executing a DEF can build a fresh closure
//! without resolving anything again.
//!
//! # Design
//!
//! Lowering registers definitions into a [`FunctionTableBuilder`] owned by
//! that one compile attempt. Only a successful compile freezes it into a
//! [`FunctionTable`]; a failed attempt drops the builder, so nothing it
//! registered ever becomes visible. The frozen table is append-free and is
//! shared read-only by every call of the compiled function.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::syntax::{FunctionId, ResolvedFunction};

/// Read-only table of nested definitions
#[derive(Default)]
pub struct FunctionTable {
    entries: HashMap<FunctionId, Arc<ResolvedFunction>>,
}

impl FunctionTable {
    /// Resolved definition for `id`
    #[inline]
    pub fn get(&self, id: FunctionId) -> Option<&Arc<ResolvedFunction>> {
        self.entries.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: FunctionId) -> bool {
        self.entries.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered identities in ascending order
    pub fn ids(&self) -> Vec<FunctionId> {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("function_count", &self.entries.len())
            .field(
                "names",
                &self.entries.values().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Table under construction during one lowering pass
#[derive(Debug, Default)]
pub struct FunctionTableBuilder {
    entries: HashMap<FunctionId, Arc<ResolvedFunction>>,
}

impl FunctionTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a nested definition; registering the same one again is a no-op
    pub fn register(&mut self, def: &Arc<ResolvedFunction>) -> FunctionId {
        let id = def.id();
        self.entries.entry(id).or_insert_with(|| Arc::clone(def));
        id
    }

    #[inline]
    pub fn contains(&self, id: FunctionId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn build(self) -> FunctionTable {
        FunctionTable {
            entries: self.entries,
        }
    }
}
