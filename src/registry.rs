//! Name-keyed collection of live pools, in construction order.

use crate::pool::PoolHandle;
use std::collections::HashMap;

/// What is open right now. A name present here means its pool was built, not that it is healthy.
#[derive(Clone, Default)]
pub struct PoolRegistry {
    entries: Vec<(String, PoolHandle)>,
    index: HashMap<String, usize>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        PoolRegistry {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert under `name`. An existing entry is replaced in place (its position is kept)
    /// and handed back to the caller, who is responsible for draining it.
    pub fn register(&mut self, name: impl Into<String>, handle: PoolHandle) -> Option<PoolHandle> {
        let name = name.into();
        if let Some(&pos) = self.index.get(&name) {
            let previous = std::mem::replace(&mut self.entries[pos].1, handle);
            return Some(previous);
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, handle));
        None
    }

    pub fn get(&self, name: &str) -> Option<&PoolHandle> {
        self.index.get(name).map(|&pos| &self.entries[pos].1)
    }

    /// Entries in construction order.
    pub fn all(&self) -> impl Iterator<Item = (&str, &PoolHandle)> {
        self.entries.iter().map(|(name, handle)| (name.as_str(), handle))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry without draining anything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(name, _)| name)).finish()
    }
}
