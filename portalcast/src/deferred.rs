//! Mark-now, purge-later bookkeeping.
//!
//! Both the entity manager and the time service iterate collections while
//! running user callbacks, and those callbacks may ask for items to be
//! removed. Requests are recorded here and applied once the pass is over.

use std::collections::BTreeSet;

/// Set of keys waiting to be removed after the current pass.
#[derive(Clone, Debug)]
pub struct Deferred<K: Ord> {
    pending: BTreeSet<K>,
}

impl<K: Ord> Deferred<K> {
    pub fn new() -> Self {
        Self {
            pending: BTreeSet::new(),
        }
    }

    /// Record `key` for removal. Returns false if it was already pending.
    pub fn mark(&mut self, key: K) -> bool {
        self.pending.insert(key)
    }

    pub fn is_marked(&self, key: &K) -> bool {
        self.pending.contains(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hand over every pending key, in ascending order, and reset.
    ///
    /// Call only between passes, never from inside one.
    pub fn take(&mut self) -> BTreeSet<K> {
        std::mem::take(&mut self.pending)
    }
}

impl<K: Ord> Default for Deferred<K> {
    fn default() -> Self {
        Self::new()
    }
}
