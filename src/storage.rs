//! In-memory stores with a save → commit / discard discipline.
//!
//! Mutations land in a working copy. `save` marks the working copy as staged,
//! `commit` makes it the new durable baseline, and `discard` throws away
//! everything since the last commit.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

/// Three-phase durability shared by every store a node owns.
pub trait Transactional {
    fn save(&mut self);
    fn commit(&mut self);
    fn discard(&mut self);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Phase {
    #[default]
    Clean,
    Dirty,
    Saved,
}

impl Phase {
    fn touch(&mut self) {
        *self = Phase::Dirty;
    }

    fn save(&mut self) {
        if *self == Phase::Dirty {
            *self = Phase::Saved;
        }
    }

    fn commit(&mut self) {
        debug_assert!(*self != Phase::Dirty, "commit without save");
        *self = Phase::Clean;
    }
}

/// Key-value map with an overlay of uncommitted changes.
#[derive(Debug, Clone)]
pub struct StagedMap<K, V> {
    committed: HashMap<K, V>,
    // None marks a staged removal
    overlay: HashMap<K, Option<V>>,
    phase: Phase,
}

impl<K, V> Default for StagedMap<K, V> {
    fn default() -> Self {
        Self {
            committed: HashMap::new(),
            overlay: HashMap::new(),
            phase: Phase::Clean,
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> StagedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match self.overlay.get(key) {
            Some(staged) => staged.as_ref(),
            None => self.committed.get(key),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.phase.touch();
        self.overlay.insert(key, Some(value));
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let previous = self.get(key).cloned();
        if previous.is_some() {
            self.phase.touch();
            self.overlay.insert(key.clone(), None);
        }
        previous
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current view: committed entries shadowed by the overlay.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        let committed = self
            .committed
            .iter()
            .filter(|(k, _)| !self.overlay.contains_key(*k));
        let staged = self
            .overlay
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k, v)));
        committed.chain(staged)
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Transactional for StagedMap<K, V> {
    fn save(&mut self) {
        self.phase.save();
    }

    fn commit(&mut self) {
        self.phase.commit();
        for (key, value) in self.overlay.drain() {
            match value {
                Some(value) => {
                    self.committed.insert(key, value);
                }
                None => {
                    self.committed.remove(&key);
                }
            }
        }
    }

    fn discard(&mut self) {
        self.overlay.clear();
        self.phase = Phase::Clean;
    }
}

/// Append-only sequence whose tail can be popped, with rollback to the
/// last committed contents.
#[derive(Debug, Clone)]
pub struct StagedLog<T> {
    items: Vec<T>,
    // lowest length reached since the last commit
    low_water: usize,
    // committed items popped since the last commit, in pop order
    popped: Vec<T>,
    phase: Phase,
}

impl<T> Default for StagedLog<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            low_water: 0,
            popped: Vec::new(),
            phase: Phase::Clean,
        }
    }
}

impl<T: Clone> StagedLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn push(&mut self, item: T) {
        self.phase.touch();
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        let item = self.items.pop()?;
        self.phase.touch();
        if self.items.len() < self.low_water {
            self.low_water = self.items.len();
            self.popped.push(item.clone());
        }
        Some(item)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Clone> Transactional for StagedLog<T> {
    fn save(&mut self) {
        self.phase.save();
    }

    fn commit(&mut self) {
        self.phase.commit();
        self.low_water = self.items.len();
        self.popped.clear();
    }

    fn discard(&mut self) {
        self.items.truncate(self.low_water);
        while let Some(item) = self.popped.pop() {
            self.items.push(item);
        }
        self.low_water = self.items.len();
        self.phase = Phase::Clean;
    }
}

/// Scoped all-or-nothing mutation of a store.
///
/// `commit` saves and commits, `abort` discards; both consume the guard so
/// neither can run twice. A guard dropped without either discards.
pub struct StoreGuard<'a, T: Transactional> {
    store: &'a mut T,
    finished: bool,
}

impl<'a, T: Transactional> StoreGuard<'a, T> {
    pub fn begin(store: &'a mut T) -> Self {
        Self {
            store,
            finished: false,
        }
    }

    pub fn commit(mut self) {
        self.store.save();
        self.store.commit();
        self.finished = true;
    }

    pub fn abort(mut self) {
        self.store.discard();
        self.finished = true;
    }
}

impl<T: Transactional> Deref for StoreGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.store
    }
}

impl<T: Transactional> DerefMut for StoreGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.store
    }
}

impl<T: Transactional> Drop for StoreGuard<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.discard();
        }
    }
}
