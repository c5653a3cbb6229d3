//! Interned state sets and memoized binary operations.
//!
//! The upward checker compares and evaluates the same macro-states over and
//! over, so equal sets are interned into shared handles with stable numeric
//! ids, and the expensive operations on them are memoized by id. When a set
//! is evicted, every registered observer is told its id so dependent memo
//! tables can drop entries keyed on it.

use fxhash::FxHashMap;
use std::hash::Hash;
use std::rc::Rc;

/// An interned, sorted set of states with a cache-assigned identity.
#[derive(Debug, PartialEq, Eq)]
pub struct CachedSet {
    /// Stable id, unique among sets alive in one cache.
    pub id: usize,
    /// The member states, strictly increasing.
    pub states: Vec<usize>,
}

type Observer = Box<dyn Fn(usize)>;

/// Interning cache for state sets.
pub struct SetCache {
    by_states: FxHashMap<Vec<usize>, usize>,
    entries: FxHashMap<usize, Rc<CachedSet>>,
    observers: Vec<Observer>,
    next_id: usize,
}

impl SetCache {
    /// An empty cache.
    pub fn new() -> SetCache {
        SetCache {
            by_states: FxHashMap::default(),
            entries: FxHashMap::default(),
            observers: Vec::new(),
            next_id: 0,
        }
    }

    /// Intern a sorted set of states, sharing the handle of an equal set
    /// already alive.
    pub fn intern(&mut self, states: Vec<usize>) -> Rc<CachedSet> {
        debug_assert!(states.windows(2).all(|w| w[0] < w[1]));
        if let Some(&id) = self.by_states.get(&states) {
            return Rc::clone(&self.entries[&id]);
        }
        let id = self.next_id;
        self.next_id += 1;
        let entry = Rc::new(CachedSet {
            id,
            states: states.clone(),
        });
        self.by_states.insert(states, id);
        self.entries.insert(id, Rc::clone(&entry));
        entry
    }

    /// Register an eviction observer; it is called with the id of every set
    /// evicted after registration.
    pub fn watch(&mut self, observer: impl Fn(usize) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Evict the set with this id if the cache holds the last handle to it.
    /// Ids of live or already-evicted sets are ignored.
    pub fn release(&mut self, id: usize) {
        let dead = self
            .entries
            .get(&id)
            .map_or(false, |entry| Rc::strong_count(entry) == 1);
        if dead {
            let entry = self.entries.remove(&id).unwrap();
            self.by_states.remove(&entry.states);
            for observer in &self.observers {
                observer(id);
            }
        }
    }

    /// Number of sets currently alive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no set is alive.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A memo table for a binary operation, with per-argument invalidation.
///
/// Both argument positions are tracked so that either side can be dropped
/// wholesale when the value it refers to dies.
pub struct BinaryOpCache<K1, K2, V> {
    store: FxHashMap<(K1, K2), V>,
    by_first: FxHashMap<K1, Vec<(K1, K2)>>,
    by_second: FxHashMap<K2, Vec<(K1, K2)>>,
}

impl<K1, K2, V> BinaryOpCache<K1, K2, V>
where
    K1: Eq + Hash + Clone,
    K2: Eq + Hash + Clone,
    V: Clone,
{
    /// An empty memo table.
    pub fn new() -> BinaryOpCache<K1, K2, V> {
        BinaryOpCache {
            store: FxHashMap::default(),
            by_first: FxHashMap::default(),
            by_second: FxHashMap::default(),
        }
    }

    /// Return the memoized value for `(k1, k2)`, computing and recording it
    /// on a miss.
    pub fn lookup(&mut self, k1: K1, k2: K2, compute: impl FnOnce() -> V) -> V {
        let key = (k1.clone(), k2.clone());
        if let Some(value) = self.store.get(&key) {
            return value.clone();
        }
        let value = compute();
        self.by_first.entry(k1).or_default().push(key.clone());
        self.by_second.entry(k2).or_default().push(key.clone());
        self.store.insert(key, value.clone());
        value
    }

    /// Drop every entry whose first key equals `k1`.
    pub fn invalidate_first(&mut self, k1: &K1) {
        if let Some(keys) = self.by_first.remove(k1) {
            for key in keys {
                self.store.remove(&key);
            }
        }
    }

    /// Drop every entry whose second key equals `k2`.
    pub fn invalidate_second(&mut self, k2: &K2) {
        if let Some(keys) = self.by_second.remove(k2) {
            for key in keys {
                self.store.remove(&key);
            }
        }
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
