//! Antichain containers for the inclusion checkers.
//!
//! Both containers store elements that are pairwise incomparable under a
//! caller-supplied quasi-order; the comparer is passed per call rather than
//! stored, since the two checkers use different lifts of the same preorder.

use fxhash::FxHashMap;

/// A flat antichain of states, used as the workspace that folds a set of
/// candidate states down to its preorder-maximal elements.
///
/// `refine` and `contains` take the caller's `ind`/`inv` index rows, so the
/// container itself never sees the preorder.
#[derive(Clone, Debug)]
pub struct FlatAntichain {
    data: Vec<usize>,
    mask: Vec<bool>,
}

impl FlatAntichain {
    /// An empty antichain over the state domain `{0, …, domain-1}`.
    pub fn new(domain: usize) -> FlatAntichain {
        FlatAntichain {
            data: Vec::new(),
            mask: vec![false; domain],
        }
    }

    /// Drop all stored states.
    pub fn clear(&mut self) {
        let FlatAntichain { data, mask } = self;
        for &s in data.iter() {
            mask[s] = false;
        }
        data.clear();
    }

    /// Whether some stored state occurs in `keys`.
    pub fn contains(&self, keys: &[usize]) -> bool {
        keys.iter().any(|&k| self.mask[k])
    }

    /// Remove every stored state that occurs in `keys`.
    pub fn refine(&mut self, keys: &[usize]) {
        let mut removed = false;
        for &k in keys {
            if self.mask[k] {
                self.mask[k] = false;
                removed = true;
            }
        }
        if removed {
            let FlatAntichain { data, mask } = self;
            data.retain(|&s| mask[s]);
        }
    }

    /// Insert a state not currently stored.
    pub fn insert(&mut self, state: usize) {
        debug_assert!(!self.mask[state]);
        self.mask[state] = true;
        self.data.push(state);
    }

    /// The stored states, in insertion order.
    pub fn data(&self) -> &[usize] {
        &self.data
    }
}

/// An antichain of `(key, value)` pairs, keyed by state.
///
/// The comparer conventions are fixed: [`KeyedAntichain::contains`] asks
/// `cmp(stored, candidate)` and [`KeyedAntichain::refine`] asks
/// `cmp(candidate, stored)`. After `insert(k, v)` with no intervening
/// `refine`, `contains(&[k], &v, cmp)` holds for any reflexive `cmp`.
#[derive(Clone, Debug)]
pub struct KeyedAntichain<V> {
    data: FxHashMap<usize, Vec<V>>,
}

impl<V: Clone> KeyedAntichain<V> {
    /// An empty antichain.
    pub fn new() -> KeyedAntichain<V> {
        KeyedAntichain {
            data: FxHashMap::default(),
        }
    }

    /// Append `value` to the list stored under `key`.
    pub fn insert(&mut self, key: usize, value: V) {
        self.data.entry(key).or_default().push(value);
    }

    /// The values stored under `key`.
    pub fn lookup(&self, key: usize) -> &[V] {
        self.data.get(&key).map_or(&[], |list| list.as_slice())
    }

    /// Whether some stored `(k, v)` with `k ∈ keys` satisfies
    /// `cmp(v, candidate)`.
    pub fn contains(&self, keys: &[usize], candidate: &V, cmp: impl Fn(&V, &V) -> bool) -> bool {
        keys.iter().any(|k| {
            self.data
                .get(k)
                .map_or(false, |list| list.iter().any(|stored| cmp(stored, candidate)))
        })
    }

    /// Erase every stored `(k, v)` with `k ∈ keys` and `cmp(candidate, v)`.
    pub fn refine(&mut self, keys: &[usize], candidate: &V, cmp: impl Fn(&V, &V) -> bool) {
        self.refine_with(keys, candidate, cmp, |_, _| {});
    }

    /// Like [`KeyedAntichain::refine`], reporting each erased pair to
    /// `eraser` so the caller can keep satellite structures consistent.
    pub fn refine_with(
        &mut self,
        keys: &[usize],
        candidate: &V,
        cmp: impl Fn(&V, &V) -> bool,
        mut eraser: impl FnMut(usize, &V),
    ) {
        for &k in keys {
            if let Some(list) = self.data.get_mut(&k) {
                list.retain(|stored| {
                    if cmp(candidate, stored) {
                        eraser(k, stored);
                        false
                    } else {
                        true
                    }
                });
                if list.is_empty() {
                    self.data.remove(&k);
                }
            }
        }
    }

    /// Iterate over all stored pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &V)> {
        self.data
            .iter()
            .flat_map(|(k, list)| list.iter().map(move |v| (*k, v)))
    }

    /// Drop all stored pairs.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_fold_to_maximal() {
        // preorder: 0 ⊑ 1 ⊑ 2, expressed through ind/inv rows
        let ind = [vec![0, 1, 2], vec![1, 2], vec![2]];
        let inv = [vec![0], vec![0, 1], vec![0, 1, 2]];
        let mut post = FlatAntichain::new(3);
        for s in [0, 1, 2] {
            if post.contains(&ind[s]) {
                continue;
            }
            post.refine(&inv[s]);
            post.insert(s);
        }
        assert_eq!(post.data(), &[2]);

        // inserting the maximum first suppresses the rest
        post.clear();
        for s in [2, 0, 1] {
            if post.contains(&ind[s]) {
                continue;
            }
            post.refine(&inv[s]);
            post.insert(s);
        }
        assert_eq!(post.data(), &[2]);
    }

    #[test]
    fn test_keyed_insert_then_contains() {
        let mut chain: KeyedAntichain<Vec<usize>> = KeyedAntichain::new();
        let subset = |a: &Vec<usize>, b: &Vec<usize>| a.iter().all(|x| b.contains(x));
        chain.insert(1, vec![2, 3]);
        assert!(chain.contains(&[1], &vec![2, 3], subset));
        assert!(chain.contains(&[0, 1], &vec![2, 3, 4], subset));
        assert!(!chain.contains(&[2], &vec![2, 3], subset));
        assert!(!chain.contains(&[1], &vec![2], subset));
    }

    #[test]
    fn test_keyed_refine_erases_dominated() {
        let mut chain: KeyedAntichain<Vec<usize>> = KeyedAntichain::new();
        let subset = |a: &Vec<usize>, b: &Vec<usize>| a.iter().all(|x| b.contains(x));
        chain.insert(1, vec![2, 3]);
        chain.insert(1, vec![4]);
        let mut erased = vec![];
        // candidate {2} dominates stored {2,3} under "candidate ⊆ stored"
        chain.refine_with(&[1], &vec![2], subset, |k, v| erased.push((k, v.clone())));
        assert_eq!(erased, vec![(1, vec![2, 3])]);
        assert_eq!(chain.lookup(1), &[vec![4]]);
    }

    #[test]
    fn test_keyed_lookup_empty() {
        let chain: KeyedAntichain<Vec<usize>> = KeyedAntichain::new();
        assert!(chain.lookup(7).is_empty());
        assert!(chain.is_empty());
    }
}
