//! Maximum simulation preorders by partition refinement.
//!
//! [`compute_simulation`] runs the counter-based refinement algorithm on an
//! explicit LTS: the partition is a family of blocks whose states sit on
//! flat doubly-linked rings, each block keeps per-label counters of related
//! successors in reference-counted copy-on-write rows, and a worklist of
//! `(block, label)` remove events drives the fixpoint. The result relates
//! two states exactly when the first is simulated by the second.
//!
//! [`downward_simulation`] derives the LTS view of a tree automaton and
//! computes the downward simulation preorder on its states.

use crate::automaton::TreeAut;
use crate::lts::{CountedSet, ExplicitLts};
use crate::relation::BinaryRelation;
use fxhash::FxHashMap;

/// A recycling pool of integer vectors. Counter rows and remove lists are
/// allocated here so that the refinement loop reuses buffers instead of
/// churning the allocator.
struct VecPool {
    store: Vec<Vec<usize>>,
    free: Vec<usize>,
}

impl VecPool {
    fn new() -> VecPool {
        VecPool {
            store: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Hand out an empty vector, reusing a reclaimed one when possible.
    fn alloc(&mut self) -> usize {
        match self.free.pop() {
            Some(id) => {
                self.store[id].clear();
                id
            }
            None => {
                self.store.push(Vec::new());
                self.store.len() - 1
            }
        }
    }

    fn reclaim(&mut self, id: usize) {
        self.free.push(id);
    }
}

impl std::ops::Index<usize> for VecPool {
    type Output = Vec<usize>;
    fn index(&self, id: usize) -> &Vec<usize> {
        &self.store[id]
    }
}

impl std::ops::IndexMut<usize> for VecPool {
    fn index_mut(&mut self, id: usize) -> &mut Vec<usize> {
        &mut self.store[id]
    }
}

/// One block of the partition.
///
/// `states` and `tmp` are heads into the shared state rings; `remove` and
/// `counter` are per-label handles into the engine's pools; `inset` counts,
/// per label, how many block states have an incoming edge with that label.
struct Block {
    states: Option<usize>,
    tmp: Option<usize>,
    remove: Vec<Option<usize>>,
    counter: Vec<Option<usize>>,
    inset: CountedSet,
}

/// The refinement engine state. Block ids double as indices into the
/// relation.
struct Refiner<'a> {
    lts: &'a ExplicitLts,
    rows: VecPool,
    lists: VecPool,
    blocks: Vec<Block>,
    relation: BinaryRelation,
    next: Vec<usize>,
    prev: Vec<usize>,
    block_of: Vec<usize>,
    queue: Vec<(usize, usize)>,
    delta1: Vec<Vec<usize>>,
    key: Vec<usize>,
    range: Vec<usize>,
}

impl<'a> Refiner<'a> {
    fn new(lts: &'a ExplicitLts) -> Refiner<'a> {
        let n = lts.states();
        let labels = lts.labels();
        assert!(n > 0);
        let mut inset = CountedSet::new(labels);
        for q in 0..n {
            for &a in lts.bw_labels(q) {
                inset.add(a);
            }
        }
        let block = Block {
            states: Some(0),
            tmp: None,
            remove: vec![None; labels],
            counter: vec![None; labels],
            inset,
        };
        Refiner {
            lts,
            rows: VecPool::new(),
            lists: VecPool::new(),
            blocks: vec![block],
            relation: BinaryRelation::new(0),
            next: (0..n).map(|i| (i + 1) % n).collect(),
            prev: (0..n).map(|i| (i + n - 1) % n).collect(),
            block_of: vec![0; n],
            queue: Vec::new(),
            delta1: Vec::new(),
            key: Vec::new(),
            range: Vec::new(),
        }
    }

    /// All states on the ring starting at `head`.
    fn ring_states(&self, head: Option<usize>) -> Vec<usize> {
        let mut out = Vec::new();
        if let Some(h) = head {
            let mut e = h;
            loop {
                out.push(e);
                e = self.next[e];
                if e == h {
                    break;
                }
            }
        }
        out
    }

    /// Move `elem` from its block's state ring onto the block's tmp ring.
    fn move_to_tmp(&mut self, elem: usize) {
        let b = self.block_of[elem];
        if self.next[elem] == elem {
            self.blocks[b].states = None;
        } else {
            self.blocks[b].states = Some(self.next[elem]);
            let (p, n) = (self.prev[elem], self.next[elem]);
            self.next[p] = n;
            self.prev[n] = p;
        }
        match self.blocks[b].tmp {
            None => {
                self.blocks[b].tmp = Some(elem);
                self.next[elem] = elem;
                self.prev[elem] = elem;
            }
            Some(h) => {
                let t = self.prev[h];
                self.next[elem] = h;
                self.prev[elem] = t;
                self.next[t] = elem;
                self.prev[h] = elem;
            }
        }
    }

    /// If the whole block moved to tmp, move it back and report true.
    fn tmp_is_whole_block(&mut self, b: usize) -> bool {
        if self.blocks[b].states.is_some() {
            return false;
        }
        self.blocks[b].states = self.blocks[b].tmp.take();
        true
    }

    /// Turn block `b`'s tmp ring into a fresh block and return its id. The
    /// child starts with empty counters and remove lists; `split` copies
    /// them where needed.
    fn make_child(&mut self, b: usize) -> usize {
        let fresh = self.blocks.len();
        let labels = self.lts.labels();
        let states = self.blocks[b].tmp.take();
        debug_assert!(states.is_some());
        let mut inset = CountedSet::new(labels);
        let lts = self.lts;
        for q in self.ring_states(states) {
            for &a in lts.bw_labels(q) {
                self.blocks[b].inset.remove(a);
                inset.add(a);
            }
            self.block_of[q] = fresh;
        }
        self.blocks.push(Block {
            states,
            tmp: None,
            remove: vec![None; labels],
            counter: vec![None; labels],
            inset,
        });
        fresh
    }

    /// Move every state in `remove` to its block's tmp ring; returns the
    /// touched blocks.
    fn internal_split(&mut self, remove: &[usize]) -> Vec<usize> {
        let mut mask = vec![false; self.blocks.len()];
        let mut modified = Vec::new();
        for &q in remove {
            let b = self.block_of[q];
            self.move_to_tmp(q);
            if !mask[b] {
                mask[b] = true;
                modified.push(b);
            }
        }
        modified
    }

    /// Split blocks along `remove` without propagating counters; used during
    /// initialization, before the counters exist.
    fn fast_split(&mut self, remove: &[usize]) {
        let modified = self.internal_split(remove);
        for b in modified {
            self.tmp_is_whole_block(b);
            if self.blocks[b].tmp.is_none() {
                continue;
            }
            let fresh = self.relation.split(b, true);
            debug_assert_eq!(fresh, self.blocks.len());
            self.make_child(b);
        }
    }

    /// Split blocks along `remove`, returning the blocks made of remove
    /// states. Children share their parent's counter rows and copy pending
    /// remove lists, re-enqueuing themselves for each copied list.
    fn split(&mut self, remove: &[usize]) -> Vec<usize> {
        let modified = self.internal_split(remove);
        let mut removed = Vec::new();
        for b in modified {
            if self.tmp_is_whole_block(b) {
                removed.push(b);
                continue;
            }
            let fresh = self.relation.split(b, true);
            debug_assert_eq!(fresh, self.blocks.len());
            let child = self.make_child(b);
            removed.push(child);
            let labels: Vec<usize> = self.blocks[child].inset.elems().to_vec();
            for a in labels {
                self.copy_row(child, b, a);
                if let Some(list) = self.blocks[b].remove[a] {
                    let content = self.lists[list].clone();
                    let copy = self.lists.alloc();
                    self.lists[copy] = content;
                    self.blocks[child].remove[a] = Some(copy);
                    self.queue.push((child, a));
                }
            }
        }
        removed
    }

    fn counter_slot(&self, a: usize, q: usize) -> usize {
        let k = self.key[a * self.lts.states() + q];
        debug_assert_ne!(k, usize::MAX);
        2 + k
    }

    /// Bump the `(block, label)` counter for source state `q`. Rows are laid
    /// out `[refcount, master, per-state counts…]`.
    fn incr(&mut self, b: usize, a: usize, q: usize) {
        let slot = self.counter_slot(a, q);
        match self.blocks[b].counter[a] {
            Some(row) => {
                debug_assert_eq!(self.rows[row][0], 1);
                self.rows[row][1] += 1;
                self.rows[row][slot] += 1;
            }
            None => {
                let row = self.rows.alloc();
                self.rows[row].resize(2 + self.range[a], 0);
                self.rows[row][0] = 1;
                self.rows[row][1] = 1;
                self.rows[row][slot] = 1;
                self.blocks[b].counter[a] = Some(row);
            }
        }
    }

    /// Decrement the `(block, label)` counter for source state `q` and
    /// return the remaining count. A shared row is cloned before the first
    /// write; a row whose master count reaches zero is released.
    fn decr(&mut self, b: usize, a: usize, q: usize) -> usize {
        let slot = self.counter_slot(a, q);
        let row = self.blocks[b].counter[a].unwrap();
        if self.rows[row][1] == 1 {
            debug_assert_eq!(self.rows[row][slot], 1);
            if self.rows[row][0] == 1 {
                self.rows.reclaim(row);
            } else {
                self.rows[row][0] -= 1;
            }
            self.blocks[b].counter[a] = None;
            return 0;
        }
        let row = if self.rows[row][0] > 1 {
            self.rows[row][0] -= 1;
            let content = self.rows[row][1..].to_vec();
            let copy = self.rows.alloc();
            self.rows[copy].push(1);
            self.rows[copy].extend_from_slice(&content);
            self.blocks[b].counter[a] = Some(copy);
            copy
        } else {
            row
        };
        self.rows[row][1] -= 1;
        self.rows[row][slot] -= 1;
        self.rows[row][slot]
    }

    /// Share the `(src, a)` counter row with block `dst`.
    fn copy_row(&mut self, dst: usize, src: usize, a: usize) {
        let row = self.blocks[src].counter[a].unwrap();
        self.rows[row][0] += 1;
        debug_assert!(self.blocks[dst].counter[a].is_none());
        self.blocks[dst].counter[a] = Some(row);
    }

    /// Put `q` on the `(block, label)` remove list, enqueuing the pair when
    /// the list is created.
    fn enqueue_to_remove(&mut self, b: usize, a: usize, q: usize) {
        match self.blocks[b].remove[a] {
            Some(list) => self.lists[list].push(q),
            None => {
                let list = self.lists.alloc();
                self.lists[list].push(q);
                self.blocks[b].remove[a] = Some(list);
                self.queue.push((b, a));
            }
        }
    }

    /// The blocks containing `a`-predecessors of block `b`'s states.
    fn build_pre(&self, b: usize, a: usize) -> Vec<usize> {
        let mut mask = vec![false; self.blocks.len()];
        let mut pre = Vec::new();
        for q in self.ring_states(self.blocks[b].states) {
            for &p in &self.lts.pre(a)[q] {
                let pb = self.block_of[p];
                if !mask[pb] {
                    mask[pb] = true;
                    pre.push(pb);
                }
            }
        }
        pre
    }

    /// Process one `(block, label)` remove event: split along the remove
    /// list, cut the relation between predecessor blocks and the removed
    /// blocks, and propagate the counter decrements.
    fn process_remove(&mut self, b: usize, a: usize) {
        let list = self.blocks[b].remove[a].take().unwrap();
        let pre_list = self.build_pre(b, a);
        let remove = std::mem::take(&mut self.lists[list]);
        self.lists.reclaim(list);
        debug_assert!(!remove.is_empty());
        let removed = self.split(&remove);
        let lts = self.lts;
        for &b1 in &pre_list {
            for &b2 in &removed {
                debug_assert_ne!(b1, b2);
                if !self.relation.get(b1, b2) {
                    continue;
                }
                self.relation.set(b1, b2, false);
                let labels: Vec<usize> = self.blocks[b2]
                    .inset
                    .elems()
                    .iter()
                    .copied()
                    .filter(|&a2| self.blocks[b1].inset.contains(a2))
                    .collect();
                let states2 = self.ring_states(self.blocks[b2].states);
                for a2 in labels {
                    for &s in &states2 {
                        for &p in &lts.pre(a2)[s] {
                            if self.decr(b1, a2, p) == 0 {
                                self.enqueue_to_remove(b1, a2, p);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Carve the class out of its current block as a fresh block.
    fn make_block(&mut self, class: &[usize]) {
        debug_assert!(!class.is_empty());
        let b = self.block_of[class[0]];
        for &q in class {
            debug_assert_eq!(self.block_of[q], b);
            self.move_to_tmp(q);
        }
        debug_assert!(self.blocks[b].states.is_some());
        self.make_child(b);
    }

    fn is_partition(partition: &[Vec<usize>], states: usize) -> bool {
        let mut mask = vec![false; states];
        for class in partition {
            for &q in class {
                if q >= states || mask[q] {
                    return false;
                }
                mask[q] = true;
            }
        }
        mask.iter().all(|&seen| seen)
    }

    /// Install the initial partition and relation, build the dense
    /// predecessor keying, pre-prune the relation by label reachability, and
    /// seed the counters and remove lists.
    fn init(&mut self, partition: &[Vec<usize>], relation: &BinaryRelation) {
        let lts = self.lts;
        let n = lts.states();
        let labels = lts.labels();
        debug_assert!(Self::is_partition(partition, n));
        for class in partition.iter().skip(1) {
            self.make_block(class);
        }
        self.relation = relation.clone();
        debug_assert_eq!(self.blocks.len(), self.relation.size());
        debug_assert!(self.relation.is_reflexive());

        // key[a*n + q] is q's dense index among states with an outgoing
        // a-edge; range[a] is the number of such states
        self.delta1 = (0..labels)
            .map(|a| (0..n).filter(|&q| !lts.post(a)[q].is_empty()).collect())
            .collect();
        self.key = vec![usize::MAX; labels * n];
        self.range = vec![0; labels];
        for a in 0..labels {
            self.range[a] = self.delta1[a].len();
            for (x, &q) in self.delta1[a].iter().enumerate() {
                self.key[a * n + q] = x;
            }
        }
        let delta1 = self.delta1.clone();
        for a in 0..labels {
            self.fast_split(&delta1[a]);
        }

        // prune by reachability: a block with an outgoing a-edge cannot be
        // simulated by a block without one
        let nb = self.blocks.len();
        let mut pre_labels: Vec<Vec<usize>> = vec![Vec::new(); nb];
        let mut no_pre: Vec<Vec<usize>> = vec![Vec::new(); labels];
        for b in 0..nb {
            for q in self.ring_states(self.blocks[b].states) {
                for a in 0..labels {
                    if self.key[a * n + q] != usize::MAX {
                        pre_labels[b].push(a);
                    } else {
                        no_pre[a].push(b);
                    }
                }
            }
        }
        for b1 in 0..nb {
            for &a in &pre_labels[b1] {
                for &b2 in &no_pre[a] {
                    debug_assert_ne!(b1, b2);
                    self.relation.set(b1, b2, false);
                }
            }
        }

        // counters and initial remove lists
        for b in (0..nb).rev() {
            let inset: Vec<usize> = self.blocks[b].inset.elems().to_vec();
            for a in inset {
                for &q in &delta1[a] {
                    for &r in &lts.post(a)[q] {
                        if self.relation.get(b, self.block_of[r]) {
                            self.incr(b, a, q);
                        }
                    }
                }
                // states with an a-edge but none into a related block
                let mut present = vec![false; n];
                for &q in &delta1[a] {
                    present[q] = true;
                }
                for b2 in 0..nb {
                    if !self.relation.get(b, b2) {
                        continue;
                    }
                    for s in self.ring_states(self.blocks[b2].states) {
                        for &p in &lts.pre(a)[s] {
                            present[p] = false;
                        }
                    }
                }
                let survivors: Vec<usize> =
                    delta1[a].iter().copied().filter(|&q| present[q]).collect();
                if survivors.is_empty() {
                    continue;
                }
                let list = self.lists.alloc();
                self.lists[list] = survivors;
                self.blocks[b].remove[a] = Some(list);
                self.queue.push((b, a));
            }
        }
    }

    fn run(&mut self) {
        let mut steps = 0usize;
        while let Some((b, a)) = self.queue.pop() {
            self.process_remove(b, a);
            steps += 1;
        }
        log::debug!(
            "simulation fixpoint: {steps} remove events, {} blocks",
            self.blocks.len()
        );
    }

    fn build_result(&self, size: usize) -> BinaryRelation {
        let mut result = BinaryRelation::new(size);
        for i in 0..size {
            let bi = self.block_of[i];
            for j in 0..size {
                result.set(i, j, self.relation.get(bi, self.block_of[j]));
            }
        }
        result
    }
}

/// Compute the maximum simulation preorder on `lts` consistent with the
/// initial `partition` and block `relation`, truncated to the first
/// `output_size` states.
///
/// The caller must pass a true partition of the states and a reflexive
/// relation sized to it; the result's `(i, j)` entry says whether state `i`
/// is simulated by state `j`.
pub fn compute_simulation(
    lts: &ExplicitLts,
    partition: &[Vec<usize>],
    relation: &BinaryRelation,
    output_size: usize,
) -> BinaryRelation {
    if lts.states() == 0 {
        return BinaryRelation::new(0);
    }
    let mut refiner = Refiner::new(lts);
    refiner.init(partition, relation);
    refiner.run();
    refiner.build_result(output_size)
}

/// The downward simulation preorder on the states of a tree automaton.
///
/// The automaton is viewed as an LTS with one extra node per transition:
/// `parent --symbol--> node` and `node --slot i--> children[i]`, with slot
/// labels placed after the symbol labels. Simulation on that LTS, restricted
/// to the automaton states, is exactly downward tree simulation.
pub fn downward_simulation(aut: &TreeAut) -> BinaryRelation {
    let n = aut.num_states();
    if n == 0 {
        return BinaryRelation::new(0);
    }
    let transitions = aut.transitions();
    let n_sym = aut.alphabet_size();
    let labels = n_sym + aut.max_rank();
    let mut lts = ExplicitLts::new(n + transitions.len(), labels);
    for (t, tr) in transitions.iter().enumerate() {
        let node = n + t;
        lts.add_edge(tr.parent, tr.symbol, node);
        for (slot, &child) in tr.children.iter().enumerate() {
            lts.add_edge(node, n_sym + slot, child);
        }
    }
    let mut partition: Vec<Vec<usize>> = vec![(0..n).collect()];
    if !transitions.is_empty() {
        partition.push((n..n + transitions.len()).collect());
    }
    let relation = BinaryRelation::identity(partition.len());
    compute_simulation(&lts, &partition, &relation, n)
}

/// The upward simulation preorder (induced by state equality) on the states
/// of a tree automaton.
///
/// The LTS view has one environment node per `(transition, child slot)`
/// pair: `child --(symbol, slot)--> environment` and a shared final label
/// `environment --up--> parent`. Environments start partitioned by
/// `(symbol, slot, sibling states)`, distinct groups unrelated, so a move is
/// only ever matched within an identical sibling context; the acceptance
/// condition is encoded by splitting states into final and non-final blocks
/// with the final block initially unrelated to the non-final one.
pub fn upward_simulation(aut: &TreeAut) -> BinaryRelation {
    let n = aut.num_states();
    if n == 0 {
        return BinaryRelation::new(0);
    }
    let transitions = aut.transitions();
    let n_sym = aut.alphabet_size();
    let stride = aut.max_rank().max(1);
    let up = n_sym * stride;

    let mut env_base = Vec::with_capacity(transitions.len());
    let mut total_envs = 0;
    for tr in transitions {
        env_base.push(n + total_envs);
        total_envs += tr.children.len();
    }
    let mut lts = ExplicitLts::new(n + total_envs, up + 1);
    for (t, tr) in transitions.iter().enumerate() {
        for (slot, &child) in tr.children.iter().enumerate() {
            let env = env_base[t] + slot;
            lts.add_edge(child, tr.symbol * stride + slot, env);
            lts.add_edge(env, up, tr.parent);
        }
    }

    let mut classes: Vec<Vec<usize>> = Vec::new();
    let nonfinal: Vec<usize> = (0..n).filter(|&q| !aut.is_final(q)).collect();
    let finals: Vec<usize> = (0..n).filter(|&q| aut.is_final(q)).collect();
    let nonfinal_block = (!nonfinal.is_empty()).then(|| {
        classes.push(nonfinal);
        classes.len() - 1
    });
    let final_block = (!finals.is_empty()).then(|| {
        classes.push(finals);
        classes.len() - 1
    });
    let mut groups: FxHashMap<(usize, usize, Vec<usize>), usize> = FxHashMap::default();
    for (t, tr) in transitions.iter().enumerate() {
        for slot in 0..tr.children.len() {
            let mut siblings = tr.children.clone();
            siblings[slot] = usize::MAX;
            let class = *groups
                .entry((tr.symbol, slot, siblings))
                .or_insert_with(|| {
                    classes.push(Vec::new());
                    classes.len() - 1
                });
            classes[class].push(env_base[t] + slot);
        }
    }

    let mut relation = BinaryRelation::identity(classes.len());
    if let (Some(nf), Some(f)) = (nonfinal_block, final_block) {
        relation.set(nf, f, true);
    }
    compute_simulation(&lts, &classes, &relation, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(n: usize) -> BinaryRelation {
        let mut rel = BinaryRelation::new(n);
        for i in 0..n {
            for j in 0..n {
                rel.set(i, j, true);
            }
        }
        rel
    }

    #[test]
    fn test_chain_into_loop_is_fully_similar() {
        // 0 -a-> 1 -a-> 2 -a-> 2: every state has the same a-trace behavior
        let mut lts = ExplicitLts::new(3, 1);
        lts.add_edge(0, 0, 1);
        lts.add_edge(1, 0, 2);
        lts.add_edge(2, 0, 2);
        let sim = compute_simulation(&lts, &[vec![0, 1, 2]], &BinaryRelation::identity(1), 3);
        assert_eq!(sim, full(3));
    }

    #[test]
    fn test_dead_end_breaks_similarity() {
        // 0 -a-> 1, and 1, 2 have no successors
        let mut lts = ExplicitLts::new(3, 1);
        lts.add_edge(0, 0, 1);
        let sim = compute_simulation(&lts, &[vec![0, 1, 2]], &BinaryRelation::identity(1), 3);
        assert!(sim.is_reflexive());
        assert!(sim.is_transitive());
        // successor-less states are simulated by everything
        assert!(sim.get(1, 0) && sim.get(1, 2) && sim.get(2, 0) && sim.get(2, 1));
        // 0 moves, 1 and 2 cannot
        assert!(!sim.get(0, 1) && !sim.get(0, 2));
    }

    #[test]
    fn test_labels_must_match() {
        // 0 -a-> 1, 2 -b-> 1: different labels, no simulation either way
        let mut lts = ExplicitLts::new(3, 2);
        lts.add_edge(0, 0, 1);
        lts.add_edge(2, 1, 1);
        let sim = compute_simulation(&lts, &[vec![0, 1, 2]], &BinaryRelation::identity(1), 3);
        assert!(!sim.get(0, 2) && !sim.get(2, 0));
        assert!(sim.get(1, 0) && sim.get(1, 2));
    }

    #[test]
    fn test_branching_simulation() {
        // 0 -a-> 2 only; 1 -a-> 2 and 1 -a-> 3; 3 -b-> 4.
        // 0 ⊑ 1 (1 matches 0's single move), but 1 ⋢ 0 since 0 cannot
        // match the move into 3 (which can still do b).
        let mut lts = ExplicitLts::new(5, 2);
        lts.add_edge(0, 0, 2);
        lts.add_edge(1, 0, 2);
        lts.add_edge(1, 0, 3);
        lts.add_edge(3, 1, 4);
        let sim = compute_simulation(
            &lts,
            &[vec![0, 1, 2, 3, 4]],
            &BinaryRelation::identity(1),
            5,
        );
        assert!(sim.get(0, 1));
        assert!(!sim.get(1, 0));
        assert!(sim.get(2, 3));
        assert!(!sim.get(3, 2));
    }

    #[test]
    fn test_respects_initial_partition_relation() {
        // same LTS as the chain test, but states pre-partitioned into
        // unrelated blocks: cross-block pairs stay out, and 0 vs 1 fall
        // apart too because their matching successors (1 vs 2) are
        // cross-block
        let mut lts = ExplicitLts::new(3, 1);
        lts.add_edge(0, 0, 1);
        lts.add_edge(1, 0, 2);
        lts.add_edge(2, 0, 2);
        let sim = compute_simulation(
            &lts,
            &[vec![0, 1], vec![2]],
            &BinaryRelation::identity(2),
            3,
        );
        assert!(sim.is_reflexive());
        assert!(!sim.get(0, 1) && !sim.get(1, 0));
        assert!(!sim.get(0, 2) && !sim.get(2, 0) && !sim.get(1, 2) && !sim.get(2, 1));
    }

    #[test]
    fn test_downward_simulation_on_automaton() {
        // a -> q0, a -> q1, b(q0, q0) -> q1: q0 ⊑ q1 (q1 has the extra b
        // behavior), q1 ⋢ q0
        let mut aut = TreeAut::new();
        let q0 = aut.add_state();
        let q1 = aut.add_state();
        aut.add_transition(0, vec![], q0).unwrap();
        aut.add_transition(0, vec![], q1).unwrap();
        aut.add_transition(1, vec![q0, q0], q1).unwrap();
        let sim = downward_simulation(&aut);
        assert_eq!(sim.size(), 2);
        assert!(sim.is_reflexive());
        assert!(sim.get(q0, q1));
        assert!(!sim.get(q1, q0));
    }

    #[test]
    fn test_downward_simulation_no_transitions() {
        let mut aut = TreeAut::new();
        aut.add_state();
        aut.add_state();
        let sim = downward_simulation(&aut);
        assert_eq!(sim, full(2));
    }

    #[test]
    fn test_upward_simulation_same_sibling_context() {
        // a -> q0, a -> q1, b(q0, q2) -> q3, b(q1, q2) -> q4: the moves of
        // q0 and q1 sit in identical sibling contexts, so with both parents
        // final they simulate each other upward
        let mut aut = TreeAut::new();
        let states: Vec<usize> = (0..5).map(|_| aut.add_state()).collect();
        aut.add_transition(0, vec![], states[0]).unwrap();
        aut.add_transition(0, vec![], states[1]).unwrap();
        aut.add_transition(1, vec![states[0], states[2]], states[3])
            .unwrap();
        aut.add_transition(1, vec![states[1], states[2]], states[4])
            .unwrap();
        aut.add_final(states[3]).unwrap();
        aut.add_final(states[4]).unwrap();
        let sim = upward_simulation(&aut);
        assert!(sim.is_reflexive());
        assert!(sim.get(0, 1) && sim.get(1, 0));
        assert!(sim.get(3, 4) && sim.get(4, 3));
        // q2 moves at the second slot only, q0 at the first
        assert!(!sim.get(0, 2) && !sim.get(2, 0));
    }

    #[test]
    fn test_upward_simulation_respects_acceptance() {
        // as above, but only q3 is final: the final parent cannot be
        // simulated by the non-final one, and that separates q0 from q1
        let mut aut = TreeAut::new();
        let states: Vec<usize> = (0..5).map(|_| aut.add_state()).collect();
        aut.add_transition(0, vec![], states[0]).unwrap();
        aut.add_transition(0, vec![], states[1]).unwrap();
        aut.add_transition(1, vec![states[0], states[2]], states[3])
            .unwrap();
        aut.add_transition(1, vec![states[1], states[2]], states[4])
            .unwrap();
        aut.add_final(states[3]).unwrap();
        let sim = upward_simulation(&aut);
        assert!(!sim.get(3, 4) && sim.get(4, 3));
        assert!(!sim.get(0, 1) && sim.get(1, 0));
    }

    #[test]
    fn test_upward_simulation_leaf_only() {
        // no environments at all: upward simulation is exactly the
        // acceptance condition
        let mut aut = TreeAut::new();
        let q0 = aut.add_state();
        let q1 = aut.add_state();
        aut.add_transition(0, vec![], q0).unwrap();
        aut.add_transition(0, vec![], q1).unwrap();
        aut.add_final(q1).unwrap();
        let sim = upward_simulation(&aut);
        assert!(sim.get(q0, q1));
        assert!(!sim.get(q1, q0));
        assert!(sim.is_reflexive());
    }

    #[test]
    fn test_empty_lts() {
        let lts = ExplicitLts::new(0, 0);
        let sim = compute_simulation(&lts, &[], &BinaryRelation::new(0), 0);
        assert_eq!(sim.size(), 0);
    }
}
