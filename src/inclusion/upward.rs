//! Upward (bottom-up) antichain inclusion.
//!
//! The search explores pairs `(q, Q)` where `q` is a state the smaller
//! automaton reaches on some tree and `Q` is the macro-state of all states
//! the bigger automaton reaches on the same tree, folded to its
//! preorder-maximal elements. A pair with `q` final and `Q` not accepting
//! refutes inclusion; if the antichain of pairs closes without one,
//! inclusion holds. Pending pairs are ordered by `(|Q|, q, id)` so that
//! small macro-states, the ones most likely to prune others, go first.
//!
//! Both automata must live in one shared state space, with `ind`/`inv` the
//! index views of a preorder on it.

use crate::antichain::{FlatAntichain, KeyedAntichain};
use crate::automaton::{State, TreeAut};
use crate::cache::{BinaryOpCache, CachedSet, SetCache};
use crate::inclusion::Inclusion;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::rc::Rc;

const REASON_LEAF_SIZES: &str = "leaves set sizes incompatible";
const REASON_LEAVES: &str = "leaves not covered";
const REASON_ACCEPTS: &str = "smaller accepts, bigger does not";

/// A pending pair in the `next` ordering.
#[derive(Clone)]
struct NextElem {
    q: State,
    set: Rc<CachedSet>,
}

impl NextElem {
    fn rank(&self) -> (usize, State, usize) {
        (self.set.states.len(), self.q, self.set.id)
    }
}

impl PartialEq for NextElem {
    fn eq(&self, other: &NextElem) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for NextElem {}

impl PartialOrd for NextElem {
    fn partial_cmp(&self, other: &NextElem) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NextElem {
    fn cmp(&self, other: &NextElem) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Whether two strictly sorted slices intersect.
fn sorted_intersects(a: &[usize], b: &[usize]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => return true,
        }
    }
    false
}

/// One past the last symbol with a nullary transition.
fn leaf_range(aut: &TreeAut) -> usize {
    aut.indexes()
        .leaves
        .iter()
        .rposition(|list| !list.is_empty())
        .map_or(0, |sym| sym + 1)
}

pub(super) fn check(
    smaller: &TreeAut,
    bigger: &TreeAut,
    ind: &[Vec<State>],
    inv: &[Vec<State>],
) -> Inclusion {
    let s_idx = smaller.indexes();
    let b_idx = bigger.indexes();
    let domain = ind.len();

    let mut cache = SetCache::new();
    let lte_memo: Rc<RefCell<BinaryOpCache<usize, usize, bool>>> =
        Rc::new(RefCell::new(BinaryOpCache::new()));
    let eval_memo: Rc<RefCell<BinaryOpCache<(usize, usize), usize, Rc<Vec<usize>>>>> =
        Rc::new(RefCell::new(BinaryOpCache::new()));
    {
        let lte_memo = Rc::clone(&lte_memo);
        let eval_memo = Rc::clone(&eval_memo);
        cache.watch(move |id| {
            let mut lte = lte_memo.borrow_mut();
            lte.invalidate_first(&id);
            lte.invalidate_second(&id);
            eval_memo.borrow_mut().invalidate_second(&id);
        });
    }

    // the pointwise lift of the preorder, memoized on set identities
    let lte = |x: &Rc<CachedSet>, y: &Rc<CachedSet>| -> bool {
        if Rc::ptr_eq(x, y) {
            return true;
        }
        lte_memo.borrow_mut().lookup(x.id, y.id, || {
            x.states
                .iter()
                .all(|&s| sorted_intersects(&ind[s], &y.states))
        })
    };

    // transitions of the bigger automaton whose `slot`-th child lies in the
    // macro-state, memoized on (symbol, slot, set identity)
    let eval = |symbol: usize, slot: usize, set: &Rc<CachedSet>| -> Rc<Vec<usize>> {
        eval_memo.borrow_mut().lookup((symbol, slot), set.id, || {
            let mut out: Vec<usize> = Vec::new();
            for &s in &set.states {
                out.extend_from_slice(b_idx.up_list(symbol, slot, s));
            }
            out.sort_unstable();
            out.dedup();
            Rc::new(out)
        })
    };

    let mut post = FlatAntichain::new(domain);
    let mut processed: KeyedAntichain<Rc<CachedSet>> = KeyedAntichain::new();
    let mut temporary: KeyedAntichain<Rc<CachedSet>> = KeyedAntichain::new();
    let mut next: BTreeSet<NextElem> = BTreeSet::new();
    let mut dead: Vec<usize> = Vec::new();

    // seed from the leaves
    let s_range = leaf_range(smaller);
    if leaf_range(bigger) < s_range {
        return Inclusion::refuted(REASON_LEAF_SIZES);
    }
    for symbol in 0..s_range {
        post.clear();
        let mut accepting = false;
        for &bt in b_idx.leaves_list(symbol) {
            let s = bigger.transitions()[bt].parent;
            if post.contains(&ind[s]) {
                continue;
            }
            post.refine(&inv[s]);
            post.insert(s);
            accepting = accepting || bigger.is_final(s);
        }
        let mut folded: Vec<State> = post.data().to_vec();
        folded.sort_unstable();
        let set = cache.intern(folded);
        for &st in s_idx.leaves_list(symbol) {
            let p = smaller.transitions()[st].parent;
            if smaller.is_final(p) && !accepting {
                return Inclusion::refuted(REASON_LEAVES);
            }
            if sorted_intersects(&ind[p], &set.states) {
                continue;
            }
            if processed.contains(&ind[p], &set, &lte) {
                continue;
            }
            processed.refine_with(&inv[p], &set, &lte, |k, s| {
                next.remove(&NextElem {
                    q: k,
                    set: Rc::clone(s),
                });
                dead.push(s.id);
            });
            processed.insert(p, Rc::clone(&set));
            next.insert(NextElem {
                q: p,
                set: Rc::clone(&set),
            });
        }
        dead.push(set.id);
        drop(set);
        for id in dead.drain(..) {
            cache.release(id);
        }
    }

    // close under the bigger automaton's post-images
    let s_alphabet = s_idx.alphabet_size();
    while let Some(elem) = next.pop_first() {
        let q = elem.q;
        let fixed = [Rc::clone(&elem.set)];
        for symbol in 0..s_alphabet {
            for slot in 0..s_idx.up_arity(symbol) {
                for &st in s_idx.up_list(symbol, slot, q) {
                    let tr = &smaller.transitions()[st];
                    let arity = tr.children.len();

                    {
                        // one choice list per child: processed macro-states,
                        // except the popped one at the distinguished slot
                        let mut slots: Vec<&[Rc<CachedSet>]> = Vec::with_capacity(arity);
                        let mut buildable = true;
                        for (i, &child) in tr.children.iter().enumerate() {
                            if i == slot {
                                slots.push(&fixed);
                            } else {
                                let list = processed.lookup(child);
                                if list.is_empty() {
                                    buildable = false;
                                    break;
                                }
                                slots.push(list);
                            }
                        }
                        if !buildable {
                            continue;
                        }

                        let mut pos = vec![0usize; arity];
                        loop {
                            post.clear();
                            let first = eval(symbol, 0, &slots[0][pos[0]]);
                            let mut big: Vec<usize> = (*first).clone();
                            for k in 1..arity {
                                if big.is_empty() {
                                    break;
                                }
                                let other = eval(symbol, k, &slots[k][pos[k]]);
                                big.retain(|t| other.binary_search(t).is_ok());
                            }
                            let mut accepting = false;
                            for &bt in &big {
                                let s = bigger.transitions()[bt].parent;
                                if post.contains(&ind[s]) {
                                    continue;
                                }
                                post.refine(&inv[s]);
                                post.insert(s);
                                accepting = accepting || bigger.is_final(s);
                            }
                            if smaller.is_final(tr.parent) && !accepting {
                                return Inclusion::refuted(REASON_ACCEPTS);
                            }
                            let mut folded: Vec<State> = post.data().to_vec();
                            folded.sort_unstable();
                            if !sorted_intersects(&ind[tr.parent], &folded) {
                                let set = cache.intern(folded);
                                if temporary.contains(&ind[tr.parent], &set, &lte) {
                                    dead.push(set.id);
                                } else {
                                    temporary.refine_with(&inv[tr.parent], &set, &lte, |_, s| {
                                        dead.push(s.id)
                                    });
                                    temporary.insert(tr.parent, set);
                                }
                            }
                            // advance the choice odometer
                            let mut advanced = false;
                            for i in 0..arity {
                                pos[i] += 1;
                                if pos[i] < slots[i].len() {
                                    advanced = true;
                                    break;
                                }
                                pos[i] = 0;
                            }
                            if !advanced {
                                break;
                            }
                        }
                    }

                    // promote this transition's macro-states
                    let mut pairs: Vec<(State, Rc<CachedSet>)> = temporary
                        .iter()
                        .map(|(k, v)| (k, Rc::clone(v)))
                        .collect();
                    pairs.sort_by_key(|(k, v)| (*k, v.id));
                    temporary.clear();
                    for (k, set) in pairs {
                        if processed.contains(&ind[k], &set, &lte) {
                            dead.push(set.id);
                            continue;
                        }
                        processed.refine_with(&inv[k], &set, &lte, |k2, s| {
                            next.remove(&NextElem {
                                q: k2,
                                set: Rc::clone(s),
                            });
                            dead.push(s.id);
                        });
                        next.insert(NextElem {
                            q: k,
                            set: Rc::clone(&set),
                        });
                        processed.insert(k, set);
                    }
                    for id in dead.drain(..) {
                        cache.release(id);
                    }
                }
            }
        }
    }

    Inclusion::proved()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inclusion::{check_upward_inclusion, Preorder};
    use crate::relation::BinaryRelation;

    const A: usize = 0;
    const B: usize = 1;

    fn single_b() -> TreeAut {
        let mut aut = TreeAut::new();
        let q0 = aut.add_state();
        let q1 = aut.add_state();
        aut.add_transition(A, vec![], q0).unwrap();
        aut.add_transition(B, vec![q0, q0], q1).unwrap();
        aut.add_final(q1).unwrap();
        aut
    }

    // a -> r0, a -> r1, b(r0, r1) -> r2, final r2; also accepts only b(a, a)
    fn split_leaves() -> TreeAut {
        let mut aut = TreeAut::new();
        let r0 = aut.add_state();
        let r1 = aut.add_state();
        let r2 = aut.add_state();
        aut.add_transition(A, vec![], r0).unwrap();
        aut.add_transition(A, vec![], r1).unwrap();
        aut.add_transition(B, vec![r0, r1], r2).unwrap();
        aut.add_final(r2).unwrap();
        aut
    }

    #[test]
    fn test_core_self_inclusion() {
        let aut = single_b();
        let n = aut.num_states();
        let rel = BinaryRelation::identity(n);
        let verdict = check(&aut, &aut, &rel.index(), &rel.inverted_index());
        assert!(verdict.holds);
    }

    #[test]
    fn test_distinct_leaf_states_still_included() {
        let a = single_b();
        let b = split_leaves();
        for pre in [Preorder::Identity, Preorder::Simulation] {
            let verdict = check_upward_inclusion(&a, &b, pre).unwrap();
            assert!(verdict.holds, "with {pre:?}: {}", verdict.description);
            let verdict = check_upward_inclusion(&b, &a, pre).unwrap();
            assert!(verdict.holds, "with {pre:?}: {}", verdict.description);
        }
    }

    #[test]
    fn test_missing_leaf_refutes() {
        // a -> q0 with q0 final; the bigger side has no a-leaf at all, only
        // a c-leaf above a's symbol
        let mut a = TreeAut::new();
        let q0 = a.add_state();
        a.add_transition(A, vec![], q0).unwrap();
        a.add_final(q0).unwrap();
        let mut b = TreeAut::new();
        let s0 = b.add_state();
        b.add_transition(2, vec![], s0).unwrap();
        b.add_final(s0).unwrap();
        let verdict = check_upward_inclusion(&a, &b, Preorder::Identity).unwrap();
        assert!(!verdict.holds);
        assert_eq!(verdict.description, REASON_LEAVES);
    }

    #[test]
    fn test_leaf_range_refutes() {
        // smaller uses a leaf symbol beyond anything the bigger side has
        let mut a = TreeAut::new();
        let q = a.add_state();
        a.add_transition(3, vec![], q).unwrap();
        a.add_final(q).unwrap();
        let b = single_b();
        let verdict = check_upward_inclusion(&a, &b, Preorder::Identity).unwrap();
        assert!(!verdict.holds);
        assert_eq!(verdict.description, REASON_LEAF_SIZES);
    }

    #[test]
    fn test_bigger_accepts_more() {
        // bigger accepts all trees over {a, b}
        let mut b = TreeAut::new();
        let u = b.add_state();
        b.add_transition(A, vec![], u).unwrap();
        b.add_transition(B, vec![u, u], u).unwrap();
        b.add_final(u).unwrap();
        let a = single_b();
        for pre in [Preorder::Identity, Preorder::Simulation] {
            assert!(check_upward_inclusion(&a, &b, pre).unwrap().holds);
            let back = check_upward_inclusion(&b, &a, pre).unwrap();
            assert!(!back.holds);
            // the universal automaton already accepts the bare leaf
            assert_eq!(back.description, REASON_LEAVES);
        }
    }

    #[test]
    fn test_refutation_above_the_leaves() {
        // smaller accepts b(a,a) and b(b(a,a),a); bigger only b(a,a); all
        // leaves agree, so the refutation comes from the inductive step
        let mut a = TreeAut::new();
        let q0 = a.add_state();
        let q1 = a.add_state();
        let q2 = a.add_state();
        a.add_transition(A, vec![], q0).unwrap();
        a.add_transition(B, vec![q0, q0], q1).unwrap();
        a.add_transition(B, vec![q1, q0], q2).unwrap();
        a.add_final(q1).unwrap();
        a.add_final(q2).unwrap();
        let b = single_b();
        for pre in [Preorder::Identity, Preorder::Simulation] {
            let back = check_upward_inclusion(&a, &b, pre).unwrap();
            assert!(!back.holds);
            assert_eq!(back.description, REASON_ACCEPTS);
            assert!(check_upward_inclusion(&b, &a, pre).unwrap().holds);
        }
    }

    #[test]
    fn test_empty_smaller_included_everywhere() {
        let empty = TreeAut::new();
        let b = single_b();
        assert!(check_upward_inclusion(&empty, &b, Preorder::Identity)
            .unwrap()
            .holds);
        let back = check_upward_inclusion(&b, &empty, Preorder::Identity).unwrap();
        assert!(!back.holds);
    }

    #[test]
    fn test_no_final_states_accepts_nothing() {
        let mut a = single_b();
        a.remove_state(1);
        let b = single_b();
        assert!(check_upward_inclusion(&a, &b, Preorder::Identity)
            .unwrap()
            .holds);
    }
}
