//! Downward (top-down) antichain inclusion.
//!
//! The search proves goals of the form `(p, S)`: every tree accepted from
//! `p` in the smaller automaton is accepted from some state of `S` in the
//! bigger one. Four filters suppress a goal before it is expanded — a
//! subsuming ancestor on the workset stack, a cached refutation, a cached
//! proof at the current expansion level, and the preorder shortcut — and
//! expansion matches each smaller transition either against one pointwise
//! covering bigger tuple or against every choice function over the bigger
//! tuples.
//!
//! The automata must be free of useless states and live in one shared state
//! space; `ind`/`inv` are the index views of a preorder on it that
//! underapproximates downward language inclusion.

use crate::antichain::KeyedAntichain;
use crate::automaton::{State, TreeAut};
use crate::inclusion::Inclusion;
use crate::relation::BinaryRelation;
use fxhash::FxHashSet;
use itertools::Itertools;
use std::rc::Rc;

/// Every state of `x` is below some state of `y`.
fn covered(pre: &BinaryRelation, x: &[State], y: &[State]) -> bool {
    x.iter().all(|&a| y.iter().any(|&b| pre.get(a, b)))
}

/// The mutable search state threaded through the recursion.
struct Search<'a> {
    smaller: &'a TreeAut,
    bigger: &'a TreeAut,
    pre: &'a BinaryRelation,
    ind: &'a [Vec<State>],
    inv: &'a [Vec<State>],
    /// Goals on the current recursion path.
    workset: Vec<(State, Rc<Vec<State>>)>,
    /// Refuted goals, global to the run.
    refuted: KeyedAntichain<Rc<Vec<State>>>,
}

/// Decide one goal. `proven` is the caller's per-level cache of already
/// proved sibling goals; each recursive descent gets a fresh one.
fn expand(
    ctx: &mut Search,
    proven: &mut KeyedAntichain<Rc<Vec<State>>>,
    p: State,
    set: &Rc<Vec<State>>,
) -> bool {
    let (pre, ind, inv) = (ctx.pre, ctx.ind, ctx.inv);
    let (smaller, bigger) = (ctx.smaller, ctx.bigger);
    let s_idx = smaller.indexes();
    let b_idx = bigger.indexes();

    // a subsuming ancestor makes this goal a weaker instance of one the
    // stack is already committed to
    if ctx
        .workset
        .iter()
        .any(|(p2, s2)| pre.get(p, *p2) && covered(pre, s2, set))
    {
        return true;
    }
    if ctx
        .refuted
        .contains(&inv[p], set, |stored, fresh| covered(pre, fresh, stored))
    {
        return false;
    }
    if proven.contains(&ind[p], set, |stored, fresh| covered(pre, stored, fresh)) {
        return true;
    }
    if set.iter().any(|&s| pre.get(p, s)) {
        return true;
    }

    ctx.workset.push((p, Rc::clone(set)));
    let mut inner: KeyedAntichain<Rc<Vec<State>>> = KeyedAntichain::new();
    let mut holds = true;

    'symbols: for symbol in s_idx.down_symbols(p) {
        let s_transitions = s_idx.down_list(p, symbol);
        // the bigger side's tuples under this symbol, from any state of the
        // goal set, deduplicated
        let mut rhs: Vec<&[State]> = Vec::new();
        let mut seen: FxHashSet<&[State]> = FxHashSet::default();
        for &s in set.iter() {
            for &bt in b_idx.down_list(s, symbol) {
                let tuple: &[State] = &bigger.transitions()[bt].children;
                if seen.insert(tuple) {
                    rhs.push(tuple);
                }
            }
        }
        let arity = smaller.transitions()[s_transitions[0]].children.len();
        if arity == 0 {
            if rhs.is_empty() {
                holds = false;
                break 'symbols;
            }
            continue;
        }
        if rhs.is_empty() {
            holds = false;
            break 'symbols;
        }
        for &st in s_transitions {
            let lhs = &smaller.transitions()[st].children;
            // fast path: one bigger tuple covering the smaller one pointwise
            let mut matched = false;
            for tuple in &rhs {
                matched = true;
                for slot in 0..arity {
                    let single = Rc::new(vec![tuple[slot]]);
                    if !expand(ctx, &mut inner, lhs[slot], &single) {
                        matched = false;
                        break;
                    }
                }
                if matched {
                    break;
                }
            }
            if matched {
                continue;
            }
            // otherwise every way of assigning the bigger tuples to slots
            // must be answered at some slot
            for cf in std::iter::repeat(0..arity)
                .take(rhs.len())
                .multi_cartesian_product()
            {
                let mut found = false;
                for slot in 0..arity {
                    let mut assigned: Vec<State> = cf
                        .iter()
                        .enumerate()
                        .filter(|&(_, &choice)| choice == slot)
                        .map(|(i, _)| rhs[i][slot])
                        .collect();
                    assigned.sort_unstable();
                    assigned.dedup();
                    if assigned.is_empty() {
                        continue;
                    }
                    if expand(ctx, &mut inner, lhs[slot], &Rc::new(assigned)) {
                        found = true;
                        break;
                    }
                }
                if !found {
                    holds = false;
                    break 'symbols;
                }
            }
        }
    }

    ctx.workset.pop();
    if holds {
        proven.refine(&inv[p], set, |fresh, stored| covered(pre, fresh, stored));
        proven.insert(p, Rc::clone(set));
    } else {
        ctx.refuted
            .refine(&ind[p], set, |fresh, stored| covered(pre, stored, fresh));
        ctx.refuted.insert(p, Rc::clone(set));
    }
    holds
}

pub(super) fn check(
    smaller: &TreeAut,
    bigger: &TreeAut,
    pre: &BinaryRelation,
    ind: &[Vec<State>],
    inv: &[Vec<State>],
) -> Inclusion {
    let target = Rc::new(bigger.finals_sorted());
    let mut ctx = Search {
        smaller,
        bigger,
        pre,
        ind,
        inv,
        workset: Vec::new(),
        refuted: KeyedAntichain::new(),
    };
    let mut proven: KeyedAntichain<Rc<Vec<State>>> = KeyedAntichain::new();
    for p in smaller.finals_sorted() {
        if !expand(&mut ctx, &mut proven, p, &target) {
            return Inclusion::refuted("inclusion refuted");
        }
    }
    Inclusion::proved()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inclusion::{check_downward_inclusion, Preorder};

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

    fn universal() -> TreeAut {
        let mut aut = TreeAut::new();
        let u = aut.add_state();
        aut.add_transition(A, vec![], u).unwrap();
        aut.add_transition(B, vec![u, u], u).unwrap();
        aut.add_final(u).unwrap();
        aut
    }

    #[test]
    fn test_self_inclusion() {
        let aut = single_b();
        for pre in [Preorder::Identity, Preorder::Simulation] {
            assert!(check_downward_inclusion(&aut, &aut, pre).unwrap().holds);
        }
    }

    #[test]
    fn test_same_language_different_shape() {
        let a = single_b();
        let b = split_leaves();
        for pre in [Preorder::Identity, Preorder::Simulation] {
            assert!(check_downward_inclusion(&a, &b, pre).unwrap().holds);
            assert!(check_downward_inclusion(&b, &a, pre).unwrap().holds);
        }
    }

    #[test]
    fn test_universal_strictly_bigger() {
        let a = single_b();
        let b = universal();
        for pre in [Preorder::Identity, Preorder::Simulation] {
            assert!(check_downward_inclusion(&a, &b, pre).unwrap().holds);
            assert!(!check_downward_inclusion(&b, &a, pre).unwrap().holds);
        }
    }

    #[test]
    fn test_choice_function_split_is_needed() {
        // bigger accepts b(a, c) and b(c, a) through two transitions whose
        // tuples only jointly cover b(x, x) where x ∈ {a, c}; neither tuple
        // alone covers the smaller transition, so the choice-function pass
        // must answer it — and inclusion indeed fails on b(a, a)
        let mut small = TreeAut::new();
        let x = small.add_state();
        let f = small.add_state();
        small.add_transition(A, vec![], x).unwrap();
        small.add_transition(2, vec![], x).unwrap();
        small.add_transition(B, vec![x, x], f).unwrap();
        small.add_final(f).unwrap();

        let mut big = TreeAut::new();
        let pa = big.add_state();
        let pc = big.add_state();
        let pf = big.add_state();
        big.add_transition(A, vec![], pa).unwrap();
        big.add_transition(2, vec![], pc).unwrap();
        big.add_transition(B, vec![pa, pc], pf).unwrap();
        big.add_transition(B, vec![pc, pa], pf).unwrap();
        big.add_final(pf).unwrap();

        for pre in [Preorder::Identity, Preorder::Simulation] {
            assert!(!check_downward_inclusion(&small, &big, pre).unwrap().holds);
            assert!(check_downward_inclusion(&big, &small, pre).unwrap().holds);
        }
    }

    #[test]
    fn test_empty_sides() {
        let empty = TreeAut::new();
        let b = single_b();
        for pre in [Preorder::Identity, Preorder::Simulation] {
            assert!(check_downward_inclusion(&empty, &b, pre).unwrap().holds);
            assert!(!check_downward_inclusion(&b, &empty, pre).unwrap().holds);
            assert!(check_downward_inclusion(&empty, &empty, pre).unwrap().holds);
        }
    }

    #[test]
    fn test_no_finals_accepts_nothing() {
        let mut a = single_b();
        a.remove_state(1);
        let b = single_b();
        assert!(check_downward_inclusion(&a, &b, Preorder::Identity)
            .unwrap()
            .holds);
    }
}
