//! Binary combinators on tree automata: disjoint union, product
//! intersection, and useless-state trimming.

use crate::automaton::{AutError, State, TreeAut};
use fxhash::FxHashMap;
use std::collections::VecDeque;

/// Disjoint union of two automata.
///
/// Returns the union together with the state translation maps of both
/// operands, so callers can relate original states to union states.
pub fn union(a: &TreeAut, b: &TreeAut) -> Result<(TreeAut, Vec<State>, Vec<State>), AutError> {
    let mut out = TreeAut::new();
    let map1: Vec<State> = (0..a.num_states()).map(|_| out.add_state()).collect();
    let map2: Vec<State> = (0..b.num_states()).map(|_| out.add_state()).collect();
    for (aut, map) in [(a, &map1), (b, &map2)] {
        for tr in aut.transitions() {
            let children = tr.children.iter().map(|&c| map[c]).collect();
            out.add_transition(tr.symbol, children, map[tr.parent])?;
        }
        for f in aut.finals() {
            out.add_final(map[f])?;
        }
    }
    Ok((out, map1, map2))
}

/// Product intersection of two automata.
///
/// A worklist over reachable state pairs, seeded with every pair of final
/// states; one product state is minted per encountered pair and transitions
/// are those obtainable by matching symbols top-down. Returns the product
/// together with the pair translation map.
pub fn intersection(
    a: &TreeAut,
    b: &TreeAut,
) -> Result<(TreeAut, FxHashMap<(State, State), State>), AutError> {
    let mut out = TreeAut::new();
    let mut pairs: FxHashMap<(State, State), State> = FxHashMap::default();
    let mut workset: VecDeque<(State, (State, State))> = VecDeque::new();

    for f1 in a.finals_sorted() {
        for f2 in b.finals_sorted() {
            let fresh = out.add_state();
            out.add_final(fresh)?;
            pairs.insert((f1, f2), fresh);
            workset.push_back((fresh, (f1, f2)));
        }
    }

    let a_idx = a.indexes();
    let b_idx = b.indexes();
    while let Some((product, (s, t))) = workset.pop_front() {
        for sym in a_idx.down_symbols(s) {
            for &ta in a_idx.down_list(s, sym) {
                for &tb in b_idx.down_list(t, sym) {
                    let ca = &a.transitions()[ta].children;
                    let cb = &b.transitions()[tb].children;
                    debug_assert_eq!(ca.len(), cb.len());
                    let children: Vec<State> = ca
                        .iter()
                        .zip(cb.iter())
                        .map(|(&x, &y)| {
                            *pairs.entry((x, y)).or_insert_with(|| {
                                let fresh = out.add_state();
                                workset.push_back((fresh, (x, y)));
                                fresh
                            })
                        })
                        .collect();
                    out.add_transition(sym, children, product)?;
                }
            }
        }
    }
    Ok((out, pairs))
}

/// Remove useless states: keep exactly the states that are bottom-up
/// reachable and participate in some accepting run, renumbering densely.
///
/// Returns the trimmed automaton and the old-to-new state map. The language
/// is preserved.
pub fn trim(aut: &TreeAut) -> Result<(TreeAut, Vec<Option<State>>), AutError> {
    let n = aut.num_states();

    // bottom-up reachable: a state some tree evaluates to
    let mut reachable = vec![false; n];
    loop {
        let mut changed = false;
        for tr in aut.transitions() {
            if !reachable[tr.parent] && tr.children.iter().all(|&c| reachable[c]) {
                reachable[tr.parent] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // productive: reachable from a reachable final state, through
    // transitions whose children are all reachable
    let mut useful = vec![false; n];
    let mut stack: Vec<State> = aut.finals().filter(|&f| reachable[f]).collect();
    stack.sort_unstable();
    for &f in &stack {
        useful[f] = true;
    }
    let idx = aut.indexes();
    while let Some(s) = stack.pop() {
        for sym in idx.down_symbols(s) {
            for &tid in idx.down_list(s, sym) {
                let tr = &aut.transitions()[tid];
                if tr.children.iter().all(|&c| reachable[c]) {
                    for &c in &tr.children {
                        if !useful[c] {
                            useful[c] = true;
                            stack.push(c);
                        }
                    }
                }
            }
        }
    }

    let mut map: Vec<Option<State>> = vec![None; n];
    let mut out = TreeAut::new();
    for s in 0..n {
        if reachable[s] && useful[s] {
            map[s] = Some(out.add_state());
        }
    }
    for tr in aut.transitions() {
        if let Some(parent) = map[tr.parent] {
            if let Some(children) = tr
                .children
                .iter()
                .map(|&c| map[c])
                .collect::<Option<Vec<State>>>()
            {
                out.add_transition(tr.symbol, children, parent)?;
            }
        }
    }
    for f in aut.finals() {
        if let Some(nf) = map[f] {
            out.add_final(nf)?;
        }
    }
    Ok((out, map))
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: usize = 0;
    const B: usize = 1;

    // a -> q0, b(q0, q0) -> q1, final q1; accepts exactly b(a, a)
    fn single_b() -> TreeAut {
        let mut aut = TreeAut::new();
        let q0 = aut.add_state();
        let q1 = aut.add_state();
        aut.add_transition(A, vec![], q0).unwrap();
        aut.add_transition(B, vec![q0, q0], q1).unwrap();
        aut.add_final(q1).unwrap();
        aut
    }

    #[test]
    fn test_union_translates_disjointly() {
        let x = single_b();
        let y = single_b();
        let (u, m1, m2) = union(&x, &y).unwrap();
        assert_eq!(u.num_states(), 4);
        assert_eq!(m1, vec![0, 1]);
        assert_eq!(m2, vec![2, 3]);
        assert_eq!(u.transitions().len(), 4);
        assert!(u.is_final(m1[1]) && u.is_final(m2[1]));
    }

    #[test]
    fn test_intersection_of_equal_automata() {
        let x = single_b();
        let y = single_b();
        let (prod, pairs) = intersection(&x, &y).unwrap();
        // one final pair (q1, q1), one leaf pair (q0, q0)
        assert_eq!(prod.num_states(), 2);
        assert_eq!(prod.finals_sorted().len(), 1);
        assert!(pairs.contains_key(&(1, 1)) && pairs.contains_key(&(0, 0)));
        assert_eq!(prod.transitions().len(), 2);
    }

    #[test]
    fn test_intersection_empty_when_no_finals() {
        let x = single_b();
        let mut y = single_b();
        y.remove_state(1);
        let (prod, _) = intersection(&x, &y).unwrap();
        assert_eq!(prod.num_states(), 0);
        assert!(prod.transitions().is_empty());
    }

    #[test]
    fn test_trim_drops_unreachable_and_unproductive() {
        let mut aut = single_b();
        // q2 is bottom-up unreachable (no leaf under it), q3 is reachable
        // but never used by an accepting run
        let q2 = aut.add_state();
        aut.add_transition(B, vec![q2, q2], q2).unwrap();
        let q3 = aut.add_state();
        aut.add_transition(A, vec![], q3).unwrap();
        let (trimmed, map) = trim(&aut).unwrap();
        assert_eq!(trimmed.num_states(), 2);
        assert!(map[0].is_some() && map[1].is_some());
        assert!(map[q2].is_none() && map[q3].is_none());
        assert_eq!(trimmed.transitions().len(), 2);
        assert_eq!(trimmed.finals_sorted().len(), 1);
    }

    #[test]
    fn test_trim_no_finals_is_empty() {
        let mut aut = single_b();
        aut.remove_state(1);
        let (trimmed, _) = trim(&aut).unwrap();
        assert_eq!(trimmed.num_states(), 0);
    }
}
