//! Language inclusion between tree automata.
//!
//! Both entry points renumber the operands into one disjoint state space,
//! build the chosen preorder over that space, and hand the translated
//! automata to the corresponding antichain checker. The verdicts of the two
//! checkers agree with set-theoretic language inclusion for any supported
//! preorder choice.

mod downward;
mod upward;

use crate::automaton::{AutError, State, TreeAut};
use crate::ops;
use crate::relation::BinaryRelation;
use crate::sim;

/// The verdict of an inclusion check: the boolean answer plus a
/// human-readable description (the refutation reason, when refuted).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inclusion {
    /// Whether `L(smaller) ⊆ L(bigger)`.
    pub holds: bool,
    /// Why, in words.
    pub description: String,
}

impl Inclusion {
    fn proved() -> Inclusion {
        Inclusion {
            holds: true,
            description: "inclusion holds".to_string(),
        }
    }

    fn refuted(reason: &str) -> Inclusion {
        Inclusion {
            holds: false,
            description: reason.to_string(),
        }
    }
}

/// Which preorder the checkers prune with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Preorder {
    /// The identity relation; no pruning beyond plain antichains.
    Identity,
    /// The simulation preorder matching the checker's traversal direction,
    /// computed on the united automata by the partition-refinement engine:
    /// upward simulation for the upward checker (whose pairs stand for tree
    /// contexts), downward simulation for the downward checker (whose pairs
    /// stand for trees).
    Simulation,
}

/// Rebuild `aut` inside a state space of `total` states, through `map`.
fn renumber(aut: &TreeAut, map: &[State], total: usize) -> Result<TreeAut, AutError> {
    let mut out = TreeAut::new();
    for _ in 0..total {
        out.add_state();
    }
    for tr in aut.transitions() {
        let children = tr.children.iter().map(|&c| map[c]).collect();
        out.add_transition(tr.symbol, children, map[tr.parent])?;
    }
    for f in aut.finals() {
        out.add_final(map[f])?;
    }
    Ok(out)
}

/// Decide `L(smaller) ⊆ L(bigger)` by the bottom-up antichain fixpoint over
/// macro-states of `bigger`.
pub fn check_upward_inclusion(
    smaller: &TreeAut,
    bigger: &TreeAut,
    preorder: Preorder,
) -> Result<Inclusion, AutError> {
    let (united, map1, map2) = ops::union(smaller, bigger)?;
    let total = united.num_states();
    let s = renumber(smaller, &map1, total)?;
    let b = renumber(bigger, &map2, total)?;
    let relation = match preorder {
        Preorder::Identity => BinaryRelation::identity(total),
        Preorder::Simulation => sim::upward_simulation(&united),
    };
    let ind = relation.index();
    let inv = relation.inverted_index();
    let verdict = upward::check(&s, &b, &ind, &inv);
    log::debug!("upward inclusion: {}", verdict.description);
    Ok(verdict)
}

/// Decide `L(smaller) ⊆ L(bigger)` by the top-down workset search on
/// `(state, state set)` pairs.
///
/// The core search assumes automata without useless states, so both
/// operands are trimmed first; trimming preserves their languages.
pub fn check_downward_inclusion(
    smaller: &TreeAut,
    bigger: &TreeAut,
    preorder: Preorder,
) -> Result<Inclusion, AutError> {
    let (smaller, _) = ops::trim(smaller)?;
    let (bigger, _) = ops::trim(bigger)?;
    let (united, map1, map2) = ops::union(&smaller, &bigger)?;
    let total = united.num_states();
    let s = renumber(&smaller, &map1, total)?;
    let b = renumber(&bigger, &map2, total)?;
    let relation = match preorder {
        Preorder::Identity => BinaryRelation::identity(total),
        Preorder::Simulation => sim::downward_simulation(&united),
    };
    let ind = relation.index();
    let inv = relation.inverted_index();
    let verdict = downward::check(&s, &b, &relation, &ind, &inv);
    log::debug!("downward inclusion: {}", verdict.description);
    Ok(verdict)
}
