//! Explicit tree automata over ranked alphabets.
//!
//! States and symbols are dense integers; a symbol's arity is fixed by its
//! first use. The automaton keeps its transitions in insertion order and
//! derives three indexed views on demand: nullary transitions by symbol, all
//! transitions by `(symbol, child slot, child state)`, and child tuples by
//! `(parent state, symbol)`. Any mutation drops the cached views.

use fxhash::{FxHashMap, FxHashSet};
use std::cell::OnceCell;
use thiserror::Error;

/// A state of a tree automaton, dense within one automaton.
pub type State = usize;

/// A ranked-alphabet symbol. The arity is a property of the automaton, fixed
/// by the symbol's first use in a transition.
pub type Symbol = usize;

/// A single transition `symbol(children…) -> parent`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    /// The symbol read at this node.
    pub symbol: Symbol,
    /// Child states, one per symbol arity slot; empty for leaves.
    pub children: Vec<State>,
    /// The state produced at the parent.
    pub parent: State,
}

/// Errors raised by automaton construction.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum AutError {
    /// The same symbol was used with two different arities.
    #[error("symbol {symbol} used with arity {found}, previously with arity {expected}")]
    ArityMismatch {
        /// The offending symbol.
        symbol: Symbol,
        /// Arity recorded at the symbol's first use.
        expected: usize,
        /// Arity of the rejected transition.
        found: usize,
    },
    /// A transition or final-state marking referenced a state that was never
    /// added.
    #[error("state {state} out of domain (automaton has {domain} states)")]
    StateOutOfDomain {
        /// The offending state.
        state: State,
        /// Current number of states.
        domain: usize,
    },
}

/// The derived transition indexes of one automaton.
#[derive(Clone, Debug)]
pub struct Indexes {
    /// `leaves[symbol]` lists nullary transitions of that symbol.
    pub(crate) leaves: Vec<Vec<usize>>,
    /// `up[symbol][slot][child]` lists transitions with `child` at `slot`.
    pub(crate) up: Vec<Vec<Vec<Vec<usize>>>>,
    /// `down[parent][symbol]` lists transitions from `parent` under `symbol`.
    pub(crate) down: Vec<FxHashMap<Symbol, Vec<usize>>>,
}

impl Indexes {
    fn build(aut: &TreeAut) -> Indexes {
        let n_sym = aut.alphabet_size();
        let n = aut.num_states();
        let mut leaves = vec![Vec::new(); n_sym];
        let mut up: Vec<Vec<Vec<Vec<usize>>>> = (0..n_sym)
            .map(|sym| vec![vec![Vec::new(); n]; aut.arity(sym).unwrap_or(0)])
            .collect();
        let mut down: Vec<FxHashMap<Symbol, Vec<usize>>> = vec![FxHashMap::default(); n];
        for (tid, tr) in aut.transitions.iter().enumerate() {
            if tr.children.is_empty() {
                leaves[tr.symbol].push(tid);
            }
            for (slot, &child) in tr.children.iter().enumerate() {
                up[tr.symbol][slot][child].push(tid);
            }
            down[tr.parent].entry(tr.symbol).or_default().push(tid);
        }
        Indexes { leaves, up, down }
    }

    /// Nullary transitions of `symbol`, or nothing for out-of-range symbols.
    pub fn leaves_list(&self, symbol: Symbol) -> &[usize] {
        self.leaves.get(symbol).map_or(&[], |list| list.as_slice())
    }

    /// Number of child slots indexed for `symbol`.
    pub fn up_arity(&self, symbol: Symbol) -> usize {
        self.up.get(symbol).map_or(0, |slots| slots.len())
    }

    /// Transitions of `symbol` with `child` at `slot`.
    pub fn up_list(&self, symbol: Symbol, slot: usize, child: State) -> &[usize] {
        self.up
            .get(symbol)
            .and_then(|slots| slots.get(slot))
            .and_then(|by_child| by_child.get(child))
            .map_or(&[], |list| list.as_slice())
    }

    /// Transitions from `parent` under `symbol`.
    pub fn down_list(&self, parent: State, symbol: Symbol) -> &[usize] {
        self.down
            .get(parent)
            .and_then(|by_sym| by_sym.get(&symbol))
            .map_or(&[], |list| list.as_slice())
    }

    /// The symbols with a transition from `parent`, sorted.
    pub fn down_symbols(&self, parent: State) -> Vec<Symbol> {
        let mut syms: Vec<Symbol> = self
            .down
            .get(parent)
            .map_or_else(Vec::new, |by_sym| by_sym.keys().copied().collect());
        syms.sort_unstable();
        syms
    }

    /// Number of symbols the indexes are sized for.
    pub fn alphabet_size(&self) -> usize {
        self.up.len()
    }
}

/// An explicit tree automaton: a state domain, final states, and a
/// deduplicated transition set.
#[derive(Debug)]
pub struct TreeAut {
    num_states: usize,
    finals: FxHashSet<State>,
    transitions: Vec<Transition>,
    seen: FxHashSet<Transition>,
    arities: FxHashMap<Symbol, usize>,
    indexes: OnceCell<Indexes>,
}

impl Clone for TreeAut {
    fn clone(&self) -> TreeAut {
        TreeAut {
            num_states: self.num_states,
            finals: self.finals.clone(),
            transitions: self.transitions.clone(),
            seen: self.seen.clone(),
            arities: self.arities.clone(),
            indexes: OnceCell::new(),
        }
    }
}

impl TreeAut {
    /// An automaton with no states and no transitions.
    pub fn new() -> TreeAut {
        TreeAut {
            num_states: 0,
            finals: FxHashSet::default(),
            transitions: Vec::new(),
            seen: FxHashSet::default(),
            arities: FxHashMap::default(),
            indexes: OnceCell::new(),
        }
    }

    /// Mint a fresh state and return it.
    pub fn add_state(&mut self) -> State {
        self.indexes.take();
        let state = self.num_states;
        self.num_states += 1;
        state
    }

    /// Mark `state` as final.
    pub fn add_final(&mut self, state: State) -> Result<(), AutError> {
        self.check_state(state)?;
        self.finals.insert(state);
        Ok(())
    }

    /// Add the transition `symbol(children…) -> parent`. Duplicates are
    /// ignored; an arity conflicting with the symbol's previous uses or a
    /// state outside the domain is an error.
    pub fn add_transition(
        &mut self,
        symbol: Symbol,
        children: Vec<State>,
        parent: State,
    ) -> Result<(), AutError> {
        self.check_state(parent)?;
        for &child in &children {
            self.check_state(child)?;
        }
        if let Some(&expected) = self.arities.get(&symbol) {
            if expected != children.len() {
                return Err(AutError::ArityMismatch {
                    symbol,
                    expected,
                    found: children.len(),
                });
            }
        } else {
            self.arities.insert(symbol, children.len());
        }
        let tr = Transition {
            symbol,
            children,
            parent,
        };
        if self.seen.insert(tr.clone()) {
            self.indexes.take();
            self.transitions.push(tr);
        }
        Ok(())
    }

    /// Unmark `state` as final and drop every transition it occurs in. The
    /// state number itself stays allocated (the domain is never renumbered),
    /// but nothing refers to it afterwards.
    pub fn remove_state(&mut self, state: State) {
        self.indexes.take();
        self.finals.remove(&state);
        let mut kept = Vec::with_capacity(self.transitions.len());
        for tr in self.transitions.drain(..) {
            if tr.parent == state || tr.children.contains(&state) {
                self.seen.remove(&tr);
            } else {
                kept.push(tr);
            }
        }
        self.transitions = kept;
    }

    fn check_state(&self, state: State) -> Result<(), AutError> {
        if state < self.num_states {
            Ok(())
        } else {
            Err(AutError::StateOutOfDomain {
                state,
                domain: self.num_states,
            })
        }
    }

    /// Number of states in the domain.
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Whether `state` is final.
    pub fn is_final(&self, state: State) -> bool {
        self.finals.contains(&state)
    }

    /// The final states, in no particular order.
    pub fn finals(&self) -> impl Iterator<Item = State> + '_ {
        self.finals.iter().copied()
    }

    /// The final states, sorted.
    pub fn finals_sorted(&self) -> Vec<State> {
        let mut finals: Vec<State> = self.finals.iter().copied().collect();
        finals.sort_unstable();
        finals
    }

    /// The transitions, in insertion order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The arity of `symbol`, if the automaton has seen it.
    pub fn arity(&self, symbol: Symbol) -> Option<usize> {
        self.arities.get(&symbol).copied()
    }

    /// The symbols occurring in the automaton, sorted.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut syms: Vec<Symbol> = self.arities.keys().copied().collect();
        syms.sort_unstable();
        syms
    }

    /// One past the largest symbol occurring in the automaton.
    pub fn alphabet_size(&self) -> usize {
        self.arities.keys().max().map_or(0, |&sym| sym + 1)
    }

    /// The largest arity occurring in the automaton.
    pub fn max_rank(&self) -> usize {
        self.arities.values().copied().max().unwrap_or(0)
    }

    /// The derived indexes, rebuilt if a mutation happened since the last
    /// call.
    pub fn indexes(&self) -> &Indexes {
        self.indexes.get_or_init(|| Indexes::build(self))
    }
}
