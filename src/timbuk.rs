//! The Timbuk textual automaton format.
//!
//! ```text
//! Ops a:0 b:2
//! Automaton example
//! States q0 q1
//! Final States q1
//! Transitions
//! a -> q0
//! b(q0, q0) -> q1
//! ```
//!
//! Whitespace is free-form. States are introduced on first use; symbols not
//! declared under `Ops` are introduced with the arity of their first use.
//! Arity annotations on state declarations (`q0:0`) are tolerated and
//! ignored.

use crate::automaton::{AutError, State, Symbol, TreeAut};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use itertools::Itertools;
use peg::{error::ParseError, str::LineCol};
use std::collections::HashMap;
use std::fmt::Write;
use thiserror::Error;

/// The parsed form of one automaton, before dictionary translation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutDescription {
    /// The name after `Automaton`.
    pub name: String,
    /// Declared symbols with their arities.
    pub ops: Vec<(String, usize)>,
    /// Declared states.
    pub states: Vec<String>,
    /// Declared final states.
    pub finals: Vec<String>,
    /// Transitions as `(symbol, children, parent)` names.
    pub transitions: Vec<(String, Vec<String>, String)>,
}

peg::parser! {
grammar timbuk() for str {
    rule ws() = quiet!{[' ' | '\t' | '\r' | '\n']}
    rule _ = ws()*
    rule wb() = ws() / ![_]

    rule ident() -> String
    = s:$(quiet!{[^ ' ' | '\t' | '\r' | '\n' | '(' | ')' | ',' | ':' | '-' | '>']+} / expected!("identifier"))
    { s.to_string() }

    rule number() -> usize
    = n:$(['0'..='9']+) {? n.parse().or(Err("arity")) }

    rule op() -> (String, usize)
    = name:ident() _ ":" _ arity:number() { (name, arity) }

    rule state_decl() -> String
    = name:ident() (_ ":" _ number())? { name }

    rule tuple() -> Vec<String>
    = "(" _ args:(ident() ** (_ "," _)) _ ")" { args }

    rule transition() -> (String, Vec<String>, String)
    = symbol:ident() _ children:tuple()? _ "->" _ parent:ident()
    { (symbol, children.unwrap_or_default(), parent) }

    pub rule automaton() -> AutDescription
    = _ "Ops" ops:(_ !("Automaton" wb()) o:op() { o })*
      _ "Automaton" _ name:ident()
      _ "States" states:(_ !("Final" _ "States" wb()) s:state_decl() { s })*
      _ "Final" _ "States" finals:(_ !("Transitions" wb()) s:state_decl() { s })*
      _ "Transitions" transitions:(_ t:transition() { t })* _ ![_]
    { AutDescription { name, ops, states, finals, transitions } }
}
}

/// Parse a Timbuk automaton description.
pub fn parse(input: &str) -> Result<AutDescription, ParseError<LineCol>> {
    timbuk::automaton(input)
}

/// Render a parse error as a codespan diagnostic.
pub fn parse_error_diagnostic<FileId>(
    file_id: FileId,
    e: &ParseError<LineCol>,
) -> Diagnostic<FileId> {
    Diagnostic::error()
        .with_message("could not parse automaton")
        .with_labels(vec![Label::primary(
            file_id,
            e.location.offset..e.location.offset + 1,
        )
        .with_message(format!("expected {}", e.expected))])
}

/// An error raised while translating a description into an automaton.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A symbol was used or declared with two different arities.
    #[error("symbol {name} has arity {arity}, previously {prior}")]
    ArityConflict {
        /// The symbol's name.
        name: String,
        /// The conflicting arity.
        arity: usize,
        /// The arity recorded first.
        prior: usize,
    },
    /// The automaton rejected a translated transition.
    #[error(transparent)]
    Aut(#[from] AutError),
}

/// The symbol dictionary, shared across the automata of one session so that
/// binary operations see one symbol space.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    arities: Vec<usize>,
    by_name: HashMap<String, Symbol>,
}

impl SymbolTable {
    /// An empty table.
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Declare a symbol, or re-declare it with the same arity.
    pub fn declare(&mut self, name: &str, arity: usize) -> Result<Symbol, BuildError> {
        if let Some(&sym) = self.by_name.get(name) {
            if self.arities[sym] != arity {
                return Err(BuildError::ArityConflict {
                    name: name.to_string(),
                    arity,
                    prior: self.arities[sym],
                });
            }
            return Ok(sym);
        }
        let sym = self.names.len();
        self.names.push(name.to_string());
        self.arities.push(arity);
        self.by_name.insert(name.to_string(), sym);
        Ok(sym)
    }

    /// Look a symbol up by name.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        self.by_name.get(name).copied()
    }

    /// The name of a symbol.
    pub fn name(&self, sym: Symbol) -> &str {
        &self.names[sym]
    }

    /// The arity of a symbol.
    pub fn arity(&self, sym: Symbol) -> usize {
        self.arities[sym]
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The state dictionary of one automaton.
#[derive(Clone, Debug, Default)]
pub struct StateTable {
    names: Vec<String>,
    by_name: HashMap<String, State>,
}

impl StateTable {
    /// An empty table.
    pub fn new() -> StateTable {
        StateTable::default()
    }

    /// Look a state up by name.
    pub fn resolve(&self, name: &str) -> Option<State> {
        self.by_name.get(name).copied()
    }

    /// The name of a state.
    pub fn name(&self, state: State) -> &str {
        &self.names[state]
    }

    /// Record the name of the next state; names must arrive in state order.
    pub fn push(&mut self, name: String) -> State {
        let state = self.names.len();
        self.by_name.insert(name.clone(), state);
        self.names.push(name);
        state
    }

    /// Record a name for the next state, uniquified with a numeric suffix if
    /// it is already taken.
    pub fn push_fresh(&mut self, base: String) -> State {
        if !self.by_name.contains_key(&base) {
            return self.push(base);
        }
        let mut k = 1;
        loop {
            let candidate = format!("{base}~{k}");
            if !self.by_name.contains_key(&candidate) {
                return self.push(candidate);
            }
            k += 1;
        }
    }

    /// Number of named states.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Translate a description into an automaton, interning symbols into the
/// shared table and states into a fresh per-automaton table.
pub fn build(
    desc: &AutDescription,
    symbols: &mut SymbolTable,
) -> Result<(TreeAut, StateTable), BuildError> {
    let mut aut = TreeAut::new();
    let mut states = StateTable::new();
    for (name, arity) in &desc.ops {
        symbols.declare(name, *arity)?;
    }
    let intern = |states: &mut StateTable, aut: &mut TreeAut, name: &str| -> State {
        match states.resolve(name) {
            Some(state) => state,
            None => {
                let state = aut.add_state();
                let named = states.push(name.to_string());
                debug_assert_eq!(state, named);
                state
            }
        }
    };
    for name in &desc.states {
        intern(&mut states, &mut aut, name);
    }
    for name in &desc.finals {
        let state = intern(&mut states, &mut aut, name);
        aut.add_final(state)?;
    }
    for (symbol, children, parent) in &desc.transitions {
        let sym = match symbols.resolve(symbol) {
            Some(sym) => {
                if symbols.arity(sym) != children.len() {
                    return Err(BuildError::ArityConflict {
                        name: symbol.clone(),
                        arity: children.len(),
                        prior: symbols.arity(sym),
                    });
                }
                sym
            }
            None => symbols.declare(symbol, children.len())?,
        };
        let children: Vec<State> = children
            .iter()
            .map(|c| intern(&mut states, &mut aut, c))
            .collect();
        let parent = intern(&mut states, &mut aut, parent);
        aut.add_transition(sym, children, parent)?;
    }
    Ok((aut, states))
}

/// Render an automaton back into the Timbuk format.
pub fn serialize(aut: &TreeAut, symbols: &SymbolTable, states: &StateTable, name: &str) -> String {
    let mut out = String::new();
    let ops = aut
        .symbols()
        .iter()
        .map(|&sym| format!("{}:{}", symbols.name(sym), symbols.arity(sym)))
        .join(" ");
    let _ = writeln!(out, "Ops {ops}");
    let _ = writeln!(out, "Automaton {name}");
    let all = (0..aut.num_states()).map(|s| states.name(s)).join(" ");
    let _ = writeln!(out, "States {all}");
    let finals = aut
        .finals_sorted()
        .iter()
        .map(|&s| states.name(s))
        .join(" ");
    let _ = writeln!(out, "Final States {finals}");
    let _ = writeln!(out, "Transitions");
    for tr in aut.transitions() {
        if tr.children.is_empty() {
            let _ = writeln!(out, "{} -> {}", symbols.name(tr.symbol), states.name(tr.parent));
        } else {
            let _ = writeln!(
                out,
                "{}({}) -> {}",
                symbols.name(tr.symbol),
                tr.children.iter().map(|&c| states.name(c)).join(", "),
                states.name(tr.parent)
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "Ops           a:0 b:2\n\
                           Automaton     aut\n\
                           States        q0 q1 q2\n\
                           Final States  q1 q2\n\
                           Transitions\n\
                           a          -> q0\n\
                           b(q0, q0)  -> q1\n\
                           b(q1, q0)  -> q2\n";

    #[test]
    fn test_parse_example() {
        let desc = parse(EXAMPLE).unwrap();
        assert_eq!(desc.name, "aut");
        assert_eq!(desc.ops, vec![("a".to_string(), 0), ("b".to_string(), 2)]);
        assert_eq!(desc.states, vec!["q0", "q1", "q2"]);
        assert_eq!(desc.finals, vec!["q1", "q2"]);
        assert_eq!(desc.transitions.len(), 3);
        assert_eq!(
            desc.transitions[1],
            (
                "b".to_string(),
                vec!["q0".to_string(), "q0".to_string()],
                "q1".to_string()
            )
        );
    }

    #[test]
    fn test_whitespace_is_free_form() {
        let squeezed = "Ops a:0 b:2 Automaton x States q0 Final States q0 \
                        Transitions a->q0 b(q0,q0)->q0";
        let desc = parse(squeezed).unwrap();
        assert_eq!(desc.states, vec!["q0"]);
        assert_eq!(desc.transitions.len(), 2);
    }

    #[test]
    fn test_state_arity_annotations_tolerated() {
        let input = "Ops a:0 Automaton x States q0:0 q1:0 Final States q1:0 \
                     Transitions a -> q0";
        let desc = parse(input).unwrap();
        assert_eq!(desc.states, vec!["q0", "q1"]);
        assert_eq!(desc.finals, vec!["q1"]);
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(parse("Ops a:0\nAutomaton\n").is_err());
        assert!(parse("").is_err());
        assert!(parse("Ops a:0 Automaton x States q0 Final States q0 \
                       Transitions a -> q0 garbage(")
        .is_err());
    }

    #[test]
    fn test_build_and_serialize_round_trip() {
        let mut symbols = SymbolTable::new();
        let desc = parse(EXAMPLE).unwrap();
        let (aut, states) = build(&desc, &mut symbols).unwrap();
        assert_eq!(aut.num_states(), 3);
        assert_eq!(aut.transitions().len(), 3);
        assert!(aut.is_final(1) && aut.is_final(2));
        let text = serialize(&aut, &symbols, &states, "aut");
        let reparsed = parse(&text).unwrap();
        let (again, _) = build(&reparsed, &mut symbols).unwrap();
        assert_eq!(again.num_states(), aut.num_states());
        assert_eq!(again.transitions(), aut.transitions());
        assert_eq!(again.finals_sorted(), aut.finals_sorted());
    }

    #[test]
    fn test_states_introduced_on_first_use() {
        let input = "Ops a:0 b:2 Automaton x States Final States \
                     Transitions a -> q0 b(q0, q0) -> q1";
        let mut symbols = SymbolTable::new();
        let (aut, states) = build(&parse(input).unwrap(), &mut symbols).unwrap();
        assert_eq!(aut.num_states(), 2);
        assert_eq!(states.resolve("q1"), Some(1));
    }

    #[test]
    fn test_undeclared_symbol_infers_arity() {
        let input = "Ops a:0 Automaton x States q0 Final States q0 \
                     Transitions a -> q0 g(q0) -> q0";
        let mut symbols = SymbolTable::new();
        let (aut, _) = build(&parse(input).unwrap(), &mut symbols).unwrap();
        let g = symbols.resolve("g").unwrap();
        assert_eq!(symbols.arity(g), 1);
        assert_eq!(aut.arity(g), Some(1));
    }

    #[test]
    fn test_arity_conflict_is_an_error() {
        let input = "Ops a:0 b:2 Automaton x States q0 Final States q0 \
                     Transitions a -> q0 b(q0) -> q0";
        let mut symbols = SymbolTable::new();
        let err = build(&parse(input).unwrap(), &mut symbols).unwrap_err();
        assert!(matches!(err, BuildError::ArityConflict { .. }));
    }

    #[test]
    fn test_shared_symbol_table_across_files() {
        let mut symbols = SymbolTable::new();
        let (a, _) = build(&parse(EXAMPLE).unwrap(), &mut symbols).unwrap();
        let other = "Ops b:2 a:0 Automaton y States r Final States r \
                     Transitions a -> r";
        let (b, _) = build(&parse(other).unwrap(), &mut symbols).unwrap();
        // `a` and `b` resolve to the same ids in both automata
        assert_eq!(a.arity(symbols.resolve("a").unwrap()), Some(0));
        assert_eq!(b.arity(symbols.resolve("a").unwrap()), Some(0));
        assert_eq!(symbols.len(), 2);
    }

    #[test]
    fn test_push_fresh_uniquifies() {
        let mut states = StateTable::new();
        assert_eq!(states.push_fresh("q".to_string()), 0);
        assert_eq!(states.push_fresh("q".to_string()), 1);
        assert_eq!(states.name(1), "q~1");
    }
}
