//! Finite tree automata over ranked alphabets: construction, boolean
//! combinators, and antichain-based language inclusion checking.
//!
//! The heart of the crate is [`inclusion`], which decides `L(A) ⊆ L(B)` for
//! explicit tree automata with either a bottom-up (upward) or a top-down
//! (downward) antichain search, both optionally pruned by the maximum
//! simulation preorder computed by the partition-refinement engine in [`sim`].

// configure clippy
#![allow(clippy::needless_return)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::new_without_default)]
#![deny(clippy::uninlined_format_args)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod antichain;
pub mod automaton;
pub mod cache;
pub mod inclusion;
pub mod lts;
pub mod ops;
pub mod relation;
pub mod sim;
pub mod timbuk;
