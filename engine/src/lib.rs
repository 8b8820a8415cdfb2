//! The exclusion-logic engine: an arena-backed trie with permissive and
//! exclusive edges, a depth-first unifier producing binding slices, and a
//! runtime that dispatches facts, rules and node pipelines over a stack of
//! binding frames.

pub mod query;
pub mod runtime;
pub mod select;
pub mod trie;

pub use runtime::ELRuntime;
pub use select::{FirstSelector, Selector, UniformSelector};
pub use trie::{ELTrie, ELTrieNode, NodeValue, TrieMetrics, chain_to_fact};
