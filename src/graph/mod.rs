//! Cross-file reference graph.
//!
//! Nodes are files, directed edges mean "this file references identifiers
//! defined in that file". Edge weights encode reference counts adjusted for
//! task relevance and identifier noise.

mod builder;

pub use builder::{build_graph, RefEdge, ReferenceGraph};
