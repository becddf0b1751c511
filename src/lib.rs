//! repolens: ranked, budgeted repository maps.
//!
//! Given a source tree and a task, decide which small fraction of the tree
//! matters, and render it as a compact elided outline that fits a strict
//! size budget. Pipeline: discover files, extract definition/reference
//! tags, build the cross-file reference graph, run personalized PageRank,
//! then select and render the highest-value definitions.

pub mod config;
pub mod discovery;
pub mod extraction;
pub mod graph;
pub mod map;
pub mod ranking;
pub mod rendering;
pub mod select;
pub mod types;

pub use config::MapConfig;
pub use extraction::TagCache;
pub use graph::ReferenceGraph;
pub use map::RepoMapper;
pub use ranking::{PersonalizationSet, PersonalizedRanker};
pub use select::{BudgetSelector, MapSelection};
pub use types::{ScoredTag, SourceFile, Tag, TagKind};
