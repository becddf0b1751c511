//! Personalized importance ranking.
//!
//! Power iteration over the reference graph with a restart distribution
//! biased toward the task at hand, then distribution of file scores down
//! to individual definitions.

mod pagerank;
mod personalize;

pub use pagerank::PersonalizedRanker;
pub use personalize::PersonalizationSet;
