//! Budget-constrained selection over the ranked definitions.
//!
//! The selector always takes a prefix of the ranked order. Because rendered
//! cost grows with the number of selected tags, the largest prefix that
//! fits can be found by binary search, costing O(log N) render evaluations
//! instead of one per candidate size.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::MapConfig;
use crate::rendering::MapRenderer;
use crate::types::{ScoredTag, SourceFile};

/// Map cost in abstract units. The default approximates LLM tokens from
/// byte length.
pub type UnitCostFn = dyn Fn(&str) -> usize + Send + Sync;

pub fn default_unit_cost(rendered: &str) -> usize {
    rendered.len() / 4
}

/// The chosen prefix plus its rendering, so callers never pay for a second
/// render pass.
#[derive(Debug, Clone)]
pub struct MapSelection {
    pub tags: Vec<ScoredTag>,
    pub rendered: String,
    pub cost: usize,
}

impl MapSelection {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

pub struct BudgetSelector<'a> {
    renderer: MapRenderer<'a>,
    cost_fn: &'a UnitCostFn,
}

impl<'a> BudgetSelector<'a> {
    pub fn new(files: &'a BTreeMap<Arc<str>, SourceFile>, config: &MapConfig) -> Self {
        Self {
            renderer: MapRenderer::new(files, config),
            cost_fn: &default_unit_cost,
        }
    }

    pub fn with_cost_fn(mut self, cost_fn: &'a UnitCostFn) -> Self {
        self.cost_fn = cost_fn;
        self
    }

    /// Pick the largest ranked prefix whose rendering fits `budget`.
    ///
    /// `ranked` must already be in descending score order. An empty
    /// selection is a legal outcome, not an error.
    pub fn select(&self, ranked: &[ScoredTag], budget: usize) -> MapSelection {
        let mut lo = 0usize;
        let mut hi = ranked.len();
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            let rendered = self.renderer.render(&ranked[..mid]);
            if (self.cost_fn)(&rendered) <= budget {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        let rendered = self.renderer.render(&ranked[..lo]);
        let cost = (self.cost_fn)(&rendered);
        MapSelection {
            tags: ranked[..lo].to_vec(),
            rendered,
            cost,
        }
    }
}
