//! Personalized PageRank over the reference graph.
//!
//! Power iteration:
//!
//!   score'(v) = (1 - d) * restart(v) + d * inflow(v)
//!
//! where inflow is weighted-edge mass plus the dangling mass spread
//! uniformly over the other nodes. The restart distribution is uniform
//! over the personalization nodes present in the graph, or over all nodes
//! when no personalization applies.

use std::collections::BTreeMap;
use std::sync::Arc;

use petgraph::visit::EdgeRef;

use crate::config::MapConfig;
use crate::graph::ReferenceGraph;
use crate::types::{ScoredTag, Tag};

use super::PersonalizationSet;

pub struct PersonalizedRanker<'a> {
    config: &'a MapConfig,
}

impl<'a> PersonalizedRanker<'a> {
    pub fn new(config: &'a MapConfig) -> Self {
        Self { config }
    }

    /// Compute file scores. The result sums to 1 over all graph nodes
    /// (empty graph gives an empty map).
    ///
    /// Hitting the iteration cap is not an error; the scores at that point
    /// are used as-is.
    pub fn rank(
        &self,
        graph: &ReferenceGraph,
        personalization: &PersonalizationSet,
    ) -> BTreeMap<Arc<str>, f64> {
        let n = graph.node_count();
        if n == 0 {
            return BTreeMap::new();
        }

        let inner = graph.inner();
        let d = self.config.damping;

        let members: Vec<usize> = personalization
            .paths()
            .iter()
            .filter_map(|p| graph.node(p))
            .map(|node| node.index())
            .collect();
        let mut restart = vec![0.0f64; n];
        if members.is_empty() {
            restart.iter_mut().for_each(|r| *r = 1.0 / n as f64);
        } else {
            let share = 1.0 / members.len() as f64;
            for &i in &members {
                restart[i] = share;
            }
        }

        let mut out_weight = vec![0.0f64; n];
        for edge in inner.edge_references() {
            out_weight[edge.source().index()] += edge.weight().weight;
        }
        let is_dangling: Vec<bool> = out_weight.iter().map(|&w| w == 0.0).collect();

        let mut scores = restart.clone();
        for iteration in 0..self.config.max_iterations {
            let mut next: Vec<f64> = restart.iter().map(|&r| (1.0 - d) * r).collect();

            let dangling_total: f64 = scores
                .iter()
                .zip(&is_dangling)
                .filter(|(_, &dangling)| dangling)
                .map(|(&s, _)| s)
                .sum();
            if n > 1 {
                for (v, slot) in next.iter_mut().enumerate() {
                    let own = if is_dangling[v] { scores[v] } else { 0.0 };
                    *slot += d * (dangling_total - own) / (n - 1) as f64;
                }
            } else {
                next[0] += d * dangling_total;
            }

            for edge in inner.edge_references() {
                let u = edge.source().index();
                next[edge.target().index()] += d * scores[u] * edge.weight().weight / out_weight[u];
            }

            let delta: f64 = next
                .iter()
                .zip(&scores)
                .map(|(a, b)| (a - b).abs())
                .sum();
            scores = next;
            if delta < self.config.tolerance {
                log::debug!("pagerank converged after {} iterations", iteration + 1);
                break;
            }
        }

        graph
            .paths()
            .enumerate()
            .map(|(i, path)| (path.clone(), scores[i]))
            .collect()
    }

    /// Split file scores across their definitions.
    ///
    /// A definition's share is its identifier's fraction of the file's
    /// incoming edge weight, divided evenly among same-named definitions.
    /// Files nothing points at spread their score uniformly instead.
    pub fn distribute(
        &self,
        graph: &ReferenceGraph,
        ranks: &BTreeMap<Arc<str>, f64>,
        tags_by_file: &BTreeMap<Arc<str>, Vec<Tag>>,
    ) -> Vec<ScoredTag> {
        let mut out = Vec::new();

        for (path, &rank) in ranks {
            let Some(tags) = tags_by_file.get(path) else {
                continue;
            };
            let defs: Vec<&Tag> = tags.iter().filter(|t| t.is_def()).collect();
            if defs.is_empty() {
                continue;
            }

            let incoming = graph.incoming_ident_weights(path);
            let total_in: f64 = incoming.values().sum();

            if total_in > 0.0 {
                let mut group_size: BTreeMap<&Arc<str>, usize> = BTreeMap::new();
                for def in &defs {
                    *group_size.entry(&def.name).or_default() += 1;
                }
                for def in &defs {
                    let weight = incoming.get(&def.name).copied().unwrap_or(0.0);
                    let share = rank * weight / total_in / group_size[&def.name] as f64;
                    out.push(ScoredTag::new(share, (*def).clone()));
                }
            } else {
                let share = rank / defs.len() as f64;
                for def in &defs {
                    out.push(ScoredTag::new(share, (*def).clone()));
                }
            }
        }

        out.sort();
        out
    }
}
