//! Graph construction from per-file tag sequences.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{bail, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::config::MapConfig;
use crate::ranking::PersonalizationSet;
use crate::types::Tag;

/// Aggregated reference weight from one file to another.
///
/// `by_ident` keeps the per-identifier breakdown so that a file's score can
/// later be split across its definitions in proportion to how much each
/// identifier pulled the references in.
#[derive(Debug, Clone, Default)]
pub struct RefEdge {
    pub weight: f64,
    pub by_ident: BTreeMap<Arc<str>, f64>,
}

/// The cross-file reference graph plus the indexes needed to query it.
pub struct ReferenceGraph {
    graph: DiGraph<Arc<str>, RefEdge>,
    node_of: BTreeMap<Arc<str>, NodeIndex>,
    defines: BTreeMap<Arc<str>, BTreeSet<Arc<str>>>,
    dangling: Vec<NodeIndex>,
}

/// Build the reference graph for one corpus snapshot.
///
/// Every identifier that is defined somewhere and referenced somewhere else
/// contributes edges from each referencing file to each defining file. The
/// only error path is an internal invariant violation: a tag claiming a path
/// that is not a key of `tags_by_file`.
pub fn build_graph(
    tags_by_file: &BTreeMap<Arc<str>, Vec<Tag>>,
    personalization: &PersonalizationSet,
    config: &MapConfig,
) -> Result<ReferenceGraph> {
    for (path, tags) in tags_by_file {
        if let Some(tag) = tags.iter().find(|t| t.path != *path) {
            bail!(
                "tag for {} filed under {}: corpus index is inconsistent",
                tag.path,
                path
            );
        }
    }

    let mut graph = DiGraph::new();
    let mut node_of = BTreeMap::new();
    for (path, tags) in tags_by_file {
        if !tags.is_empty() {
            node_of.insert(path.clone(), graph.add_node(path.clone()));
        }
    }

    // ident -> defining files, ident -> (referencing file -> count)
    let mut defines: BTreeMap<Arc<str>, BTreeSet<Arc<str>>> = BTreeMap::new();
    let mut refs: BTreeMap<Arc<str>, BTreeMap<Arc<str>, usize>> = BTreeMap::new();
    for (path, tags) in tags_by_file {
        for tag in tags {
            if tag.name.len() < config.min_ident_len {
                continue;
            }
            if tag.is_def() {
                defines
                    .entry(tag.name.clone())
                    .or_default()
                    .insert(path.clone());
            } else {
                *refs
                    .entry(tag.name.clone())
                    .or_default()
                    .entry(path.clone())
                    .or_default() += 1;
            }
        }
    }

    let file_count = node_of.len();
    let noise_cutoff = config.noise_definer_fraction * file_count as f64;

    let mut edges: BTreeMap<(NodeIndex, NodeIndex), RefEdge> = BTreeMap::new();
    for (ident, definers) in &defines {
        let Some(referencers) = refs.get(ident) else {
            continue;
        };

        let mut mul = 1.0;
        if personalization.mentions(ident) {
            mul *= config.mention_boost;
        }
        // Generic names defined all over the tree carry little signal.
        if definers.len() > 1 && definers.len() as f64 > noise_cutoff {
            mul *= config.noise_damping;
        }

        for (referencer, &count) in referencers {
            let from = node_of[referencer];
            for definer in definers {
                if definer == referencer {
                    continue;
                }
                let weight = count as f64 * mul;
                let edge = edges.entry((from, node_of[definer])).or_default();
                edge.weight += weight;
                *edge.by_ident.entry(ident.clone()).or_default() += weight;
            }
        }
    }

    for ((from, to), edge) in edges {
        graph.add_edge(from, to, edge);
    }

    let dangling = graph
        .node_indices()
        .filter(|&n| graph.edges_directed(n, Direction::Outgoing).next().is_none())
        .collect();

    Ok(ReferenceGraph {
        graph,
        node_of,
        defines,
        dangling,
    })
}

impl ReferenceGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Paths in node-index order (which is ascending path order).
    pub fn paths(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.graph.node_indices().map(move |n| &self.graph[n])
    }

    pub fn node(&self, path: &str) -> Option<NodeIndex> {
        self.node_of.get(path).copied()
    }

    pub fn path_of(&self, node: NodeIndex) -> &Arc<str> {
        &self.graph[node]
    }

    pub fn dangling(&self) -> &[NodeIndex] {
        &self.dangling
    }

    pub(crate) fn inner(&self) -> &DiGraph<Arc<str>, RefEdge> {
        &self.graph
    }

    /// Identifiers defined in `path`, sorted.
    pub fn definitions_in(&self, path: &str) -> Vec<Arc<str>> {
        self.defines
            .iter()
            .filter(|(_, definers)| definers.iter().any(|d| d.as_ref() == path))
            .map(|(ident, _)| ident.clone())
            .collect()
    }

    /// Files that reference `ident`, with the total edge weight each
    /// contributes for it.
    pub fn references_to(&self, ident: &str) -> Vec<(Arc<str>, f64)> {
        let mut out: BTreeMap<Arc<str>, f64> = BTreeMap::new();
        for edge in self.graph.edge_indices() {
            let Some(&w) = self.graph[edge].by_ident.get(ident) else {
                continue;
            };
            let (from, _) = self.graph.edge_endpoints(edge).expect("edge endpoints");
            *out.entry(self.graph[from].clone()).or_default() += w;
        }
        out.into_iter().collect()
    }

    /// Files referencing `path`, with edge weights.
    pub fn incoming(&self, path: &str) -> Vec<(Arc<str>, f64)> {
        self.neighbors(path, Direction::Incoming)
    }

    /// Files `path` references, with edge weights.
    pub fn outgoing(&self, path: &str) -> Vec<(Arc<str>, f64)> {
        self.neighbors(path, Direction::Outgoing)
    }

    fn neighbors(&self, path: &str, dir: Direction) -> Vec<(Arc<str>, f64)> {
        let Some(&node) = self.node_of.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<(Arc<str>, f64)> = self
            .graph
            .edges_directed(node, dir)
            .map(|e| {
                let other = if dir == Direction::Incoming {
                    e.source()
                } else {
                    e.target()
                };
                (self.graph[other].clone(), e.weight().weight)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Per-identifier incoming weight for `path`, summed over all incoming
    /// edges. Drives the per-definition score distribution.
    pub fn incoming_ident_weights(&self, path: &str) -> BTreeMap<Arc<str>, f64> {
        let mut out: BTreeMap<Arc<str>, f64> = BTreeMap::new();
        let Some(&node) = self.node_of.get(path) else {
            return out;
        };
        for edge in self.graph.edges_directed(node, Direction::Incoming) {
            for (ident, &w) in &edge.weight().by_ident {
                *out.entry(ident.clone()).or_default() += w;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagKind;

    fn def(path: &str, name: &str, line: u32) -> Tag {
        Tag::new(path, name, TagKind::Def, line, line)
    }

    fn reference(path: &str, name: &str, line: u32) -> Tag {
        Tag::new(path, name, TagKind::Ref, line, line)
    }

    fn corpus(entries: Vec<(&str, Vec<Tag>)>) -> BTreeMap<Arc<str>, Vec<Tag>> {
        entries
            .into_iter()
            .map(|(p, tags)| (Arc::from(p), tags))
            .collect()
    }

    fn build(tags: &BTreeMap<Arc<str>, Vec<Tag>>) -> ReferenceGraph {
        build_graph(tags, &PersonalizationSet::empty(), &MapConfig::default()).unwrap()
    }

    #[test]
    fn reference_creates_weighted_edge() {
        let tags = corpus(vec![
            ("a.py", vec![def("a.py", "foo", 1)]),
            (
                "b.py",
                vec![reference("b.py", "foo", 3), reference("b.py", "foo", 9)],
            ),
        ]);
        let graph = build(&tags);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.outgoing("b.py"), vec![(Arc::from("a.py"), 2.0)]);
        assert_eq!(graph.incoming("a.py"), vec![(Arc::from("b.py"), 2.0)]);
        assert!(graph.outgoing("a.py").is_empty());
    }

    #[test]
    fn no_self_edges() {
        let tags = corpus(vec![(
            "a.py",
            vec![def("a.py", "foo", 1), reference("a.py", "foo", 5)],
        )]);
        let graph = build(&tags);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.outgoing("a.py").is_empty());
        assert_eq!(graph.dangling().len(), 1);
    }

    #[test]
    fn short_identifiers_excluded() {
        let tags = corpus(vec![
            ("a.py", vec![def("a.py", "go", 1)]),
            ("b.py", vec![reference("b.py", "go", 2), def("b.py", "anchor", 1)]),
        ]);
        let graph = build(&tags);
        assert!(graph.outgoing("b.py").is_empty());
    }

    #[test]
    fn mentioned_identifier_boosts_weight() {
        let tags = corpus(vec![
            ("a.py", vec![def("a.py", "frobnicate", 1)]),
            ("b.py", vec![reference("b.py", "frobnicate", 2)]),
        ]);
        let personalization = PersonalizationSet::with_idents(["frobnicate"]);
        let graph = build_graph(&tags, &personalization, &MapConfig::default()).unwrap();
        assert_eq!(graph.outgoing("b.py"), vec![(Arc::from("a.py"), 10.0)]);
    }

    #[test]
    fn ubiquitous_identifier_is_damped() {
        // "init" defined in 2 of 4 files (> 25%), so its weight drops to 0.1x.
        let tags = corpus(vec![
            ("a.py", vec![def("a.py", "init", 1)]),
            ("b.py", vec![def("b.py", "init", 1)]),
            ("c.py", vec![reference("c.py", "init", 2)]),
            ("d.py", vec![def("d.py", "anchor", 1)]),
        ]);
        let graph = build(&tags);
        let out = graph.outgoing("c.py");
        assert_eq!(out.len(), 2);
        assert!((out[0].1 - 0.1).abs() < 1e-12);
    }

    #[test]
    fn tagless_files_are_not_nodes() {
        let tags = corpus(vec![
            ("a.py", vec![def("a.py", "foo", 1)]),
            ("empty.py", vec![]),
        ]);
        let graph = build(&tags);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.node("empty.py").is_none());
    }

    #[test]
    fn mismatched_tag_path_is_an_error() {
        let mut tags = corpus(vec![("a.py", vec![])]);
        tags.insert(Arc::from("b.py"), vec![def("c.py", "foo", 1)]);
        let err = build_graph(&tags, &PersonalizationSet::empty(), &MapConfig::default());
        assert!(err.is_err());
    }

    #[test]
    fn query_surface_reports_defs_and_refs() {
        let tags = corpus(vec![
            ("a.py", vec![def("a.py", "foo", 1), def("a.py", "bar", 5)]),
            ("b.py", vec![reference("b.py", "foo", 3)]),
        ]);
        let graph = build(&tags);

        let defs = graph.definitions_in("a.py");
        assert_eq!(defs, vec![Arc::<str>::from("bar"), Arc::from("foo")]);
        assert_eq!(graph.references_to("foo"), vec![(Arc::from("b.py"), 1.0)]);
        assert!(graph.references_to("bar").is_empty());
    }

    #[test]
    fn per_ident_weights_accumulate() {
        let tags = corpus(vec![
            ("a.py", vec![def("a.py", "foo", 1), def("a.py", "bar", 2)]),
            (
                "b.py",
                vec![
                    reference("b.py", "foo", 3),
                    reference("b.py", "foo", 4),
                    reference("b.py", "bar", 5),
                ],
            ),
        ]);
        let graph = build(&tags);
        let weights = graph.incoming_ident_weights("a.py");
        assert_eq!(weights.get("foo"), Some(&2.0));
        assert_eq!(weights.get("bar"), Some(&1.0));
    }
}
