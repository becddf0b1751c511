//! The facade tying the pipeline together.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::config::MapConfig;
use crate::discovery::FileGroup;
use crate::extraction::{extract_file, TagCache};
use crate::graph::build_graph;
use crate::ranking::{PersonalizationSet, PersonalizedRanker};
use crate::select::{BudgetSelector, MapSelection, UnitCostFn};
use crate::types::{SourceFile, Tag};

/// Builds repository maps for one root directory.
///
/// The tag cache lives here and is shared across `build_map` calls, so
/// repeated maps over a mostly-unchanged tree only re-extract what moved.
pub struct RepoMapper {
    root: PathBuf,
    config: MapConfig,
    cache: TagCache,
    cost_fn: Option<Box<UnitCostFn>>,
}

impl RepoMapper {
    pub fn new(root: impl Into<PathBuf>, config: MapConfig) -> Self {
        Self {
            root: root.into(),
            config,
            cache: TagCache::new(),
            cost_fn: None,
        }
    }

    /// Replace the default byte-length cost estimate with a caller-supplied
    /// one, e.g. a real tokenizer.
    pub fn with_cost_fn(
        mut self,
        cost_fn: impl Fn(&str) -> usize + Send + Sync + 'static,
    ) -> Self {
        self.cost_fn = Some(Box::new(cost_fn));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// The shared tag cache. Collaborators that edit files call
    /// `cache().invalidate(path)` when they bypass the filesystem clock.
    pub fn cache(&self) -> &TagCache {
        &self.cache
    }

    /// Walk the root and snapshot every in-scope file.
    pub fn snapshot(&self) -> Result<Vec<SourceFile>> {
        FileGroup::new(&self.root, self.config.clone())
            .snapshot()
            .with_context(|| format!("snapshotting {}", self.root.display()))
    }

    /// Produce the map for one task, or `None` when nothing fits the
    /// budget.
    ///
    /// When a personalized ranking selects nothing (e.g. the task text
    /// points at files the budget cannot cover), the map is retried without
    /// personalization before giving up.
    pub fn build_map(
        &self,
        files: &[SourceFile],
        task_text: Option<&str>,
        visible_paths: &[String],
        budget: usize,
    ) -> Result<Option<String>> {
        let tags_by_file: BTreeMap<Arc<str>, Vec<Tag>> = files
            .par_iter()
            .map(|file| {
                (
                    file.path.clone(),
                    extract_file(&self.cache, file, &self.config),
                )
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        let files_by_path: BTreeMap<Arc<str>, SourceFile> = files
            .iter()
            .map(|f| (f.path.clone(), f.clone()))
            .collect();

        let personalization =
            PersonalizationSet::derive(visible_paths, task_text, &tags_by_file, &self.config);

        let selection =
            self.attempt(&tags_by_file, &files_by_path, &personalization, budget)?;
        let selection = if selection.is_empty() && !personalization.is_empty() {
            log::debug!("personalized map came out empty, retrying without personalization");
            self.attempt(
                &tags_by_file,
                &files_by_path,
                &PersonalizationSet::empty(),
                budget,
            )?
        } else {
            selection
        };

        if selection.is_empty() {
            return Ok(None);
        }
        log::debug!(
            "map: {} tags, {} cost units",
            selection.tags.len(),
            selection.cost
        );
        Ok(Some(selection.rendered))
    }

    fn attempt(
        &self,
        tags_by_file: &BTreeMap<Arc<str>, Vec<Tag>>,
        files_by_path: &BTreeMap<Arc<str>, SourceFile>,
        personalization: &PersonalizationSet,
        budget: usize,
    ) -> Result<MapSelection> {
        let graph = build_graph(tags_by_file, personalization, &self.config)
            .context("building reference graph")?;
        let ranker = PersonalizedRanker::new(&self.config);
        let ranks = ranker.rank(&graph, personalization);
        let ranked = ranker.distribute(&graph, &ranks, tags_by_file);
        let mut selector = BudgetSelector::new(files_by_path, &self.config);
        if let Some(cost_fn) = &self.cost_fn {
            selector = selector.with_cost_fn(cost_fn.as_ref());
        }
        Ok(selector.select(&ranked, budget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("auth.py"),
            "def check_token(token):\n    return token == SECRET\n\nSECRET = \"x\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("app.py"),
            "def handle(request):\n    return check_token(request.token)\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("util.py"),
            "def shuffle(items):\n    return items\n",
        )
        .unwrap();
        dir
    }

    fn mapper(dir: &TempDir) -> RepoMapper {
        RepoMapper::new(dir.path(), MapConfig::default())
    }

    #[test]
    fn builds_a_map_for_a_small_tree() {
        let dir = fixture();
        let mapper = mapper(&dir);
        let files = mapper.snapshot().unwrap();
        let map = mapper.build_map(&files, None, &[], 2048).unwrap().unwrap();

        assert!(map.contains("auth.py:"));
        assert!(map.contains("def check_token(token):"));
    }

    #[test]
    fn zero_budget_yields_none() {
        let dir = fixture();
        let mapper = mapper(&dir);
        let files = mapper.snapshot().unwrap();
        assert!(mapper.build_map(&files, None, &[], 0).unwrap().is_none());
    }

    #[test]
    fn empty_tree_yields_none() {
        let dir = TempDir::new().unwrap();
        let mapper = RepoMapper::new(dir.path(), MapConfig::default());
        let files = mapper.snapshot().unwrap();
        assert!(mapper
            .build_map(&files, None, &[], 2048)
            .unwrap()
            .is_none());
    }

    #[test]
    fn task_text_pulls_relevant_file_forward() {
        let dir = fixture();
        let mapper = mapper(&dir);
        let files = mapper.snapshot().unwrap();
        let map = mapper
            .build_map(&files, Some("check_token rejects valid tokens"), &[], 2048)
            .unwrap()
            .unwrap();

        let auth_at = map.find("auth.py:").unwrap();
        let util_at = map.find("util.py:").unwrap_or(usize::MAX);
        assert!(auth_at < util_at);
    }

    #[test]
    fn repeated_builds_hit_the_cache() {
        let dir = fixture();
        let mapper = mapper(&dir);
        let files = mapper.snapshot().unwrap();

        let first = mapper.build_map(&files, None, &[], 2048).unwrap();
        let misses_after_first = mapper.cache().counters().misses;
        let second = mapper.build_map(&files, None, &[], 2048).unwrap();

        assert_eq!(first, second);
        assert_eq!(mapper.cache().counters().misses, misses_after_first);
        assert!(mapper.cache().counters().hits >= files.len() as u64);
    }

    #[test]
    fn custom_cost_fn_controls_what_fits() {
        let dir = fixture();
        let files = mapper(&dir).snapshot().unwrap();

        let generous = RepoMapper::new(dir.path(), MapConfig::default());
        assert!(generous.build_map(&files, None, &[], 2048).unwrap().is_some());

        // A cost model that prices every rendering over budget.
        let stingy = RepoMapper::new(dir.path(), MapConfig::default())
            .with_cost_fn(|rendered: &str| rendered.len() * 1000);
        assert!(stingy.build_map(&files, None, &[], 2048).unwrap().is_none());
    }

    #[test]
    fn caller_and_definer_outrank_the_unrelated_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("defs.py"),
            "def frobnicate(x):\n    return x + 1\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("caller.py"),
            "def drive():\n    return frobnicate(2)\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("stray.py"),
            "def unrelated():\n    return 0\n",
        )
        .unwrap();

        let mapper = RepoMapper::new(dir.path(), MapConfig::default());
        let files = mapper.snapshot().unwrap();
        let map = mapper
            .build_map(&files, None, &["caller.py".into()], 2048)
            .unwrap()
            .unwrap();

        let defs_at = map.find("defs.py:").unwrap();
        let stray_at = map.find("stray.py:").unwrap_or(usize::MAX);
        assert!(defs_at < stray_at);
        assert!(map.contains("def frobnicate(x):"));
    }

    #[test]
    fn broken_file_does_not_poison_the_map() {
        let dir = fixture();
        fs::write(dir.path().join("junk.py"), b"\xff\xfe\x00broken").unwrap();
        let mapper = mapper(&dir);
        let files = mapper.snapshot().unwrap();
        let map = mapper.build_map(&files, None, &[], 2048).unwrap().unwrap();
        assert!(map.contains("auth.py:"));
    }
}
