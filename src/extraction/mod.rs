//! Tag extraction from source files.
//!
//! This module handles:
//! - The `Grammar` capability interface (one implementation per language,
//!   selected by a static extension table)
//! - Pattern-based extractors for the built-in languages
//! - A freshness-keyed cache shared across map builds
//!
//! Extraction fails softly everywhere: unsupported language, unreadable or
//! oversized content all yield an empty tag sequence and a log line, never
//! an error that aborts the pipeline.

mod cache;
mod grammar;
mod patterns;

pub use cache::{CacheCounters, TagCache};
pub use grammar::{grammar_for_path, Grammar};

use crate::config::MapConfig;
use crate::types::{SourceFile, Tag};

/// Extract the ordered tag sequence for one file, consulting the cache.
///
/// Cache contract: an entry is keyed by (path, freshness token); a changed
/// token evicts the stale entry on insert. Re-extracting an unchanged file
/// returns an equal sequence without reparsing.
pub fn extract_file(cache: &TagCache, file: &SourceFile, config: &MapConfig) -> Vec<Tag> {
    if let Some(tags) = cache.get(&file.path, file.freshness) {
        return tags;
    }

    let tags = extract_uncached(file, config);
    cache.insert(file.path.clone(), file.freshness, tags.clone());
    tags
}

fn extract_uncached(file: &SourceFile, config: &MapConfig) -> Vec<Tag> {
    if file.content.len() > config.max_file_bytes {
        log::warn!(
            "skipping {}: {} bytes exceeds extraction limit",
            file.path,
            file.content.len()
        );
        return Vec::new();
    }

    let Some(grammar) = grammar_for_path(&file.path) else {
        log::debug!("no grammar for {}", file.path);
        return Vec::new();
    };

    grammar.extract(&file.path, &file.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Freshness, TagKind};

    fn file(path: &str, content: &str) -> SourceFile {
        SourceFile::new(path, content, Freshness::from_raw(1, content.len() as u64))
    }

    #[test]
    fn extract_python_defs_and_refs() {
        let cache = TagCache::new();
        let config = MapConfig::default();
        let f = file("app.py", "def greet(name):\n    return render(name)\n");

        let tags = extract_file(&cache, &f, &config);
        assert!(tags
            .iter()
            .any(|t| t.name.as_ref() == "greet" && t.kind == TagKind::Def));
        assert!(tags
            .iter()
            .any(|t| t.name.as_ref() == "render" && t.kind == TagKind::Ref));
    }

    #[test]
    fn unsupported_language_is_empty_not_error() {
        let cache = TagCache::new();
        let config = MapConfig::default();
        let f = file("README.txt", "not code at all");
        assert!(extract_file(&cache, &f, &config).is_empty());
    }

    #[test]
    fn oversized_file_is_skipped() {
        let cache = TagCache::new();
        let config = MapConfig {
            max_file_bytes: 8,
            ..Default::default()
        };
        let f = file("big.py", "def spam(): pass\n");
        assert!(extract_file(&cache, &f, &config).is_empty());
    }

    #[test]
    fn unchanged_file_hits_cache() {
        let cache = TagCache::new();
        let config = MapConfig::default();
        let f = file("a.py", "def one(): pass\n");

        let first = extract_file(&cache, &f, &config);
        let second = extract_file(&cache, &f, &config);

        assert_eq!(first, second);
        assert_eq!(cache.counters().hits, 1);
        assert_eq!(cache.counters().misses, 1);
    }

    #[test]
    fn changed_freshness_reparses() {
        let cache = TagCache::new();
        let config = MapConfig::default();
        let v1 = file("a.py", "def one(): pass\n");
        extract_file(&cache, &v1, &config);

        let v2 = SourceFile::new(
            "a.py",
            "def one(): pass\ndef two(): pass\n",
            Freshness::from_raw(2, 99),
        );
        let tags = extract_file(&cache, &v2, &config);

        assert_eq!(tags.iter().filter(|t| t.is_def()).count(), 2);
        assert_eq!(cache.counters().hits, 0);
        assert_eq!(cache.counters().misses, 2);
    }
}
