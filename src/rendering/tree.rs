//! Grouped, elided per-file outline.
//!
//! Output format, per file:
//!
//! ```text
//! src/auth.py:
//! ⋮
//! def check_token(token):
//! ⋮
//! ```
//!
//! Files are ordered by descending aggregate selected score (ties by path),
//! lines of interest are the selected tags' start lines, and nearby lines
//! merge into verbatim blocks separated by elision markers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::config::MapConfig;
use crate::types::{ScoredTag, SourceFile};

const ELISION: &str = "⋮";
const MAX_LINE_CHARS: usize = 120;

pub struct MapRenderer<'a> {
    files: &'a BTreeMap<Arc<str>, SourceFile>,
    merge_gap: u32,
}

impl<'a> MapRenderer<'a> {
    pub fn new(files: &'a BTreeMap<Arc<str>, SourceFile>, config: &MapConfig) -> Self {
        Self {
            files,
            merge_gap: config.merge_gap,
        }
    }

    /// Render the selection. Identical input yields byte-identical output;
    /// an empty selection renders as an empty string.
    pub fn render(&self, selected: &[ScoredTag]) -> String {
        let mut per_file: BTreeMap<&Arc<str>, (f64, BTreeSet<u32>)> = BTreeMap::new();
        for scored in selected {
            let entry = per_file.entry(&scored.tag.path).or_default();
            entry.0 += scored.score;
            entry.1.insert(scored.tag.start_line);
        }

        let mut order: Vec<(&Arc<str>, &(f64, BTreeSet<u32>))> =
            per_file.iter().map(|(p, v)| (*p, v)).collect();
        order.sort_by(|a, b| {
            b.1 .0
                .partial_cmp(&a.1 .0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let mut out = String::new();
        for (path, (_, lois)) in order {
            let Some(file) = self.files.get(path.as_ref()) else {
                log::warn!("selected tag in {} has no content snapshot", path);
                continue;
            };
            self.render_file(&mut out, path, &file.content, lois);
        }
        out
    }

    fn render_file(&self, out: &mut String, path: &str, content: &str, lois: &BTreeSet<u32>) {
        let lines: Vec<&str> = content.lines().collect();
        let last = lines.len() as u32;

        out.push_str(path);
        out.push_str(":\n");

        let blocks = merge_blocks(lois, self.merge_gap, last);
        let mut cursor = 1u32;
        for (start, end) in blocks {
            if start > cursor {
                out.push_str(ELISION);
                out.push('\n');
            }
            for line_no in start..=end {
                push_truncated(out, lines[(line_no - 1) as usize]);
            }
            cursor = end + 1;
        }
        if cursor <= last {
            out.push_str(ELISION);
            out.push('\n');
        }
        out.push('\n');
    }
}

/// Merge sorted lines of interest into inclusive [start, end] blocks,
/// joining runs whose neighbors are within `gap` lines. Lines beyond the
/// snapshot's last line are dropped.
fn merge_blocks(lois: &BTreeSet<u32>, gap: u32, last_line: u32) -> Vec<(u32, u32)> {
    let mut blocks: Vec<(u32, u32)> = Vec::new();
    for &loi in lois.iter().filter(|&&l| l >= 1 && l <= last_line) {
        match blocks.last_mut() {
            Some((_, end)) if loi <= *end + gap => *end = loi,
            _ => blocks.push((loi, loi)),
        }
    }
    blocks
}

fn push_truncated(out: &mut String, line: &str) {
    if line.chars().count() > MAX_LINE_CHARS {
        out.extend(line.chars().take(MAX_LINE_CHARS));
    } else {
        out.push_str(line);
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Freshness, Tag, TagKind};

    fn files(entries: Vec<(&str, &str)>) -> BTreeMap<Arc<str>, SourceFile> {
        entries
            .into_iter()
            .map(|(p, c)| {
                (
                    Arc::from(p),
                    SourceFile::new(p, c, Freshness::from_raw(1, c.len() as u64)),
                )
            })
            .collect()
    }

    fn scored(path: &str, name: &str, line: u32, score: f64) -> ScoredTag {
        ScoredTag::new(score, Tag::new(path, name, TagKind::Def, line, line))
    }

    #[test]
    fn empty_selection_renders_empty() {
        let files = files(vec![("a.py", "def foo(): pass\n")]);
        let config = MapConfig::default();
        let renderer = MapRenderer::new(&files, &config);
        assert_eq!(renderer.render(&[]), "");
    }

    #[test]
    fn single_tag_shows_header_and_line() {
        let files = files(vec![(
            "a.py",
            "import os\n\n\n\n\ndef foo():\n    pass\n\n\n\n\nEND = 1\n",
        )]);
        let config = MapConfig::default();
        let renderer = MapRenderer::new(&files, &config);
        let map = renderer.render(&[scored("a.py", "foo", 6, 1.0)]);
        assert_eq!(map, "a.py:\n⋮\ndef foo():\n⋮\n\n");
    }

    #[test]
    fn nearby_lines_merge_into_one_block() {
        let content = "line1\nline2\nline3\nline4\nline5\nline6\nline7\nline8\n";
        let files = files(vec![("a.py", content)]);
        let config = MapConfig::default();
        let renderer = MapRenderer::new(&files, &config);
        // Lines 2 and 4 are within the default merge gap of 3.
        let map = renderer.render(&[
            scored("a.py", "x", 2, 0.5),
            scored("a.py", "y", 4, 0.5),
        ]);
        assert_eq!(map, "a.py:\n⋮\nline2\nline3\nline4\n⋮\n\n");
    }

    #[test]
    fn distant_lines_get_separate_blocks() {
        let content = (1..=20)
            .map(|i| format!("line{i}\n"))
            .collect::<String>();
        let files = files(vec![("a.py", &content)]);
        let config = MapConfig::default();
        let renderer = MapRenderer::new(&files, &config);
        let map = renderer.render(&[
            scored("a.py", "x", 2, 0.5),
            scored("a.py", "y", 15, 0.5),
        ]);
        assert_eq!(map, "a.py:\n⋮\nline2\n⋮\nline15\n⋮\n\n");
    }

    #[test]
    fn files_ordered_by_aggregate_score() {
        let files = files(vec![("a.py", "aaa\n"), ("b.py", "bbb\n")]);
        let config = MapConfig::default();
        let renderer = MapRenderer::new(&files, &config);
        let map = renderer.render(&[
            scored("a.py", "x", 1, 0.2),
            scored("b.py", "y", 1, 0.8),
        ]);
        let b_at = map.find("b.py:").unwrap();
        let a_at = map.find("a.py:").unwrap();
        assert!(b_at < a_at);
    }

    #[test]
    fn equal_scores_tie_break_by_path() {
        let files = files(vec![("z.py", "zzz\n"), ("a.py", "aaa\n")]);
        let config = MapConfig::default();
        let renderer = MapRenderer::new(&files, &config);
        let map = renderer.render(&[
            scored("z.py", "x", 1, 0.5),
            scored("a.py", "y", 1, 0.5),
        ]);
        assert!(map.find("a.py:").unwrap() < map.find("z.py:").unwrap());
    }

    #[test]
    fn long_lines_are_truncated() {
        let long = format!("{}\n", "x".repeat(500));
        let files = files(vec![("a.py", &long)]);
        let config = MapConfig::default();
        let renderer = MapRenderer::new(&files, &config);
        let map = renderer.render(&[scored("a.py", "x", 1, 1.0)]);
        let rendered_line = map.lines().nth(1).unwrap();
        assert_eq!(rendered_line.chars().count(), 120);
    }

    #[test]
    fn rendering_is_deterministic() {
        let files = files(vec![("a.py", "one\ntwo\n"), ("b.py", "three\n")]);
        let config = MapConfig::default();
        let renderer = MapRenderer::new(&files, &config);
        let selection = vec![
            scored("a.py", "x", 1, 0.3),
            scored("b.py", "y", 1, 0.7),
        ];
        assert_eq!(renderer.render(&selection), renderer.render(&selection));
    }
}
