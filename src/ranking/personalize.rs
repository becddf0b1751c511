//! Deriving the personalization set from task context.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::config::MapConfig;
use crate::types::Tag;

/// Tokens that show up in almost any task description and carry no signal
/// about which files matter. Mined identifiers are checked against this
/// list case-insensitively.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "from", "not", "are", "was", "what",
    "when", "where", "which", "how", "why", "can", "could", "should", "would", "will",
    "into", "out", "use", "using", "used", "add", "fix", "make", "made", "new", "all",
    "but", "has", "have", "had", "been", "does", "doesnt", "dont", "please", "need",
    "needs", "want", "like", "just", "also", "then", "than", "there", "here", "file",
    "files", "code", "function", "class", "method", "bug", "error", "test", "tests",
    "change", "changes", "update", "remove", "delete", "create", "implement", "support",
    "you", "your", "its", "it's", "let", "get", "set", "see", "true", "false", "none",
    "null", "return", "returns", "def", "var", "const", "import", "self",
];

/// Nodes and identifiers the ranking should be biased toward.
///
/// Paths come from explicitly visible files plus files the task text points
/// at; identifiers are kept raw so the graph builder can boost edges that
/// carry a mentioned name.
#[derive(Debug, Clone, Default)]
pub struct PersonalizationSet {
    paths: BTreeSet<Arc<str>>,
    idents: BTreeSet<Arc<str>>,
}

impl PersonalizationSet {
    /// No bias: the ranker falls back to a uniform restart distribution.
    pub fn empty() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_idents<I, S>(idents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            paths: BTreeSet::new(),
            idents: idents.into_iter().map(Into::into).collect(),
        }
    }

    #[cfg(test)]
    pub fn with_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            idents: BTreeSet::new(),
        }
    }

    /// Build the set from explicit visible paths and free-form task text,
    /// resolved against the corpus.
    ///
    /// Visible paths not present in the corpus are ignored (the caller may
    /// be looking at generated or out-of-tree files). Task identifiers pull
    /// in files whose stem matches and files that define the identifier.
    pub fn derive(
        visible_paths: &[String],
        task_text: Option<&str>,
        tags_by_file: &BTreeMap<Arc<str>, Vec<Tag>>,
        config: &MapConfig,
    ) -> Self {
        let mut paths = BTreeSet::new();
        let mut idents: BTreeSet<Arc<str>> = BTreeSet::new();

        for visible in visible_paths {
            match tags_by_file.get_key_value(visible.as_str()) {
                Some((path, _)) => {
                    paths.insert(path.clone());
                }
                None => log::debug!("visible path {} not in corpus, ignoring", visible),
            }
        }

        if let Some(text) = task_text {
            for token in mine_idents(text, config.min_ident_len) {
                idents.insert(Arc::from(token));
            }
        }

        if !idents.is_empty() {
            for (path, tags) in tags_by_file {
                if stem_matches(path, &idents) {
                    paths.insert(path.clone());
                    continue;
                }
                if tags
                    .iter()
                    .any(|t| t.is_def() && idents.contains(&t.name))
                {
                    paths.insert(path.clone());
                }
            }
        }

        Self { paths, idents }
    }

    pub fn paths(&self) -> &BTreeSet<Arc<str>> {
        &self.paths
    }

    pub fn mentions(&self, ident: &str) -> bool {
        self.idents.contains(ident)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.idents.is_empty()
    }
}

/// Split free-form text into candidate identifiers: runs of word characters,
/// minus short tokens and stopwords.
fn mine_idents(text: &str, min_len: usize) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(move |token| {
            token.len() >= min_len
                && !token.chars().all(|c| c.is_ascii_digit())
                && !STOPWORDS.contains(&token.to_ascii_lowercase().as_str())
        })
}

fn stem_matches(path: &str, idents: &BTreeSet<Arc<str>>) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let stem = file_name.split_once('.').map_or(file_name, |(s, _)| s);
    idents
        .iter()
        .any(|i| i.as_ref().eq_ignore_ascii_case(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagKind;

    fn corpus(entries: Vec<(&str, Vec<Tag>)>) -> BTreeMap<Arc<str>, Vec<Tag>> {
        entries
            .into_iter()
            .map(|(p, tags)| (Arc::from(p), tags))
            .collect()
    }

    fn def(path: &str, name: &str) -> Tag {
        Tag::new(path, name, TagKind::Def, 1, 1)
    }

    #[test]
    fn visible_paths_resolve_against_corpus() {
        let tags = corpus(vec![("a.py", vec![def("a.py", "foo")]), ("b.py", vec![])]);
        let set = PersonalizationSet::derive(
            &["a.py".into(), "missing.py".into()],
            None,
            &tags,
            &MapConfig::default(),
        );
        assert_eq!(set.paths().len(), 1);
        assert!(set.paths().contains("a.py"));
    }

    #[test]
    fn task_idents_match_defining_files() {
        let tags = corpus(vec![
            ("auth.py", vec![def("auth.py", "check_token")]),
            ("db.py", vec![def("db.py", "connect")]),
        ]);
        let set = PersonalizationSet::derive(
            &[],
            Some("fix the bug in check_token validation"),
            &tags,
            &MapConfig::default(),
        );
        assert!(set.paths().contains("auth.py"));
        assert!(!set.paths().contains("db.py"));
        assert!(set.mentions("check_token"));
        assert!(set.mentions("validation"));
    }

    #[test]
    fn task_idents_match_file_stems() {
        let tags = corpus(vec![
            ("src/render.py", vec![def("src/render.py", "draw")]),
            ("src/db.py", vec![def("src/db.py", "connect")]),
        ]);
        let set = PersonalizationSet::derive(
            &[],
            Some("the render output is wrong"),
            &tags,
            &MapConfig::default(),
        );
        assert!(set.paths().contains("src/render.py"));
        assert!(!set.paths().contains("src/db.py"));
    }

    #[test]
    fn stopwords_and_short_tokens_dropped() {
        let tags = corpus(vec![]);
        let set = PersonalizationSet::derive(
            &[],
            Some("fix the bug in it by 42"),
            &tags,
            &MapConfig::default(),
        );
        assert!(set.is_empty());
    }
}
