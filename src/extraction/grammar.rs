//! The grammar capability interface.
//!
//! A `Grammar` turns one file's content into an ordered tag sequence.
//! Implementations are registered per file extension in a static table;
//! a path with no registered grammar simply yields no tags.

use std::sync::Arc;

use crate::types::Tag;

/// One language's extraction capability.
///
/// Implementations must be pure with respect to their input: the same
/// (path, content) pair always yields the same tag sequence, ordered by
/// position in the file.
pub trait Grammar: Send + Sync {
    /// Language name for logging.
    fn name(&self) -> &'static str;

    /// Extract definition and reference tags from `content`.
    fn extract(&self, path: &Arc<str>, content: &str) -> Vec<Tag>;
}

/// Look up the grammar for a path by its extension.
pub fn grammar_for_path(path: &str) -> Option<&'static dyn Grammar> {
    let ext = path.rsplit_once('.').map(|(_, e)| e)?;
    match ext {
        "py" | "pyi" => Some(&super::patterns::PYTHON),
        "rs" => Some(&super::patterns::RUST),
        "js" | "jsx" | "mjs" => Some(&super::patterns::JAVASCRIPT),
        "ts" | "tsx" => Some(&super::patterns::TYPESCRIPT),
        "go" => Some(&super::patterns::GO),
        _ => None,
    }
}
