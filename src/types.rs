//! Core types for repolens.
//!
//! Design decisions:
//! - `Arc<str>` for paths and identifier names: tags are cloned freely
//!   between the cache, the graph, and the selection without copying text.
//! - Everything here is an immutable snapshot. A changed file is replaced
//!   wholesale by a new `SourceFile` with a new freshness token.

use std::sync::Arc;
use std::time::SystemTime;

/// Freshness token for a source file snapshot.
///
/// mtime plus byte size is enough to detect edits for an in-process cache;
/// callers that track content hashes instead can build one via `from_raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Freshness {
    mtime_secs: u64,
    mtime_nanos: u32,
    size: u64,
}

impl Freshness {
    pub fn new(mtime: SystemTime, size: u64) -> Self {
        let duration = mtime
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            mtime_secs: duration.as_secs(),
            mtime_nanos: duration.subsec_nanos(),
            size,
        }
    }

    /// Build a token from caller-supplied parts (e.g. a content hash split
    /// into two words). Only equality matters.
    pub fn from_raw(a: u64, b: u64) -> Self {
        Self {
            mtime_secs: a,
            mtime_nanos: (b & 0xffff_ffff) as u32,
            size: b >> 32,
        }
    }
}

/// An immutable snapshot of one in-scope source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the map root, with forward slashes.
    pub path: Arc<str>,
    /// Full content at snapshot time.
    pub content: Arc<str>,
    /// Token that changes whenever the content changes.
    pub freshness: Freshness,
}

impl SourceFile {
    pub fn new(
        path: impl Into<Arc<str>>,
        content: impl Into<Arc<str>>,
        freshness: Freshness,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            freshness,
        }
    }
}

/// Tag kind - definition or reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Symbol definition (fn/class/struct/const header).
    Def,
    /// Symbol reference (call site, type use).
    Ref,
}

/// A structural mention of a named code entity at a source location.
///
/// The atom from which the graph, the ranking, and the rendering are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Relative path of the containing file.
    pub path: Arc<str>,
    /// Identifier name.
    pub name: Arc<str>,
    pub kind: TagKind,
    /// First line of the tagged construct (1-indexed).
    pub start_line: u32,
    /// Last line of the tagged construct (1-indexed, >= start_line).
    pub end_line: u32,
}

impl Tag {
    pub fn new(
        path: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        kind: TagKind,
        start_line: u32,
        end_line: u32,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind,
            start_line,
            end_line,
        }
    }

    pub fn is_def(&self) -> bool {
        matches!(self.kind, TagKind::Def)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self.kind, TagKind::Ref)
    }
}

/// A definition tag with its computed importance score.
#[derive(Debug, Clone)]
pub struct ScoredTag {
    pub score: f64,
    pub tag: Tag,
}

impl ScoredTag {
    pub fn new(score: f64, tag: Tag) -> Self {
        Self { score, tag }
    }
}

impl PartialEq for ScoredTag {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for ScoredTag {}

impl PartialOrd for ScoredTag {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Descending score, ties broken by ascending path then ascending line.
/// This is the total order the selector's prefix property depends on.
impl Ord for ScoredTag {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| self.tag.path.cmp(&other.tag.path))
            .then_with(|| self.tag.start_line.cmp(&other.tag.start_line))
    }
}
