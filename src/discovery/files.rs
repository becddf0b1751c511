//! File enumeration with gitignore support and snapshotting.
//!
//! The walk:
//! - Respects .gitignore automatically via the `ignore` crate
//! - Applies repolens.toml include/exclude patterns
//! - Filters out binary files, archives, lock files by extension
//! - Returns deterministic (path-sorted) snapshots
//!
//! Unreadable and non-UTF-8 files are skipped with a log line; a single
//! bad file never aborts enumeration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use ignore::WalkBuilder;

use crate::config::MapConfig;
use crate::types::{Freshness, SourceFile};

/// File extensions excluded from enumeration.
///
/// Binary and generated files would waste parse cycles and pollute the
/// reference graph. Lock files in particular contain thousands of
/// dependency names that would dominate edge counts.
const EXCLUDED_EXTENSIONS: &[&str] = &[
    // Images
    "png", "jpg", "jpeg", "gif", "ico", "svg", "webp", "bmp",
    // Fonts
    "woff", "woff2", "ttf", "eot", "otf",
    // Media
    "mp3", "mp4", "wav", "ogg", "webm", "avi", "mov",
    // Archives
    "zip", "tar", "gz", "rar", "7z", "bz2", "xz", "tgz",
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    // Compiled/Binary
    "pyc", "pyo", "so", "dylib", "dll", "exe", "o", "a", "class", "jar",
    // Lock files (generated, high entropy, low signal)
    "lock", "sum",
    // Misc binary
    "db", "sqlite", "sqlite3", "wasm", "bin", "dat",
];

/// A collection of in-scope files under one root.
///
/// This is the enumeration collaborator for the map pipeline: it owns the
/// root boundary and produces `SourceFile` snapshots on demand. It holds no
/// content state between calls; new and deleted files show up on the next
/// `snapshot`.
pub struct FileGroup {
    root: PathBuf,
    config: MapConfig,
}

impl FileGroup {
    pub fn new(root: impl Into<PathBuf>, config: MapConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Snapshot every in-scope file: content plus freshness token.
    ///
    /// Files that vanish between walk and read, or that are not valid
    /// UTF-8, are skipped with a log line.
    pub fn snapshot(&self) -> Result<Vec<SourceFile>> {
        let mut out = Vec::new();
        for abs in self.walk()? {
            let Some(rel) = self.to_rel(&abs) else {
                continue;
            };
            match snapshot_file(&abs, &rel) {
                Some(file) => out.push(file),
                None => continue,
            }
        }
        Ok(out)
    }

    /// Snapshot a single file by relative path, if it is in scope.
    pub fn snapshot_one(&self, rel: &str) -> Option<SourceFile> {
        if !self.config.should_include(Path::new(rel)) {
            return None;
        }
        snapshot_file(&self.root.join(rel), rel)
    }

    fn walk(&self) -> Result<Vec<PathBuf>> {
        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }
        if !self.root.is_dir() {
            anyhow::bail!("path does not exist: {}", self.root.display());
        }

        // threads(0) auto-detects parallelism; results are collected into a
        // mutex-guarded vec and sorted afterwards, which is faster than
        // maintaining order during traversal.
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .follow_links(false)
            .threads(0)
            .build_parallel();

        let files = std::sync::Mutex::new(Vec::new());
        let root = self.root.clone();
        let config = &self.config;

        walker.run(|| {
            Box::new(|entry_result| {
                match entry_result {
                    Ok(entry) => {
                        let path = entry.path();
                        if !path.is_file() {
                            return ignore::WalkState::Continue;
                        }
                        if is_excluded_by_extension(path) {
                            return ignore::WalkState::Continue;
                        }
                        let rel_path = path.strip_prefix(&root).unwrap_or(path);
                        if !config.should_include(rel_path) {
                            return ignore::WalkState::Continue;
                        }
                        if let Ok(mut files) = files.lock() {
                            files.push(path.to_path_buf());
                        }
                        ignore::WalkState::Continue
                    }
                    // Skip entries we can't read (permissions, broken symlinks).
                    Err(_) => ignore::WalkState::Continue,
                }
            })
        });

        let mut files = files
            .into_inner()
            .map_err(|_| anyhow::anyhow!("file walk mutex poisoned"))?;

        // Sorted paths make node ids, cache behavior, and output reproducible.
        files.sort();
        Ok(files)
    }

    fn to_rel(&self, abs: &Path) -> Option<String> {
        let rel = abs.strip_prefix(&self.root).unwrap_or(abs);
        Some(rel.to_string_lossy().replace('\\', "/"))
    }
}

fn snapshot_file(abs: &Path, rel: &str) -> Option<SourceFile> {
    let metadata = match std::fs::metadata(abs) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("skipping {}: {}", rel, e);
            return None;
        }
    };
    let content = match std::fs::read_to_string(abs) {
        Ok(c) => c,
        Err(e) => {
            // Binary or unreadable; the map just won't know about this file.
            log::debug!("skipping {}: {}", rel, e);
            return None;
        }
    };
    let mtime = metadata.modified().unwrap_or(std::time::UNIX_EPOCH);
    Some(SourceFile::new(
        Arc::<str>::from(rel),
        content,
        Freshness::new(mtime, metadata.len()),
    ))
}

fn is_excluded_by_extension(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let ext_lower = ext.to_ascii_lowercase();
        return EXCLUDED_EXTENSIONS.contains(&ext_lower.as_str());
    }
    false
}
