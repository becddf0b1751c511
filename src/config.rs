//! Configuration loading from repolens.toml.
//!
//! All ranking constants live here so they can be tuned per project without
//! recompiling. Weighting constants follow literature-typical defaults
//! (damping 0.85) rather than being contractual.
//!
//! ## Example
//!
//! ```toml
//! include = ["src/**", "lib/**"]
//! exclude = ["**/generated/**"]
//!
//! [ranking]
//! damping = 0.85
//! mention-boost = 10.0
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default exclude patterns (common non-source directories).
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/target/**",
    "**/build/**",
    "**/dist/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/venv/**",
    "**/vendor/**",
    "**/third_party/**",
];

/// Tunables for the whole pipeline.
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Config file this was loaded from, for display.
    pub source: Option<PathBuf>,

    /// Glob patterns for files to include. Empty means include everything.
    pub include: Vec<String>,
    /// Additional exclude patterns on top of the defaults.
    pub exclude: Vec<String>,

    // Ranking
    /// PageRank damping factor (probability of following an edge).
    pub damping: f64,
    /// Iteration cap; reaching it yields best-effort scores, not an error.
    pub max_iterations: usize,
    /// L1 convergence threshold between successive score vectors.
    pub tolerance: f64,

    // Graph weighting
    /// Multiplier for edges carrying a task-mentioned identifier.
    pub mention_boost: f64,
    /// Identifiers shorter than this never become edges.
    pub min_ident_len: usize,
    /// An identifier defined in more than this fraction of files is noise.
    pub noise_definer_fraction: f64,
    /// Multiplier applied to noise-identifier edges.
    pub noise_damping: f64,

    // Rendering
    /// Selected lines at most this far apart merge into one block.
    pub merge_gap: u32,
    /// Files larger than this are skipped by the extractor.
    pub max_file_bytes: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            source: None,
            include: Vec::new(),
            exclude: Vec::new(),
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-8,
            mention_boost: 10.0,
            min_ident_len: 3,
            noise_definer_fraction: 0.25,
            noise_damping: 0.1,
            merge_gap: 3,
            max_file_bytes: 1024 * 1024,
        }
    }
}

/// Raw config as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    ranking: Option<RawRanking>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawRanking {
    damping: Option<f64>,
    max_iterations: Option<usize>,
    tolerance: Option<f64>,
    mention_boost: Option<f64>,
    min_ident_len: Option<usize>,
    noise_definer_fraction: Option<f64>,
    noise_damping: Option<f64>,
    merge_gap: Option<u32>,
}

impl MapConfig {
    /// Load configuration from `<root>/repolens.toml`, falling back to
    /// defaults when the file is absent or malformed.
    pub fn load(root: &Path) -> Self {
        let path = root.join("repolens.toml");
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<RawConfig>(&content) {
                Ok(raw) => Self::from_raw(raw, path),
                Err(e) => {
                    log::warn!("ignoring malformed {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn from_raw(raw: RawConfig, source: PathBuf) -> Self {
        let mut config = Self {
            source: Some(source),
            include: raw.include.unwrap_or_default(),
            exclude: raw.exclude.unwrap_or_default(),
            ..Self::default()
        };
        if let Some(r) = raw.ranking {
            if let Some(v) = r.damping {
                config.damping = v;
            }
            if let Some(v) = r.max_iterations {
                config.max_iterations = v;
            }
            if let Some(v) = r.tolerance {
                config.tolerance = v;
            }
            if let Some(v) = r.mention_boost {
                config.mention_boost = v;
            }
            if let Some(v) = r.min_ident_len {
                config.min_ident_len = v;
            }
            if let Some(v) = r.noise_definer_fraction {
                config.noise_definer_fraction = v;
            }
            if let Some(v) = r.noise_damping {
                config.noise_damping = v;
            }
            if let Some(v) = r.merge_gap {
                config.merge_gap = v;
            }
        }
        config
    }

    /// Effective exclude patterns: defaults plus project additions.
    pub fn effective_excludes(&self) -> Vec<String> {
        let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
        patterns.extend(self.exclude.clone());
        patterns
    }

    /// Check if a relative path matches any include pattern.
    /// No include patterns means include all.
    pub fn matches_include(&self, path: &Path) -> bool {
        if self.include.is_empty() {
            return true;
        }
        let path_str = path.to_string_lossy();
        self.include
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, &path_str))
    }

    /// Check if a relative path matches any exclude pattern.
    pub fn matches_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.effective_excludes()
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, &path_str))
    }

    /// A path is in scope when it matches include and not exclude.
    pub fn should_include(&self, path: &Path) -> bool {
        self.matches_include(path) && !self.matches_exclude(path)
    }
}
