//! Configuration for feedstash.
//!
//! Values are layered, later sources overriding earlier ones:
//! 1. built-in defaults ([`Config::default`]),
//! 2. an optional configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed with `FEEDSTASH_`, using `__` to descend
//!    into nested tables (e.g. `FEEDSTASH_CACHE__ROOT=/var/cache/app`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "FEEDSTASH_";
const APPLICATION: &str = "feedstash";
/// Subfolder (inside the data root) holding every namespace's database.
pub const DEFAULT_FOLDER: &str = "ContentCache";
pub const DEFAULT_EXTENSION: &str = "sqlite";
/// Databases at or below this size are never compacted.
pub const DEFAULT_COMPACTION_THRESHOLD: u64 = 100 * 1024 * 1024;
pub const DEFAULT_COMPACTION_MIN_USED_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
}

/// Where the per-identity databases live and how they are maintained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base directory. When unset, the platform's application data directory
    /// is used (`~/.local/share/feedstash`, `~/Library/Application Support/feedstash`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Subfolder of the root holding the database files.
    pub folder: String,
    /// Database file extension, without the leading dot.
    pub extension: String,
    pub compaction: CompactionConfig,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            folder: DEFAULT_FOLDER.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            compaction: CompactionConfig::default(),
        }
    }
}
impl CacheConfig {
    /// Configuration rooted at an explicit directory (tests, sandboxed apps).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()), ..Self::default() }
    }

    /// The configured root, falling back to the platform data directory.
    ///
    /// Returns `None` when neither is available (no home directory).
    pub fn data_root(&self) -> Option<PathBuf> {
        if let Some(root) = &self.root {
            return Some(root.clone());
        }
        let dirs = ProjectDirs::from("", "", APPLICATION);
        if dirs.is_none() {
            tracing::debug!("No platform data directory available");
        }
        dirs.map(|dirs| dirs.data_dir().to_path_buf())
    }
}

/// When to reclaim free pages on open.
///
/// Compaction happens when the file is larger than `threshold_bytes` **and**
/// less than `min_used_ratio` of it holds live data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    pub threshold_bytes: u64,
    pub min_used_ratio: f64,
}
impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: DEFAULT_COMPACTION_THRESHOLD,
            min_used_ratio: DEFAULT_COMPACTION_MIN_USED_RATIO,
        }
    }
}
impl CompactionConfig {
    pub fn should_compact(&self, total_bytes: u64, used_bytes: u64) -> bool {
        if total_bytes <= self.threshold_bytes {
            return false;
        }
        // Lossy for files over 2^53 bytes, which is not a concern.
        (used_bytes as f64 / total_bytes as f64) < self.min_used_ratio
    }
}

impl Config {
    /// Build the layered [`Figment`] without extracting it.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load the configuration from defaults, an optional file and the
    /// environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config = Self::figment(file)?.extract::<Config>().or_raise(|| ErrorKind::Load)?;
        tracing::debug!(file = ?file, root = ?config.cache.root, "Loaded configuration");
        Ok(config)
    }
}
