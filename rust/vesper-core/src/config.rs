//! Configuration file parsing for `vesper.toml`.
//!
//! Searches the current directory then its ancestors, falling back to
//! `~/.config/vesper/vesper.toml` if no project-level file is found.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::context::{Ctx, DEFAULT_MAX_META_DEPTH};
use crate::recover::PanicPolicy;

pub const CONFIG_FILE_NAME: &str = "vesper.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid toml in '{path}': {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct CoreConfig {
    #[serde(default)]
    pub context: ContextSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub recover: RecoverSection,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct ContextSection {
    /// Deadline applied to every context built from this config.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LimitsSection {
    #[serde(default = "default_max_meta_depth")]
    pub max_meta_depth: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_meta_depth: DEFAULT_MAX_META_DEPTH,
        }
    }
}

fn default_max_meta_depth() -> usize {
    DEFAULT_MAX_META_DEPTH
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct RecoverSection {
    #[serde(default)]
    pub panic_policy: PanicPolicy,
}

impl CoreConfig {
    /// Load config from `vesper.toml`, searching current dir then parents.
    /// Returns `Default` when no file is found.
    pub fn load() -> Self {
        Self::find_and_load()
            .map(|(_path, cfg)| cfg)
            .unwrap_or_default()
    }

    /// Load config and return the path to the config file that was found.
    pub fn load_with_path() -> Option<(PathBuf, Self)> {
        Self::find_and_load()
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a TOML string directly (useful for testing and embedding).
    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    fn find_and_load() -> Option<(PathBuf, Self)> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load_found(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        // Try global config
        let home = std::env::var("HOME").ok().map(PathBuf::from)?;
        let global = home.join(".config").join("vesper").join(CONFIG_FILE_NAME);
        if global.exists() {
            return Self::load_found(global);
        }
        None
    }

    fn load_found(path: PathBuf) -> Option<(PathBuf, Self)> {
        match Self::load_from(&path) {
            Ok(cfg) => {
                debug!(path = %path.display(), "loaded config");
                Some((path, cfg))
            }
            Err(err) => {
                debug!(%err, "ignoring unreadable config");
                None
            }
        }
    }

    /// A fresh execution context honouring the configured limits.
    pub fn context(&self) -> Ctx {
        let ctx = Ctx::background().with_max_meta_depth(self.limits.max_meta_depth);
        match self.context.timeout_ms {
            Some(ms) => ctx.with_timeout(Duration::from_millis(ms)),
            None => ctx,
        }
    }

    /// Generate a default `vesper.toml` template.
    pub fn default_template() -> &'static str {
        r#"# Vesper runtime configuration

[context]
# Deadline for each execution context, in milliseconds.
# timeout_ms = 5000

[limits]
# Maximum nesting of meta-method calls.
max_meta_depth = 200

[recover]
# What recover() does with a panic raised by native code:
# "catch" converts it to a value, "log" also logs it, "abort" lets it unwind.
panic_policy = "catch"
"#
    }
}
