//! Per-book config overrides.
//!
//! Files are stored under `.cache/` in a directory named by a hash of the book
//! key, so ids with odd characters never reach the filesystem. The override
//! file uses the flat [`AppConfig`] layout.

use crate::book_key::BookKey;
use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CACHE_DIR: &str = ".cache";

pub fn hash_dir(key: &BookKey) -> PathBuf {
    hash_dir_in(Path::new(CACHE_DIR), key)
}

pub fn hash_dir_in(root: &Path, key: &BookKey) -> PathBuf {
    root.join(key.digest())
}

pub fn load_book_config(key: &BookKey) -> Option<AppConfig> {
    load_book_config_in(Path::new(CACHE_DIR), key)
}

pub fn load_book_config_in(root: &Path, key: &BookKey) -> Option<AppConfig> {
    let path = hash_dir_in(root, key).join("config.toml");
    let data = fs::read_to_string(&path).ok()?;
    match toml::from_str::<AppConfig>(&data) {
        Ok(config) => Some(config.sanitized()),
        Err(err) => {
            warn!(path = %path.display(), book = %key, "Ignoring unreadable book config: {err}");
            None
        }
    }
}

pub fn save_book_config(key: &BookKey, config: &AppConfig) -> Result<()> {
    save_book_config_in(Path::new(CACHE_DIR), key, config)
}

pub fn save_book_config_in(root: &Path, key: &BookKey, config: &AppConfig) -> Result<()> {
    let dir = hash_dir_in(root, key);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create cache dir {}", dir.display()))?;
    let path = dir.join("config.toml");
    let contents = toml::to_string(config).context("failed to serialize book config")?;
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), book = %key, "Saved book config");
    Ok(())
}

/// Layer per-book overrides over the base config. Logging and the server
/// address always come from the base config.
pub fn merge_book_overrides(base: &AppConfig, overrides: Option<AppConfig>) -> AppConfig {
    match overrides {
        Some(mut overrides) => {
            overrides.log_level = base.log_level;
            overrides.base_url = base.base_url.clone();
            overrides.request_timeout_secs = base.request_timeout_secs;
            overrides
        }
        None => base.clone(),
    }
}
