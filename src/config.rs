//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/pricebase.sqlite"
//!
//! [import]
//! concurrency = 1
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```
//!
//! Only `[db]` is required; the other sections fall back to the defaults
//! shown above.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use pricebase_core::walker::MigrateOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// Sibling works imported at once under one name group.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

impl ImportConfig {
    pub fn migrate_options(&self) -> MigrateOptions {
        MigrateOptions {
            concurrency: self.concurrency,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig { path: path.into() },
            import: ImportConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.import.concurrency < 1 {
        anyhow::bail!("import.concurrency must be >= 1");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("pbase.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(&write(&dir, "[db]\npath = \"x.sqlite\"\n")).unwrap();
        assert_eq!(cfg.db.path, PathBuf::from("x.sqlite"));
        assert_eq!(cfg.import.concurrency, 1);
        assert_eq!(cfg.server.bind, "127.0.0.1:7341");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = load_config(&write(
            &dir,
            "[db]\npath = \"x.sqlite\"\n[import]\nconcurrency = 0\n",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("import.concurrency must be >= 1"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_config(Path::new("/nonexistent/pbase.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pbase.toml"));
    }
}
