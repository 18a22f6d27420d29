use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::categorizer::DEFAULT_MIN_SIMILARITY;
use crate::db::DB_FILE;
use crate::error::{ImportError, Result};

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default)]
    pub accept_empty_statements: bool,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_min_similarity() -> f64 {
    DEFAULT_MIN_SIMILARITY
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            max_upload_bytes: default_max_upload_bytes(),
            accept_empty_statements: false,
            min_similarity: default_min_similarity(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledger-import")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("ledger-import")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ImportError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

/// Settings with an optional per-invocation data directory override.
pub fn resolve(data_dir: Option<&str>) -> Settings {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(dir);
    }
    settings
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE)
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            max_upload_bytes: 1024,
            accept_empty_statements: true,
            min_similarity: 0.7,
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.max_upload_bytes, 1024);
        assert!(loaded.accept_empty_statements);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(!s.accept_empty_statements);
        assert!(!s.data_dir.is_empty());
        assert!(s.db_path().ends_with(DB_FILE));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(s.min_similarity, DEFAULT_MIN_SIMILARITY);
        assert!(!s.accept_empty_statements);
    }

    #[test]
    fn test_resolve_override() {
        let dir = tempfile::tempdir().unwrap();
        let s = resolve(Some(dir.path().to_str().unwrap()));
        assert_eq!(
            PathBuf::from(&s.data_dir),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }
}
