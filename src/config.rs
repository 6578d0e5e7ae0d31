use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::bindings::KeyBindings;
use crate::classifier::{ClassificationPolicy, Thresholds};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid server address {addr}: {e}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub bindings: KeyBindings,
    pub thresholds: Thresholds,
    pub policy: ClassificationPolicy,
    pub server: ServerConfig,
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("cstrafe_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("ignoring malformed config {}: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = Config {
            bindings: KeyBindings {
                forward: 'z',
                back: 's',
                left: 'q',
                right: 'd',
            },
            thresholds: Thresholds {
                early_release_window_ms: 250.0,
                recent_stop_window_ms: 400.0,
                clean_stop_tolerance_ms: 15.0,
            },
            policy: ClassificationPolicy::KindOnly,
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 9000,
            },
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_or_malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            br#"{"policy":"kind-only","thresholds":{"clean_stop_tolerance_ms":30}}"#,
        )
        .unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.policy, ClassificationPolicy::KindOnly);
        assert_eq!(cfg.thresholds.clean_stop_tolerance_ms, 30.0);
        assert_eq!(cfg.thresholds.recent_stop_window_ms, 500.0);
        assert_eq!(cfg.bindings, KeyBindings::default());
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn server_addr() {
        let server = ServerConfig::default();
        assert_eq!(server.addr().unwrap().port(), 8000);

        let bad = ServerConfig {
            host: "not a host".into(),
            port: 1,
        };
        assert!(bad.addr().is_err());
    }
}
