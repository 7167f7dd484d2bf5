//! Client settings: company identity and remote-store configuration.
//!
//! One JSON file under the per-user config dir. `REGISTRI_CONFIG_DIR`
//! overrides the location so tests and scripted runs stay isolated.

use crate::drive::{DriveStore, DEFAULT_BASE_URL};
use crate::schema::CompanyInfo;
use crate::store::{DirStore, ObjectStore};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_ENV: &str = "REGISTRI_CONFIG_DIR";
const SETTINGS_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Local directory store, for offline use and tests.
    #[default]
    Dir,
    /// Drive-style remote store over HTTP.
    Drive,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    /// Root directory for the `dir` store; defaults to `<config>/store`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Base URL for the `drive` store.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bearer token for the `drive` store, captured by an external sign-in.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub company: CompanyInfo,
    #[serde(default)]
    pub store: StoreSettings,
}

/// Directory holding the settings file and the local catalogs.
pub fn config_root() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::config_dir().ok_or_else(|| anyhow!("no user config directory available"))?;
    Ok(base.join("registri"))
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

pub fn load(root: &Path) -> Result<Settings> {
    let path = settings_path(root);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

pub fn save(root: &Path, settings: &Settings) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("create {}", root.display()))?;
    let json = serde_json::to_string_pretty(settings).context("serialize settings")?;
    let path = settings_path(root);
    fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Open the configured object store. A `--store-dir` override always wins and
/// selects a directory store rooted there.
pub fn open_store(
    settings: &Settings,
    root: &Path,
    override_dir: Option<&Path>,
) -> Result<Box<dyn ObjectStore>> {
    if let Some(dir) = override_dir {
        return Ok(Box::new(DirStore::new(dir)));
    }
    match settings.store.kind {
        StoreKind::Dir => {
            let dir = settings
                .store
                .dir
                .clone()
                .unwrap_or_else(|| root.join("store"));
            Ok(Box::new(DirStore::new(dir)))
        }
        StoreKind::Drive => {
            let base_url = settings
                .store
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
            let token = settings.store.token.clone().unwrap_or_default();
            let store = DriveStore::new(base_url, &token)?;
            store.probe()?;
            Ok(Box::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn settings_round_trip() {
        let dir = tempdir().expect("tempdir");
        let settings = Settings {
            company: CompanyInfo {
                name: "Trattoria Da Mario".to_string(),
                piva: "01234567890".to_string(),
                address: Some("Via Roma 1, Pisa".to_string()),
            },
            store: StoreSettings {
                kind: StoreKind::Dir,
                dir: Some(dir.path().join("store")),
                base_url: None,
                token: None,
            },
        };
        save(dir.path(), &settings).expect("save");
        let loaded = load(dir.path()).expect("load");
        assert_eq!(loaded.company.name, "Trattoria Da Mario");
        assert_eq!(loaded.store.kind, StoreKind::Dir);
    }

    #[test]
    fn missing_settings_default() {
        let dir = tempdir().expect("tempdir");
        let loaded = load(dir.path()).expect("load");
        assert!(loaded.company.name.is_empty());
        assert_eq!(loaded.store.kind, StoreKind::Dir);
    }

    #[test]
    fn drive_store_without_token_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let settings = Settings {
            company: CompanyInfo::default(),
            store: StoreSettings {
                kind: StoreKind::Drive,
                dir: None,
                base_url: None,
                token: None,
            },
        };
        assert!(open_store(&settings, dir.path(), None).is_err());
    }
}
