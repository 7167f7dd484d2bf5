//! Remote object-store interface and the local-directory implementation.
//!
//! The ledger codec and document uploaders only ever see this trait; the
//! Drive-backed client lives in `drive.rs` and the directory store below
//! backs tests and offline use. Entry ids are opaque handles owned by the
//! store implementation.

use crate::error::RegistroError;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StoreEntry {
    pub id: String,
    pub name: String,
    pub is_folder: bool,
}

pub type StoreResult<T> = Result<T, RegistroError>;

pub trait ObjectStore {
    fn find_by_name(&self, name: &str, parent: Option<&str>) -> StoreResult<Option<StoreEntry>>;
    fn create_folder(&self, name: &str, parent: Option<&str>) -> StoreResult<String>;
    fn upload(&self, name: &str, bytes: &[u8], parent: Option<&str>) -> StoreResult<String>;
    fn update(&self, id: &str, bytes: &[u8]) -> StoreResult<()>;
    fn download(&self, id: &str) -> StoreResult<Vec<u8>>;
    fn delete(&self, id: &str) -> StoreResult<()>;
    fn list(&self, parent: Option<&str>) -> StoreResult<Vec<StoreEntry>>;
}

/// Update a same-named file in place, create it otherwise. A failed update
/// falls back to delete-then-recreate, once.
pub fn upload_or_update(
    store: &dyn ObjectStore,
    name: &str,
    bytes: &[u8],
    parent: Option<&str>,
) -> StoreResult<String> {
    match store.find_by_name(name, parent)? {
        Some(existing) => match store.update(&existing.id, bytes) {
            Ok(()) => Ok(existing.id),
            Err(err) => {
                tracing::warn!(name, error = %err, "update failed; recreating the file");
                if let Err(err) = store.delete(&existing.id) {
                    tracing::warn!(name, error = %err, "stale copy could not be deleted");
                }
                store.upload(name, bytes, parent)
            }
        },
        None => store.upload(name, bytes, parent),
    }
}

/// Object store backed by a local directory tree. Folder ids are relative
/// paths; file ids are relative paths to the file.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn parent_dir(&self, parent: Option<&str>) -> PathBuf {
        match parent {
            Some(parent) => self.root.join(parent),
            None => self.root.clone(),
        }
    }

    fn child_id(parent: Option<&str>, name: &str) -> String {
        match parent {
            Some(parent) => format!("{parent}/{name}"),
            None => name.to_string(),
        }
    }
}

fn io_err(action: &str, err: std::io::Error) -> RegistroError {
    RegistroError::RemoteIo(format!("{action}: {err}"))
}

impl ObjectStore for DirStore {
    fn find_by_name(&self, name: &str, parent: Option<&str>) -> StoreResult<Option<StoreEntry>> {
        Ok(self
            .list(parent)?
            .into_iter()
            .find(|entry| entry.name == name))
    }

    fn create_folder(&self, name: &str, parent: Option<&str>) -> StoreResult<String> {
        let id = Self::child_id(parent, name);
        fs::create_dir_all(self.resolve(&id)).map_err(|err| io_err("create folder", err))?;
        Ok(id)
    }

    fn upload(&self, name: &str, bytes: &[u8], parent: Option<&str>) -> StoreResult<String> {
        let dir = self.parent_dir(parent);
        fs::create_dir_all(&dir).map_err(|err| io_err("create parent folder", err))?;
        let id = Self::child_id(parent, name);
        fs::write(self.resolve(&id), bytes).map_err(|err| io_err("upload", err))?;
        Ok(id)
    }

    fn update(&self, id: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.resolve(id);
        if !path.is_file() {
            return Err(RegistroError::RemoteIo(format!(
                "update target {id} does not exist"
            )));
        }
        fs::write(path, bytes).map_err(|err| io_err("update", err))
    }

    fn download(&self, id: &str) -> StoreResult<Vec<u8>> {
        fs::read(self.resolve(id)).map_err(|err| io_err("download", err))
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        let path = self.resolve(id);
        if path.is_dir() {
            fs::remove_dir_all(path).map_err(|err| io_err("delete folder", err))
        } else {
            fs::remove_file(path).map_err(|err| io_err("delete", err))
        }
    }

    fn list(&self, parent: Option<&str>) -> StoreResult<Vec<StoreEntry>> {
        let dir = self.parent_dir(parent);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|err| io_err("list", err))? {
            let entry = entry.map_err(|err| io_err("list", err))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_folder = entry
                .file_type()
                .map_err(|err| io_err("list", err))?
                .is_dir();
            entries.push(StoreEntry {
                id: Self::child_id(parent, &name),
                name,
                is_folder,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
