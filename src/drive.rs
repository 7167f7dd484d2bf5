//! Drive-backed object store over a REST API.
//!
//! Thin client: every call maps to one endpoint of a Drive-style file API,
//! authorized with a bearer token from the local settings. Session handling
//! lives outside this crate; an absent or rejected token surfaces as
//! [`RegistroError::NotConnected`].

use crate::error::RegistroError;
use crate::store::{ObjectStore, StoreEntry, StoreResult};
use serde::Deserialize;
use ureq::Agent;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const MULTIPART_BOUNDARY: &str = "registri-upload-boundary";

#[derive(Deserialize)]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default, rename = "mimeType")]
    mime_type: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

pub struct DriveStore {
    agent: Agent,
    base_url: String,
    token: String,
}

impl DriveStore {
    pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self, RegistroError> {
        if token.trim().is_empty() {
            return Err(RegistroError::NotConnected(
                "no access token configured; run a sign-in and store the token first".to_string(),
            ));
        }
        Ok(Self {
            agent: Agent::new_with_defaults(),
            base_url: base_url.into(),
            token: token.to_string(),
        })
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// One cheap listing call to verify the stored token still works.
    pub fn probe(&self) -> StoreResult<()> {
        self.agent
            .get(format!("{}/drive/v3/files", self.base_url))
            .header("Authorization", self.auth())
            .query("pageSize", "1")
            .query("fields", "files(id)")
            .call()
            .map_err(|err| map_err("probe", err))?;
        Ok(())
    }

    fn query_for(parent: Option<&str>) -> String {
        match parent {
            Some(parent) => format!("trashed=false and '{parent}' in parents"),
            None => "trashed=false".to_string(),
        }
    }
}

fn map_err(action: &str, err: ureq::Error) -> RegistroError {
    match err {
        ureq::Error::StatusCode(code) if code == 401 || code == 403 => {
            RegistroError::NotConnected(format!("{action}: authorization rejected ({code})"))
        }
        other => RegistroError::RemoteIo(format!("{action}: {other}")),
    }
}

fn multipart_body(metadata: &serde_json::Value, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{MULTIPART_BOUNDARY}\r\nContent-Type: application/octet-stream\r\n\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

impl ObjectStore for DriveStore {
    fn find_by_name(&self, name: &str, parent: Option<&str>) -> StoreResult<Option<StoreEntry>> {
        Ok(self
            .list(parent)?
            .into_iter()
            .find(|entry| entry.name == name))
    }

    fn create_folder(&self, name: &str, parent: Option<&str>) -> StoreResult<String> {
        let mut metadata = serde_json::json!({ "name": name, "mimeType": FOLDER_MIME });
        if let Some(parent) = parent {
            metadata["parents"] = serde_json::json!([parent]);
        }
        let mut response = self
            .agent
            .post(format!("{}/drive/v3/files", self.base_url))
            .header("Authorization", self.auth())
            .send_json(&metadata)
            .map_err(|err| map_err("create folder", err))?;
        let created: CreatedFile = response
            .body_mut()
            .read_json()
            .map_err(|err| map_err("create folder", err))?;
        Ok(created.id)
    }

    fn upload(&self, name: &str, bytes: &[u8], parent: Option<&str>) -> StoreResult<String> {
        let mut metadata = serde_json::json!({ "name": name });
        if let Some(parent) = parent {
            metadata["parents"] = serde_json::json!([parent]);
        }
        let body = multipart_body(&metadata, bytes);
        let mut response = self
            .agent
            .post(format!(
                "{}/upload/drive/v3/files?uploadType=multipart",
                self.base_url
            ))
            .header("Authorization", self.auth())
            .header(
                "Content-Type",
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .send(&body[..])
            .map_err(|err| map_err("upload", err))?;
        let created: CreatedFile = response
            .body_mut()
            .read_json()
            .map_err(|err| map_err("upload", err))?;
        Ok(created.id)
    }

    fn update(&self, id: &str, bytes: &[u8]) -> StoreResult<()> {
        self.agent
            .patch(format!(
                "{}/upload/drive/v3/files/{id}?uploadType=media",
                self.base_url
            ))
            .header("Authorization", self.auth())
            .header("Content-Type", "application/octet-stream")
            .send(bytes)
            .map_err(|err| map_err("update", err))?;
        Ok(())
    }

    fn download(&self, id: &str) -> StoreResult<Vec<u8>> {
        let mut response = self
            .agent
            .get(format!("{}/drive/v3/files/{id}", self.base_url))
            .header("Authorization", self.auth())
            .query("alt", "media")
            .call()
            .map_err(|err| map_err("download", err))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|err| map_err("download", err))
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.agent
            .delete(format!("{}/drive/v3/files/{id}", self.base_url))
            .header("Authorization", self.auth())
            .call()
            .map_err(|err| map_err("delete", err))?;
        Ok(())
    }

    fn list(&self, parent: Option<&str>) -> StoreResult<Vec<StoreEntry>> {
        let mut response = self
            .agent
            .get(format!("{}/drive/v3/files", self.base_url))
            .header("Authorization", self.auth())
            .query("q", Self::query_for(parent))
            .query("fields", "files(id,name,mimeType)")
            .call()
            .map_err(|err| map_err("list", err))?;
        let listing: FileList = response
            .body_mut()
            .read_json()
            .map_err(|err| map_err("list", err))?;
        Ok(listing
            .files
            .into_iter()
            .map(|file| StoreEntry {
                is_folder: file.mime_type == FOLDER_MIME,
                id: file.id,
                name: file.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_not_connected() {
        match DriveStore::new(DEFAULT_BASE_URL, "  ") {
            Err(RegistroError::NotConnected(_)) => {}
            other => panic!("expected NotConnected, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn multipart_body_wraps_metadata_and_payload() {
        let metadata = serde_json::json!({ "name": "registro.csv" });
        let body = multipart_body(&metadata, b"a;b\r\n");
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("registro.csv"));
        assert!(text.contains("application/json"));
        assert!(text.contains("a;b"));
        assert!(text.trim_end().ends_with(&format!("--{MULTIPART_BOUNDARY}--")));
    }

    #[test]
    fn listing_query_scopes_to_the_parent() {
        assert_eq!(DriveStore::query_for(None), "trashed=false");
        assert_eq!(
            DriveStore::query_for(Some("abc123")),
            "trashed=false and 'abc123' in parents"
        );
    }

    #[test]
    fn status_401_maps_to_not_connected() {
        let err = map_err("probe", ureq::Error::StatusCode(401));
        assert!(matches!(err, RegistroError::NotConnected(_)));
        let err = map_err("probe", ureq::Error::StatusCode(500));
        assert!(matches!(err, RegistroError::RemoteIo(_)));
    }
}
