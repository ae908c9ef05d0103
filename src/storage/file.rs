use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{StorageError, ViewStateBackend};

/// Stores each view document as `<dir>/<escaped key>.json`.
///
/// Keys are escaped injectively: ASCII letters, digits and `-` are kept and
/// every other byte becomes `_` plus two upper-case hex digits, so
/// `view-config:pedidos` maps to `view-config_3Apedidos.json` and never
/// shares a file with `view-config_pedidos`.
///
/// Writes go to a uniquely named temporary sibling first and are renamed
/// into place, so a reader never observes a half-written document. A file
/// that is not valid JSON reads as a serialization error; the store then
/// keeps its defaults.
#[derive(Debug, Clone)]
pub struct JsonFileViewState {
    dir: PathBuf,
}

impl JsonFileViewState {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_key(key)))
    }
}

fn escape_key(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02X}", byte));
        }
    }
    stem
}

#[async_trait::async_trait]
impl ViewStateBackend for JsonFileViewState {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let body = serde_json::to_vec_pretty(value)?;
        if let Err(err) = write_then_rename(&tmp, &path, body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        debug!(path = %path.display(), "view state written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

async fn write_then_rename(tmp: &Path, path: &Path, body: Vec<u8>) -> std::io::Result<()> {
    tokio::fs::write(tmp, body).await?;
    tokio::fs::rename(tmp, path).await
}
