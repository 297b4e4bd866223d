use crate::ledger::SentLedger;
use crate::ratings::RatingStore;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reads a JSON document. Missing, unreadable or corrupt files read as `null`.
pub async fn load_document(path: &Path) -> Value {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => {
                error!(path = %path.display(), "failed to parse data file: {err}");
                Value::Null
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Value::Null,
        Err(err) => {
            error!(path = %path.display(), "failed to read data file: {err}");
            Value::Null
        }
    }
}

/// Writes through a temporary sibling and renames it into place.
pub async fn persist_document(path: &Path, document: &Value) -> Result<(), StorageError> {
    let payload = serde_json::to_vec_pretty(document)?;
    let io = |source: std::io::Error| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, payload).await.map_err(io)?;
    fs::rename(&tmp, path).await.map_err(io)?;

    debug!(path = %path.display(), "data file written");
    Ok(())
}

pub async fn load_ratings(path: &Path) -> RatingStore {
    RatingStore::from_document(&load_document(path).await)
}

pub async fn persist_ratings(path: &Path, store: &RatingStore) -> Result<(), StorageError> {
    persist_document(path, &store.to_document()).await
}

pub async fn load_ledger(path: &Path) -> SentLedger {
    SentLedger::from_document(&load_document(path).await)
}

pub async fn persist_ledger(path: &Path, ledger: &SentLedger) -> Result<(), StorageError> {
    persist_document(path, &ledger.to_document()).await
}
