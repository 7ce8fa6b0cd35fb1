//! Persisted bridge credentials
//!
//! The bridge rotates its session credentials and pushes them to us; we
//! keep the latest copy on disk and hand it back on every (re)connect.

use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CREDS_FILE: &str = "creds.json";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("stored credentials are corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDS_FILE)
    }

    /// Saved credentials, or `None` before the first pairing
    pub async fn load(&self) -> Result<Option<Value>, CredentialError> {
        let path = self.path();
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CredentialError::Io { path, source }),
        }
    }

    /// Replace the saved credentials (write-then-rename)
    pub async fn save(&self, creds: &Value) -> Result<(), CredentialError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| io_error(&self.dir, source))?;

        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_vec_pretty(creds)?;

        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|source| io_error(&tmp, source))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| io_error(&path, source))?;

        tracing::debug!(path = %path.display(), "Saved bridge credentials");
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CredentialError {
    CredentialError::Io {
        path: path.to_path_buf(),
        source,
    }
}
