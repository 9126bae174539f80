//! File-backed credential store.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use super::CredentialStore;

/// Stores each key as `<key>.json` under a directory.
///
/// Fail-silent per the `CredentialStore` contract: an unreadable or
/// unwritable directory (full disk, sandbox restriction) degrades to an
/// absent record, never an error.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        // Keys are dotted identifiers; keep anything path-hostile out of the name
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "Failed to read credential file");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(key, error = %e, "Failed to create credential directory");
                return;
            }
        }
        if let Err(e) = std::fs::write(&path, value) {
            warn!(key, path = %path.display(), error = %e, "Failed to write credential file");
        }
    }

    async fn remove(&self, key: &str) {
        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "Failed to remove credential file");
            }
        }
    }
}
