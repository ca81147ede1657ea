//! Content-addressed blob cache keyed by opaque `FileId`s.
//!
//! Backed by an in-memory map plus an on-disk mirror: one file per id under a
//! known directory, with a sidecar `index.json` mapping id → media type. This
//! lets agents pass binary blobs by short id instead of inlining base64 on
//! every hop across the peer-invocation transport.

mod error;

pub use error::FileStoreError;

use protocol::FileId;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
struct IndexEntry {
    media_type: String,
}

#[derive(Debug)]
pub struct FileRecord {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Content-addressed file store: `put`/`get`/`clear_all`. Bounded by process
/// lifetime and caller discipline — no eviction beyond an explicit clear.
pub struct FileStore {
    dir: PathBuf,
    index: Mutex<HashMap<FileId, IndexEntry>>,
}

impl FileStore {
    /// Opens (creating if necessary) a file store rooted at `dir`, loading any
    /// existing `index.json` sidecar.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(FileStoreError::Io)?;
        let index = load_index(&dir)?;
        Ok(Self { dir, index: Mutex::new(index) })
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }

    fn blob_path(&self, id: &FileId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    fn persist_index(&self, index: &HashMap<FileId, IndexEntry>) -> Result<(), FileStoreError> {
        let json = serde_json::to_vec_pretty(index).map_err(|e| FileStoreError::Corrupt(e.to_string()))?;
        std::fs::write(self.index_path(), json).map_err(FileStoreError::Io)
    }

    /// Stores `bytes` under a fresh random id, mirroring to disk. Returns the new id.
    pub fn put(&self, bytes: Vec<u8>, media_type: impl Into<String>) -> Result<FileId, FileStoreError> {
        let id = FileId::new();
        let media_type = media_type.into();
        std::fs::write(self.blob_path(&id), &bytes).map_err(FileStoreError::Io)?;
        {
            let mut index = self.index.lock().expect("file store index lock poisoned");
            index.insert(id.clone(), IndexEntry { media_type: media_type.clone() });
            self.persist_index(&index)?;
        }
        info!(file_id = %id, media_type = %media_type, bytes = bytes.len(), "stored file");
        Ok(id)
    }

    /// Fetches bytes and media type for `id`, or `NotFound`.
    pub fn get(&self, id: &FileId) -> Result<FileRecord, FileStoreError> {
        let media_type = {
            let index = self.index.lock().expect("file store index lock poisoned");
            index
                .get(id)
                .map(|e| e.media_type.clone())
                .ok_or_else(|| FileStoreError::NotFound(id.clone()))?
        };
        let bytes = std::fs::read(self.blob_path(id)).map_err(FileStoreError::Io)?;
        Ok(FileRecord { media_type, bytes })
    }

    /// Empties both the in-memory map and the on-disk mirror. Called once at
    /// registry startup; safe to call with an empty store.
    pub fn clear_all(&self) -> Result<(), FileStoreError> {
        let mut index = self.index.lock().expect("file store index lock poisoned");
        for id in index.keys() {
            if let Err(e) = std::fs::remove_file(self.blob_path(id)) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(file_id = %id, error = %e, "failed to remove blob during clear_all");
                }
            }
        }
        index.clear();
        self.persist_index(&index)?;
        info!("file store cleared");
        Ok(())
    }
}

fn load_index(dir: &std::path::Path) -> Result<HashMap<FileId, IndexEntry>, FileStoreError> {
    let path = dir.join("index.json");
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let data = std::fs::read(&path).map_err(FileStoreError::Io)?;
    if data.is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_slice(&data).map_err(|e| FileStoreError::Corrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_returns_same_bytes_and_media_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let id = store.put(vec![1, 2, 3], "image/png").unwrap();
        let rec = store.get(&id).unwrap();
        assert_eq!(rec.bytes, vec![1, 2, 3]);
        assert_eq!(rec.media_type, "image/png");
    }

    #[test]
    fn get_missing_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let err = store.get(&FileId::new()).unwrap_err();
        assert!(matches!(err, FileStoreError::NotFound(_)));
    }

    #[test]
    fn clear_all_empties_store_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let id = store.put(vec![9], "text/plain").unwrap();
        store.clear_all().unwrap();
        assert!(matches!(store.get(&id), Err(FileStoreError::NotFound(_))));

        let reopened = FileStore::open(dir.path()).unwrap();
        assert!(matches!(reopened.get(&id), Err(FileStoreError::NotFound(_))));
    }

    #[test]
    fn index_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = FileStore::open(dir.path()).unwrap();
            store.put(vec![4, 5, 6], "application/octet-stream").unwrap()
        };
        let reopened = FileStore::open(dir.path()).unwrap();
        let rec = reopened.get(&id).unwrap();
        assert_eq!(rec.bytes, vec![4, 5, 6]);
    }
}
