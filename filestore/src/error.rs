//! File store errors.

use protocol::FileId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("file not found: {0}")]
    NotFound(FileId),
    #[error("io error: {0}")]
    Io(std::io::Error),
    #[error("corrupt index: {0}")]
    Corrupt(String),
}
