use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize collection: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored collection is unreadable: {0}")]
    Corrupt(String),
}
