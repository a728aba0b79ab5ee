//! Key-value persistence backing the session.
//!
//! The session store mirrors its fields into a `KeyValueStore` on every
//! mutation and reads them back during restore. Two backends ship here:
//! - `MemoryStore`: process-local, used by tests and throwaway sessions
//! - `FileStore`: a JSON map on disk that survives restarts

pub mod file;
pub mod memory;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Keys the session store reads and writes.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER_ID: &str = "userId";
    pub const ROLE: &str = "userRole";
    pub const USER_DATA: &str = "userData";
    /// Absolute expiry in Unix epoch milliseconds.
    pub const TOKEN_EXPIRATION: &str = "tokenExpiration";

    /// Everything a logout removes.
    pub const ALL: [&str; 5] = [TOKEN, USER_ID, ROLE, USER_DATA, TOKEN_EXPIRATION];
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
