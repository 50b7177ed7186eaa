//! Credential persistence for the OpsBoard identity stack.
//!
//! The serialized session is written to two media at once — a durable
//! file-backed store and a process-scoped in-memory store — so a partial
//! storage failure never loses the session outright. Reads treat expired
//! records as absent. Removals distinguish intentional sign-out from
//! external/automatic removal: the latter goes through a bounded
//! backup/restore cycle before the session is declared expired.

mod keys;
mod media;
mod store;
mod traits;

pub use keys::StorageKeys;
pub use media::{FileStore, MemoryStore};
pub use store::{
    CredentialEvent, CredentialRecord, CredentialStore, MAX_RESTORE_ATTEMPTS,
    REDIRECT_DELAY, RESTORE_EMIT_DELAY,
};
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for storage media operations.
///
/// These never escape [`CredentialStore`]'s public API; a failing medium
/// degrades to "no persisted session".
#[derive(Error, Debug)]
pub enum StorageError {
    /// Medium-specific failure
    #[error("Storage medium error: {0}")]
    Medium(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage media operations.
pub type StorageResult<T> = Result<T, StorageError>;
