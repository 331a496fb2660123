//! Error types for ledger operations and storage backends.

use questline_data::DefinitionError;
use thiserror::Error;

/// Input rejected by a ledger before any state changed.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Failure inside a [`SaveStore`](crate::storage::SaveStore) backend.
///
/// Ledgers never surface these; they are logged at the ledger boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize document '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
