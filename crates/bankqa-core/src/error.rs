//! Fatal error types.
//!
//! Only conditions that abort a whole run live here. Everything wrong with
//! an individual item is reported as a [`Finding`](crate::finding::Finding).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a run before any per-item pass begins.
#[derive(Debug, Error)]
pub enum BankError {
    /// The bank (or an auxiliary input) could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The top-level bank document is not of the expected shape.
    #[error("malformed bank: {0}")]
    MalformedBank(String),

    /// The externally supplied open-source catalog is unusable.
    #[error("invalid open catalog: {0}")]
    OpenCatalog(String),

    /// A configured marker pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl BankError {
    /// Returns `true` if the input document itself was rejected.
    pub fn is_malformed(&self) -> bool {
        matches!(self, BankError::MalformedBank(_))
    }
}

pub type BankResult<T> = Result<T, BankError>;
