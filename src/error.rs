//! Typed errors of the ingestion pipeline.
//!
//! Every stage of an update cycle has its own error enum; [`CycleError`] wraps
//! whichever one aborted the cycle so the caller (scheduler or HTTP handler) can
//! report it.
use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures while turning page text into a [`crate::declare::Quote`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The `<price> <currency> on <month> <day>, <year>` phrase is missing.
    #[error("no price/date phrase found in the source text")]
    NoPriceMatch,

    /// A number was captured but could not be turned into a valid value.
    #[error("invalid number in the source text: {0}")]
    InvalidNumber(String),
}

/// Failures while retrieving the source page.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Timeout, DNS, connection or non-2xx response.
    #[error("source {url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    /// The HTTP client itself could not be built.
    #[error("failed to build the http client: {0}")]
    Client(String),
}

/// Failures of the series store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The snapshot could not be written; the append was rolled back.
    #[error("failed to persist the snapshot: {0}")]
    PersistFailed(#[from] io::Error),

    #[error("failed to serialize the snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to load the snapshot {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("the series lock is poisoned")]
    Poisoned,
}

/// Why an update cycle was aborted.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),

    /// The caller's deadline expired before the page was fetched.
    #[error("the update cycle was cancelled by its deadline")]
    Cancelled,
}
