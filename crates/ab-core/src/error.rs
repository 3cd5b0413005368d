//! Errors raised at the persistence boundary.
//!
//! Layout and mutation never fail; only loading and saving documents or
//! configuration can.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}
