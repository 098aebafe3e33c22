//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::color::ColorError;
use crate::document::DocumentError;
use crate::export::ExportError;

/// Any failure while cleaning, recoloring or exporting a document.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Color(#[from] ColorError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;
