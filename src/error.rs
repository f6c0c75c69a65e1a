//! Error type shared by the ingestion core.
//!
//! Only operations that a caller triggers directly (starting a source, adding
//! an overlay, importing or exporting a file, loading configuration) return
//! [`IngestError`]. Conditions met while tailing are reported as
//! [`IngestEvent`](crate::events::IngestEvent)s instead.

use std::path::PathBuf;

use crate::sink::OverlayId;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no log file selected")]
    NoFileSelected,

    #[error("maximum number of overlays reached ({max})")]
    OverlayLimitReached { max: usize },

    #[error("unknown overlay {0}")]
    UnknownOverlay(OverlayId),

    #[error("static overlay CSV is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("CSV has no header row")]
    MissingHeader,

    #[error("no data available to export")]
    EmptyExport,

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[cfg(feature = "parquet")]
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[cfg(feature = "parquet")]
    #[error(transparent)]
    Arrow(#[from] arrow_schema::ArrowError),
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
