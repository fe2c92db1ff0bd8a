use std::path::PathBuf;
use thiserror::Error;

use crate::infra::xmlrpc::RpcError;

/// Errors raised while processing a single video, subtitle or language.
///
/// None of these abort a run; the caller logs them and moves on to the
/// next unit of work.
#[derive(Debug, Error)]
pub enum SubtitlerError {
    #[error("File too small to fingerprint: {path:?} ({size} bytes)")]
    Size { path: PathBuf, size: u64 },

    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No candidate encoding could decode {path:?}")]
    Decode { path: PathBuf },

    #[error("Unknown text encoding label: {0}")]
    UnknownEncoding(String),

    #[error("No subtitles found for language {language}")]
    LookupEmpty { language: String },

    #[error("Remote service returned no content for subtitle {id}")]
    FetchEmpty { id: String },

    #[error("Invalid selection: {input:?}")]
    InvalidSelection { input: String },

    #[error("Subtitle selection aborted")]
    SelectionAborted,

    #[error("Path does not look like a video or subtitle file: {path:?}")]
    PathNotRecognized { path: PathBuf },

    #[error("Malformed subtitle payload: {0}")]
    Payload(String),

    #[error("Remote service error: {0}")]
    Service(#[from] RpcError),
}

impl SubtitlerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = SubtitlerError> = std::result::Result<T, E>;
