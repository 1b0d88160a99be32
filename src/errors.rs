//! Error type shared by the object client, the upload/download machinery and
//! the filesystem surface.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("path `{path}` not found")]
    NotFound { path: String },
    #[error("invalid upload state: {0}")]
    InvalidState(&'static str),
    #[error("request to {url} failed after {attempts} attempts (last status: {status:?})")]
    RetriesExhausted {
        url: String,
        status: Option<u16>,
        attempts: u32,
    },
    #[error("request to {url} failed with status {status}")]
    Http { url: String, status: u16 },
    #[error("object service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("part upload response carried no ETag header")]
    MissingEtag,
    #[error("no project id supplied and DATASETS_PROJECT_ID is not set")]
    MissingProjectId,
    #[error("invalid project id `{value}`")]
    InvalidProjectId {
        value: String,
        #[source]
        source: uuid::Error,
    },
    #[error("invalid object service url `{0}`")]
    InvalidServiceUrl(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("operation not supported: {0}")]
    UnsupportedOperation(&'static str),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DatasetResult<T> = Result<T, DatasetError>;

impl DatasetError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<DatasetError> for io::Error {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::Io(io_err) => io_err,
            DatasetError::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, err),
            DatasetError::UnsupportedOperation(_) => {
                io::Error::new(io::ErrorKind::Unsupported, err)
            }
            other => io::Error::other(other),
        }
    }
}
