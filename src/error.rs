use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while turning a container into tables.
///
/// `Discovery` is fatal for a batch. All other variants are scoped to the
/// file being converted and the batch runner decides whether to skip or
/// abort.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot scan input root {path}: {reason}")]
    Discovery { path: PathBuf, reason: String },

    #[error("malformed container {path}: {reason}")]
    MalformedContainer { path: PathBuf, reason: String },

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("field `{field}` is not {expected}")]
    FieldType { field: String, expected: &'static str },

    #[error("invalid sampling frequency {frequency} Hz in `{stream}`")]
    InvalidSamplingFrequency { stream: String, frequency: f64 },

    #[error("no start timestamp in file name {path}")]
    FilenameTimestamp { path: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConvertError::MalformedContainer { path: path.into(), reason: reason.to_string() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
