// ABOUTME: Errors raised while reading tree files and evaluating expressions.
// ABOUTME: Converted to the backend error kinds at the library boundary.

use std::path::PathBuf;

use lookat_core::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed data file {path}: {message}")]
    Shape { path: PathBuf, message: String },

    #[error("Bad expression '{expression}': {message}")]
    Expression { expression: String, message: String },

    #[error("Unknown branch '{0}'")]
    UnknownBranch(String),

    #[error("Invalid binning: {0}")]
    Binning(String),

    #[error("Incompatible histograms: {0}")]
    Incompatible(String),
}

impl From<DataError> for BackendError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Io { path, source } => BackendError::Io { path, source },
            DataError::Json { path, source } => BackendError::Format {
                path,
                message: source.to_string(),
            },
            DataError::Shape { path, message } => BackendError::Format { path, message },
            e @ DataError::Expression { .. } => BackendError::Expression(e.to_string()),
            DataError::UnknownBranch(name) => BackendError::NoSuchBranch(name),
            DataError::Binning(message) => BackendError::Binning(message),
            DataError::Incompatible(message) => BackendError::Arithmetic(message),
        }
    }
}
