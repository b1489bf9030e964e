// ABOUTME: Errors reported to the user by session commands.
// ABOUTME: Library failures are wrapped with the command context, never dropped.

use lookat_core::{BackendError, Handle, ObjectKind, RegistryError, SnapshotError};
use lookat_layout::{LayoutError, SurfaceError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No file is open, use add_file(path) first")]
    NoFileOpen,

    #[error("No tree '{tree}' in {file}")]
    NoSuchTree { tree: String, file: String },

    #[error("No tree loaded, use load(name) first")]
    NoTreeLoaded,

    #[error("Cannot draw '{expression}': {source}")]
    Expression {
        expression: String,
        #[source]
        source: BackendError,
    },

    #[error("Need {required} histograms, only {available} drawn so far")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Nothing registered under {0}")]
    NotFound(String),

    #[error("{handle} '{label}' belongs to a closed file")]
    StaleReference { handle: Handle, label: String },

    #[error("{handle} '{label}' is a {actual}, expected a {expected}")]
    WrongKind {
        handle: Handle,
        label: String,
        actual: ObjectKind,
        expected: ObjectKind,
    },

    #[error("No open file {0}")]
    NoSuchFile(String),

    #[error("No canvas yet, draw something first")]
    NoCanvas,

    #[error("The current pad shows nothing")]
    EmptyPad,

    #[error("{labels} legend labels but only {histograms} histograms on the canvas")]
    TooManyLabels { labels: usize, histograms: usize },

    #[error("{context}: {source}")]
    Library {
        context: String,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("Failed to save objects: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl From<RegistryError> for SessionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(what) => SessionError::NotFound(what),
            RegistryError::StaleReference { handle, label } => {
                SessionError::StaleReference { handle, label }
            }
            RegistryError::InsufficientHistory {
                required,
                available,
                ..
            } => SessionError::InsufficientHistory {
                required,
                available,
            },
        }
    }
}

impl SessionError {
    /// Wrap a library error, keeping expression problems distinguishable
    pub(crate) fn from_evaluation(expression: &str, source: BackendError) -> Self {
        match source {
            BackendError::Expression(_) | BackendError::NoSuchBranch(_) => SessionError::Expression {
                expression: expression.to_string(),
                source,
            },
            other => SessionError::Library {
                context: format!("drawing '{expression}'"),
                source: other,
            },
        }
    }
}
