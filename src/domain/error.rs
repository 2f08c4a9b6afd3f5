//! Domain error types.

use super::universe::UniverseError;

/// Top-level error type for folioscope.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("singular matrix in {context}")]
    SingularMatrix { context: String },

    #[error("degenerate input: {reason}")]
    DegenerateInput { reason: String },

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: String,
        value: f64,
        reason: String,
    },

    #[error("unknown asset column: {name}")]
    UnknownAsset { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("data error in {source_name}: {reason}")]
    DataParse { source_name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FolioError {
    pub(crate) fn shape(context: &str, expected: usize, actual: usize) -> Self {
        FolioError::ShapeMismatch {
            context: context.to_string(),
            expected,
            actual,
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        FolioError::DegenerateInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(name: &str, value: f64, reason: &str) -> Self {
        FolioError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        }
    }
}

impl FolioError {
    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            FolioError::Io(_) => 1,
            FolioError::ConfigParse { .. }
            | FolioError::ConfigMissing { .. }
            | FolioError::ConfigInvalid { .. }
            | FolioError::Universe(_) => 2,
            FolioError::DataParse { .. } | FolioError::UnknownAsset { .. } => 3,
            FolioError::ShapeMismatch { .. }
            | FolioError::SingularMatrix { .. }
            | FolioError::DegenerateInput { .. }
            | FolioError::InvalidParameter { .. } => 4,
        }
    }
}

impl From<&FolioError> for std::process::ExitCode {
    fn from(err: &FolioError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
