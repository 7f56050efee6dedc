use thiserror::Error;

/// Errors surfaced by the entity engine, one variant per condition in the
/// error-handling table. `http_status()` gives the mapping used by any
/// HTTP surface wrapping the kernel.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("schema missing: noun '{0}' is not registered")]
    SchemaMissing(String),

    #[error("verb unknown: '{0}'")]
    VerbUnknown(String),

    #[error("use the action form '{0}' instead of '{1}'")]
    UseActionForm(String, String),

    #[error("verb disabled: '{0}'")]
    VerbDisabled(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("version conflict: expected {expected}, current {current}")]
    VersionConflict { expected: u64, current: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadInput(_) => 400,
            Self::SchemaMissing(_) => 400,
            Self::VerbUnknown(_) => 400,
            Self::UseActionForm(_, _) => 400,
            Self::VerbDisabled(_) => 403,
            Self::NotFound(_) => 404,
            Self::VersionConflict { .. } => 409,
            Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
