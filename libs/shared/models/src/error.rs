use thiserror::Error;

/// Cross-cell error taxonomy. Cell-specific enums convert into this at the
/// envelope boundary so the surrounding API layer sees one shape.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl AppError {
    /// Stable numeric code used in the response envelope.
    pub fn code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Validation(_) => 400,
            AppError::Conflict(_) => 409,
            AppError::Forbidden(_) => 403,
            AppError::Internal(_) => 500,
            AppError::ExternalService(_) => 502,
        }
    }
}
