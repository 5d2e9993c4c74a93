use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Uniform response shape handed to the surrounding API layer. Code 0 means
/// success; anything else is the taxonomy code of the error that aborted the
/// operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(err: &AppError) -> Self {
        tracing::debug!("envelope error: {}", err);
        Self {
            code: err.code(),
            message: err.to_string(),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl<T> From<Result<T, AppError>> for Envelope<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Envelope::ok("ok", data),
            Err(err) => Envelope::error(&err),
        }
    }
}
