use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Markdown conversion failed: {0}")]
    Conversion(String),

    #[error("Sanitizer '{name}' failed: {reason}")]
    Sanitizer { name: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn sanitizer(name: &'static str, reason: impl Into<String>) -> Self {
        AppError::Sanitizer {
            name,
            reason: reason.into(),
        }
    }

    /// Turn a caught panic payload into an error, keeping the message when
    /// the payload is a string.
    pub fn from_panic(name: &'static str, payload: Box<dyn std::any::Any + Send>) -> Self {
        let reason = if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "panicked".to_string()
        };
        Self::sanitizer(name, reason)
    }
}

pub type AppResult<T> = Result<T, AppError>;
