use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiveError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Live object already exists: {0}")]
    AlreadyExists(String),

    #[error("Field '{0}' not found in entity '{1}'")]
    FieldNotFound(String, String),

    #[error("Non-null value is required for the id field '{0}'")]
    RequiredValue(String),

    #[error("Type misuse: {0}")]
    TypeMisuse(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, LiveError>;

impl<T> From<std::sync::PoisonError<T>> for LiveError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
