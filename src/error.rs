use thiserror::Error;

/// Errors raised by the transcription model.
///
/// Every fallible operation returns one of these synchronously; nothing in
/// the crate retries.
#[derive(Error, Debug)]
pub enum SwaraError {
    /// A precondition on an argument or on the model state was violated.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A normalized position fell outside the segments it indexes.
    #[error("Position {x} is outside the valid range {start} to {end}")]
    OutOfBounds { x: f64, start: f64, end: f64 },

    /// A derived field that must exist was never computed.
    #[error("Missing {0}")]
    Missing(&'static str),

    /// An aggregation produced (or was fed) something that is not a
    /// pitch-to-duration mapping.
    #[error("Malformed aggregation: {0}")]
    Format(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    Duplicate { kind: &'static str, id: String },

    /// A wire document did not have the expected shape.
    #[error("Invalid document: {0}")]
    Document(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SwaraError>;

impl SwaraError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        SwaraError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn duplicate(kind: &'static str, id: impl Into<String>) -> Self {
        SwaraError::Duplicate {
            kind,
            id: id.into(),
        }
    }
}
