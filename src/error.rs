use thiserror::Error;

/// Errors the feedback engine surfaces to its caller.
///
/// Generation failures never show up here: they are absorbed into a
/// fallback message by the response validator.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid record: {field}: {reason}")]
    InvalidRecord { field: &'static str, reason: String },

    #[error("no classification rule matched ({0})")]
    InternalClassification(String),
}

impl EngineError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            field,
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidRecord { field, .. } => Some(*field),
            Self::InternalClassification(_) => None,
        }
    }
}
