#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PatternError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        PatternError::InvalidParameter(message.into())
    }
}
