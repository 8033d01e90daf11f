use pattern::PatternError;

use crate::types::BackendKind;

/// Failure of a single backend variant. Never reaches callers of
/// [`crate::ComputeBackend::evaluate`] on its own; it triggers fallback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("{backend} backend is unavailable: {reason}")]
    Unavailable { backend: BackendKind, reason: String },
    #[error("{backend} backend failed: {reason}")]
    Evaluation { backend: BackendKind, reason: String },
    #[error("{backend} backend returned a {got_width}x{got_height} field for a {want_width}x{want_height} grid")]
    ShapeMismatch {
        backend: BackendKind,
        got_width: u32,
        got_height: u32,
        want_width: u32,
        want_height: u32,
    },
}

impl BackendError {
    pub fn evaluation(backend: BackendKind, reason: impl ToString) -> Self {
        BackendError::Evaluation {
            backend,
            reason: reason.to_string(),
        }
    }

    pub fn unavailable(backend: BackendKind, reason: impl ToString) -> Self {
        BackendError::Unavailable {
            backend,
            reason: reason.to_string(),
        }
    }
}

/// Errors surfaced to the caller of the render pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    InvalidParameter(#[from] PatternError),
    #[error("rendering unavailable, every backend failed: {}", .failures.join("; "))]
    RenderingUnavailable { failures: Vec<String> },
    #[error("viewport {width}x{height} exceeds the {max}x{max} output limit")]
    ViewportTooLarge { width: i64, height: i64, max: u32 },
    #[error("failed to export frame to {path}: {reason}")]
    Export { path: String, reason: String },
}
