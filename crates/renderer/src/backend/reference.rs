use pattern::{Grid, MoireCompositor, PatternError, PatternParameters, ScalarField};

use super::ComputeKernel;
use crate::error::BackendError;
use crate::types::BackendKind;

/// Straight per-cell evaluation through [`MoireCompositor`]. It has no
/// external requirements and terminates the fallback chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceKernel;

impl ComputeKernel for ReferenceKernel {
    fn kind(&self) -> BackendKind {
        BackendKind::Reference
    }

    fn evaluate(
        &mut self,
        grid: &Grid,
        params: &PatternParameters,
    ) -> Result<ScalarField, BackendError> {
        MoireCompositor::evaluate(grid, params).map_err(|err: PatternError| {
            BackendError::evaluation(BackendKind::Reference, err)
        })
    }
}
