//! wgpu compute variant.
//!
//! - `context` owns the device, the compute pipeline, and the grow-only
//!   output/readback buffers. Each dispatch blocks until the mapped values are
//!   back on the host.
//! - `uniforms` packs one frame's resolved field constants into the
//!   `MoireParams` block read by `moire.wgsl`.
//!
//! Built without the `gpu` feature the variant still exists but always reports
//! itself unavailable, so the fallback chain starts one step lower.

#[cfg(feature = "gpu")]
mod context;
#[cfg(feature = "gpu")]
mod uniforms;

use pattern::{Grid, PatternParameters, ScalarField};

use crate::backend::ComputeKernel;
use crate::error::BackendError;
use crate::types::BackendKind;

/// Setting this to `1` or `true` removes the GPU variant at probe time.
pub const ENV_GPU_DISABLE: &str = "MOIREW_GPU_DISABLE";

fn env_truthy(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Returns an adapter description when the GPU variant can be used.
pub(crate) fn probe_adapter() -> Result<String, String> {
    if env_truthy(ENV_GPU_DISABLE) {
        return Err(format!("disabled by {ENV_GPU_DISABLE}"));
    }
    #[cfg(feature = "gpu")]
    {
        context::describe_adapter().map_err(|err| format!("{err:#}"))
    }
    #[cfg(not(feature = "gpu"))]
    {
        Err("built without the gpu feature".to_string())
    }
}

#[cfg(feature = "gpu")]
#[derive(Debug)]
pub struct GpuKernel {
    context: context::GpuContext,
}

#[cfg(feature = "gpu")]
impl GpuKernel {
    pub fn new() -> Result<Self, BackendError> {
        let context = context::GpuContext::new()
            .map_err(|err| BackendError::unavailable(BackendKind::Gpu, format!("{err:#}")))?;
        tracing::info!(adapter = %context.adapter, "GPU compute backend ready");
        Ok(Self { context })
    }

    pub fn adapter(&self) -> &str {
        &self.context.adapter
    }
}

#[cfg(feature = "gpu")]
impl ComputeKernel for GpuKernel {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn evaluate(
        &mut self,
        grid: &Grid,
        params: &PatternParameters,
    ) -> Result<ScalarField, BackendError> {
        let compositor = pattern::MoireCompositor::new(params)
            .map_err(|err| BackendError::evaluation(BackendKind::Gpu, err))?;
        let uniform = uniforms::MoireUniform::new(grid, &compositor);
        let values = self
            .context
            .dispatch(&uniform)
            .map_err(|err| BackendError::evaluation(BackendKind::Gpu, format!("{err:#}")))?;
        ScalarField::new(grid.resolution_x(), grid.resolution_y(), values)
            .map_err(|err| BackendError::evaluation(BackendKind::Gpu, err))
    }
}

#[cfg(not(feature = "gpu"))]
#[derive(Debug)]
pub struct GpuKernel;

#[cfg(not(feature = "gpu"))]
impl GpuKernel {
    pub fn new() -> Result<Self, BackendError> {
        Err(BackendError::unavailable(
            BackendKind::Gpu,
            "built without the gpu feature",
        ))
    }
}

#[cfg(not(feature = "gpu"))]
impl ComputeKernel for GpuKernel {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn evaluate(
        &mut self,
        _grid: &Grid,
        _params: &PatternParameters,
    ) -> Result<ScalarField, BackendError> {
        Err(BackendError::unavailable(
            BackendKind::Gpu,
            "built without the gpu feature",
        ))
    }
}
