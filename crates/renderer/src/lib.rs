//! Render pipeline for moirew.
//!
//! Turns a [`PatternParameters`] block and a viewport size into a grayscale
//! frame. The flow for one frame is:
//!
//! ```text
//!   viewport ──▶ resolve() ──▶ Grid ──▶ ComputeBackend::evaluate ──▶ ScalarField
//!                                          │  gpu → vectorized →        │
//!                                          │  compiled → reference      ▼
//!                                          │                      rasterize()
//!   FrameRateMonitor ◀── frame time ───────┴──────────────────────── Frame
//! ```
//!
//! `ComputeBackend` owns the fallback chain. A variant that errors is logged
//! and demoted, and the same frame is retried on the next one down, so callers
//! only ever see `RenderError::RenderingUnavailable` when the reference loop
//! fails too.

mod backend;
mod error;
mod export;
mod gpu;
mod raster;
mod resolution;
mod stats;
mod types;

use std::time::Instant;

use pattern::{MoireCompositor, PatternParameters};

pub use backend::{
    probe_report, Capability, CompiledKernel, ComputeBackend, ComputeKernel, ProbeEntry,
    ProbeReport, ReferenceKernel, VectorizedKernel,
};
pub use error::{BackendError, RenderError};
pub use export::write_png;
pub use gpu::{GpuKernel, ENV_GPU_DISABLE};
pub use raster::{rasterize, shade, PixelBuffer};
pub use resolution::{resolve, FALLBACK_RESOLUTION, MAX_VIEWPORT};
pub use stats::{FrameRateMonitor, FrameRateTier, FPS_WINDOW};
pub use types::{BackendKind, BackendPreference, RasterMode, RendererConfig, SelectionMode};

/// One finished frame plus the status text shown next to it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: PixelBuffer,
    /// Compute grid resolution the field was evaluated at.
    pub resolution: (u32, u32),
    /// Variant that produced the field, after any fallback.
    pub backend: BackendKind,
    /// Multi-line parameter summary.
    pub info: String,
    /// Rolling frame-rate label including this frame.
    pub fps: String,
}

/// Owns the compute backend and frame statistics for a single render loop.
#[derive(Debug)]
pub struct MoireRenderer {
    config: RendererConfig,
    backend: ComputeBackend,
    monitor: FrameRateMonitor,
}

impl MoireRenderer {
    /// Probes the available backends and applies the configured preference.
    pub fn new(config: RendererConfig) -> Self {
        let backend = ComputeBackend::with_preference(config.backend);
        Self::with_backend(config, backend)
    }

    /// Uses an already assembled backend; `config.backend` is ignored.
    pub fn with_backend(config: RendererConfig, backend: ComputeBackend) -> Self {
        Self {
            config,
            backend,
            monitor: FrameRateMonitor::new(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn set_raster_mode(&mut self, mode: RasterMode) {
        self.config.raster = mode;
    }

    pub fn backend(&self) -> &ComputeBackend {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut ComputeBackend {
        &mut self.backend
    }

    pub fn monitor(&self) -> &FrameRateMonitor {
        &self.monitor
    }

    /// Produces one frame for `viewport` (display pixels, may be degenerate).
    /// Either axis above [`MAX_VIEWPORT`] is rejected before any work is done.
    ///
    /// The frame time covering resolution, evaluation, and rasterisation is
    /// recorded only for frames that succeed.
    pub fn render_frame(
        &mut self,
        params: &PatternParameters,
        viewport: (i64, i64),
    ) -> Result<Frame, RenderError> {
        let started = Instant::now();
        if viewport.0 > i64::from(MAX_VIEWPORT) || viewport.1 > i64::from(MAX_VIEWPORT) {
            return Err(RenderError::ViewportTooLarge {
                width: viewport.0,
                height: viewport.1,
                max: MAX_VIEWPORT,
            });
        }
        let resolution = resolve(viewport.0, viewport.1);
        let grid = MoireCompositor::grid_for(params, resolution)?;
        let field = self.backend.evaluate(&grid, params)?;
        let backend = self.backend.active();
        let pixels = rasterize(&field, display_size(viewport, resolution), self.config.raster);
        self.monitor.record(started.elapsed());

        tracing::trace!(
            backend = %backend,
            width = resolution.0,
            height = resolution.1,
            "rendered frame"
        );

        Ok(Frame {
            pixels,
            resolution,
            backend,
            info: params.summary(),
            fps: self.monitor.label(),
        })
    }
}

/// Pixel size of the output image. Degenerate viewports fall back to the
/// compute resolution so there is always something to show.
fn display_size(viewport: (i64, i64), resolution: (u32, u32)) -> (u32, u32) {
    let (w, h) = viewport;
    if w <= 0 || h <= 0 {
        return resolution;
    }
    (
        u32::try_from(w).unwrap_or(u32::MAX),
        u32::try_from(h).unwrap_or(u32::MAX),
    )
}

#[cfg(test)]
mod tests {
    use pattern::PatternType;

    use super::*;

    fn renderer() -> MoireRenderer {
        let backend = ComputeBackend::from_kernels(vec![
            Box::new(VectorizedKernel),
            Box::new(CompiledKernel),
        ]);
        MoireRenderer::with_backend(RendererConfig::default(), backend)
    }

    #[test]
    fn renders_frame_at_viewport_size() {
        let mut renderer = renderer();
        let params = PatternParameters::default();
        let frame = renderer.render_frame(&params, (640, 480)).unwrap();
        assert_eq!(frame.resolution, (320, 300));
        assert_eq!(frame.pixels.width(), 640);
        assert_eq!(frame.pixels.height(), 480);
        assert_eq!(frame.backend, BackendKind::Vectorized);
        assert!(frame.info.starts_with("Type: linear"));
        assert!(frame.fps.starts_with("FPS: "));
        assert_eq!(renderer.monitor().len(), 1);
    }

    #[test]
    fn degenerate_viewport_renders_at_fallback_resolution() {
        let mut renderer = renderer();
        let frame = renderer
            .render_frame(&PatternParameters::default(), (0, 0))
            .unwrap();
        assert_eq!(frame.resolution, (400, 400));
        assert_eq!(frame.pixels.width(), 400);
    }

    #[test]
    fn oversized_viewport_is_rejected() {
        let mut renderer = renderer();
        let params = PatternParameters::default();
        let err = renderer
            .render_frame(&params, (5_000_000_000, 5_000_000_000))
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::ViewportTooLarge {
                max: MAX_VIEWPORT,
                ..
            }
        ));
        assert!(renderer
            .render_frame(&params, (i64::from(MAX_VIEWPORT) + 1, 600))
            .is_err());
        assert!(renderer.monitor().is_empty());

        let edge = renderer
            .render_frame(&params, (i64::from(MAX_VIEWPORT), 1))
            .unwrap();
        assert_eq!(edge.pixels.width(), MAX_VIEWPORT);
        assert_eq!(edge.pixels.height(), 1);
    }

    #[test]
    fn invalid_parameters_leave_statistics_untouched() {
        let mut renderer = renderer();
        let params = PatternParameters {
            freq1: f64::NAN,
            ..PatternParameters::default()
        };
        let err = renderer.render_frame(&params, (800, 600)).unwrap_err();
        assert!(matches!(err, RenderError::InvalidParameter(_)));
        assert!(renderer.monitor().is_empty());
    }

    #[test]
    fn trilevel_frames_use_three_levels() {
        let mut renderer = renderer();
        renderer.set_raster_mode(RasterMode::TriLevel);
        let params = PatternParameters::from_preset(pattern::Preset::Spiral);
        assert_eq!(params.pattern_type, PatternType::Spiral);
        let frame = renderer.render_frame(&params, (600, 600)).unwrap();
        assert!(frame
            .pixels
            .data()
            .iter()
            .all(|&p| p == 0 || p == 128 || p == 255));
    }

    #[test]
    fn cpu_backends_agree_within_tolerance() {
        for kind in PatternType::ALL {
            let params = PatternParameters {
                pattern_type: kind,
                phase1: 0.3,
                phase2: 3.3,
                ..PatternParameters::default()
            };
            let grid = MoireCompositor::grid_for(&params, (400, 300)).unwrap();
            let reference = ReferenceKernel.evaluate(&grid, &params).unwrap();
            let mut kernels: Vec<Box<dyn ComputeKernel>> =
                vec![Box::new(VectorizedKernel), Box::new(CompiledKernel)];
            for kernel in &mut kernels {
                let field = kernel.evaluate(&grid, &params).unwrap();
                let diff = field.max_abs_diff(&reference).unwrap();
                assert!(diff < 1e-3, "{} on {kind}: {diff}", kernel.kind());
            }
        }
    }
}
