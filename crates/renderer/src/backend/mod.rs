//! Compute backend selection and fallback.
//!
//! Every variant implements [`ComputeKernel`] over the same contract: take a
//! grid plus parameters, return the moiré field for that grid. The
//! [`ComputeBackend`] handle keeps the variants in preference order, starts at
//! the best available one, and walks down the list when a variant fails. The
//! failure is logged and the call is retried transparently, so callers only
//! see an error when even the reference loop gives up.

mod compiled;
mod reference;
mod vectorized;

use std::sync::OnceLock;

use pattern::{Grid, PatternParameters, ScalarField};
use serde::Serialize;

use crate::error::{BackendError, RenderError};
use crate::gpu::GpuKernel;
use crate::types::{BackendKind, BackendPreference, SelectionMode};

pub use compiled::CompiledKernel;
pub use reference::ReferenceKernel;
pub use vectorized::VectorizedKernel;

/// One execution strategy for moiré evaluation.
pub trait ComputeKernel: Send {
    fn kind(&self) -> BackendKind;

    fn evaluate(
        &mut self,
        grid: &Grid,
        params: &PatternParameters,
    ) -> Result<ScalarField, BackendError>;
}

/// Startup availability of one backend variant.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeEntry {
    pub kind: BackendKind,
    pub available: bool,
    pub detail: String,
}

/// Process-wide record of which variants were usable at startup.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub entries: Vec<ProbeEntry>,
}

impl ProbeReport {
    pub fn is_available(&self, kind: BackendKind) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.kind == kind && entry.available)
    }
}

static PROBE: OnceLock<ProbeReport> = OnceLock::new();

/// Probes the installed variants once per process and returns the cached report.
pub fn probe_report() -> &'static ProbeReport {
    PROBE.get_or_init(|| {
        let entries = BackendKind::PREFERENCE
            .iter()
            .map(|&kind| {
                let (available, detail) = match kind {
                    BackendKind::Gpu => match crate::gpu::probe_adapter() {
                        Ok(adapter) => (true, adapter),
                        Err(reason) => (false, reason),
                    },
                    BackendKind::Vectorized => (true, "ndarray".to_string()),
                    BackendKind::Compiled => (true, "monomorphized f64 loop".to_string()),
                    BackendKind::Reference => (true, "per-cell f64 loop".to_string()),
                };
                tracing::debug!(backend = %kind, available, %detail, "probed compute backend");
                ProbeEntry {
                    kind,
                    available,
                    detail,
                }
            })
            .collect();
        ProbeReport { entries }
    })
}

/// Availability and selection status of one slot, for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct Capability {
    pub kind: BackendKind,
    pub available: bool,
    pub active: bool,
    pub detail: String,
}

struct BackendSlot {
    kind: BackendKind,
    kernel: Option<Box<dyn ComputeKernel>>,
    detail: String,
}

/// Ordered fallback chain plus the current selection.
///
/// `evaluate` takes `&mut self`, so demotion can never overlap an in-flight
/// evaluation on the same handle.
pub struct ComputeBackend {
    slots: Vec<BackendSlot>,
    active: usize,
    mode: SelectionMode,
}

impl std::fmt::Debug for ComputeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeBackend")
            .field("active", &self.active())
            .field("mode", &self.mode)
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl ComputeBackend {
    /// Builds the chain from the process-wide probe. Variants that fail to
    /// initialise are kept as unavailable slots; this is never fatal.
    pub fn probe() -> Self {
        let report = probe_report();
        let slots = report
            .entries
            .iter()
            .map(|entry| {
                if !entry.available {
                    return BackendSlot {
                        kind: entry.kind,
                        kernel: None,
                        detail: entry.detail.clone(),
                    };
                }
                match build_kernel(entry.kind) {
                    Ok(kernel) => BackendSlot {
                        kind: entry.kind,
                        kernel: Some(kernel),
                        detail: entry.detail.clone(),
                    },
                    Err(err) => {
                        tracing::warn!(backend = %entry.kind, error = %err, "backend initialisation failed");
                        BackendSlot {
                            kind: entry.kind,
                            kernel: None,
                            detail: err.to_string(),
                        }
                    }
                }
            })
            .collect();
        let backend = Self::from_slots(slots);
        tracing::info!(backend = %backend.active(), "selected compute backend");
        backend
    }

    /// Probes, then applies the caller's preference.
    pub fn with_preference(preference: BackendPreference) -> Self {
        let mut backend = Self::probe();
        if let BackendPreference::Force(kind) = preference {
            if let Err(err) = backend.force(kind) {
                tracing::warn!(error = %err, "requested backend unavailable; keeping automatic selection");
            }
        }
        backend
    }

    /// Builds a chain from explicit kernels, in the order given. A reference
    /// kernel is appended when the list does not already end with one.
    pub fn from_kernels(kernels: Vec<Box<dyn ComputeKernel>>) -> Self {
        let mut slots: Vec<BackendSlot> = kernels
            .into_iter()
            .map(|kernel| BackendSlot {
                kind: kernel.kind(),
                kernel: Some(kernel),
                detail: "provided".to_string(),
            })
            .collect();
        if slots.last().map(|slot| slot.kind) != Some(BackendKind::Reference) {
            slots.push(BackendSlot {
                kind: BackendKind::Reference,
                kernel: Some(Box::new(ReferenceKernel)),
                detail: "per-cell f64 loop".to_string(),
            });
        }
        Self::from_slots(slots)
    }

    fn from_slots(slots: Vec<BackendSlot>) -> Self {
        let active = slots
            .iter()
            .position(|slot| slot.kernel.is_some())
            .unwrap_or(slots.len().saturating_sub(1));
        Self {
            slots,
            active,
            mode: SelectionMode::Automatic,
        }
    }

    /// Kind of the variant the next evaluation starts on.
    pub fn active(&self) -> BackendKind {
        self.slots
            .get(self.active)
            .map(|slot| slot.kind)
            .unwrap_or(BackendKind::Reference)
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| Capability {
                kind: slot.kind,
                available: slot.kernel.is_some(),
                active: index == self.active,
                detail: slot.detail.clone(),
            })
            .collect()
    }

    /// Pins the selection to `kind` until [`ComputeBackend::release`] or
    /// another `force`.
    pub fn force(&mut self, kind: BackendKind) -> Result<(), BackendError> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.kind == kind && slot.kernel.is_some())
            .ok_or_else(|| BackendError::unavailable(kind, "variant was not initialised"))?;
        self.active = index;
        self.mode = SelectionMode::Manual;
        tracing::info!(backend = %kind, "compute backend pinned");
        Ok(())
    }

    /// Drops a manual override and re-selects the best available variant.
    pub fn release(&mut self) {
        self.mode = SelectionMode::Automatic;
        if let Some(index) = self.slots.iter().position(|slot| slot.kernel.is_some()) {
            self.active = index;
        }
        tracing::info!(backend = %self.active(), "compute backend selection released");
    }

    /// Evaluates the moiré field, falling back down the chain on failure.
    ///
    /// Invalid parameters are rejected up front and never trigger fallback.
    pub fn evaluate(
        &mut self,
        grid: &Grid,
        params: &PatternParameters,
    ) -> Result<ScalarField, RenderError> {
        params.validate()?;

        let mut failures = Vec::new();
        for index in self.active..self.slots.len() {
            let slot = &mut self.slots[index];
            let kind = slot.kind;
            let Some(kernel) = slot.kernel.as_mut() else {
                continue;
            };
            let result = kernel
                .evaluate(grid, params)
                .and_then(|field| check_shape(kind, grid, field));
            match result {
                Ok(field) => {
                    if index != self.active {
                        tracing::warn!(
                            from = %self.active(),
                            to = %kind,
                            mode = ?self.mode,
                            "demoted compute backend"
                        );
                        self.active = index;
                    }
                    return Ok(field);
                }
                Err(err) => {
                    tracing::warn!(backend = %kind, error = %err, "compute backend failed; trying next variant");
                    failures.push(err.to_string());
                }
            }
        }

        tracing::error!(failures = failures.len(), "every compute backend failed");
        Err(RenderError::RenderingUnavailable { failures })
    }
}

fn build_kernel(kind: BackendKind) -> Result<Box<dyn ComputeKernel>, BackendError> {
    Ok(match kind {
        BackendKind::Gpu => Box::new(GpuKernel::new()?),
        BackendKind::Vectorized => Box::new(VectorizedKernel),
        BackendKind::Compiled => Box::new(CompiledKernel),
        BackendKind::Reference => Box::new(ReferenceKernel),
    })
}

fn check_shape(
    backend: BackendKind,
    grid: &Grid,
    field: ScalarField,
) -> Result<ScalarField, BackendError> {
    if field.matches(grid) {
        Ok(field)
    } else {
        Err(BackendError::ShapeMismatch {
            backend,
            got_width: field.width(),
            got_height: field.height(),
            want_width: grid.resolution_x(),
            want_height: grid.resolution_y(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use pattern::{MoireCompositor, PatternType};

    use super::*;

    /// Pretends to be the GPU variant and fails on demand.
    struct FlakyKernel {
        fail_next: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    impl ComputeKernel for FlakyKernel {
        fn kind(&self) -> BackendKind {
            BackendKind::Gpu
        }

        fn evaluate(
            &mut self,
            grid: &Grid,
            params: &PatternParameters,
        ) -> Result<ScalarField, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(BackendError::evaluation(BackendKind::Gpu, "device lost"));
            }
            ReferenceKernel.evaluate(grid, params)
        }
    }

    struct WrongShapeKernel;

    impl ComputeKernel for WrongShapeKernel {
        fn kind(&self) -> BackendKind {
            BackendKind::Vectorized
        }

        fn evaluate(
            &mut self,
            _grid: &Grid,
            _params: &PatternParameters,
        ) -> Result<ScalarField, BackendError> {
            Ok(ScalarField::new(1, 1, vec![0.0]).expect("1x1 field"))
        }
    }

    struct BrokenReference;

    impl ComputeKernel for BrokenReference {
        fn kind(&self) -> BackendKind {
            BackendKind::Reference
        }

        fn evaluate(
            &mut self,
            _grid: &Grid,
            _params: &PatternParameters,
        ) -> Result<ScalarField, BackendError> {
            Err(BackendError::evaluation(BackendKind::Reference, "out of memory"))
        }
    }

    fn flaky() -> (FlakyKernel, Arc<AtomicBool>, Arc<AtomicUsize>) {
        let fail_next = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(AtomicUsize::new(0));
        (
            FlakyKernel {
                fail_next: fail_next.clone(),
                calls: calls.clone(),
            },
            fail_next,
            calls,
        )
    }

    fn grid(params: &PatternParameters) -> Grid {
        MoireCompositor::grid_for(params, (300, 300)).unwrap()
    }

    #[test]
    fn starts_on_highest_priority_variant() {
        let (kernel, _, _) = flaky();
        let backend = ComputeBackend::from_kernels(vec![
            Box::new(kernel),
            Box::new(CompiledKernel),
        ]);
        assert_eq!(backend.active(), BackendKind::Gpu);
        assert_eq!(backend.mode(), SelectionMode::Automatic);
        let kinds: Vec<_> = backend.capabilities().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![BackendKind::Gpu, BackendKind::Compiled, BackendKind::Reference]
        );
    }

    #[test]
    fn failure_demotes_and_retries_transparently() {
        let (kernel, fail_next, calls) = flaky();
        let mut backend = ComputeBackend::from_kernels(vec![
            Box::new(kernel),
            Box::new(VectorizedKernel),
        ]);
        let params = PatternParameters::default();
        let grid = grid(&params);

        fail_next.store(true, Ordering::SeqCst);
        let field = backend.evaluate(&grid, &params).expect("fallback result");
        assert!(field.matches(&grid));
        assert_eq!(backend.active(), BackendKind::Vectorized);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let expected = MoireCompositor::evaluate(&grid, &params).unwrap();
        assert!(field.max_abs_diff(&expected).unwrap() < 1e-3);

        // The demoted variant is not retried on later calls.
        backend.evaluate(&grid, &params).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shape_mismatch_counts_as_failure() {
        let mut backend = ComputeBackend::from_kernels(vec![Box::new(WrongShapeKernel)]);
        let params = PatternParameters::default();
        let grid = grid(&params);
        let field = backend.evaluate(&grid, &params).unwrap();
        assert!(field.matches(&grid));
        assert_eq!(backend.active(), BackendKind::Reference);
    }

    #[test]
    fn manual_override_is_sticky_and_releasable() {
        let (kernel, _, calls) = flaky();
        let mut backend = ComputeBackend::from_kernels(vec![
            Box::new(kernel),
            Box::new(CompiledKernel),
        ]);
        backend.force(BackendKind::Reference).unwrap();
        assert_eq!(backend.mode(), SelectionMode::Manual);

        let params = PatternParameters::default();
        let grid = grid(&params);
        backend.evaluate(&grid, &params).unwrap();
        backend.evaluate(&grid, &params).unwrap();
        assert_eq!(backend.active(), BackendKind::Reference);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        backend.release();
        assert_eq!(backend.mode(), SelectionMode::Automatic);
        assert_eq!(backend.active(), BackendKind::Gpu);
    }

    #[test]
    fn forced_variant_still_falls_back_downward() {
        let (kernel, fail_next, _) = flaky();
        let mut backend = ComputeBackend::from_kernels(vec![
            Box::new(VectorizedKernel),
            Box::new(kernel),
            Box::new(CompiledKernel),
        ]);
        backend.force(BackendKind::Gpu).unwrap();
        fail_next.store(true, Ordering::SeqCst);

        let params = PatternParameters::default();
        let grid = grid(&params);
        backend.evaluate(&grid, &params).unwrap();
        assert_eq!(backend.active(), BackendKind::Compiled);
        assert_eq!(backend.mode(), SelectionMode::Manual);
    }

    #[test]
    fn forcing_missing_variant_is_rejected() {
        let mut backend = ComputeBackend::from_kernels(vec![Box::new(CompiledKernel)]);
        let err = backend.force(BackendKind::Gpu).unwrap_err();
        assert!(matches!(err, BackendError::Unavailable { .. }));
        assert_eq!(backend.mode(), SelectionMode::Automatic);
    }

    #[test]
    fn invalid_parameters_skip_fallback() {
        let (kernel, _, calls) = flaky();
        let mut backend = ComputeBackend::from_kernels(vec![Box::new(kernel)]);
        let params = PatternParameters {
            freq2: 0.0,
            ..PatternParameters::default()
        };
        let grid = grid(&PatternParameters::default());
        let err = backend.evaluate(&grid, &params).unwrap_err();
        assert!(matches!(err, RenderError::InvalidParameter(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.active(), BackendKind::Gpu);
    }

    #[test]
    fn total_failure_is_rendering_unavailable() {
        let (kernel, fail_next, _) = flaky();
        let mut backend =
            ComputeBackend::from_kernels(vec![Box::new(kernel), Box::new(BrokenReference)]);
        fail_next.store(true, Ordering::SeqCst);
        let params = PatternParameters {
            pattern_type: PatternType::Spiral,
            ..PatternParameters::default()
        };
        let grid = grid(&params);
        match backend.evaluate(&grid, &params) {
            Err(RenderError::RenderingUnavailable { failures }) => assert_eq!(failures.len(), 2),
            other => panic!("expected RenderingUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn probe_always_offers_reference() {
        let report = probe_report();
        assert!(report.is_available(BackendKind::Reference));
        let backend = ComputeBackend::probe();
        assert!(backend
            .capabilities()
            .iter()
            .any(|cap| cap.kind == BackendKind::Reference && cap.available));
    }
}
