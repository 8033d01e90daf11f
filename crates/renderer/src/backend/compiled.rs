//! Statically dispatched per-family kernels.
//!
//! Each family gets its own cell type with every per-frame constant resolved
//! up front (wave number, rotation, harmonics). The grid loop is generic over
//! [`CellKernel`], so the compiler emits one specialised loop per family pair
//! with no per-cell branching on the pattern type.

use std::f64::consts::TAU;

use pattern::{Grid, MoireCompositor, PatternField, PatternParameters, PatternType, ScalarField};

use super::ComputeKernel;
use crate::error::BackendError;
use crate::types::BackendKind;

#[derive(Debug, Default, Clone, Copy)]
pub struct CompiledKernel;

impl ComputeKernel for CompiledKernel {
    fn kind(&self) -> BackendKind {
        BackendKind::Compiled
    }

    fn evaluate(
        &mut self,
        grid: &Grid,
        params: &PatternParameters,
    ) -> Result<ScalarField, BackendError> {
        let compositor = MoireCompositor::new(params)
            .map_err(|err| BackendError::evaluation(BackendKind::Compiled, err))?;
        let (a, b) = (compositor.primary(), compositor.secondary());
        match params.pattern_type {
            PatternType::Linear => run(grid, &Linear::from(a), &Linear::from(b)),
            PatternType::Circular => run(grid, &Circular::from(a), &Circular::from(b)),
            PatternType::Radial => run(grid, &Radial::from(a), &Radial::from(b)),
            PatternType::Spiral => run(grid, &Spiral::from(a), &Spiral::from(b)),
            PatternType::Wave => run(grid, &Wave::from(a), &Wave::from(b)),
            PatternType::TreeRings => run(grid, &Rings::from(a), &Rings::from(b)),
        }
    }
}

trait CellKernel {
    fn cell(&self, x: f64, y: f64) -> f64;
}

fn run<K: CellKernel>(grid: &Grid, first: &K, second: &K) -> Result<ScalarField, BackendError> {
    let xs = grid.xs();
    let ys = grid.ys();
    let mut values = Vec::with_capacity(grid.len());
    for &y in &ys {
        for &x in &xs {
            values.push((first.cell(x, y) * second.cell(x, y)) as f32);
        }
    }
    ScalarField::new(grid.resolution_x(), grid.resolution_y(), values)
        .map_err(|err| BackendError::evaluation(BackendKind::Compiled, err))
}

struct Linear {
    k: f64,
    cos: f64,
    sin: f64,
    phase: f64,
}

impl From<&PatternField> for Linear {
    fn from(field: &PatternField) -> Self {
        let (sin, cos) = field.angle().sin_cos();
        Self {
            k: TAU * field.freq(),
            cos,
            sin,
            phase: field.phase(),
        }
    }
}

impl CellKernel for Linear {
    #[inline]
    fn cell(&self, x: f64, y: f64) -> f64 {
        (self.k * (x * self.cos + y * self.sin) + self.phase).sin()
    }
}

struct Circular {
    k: f64,
    cx: f64,
    cy: f64,
    phase: f64,
}

impl From<&PatternField> for Circular {
    fn from(field: &PatternField) -> Self {
        let (cx, cy) = field.center();
        Self {
            k: TAU * field.freq(),
            cx,
            cy,
            phase: field.phase(),
        }
    }
}

impl CellKernel for Circular {
    #[inline]
    fn cell(&self, x: f64, y: f64) -> f64 {
        (self.k * (x - self.cx).hypot(y - self.cy) + self.phase).sin()
    }
}

struct Radial {
    k: f64,
    cx: f64,
    cy: f64,
    angle: f64,
    phase: f64,
}

impl From<&PatternField> for Radial {
    fn from(field: &PatternField) -> Self {
        let (cx, cy) = field.center();
        Self {
            k: TAU * field.freq(),
            cx,
            cy,
            angle: field.angle(),
            phase: field.phase(),
        }
    }
}

impl CellKernel for Radial {
    #[inline]
    fn cell(&self, x: f64, y: f64) -> f64 {
        let theta = (y - self.cy).atan2(x - self.cx) + self.angle;
        (self.k * theta + self.phase).sin()
    }
}

struct Spiral {
    freq: f64,
    cx: f64,
    cy: f64,
    phase: f64,
}

impl From<&PatternField> for Spiral {
    fn from(field: &PatternField) -> Self {
        let (cx, cy) = field.center();
        Self {
            freq: field.freq(),
            cx,
            cy,
            phase: field.phase(),
        }
    }
}

impl CellKernel for Spiral {
    #[inline]
    fn cell(&self, x: f64, y: f64) -> f64 {
        let (dx, dy) = (x - self.cx, y - self.cy);
        (TAU * (dx.hypot(dy) + self.freq * dy.atan2(dx) + self.phase)).sin()
    }
}

struct Wave {
    k: f64,
    cos: f64,
    sin: f64,
    phase: f64,
    distortion: f64,
    complexity: f64,
    cross_k: f64,
    cross_phase: f64,
    overtone_k: f64,
    diagonal_sign: f64,
    overtone_phase: f64,
}

impl From<&PatternField> for Wave {
    fn from(field: &PatternField) -> Self {
        let h = field.role().wave();
        let (sin, cos) = field.angle().sin_cos();
        let k = TAU * field.freq();
        let phase = field.phase();
        Self {
            k,
            cos,
            sin,
            phase,
            distortion: field.distortion(),
            complexity: field.complexity(),
            cross_k: k * h.cross_ratio,
            cross_phase: phase * h.cross_phase,
            overtone_k: k * (1.0 + 2.0 * field.complexity()),
            diagonal_sign: h.diagonal_sign,
            overtone_phase: phase * h.overtone_phase,
        }
    }
}

impl CellKernel for Wave {
    #[inline]
    fn cell(&self, x: f64, y: f64) -> f64 {
        let warp = 1.0 + self.distortion * (x * y * 0.5).sin();
        let u = (x * self.cos + y * self.sin) * warp;
        let v = (-x * self.sin + y * self.cos) * warp;
        (self.k * u + self.phase).sin()
            + (self.cross_k * v + self.cross_phase).sin()
            + self.complexity
                * (self.overtone_k * (u + self.diagonal_sign * v) + self.overtone_phase).sin()
    }
}

struct Rings {
    k: f64,
    cos: f64,
    sin: f64,
    phase: f64,
    distortion: f64,
    complexity: f64,
    modulation_k: f64,
    modulation_phase: f64,
    along_y: bool,
    overtone_k: f64,
    overtone_phase: f64,
}

impl From<&PatternField> for Rings {
    fn from(field: &PatternField) -> Self {
        let h = field.role().rings();
        let (sin, cos) = field.angle().sin_cos();
        let k = TAU * field.freq();
        let phase = field.phase();
        Self {
            k,
            cos,
            sin,
            phase,
            distortion: field.distortion(),
            complexity: field.complexity(),
            modulation_k: k * h.modulation_ratio,
            modulation_phase: phase * h.modulation_phase,
            along_y: h.modulate_along_y,
            overtone_k: k * (1.0 + 3.0 * field.complexity()),
            overtone_phase: phase * h.overtone_phase,
        }
    }
}

impl CellKernel for Rings {
    #[inline]
    fn cell(&self, x: f64, y: f64) -> f64 {
        let warp = 1.0 + self.distortion * (2.0 * x).sin() * (2.0 * y).cos();
        let ring = x.hypot(y) * warp;
        let axis = if self.along_y {
            -x * self.sin + y * self.cos
        } else {
            x * self.cos + y * self.sin
        };
        (self.k * ring + self.phase).sin() * (self.modulation_k * axis + self.modulation_phase).sin()
            + self.complexity * (self.overtone_k * ring + self.overtone_phase).sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReferenceKernel;

    #[test]
    fn matches_reference_for_every_family() {
        for kind in PatternType::ALL {
            let params = PatternParameters {
                pattern_type: kind,
                phase1: 1.3,
                phase2: 5.9,
                center: (0.25, -0.5),
                ..PatternParameters::default()
            };
            let grid = MoireCompositor::grid_for(&params, (300, 320)).unwrap();
            let fast = CompiledKernel.evaluate(&grid, &params).unwrap();
            let slow = ReferenceKernel.evaluate(&grid, &params).unwrap();
            let diff = fast.max_abs_diff(&slow).unwrap();
            assert!(diff < 1e-3, "{kind}: {diff}");
        }
    }
}
