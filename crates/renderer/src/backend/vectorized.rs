use std::f64::consts::TAU;

use ndarray::{Array1, Array2, Axis, Zip};
use pattern::{Grid, MoireCompositor, PatternField, PatternParameters, PatternType, ScalarField};

use super::ComputeKernel;
use crate::error::BackendError;
use crate::types::BackendKind;

/// Whole-grid array expressions over an `ndarray` meshgrid.
///
/// Each field is built from bulk elementwise operations rather than a
/// per-cell loop. Maths runs in `f64` and is narrowed once at the end.
#[derive(Debug, Default, Clone, Copy)]
pub struct VectorizedKernel;

impl ComputeKernel for VectorizedKernel {
    fn kind(&self) -> BackendKind {
        BackendKind::Vectorized
    }

    fn evaluate(
        &mut self,
        grid: &Grid,
        params: &PatternParameters,
    ) -> Result<ScalarField, BackendError> {
        let compositor = MoireCompositor::new(params)
            .map_err(|err| BackendError::evaluation(BackendKind::Vectorized, err))?;
        let mesh = Mesh::new(grid)?;
        let product = field(&mesh, compositor.primary()) * field(&mesh, compositor.secondary());
        let values = product.iter().map(|&v| v as f32).collect();
        ScalarField::new(grid.resolution_x(), grid.resolution_y(), values)
            .map_err(|err| BackendError::evaluation(BackendKind::Vectorized, err))
    }
}

/// `(rows, columns)` coordinate planes; row `j` holds `y_j`, column `i` holds `x_i`.
struct Mesh {
    x: Array2<f64>,
    y: Array2<f64>,
}

impl Mesh {
    fn new(grid: &Grid) -> Result<Self, BackendError> {
        let xs = Array1::from(grid.xs());
        let ys = Array1::from(grid.ys());
        let shape = (ys.len(), xs.len());
        let broadcast_err =
            || BackendError::evaluation(BackendKind::Vectorized, "meshgrid broadcast failed");
        let x = xs.broadcast(shape).ok_or_else(broadcast_err)?.to_owned();
        let y = ys
            .view()
            .insert_axis(Axis(1))
            .broadcast(shape)
            .ok_or_else(broadcast_err)?
            .to_owned();
        Ok(Self { x, y })
    }
}

fn hypot(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    Zip::from(a).and(b).map_collect(|&a, &b| a.hypot(b))
}

fn atan2(dy: &Array2<f64>, dx: &Array2<f64>) -> Array2<f64> {
    Zip::from(dy).and(dx).map_collect(|&dy, &dx| dy.atan2(dx))
}

fn field(mesh: &Mesh, f: &PatternField) -> Array2<f64> {
    let (x, y) = (&mesh.x, &mesh.y);
    let k = TAU * f.freq();
    let phase = f.phase();
    let (sin, cos) = f.angle().sin_cos();
    let (cx, cy) = f.center();

    match f.pattern_type() {
        PatternType::Linear => (x * cos + y * sin).mapv(|r| (k * r + phase).sin()),
        PatternType::Circular => {
            hypot(&(x - cx), &(y - cy)).mapv(|r| (k * r + phase).sin())
        }
        PatternType::Radial => {
            let angle = f.angle();
            atan2(&(y - cy), &(x - cx)).mapv(|theta| (k * (theta + angle) + phase).sin())
        }
        PatternType::Spiral => {
            let (dx, dy) = (x - cx, y - cy);
            let freq = f.freq();
            Zip::from(&hypot(&dx, &dy))
                .and(&atan2(&dy, &dx))
                .map_collect(|&r, &theta| (TAU * (r + freq * theta + phase)).sin())
        }
        PatternType::Wave => {
            let h = f.role().wave();
            let c = f.complexity();
            let warp = (x * y * 0.5).mapv(f64::sin) * f.distortion() + 1.0;
            let u = (x * cos + y * sin) * &warp;
            let v = (x * -sin + y * cos) * &warp;
            let spread = k * (1.0 + 2.0 * c);
            let overtone = (&u + &(&v * h.diagonal_sign))
                .mapv(|d| c * (spread * d + phase * h.overtone_phase).sin());
            u.mapv(|u| (k * u + phase).sin())
                + v.mapv(|v| (k * h.cross_ratio * v + phase * h.cross_phase).sin())
                + overtone
        }
        PatternType::TreeRings => {
            let h = f.role().rings();
            let c = f.complexity();
            let warp = (x * 2.0).mapv(f64::sin) * (y * 2.0).mapv(f64::cos) * f.distortion() + 1.0;
            let ring = hypot(x, y) * &warp;
            let axis = if h.modulate_along_y {
                x * -sin + y * cos
            } else {
                x * cos + y * sin
            };
            let spread = k * (1.0 + 3.0 * c);
            let carrier = ring.mapv(|r| (k * r + phase).sin());
            let modulation =
                axis.mapv(|a| (k * h.modulation_ratio * a + phase * h.modulation_phase).sin());
            let overtone = ring.mapv(|r| c * (spread * r + phase * h.overtone_phase).sin());
            carrier * modulation + overtone
        }
    }
}
