use std::f64::consts::TAU;

use crate::error::PatternError;
use crate::grid::{Grid, ScalarField};
use crate::params::{PatternParameters, PatternType};

/// Which of the two constituent fields is being evaluated.
///
/// Basic families treat both roles identically apart from their own
/// frequency/angle/phase. Wave and tree-ring fields also use slightly
/// different harmonic coefficients per role so the two layers never line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    Primary,
    Secondary,
}

/// Secondary-wave coefficients for the wave family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveHarmonics {
    /// Frequency ratio of the wave along the rotated Y axis.
    pub cross_ratio: f64,
    /// Phase multiplier of the cross wave.
    pub cross_phase: f64,
    /// `+1` couples the overtone to `X+Y`, `-1` to `X-Y`.
    pub diagonal_sign: f64,
    /// Phase multiplier of the complexity overtone.
    pub overtone_phase: f64,
}

/// Modulation coefficients for the tree-rings family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingHarmonics {
    pub modulation_ratio: f64,
    pub modulation_phase: f64,
    /// Modulate along the rotated Y axis instead of the rotated X axis.
    pub modulate_along_y: bool,
    pub overtone_phase: f64,
}

impl FieldRole {
    pub fn wave(self) -> WaveHarmonics {
        match self {
            FieldRole::Primary => WaveHarmonics {
                cross_ratio: 0.5,
                cross_phase: 0.7,
                diagonal_sign: 1.0,
                overtone_phase: 1.5,
            },
            FieldRole::Secondary => WaveHarmonics {
                cross_ratio: 0.7,
                cross_phase: 1.3,
                diagonal_sign: -1.0,
                overtone_phase: 0.8,
            },
        }
    }

    pub fn rings(self) -> RingHarmonics {
        match self {
            FieldRole::Primary => RingHarmonics {
                modulation_ratio: 0.3,
                modulation_phase: 0.5,
                modulate_along_y: false,
                overtone_phase: 1.2,
            },
            FieldRole::Secondary => RingHarmonics {
                modulation_ratio: 0.4,
                modulation_phase: 0.8,
                modulate_along_y: true,
                overtone_phase: 0.6,
            },
        }
    }
}

/// One oscillatory field, resolved from a [`PatternParameters`] block.
///
/// All trigonometric constants are resolved once at construction so
/// [`PatternField::sample`] only does per-point work.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternField {
    pattern_type: PatternType,
    role: FieldRole,
    freq: f64,
    angle: f64,
    cos_angle: f64,
    sin_angle: f64,
    phase: f64,
    center: (f64, f64),
    complexity: f64,
    distortion: f64,
}

impl PatternField {
    pub fn new(params: &PatternParameters, role: FieldRole) -> Result<Self, PatternError> {
        let (freq, angle_deg, phase) = match role {
            FieldRole::Primary => (params.freq1, params.angle1, params.phase1),
            FieldRole::Secondary => (params.freq2, params.angle2, params.phase2),
        };
        if !freq.is_finite() || freq <= 0.0 {
            return Err(PatternError::invalid(format!(
                "field frequency must be a positive finite number (got {freq})"
            )));
        }
        let (complexity, distortion) = params.active_extras().unwrap_or((0.0, 0.0));
        let angle = angle_deg.to_radians();
        let (sin_angle, cos_angle) = angle.sin_cos();
        Ok(Self {
            pattern_type: params.pattern_type,
            role,
            freq,
            angle,
            cos_angle,
            sin_angle,
            phase,
            center: params.center,
            complexity,
            distortion,
        })
    }

    pub fn pattern_type(&self) -> PatternType {
        self.pattern_type
    }

    pub fn role(&self) -> FieldRole {
        self.role
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }

    /// Rotation in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    /// Zero unless the family is wave or tree-rings.
    pub fn complexity(&self) -> f64 {
        self.complexity
    }

    /// Zero unless the family is wave or tree-rings.
    pub fn distortion(&self) -> f64 {
        self.distortion
    }

    /// Evaluates the field at one domain point.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let k = TAU * self.freq;
        let phase = self.phase;
        match self.pattern_type {
            PatternType::Linear => {
                let rotated = x * self.cos_angle + y * self.sin_angle;
                (k * rotated + phase).sin()
            }
            PatternType::Circular => {
                let (dx, dy) = (x - self.center.0, y - self.center.1);
                (k * dx.hypot(dy) + phase).sin()
            }
            PatternType::Radial => {
                let (dx, dy) = (x - self.center.0, y - self.center.1);
                let theta = dy.atan2(dx) + self.angle;
                (k * theta + phase).sin()
            }
            PatternType::Spiral => {
                let (dx, dy) = (x - self.center.0, y - self.center.1);
                let coord = dx.hypot(dy) + self.freq * dy.atan2(dx) + phase;
                (TAU * coord).sin()
            }
            PatternType::Wave => {
                let h = self.role.wave();
                let warp = 1.0 + self.distortion * (x * y * 0.5).sin();
                let u = (x * self.cos_angle + y * self.sin_angle) * warp;
                let v = (-x * self.sin_angle + y * self.cos_angle) * warp;
                let spread = 1.0 + 2.0 * self.complexity;
                (k * u + phase).sin()
                    + (k * h.cross_ratio * v + phase * h.cross_phase).sin()
                    + self.complexity
                        * (k * spread * (u + h.diagonal_sign * v) + phase * h.overtone_phase)
                            .sin()
            }
            PatternType::TreeRings => {
                let h = self.role.rings();
                let warp = 1.0 + self.distortion * (2.0 * x).sin() * (2.0 * y).cos();
                let ring = x.hypot(y) * warp;
                let axis = if h.modulate_along_y {
                    -x * self.sin_angle + y * self.cos_angle
                } else {
                    x * self.cos_angle + y * self.sin_angle
                };
                let spread = 1.0 + 3.0 * self.complexity;
                (k * ring + phase).sin()
                    * (k * h.modulation_ratio * axis + phase * h.modulation_phase).sin()
                    + self.complexity * (k * spread * ring + phase * h.overtone_phase).sin()
            }
        }
    }

    /// Evaluates the field at every sample of `grid`.
    pub fn evaluate(&self, grid: &Grid) -> ScalarField {
        let xs = grid.xs();
        let ys = grid.ys();
        ScalarField::from_fn(grid, |i, j| {
            self.sample(xs[i as usize], ys[j as usize]) as f32
        })
    }
}
