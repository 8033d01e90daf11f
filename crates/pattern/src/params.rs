use std::f64::consts::TAU;
use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// Pattern family used for both constituent fields of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
    #[default]
    Linear,
    Circular,
    Radial,
    Spiral,
    Wave,
    TreeRings,
}

impl PatternType {
    pub const ALL: [PatternType; 6] = [
        PatternType::Linear,
        PatternType::Circular,
        PatternType::Radial,
        PatternType::Spiral,
        PatternType::Wave,
        PatternType::TreeRings,
    ];

    /// Stable tag used by configs, the CLI, and the GPU uniform block.
    pub fn tag(self) -> &'static str {
        match self {
            PatternType::Linear => "linear",
            PatternType::Circular => "circular",
            PatternType::Radial => "radial",
            PatternType::Spiral => "spiral",
            PatternType::Wave => "wave",
            PatternType::TreeRings => "tree-rings",
        }
    }

    pub fn index(self) -> u32 {
        match self {
            PatternType::Linear => 0,
            PatternType::Circular => 1,
            PatternType::Radial => 2,
            PatternType::Spiral => 3,
            PatternType::Wave => 4,
            PatternType::TreeRings => 5,
        }
    }

    /// Families whose fields are defined relative to `center`.
    pub fn uses_center(self) -> bool {
        matches!(
            self,
            PatternType::Circular | PatternType::Radial | PatternType::Spiral
        )
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PatternType {
    type Err = PatternError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        match normalized.as_str() {
            "linear" => Ok(PatternType::Linear),
            "circular" => Ok(PatternType::Circular),
            "radial" => Ok(PatternType::Radial),
            "spiral" => Ok(PatternType::Spiral),
            "wave" => Ok(PatternType::Wave),
            "tree-rings" | "treerings" => Ok(PatternType::TreeRings),
            "" => Err(PatternError::invalid("pattern type must not be empty")),
            _ => Err(PatternError::invalid(format!(
                "unknown pattern type '{}'; expected linear, circular, radial, spiral, wave, or tree-rings",
                value.trim()
            ))),
        }
    }
}

/// Named parameter sets that replace the whole parameter block at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Factory defaults: crossed linear gratings.
    Reset,
    /// Concentric rings with slightly detuned frequencies.
    Circular,
    /// Two interleaved spirals.
    Spiral,
}

impl FromStr for Preset {
    type Err = PatternError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reset" | "default" | "defaults" => Ok(Preset::Reset),
            "circular" => Ok(Preset::Circular),
            "spiral" => Ok(Preset::Spiral),
            other => Err(PatternError::invalid(format!(
                "unknown preset '{other}'; expected reset, circular, or spiral"
            ))),
        }
    }
}

/// Wraps a phase into `[0, 2π)`. Non-finite input collapses to zero.
pub fn wrap_phase(phase: f64) -> f64 {
    if !phase.is_finite() {
        return 0.0;
    }
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Full parameter block for one rendering session.
///
/// Only the extra pair matching `pattern_type` is read during evaluation; the
/// other pair is kept so switching families does not lose user edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParameters {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub freq1: f64,
    pub freq2: f64,
    /// Degrees.
    pub angle1: f64,
    /// Degrees.
    pub angle2: f64,
    pub phase1: f64,
    pub phase2: f64,
    pub center: (f64, f64),
    pub radius: f64,
    pub wave_complexity: f64,
    pub wave_distortion: f64,
    pub rings_distortion: f64,
    pub rings_complexity: f64,
}

impl Default for PatternParameters {
    fn default() -> Self {
        Self {
            pattern_type: PatternType::Linear,
            freq1: 8.0,
            freq2: 9.0,
            angle1: 0.0,
            angle2: 45.0,
            phase1: 0.0,
            phase2: 0.0,
            center: (0.0, 0.0),
            radius: 3.0,
            wave_complexity: 0.5,
            wave_distortion: 0.3,
            rings_distortion: 0.2,
            rings_complexity: 0.4,
        }
    }
}

impl PatternParameters {
    pub fn from_preset(preset: Preset) -> Self {
        let base = Self::default();
        match preset {
            Preset::Reset => base,
            Preset::Circular => Self {
                pattern_type: PatternType::Circular,
                freq1: 5.0,
                freq2: 6.0,
                angle2: 0.0,
                ..base
            },
            Preset::Spiral => Self {
                pattern_type: PatternType::Spiral,
                freq1: 2.0,
                freq2: 2.5,
                angle2: 0.0,
                radius: 2.0,
                ..base
            },
        }
    }

    /// Replaces every field with the preset's values.
    pub fn apply_preset(&mut self, preset: Preset) {
        *self = Self::from_preset(preset);
    }

    /// Rejects values that would make evaluation meaningless.
    pub fn validate(&self) -> Result<(), PatternError> {
        for (name, value) in [("freq1", self.freq1), ("freq2", self.freq2)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PatternError::invalid(format!(
                    "{name} must be a positive finite number (got {value})"
                )));
            }
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(PatternError::invalid(format!(
                "radius must be a positive finite number (got {})",
                self.radius
            )));
        }
        Ok(())
    }

    pub fn set_phases(&mut self, phase1: f64, phase2: f64) {
        self.phase1 = wrap_phase(phase1);
        self.phase2 = wrap_phase(phase2);
    }

    /// Moves each phase by its own step, wrapping independently.
    pub fn advance_phases(&mut self, step1: f64, step2: f64) {
        self.phase1 = wrap_phase(self.phase1 + step1);
        self.phase2 = wrap_phase(self.phase2 + step2);
    }

    /// Complexity and distortion of the active family, if it has any.
    pub fn active_extras(&self) -> Option<(f64, f64)> {
        match self.pattern_type {
            PatternType::Wave => Some((self.wave_complexity, self.wave_distortion)),
            PatternType::TreeRings => Some((self.rings_complexity, self.rings_distortion)),
            _ => None,
        }
    }

    /// Multi-line summary shown next to the rendered image.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Type: {}", self.pattern_type);
        let _ = writeln!(out, "Freq1: {:.1}", self.freq1);
        let _ = writeln!(out, "Freq2: {:.1}", self.freq2);
        let _ = writeln!(out, "Angle1: {:.1}°", self.angle1);
        let _ = writeln!(out, "Angle2: {:.1}°", self.angle2);
        let _ = writeln!(out, "Phase1: {:.2}", self.phase1);
        let _ = write!(out, "Phase2: {:.2}", self.phase2);
        if self.pattern_type.uses_center() {
            let _ = write!(
                out,
                "\nCenter: ({:.1}, {:.1})",
                self.center.0, self.center.1
            );
        }
        if self.pattern_type == PatternType::Spiral {
            let _ = write!(out, "\nRadius: {:.1}", self.radius);
        }
        if let Some((complexity, distortion)) = self.active_extras() {
            let _ = write!(
                out,
                "\nComplexity: {complexity:.2}\nDistortion: {distortion:.2}"
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_pattern_tags() {
        assert_eq!("linear".parse::<PatternType>(), Ok(PatternType::Linear));
        assert_eq!("Tree Rings".parse::<PatternType>(), Ok(PatternType::TreeRings));
        assert_eq!("tree_rings".parse::<PatternType>(), Ok(PatternType::TreeRings));
        assert_eq!(" WAVE ".parse::<PatternType>(), Ok(PatternType::Wave));
        for kind in PatternType::ALL {
            assert_eq!(kind.tag().parse::<PatternType>(), Ok(kind));
        }
    }

    #[test]
    fn rejects_malformed_pattern_tag() {
        let err = "hexagonal".parse::<PatternType>().unwrap_err();
        assert!(matches!(err, PatternError::InvalidParameter(_)));
        assert!("".parse::<PatternType>().is_err());
    }

    #[test]
    fn rejects_non_positive_frequency() {
        let mut params = PatternParameters::default();
        params.freq1 = 0.0;
        assert!(params.validate().is_err());
        params.freq1 = 8.0;
        params.freq2 = -1.0;
        assert!(params.validate().is_err());
        params.freq2 = f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn inactive_extras_are_not_validated() {
        let params = PatternParameters {
            wave_complexity: 7.5,
            rings_distortion: -3.0,
            ..PatternParameters::default()
        };
        assert!(params.validate().is_ok());
        assert_eq!(params.active_extras(), None);
    }

    #[test]
    fn presets_match_expected_families() {
        let circular = PatternParameters::from_preset(Preset::Circular);
        assert_eq!(circular.pattern_type, PatternType::Circular);
        assert_eq!((circular.freq1, circular.freq2), (5.0, 6.0));

        let mut params = circular.clone();
        params.apply_preset(Preset::Spiral);
        assert_eq!(params.pattern_type, PatternType::Spiral);
        assert_eq!(params.radius, 2.0);

        params.apply_preset(Preset::Reset);
        assert_eq!(params, PatternParameters::default());
    }

    #[test]
    fn summary_lists_active_extras_only() {
        let mut params = PatternParameters::default();
        let linear = params.summary();
        assert!(linear.starts_with("Type: linear"));
        assert!(linear.contains("Angle2: 45.0°"));
        assert!(!linear.contains("Complexity"));

        params.pattern_type = PatternType::Wave;
        let wave = params.summary();
        assert!(wave.contains("Complexity: 0.50"));
        assert!(wave.contains("Distortion: 0.30"));
    }

    #[test]
    fn wrap_phase_handles_edges() {
        assert_eq!(wrap_phase(0.0), 0.0);
        assert_eq!(wrap_phase(TAU), 0.0);
        assert!(wrap_phase(-1e-18) < TAU);
        assert_eq!(wrap_phase(f64::INFINITY), 0.0);
        assert!((wrap_phase(-1.0) - (TAU - 1.0)).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn advancing_phases_stays_wrapped(
            step1 in -50.0f64..50.0,
            step2 in -50.0f64..50.0,
            ticks in 1usize..200,
        ) {
            let mut params = PatternParameters::default();
            for _ in 0..ticks {
                params.advance_phases(step1, step2);
                prop_assert!((0.0..TAU).contains(&params.phase1));
                prop_assert!((0.0..TAU).contains(&params.phase2));
            }
        }
    }
}
