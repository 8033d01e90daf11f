use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Compute strategies, listed from most to least preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// wgpu compute shader, one invocation per grid cell.
    Gpu,
    /// Whole-grid array expressions over `ndarray` meshgrids.
    Vectorized,
    /// Per-family kernels with constants baked in, statically dispatched.
    Compiled,
    /// Per-cell evaluation through `pattern::MoireCompositor`; always available.
    Reference,
}

impl BackendKind {
    pub const PREFERENCE: [BackendKind; 4] = [
        BackendKind::Gpu,
        BackendKind::Vectorized,
        BackendKind::Compiled,
        BackendKind::Reference,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Gpu => "gpu",
            BackendKind::Vectorized => "vectorized",
            BackendKind::Compiled => "compiled",
            BackendKind::Reference => "reference",
        }
    }

    pub fn is_accelerated(self) -> bool {
        matches!(self, BackendKind::Gpu)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gpu" | "wgpu" => Ok(BackendKind::Gpu),
            "vectorized" | "ndarray" | "simd" => Ok(BackendKind::Vectorized),
            "compiled" | "jit" => Ok(BackendKind::Compiled),
            "reference" | "cpu" | "scalar" => Ok(BackendKind::Reference),
            other => Err(format!(
                "unknown backend '{other}'; expected gpu, vectorized, compiled, or reference"
            )),
        }
    }
}

/// Backend requested by the caller at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Start at the best available variant and demote on failure.
    #[default]
    Auto,
    /// Pin a specific variant (manual override).
    Force(BackendKind),
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("backend must not be empty".to_string());
        }
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(BackendPreference::Auto);
        }
        trimmed.parse().map(BackendPreference::Force)
    }
}

/// How the active backend was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Automatic,
    /// Pinned by the caller. Automatic logic never promotes out of a manual
    /// selection, though failures still demote downward.
    Manual,
}

/// Pixel mapping applied by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterMode {
    /// `round((v + 1) / 2 * 255)`.
    #[default]
    Grayscale,
    /// Black above 0.5, white below -0.5, mid-gray otherwise.
    TriLevel,
}

impl FromStr for RasterMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grayscale" | "gray" | "grey" => Ok(RasterMode::Grayscale),
            "trilevel" | "tri-level" | "quantized" => Ok(RasterMode::TriLevel),
            other => Err(format!(
                "unknown raster mode '{other}'; expected grayscale or trilevel"
            )),
        }
    }
}

impl fmt::Display for RasterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterMode::Grayscale => f.write_str("grayscale"),
            RasterMode::TriLevel => f.write_str("trilevel"),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone, Default)]
pub struct RendererConfig {
    /// Which backend to start on.
    pub backend: BackendPreference,
    /// Pixel mapping for produced frames.
    pub raster: RasterMode,
}
