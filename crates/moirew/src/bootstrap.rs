use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use moireconfig::{BackendSetting, MoireConfig, RasterSetting};
use pattern::{PatternParameters, PatternType};
use renderer::{BackendKind, BackendPreference, RasterMode, RendererConfig};

use crate::cli::{OutputArgs, PatternArgs};

/// Display size used when neither the config nor the flags name one.
pub const DEFAULT_VIEWPORT: (i64, i64) = (800, 800);

pub fn load_config(path: Option<&Path>) -> Result<MoireConfig> {
    match path {
        Some(path) => {
            let config = MoireConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded moirew config");
            Ok(config)
        }
        None => Ok(MoireConfig::default()),
    }
}

/// Layers preset and flag overrides on top of the configured parameters.
pub fn resolve_params(config: &MoireConfig, args: &PatternArgs) -> Result<PatternParameters> {
    let mut params = config.pattern.clone();
    if let Some(preset) = args.preset {
        params.apply_preset(preset);
    }
    if let Some(kind) = args.pattern_type {
        params.pattern_type = kind;
    }
    override_with(&mut params.freq1, args.freq1);
    override_with(&mut params.freq2, args.freq2);
    override_with(&mut params.angle1, args.angle1);
    override_with(&mut params.angle2, args.angle2);
    override_with(&mut params.center, args.center);
    override_with(&mut params.radius, args.radius);
    params.set_phases(
        args.phase1.unwrap_or(params.phase1),
        args.phase2.unwrap_or(params.phase2),
    );

    let (complexity, distortion) = match params.pattern_type {
        PatternType::Wave => (&mut params.wave_complexity, &mut params.wave_distortion),
        PatternType::TreeRings => (&mut params.rings_complexity, &mut params.rings_distortion),
        other => {
            if args.complexity.is_some() || args.distortion.is_some() {
                tracing::warn!(pattern = %other, "complexity/distortion only apply to wave and tree-rings; ignoring");
            }
            params.validate().context("invalid pattern parameters")?;
            return Ok(params);
        }
    };
    override_with(complexity, args.complexity);
    override_with(distortion, args.distortion);

    params.validate().context("invalid pattern parameters")?;
    Ok(params)
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

pub fn renderer_config(config: &MoireConfig, args: &OutputArgs) -> RendererConfig {
    let backend = args
        .backend
        .or_else(|| config.render.backend.map(map_backend))
        .unwrap_or_default();
    let raster = args
        .raster
        .or_else(|| config.render.raster.map(map_raster))
        .unwrap_or_default();
    RendererConfig { backend, raster }
}

pub fn resolve_viewport(config: &MoireConfig, args: &OutputArgs) -> (i64, i64) {
    args.viewport
        .or(config.render.viewport)
        .unwrap_or(DEFAULT_VIEWPORT)
}

pub fn resolve_cadence(config: &MoireConfig, cadence_ms: Option<u64>) -> Duration {
    cadence_ms
        .map(Duration::from_millis)
        .unwrap_or(config.animation.cadence)
}

fn map_backend(setting: BackendSetting) -> BackendPreference {
    match setting {
        BackendSetting::Auto => BackendPreference::Auto,
        BackendSetting::Gpu => BackendPreference::Force(BackendKind::Gpu),
        BackendSetting::Vectorized => BackendPreference::Force(BackendKind::Vectorized),
        BackendSetting::Compiled => BackendPreference::Force(BackendKind::Compiled),
        BackendSetting::Reference => BackendPreference::Force(BackendKind::Reference),
    }
}

fn map_raster(setting: RasterSetting) -> RasterMode {
    match setting {
        RasterSetting::Grayscale => RasterMode::Grayscale,
        RasterSetting::TriLevel => RasterMode::TriLevel,
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use pattern::Preset;

    use super::*;

    const CONFIG: &str = r#"
version = 1

[render]
backend = "compiled"
raster = "trilevel"
viewport = "1024x768"

[pattern]
type = "wave"
freq1 = 4
wave_complexity = 0.9
"#;

    #[test]
    fn flags_override_config() {
        let config = MoireConfig::from_toml_str(CONFIG).unwrap();
        let args = PatternArgs {
            freq2: Some(7.5),
            complexity: Some(0.1),
            phase1: Some(TAU + 1.0),
            ..PatternArgs::default()
        };
        let params = resolve_params(&config, &args).unwrap();
        assert_eq!(params.pattern_type, PatternType::Wave);
        assert_eq!(params.freq1, 4.0);
        assert_eq!(params.freq2, 7.5);
        assert_eq!(params.wave_complexity, 0.1);
        assert_eq!(params.wave_distortion, 0.3);
        assert!((params.phase1 - 1.0).abs() < 1e-12);

        let output = OutputArgs {
            raster: Some(RasterMode::Grayscale),
            ..OutputArgs::default()
        };
        let renderer = renderer_config(&config, &output);
        assert_eq!(renderer.raster, RasterMode::Grayscale);
        assert_eq!(
            renderer.backend,
            BackendPreference::Force(BackendKind::Compiled)
        );
        assert_eq!(resolve_viewport(&config, &output), (1024, 768));
    }

    #[test]
    fn preset_replaces_configured_pattern() {
        let config = MoireConfig::from_toml_str(CONFIG).unwrap();
        let args = PatternArgs {
            preset: Some(Preset::Circular),
            ..PatternArgs::default()
        };
        let params = resolve_params(&config, &args).unwrap();
        assert_eq!(params.pattern_type, PatternType::Circular);
        assert_eq!((params.freq1, params.freq2), (5.0, 6.0));
    }

    #[test]
    fn defaults_without_config() {
        let config = MoireConfig::default();
        let output = OutputArgs::default();
        assert_eq!(resolve_viewport(&config, &output), DEFAULT_VIEWPORT);
        assert_eq!(renderer_config(&config, &output).backend, BackendPreference::Auto);
        assert_eq!(resolve_cadence(&config, None), Duration::from_millis(17));
        assert_eq!(resolve_cadence(&config, Some(5)), Duration::from_millis(5));
    }

    #[test]
    fn config_and_flags_accept_the_same_backend_names() {
        let names = [
            "auto", "AUTO", " gpu ", "wgpu", "vectorized", "ndarray", "simd", "compiled",
            "jit", "reference", "cpu", "scalar", "default", "hybrid", "",
        ];
        for name in names {
            let toml = format!("version = 1\n[render]\nbackend = \"{name}\"\n");
            let from_config = MoireConfig::from_toml_str(&toml)
                .ok()
                .map(|config| renderer_config(&config, &OutputArgs::default()).backend);
            let from_flag = crate::cli::parse_backend(name).ok();
            assert_eq!(from_config, from_flag, "backend name {name:?}");
        }
    }

    #[test]
    fn rejects_invalid_overrides() {
        let args = PatternArgs {
            freq1: Some(0.0),
            ..PatternArgs::default()
        };
        assert!(resolve_params(&MoireConfig::default(), &args).is_err());
    }
}
