use std::fmt;
use std::path::Path;
use std::time::Duration;

use pattern::PatternParameters;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Startup configuration. Read once; never written back.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MoireConfig {
    pub version: u32,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub animation: AnimationSettings,
    #[serde(default)]
    pub pattern: PatternParameters,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RenderSettings {
    #[serde(default, deserialize_with = "deserialize_backend_opt")]
    pub backend: Option<BackendSetting>,
    #[serde(default)]
    pub raster: Option<RasterSetting>,
    /// Display size in pixels, as `"1600x1200"` or `[1600, 1200]`.
    #[serde(default, deserialize_with = "deserialize_viewport_opt")]
    pub viewport: Option<(i64, i64)>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimationSettings {
    #[serde(
        default = "default_cadence",
        deserialize_with = "deserialize_duration"
    )]
    pub cadence: Duration,
    #[serde(default = "default_phase1_step")]
    pub phase1_step: f64,
    #[serde(default = "default_phase2_step")]
    pub phase2_step: f64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            cadence: default_cadence(),
            phase1_step: default_phase1_step(),
            phase2_step: default_phase2_step(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSetting {
    Auto,
    Gpu,
    Vectorized,
    Compiled,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterSetting {
    Grayscale,
    #[serde(alias = "tri-level")]
    TriLevel,
}

fn default_cadence() -> Duration {
    Duration::from_millis(17)
}

fn default_phase1_step() -> f64 {
    1.5
}

fn default_phase2_step() -> f64 {
    1.2
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_backend_opt<'de, D>(deserializer: D) -> Result<Option<BackendSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|raw| parse_backend(&raw).map_err(de::Error::custom))
        .transpose()
}

fn parse_backend(raw: &str) -> Result<BackendSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(BackendSetting::Auto),
        "gpu" | "wgpu" => Ok(BackendSetting::Gpu),
        "vectorized" | "ndarray" | "simd" => Ok(BackendSetting::Vectorized),
        "compiled" | "jit" => Ok(BackendSetting::Compiled),
        "reference" | "cpu" | "scalar" => Ok(BackendSetting::Reference),
        other => Err(format!("invalid backend '{other}'")),
    }
}

fn deserialize_viewport_opt<'de, D>(deserializer: D) -> Result<Option<(i64, i64)>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Pair([i64; 2]),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_viewport(&raw).map_err(de::Error::custom)?),
        Some(Helper::Pair([w, h])) => Some((w, h)),
    };
    Ok(result)
}

/// Parses `WIDTHxHEIGHT` (also accepts `X` and `*` as the separator).
pub fn parse_viewport(raw: &str) -> Result<(i64, i64), String> {
    let trimmed = raw.trim();
    let (w, h) = trimmed
        .split_once(['x', 'X', '*'])
        .ok_or_else(|| format!("invalid viewport '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let w = w
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("invalid viewport width '{w}': {err}"))?;
    let h = h
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("invalid viewport height '{h}': {err}"))?;
    Ok((w, h))
}

impl MoireConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: MoireConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.animation.cadence.is_zero() {
            return Err(ConfigError::Invalid(
                "animation.cadence must be greater than zero".into(),
            ));
        }

        for (name, step) in [
            ("phase1_step", self.animation.phase1_step),
            ("phase2_step", self.animation.phase2_step),
        ] {
            if !step.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "animation.{name} must be a finite number"
                )));
            }
        }

        self.pattern
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("pattern: {err}")))?;

        Ok(())
    }
}

impl Default for MoireConfig {
    fn default() -> Self {
        Self {
            version: 1,
            render: RenderSettings::default(),
            animation: AnimationSettings::default(),
            pattern: PatternParameters::default(),
        }
    }
}
