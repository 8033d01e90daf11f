use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pattern::{PatternType, Preset};
use renderer::{BackendPreference, RasterMode};

#[derive(Parser, Debug)]
#[command(
    name = "moirew",
    author,
    version,
    about = "Moiré interference pattern renderer"
)]
pub struct Cli {
    /// Startup configuration TOML; flags override its values.
    #[arg(long, global = true, env = "MOIREW_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a single frame to a PNG file.
    Render(RenderArgs),
    /// Animate the phases and optionally write every frame to a directory.
    Animate(AnimateArgs),
    /// Show which compute backends are available on this machine.
    Backends(BackendsArgs),
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub pattern: PatternArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Destination PNG file.
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct AnimateArgs {
    #[command(flatten)]
    pub pattern: PatternArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Stop after this many ticks (runs until interrupted when omitted).
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,

    /// Write each frame as `frame_NNNNN.png` into this directory.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Tick interval in milliseconds; overrides `animation.cadence`.
    #[arg(long, value_name = "MILLISECONDS")]
    pub cadence_ms: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct BackendsArgs {
    /// Print the probe result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Pattern overrides layered on top of the configured parameters.
#[derive(Args, Debug, Default, Clone)]
pub struct PatternArgs {
    /// Start from a preset: `reset`, `circular`, or `spiral`.
    #[arg(long, value_name = "NAME", value_parser = parse_preset)]
    pub preset: Option<Preset>,

    /// Pattern family: linear, circular, radial, spiral, wave, tree-rings.
    #[arg(long = "type", short = 't', value_name = "TYPE", value_parser = parse_pattern_type)]
    pub pattern_type: Option<PatternType>,

    #[arg(long, value_name = "CYCLES")]
    pub freq1: Option<f64>,

    #[arg(long, value_name = "CYCLES")]
    pub freq2: Option<f64>,

    /// Degrees.
    #[arg(long, value_name = "DEGREES", allow_negative_numbers = true)]
    pub angle1: Option<f64>,

    /// Degrees.
    #[arg(long, value_name = "DEGREES", allow_negative_numbers = true)]
    pub angle2: Option<f64>,

    /// Radians; wrapped into [0, 2π).
    #[arg(long, value_name = "RADIANS", allow_negative_numbers = true)]
    pub phase1: Option<f64>,

    /// Radians; wrapped into [0, 2π).
    #[arg(long, value_name = "RADIANS", allow_negative_numbers = true)]
    pub phase2: Option<f64>,

    /// Center for circular, radial, and spiral patterns, as `X,Y`.
    #[arg(long, value_name = "X,Y", value_parser = parse_center, allow_hyphen_values = true)]
    pub center: Option<(f64, f64)>,

    #[arg(long, value_name = "RADIUS")]
    pub radius: Option<f64>,

    /// Complexity of the active wave or tree-rings family.
    #[arg(long, value_name = "AMOUNT")]
    pub complexity: Option<f64>,

    /// Distortion of the active wave or tree-rings family.
    #[arg(long, value_name = "AMOUNT")]
    pub distortion: Option<f64>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct OutputArgs {
    /// Display size in pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_viewport)]
    pub viewport: Option<(i64, i64)>,

    /// Pixel mapping: `grayscale` or `trilevel`.
    #[arg(long, value_name = "MODE", value_parser = parse_raster)]
    pub raster: Option<RasterMode>,

    /// Compute backend: `auto`, `gpu`, `vectorized`, `compiled`, or `reference`.
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<BackendPreference>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_preset(value: &str) -> Result<Preset, String> {
    value.parse().map_err(|err: pattern::PatternError| err.to_string())
}

pub fn parse_pattern_type(value: &str) -> Result<PatternType, String> {
    value.parse().map_err(|err: pattern::PatternError| err.to_string())
}

pub fn parse_backend(value: &str) -> Result<BackendPreference, String> {
    value.parse()
}

pub fn parse_raster(value: &str) -> Result<RasterMode, String> {
    value.parse()
}

pub fn parse_viewport(value: &str) -> Result<(i64, i64), String> {
    moireconfig::parse_viewport(value)
}

pub fn parse_center(value: &str) -> Result<(f64, f64), String> {
    let trimmed = value.trim();
    let (x, y) = trimmed
        .split_once(',')
        .ok_or_else(|| format!("invalid center '{trimmed}'; expected X,Y"))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|_| format!("invalid center x '{}'", x.trim()))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|_| format!("invalid center y '{}'", y.trim()))?;
    if !x.is_finite() || !y.is_finite() {
        return Err("center coordinates must be finite".to_string());
    }
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_render_flags() {
        let cli = Cli::try_parse_from([
            "moirew",
            "render",
            "--type",
            "spiral",
            "--center",
            "-0.5,1",
            "--phase1",
            "-1.0",
            "--viewport",
            "640x480",
            "--backend",
            "cpu",
            "-o",
            "out.png",
        ])
        .unwrap();
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.pattern.pattern_type, Some(PatternType::Spiral));
        assert_eq!(args.pattern.center, Some((-0.5, 1.0)));
        assert_eq!(args.pattern.phase1, Some(-1.0));
        assert_eq!(args.output.viewport, Some((640, 480)));
        assert_eq!(
            args.output.backend,
            Some(BackendPreference::Force(renderer::BackendKind::Reference))
        );
        assert_eq!(args.output_file, PathBuf::from("out.png"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_center("1;2").is_err());
        assert!(parse_center("nan,2").is_err());
        assert!(parse_pattern_type("hexagon").is_err());
        assert!(Cli::try_parse_from(["moirew", "render", "--raster", "sepia", "-o", "x.png"]).is_err());
    }
}
