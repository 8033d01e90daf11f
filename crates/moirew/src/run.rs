use std::time::Instant;

use anyhow::{Context, Result};
use moireconfig::MoireConfig;
use renderer::{probe_report, write_png, ComputeBackend, MoireRenderer, RenderError};
use scheduler::{AnimationDriver, PhaseSteps, TickOutcome};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::{
    load_config, renderer_config, resolve_cadence, resolve_params, resolve_viewport,
};
use crate::cli::{AnimateArgs, BackendsArgs, Cli, Command, RenderArgs};

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Render(args) => run_render(&config, args),
        Command::Animate(args) => run_animate(&config, args),
        Command::Backends(args) => run_backends(args),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_render(config: &MoireConfig, args: RenderArgs) -> Result<()> {
    let params = resolve_params(config, &args.pattern)?;
    let viewport = resolve_viewport(config, &args.output);
    let mut renderer = MoireRenderer::new(renderer_config(config, &args.output));

    let frame = renderer
        .render_frame(&params, viewport)
        .context("failed to render frame")?;
    write_png(&frame.pixels, &args.output_file)?;

    tracing::info!(
        path = %args.output_file.display(),
        backend = %frame.backend,
        width = frame.resolution.0,
        height = frame.resolution.1,
        "frame written"
    );
    println!("{}", frame.info);
    println!("Backend: {}", frame.backend);
    println!("{}", frame.fps);
    Ok(())
}

fn run_animate(config: &MoireConfig, args: AnimateArgs) -> Result<()> {
    let mut params = resolve_params(config, &args.pattern)?;
    let viewport = resolve_viewport(config, &args.output);
    let cadence = resolve_cadence(config, args.cadence_ms);
    let mut renderer = MoireRenderer::new(renderer_config(config, &args.output));
    let mut driver = AnimationDriver::new(
        cadence,
        PhaseSteps {
            phase1_step: config.animation.phase1_step,
            phase2_step: config.animation.phase2_step,
        },
    )
    .context("invalid animation settings")?;

    if let Some(dir) = args.output_dir.as_deref() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    tracing::info!(
        cadence = ?cadence,
        frames = ?args.frames,
        backend = %renderer.backend().active(),
        "starting animation"
    );

    driver.start(Instant::now());
    let ticker = crossbeam_channel::tick(cadence);
    let output_dir = args.output_dir.as_deref();
    let mut written: u64 = 0;
    let mut last_status = String::new();
    while args.frames.map_or(true, |limit| driver.ticks() < limit) {
        ticker.recv().context("animation ticker disconnected")?;
        let outcome = driver.poll(Instant::now(), &mut params, |params| {
            let frame = renderer.render_frame(params, viewport)?;
            last_status = format!("{} ({})", frame.fps, frame.backend);
            if let Some(dir) = output_dir {
                write_png(&frame.pixels, &dir.join(format!("frame_{written:05}.png")))?;
                written += 1;
            }
            Ok::<(), RenderError>(())
        });
        if let TickOutcome::Ticked { tick, coalesced } = outcome.context("animation stopped")? {
            tracing::debug!(tick, coalesced, status = %last_status, "animation tick");
        }
    }

    driver.stop();
    tracing::info!(
        ticks = driver.ticks(),
        written,
        status = %last_status,
        "animation finished"
    );
    Ok(())
}

fn run_backends(args: BackendsArgs) -> Result<()> {
    let report = probe_report();
    let backend = ComputeBackend::probe();
    let capabilities = backend.capabilities();

    if args.json {
        let json = serde_json::json!({
            "active": backend.active(),
            "probe": report,
            "backends": capabilities,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("failed to encode backend report")?
        );
        return Ok(());
    }

    for cap in &capabilities {
        let marker = if cap.active { "*" } else { " " };
        let status = if cap.available {
            "available"
        } else {
            "unavailable"
        };
        println!(
            "{marker} {:<10} {:<11} {}",
            cap.kind.as_str(),
            status,
            cap.detail
        );
    }
    Ok(())
}
