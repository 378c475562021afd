//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::LidarBlueprint;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        sensor_id = %blueprint.sensor.id,
        channels = blueprint.sensor.description.channels,
        tick_duration_s = blueprint.simulation.tick_duration_s,
        rays_per_tick = blueprint.rays_per_tick(),
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let max_ticks = blueprint.simulation.max_ticks;
    let pipeline_config = PipelineConfig {
        blueprint,
        max_ticks: if max_ticks == 0 { None } else { Some(max_ticks) },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        buffer_size: args.buffer_size,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting simulation...");
    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        ticks = stats.ticks,
        duration_secs = stats.duration.as_secs_f64(),
        "Simulation finished"
    );
    stats.print_summary();

    Ok(())
}

fn apply_overrides(blueprint: &mut LidarBlueprint, args: &RunArgs) {
    if let Some(max_ticks) = args.max_ticks {
        info!(max_ticks, "Overriding max_ticks from CLI");
        blueprint.simulation.max_ticks = max_ticks;
    }
    if let Some(tick) = args.tick {
        info!(tick_duration_s = tick, "Overriding tick duration from CLI");
        blueprint.simulation.tick_duration_s = tick;
    }
    if args.realtime {
        blueprint.simulation.realtime = true;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_config_summary(blueprint: &LidarBlueprint) {
    let description = &blueprint.sensor.description;
    let transform = &blueprint.sensor.transform;

    println!("\n=== Configuration Summary ===\n");
    println!("Sensor: {}", blueprint.sensor.id);
    println!(
        "  {} channels, {} m, {} pts/s, {} Hz, FOV [{}, {}] deg",
        description.channels,
        description.range,
        description.points_per_second,
        description.rotation_frequency,
        description.lower_fov,
        description.upper_fov
    );
    println!(
        "  Mount: ({}, {}, {}) pitch {} yaw {} roll {}",
        transform.location.x,
        transform.location.y,
        transform.location.z,
        transform.rotation.pitch,
        transform.rotation.yaw,
        transform.rotation.roll
    );
    println!("\nSimulation:");
    println!("  Tick: {} s", blueprint.simulation.tick_duration_s);
    println!("  Rays per tick: {}", blueprint.rays_per_tick());
    if blueprint.simulation.max_ticks > 0 {
        println!("  Max ticks: {}", blueprint.simulation.max_ticks);
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
