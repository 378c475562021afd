//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{LidarBlueprint, ShapeConfig};
use scan_engine::LaserGeometry;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sensor: SensorInfo,
    simulation: SimulationInfo,
    scene: Vec<SceneObjectInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SensorInfo {
    id: String,
    channels: u32,
    range: f32,
    points_per_second: u32,
    rotation_frequency: f32,
    upper_fov: f32,
    lower_fov: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    vertical_angles: Vec<f32>,
}

#[derive(Serialize)]
struct SimulationInfo {
    tick_duration_s: f64,
    max_ticks: u64,
    realtime: bool,
    rays_per_tick: u64,
    /// Degrees swept per tick
    angle_per_tick: f64,
}

#[derive(Serialize)]
struct SceneObjectInfo {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_id: Option<u32>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args)?;
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &LidarBlueprint, args: &InfoArgs) -> Result<ConfigInfo> {
    let description = &blueprint.sensor.description;

    let vertical_angles = if args.channels {
        LaserGeometry::from_description(description)
            .context("Failed to build laser table")?
            .vertical_angles()
            .to_vec()
    } else {
        Vec::new()
    };

    let mut scene = Vec::new();
    if let Some(ground) = &blueprint.scene.ground {
        scene.push(SceneObjectInfo {
            kind: "ground",
            object_id: ground.object_id,
        });
    }
    scene.extend(blueprint.scene.objects.iter().map(|o| SceneObjectInfo {
        kind: match o.shape {
            ShapeConfig::Sphere { .. } => "sphere",
            ShapeConfig::Box { .. } => "box",
        },
        object_id: o.object_id,
    }));

    Ok(ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sensor: SensorInfo {
            id: blueprint.sensor.id.clone(),
            channels: description.channels,
            range: description.range,
            points_per_second: description.points_per_second,
            rotation_frequency: description.rotation_frequency,
            upper_fov: description.upper_fov,
            lower_fov: description.lower_fov,
            vertical_angles,
        },
        simulation: SimulationInfo {
            tick_duration_s: blueprint.simulation.tick_duration_s,
            max_ticks: blueprint.simulation.max_ticks,
            realtime: blueprint.simulation.realtime,
            rays_per_tick: blueprint.rays_per_tick(),
            angle_per_tick: f64::from(description.rotation_frequency)
                * 360.0
                * blueprint.simulation.tick_duration_s,
        },
        scene,
        sinks: blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect(),
    })
}

fn print_config_info(info: &ConfigInfo) {
    let sensor = &info.sensor;
    println!("=== LiDAR Configuration ({}) ===\n", info.version);

    println!("Sensor: {}", sensor.id);
    println!("  Channels: {}", sensor.channels);
    println!("  Range: {} m", sensor.range);
    println!("  Points per second: {}", sensor.points_per_second);
    println!("  Rotation: {} Hz", sensor.rotation_frequency);
    println!("  FOV: [{}, {}] deg", sensor.lower_fov, sensor.upper_fov);
    if !sensor.vertical_angles.is_empty() {
        println!("  Vertical angles:");
        for (channel, angle) in sensor.vertical_angles.iter().enumerate() {
            println!("    {:>3}: {:>8.3}", channel, angle);
        }
    }

    let sim = &info.simulation;
    println!("\nSimulation");
    println!("  Tick: {} s", sim.tick_duration_s);
    println!("  Rays per tick: {}", sim.rays_per_tick);
    println!("  Sweep per tick: {:.2} deg", sim.angle_per_tick);
    if sim.max_ticks > 0 {
        println!("  Max ticks: {}", sim.max_ticks);
    }
    println!("  Realtime: {}", sim.realtime);

    println!("\nScene ({} objects)", info.scene.len());
    for object in &info.scene {
        match object.object_id {
            Some(id) => println!("  - {} (id {})", object.kind, id),
            None => println!("  - {} (unregistered)", object.kind),
        }
    }

    if !info.sinks.is_empty() {
        println!("\nSinks ({})", info.sinks.len());
        for sink in &info.sinks {
            println!(
                "  - {} ({}, queue {})",
                sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}
