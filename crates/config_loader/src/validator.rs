//! Blueprint validation
//!
//! Rules:
//! - sensor id non-empty
//! - lidar description passes its own field and schema checks
//! - tick_duration_s finite and > 0, motion finite
//! - scene object ids unique, shapes well-formed
//! - sink names non-empty and unique, queue_capacity > 0

use std::collections::HashSet;

use contracts::{ContractError, LidarBlueprint, Location, ShapeConfig, MAX_RAYS_PER_TICK};
use validator::Validate;

/// Validate a LidarBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &LidarBlueprint) -> Result<(), ContractError> {
    validate_sensor(blueprint)?;
    validate_simulation(blueprint)?;
    validate_scene(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_sensor(blueprint: &LidarBlueprint) -> Result<(), ContractError> {
    let sensor = &blueprint.sensor;
    if sensor.id.trim().is_empty() {
        return Err(ContractError::config_validation(
            "sensor.id",
            "sensor id must not be empty",
        ));
    }

    let Err(errors) = sensor.description.validate() else {
        return Ok(());
    };

    // Report the first failing field in a stable order
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .first()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .unwrap_or_default();
            (field.to_string(), message)
        })
        .collect();
    fields.sort();
    let Some((field, message)) = fields.into_iter().next() else {
        return Err(ContractError::config_validation(
            "sensor.description",
            errors.to_string(),
        ));
    };

    let path = if field == "__all__" {
        "sensor.description".to_string()
    } else {
        format!("sensor.description.{field}")
    };
    Err(ContractError::config_validation(path, message))
}

fn validate_simulation(blueprint: &LidarBlueprint) -> Result<(), ContractError> {
    let simulation = &blueprint.simulation;

    if !simulation.tick_duration_s.is_finite() || simulation.tick_duration_s <= 0.0 {
        return Err(ContractError::config_validation(
            "simulation.tick_duration_s",
            format!(
                "tick_duration_s must be finite and > 0, got {}",
                simulation.tick_duration_s
            ),
        ));
    }

    let rays = blueprint.rays_per_tick();
    if rays > MAX_RAYS_PER_TICK {
        return Err(ContractError::config_validation(
            "simulation.tick_duration_s",
            format!("tick requests {rays} rays, limit is {MAX_RAYS_PER_TICK}"),
        ));
    }

    if let Some(motion) = &simulation.motion {
        if !is_finite_location(&motion.velocity) || !motion.yaw_rate_deg_s.is_finite() {
            return Err(ContractError::config_validation(
                "simulation.motion",
                "motion values must be finite",
            ));
        }
    }

    Ok(())
}

fn validate_scene(blueprint: &LidarBlueprint) -> Result<(), ContractError> {
    let scene = &blueprint.scene;
    let mut seen = HashSet::new();

    if let Some(ground) = &scene.ground {
        if !ground.height.is_finite() {
            return Err(ContractError::config_validation(
                "scene.ground.height",
                "ground height must be finite",
            ));
        }
        if let Some(id) = ground.object_id {
            seen.insert(id);
        }
    }

    for (index, object) in scene.objects.iter().enumerate() {
        if let Some(id) = object.object_id {
            if !seen.insert(id) {
                return Err(ContractError::config_validation(
                    format!("scene.objects[{index}].object_id"),
                    format!("duplicate object_id {id}"),
                ));
            }
        }

        match object.shape {
            ShapeConfig::Sphere { center, radius } => {
                if !is_finite_location(&center) {
                    return Err(ContractError::config_validation(
                        format!("scene.objects[{index}].center"),
                        "sphere center must be finite",
                    ));
                }
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(ContractError::config_validation(
                        format!("scene.objects[{index}].radius"),
                        format!("radius must be finite and > 0, got {radius}"),
                    ));
                }
            }
            ShapeConfig::Box { min, max } => {
                if !is_finite_location(&min) || !is_finite_location(&max) {
                    return Err(ContractError::config_validation(
                        format!("scene.objects[{index}]"),
                        "box corners must be finite",
                    ));
                }
                if min.x > max.x || min.y > max.y || min.z > max.z {
                    return Err(ContractError::config_validation(
                        format!("scene.objects[{index}].min"),
                        "box min must be <= max on every axis",
                    ));
                }
            }
        }
    }

    Ok(())
}

fn validate_sinks(blueprint: &LidarBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sink in &blueprint.sinks {
        if sink.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                "sinks[].name",
                "sink name must not be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}

fn is_finite_location(l: &Location) -> bool {
    l.x.is_finite() && l.y.is_finite() && l.z.is_finite()
}
