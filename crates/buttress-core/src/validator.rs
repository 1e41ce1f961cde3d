use std::collections::HashSet;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::material::MaterialTable;
use crate::types::MaterialId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Duplicate material ID {0}")]
    DuplicateMaterialId(MaterialId),
    #[error("Material '{name}' stability_decay {value} outside [0, 1]")]
    DecayOutOfRange { name: String, value: f32 },
    #[error("Material '{name}' max_stability {value} outside (0, 1]")]
    MaxStabilityOutOfRange { name: String, value: f32 },
    #[error("Config field '{field}' = {value} must be positive")]
    NonPositive { field: &'static str, value: f32 },
    #[error("Config field '{field}' = {value} outside [0, 1]")]
    NotAFraction { field: &'static str, value: f32 },
    #[error("Scheduler interval '{field}' must be at least 1")]
    ZeroInterval { field: &'static str },
}

/// Validate a material table for ID uniqueness and value ranges.
pub fn validate_materials(table: &MaterialTable) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen_ids = HashSet::new();
    for mat in &table.materials {
        if !seen_ids.insert(mat.id) {
            errors.push(ValidationError::DuplicateMaterialId(mat.id));
        }
    }

    for mat in &table.materials {
        if !(0.0..=1.0).contains(&mat.stability_decay) {
            errors.push(ValidationError::DecayOutOfRange {
                name: mat.name.clone(),
                value: mat.stability_decay,
            });
        }
        if !(mat.max_stability > 0.0 && mat.max_stability <= 1.0) {
            errors.push(ValidationError::MaxStabilityOutOfRange {
                name: mat.name.clone(),
                value: mat.max_stability,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate tuning values of an engine configuration.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive = [
        ("vertical_decay_factor", config.vertical_decay_factor),
        ("horizontal_decay_factor", config.horizontal_decay_factor),
        ("cantilever_decay_factor", config.cantilever_decay_factor),
    ];
    for (field, value) in positive {
        if !(value > 0.0) {
            errors.push(ValidationError::NonPositive { field, value });
        }
    }
    if config.cantilever_offset < 0.0 {
        errors.push(ValidationError::NonPositive {
            field: "cantilever_offset",
            value: config.cantilever_offset,
        });
    }

    let fractions = [
        ("min_placement_stability", config.min_placement_stability),
        ("collapse_threshold", config.collapse_threshold),
        ("cache.target_occupancy", config.cache.target_occupancy),
    ];
    for (field, value) in fractions {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::NotAFraction { field, value });
        }
    }

    let intervals = [
        ("normal_interval", config.scheduler.normal_interval),
        ("low_interval", config.scheduler.low_interval),
        ("background_interval", config.scheduler.background_interval),
    ];
    for (field, value) in intervals {
        if value == 0 {
            errors.push(ValidationError::ZeroInterval { field });
        }
    }

    if let Some(zone) = &config.scheduler.zone {
        if !(zone.cell_size > 0.0) {
            errors.push(ValidationError::NonPositive {
                field: "zone.cell_size",
                value: zone.cell_size,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
