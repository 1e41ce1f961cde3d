use thiserror::Error;

use crate::config::EngineConfig;
use crate::material::{Material, MaterialTable};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to parse materials RON: {0}")]
    MaterialParseError(String),
    #[error("Failed to parse engine config RON: {0}")]
    ConfigParseError(String),
}

/// Default material set shipped in `data/materials.ron`.
pub const DEFAULT_MATERIALS_RON: &str = include_str!("../../../data/materials.ron");

/// Default engine settings shipped in `data/engine.ron`.
pub const DEFAULT_ENGINE_RON: &str = include_str!("../../../data/engine.ron");

/// Parse a single materials RON string into a MaterialTable.
pub fn load_materials_from_str(ron_str: &str) -> Result<MaterialTable, LoadError> {
    let options = ron::Options::default();
    let materials: Vec<Material> = options
        .from_str(ron_str)
        .map_err(|e| LoadError::MaterialParseError(e.to_string()))?;
    Ok(MaterialTable { materials })
}

/// Parse an engine configuration. Omitted fields take their defaults.
pub fn load_config_from_str(ron_str: &str) -> Result<EngineConfig, LoadError> {
    let options = ron::Options::default();
    options
        .from_str(ron_str)
        .map_err(|e| LoadError::ConfigParseError(e.to_string()))
}

/// The shipped material table.
pub fn default_materials() -> Result<MaterialTable, LoadError> {
    load_materials_from_str(DEFAULT_MATERIALS_RON)
}
