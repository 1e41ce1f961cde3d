//! Shared value types for the buttress stability engine: piece and material
//! definitions, engine configuration, errors, and the RON data loader.

pub mod config;
pub mod constants;
pub mod error;
pub mod loader;
pub mod material;
pub mod types;
pub mod validator;

pub use config::{CacheConfig, EngineConfig, SchedulerConfig, StabilityMode, ZoneConfig};
pub use error::{CollaboratorError, StabilityError};
pub use material::{Material, MaterialTable};
pub use types::{
    Bounds, MaterialId, Orientation, Piece, PieceId, PieceReport, PieceSpec, SupportType,
};
