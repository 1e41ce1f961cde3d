use thiserror::Error;

use crate::types::{MaterialId, PieceId};

/// Errors surfaced by graph mutation and engine construction.
///
/// Rejected placements are not errors; they come back as a result value with
/// `valid: false`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StabilityError {
    #[error("unknown piece {0}")]
    UnknownPiece(PieceId),

    #[error("piece {0} already exists")]
    DuplicatePiece(PieceId),

    #[error("piece {0} cannot support itself")]
    SelfSupport(PieceId),

    #[error("unknown material {0}")]
    UnknownMaterial(MaterialId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure reported by a host collaborator (support finder, ground probe).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator timed out")]
    Timeout,
}
