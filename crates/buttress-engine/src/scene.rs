//! Host-side collaborators used to detect supports for a new piece.
//!
//! The engine never stores these. They are passed into each call that needs
//! geometry, so the host owns its spatial index outright.

use std::collections::HashMap;

use buttress_core::constants::SUPPORT_TOLERANCE;
use buttress_core::error::CollaboratorError;
use buttress_core::types::{Bounds, PieceId};

/// Finds existing pieces a box would rest on.
pub trait SupportFinder {
    /// Pieces whose top is within `tolerance` of the bottom of `bounds` and
    /// whose footprint overlaps it.
    fn find_supports(
        &self,
        bounds: &Bounds,
        tolerance: f32,
    ) -> Result<Vec<PieceId>, CollaboratorError>;
}

/// Answers whether a box rests on terrain.
pub trait GroundProbe {
    fn is_on_terrain(&self, bounds: &Bounds) -> Result<bool, CollaboratorError>;
}

/// Both collaborators in one object.
pub trait Surroundings: SupportFinder + GroundProbe {}

impl<T: SupportFinder + GroundProbe> Surroundings for T {}

/// Brute-force scene over flat terrain at `ground_height`.
#[derive(Debug, Clone)]
pub struct FlatScene {
    pub ground_height: f32,
    /// How far above the terrain a bottom face may sit and still count as grounded.
    pub tolerance: f32,
    boxes: HashMap<PieceId, Bounds>,
}

impl Default for FlatScene {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl FlatScene {
    pub fn new(ground_height: f32) -> Self {
        Self {
            ground_height,
            tolerance: SUPPORT_TOLERANCE,
            boxes: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: PieceId, bounds: Bounds) {
        self.boxes.insert(id, bounds);
    }

    pub fn remove(&mut self, id: PieceId) -> Option<Bounds> {
        self.boxes.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl SupportFinder for FlatScene {
    fn find_supports(
        &self,
        bounds: &Bounds,
        tolerance: f32,
    ) -> Result<Vec<PieceId>, CollaboratorError> {
        let mut found: Vec<PieceId> = self
            .boxes
            .iter()
            .filter(|(_, other)| {
                (other.max.y - bounds.min.y).abs() <= tolerance
                    && other.horizontal_overlap(bounds)
            })
            .map(|(id, _)| *id)
            .collect();
        found.sort_unstable();
        Ok(found)
    }
}

impl GroundProbe for FlatScene {
    fn is_on_terrain(&self, bounds: &Bounds) -> Result<bool, CollaboratorError> {
        Ok((bounds.min.y - self.ground_height).abs() <= self.tolerance)
    }
}
