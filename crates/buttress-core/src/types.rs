use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Stable identifier for a structural piece. Assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(pub u32);

impl std::fmt::Display for PieceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Newtype for material identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub u16);

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "material {}", self.0)
    }
}

/// Orientation class of a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Floors, roofs, ceilings, stairs.
    Horizontal,
    /// Walls, pillars, doorframes.
    Vertical,
}

/// Axis-aligned bounds in world space. Y is up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Bounds of a box of `size` centered on `center`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Whether the XZ footprints of the two boxes overlap with positive area.
    pub fn horizontal_overlap(&self, other: &Bounds) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.z < other.max.z
            && other.min.z < self.max.z
    }

    /// Distance between the two centers projected onto the ground plane.
    pub fn horizontal_offset(&self, other: &Bounds) -> f32 {
        let a = self.center();
        let b = other.center();
        glam::Vec2::new(a.x - b.x, a.z - b.z).length()
    }
}

/// A structural element tracked by the support graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    /// World position. Only `y` orders work (bottom-up recomputation).
    pub position: Vec3,
    pub bounds: Bounds,
    pub orientation: Orientation,
    pub material: MaterialId,
    /// Rests directly on terrain.
    pub grounded: bool,
    /// Damage state, 1.0 = intact. Caps the heuristic score of ungrounded pieces.
    pub health: f32,
}

impl Piece {
    pub fn new(id: PieceId, position: Vec3, size: Vec3, orientation: Orientation) -> Self {
        Self {
            id,
            position,
            bounds: Bounds::from_center_size(position, size),
            orientation,
            material: MaterialId::default(),
            grounded: false,
            health: 1.0,
        }
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    pub fn grounded(mut self, grounded: bool) -> Self {
        self.grounded = grounded;
        self
    }

    pub fn height(&self) -> f32 {
        self.position.y
    }
}

/// Placement request for a piece that is not yet part of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceSpec {
    pub id: PieceId,
    pub position: Vec3,
    pub size: Vec3,
    pub orientation: Orientation,
    pub material: MaterialId,
    /// Used as-is when support detection is off; otherwise the ground probe decides.
    pub grounded: bool,
}

impl PieceSpec {
    pub fn bounds(&self) -> Bounds {
        Bounds::from_center_size(self.position, self.size)
    }

    pub fn to_piece(&self) -> Piece {
        Piece::new(self.id, self.position, self.size, self.orientation)
            .with_material(self.material)
            .grounded(self.grounded)
    }
}

/// Classification of a support relation (or of a grounded piece itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportType {
    /// The piece rests on terrain.
    Ground,
    /// Supported directly by a grounded piece.
    Foundation,
    /// A vertical piece held from below.
    Vertical,
    /// A horizontal piece held from below with its center over the supporter.
    Horizontal,
    /// Supported with a large horizontal offset from the supporter's center.
    Cantilever,
}

impl SupportType {
    /// Classify the relation `supporter -> supported` from geometry.
    pub fn classify(supporter: &Piece, supported: &Piece, cantilever_offset: f32) -> Self {
        if supporter.bounds.horizontal_offset(&supported.bounds) > cantilever_offset {
            SupportType::Cantilever
        } else if supporter.grounded {
            SupportType::Foundation
        } else if supported.orientation == Orientation::Vertical {
            SupportType::Vertical
        } else {
            SupportType::Horizontal
        }
    }

    pub fn is_cantilever(self) -> bool {
        self == SupportType::Cantilever
    }
}

/// Serializable projection of one piece's engine state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieceReport {
    pub id: PieceId,
    pub stability: f32,
    pub support_type: Option<SupportType>,
}
