use serde::{Deserialize, Serialize};

use crate::types::MaterialId;

/// A single building material loaded from RON data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Stable material ID.
    pub id: MaterialId,
    /// Human-readable name for debug display.
    pub name: String,
    /// Stability lost per supported hop (0.05 for metal up to ~0.25 for thatch).
    pub stability_decay: f32,
    /// Cap on the stability any piece of this material can report.
    #[serde(default = "default_max_stability")]
    pub max_stability: f32,
    /// Valid with zero supporters (banners, lights, decorations).
    #[serde(default)]
    pub can_float: bool,
}

fn default_max_stability() -> f32 {
    1.0
}

impl Material {
    pub fn new(id: u16, name: &str, stability_decay: f32) -> Self {
        Self {
            id: MaterialId(id),
            name: name.to_string(),
            stability_decay,
            max_stability: 1.0,
            can_float: false,
        }
    }

    /// A non-structural material that holds `max_stability` without support.
    pub fn floating(id: u16, name: &str, max_stability: f32) -> Self {
        Self {
            id: MaterialId(id),
            name: name.to_string(),
            stability_decay: 0.0,
            max_stability,
            can_float: true,
        }
    }
}

/// Collection of material definitions indexed by ID.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    pub materials: Vec<Material>,
}

impl MaterialTable {
    pub fn new(materials: Vec<Material>) -> Self {
        Self { materials }
    }

    /// Look up a material by ID. Returns None if not found.
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: MaterialId) -> bool {
        self.get(id).is_some()
    }

    /// Number of materials.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
