use buttress_core::types::{MaterialId, Orientation, PieceId, PieceSpec};
use glam::Vec3;

/// Horizontal distance between neighbouring towers.
const TOWER_SPACING: f32 = 3.0;

/// Wood, stone, metal.
const TOWER_MATERIALS: [u16; 3] = [1, 2, 3];

/// Configuration for a single benchmark scene.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub name: String,
    pub towers: u32,
    pub levels: u32,
}

impl SceneConfig {
    pub fn piece_count(&self) -> u32 {
        self.towers * self.levels
    }
}

/// Standard suite: `towers` towers at increasing heights.
pub fn standard_scenes(towers: u32) -> Vec<SceneConfig> {
    [4, 8, 16, 32]
        .into_iter()
        .map(|levels| SceneConfig {
            name: format!("{towers}x{levels}"),
            towers,
            levels,
        })
        .collect()
}

/// Square-ish grid of towers. Levels alternate floor and wall so both decay
/// factors are exercised; each tower gets a deterministic material.
pub fn build_tower_grid(config: &SceneConfig) -> Vec<PieceSpec> {
    let side = (config.towers as f32).sqrt().ceil().max(1.0) as u32;
    let mut specs = Vec::with_capacity(config.piece_count() as usize);

    for tower in 0..config.towers {
        let x = (tower % side) as f32 * TOWER_SPACING;
        let z = (tower / side) as f32 * TOWER_SPACING;
        let hash = (tower as usize).wrapping_mul(31337) % TOWER_MATERIALS.len();
        let material = MaterialId(TOWER_MATERIALS[hash]);

        for level in 0..config.levels {
            let orientation = if level % 2 == 0 {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            specs.push(PieceSpec {
                id: piece_id(config, tower, level),
                position: Vec3::new(x, level as f32 + 0.5, z),
                size: Vec3::ONE,
                orientation,
                material,
                grounded: level == 0,
            });
        }
    }
    specs
}

/// Id of the piece at `level` of `tower`.
pub fn piece_id(config: &SceneConfig, tower: u32, level: u32) -> PieceId {
    PieceId(tower * config.levels + level)
}
