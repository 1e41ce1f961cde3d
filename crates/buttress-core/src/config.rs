//! Engine configuration. Immutable once handed to the engine: switching modes
//! builds a new value via [`EngineConfig::with_mode`].

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StabilityMode {
    /// Binary: connected to ground or not.
    Arcade,
    /// Decay per supported hop.
    #[default]
    Heuristic,
    /// Arcade rule gates placement, heuristic score is reported.
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: StabilityMode,
    /// Decay multiplier for vertical pieces.
    pub vertical_decay_factor: f32,
    /// Decay multiplier for horizontal pieces.
    pub horizontal_decay_factor: f32,
    /// Decay multiplier across cantilevered relations.
    pub cantilever_decay_factor: f32,
    /// Horizontal center offset past which a relation is cantilevered.
    pub cantilever_offset: f32,
    /// Vertical gap tolerance handed to the support finder.
    pub support_tolerance: f32,
    /// Placements scoring below this are rejected (heuristic mode).
    pub min_placement_stability: f32,
    /// Dependents strictly below this fall when a supporter is removed (heuristic mode).
    pub collapse_threshold: f32,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: StabilityMode::default(),
            vertical_decay_factor: VERTICAL_DECAY_FACTOR,
            horizontal_decay_factor: HORIZONTAL_DECAY_FACTOR,
            cantilever_decay_factor: CANTILEVER_DECAY_FACTOR,
            cantilever_offset: CANTILEVER_OFFSET,
            support_tolerance: SUPPORT_TOLERANCE,
            min_placement_stability: MIN_PLACEMENT_STABILITY,
            collapse_threshold: COLLAPSE_THRESHOLD,
            cache: CacheConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Same configuration under a different scoring mode.
    pub fn with_mode(&self, mode: StabilityMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry count that triggers eviction.
    pub max_entries: usize,
    /// Entries older than this (in scheduler ticks) go first.
    pub max_age_ticks: u64,
    /// LRU phase trims to `max_entries * target_occupancy`.
    pub target_occupancy: f32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: CACHE_MAX_ENTRIES,
            max_age_ticks: CACHE_MAX_AGE_TICKS,
            target_occupancy: CACHE_TARGET_OCCUPANCY,
        }
    }
}

impl CacheConfig {
    /// Occupancy the LRU phase trims down to.
    pub fn target_entries(&self) -> usize {
        (self.max_entries as f32 * self.target_occupancy).floor() as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Recomputations allowed per tick regardless of time left.
    pub max_per_tick: usize,
    pub normal_interval: u64,
    pub low_interval: u64,
    pub background_interval: u64,
    /// Spatial gating for large worlds. None disables it.
    pub zone: Option<ZoneConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_per_tick: MAX_UPDATES_PER_TICK,
            normal_interval: NORMAL_INTERVAL,
            low_interval: LOW_INTERVAL,
            background_interval: BACKGROUND_INTERVAL,
            zone: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Side length of a ground-plane cell in world units.
    pub cell_size: f32,
    /// Chebyshev radius, in cells, around the focus cell that stays active.
    pub active_radius: i32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            cell_size: ZONE_CELL_SIZE,
            active_radius: ZONE_ACTIVE_RADIUS,
        }
    }
}
