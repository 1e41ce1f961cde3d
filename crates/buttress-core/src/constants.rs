//! Single source of truth for tuning defaults.
//! `EngineConfig::default()` and the shipped `data/engine.ron` both read from
//! here; the RON file may override any of them.

/// Stability of a piece resting directly on terrain.
pub const GROUNDED_STABILITY: f32 = 1.0;

/// Decay multiplier for vertical pieces (walls, pillars).
pub const VERTICAL_DECAY_FACTOR: f32 = 0.6;

/// Decay multiplier for horizontal pieces (floors, roofs).
pub const HORIZONTAL_DECAY_FACTOR: f32 = 1.0;

/// Decay multiplier applied across a cantilevered support relation.
pub const CANTILEVER_DECAY_FACTOR: f32 = 1.5;

/// Horizontal center offset (world units) above which support is cantilevered.
pub const CANTILEVER_OFFSET: f32 = 0.5;

/// Vertical gap tolerated between a supporter's top and a piece's bottom.
pub const SUPPORT_TOLERANCE: f32 = 0.1;

/// Minimum stability a placement must reach to be accepted.
pub const MIN_PLACEMENT_STABILITY: f32 = 0.1;

/// Pieces strictly below this stability collapse when a supporter is removed.
pub const COLLAPSE_THRESHOLD: f32 = 0.05;

/// Cache entry cap before eviction starts.
pub const CACHE_MAX_ENTRIES: usize = 10_000;

/// Cache entries older than this many ticks are expired first on eviction.
pub const CACHE_MAX_AGE_TICKS: u64 = 600;

/// Fraction of `CACHE_MAX_ENTRIES` the LRU phase trims down to.
pub const CACHE_TARGET_OCCUPANCY: f32 = 0.7;

/// Upper bound on recomputations per scheduler tick.
pub const MAX_UPDATES_PER_TICK: usize = 256;

/// Normal-priority bucket is serviced every Nth tick.
pub const NORMAL_INTERVAL: u64 = 2;

/// Low-priority bucket is serviced every Nth tick.
pub const LOW_INTERVAL: u64 = 5;

/// Background bucket is serviced every Nth tick.
pub const BACKGROUND_INTERVAL: u64 = 10;

/// Side length of a zone-gating cell on the ground plane.
pub const ZONE_CELL_SIZE: f32 = 32.0;

/// Active radius around the focus cell, in cells.
pub const ZONE_ACTIVE_RADIUS: i32 = 3;

/// A due decimated bucket is guaranteed `max_per_tick / N` slots (at least one).
pub const LOWER_BUCKET_SHARE_DIVISOR: usize = 8;
