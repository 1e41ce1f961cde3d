//! Memoized stability scores with transitive invalidation.
//!
//! A score is fresh when it has an entry and is not in the dirty set.
//! Invalidating a piece evicts it and every transitive dependent and marks
//! them all dirty, so no stale dependent score can be read after a supporter
//! changed.
//!
//! Size is bounded by a two-phase eviction that runs after each miss once the
//! entry count passes `max_entries`: expired entries (older than
//! `max_age_ticks`) go first, then least-recently-accessed ones until the
//! count is back at `target_occupancy * max_entries`.

use std::collections::{HashMap, HashSet};

use buttress_core::config::CacheConfig;
use buttress_core::types::PieceId;
use buttress_graph::SupportGraph;

use crate::calculator::{ScoreContext, ScoreMemo};

/// One memoized score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    pub value: f32,
    /// Scheduler tick at which the score was computed.
    pub written_tick: u64,
    /// Access stamp for LRU ordering.
    pub last_access: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Scores actually computed (one miss can compute a whole supporter chain).
    pub computed: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

#[derive(Debug, Clone)]
pub struct StabilityCache {
    entries: HashMap<PieceId, CacheEntry>,
    dirty: HashSet<PieceId>,
    config: CacheConfig,
    tick: u64,
    access_clock: u64,
    stats: CacheStats,
}

impl StabilityCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            dirty: HashSet::new(),
            config,
            tick: 0,
            access_clock: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance the logical clock used for age-based expiry.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn is_dirty(&self, id: PieceId) -> bool {
        self.dirty.contains(&id)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    pub fn entry(&self, id: PieceId) -> Option<&CacheEntry> {
        self.entries.get(&id)
    }

    /// Fresh score without computing anything or touching access stamps.
    pub fn peek(&self, id: PieceId) -> Option<f32> {
        self.known(id)
    }

    /// Fresh score for `id`, computing (and caching) it and any unknown
    /// supporter scores on a miss. Unknown pieces score 0 and are not cached.
    pub fn get(&mut self, ctx: &ScoreContext<'_>, id: PieceId) -> f32 {
        if !self.dirty.contains(&id) {
            if let Some(entry) = self.entries.get_mut(&id) {
                self.access_clock += 1;
                entry.last_access = self.access_clock;
                self.stats.hits += 1;
                return entry.value;
            }
        }
        if !ctx.graph.contains(id) {
            return 0.0;
        }

        self.stats.misses += 1;
        let value = ctx.calculator.resolve(ctx, id, None, self);
        self.enforce_capacity();
        value
    }

    /// Evict `id` and every transitive dependent, marking them all dirty.
    /// Returns the dependents (not `id` itself) in BFS order.
    pub fn invalidate(&mut self, graph: &SupportGraph, id: PieceId) -> Vec<PieceId> {
        let dependents = graph.transitive_dependents(id);
        self.entries.remove(&id);
        if graph.contains(id) {
            self.dirty.insert(id);
        }
        for dependent in &dependents {
            self.entries.remove(dependent);
            self.dirty.insert(*dependent);
        }
        self.stats.invalidations += 1 + dependents.len() as u64;
        dependents
    }

    /// Drop every trace of a removed piece.
    pub fn forget(&mut self, id: PieceId) {
        self.entries.remove(&id);
        self.dirty.remove(&id);
    }

    /// Drop all entries and dirty marks. Stats and clocks are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirty.clear();
    }

    /// Run two-phase eviction if over capacity. Never called mid-resolve.
    pub fn enforce_capacity(&mut self) {
        if self.entries.len() <= self.config.max_entries {
            return;
        }
        let before = self.entries.len();

        let tick = self.tick;
        let max_age = self.config.max_age_ticks;
        self.entries
            .retain(|_, e| tick.saturating_sub(e.written_tick) <= max_age);

        let target = self.config.target_entries();
        if self.entries.len() > target {
            let mut by_access: Vec<(u64, PieceId)> = self
                .entries
                .iter()
                .map(|(id, e)| (e.last_access, *id))
                .collect();
            by_access.sort_unstable();
            let excess = self.entries.len() - target;
            for (_, id) in by_access.into_iter().take(excess) {
                self.entries.remove(&id);
            }
        }

        let evicted = before - self.entries.len();
        self.stats.evictions += evicted as u64;
        log::debug!(
            "cache: evicted {evicted} entries ({} remain, tick {tick})",
            self.entries.len()
        );
    }
}

impl ScoreMemo for StabilityCache {
    fn known(&self, id: PieceId) -> Option<f32> {
        if self.dirty.contains(&id) {
            return None;
        }
        self.entries.get(&id).map(|e| e.value)
    }

    fn record(&mut self, id: PieceId, value: f32) {
        self.access_clock += 1;
        self.stats.computed += 1;
        self.dirty.remove(&id);
        self.entries.insert(
            id,
            CacheEntry {
                value,
                written_tick: self.tick,
                last_access: self.access_clock,
            },
        );
    }
}
