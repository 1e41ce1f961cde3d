//! Collapse detection: which pieces fall if a given piece is removed.
//!
//! Evaluation is a dry run. The graph is never mutated and the cache is only
//! read; heuristic re-scoring goes through a scratch overlay that treats the
//! target as detached.

use std::collections::{HashMap, HashSet};

use buttress_core::config::StabilityMode;
use buttress_core::types::PieceId;
use serde::{Deserialize, Serialize};

use crate::cache::StabilityCache;
use crate::calculator::{ScoreContext, ScoreMemo};

/// Lifecycle of one destroy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollapsePhase {
    Requested,
    Evaluating,
    /// Collapse set known and handed to the caller.
    Committed,
    /// Target unknown; nothing collapses.
    Aborted,
}

impl CollapsePhase {
    pub fn can_transition_to(self, next: CollapsePhase) -> bool {
        matches!(
            (self, next),
            (CollapsePhase::Requested, CollapsePhase::Evaluating)
                | (CollapsePhase::Requested, CollapsePhase::Aborted)
                | (CollapsePhase::Evaluating, CollapsePhase::Committed)
                | (CollapsePhase::Evaluating, CollapsePhase::Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CollapsePhase::Committed | CollapsePhase::Aborted)
    }
}

/// Outcome of evaluating a removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapseReport {
    pub target: PieceId,
    pub phase: CollapsePhase,
    /// Pieces that fall, lowest first. Never includes `target`.
    pub collapse_set: Vec<PieceId>,
}

impl CollapseReport {
    fn new(target: PieceId) -> Self {
        Self {
            target,
            phase: CollapsePhase::Requested,
            collapse_set: Vec::new(),
        }
    }

    /// Move to `next`. Illegal transitions are ignored and return false.
    pub fn advance(&mut self, next: CollapsePhase) -> bool {
        if !self.phase.can_transition_to(next) {
            log::warn!(
                "collapse: illegal transition {:?} -> {:?} for {}",
                self.phase,
                next,
                self.target
            );
            return false;
        }
        self.phase = next;
        true
    }
}

/// Scores with one piece detached. Affected pieces (transitive dependents of
/// the target) are always recomputed; everything else may be read from the
/// cache as long as it is fresh.
struct DetachedOverlay<'c> {
    cache: &'c StabilityCache,
    affected: HashSet<PieceId>,
    values: HashMap<PieceId, f32>,
}

impl ScoreMemo for DetachedOverlay<'_> {
    fn known(&self, id: PieceId) -> Option<f32> {
        if let Some(value) = self.values.get(&id) {
            return Some(*value);
        }
        if self.affected.contains(&id) {
            return None;
        }
        self.cache.peek(id)
    }

    fn record(&mut self, id: PieceId, value: f32) {
        self.values.insert(id, value);
    }
}

/// Evaluate what removing `target` would bring down.
///
/// Arcade and Hybrid use ground connectivity. Heuristic re-scores every
/// transitive dependent with `target` detached and collects those strictly
/// below `threshold`.
pub fn evaluate(
    ctx: &ScoreContext<'_>,
    cache: &StabilityCache,
    target: PieceId,
    threshold: f32,
) -> CollapseReport {
    let mut report = CollapseReport::new(target);
    if !ctx.graph.contains(target) {
        report.advance(CollapsePhase::Aborted);
        return report;
    }
    report.advance(CollapsePhase::Evaluating);

    report.collapse_set = match ctx.calculator.mode() {
        StabilityMode::Arcade | StabilityMode::Hybrid => {
            ctx.graph.find_disconnected_after_removal(target)
        }
        StabilityMode::Heuristic => heuristic_collapse(ctx, cache, target, threshold),
    };

    report.advance(CollapsePhase::Committed);
    log::debug!(
        "collapse: removing {target} brings down {} pieces",
        report.collapse_set.len()
    );
    report
}

fn heuristic_collapse(
    ctx: &ScoreContext<'_>,
    cache: &StabilityCache,
    target: PieceId,
    threshold: f32,
) -> Vec<PieceId> {
    let dependents = ctx.graph.transitive_dependents(target);
    let mut overlay = DetachedOverlay {
        cache,
        affected: dependents.iter().copied().collect(),
        values: HashMap::new(),
    };

    let mut falling: Vec<PieceId> = dependents
        .iter()
        .copied()
        .filter(|&id| ctx.calculator.resolve(ctx, id, Some(target), &mut overlay) < threshold)
        .collect();
    ctx.graph.sort_bottom_up(&mut falling);
    falling
}
