//! Stability scoring.
//!
//! Three modes share one entry point:
//! - Arcade: 1.0 when a supporter chain reaches ground, else 0.
//! - Heuristic: best supporter's stability minus a per-hop decay.
//! - Hybrid: heuristic numbers, arcade placement rule (see `engine.rs`).
//!
//! Scores that depend on supporter scores are resolved with an explicit work
//! stack instead of recursion. Supporters still on the stack when revisited
//! (a cycle) contribute nothing on the first pass; the pieces resolved in
//! that call are then relaxed until no score rises, so a cycle member gets
//! the same score whichever piece was queried first.

use std::collections::HashSet;

use buttress_core::config::{EngineConfig, StabilityMode};
use buttress_core::constants::GROUNDED_STABILITY;
use buttress_core::material::{Material, MaterialTable};
use buttress_core::types::{Orientation, Piece, PieceId, SupportType};
use buttress_graph::SupportGraph;

/// Memo of already-resolved scores. Implemented by the cache and by the
/// collapse detector's scratch overlay.
pub trait ScoreMemo {
    /// A known, fresh score for `id`.
    fn known(&self, id: PieceId) -> Option<f32>;
    /// Store a freshly computed score.
    fn record(&mut self, id: PieceId, value: f32);
}

/// Everything a score depends on, borrowed for one query.
pub struct ScoreContext<'a> {
    pub graph: &'a SupportGraph,
    pub materials: &'a MaterialTable,
    pub calculator: &'a Calculator,
}

/// Scoring parameters for one mode. Built from an [`EngineConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct Calculator {
    mode: StabilityMode,
    vertical_factor: f32,
    horizontal_factor: f32,
    cantilever_factor: f32,
}

impl Calculator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            mode: config.mode,
            vertical_factor: config.vertical_decay_factor,
            horizontal_factor: config.horizontal_decay_factor,
            cantilever_factor: config.cantilever_decay_factor,
        }
    }

    pub fn mode(&self) -> StabilityMode {
        self.mode
    }

    /// Stability lost crossing one support relation into `piece`.
    pub fn decay_rate(&self, piece: &Piece, material: &Material, relation: SupportType) -> f32 {
        let orientation = match piece.orientation {
            Orientation::Vertical => self.vertical_factor,
            Orientation::Horizontal => self.horizontal_factor,
        };
        let cantilever = if relation.is_cantilever() {
            self.cantilever_factor
        } else {
            1.0
        };
        material.stability_decay * orientation * cantilever
    }

    /// Heuristic score from supporter scores.
    ///
    /// `supports` yields one entry per supporter: its score (None when
    /// unresolvable, e.g. part of a cycle) and the relation type.
    pub fn decayed_score<I>(&self, piece: &Piece, material: &Material, supports: I) -> f32
    where
        I: IntoIterator<Item = (Option<f32>, SupportType)>,
    {
        if piece.grounded {
            return GROUNDED_STABILITY;
        }
        let floating = if material.can_float {
            material.max_stability
        } else {
            0.0
        };

        let mut any_support = false;
        let mut best = 0.0_f32;
        for (value, relation) in supports {
            any_support = true;
            if let Some(value) = value {
                best = best.max(value - self.decay_rate(piece, material, relation));
            }
        }
        if !any_support {
            return floating;
        }

        let cap = material.max_stability * piece.health.clamp(0.0, 1.0);
        best.clamp(0.0, cap.max(0.0))
    }

    /// Arcade score given whether the piece reaches ground.
    pub fn connectivity_score(
        &self,
        piece: &Piece,
        material: &Material,
        connected: bool,
        has_supports: bool,
    ) -> f32 {
        if piece.grounded {
            GROUNDED_STABILITY
        } else if connected || (!has_supports && material.can_float) {
            material.max_stability
        } else {
            0.0
        }
    }

    /// Score one graph piece, reading supporter scores from `memo`.
    /// Supporters equal to `excluded` are treated as detached.
    pub fn score(
        &self,
        ctx: &ScoreContext<'_>,
        id: PieceId,
        excluded: Option<PieceId>,
        memo: &dyn ScoreMemo,
    ) -> f32 {
        let Some(piece) = ctx.graph.piece(id) else {
            return 0.0;
        };
        if piece.grounded {
            return GROUNDED_STABILITY;
        }
        let Some(material) = ctx.materials.get(piece.material) else {
            log::warn!("calculator: {id} uses unknown {}, scoring 0", piece.material);
            return 0.0;
        };
        let relations = ctx
            .graph
            .support_relations(id)
            .iter()
            .filter(|(s, _)| Some(*s) != excluded);

        match self.mode {
            StabilityMode::Arcade => {
                let has_supports = relations.clone().next().is_some();
                let excluded_set: HashSet<PieceId> = excluded.into_iter().collect();
                let connected = ctx.graph.has_path_to_ground_excluding(id, &excluded_set);
                self.connectivity_score(piece, material, connected, has_supports)
            }
            StabilityMode::Heuristic | StabilityMode::Hybrid => self.decayed_score(
                piece,
                material,
                relations.map(|(s, kind)| (memo.known(*s), *kind)),
            ),
        }
    }

    /// Resolve the score of `root`, computing and recording any supporter
    /// scores the memo does not know yet. Supporters are always recorded
    /// before the pieces resting on them.
    pub fn resolve(
        &self,
        ctx: &ScoreContext<'_>,
        root: PieceId,
        excluded: Option<PieceId>,
        memo: &mut dyn ScoreMemo,
    ) -> f32 {
        if let Some(value) = memo.known(root) {
            return value;
        }
        if !ctx.graph.contains(root) {
            return 0.0;
        }

        if self.mode == StabilityMode::Arcade {
            // Connectivity does not read supporter scores.
            let value = self.score(ctx, root, excluded, memo);
            memo.record(root, value);
            return value;
        }

        let mut stack = vec![(root, false)];
        let mut entered = HashSet::new();
        let mut resolved = Vec::new();
        let mut cyclic = false;
        while let Some((id, expanded)) = stack.pop() {
            if memo.known(id).is_some() {
                continue;
            }
            if expanded {
                let value = self.score(ctx, id, excluded, memo);
                memo.record(id, value);
                resolved.push(id);
                continue;
            }
            if !entered.insert(id) {
                continue;
            }
            stack.push((id, true));
            if ctx.graph.is_grounded(id) {
                continue;
            }
            for (supporter, _) in ctx.graph.support_relations(id) {
                if Some(*supporter) == excluded || memo.known(*supporter).is_some() {
                    continue;
                }
                // Entered but unrecorded means still on the current path.
                if entered.contains(supporter) {
                    cyclic = true;
                    continue;
                }
                stack.push((*supporter, false));
            }
        }

        if cyclic {
            self.relax(ctx, &resolved, excluded, memo);
        }
        memo.known(root).unwrap_or(0.0)
    }

    /// Re-score `resolved` until no score rises. Scores only grow toward the
    /// best acyclic path from ground, so `resolved.len()` passes suffice.
    fn relax(
        &self,
        ctx: &ScoreContext<'_>,
        resolved: &[PieceId],
        excluded: Option<PieceId>,
        memo: &mut dyn ScoreMemo,
    ) {
        for _ in 0..resolved.len() {
            let mut raised = false;
            for &id in resolved {
                let value = self.score(ctx, id, excluded, memo);
                if memo.known(id).map_or(true, |old| value > old) {
                    memo.record(id, value);
                    raised = true;
                }
            }
            if !raised {
                break;
            }
        }
    }

    /// Score a piece that is not in the graph, against candidate supporters
    /// whose scores are already resolved.
    pub fn score_candidate(
        &self,
        candidate: &Piece,
        material: &Material,
        supports: &[(f32, SupportType)],
    ) -> f32 {
        self.decayed_score(
            candidate,
            material,
            supports.iter().map(|(value, kind)| (Some(*value), *kind)),
        )
    }
}
