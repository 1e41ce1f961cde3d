//! The facade a host game talks to.
//!
//! `StabilityEngine` owns the graph, the cache and the scheduler. Every
//! mutation invalidates the touched piece and its transitive dependents
//! before returning, then queues them for background recomputation. Queries
//! read through the cache, so they are always coherent even if the queue has
//! not been drained yet.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use buttress_core::config::{EngineConfig, StabilityMode};
use buttress_core::constants::GROUNDED_STABILITY;
use buttress_core::error::{CollaboratorError, StabilityError};
use buttress_core::loader::{default_materials, load_config_from_str, load_materials_from_str};
use buttress_core::material::MaterialTable;
use buttress_core::types::{Bounds, Piece, PieceId, PieceReport, PieceSpec, SupportType};
use buttress_core::validator::{validate_config, validate_materials, ValidationError};
use buttress_graph::SupportGraph;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, StabilityCache};
use crate::calculator::{Calculator, ScoreContext};
use crate::collapse::{self, CollapsePhase, CollapseReport};
use crate::scene::Surroundings;
use crate::scheduler::{Priority, UpdateScheduler, ZoneGate};

/// Answer to "can this piece go here?". Rejection is a value, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementResult {
    pub valid: bool,
    pub stability: f32,
    /// Human-readable rejection reason, None when valid.
    pub reason: Option<String>,
    pub supports: Vec<PieceId>,
}

impl PlacementResult {
    fn accepted(stability: f32, supports: Vec<PieceId>) -> Self {
        Self {
            valid: true,
            stability,
            reason: None,
            supports,
        }
    }

    fn rejected(stability: f32, reason: impl Into<String>, supports: Vec<PieceId>) -> Self {
        Self {
            valid: false,
            stability,
            reason: Some(reason.into()),
            supports,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnstablePiece {
    pub id: PieceId,
    pub stability: f32,
}

/// Summary of one `process_updates` tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub tick: u64,
    /// Scores brought up to date this tick.
    pub processed: usize,
    /// Entries outside the active zone, pushed back to Background.
    pub deferred: usize,
    /// Entries still queued after the tick.
    pub remaining: usize,
    /// Pieces whose failed support detection was attempted again.
    pub retried: usize,
    pub elapsed: Duration,
}

/// Mutations requested during one host tick.
///
/// Applied in a fixed order: every removal (in request order), then every
/// placement. Placements therefore see the effect of all removals in the
/// same batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationBatch {
    pub removals: Vec<PieceId>,
    pub placements: Vec<PieceSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// One report per requested removal, in request order.
    pub collapses: Vec<CollapseReport>,
    pub placed: Vec<PieceId>,
    pub rejected: Vec<(PieceId, String)>,
}

/// Supports found for a piece by the host's collaborators.
struct Detected {
    grounded: bool,
    supporters: Vec<PieceId>,
}

pub struct StabilityEngine {
    config: EngineConfig,
    materials: MaterialTable,
    graph: SupportGraph,
    calculator: Calculator,
    cache: StabilityCache,
    scheduler: UpdateScheduler,
    zone: Option<ZoneGate>,
    /// Pieces inserted while support detection was failing.
    pending_detection: HashSet<PieceId>,
}

fn invalid(errors: Vec<ValidationError>) -> StabilityError {
    let joined = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    StabilityError::InvalidConfig(joined)
}

impl StabilityEngine {
    /// Validate `config` and `materials` and build an empty engine.
    pub fn new(config: EngineConfig, materials: MaterialTable) -> Result<Self, StabilityError> {
        validate_config(&config).map_err(invalid)?;
        validate_materials(&materials).map_err(invalid)?;

        let calculator = Calculator::from_config(&config);
        let cache = StabilityCache::new(config.cache.clone());
        let scheduler = UpdateScheduler::new(config.scheduler.clone());
        let zone = config.scheduler.zone.as_ref().map(ZoneGate::new);
        log::info!(
            "engine: {:?} mode, {} materials, zone gating {}",
            config.mode,
            materials.len(),
            if zone.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            config,
            materials,
            graph: SupportGraph::new(),
            calculator,
            cache,
            scheduler,
            zone,
            pending_detection: HashSet::new(),
        })
    }

    /// Default configuration with the shipped material table.
    pub fn with_defaults() -> Result<Self, StabilityError> {
        let materials =
            default_materials().map_err(|e| StabilityError::InvalidConfig(e.to_string()))?;
        Self::new(EngineConfig::default(), materials)
    }

    /// Build from RON sources for the engine config and the material table.
    pub fn from_ron(config_ron: &str, materials_ron: &str) -> Result<Self, StabilityError> {
        let config = load_config_from_str(config_ron)
            .map_err(|e| StabilityError::InvalidConfig(e.to_string()))?;
        let materials = load_materials_from_str(materials_ron)
            .map_err(|e| StabilityError::InvalidConfig(e.to_string()))?;
        Self::new(config, materials)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> StabilityMode {
        self.config.mode
    }

    pub fn graph(&self) -> &SupportGraph {
        &self.graph
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn pending_updates(&self) -> usize {
        self.scheduler.len()
    }

    pub fn queued_priority(&self, id: PieceId) -> Option<Priority> {
        self.scheduler.priority_of(id)
    }

    pub fn awaiting_detection(&self, id: PieceId) -> bool {
        self.pending_detection.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn contains(&self, id: PieceId) -> bool {
        self.graph.contains(id)
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.graph.piece(id)
    }

    /// Insert a piece.
    ///
    /// With a scene, grounding and supporters come from the collaborators.
    /// Without one `spec.grounded` is taken as given and supports are added
    /// later through [`add_support_relation`](Self::add_support_relation).
    /// If a collaborator fails the piece is still inserted, unsupported, and
    /// detection is retried on the next `process_updates` given a scene.
    pub fn add_piece(
        &mut self,
        spec: &PieceSpec,
        scene: Option<&dyn Surroundings>,
    ) -> Result<PieceId, StabilityError> {
        if self.graph.contains(spec.id) {
            return Err(StabilityError::DuplicatePiece(spec.id));
        }
        if !self.materials.contains(spec.material) {
            return Err(StabilityError::UnknownMaterial(spec.material));
        }

        let detected = match scene {
            None => Some(Detected {
                grounded: spec.grounded,
                supporters: Vec::new(),
            }),
            Some(scene) => match self.detect(scene, spec.id, &spec.bounds()) {
                Ok(detected) => Some(detected),
                Err(err) => {
                    log::warn!(
                        "engine: support detection failed for {}: {err}; inserting unsupported",
                        spec.id
                    );
                    None
                }
            },
        };

        let piece = spec
            .to_piece()
            .grounded(detected.as_ref().is_some_and(|d| d.grounded));
        self.graph.add_piece(piece)?;

        match detected {
            Some(detected) => {
                self.attach(spec.id, detected)?;
                self.mark_changed(spec.id, Priority::High);
            }
            None => {
                self.pending_detection.insert(spec.id);
                self.mark_changed(spec.id, Priority::Immediate);
            }
        }
        Ok(spec.id)
    }

    /// Record that `supporter` holds up `supported`. With no `kind` the
    /// relation is classified from geometry. Returns false if it already existed.
    pub fn add_support_relation(
        &mut self,
        supporter: PieceId,
        supported: PieceId,
        kind: Option<SupportType>,
    ) -> Result<bool, StabilityError> {
        let kind = match kind {
            Some(kind) => kind,
            None => self.classify(supporter, supported)?,
        };
        let added = self.graph.add_support_relation(supporter, supported, kind)?;
        if added {
            self.mark_changed(supported, Priority::High);
        }
        Ok(added)
    }

    pub fn remove_support_relation(&mut self, supporter: PieceId, supported: PieceId) -> bool {
        let removed = self.graph.remove_support_relation(supporter, supported);
        if removed {
            self.mark_changed(supported, Priority::High);
        }
        removed
    }

    /// Remove a piece and return its collapse set, lowest first.
    ///
    /// Only `id` leaves the graph. The caller destroys the collapse set by
    /// issuing its own removals, which invalidate as usual.
    pub fn remove_piece(&mut self, id: PieceId) -> Vec<PieceId> {
        self.remove_with_report(id).collapse_set
    }

    /// What removing `id` would bring down, without removing anything.
    pub fn evaluate_removal(&self, id: PieceId) -> CollapseReport {
        let ctx = ScoreContext {
            graph: &self.graph,
            materials: &self.materials,
            calculator: &self.calculator,
        };
        collapse::evaluate(&ctx, &self.cache, id, self.config.collapse_threshold)
    }

    fn remove_with_report(&mut self, id: PieceId) -> CollapseReport {
        let report = self.evaluate_removal(id);
        if report.phase != CollapsePhase::Committed {
            log::debug!("engine: ignoring removal of unknown {id}");
            return report;
        }

        let dependents = self.cache.invalidate(&self.graph, id);
        self.graph.remove_piece(id);
        self.cache.forget(id);
        self.scheduler.remove(id);
        self.pending_detection.remove(&id);
        for dependent in dependents {
            self.scheduler.enqueue(dependent, Priority::High);
        }
        log::info!(
            "engine: removed {id}, collapse set has {} pieces",
            report.collapse_set.len()
        );
        report
    }

    /// Check whether `spec` could be placed, without inserting it.
    pub fn validate_placement(
        &mut self,
        spec: &PieceSpec,
        scene: &dyn Surroundings,
    ) -> PlacementResult {
        if self.graph.contains(spec.id) {
            let reason = format!("Piece {} already exists", spec.id);
            return PlacementResult::rejected(0.0, reason, Vec::new());
        }
        let Some(material) = self.materials.get(spec.material) else {
            let reason = format!("Unknown {}", spec.material);
            return PlacementResult::rejected(0.0, reason, Vec::new());
        };

        let detected = match self.detect(scene, spec.id, &spec.bounds()) {
            Ok(detected) => detected,
            Err(err) => {
                log::warn!(
                    "engine: support detection failed for candidate {}: {err}",
                    spec.id
                );
                let reason = format!("Support detection failed: {err}");
                return PlacementResult::rejected(0.0, reason, Vec::new());
            }
        };
        let candidate = spec.to_piece().grounded(detected.grounded);
        let supports = detected.supporters;

        if candidate.grounded {
            return PlacementResult::accepted(GROUNDED_STABILITY, supports);
        }
        if supports.is_empty() && !material.can_float {
            return PlacementResult::rejected(0.0, "No support found", supports);
        }

        let ctx = ScoreContext {
            graph: &self.graph,
            materials: &self.materials,
            calculator: &self.calculator,
        };
        let connected = supports.iter().any(|s| self.graph.has_path_to_ground(*s));
        let floating = supports.is_empty() && material.can_float;

        let stability = match self.config.mode {
            StabilityMode::Arcade => self.calculator.connectivity_score(
                &candidate,
                material,
                connected,
                !supports.is_empty(),
            ),
            StabilityMode::Heuristic | StabilityMode::Hybrid => {
                let mut scored = Vec::with_capacity(supports.len());
                for &supporter in &supports {
                    let Some(piece) = self.graph.piece(supporter) else {
                        continue;
                    };
                    let kind =
                        SupportType::classify(piece, &candidate, self.config.cantilever_offset);
                    scored.push((self.cache.get(&ctx, supporter), kind));
                }
                self.calculator.score_candidate(&candidate, material, &scored)
            }
        };

        match self.config.mode {
            StabilityMode::Heuristic if stability < self.config.min_placement_stability => {
                let reason = format!("Stability too low ({:.0}%)", stability * 100.0);
                PlacementResult::rejected(stability, reason, supports)
            }
            StabilityMode::Arcade | StabilityMode::Hybrid if !(connected || floating) => {
                PlacementResult::rejected(stability, "Not connected to ground", supports)
            }
            _ => PlacementResult::accepted(stability, supports),
        }
    }

    /// Current score of `id`; 0 for unknown pieces.
    pub fn stability(&mut self, id: PieceId) -> f32 {
        let ctx = ScoreContext {
            graph: &self.graph,
            materials: &self.materials,
            calculator: &self.calculator,
        };
        self.cache.get(&ctx, id)
    }

    /// Relation type through which `id` receives its best support.
    /// `Ground` for grounded pieces, None when unsupported or unknown.
    pub fn support_type_of(&mut self, id: PieceId) -> Option<SupportType> {
        if self.graph.piece(id)?.grounded {
            return Some(SupportType::Ground);
        }
        let ctx = ScoreContext {
            graph: &self.graph,
            materials: &self.materials,
            calculator: &self.calculator,
        };
        let mut best: Option<(f32, SupportType)> = None;
        for &(supporter, kind) in self.graph.support_relations(id) {
            let value = self.cache.get(&ctx, supporter);
            if best.map_or(true, |(b, _)| value > b) {
                best = Some((value, kind));
            }
        }
        best.map(|(_, kind)| kind)
    }

    pub fn report(&mut self, id: PieceId) -> Option<PieceReport> {
        if !self.graph.contains(id) {
            return None;
        }
        Some(PieceReport {
            id,
            stability: self.stability(id),
            support_type: self.support_type_of(id),
        })
    }

    /// Pieces scoring below `threshold` (default: the placement minimum),
    /// lowest first.
    pub fn find_unstable_pieces(&mut self, threshold: Option<f32>) -> Vec<UnstablePiece> {
        let threshold = threshold.unwrap_or(self.config.min_placement_stability);
        let mut ids: Vec<PieceId> = self.graph.ids().collect();
        self.graph.sort_bottom_up(&mut ids);

        let ctx = ScoreContext {
            graph: &self.graph,
            materials: &self.materials,
            calculator: &self.calculator,
        };
        let mut unstable = Vec::new();
        for id in ids {
            let stability = self.cache.get(&ctx, id);
            if stability < threshold {
                unstable.push(UnstablePiece { id, stability });
            }
        }
        unstable
    }

    /// Ask for `id` to be recomputed. Returns false for unknown pieces or
    /// when it is already queued at least as urgently.
    pub fn queue_update(&mut self, id: PieceId, priority: Priority) -> bool {
        if !self.graph.contains(id) {
            log::debug!("engine: not queueing unknown {id}");
            return false;
        }
        self.scheduler.enqueue(id, priority)
    }

    /// Drain queued work for one host tick.
    ///
    /// Work is taken by priority, sorted bottom-up and recomputed until
    /// `budget` or the per-tick cap runs out. Anything not reached goes back
    /// into its bucket. With a scene, failed support detections are retried
    /// first.
    pub fn process_updates(
        &mut self,
        budget: Duration,
        scene: Option<&dyn Surroundings>,
    ) -> ProcessReport {
        let started = Instant::now();
        self.scheduler.begin_tick();
        self.cache.advance_tick();

        let mut report = ProcessReport {
            tick: self.scheduler.tick(),
            ..ProcessReport::default()
        };
        if let Some(scene) = scene {
            report.retried = self.retry_detection(scene);
        }

        let mut batch = self.scheduler.take_batch(self.config.scheduler.max_per_tick);
        batch.sort_by(|a, b| self.graph.height(a.0).total_cmp(&self.graph.height(b.0)));

        let ctx = ScoreContext {
            graph: &self.graph,
            materials: &self.materials,
            calculator: &self.calculator,
        };
        let mut deferred = Vec::new();
        for (i, &(id, priority)) in batch.iter().enumerate() {
            if started.elapsed() >= budget {
                for &(rest, rest_priority) in batch[i..].iter().rev() {
                    self.scheduler.requeue_front(rest, rest_priority);
                }
                break;
            }
            let Some(piece) = self.graph.piece(id) else {
                continue;
            };
            if priority != Priority::Immediate {
                if let Some(zone) = &self.zone {
                    if !zone.admits(piece.position) {
                        deferred.push(id);
                        continue;
                    }
                }
            }
            self.cache.get(&ctx, id);
            report.processed += 1;
        }

        report.deferred = deferred.len();
        for id in deferred {
            self.scheduler.enqueue(id, Priority::Background);
        }
        report.remaining = self.scheduler.len();
        report.elapsed = started.elapsed();
        log::debug!(
            "engine: tick {} processed {} deferred {} remaining {}",
            report.tick,
            report.processed,
            report.deferred,
            report.remaining
        );
        report
    }

    /// Switch scoring strategy. Every memoized score is dropped and every
    /// piece is queued for Background recomputation.
    pub fn set_mode(&mut self, mode: StabilityMode) {
        let previous = self.config.mode;
        self.config = self.config.with_mode(mode);
        self.calculator = Calculator::from_config(&self.config);
        self.cache = StabilityCache::new(self.config.cache.clone());
        for id in self.graph.ids() {
            self.scheduler.enqueue(id, Priority::Background);
        }
        log::info!(
            "engine: mode {previous:?} -> {mode:?}, {} pieces requeued",
            self.graph.len()
        );
    }

    /// Set the damage state of a piece (clamped to [0, 1]).
    pub fn set_health(&mut self, id: PieceId, health: f32) -> Result<(), StabilityError> {
        let piece = self
            .graph
            .piece_mut(id)
            .ok_or(StabilityError::UnknownPiece(id))?;
        piece.health = health.clamp(0.0, 1.0);
        self.mark_changed(id, Priority::High);
        Ok(())
    }

    /// Move the zone-gating focus. No-op when zone gating is disabled.
    pub fn set_focus(&mut self, focus: Option<Vec3>) {
        match &mut self.zone {
            Some(zone) => zone.set_focus(focus),
            None => log::debug!("engine: focus ignored, zone gating is off"),
        }
    }

    /// Apply one tick's mutations: all removals first, then all placements.
    ///
    /// With a scene each placement is validated before insertion and rejected
    /// ones are reported with their reason.
    pub fn apply_batch(
        &mut self,
        batch: MutationBatch,
        scene: Option<&dyn Surroundings>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for id in batch.removals {
            outcome.collapses.push(self.remove_with_report(id));
        }

        for spec in batch.placements {
            if let Some(scene) = scene {
                let check = self.validate_placement(&spec, scene);
                if !check.valid {
                    outcome
                        .rejected
                        .push((spec.id, check.reason.unwrap_or_default()));
                    continue;
                }
            }
            match self.add_piece(&spec, scene) {
                Ok(id) => outcome.placed.push(id),
                Err(err) => outcome.rejected.push((spec.id, err.to_string())),
            }
        }

        log::info!(
            "engine: batch applied: {} removals, {} placed, {} rejected",
            outcome.collapses.len(),
            outcome.placed.len(),
            outcome.rejected.len()
        );
        outcome
    }

    fn detect(
        &self,
        scene: &dyn Surroundings,
        id: PieceId,
        bounds: &Bounds,
    ) -> Result<Detected, CollaboratorError> {
        let grounded = scene.is_on_terrain(bounds)?;
        let mut supporters = Vec::new();
        for supporter in scene.find_supports(bounds, self.config.support_tolerance)? {
            if supporter == id || supporters.contains(&supporter) {
                continue;
            }
            if !self.graph.contains(supporter) {
                log::warn!("engine: scene reported unknown supporter {supporter} for {id}");
                continue;
            }
            supporters.push(supporter);
        }
        Ok(Detected {
            grounded,
            supporters,
        })
    }

    fn attach(&mut self, id: PieceId, detected: Detected) -> Result<(), StabilityError> {
        self.graph.set_grounded(id, detected.grounded);
        for supporter in detected.supporters {
            let kind = self.classify(supporter, id)?;
            self.graph.add_support_relation(supporter, id, kind)?;
        }
        Ok(())
    }

    fn classify(
        &self,
        supporter: PieceId,
        supported: PieceId,
    ) -> Result<SupportType, StabilityError> {
        let above = self
            .graph
            .piece(supported)
            .ok_or(StabilityError::UnknownPiece(supported))?;
        let below = self
            .graph
            .piece(supporter)
            .ok_or(StabilityError::UnknownPiece(supporter))?;
        Ok(SupportType::classify(below, above, self.config.cantilever_offset))
    }

    /// Invalidate `id` and its dependents and queue them for recomputation.
    fn mark_changed(&mut self, id: PieceId, priority: Priority) {
        let dependents = self.cache.invalidate(&self.graph, id);
        self.scheduler.enqueue(id, priority);
        for dependent in dependents {
            self.scheduler.enqueue(dependent, Priority::Normal);
        }
    }

    fn retry_detection(&mut self, scene: &dyn Surroundings) -> usize {
        if self.pending_detection.is_empty() {
            return 0;
        }
        let mut pending: Vec<PieceId> = self.pending_detection.iter().copied().collect();
        self.graph.sort_bottom_up(&mut pending);

        let mut retried = 0;
        for id in pending {
            let Some(bounds) = self.graph.piece(id).map(|p| p.bounds) else {
                self.pending_detection.remove(&id);
                continue;
            };
            retried += 1;
            let detected = match self.detect(scene, id, &bounds) {
                Ok(detected) => detected,
                Err(err) => {
                    log::warn!("engine: support detection for {id} failed again: {err}");
                    continue;
                }
            };
            if let Err(err) = self.attach(id, detected) {
                log::warn!("engine: could not attach supports for {id}: {err}");
                continue;
            }
            self.pending_detection.remove(&id);
            self.mark_changed(id, Priority::Immediate);
            log::debug!("engine: support detection for {id} succeeded on retry");
        }
        retried
    }
}
