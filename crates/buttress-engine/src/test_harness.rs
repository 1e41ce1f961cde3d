/// End-to-end scenarios driven through `StabilityEngine`, with a `FlatScene`
/// standing in for the host's spatial index.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use buttress_core::config::{EngineConfig, StabilityMode, ZoneConfig};
    use buttress_core::error::{CollaboratorError, StabilityError};
    use buttress_core::loader::{default_materials, DEFAULT_ENGINE_RON, DEFAULT_MATERIALS_RON};
    use buttress_core::types::{Bounds, MaterialId, Orientation, PieceId, PieceSpec, SupportType};
    use glam::Vec3;

    use crate::collapse::CollapsePhase;
    use crate::engine::{MutationBatch, StabilityEngine};
    use crate::scene::{FlatScene, GroundProbe, SupportFinder};
    use crate::scheduler::Priority;

    const WOOD: u16 = 1;
    const THATCH: u16 = 4;
    const BANNER: u16 = 9;

    const LONG: Duration = Duration::from_secs(5);

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn spec(id: u32, x: f32, y: f32, orientation: Orientation, material: u16) -> PieceSpec {
        PieceSpec {
            id: PieceId(id),
            position: Vec3::new(x, y, 0.0),
            size: Vec3::ONE,
            orientation,
            material: MaterialId(material),
            grounded: false,
        }
    }

    fn floor(id: u32, x: f32, y: f32) -> PieceSpec {
        spec(id, x, y, Orientation::Horizontal, WOOD)
    }

    fn wall(id: u32, x: f32, y: f32) -> PieceSpec {
        spec(id, x, y, Orientation::Vertical, WOOD)
    }

    fn engine_with(config: EngineConfig) -> StabilityEngine {
        let materials = default_materials().expect("shipped materials parse");
        StabilityEngine::new(config, materials).expect("valid engine")
    }

    /// Engine plus a scene kept in sync, the way a host would.
    struct World {
        engine: StabilityEngine,
        scene: FlatScene,
    }

    impl World {
        fn new(mode: StabilityMode) -> Self {
            Self::with_config(EngineConfig::default().with_mode(mode))
        }

        fn with_config(config: EngineConfig) -> Self {
            Self {
                engine: engine_with(config),
                scene: FlatScene::new(0.0),
            }
        }

        fn place(&mut self, spec: PieceSpec) -> PieceId {
            let id = self
                .engine
                .add_piece(&spec, Some(&self.scene))
                .expect("placed");
            self.scene.insert(id, spec.bounds());
            id
        }

        fn remove(&mut self, id: PieceId) -> Vec<PieceId> {
            self.scene.remove(id);
            self.engine.remove_piece(id)
        }

        fn stability(&mut self, id: u32) -> f32 {
            self.engine.stability(PieceId(id))
        }
    }

    /// foundation(1) -> wall(2) -> roof(3), unit cubes stacked on flat ground.
    fn house(mode: StabilityMode) -> World {
        let mut world = World::new(mode);
        world.place(floor(1, 0.0, 0.5));
        world.place(wall(2, 0.0, 1.5));
        world.place(floor(3, 0.0, 2.5));
        world
    }

    /// Stack of `levels` floors of `material`, the lowest one grounded.
    fn tower(mode: StabilityMode, material: u16, levels: u32) -> World {
        let mut world = World::new(mode);
        for level in 0..levels {
            let y = level as f32 + 0.5;
            world.place(spec(level + 1, 0.0, y, Orientation::Horizontal, material));
        }
        world
    }

    struct OfflineScene;

    impl SupportFinder for OfflineScene {
        fn find_supports(
            &self,
            _bounds: &Bounds,
            _tolerance: f32,
        ) -> Result<Vec<PieceId>, CollaboratorError> {
            Err(CollaboratorError::Unavailable("spatial index rebuilding".into()))
        }
    }

    impl GroundProbe for OfflineScene {
        fn is_on_terrain(&self, _bounds: &Bounds) -> Result<bool, CollaboratorError> {
            Err(CollaboratorError::Timeout)
        }
    }

    // --- Scoring properties ---

    #[test]
    fn test_scores_stay_in_unit_range() {
        for mode in [StabilityMode::Arcade, StabilityMode::Heuristic, StabilityMode::Hybrid] {
            let mut world = tower(mode, THATCH, 7);
            world.place(spec(20, 0.0, 3.0, Orientation::Vertical, BANNER));
            for id in [1, 2, 3, 4, 5, 6, 7, 20] {
                let s = world.stability(id);
                assert!((0.0..=1.0).contains(&s), "{mode:?}: #{id} scored {s}");
            }
        }
    }

    #[test]
    fn test_grounded_pieces_score_one() {
        for mode in [StabilityMode::Arcade, StabilityMode::Heuristic, StabilityMode::Hybrid] {
            let mut world = house(mode);
            assert_eq!(world.stability(1), 1.0, "{mode:?}");
            assert_eq!(
                world.engine.support_type_of(PieceId(1)),
                Some(SupportType::Ground)
            );
        }
    }

    #[test]
    fn test_stability_never_increases_upward() {
        let mut world = tower(StabilityMode::Heuristic, WOOD, 6);
        let mut below = world.stability(1);
        for id in 2..=6 {
            let here = world.stability(id);
            assert!(here <= below, "#{id} ({here}) above its supporter ({below})");
            below = here;
        }

        // A floating material resting on a 0.0 level gets no floor of its own.
        let mut world = tower(StabilityMode::Heuristic, THATCH, 5);
        world.place(spec(20, 0.0, 5.5, Orientation::Vertical, BANNER));
        assert_eq!(world.engine.graph().supporters_of(PieceId(20)).len(), 1);
        let top = world.stability(5);
        let banner = world.stability(20);
        assert_eq!(top, 0.0);
        assert!(banner <= top, "banner ({banner}) above its supporter ({top})");
    }

    #[test]
    fn test_repeated_query_is_idempotent() {
        let mut world = house(StabilityMode::Heuristic);
        let first = world.stability(3);
        let computed = world.engine.cache_stats().computed;
        let second = world.stability(3);
        assert_eq!(first, second);
        assert_eq!(
            world.engine.cache_stats().computed,
            computed,
            "second query served from cache"
        );
    }

    #[test]
    fn test_heuristic_stack_decay() {
        let mut world = tower(StabilityMode::Heuristic, WOOD, 3);
        assert!(approx(world.stability(2), 0.85));
        assert!(approx(world.stability(3), 0.70));
    }

    #[test]
    fn test_vertical_piece_decays_slower() {
        let mut world = World::new(StabilityMode::Heuristic);
        world.place(floor(1, 0.0, 0.5));
        world.place(wall(2, 0.0, 1.5));
        assert!(approx(world.stability(2), 0.91), "0.15 * 0.6 lost");
        assert_eq!(
            world.engine.support_type_of(PieceId(2)),
            Some(SupportType::Foundation)
        );
    }

    #[test]
    fn test_cantilever_decays_faster() {
        let mut world = World::new(StabilityMode::Heuristic);
        world.place(floor(1, 0.0, 0.5));
        world.place(floor(2, 0.75, 1.5));
        assert!(approx(world.stability(2), 0.775), "0.15 * 1.5 lost");
        assert_eq!(
            world.engine.support_type_of(PieceId(2)),
            Some(SupportType::Cantilever)
        );
    }

    #[test]
    fn test_damage_caps_and_propagates() {
        let mut world = tower(StabilityMode::Heuristic, WOOD, 3);
        assert!(approx(world.stability(3), 0.70));
        world
            .engine
            .set_health(PieceId(2), 0.5)
            .expect("known piece");
        assert!(approx(world.stability(2), 0.5));
        assert!(approx(world.stability(3), 0.35), "dependent sees the damage");
    }

    // --- Placement ---

    #[test]
    fn test_no_support_rejected() {
        let mut world = house(StabilityMode::Heuristic);
        let result = world
            .engine
            .validate_placement(&floor(9, 10.0, 4.5), &world.scene);
        assert!(!result.valid);
        assert_eq!(result.stability, 0.0);
        assert_eq!(result.reason.as_deref(), Some("No support found"));
        assert!(result.supports.is_empty());
    }

    #[test]
    fn test_floating_piece_accepted_without_support() {
        let mut world = World::new(StabilityMode::Heuristic);
        let banner = spec(5, 3.0, 6.0, Orientation::Vertical, BANNER);
        let result = world.engine.validate_placement(&banner, &world.scene);
        assert!(result.valid);
        assert_eq!(result.stability, 0.5);

        world.place(banner);
        assert_eq!(world.stability(5), 0.5);
    }

    #[test]
    fn test_low_stability_rejected_with_percentage() {
        // Thatch loses 0.25 per level: 1.0, 0.75, 0.5, 0.25, then 0.
        let mut world = tower(StabilityMode::Heuristic, THATCH, 4);
        let candidate = spec(10, 0.0, 4.5, Orientation::Horizontal, THATCH);
        let result = world.engine.validate_placement(&candidate, &world.scene);
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("Stability too low (0%)"));
        assert_eq!(result.supports, vec![PieceId(4)]);
    }

    #[test]
    fn test_hybrid_gates_on_connectivity_but_reports_decay() {
        let mut world = tower(StabilityMode::Hybrid, THATCH, 4);
        let candidate = spec(10, 0.0, 4.5, Orientation::Horizontal, THATCH);
        let result = world.engine.validate_placement(&candidate, &world.scene);
        assert!(result.valid, "connected to ground is enough in hybrid mode");
        assert_eq!(result.stability, 0.0);
    }

    #[test]
    fn test_arcade_rejects_disconnected_support() {
        let mut world = house(StabilityMode::Arcade);
        world.engine.remove_piece(PieceId(2));
        let result = world
            .engine
            .validate_placement(&floor(4, 0.0, 3.5), &world.scene);
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("Not connected to ground"));
    }

    // --- Collapse ---

    #[test]
    fn test_arcade_sole_foundation_removal() {
        let mut world = house(StabilityMode::Arcade);
        let collapse = world.remove(PieceId(1));
        assert_eq!(collapse, vec![PieceId(2), PieceId(3)]);
        assert!(!world.engine.contains(PieceId(1)));
        assert!(world.engine.contains(PieceId(2)), "caller removes the collapse set");
        assert_eq!(world.stability(3), 0.0);
    }

    #[test]
    fn test_arcade_alternate_ground_path() {
        let mut world = World::new(StabilityMode::Arcade);
        world.place(floor(1, 0.0, 0.5));
        world.place(floor(4, 1.0, 0.5));
        let mut wide_wall = wall(2, 0.5, 1.5);
        wide_wall.size = Vec3::new(2.0, 1.0, 1.0);
        world.place(wide_wall);
        world.place(floor(3, 0.5, 2.5));

        assert_eq!(world.engine.graph().supporters_of(PieceId(2)).len(), 2);
        assert!(world.remove(PieceId(1)).is_empty());
        assert_eq!(world.stability(3), 1.0);
    }

    #[test]
    fn test_heuristic_collapse_below_threshold() {
        let mut world = tower(StabilityMode::Heuristic, WOOD, 3);
        let report = world.engine.evaluate_removal(PieceId(1));
        assert_eq!(report.phase, CollapsePhase::Committed);
        assert_eq!(report.collapse_set, vec![PieceId(2), PieceId(3)]);
        assert!(world.engine.contains(PieceId(1)), "evaluation is a dry run");
        assert!(approx(world.stability(3), 0.70), "scores unaffected by dry run");

        let collapse = world.remove(PieceId(1));
        assert_eq!(collapse, vec![PieceId(2), PieceId(3)]);
    }

    /// Thatch span(2) over grounded 1 and 6, with 3, 4, 5 stacked on it.
    fn braced_thatch(mode: StabilityMode) -> World {
        let mut world = World::new(mode);
        world.place(spec(1, 0.0, 0.5, Orientation::Horizontal, THATCH));
        world.place(spec(6, 1.0, 0.5, Orientation::Horizontal, THATCH));
        let mut span = spec(2, 0.5, 1.5, Orientation::Horizontal, THATCH);
        span.size = Vec3::new(2.0, 1.0, 1.0);
        world.place(span);
        for (id, y) in [(3, 2.5), (4, 3.5), (5, 4.5)] {
            world.place(spec(id, 0.5, y, Orientation::Horizontal, THATCH));
        }
        world
    }

    #[test]
    fn test_hybrid_removal_uses_connectivity() {
        let heuristic = braced_thatch(StabilityMode::Heuristic);
        let report = heuristic.engine.evaluate_removal(PieceId(6));
        assert_eq!(report.collapse_set, vec![PieceId(5)], "top level scores 0.0");

        let mut hybrid = braced_thatch(StabilityMode::Hybrid);
        assert_eq!(hybrid.stability(5), 0.0, "hybrid still reports decayed scores");
        assert!(hybrid.remove(PieceId(6)).is_empty(), "still connected through #1");
        assert!(hybrid.engine.contains(PieceId(5)));

        let collapse = hybrid.remove(PieceId(1));
        assert_eq!(collapse, vec![PieceId(2), PieceId(3), PieceId(4), PieceId(5)]);
    }

    #[test]
    fn test_collapse_cascade_by_caller() {
        let mut world = house(StabilityMode::Arcade);
        let collapse = world.remove(PieceId(1));
        for id in collapse {
            world.remove(id);
        }
        assert!(world.engine.is_empty());
        assert_eq!(world.engine.pending_updates(), 0, "removed pieces leave the queue");
        world
            .engine
            .graph()
            .check_consistency()
            .expect("graph consistent after cascade");
    }

    // --- Cache coherence ---

    /// Fresh engine holding the same pieces, relations and damage.
    fn rebuild(engine: &StabilityEngine) -> StabilityEngine {
        let mut fresh = StabilityEngine::new(engine.config().clone(), engine.materials().clone())
            .expect("same config");
        let graph = engine.graph();
        let mut ids: Vec<PieceId> = graph.ids().collect();
        ids.sort();
        for &id in &ids {
            let piece = graph.piece(id).expect("listed");
            let spec = PieceSpec {
                id,
                position: piece.position,
                size: piece.bounds.size(),
                orientation: piece.orientation,
                material: piece.material,
                grounded: piece.grounded,
            };
            fresh.add_piece(&spec, None).expect("rebuild piece");
        }
        for &id in &ids {
            for &(supporter, kind) in graph.support_relations(id) {
                fresh
                    .add_support_relation(supporter, id, Some(kind))
                    .expect("rebuild edge");
            }
            let health = graph.piece(id).expect("listed").health;
            fresh.set_health(id, health).expect("rebuild health");
        }
        fresh
    }

    #[test]
    fn test_cache_matches_rebuilt_engine_after_mutations() {
        let mut world = World::new(StabilityMode::Heuristic);
        world.place(floor(1, 0.0, 0.5));
        world.place(floor(4, 3.0, 0.5));
        world.place(floor(2, 0.0, 1.5));
        world.place(wall(3, 0.0, 2.5));
        world.place(floor(5, 3.0, 1.5));
        for id in 1..=5 {
            world.stability(id);
        }

        world.remove(PieceId(1));
        world
            .engine
            .set_health(PieceId(3), 0.6)
            .expect("known piece");
        world
            .engine
            .add_support_relation(PieceId(5), PieceId(2), None)
            .expect("bridge");
        world.engine.process_updates(LONG, Some(&world.scene));

        let mut fresh = rebuild(&world.engine);
        for id in [2, 3, 4, 5] {
            let cached = world.stability(id);
            let expected = fresh.stability(PieceId(id));
            assert!(approx(cached, expected), "#{id}: cached {cached}, fresh {expected}");
        }
        assert!(world.stability(2) > 0.0, "bridge restored support");
    }

    #[test]
    fn test_removed_support_relation_invalidates() {
        let mut world = tower(StabilityMode::Heuristic, WOOD, 3);
        assert!(approx(world.stability(3), 0.70));
        assert!(world.engine.remove_support_relation(PieceId(1), PieceId(2)));
        assert_eq!(world.stability(2), 0.0);
        assert_eq!(world.stability(3), 0.0, "no stale dependent score");
        assert!(!world.engine.remove_support_relation(PieceId(1), PieceId(2)));
    }

    #[test]
    fn test_set_mode_clears_cache() {
        let mut world = tower(StabilityMode::Heuristic, WOOD, 3);
        assert!(approx(world.stability(3), 0.70));
        assert!(world.engine.cached_len() > 0);

        world.engine.set_mode(StabilityMode::Arcade);
        assert_eq!(world.engine.mode(), StabilityMode::Arcade);
        assert_eq!(world.engine.cached_len(), 0);
        assert_eq!(world.engine.pending_updates(), 3);
        assert_eq!(world.stability(3), 1.0);
        assert_eq!(world.engine.config().collapse_threshold, 0.05);
    }

    // --- Scheduling ---

    #[test]
    fn test_queue_drains_without_loss() {
        let mut world = tower(StabilityMode::Heuristic, WOOD, 12);
        for id in 1..=12 {
            world.engine.queue_update(PieceId(id), Priority::Background);
        }
        for _ in 0..20 {
            world.engine.process_updates(LONG, None);
        }
        assert_eq!(world.engine.pending_updates(), 0);
        assert_eq!(world.engine.graph().len(), 12);
    }

    #[test]
    fn test_zero_budget_defers_everything() {
        let mut world = tower(StabilityMode::Heuristic, WOOD, 4);
        let queued = world.engine.pending_updates();
        assert!(queued > 0);
        let report = world.engine.process_updates(Duration::ZERO, None);
        assert_eq!(report.processed, 0);
        assert_eq!(report.remaining, queued, "nothing dropped");
        assert_eq!(world.engine.queued_priority(PieceId(1)), Some(Priority::High));
    }

    #[test]
    fn test_zone_defers_far_pieces() {
        let mut config = EngineConfig::default();
        config.scheduler.zone = Some(ZoneConfig {
            cell_size: 10.0,
            active_radius: 0,
        });
        let mut world = World::with_config(config);
        world.place(floor(1, 1.0, 0.5));
        world.place(floor(2, 100.0, 0.5));
        world.engine.set_focus(Some(Vec3::ZERO));

        let report = world.engine.process_updates(LONG, None);
        assert_eq!(report.processed, 1);
        assert_eq!(report.deferred, 1);
        assert_eq!(world.engine.queued_priority(PieceId(2)), Some(Priority::Background));
        assert_eq!(world.engine.cached_len(), 1, "far piece not computed");

        world.engine.set_focus(None);
        let report = world.engine.process_updates(LONG, None);
        assert_eq!(report.processed, 1, "idle tick drains the background debt");
        assert_eq!(world.engine.pending_updates(), 0);
    }

    #[test]
    fn test_immediate_work_bypasses_zone() {
        let mut config = EngineConfig::default();
        config.scheduler.zone = Some(ZoneConfig {
            cell_size: 10.0,
            active_radius: 0,
        });
        let mut world = World::with_config(config);
        world.engine.set_focus(Some(Vec3::ZERO));
        world
            .engine
            .add_piece(&floor(7, 500.0, 0.5), None)
            .expect("added");
        world.engine.queue_update(PieceId(7), Priority::Immediate);

        let report = world.engine.process_updates(LONG, None);
        assert_eq!(report.processed, 1);
        assert_eq!(report.deferred, 0);
    }

    // --- Collaborator failure ---

    #[test]
    fn test_failed_detection_inserts_unsupported_and_retries() {
        let mut world = World::new(StabilityMode::Heuristic);
        world.place(floor(1, 0.0, 0.5));

        let upper = floor(2, 0.0, 1.5);
        let id = world
            .engine
            .add_piece(&upper, Some(&OfflineScene))
            .expect("inserted despite failure");
        world.scene.insert(id, upper.bounds());
        assert!(world.engine.awaiting_detection(id));
        assert_eq!(world.engine.queued_priority(id), Some(Priority::Immediate));
        assert_eq!(world.stability(2), 0.0, "unsupported until detection succeeds");

        let report = world.engine.process_updates(LONG, Some(&OfflineScene));
        assert_eq!(report.retried, 1);
        assert!(world.engine.awaiting_detection(id), "still failing");

        let report = world.engine.process_updates(LONG, Some(&world.scene));
        assert_eq!(report.retried, 1);
        assert!(!world.engine.awaiting_detection(id));
        assert!(approx(world.stability(2), 0.85));
    }

    #[test]
    fn test_failed_detection_rejects_placement() {
        let mut world = house(StabilityMode::Heuristic);
        let result = world
            .engine
            .validate_placement(&floor(8, 0.0, 3.5), &OfflineScene);
        assert!(!result.valid);
        assert!(result
            .reason
            .as_deref()
            .is_some_and(|r| r.starts_with("Support detection failed")));
    }

    // --- Intra-tick ordering ---

    #[test]
    fn test_batch_applies_removals_before_placements() {
        let mut world = house(StabilityMode::Arcade);
        let batch = MutationBatch {
            placements: vec![floor(4, 0.0, 3.5), floor(5, 5.0, 0.5)],
            removals: vec![PieceId(2)],
        };
        let outcome = world.engine.apply_batch(batch, Some(&world.scene));

        assert_eq!(outcome.collapses.len(), 1);
        assert_eq!(outcome.collapses[0].collapse_set, vec![PieceId(3)]);
        assert_eq!(outcome.placed, vec![PieceId(5)]);
        assert_eq!(
            outcome.rejected,
            vec![(PieceId(4), "Not connected to ground".to_string())],
            "placement saw the removal from the same batch"
        );
    }

    #[test]
    fn test_batch_reports_duplicate_and_unknown() {
        let mut world = house(StabilityMode::Heuristic);
        let batch = MutationBatch {
            removals: vec![PieceId(42)],
            placements: vec![floor(1, 0.0, 0.5)],
        };
        let outcome = world.engine.apply_batch(batch, None);
        assert_eq!(outcome.collapses[0].phase, CollapsePhase::Aborted);
        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.placed.is_empty());
    }

    // --- Errors and projection ---

    #[test]
    fn test_unknown_piece_is_neutral() {
        let mut world = house(StabilityMode::Heuristic);
        let ghost = PieceId(99);
        assert_eq!(world.engine.stability(ghost), 0.0);
        assert!(world.engine.report(ghost).is_none());
        assert!(world.engine.remove_piece(ghost).is_empty());
        assert!(!world.engine.queue_update(ghost, Priority::High));
        assert_eq!(world.engine.evaluate_removal(ghost).phase, CollapsePhase::Aborted);
        assert_eq!(
            world.engine.set_health(ghost, 0.5),
            Err(StabilityError::UnknownPiece(ghost))
        );
        assert_eq!(world.engine.len(), 3);
    }

    #[test]
    fn test_mutation_errors() {
        let mut world = house(StabilityMode::Heuristic);
        assert_eq!(
            world.engine.add_piece(&floor(1, 0.0, 0.5), None),
            Err(StabilityError::DuplicatePiece(PieceId(1)))
        );
        assert_eq!(
            world
                .engine
                .add_piece(&spec(50, 0.0, 0.5, Orientation::Vertical, 77), None),
            Err(StabilityError::UnknownMaterial(MaterialId(77)))
        );
        assert_eq!(
            world.engine.add_support_relation(PieceId(2), PieceId(2), None),
            Err(StabilityError::SelfSupport(PieceId(2)))
        );
        assert_eq!(
            world.engine.add_support_relation(PieceId(60), PieceId(2), None),
            Err(StabilityError::UnknownPiece(PieceId(60)))
        );
    }

    #[test]
    fn test_engine_from_shipped_ron() {
        let mut engine = StabilityEngine::from_ron(DEFAULT_ENGINE_RON, DEFAULT_MATERIALS_RON)
            .expect("shipped data builds an engine");
        assert_eq!(engine.mode(), StabilityMode::Heuristic);
        assert!(engine.config().scheduler.zone.is_some());

        let mut base = floor(1, 0.0, 0.5);
        base.grounded = true;
        engine.add_piece(&base, None).expect("placed");
        assert_eq!(engine.stability(PieceId(1)), 1.0);

        let defaults = StabilityEngine::with_defaults().expect("defaults build");
        assert!(defaults.config().scheduler.zone.is_none());
        assert_eq!(defaults.materials().len(), engine.materials().len());

        assert!(matches!(
            StabilityEngine::from_ron("(mode: Sideways)", DEFAULT_MATERIALS_RON),
            Err(StabilityError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.scheduler.low_interval = 0;
        config.cache.target_occupancy = 1.5;
        let materials = default_materials().expect("shipped materials parse");
        match StabilityEngine::new(config, materials) {
            Err(StabilityError::InvalidConfig(message)) => {
                assert!(message.contains("low_interval"), "{message}");
                assert!(message.contains("target_occupancy"), "{message}");
            }
            other => panic!("expected InvalidConfig, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_find_unstable_pieces() {
        let mut world = tower(StabilityMode::Heuristic, THATCH, 5);
        let unstable = world.engine.find_unstable_pieces(None);
        let ids: Vec<PieceId> = unstable.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![PieceId(5)], "only the 0.0 level is below 0.1");

        let shaky = world.engine.find_unstable_pieces(Some(0.6));
        let ids: Vec<PieceId> = shaky.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![PieceId(3), PieceId(4), PieceId(5)], "lowest first");
    }

    #[test]
    fn test_report_serializes_to_json() {
        let mut world = house(StabilityMode::Heuristic);
        let report = world.engine.report(PieceId(1)).expect("known piece");
        let json = serde_json::to_value(report).expect("serialize");
        assert_eq!(json["id"], 1);
        assert_eq!(json["stability"], 1.0);
        assert_eq!(json["support_type"], "Ground");

        let placement = world
            .engine
            .validate_placement(&floor(9, 10.0, 4.5), &world.scene);
        let json = serde_json::to_value(&placement).expect("serialize");
        assert_eq!(json["valid"], false);
        assert_eq!(json["reason"], "No support found");
    }
}
