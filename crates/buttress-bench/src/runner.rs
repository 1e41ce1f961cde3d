use std::time::{Duration, Instant};

use buttress_core::config::StabilityMode;
use buttress_core::error::StabilityError;
use buttress_core::loader::{DEFAULT_ENGINE_RON, DEFAULT_MATERIALS_RON};
use buttress_engine::{FlatScene, StabilityEngine};

use crate::scenes::{self, SceneConfig};

/// Per-tick budget handed to `process_updates`.
const TICK_BUDGET: Duration = Duration::from_millis(4);

/// Safety cap on drain ticks per round.
const MAX_DRAIN_TICKS: u32 = 10_000;

/// Timing data for a single benchmark run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub mode: StabilityMode,
    pub pieces: u32,
    pub rounds: u32,
    /// Inserting every piece through the flat scene.
    pub place: TimingSeries,
    /// Draining the update queue tick by tick.
    pub process: TimingSeries,
    /// Querying every piece once the cache is warm.
    pub query: TimingSeries,
    /// Removing every foundation and collecting collapse sets.
    pub remove: TimingSeries,
}

impl BenchmarkResult {
    /// Mean time of one full round, used for regression comparison.
    pub fn total_mean_ms(&self) -> f64 {
        self.place.mean_ms + self.process.mean_ms + self.query.mean_ms + self.remove.mean_ms
    }
}

pub struct BenchmarkRunner {
    mode: StabilityMode,
    rounds: u32,
}

impl BenchmarkRunner {
    pub fn new(mode: StabilityMode, rounds: u32) -> Self {
        Self {
            mode,
            rounds: rounds.max(1),
        }
    }

    /// Run a single benchmark scene and return timing results.
    pub fn run_scene(&self, config: &SceneConfig) -> Result<BenchmarkResult, StabilityError> {
        log::info!(
            "Running scene '{}' ({} pieces, {:?})...",
            config.name,
            config.piece_count(),
            self.mode
        );
        let specs = scenes::build_tower_grid(config);

        let mut place = Vec::with_capacity(self.rounds as usize);
        let mut process = Vec::with_capacity(self.rounds as usize);
        let mut query = Vec::with_capacity(self.rounds as usize);
        let mut remove = Vec::with_capacity(self.rounds as usize);

        for _ in 0..self.rounds {
            let mut engine = StabilityEngine::from_ron(DEFAULT_ENGINE_RON, DEFAULT_MATERIALS_RON)?;
            engine.set_mode(self.mode);
            let mut scene = FlatScene::new(0.0);

            let start = Instant::now();
            for spec in &specs {
                let id = engine.add_piece(spec, Some(&scene))?;
                scene.insert(id, spec.bounds());
            }
            place.push(ms(start));

            let start = Instant::now();
            let mut ticks = 0;
            while engine.pending_updates() > 0 && ticks < MAX_DRAIN_TICKS {
                engine.process_updates(TICK_BUDGET, Some(&scene));
                ticks += 1;
            }
            process.push(ms(start));
            if engine.pending_updates() > 0 {
                log::warn!("  queue not drained after {ticks} ticks");
            }

            let start = Instant::now();
            for spec in &specs {
                engine.stability(spec.id);
            }
            query.push(ms(start));

            let start = Instant::now();
            let mut collapsed = 0;
            for tower in 0..config.towers {
                let id = scenes::piece_id(config, tower, 0);
                scene.remove(id);
                collapsed += engine.remove_piece(id).len();
            }
            remove.push(ms(start));
            log::debug!("  {collapsed} pieces collapsed, cache {:?}", engine.cache_stats());
        }

        Ok(BenchmarkResult {
            scene_name: config.name.clone(),
            mode: self.mode,
            pieces: config.piece_count(),
            rounds: self.rounds,
            place: compute_timings(&place),
            process: compute_timings(&process),
            query: compute_timings(&query),
            remove: compute_timings(&remove),
        })
    }
}

fn ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Compute timing statistics from a list of timings in milliseconds.
fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let p95_idx = ((n as f64) * 0.95).ceil() as usize;
    let p99_idx = ((n as f64) * 0.99).ceil() as usize;

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: sorted[p95_idx.min(n - 1)],
        p99_ms: sorted[p99_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}
