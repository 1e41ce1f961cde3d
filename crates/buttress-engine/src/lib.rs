//! Stability scoring, caching, incremental scheduling and collapse detection
//! on top of the support graph. [`StabilityEngine`] is the entry point.

pub mod cache;
pub mod calculator;
pub mod collapse;
pub mod engine;
pub mod scene;
pub mod scheduler;

#[cfg(test)]
mod test_harness;

pub use cache::{CacheStats, StabilityCache};
pub use calculator::{Calculator, ScoreContext, ScoreMemo};
pub use collapse::{CollapsePhase, CollapseReport};
pub use engine::{
    BatchOutcome, MutationBatch, PlacementResult, ProcessReport, StabilityEngine, UnstablePiece,
};
pub use scene::{FlatScene, GroundProbe, SupportFinder, Surroundings};
pub use scheduler::{Priority, UpdateScheduler, ZoneGate};
