//! Support graph: which pieces hold up which, and which rest on terrain.
//! Pure bookkeeping and reachability; scoring lives in `buttress-engine`.

mod graph;
mod traversal;

pub use graph::SupportGraph;
