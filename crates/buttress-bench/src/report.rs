use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete baseline containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// Load a baseline from a JSON file. Returns None if the file doesn't exist
/// or does not parse.
pub fn load_baseline(path: &Path) -> Option<Baseline> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(baseline) => Some(baseline),
        Err(e) => {
            log::warn!("Ignoring unreadable baseline {}: {e}", path.display());
            None
        }
    }
}

/// Save a baseline to a JSON file.
pub fn save_baseline(path: &Path, baseline: &Baseline) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(baseline).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Compare current results against a baseline. Returns a list of regressions
/// (scene name, percent change) where the threshold is exceeded. Scenes are
/// matched by name and mode.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<(String, f64)> {
    let mut regressions = Vec::new();

    for result in current {
        let Some(base) = baseline
            .results
            .iter()
            .find(|b| b.scene_name == result.scene_name && b.mode == result.mode)
        else {
            continue;
        };
        let base_ms = base.total_mean_ms();
        if base_ms <= 0.0 {
            continue;
        }
        let pct_change = (result.total_mean_ms() - base_ms) / base_ms * 100.0;
        if pct_change > threshold_pct {
            regressions.push((format!("{} {:?}", result.scene_name, result.mode), pct_change));
        }
    }

    regressions
}

/// Format results as a markdown summary table (mean / p95 per phase).
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Mode | Pieces | Place (ms) | Process (ms) | Query (ms) | Remove (ms) | P95 total (ms) |\n");
    out.push_str("|-------|------|--------|------------|--------------|------------|-------------|----------------|\n");

    for r in results {
        let p95 = r.place.p95_ms + r.process.p95_ms + r.query.p95_ms + r.remove.p95_ms;
        out.push_str(&format!(
            "| {} | {:?} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
            r.scene_name,
            r.mode,
            r.pieces,
            r.place.mean_ms,
            r.process.mean_ms,
            r.query.mean_ms,
            r.remove.mean_ms,
            p95,
        ));
    }

    out
}

/// Format a comparison report showing regressions.
pub fn format_comparison(regressions: &[(String, f64)], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "All scenes within {:.0}% threshold. No regressions detected.\n",
            threshold_pct
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "REGRESSIONS DETECTED (>{:.0}% threshold):\n",
        threshold_pct
    ));
    for (scene, pct) in regressions {
        out.push_str(&format!("  - {}: +{:.1}%\n", scene, pct));
    }
    out
}
