use std::path::PathBuf;
use std::process;

use buttress_bench::report;
use buttress_bench::runner::BenchmarkRunner;
use buttress_bench::scenes;
use buttress_core::config::StabilityMode;

fn usage() {
    eprintln!("Usage: bench-runner [OPTIONS]");
    eprintln!("  --baseline <path>              Load baseline JSON for comparison");
    eprintln!("  --output <path>                Save current results as JSON baseline");
    eprintln!("  --regression-threshold <pct>   Regression threshold percentage (default: 10)");
    eprintln!("  --towers <n>                   Towers per scene (default: 64)");
    eprintln!("  --rounds <n>                   Rounds per scene and mode (default: 5)");
}

/// Value following a flag, or exit with a message.
fn flag_value(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            process::exit(1);
        }
    }
}

fn parse_or_exit<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            eprintln!("Invalid {flag} value: {value}");
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut baseline_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut regression_threshold = 10.0f64;
    let mut towers = 64u32;
    let mut rounds = 5u32;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--baseline" => {
                i += 1;
                baseline_path = Some(PathBuf::from(flag_value(&args, i, flag)));
            }
            "--output" => {
                i += 1;
                output_path = Some(PathBuf::from(flag_value(&args, i, flag)));
            }
            "--regression-threshold" => {
                i += 1;
                regression_threshold = parse_or_exit(&flag_value(&args, i, flag), flag);
            }
            "--towers" => {
                i += 1;
                towers = parse_or_exit(&flag_value(&args, i, flag), flag);
            }
            "--rounds" => {
                i += 1;
                rounds = parse_or_exit(&flag_value(&args, i, flag), flag);
            }
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let scene_configs = scenes::standard_scenes(towers);
    let mut results = Vec::new();

    for mode in [StabilityMode::Arcade, StabilityMode::Heuristic, StabilityMode::Hybrid] {
        let runner = BenchmarkRunner::new(mode, rounds);
        for config in &scene_configs {
            match runner.run_scene(config) {
                Ok(result) => results.push(result),
                Err(e) => {
                    eprintln!("ERROR: scene '{}' failed: {e}", config.name);
                    process::exit(1);
                }
            }
        }
    }

    // Print markdown summary
    println!("\n## Benchmark Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let baseline = report::Baseline {
            timestamp: bench_timestamp(),
            results: results.clone(),
        };
        match report::save_baseline(path, &baseline) {
            Ok(()) => log::info!("Saved baseline to {}", path.display()),
            Err(e) => {
                eprintln!("ERROR: failed to save baseline {}: {e}", path.display());
                process::exit(1);
            }
        }
    }

    if let Some(ref path) = baseline_path {
        if let Some(baseline) = report::load_baseline(path) {
            let regressions = report::compare(&results, &baseline, regression_threshold);
            println!(
                "{}",
                report::format_comparison(&regressions, regression_threshold)
            );
            if !regressions.is_empty() {
                eprintln!(
                    "ERROR: {} regressions detected, exiting with code 1",
                    regressions.len()
                );
                process::exit(1);
            }
        } else {
            log::warn!("Baseline file not found: {}", path.display());
        }
    }

    log::info!("Benchmark complete.");
}

/// Seconds since the Unix epoch, tagged for the baseline file.
fn bench_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("bench-{secs}")
}
