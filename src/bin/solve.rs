//! Thin CLI harness: loads one or more text-format instances, runs the ILS
//! solver on each, and prints a one-line summary. A convenience for
//! exercising the core end to end — not the benchmark harness, which
//! remains an external collaborator.

use vrp_granular_ils::metrics::{self, IterationRecord};
use vrp_granular_ils::problem::ProblemData;
use vrp_granular_ils::search::stop::{self, StopFn};
use vrp_granular_ils::search::{solve_with_metrics, SolveOptions};
use vrp_granular_ils::solution::{Solution, SolutionRoute};
use vrp_granular_ils::types::{ClientIdx, VehicleTypeIdx};
use vrp_granular_ils::utils::{enumerate_input_files, Args, Parser};

fn empty_solution(problem: &ProblemData) -> Solution {
    let mut routes = Vec::with_capacity(problem.num_vehicles);
    for (vt_idx, vt) in problem.vehicle_types.iter().enumerate() {
        for _ in 0..vt.num_available {
            routes.push(SolutionRoute { vehicle_type: VehicleTypeIdx::new(vt_idx), trips: vec![Vec::new()] });
        }
    }
    let unassigned = (0..problem.num_clients).map(ClientIdx::new).collect();
    Solution::new(problem, routes, unassigned)
}

fn build_stop_fn(args: &Args) -> StopFn {
    let mut predicates: Vec<StopFn> = Vec::new();
    if let Some(n) = args.max_iterations {
        predicates.push(stop::max_iterations(n));
    }
    if let Some(secs) = args.time_limit {
        predicates.push(stop::max_runtime(secs));
    }
    if predicates.is_empty() {
        // Neither limit given: fall back to a generous default so the
        // binary always terminates.
        predicates.push(stop::max_iterations(10_000));
    }
    stop::multiple_criteria(predicates)
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    let instance_files = enumerate_input_files(&args)?;

    for path in instance_files {
        let path_str = path.to_string_lossy().to_string();
        let problem = match ProblemData::load_text(&path_str) {
            Ok(p) => p,
            Err(err) => {
                eprintln!("{path_str}: failed to load: {err}");
                continue;
            }
        };

        let initial = empty_solution(&problem);

        for run in 0..args.runs {
            let mut options = SolveOptions::default();
            options.seed = args.seed.wrapping_add(run as u64);

            let mut metrics_buf: Vec<IterationRecord> = Vec::new();
            let sink = if args.metrics_out.is_some() { Some(&mut metrics_buf) } else { None };

            let stop_fn = build_stop_fn(&args);
            let result = solve_with_metrics(&problem, initial.clone(), options, stop_fn, sink)
                .expect("default SolveOptions with only seed overridden is always valid");

            println!(
                "{path_str} run={run} seed={} iterations={} improvements={} restarts={} initial_cost={} final_cost={} feasible={} runtime_ms={}",
                args.seed.wrapping_add(run as u64),
                result.stats.num_iterations,
                result.stats.improvements,
                result.stats.restarts,
                result.stats.initial_cost,
                result.stats.final_cost,
                result.best_solution.is_feasible,
                result.stats.runtime_ms,
            );

            if let Some(out_prefix) = &args.metrics_out {
                let out_path = format!("{out_prefix}_run{run:03}.parquet");
                if let Err(err) = metrics::serialize_to_parquet(&metrics_buf, &out_path) {
                    eprintln!("{path_str}: failed to write metrics to {out_path}: {err}");
                }
            }
        }
    }

    Ok(())
}
