//! Iterated Local Search driver: Late-Acceptance Hill-Climbing acceptance
//! over a ring-buffer history, adaptive penalties, and restart-on-stagnation.

use crate::cost::CostEvaluator;
use crate::metrics::IterationRecord;
use crate::operators::OperatorParams;
use crate::problem::ProblemData;
use crate::search::local_search::LocalSearch;
use crate::search::penalty::{PenaltyManager, PenaltyParams};
use crate::search::perturbation::{PerturbationManager, PerturbationParams};
use crate::search::ring_buffer::RingBuffer;
use crate::search::stop::StopFn;
use crate::solution::search::SearchSolution;
use crate::solution::Solution;
use crate::types::{ClientIdx, Cost, UNREACHABLE};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro128PlusPlus;
use std::fmt;
use std::time::Instant;

#[derive(Clone, Copy, Debug)]
pub struct IlsParams {
    pub history_size: usize,
    pub max_no_improvement: u64,
}

impl Default for IlsParams {
    fn default() -> Self {
        IlsParams { history_size: 500, max_no_improvement: 50_000 }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SolveStats {
    pub num_iterations: u64,
    pub improvements: u64,
    pub restarts: u64,
    pub initial_cost: Cost,
    pub final_cost: Cost,
    pub runtime_ms: u64,
}

pub struct SolveResult {
    pub best_solution: Solution,
    pub stats: SolveStats,
}

pub struct SolveOptions {
    pub seed: u64,
    pub operator_params: OperatorParams,
    pub penalty_params: PenaltyParams,
    pub ils_params: IlsParams,
    pub perturbation_params: PerturbationParams,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            seed: 0,
            operator_params: OperatorParams::default(),
            penalty_params: PenaltyParams::default(),
            ils_params: IlsParams::default(),
            perturbation_params: PerturbationParams::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ZeroHistorySize,
    NegativeMinPenalty,
    MinExceedsMaxPerturbations,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroHistorySize => write!(f, "ils_params.history_size must be positive"),
            ConfigError::NegativeMinPenalty => write!(f, "penalty_params.min_penalty must not be negative"),
            ConfigError::MinExceedsMaxPerturbations => {
                write!(f, "perturbation_params.min_perturbations must not exceed max_perturbations")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl SolveOptions {
    /// Rejects configuration combinations `solve()` can't safely run with,
    /// before any search work starts: a zero `history_size` would make
    /// `RingBuffer::advance` divide by zero the first time the LAHC ring
    /// buffer advances, a negative `min_penalty` breaks the penalty clamp
    /// in [`crate::search::penalty::PenaltyManager`], and an inverted
    /// perturbation range has no valid sample to draw from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ils_params.history_size == 0 {
            return Err(ConfigError::ZeroHistorySize);
        }
        if self.penalty_params.min_penalty < 0 {
            return Err(ConfigError::NegativeMinPenalty);
        }
        if self.perturbation_params.min_perturbations > self.perturbation_params.max_perturbations {
            return Err(ConfigError::MinExceedsMaxPerturbations);
        }
        Ok(())
    }
}

fn unvisited_required(problem: &ProblemData, solution: &SearchSolution) -> usize {
    (0..problem.num_clients)
        .filter(|&i| {
            let c = ClientIdx::new(i);
            problem.client_location(c).required && !solution.is_assigned(c)
        })
        .count()
}

fn penalised(problem: &ProblemData, cost_eval: &CostEvaluator, solution: &SearchSolution) -> Cost {
    cost_eval.penalised_cost_total(solution.routes(), unvisited_required(problem, solution), cost_eval.tw_penalty().max(1) * 1_000)
}

fn feasible_cost(problem: &ProblemData, cost_eval: &CostEvaluator, solution: &SearchSolution) -> Cost {
    cost_eval.cost_total(solution.routes(), unvisited_required(problem, solution))
}

fn penalised_value(problem: &ProblemData, cost_eval: &CostEvaluator, solution: &Solution) -> Cost {
    let mut view = SearchSolution::new(problem);
    view.load(problem, solution);
    penalised(problem, cost_eval, &view)
}

/// Runs the ILS/LAHC loop until `stop_fn` returns `true`, starting from
/// `initial`. If `metrics_sink` is supplied, one [`IterationRecord`] is
/// pushed per outer iteration; the core itself never writes these anywhere,
/// it's up to the caller (e.g. the CLI harness) to persist them.
pub fn solve(problem: &ProblemData, initial: Solution, options: SolveOptions, stop_fn: StopFn) -> Result<SolveResult, ConfigError> {
    solve_with_metrics(problem, initial, options, stop_fn, None)
}

pub fn solve_with_metrics(
    problem: &ProblemData,
    initial: Solution,
    options: SolveOptions,
    mut stop_fn: StopFn,
    mut metrics_sink: Option<&mut Vec<IterationRecord>>,
) -> Result<SolveResult, ConfigError> {
    options.validate()?;

    let start = Instant::now();
    let rng = Xoshiro128PlusPlus::seed_from_u64(options.seed);
    let mut local_search = LocalSearch::new(problem, options.operator_params, rng, PerturbationManager::new(options.perturbation_params));
    let mut penalty_manager = PenaltyManager::init_from(problem, options.penalty_params);
    let mut cost_eval = penalty_manager.cost_evaluator();

    let mut current = SearchSolution::new(problem);
    current.load(problem, &initial);
    let mut current_pen = penalised(problem, &cost_eval, &current);

    let mut best = initial;
    let mut best_obj = feasible_cost(problem, &cost_eval, &current);

    let mut history: RingBuffer<Solution> = RingBuffer::new(options.ils_params.history_size);
    let mut no_improve = 0u64;
    let mut stats = SolveStats { initial_cost: current_pen, final_cost: best_obj, ..Default::default() };

    loop {
        stats.num_iterations += 1;

        let mut restarted = false;
        if no_improve >= options.ils_params.max_no_improvement {
            current.load(problem, &best);
            current_pen = penalised(problem, &cost_eval, &current);
            history.clear();
            no_improve = 0;
            stats.restarts += 1;
            restarted = true;
        }

        let mut candidate = current.clone();
        candidate = local_search.operator(problem, &cost_eval, candidate, false);
        let cand_pen = penalised(problem, &cost_eval, &candidate);
        let cand_obj = feasible_cost(problem, &cost_eval, &candidate);

        no_improve += 1;
        if cand_obj < best_obj {
            best_obj = cand_obj;
            best = candidate.unload(problem);
            no_improve = 0;
            stats.improvements += 1;
        }

        let late_cost = match history.peek() {
            Some(late) => penalised_value(problem, &cost_eval, late),
            None => penalised_value(problem, &cost_eval, &best),
        };

        let accept = cand_pen < late_cost || cand_pen < current_pen;
        let candidate_value = candidate.unload(problem);
        if accept {
            current = candidate;
            current_pen = cand_pen;
        }

        if current_pen < late_cost || history.peek().is_none() {
            history.append(current.unload(problem));
        } else {
            history.skip();
        }

        if penalty_manager.register(&candidate_value) {
            cost_eval = penalty_manager.cost_evaluator();
        }

        stats.final_cost = best_obj;

        if let Some(sink) = metrics_sink.as_deref_mut() {
            sink.push(IterationRecord {
                iteration: stats.num_iterations as usize,
                candidate_pen: cand_pen,
                candidate_obj: cand_obj,
                current_pen,
                best_obj,
                accepted: accept,
                restarted,
                time: start.elapsed().as_secs_f64(),
            });
        }

        if stop_fn(best_obj) {
            break;
        }
    }

    // Finalising/cleanup pass (spec's own term for this): if the stop
    // predicate fired before any improving candidate was ever found, `best`
    // is still the possibly-infeasible initial solution. Give the local
    // search one more exhaustive shot at it under max-penalty pressure
    // before handing it back, using the evaluator `PenaltyManager` sets
    // aside for exactly this.
    if best_obj >= UNREACHABLE {
        let max_eval = penalty_manager.max_cost_evaluator();
        let mut cleanup = SearchSolution::new(problem);
        cleanup.load(problem, &best);
        let cleaned = local_search.operator(problem, &max_eval, cleanup, true);
        let cleaned_obj = feasible_cost(problem, &max_eval, &cleaned);
        if cleaned_obj < best_obj {
            best_obj = cleaned_obj;
            best = cleaned.unload(problem);
            stats.improvements += 1;
        }
        stats.final_cost = best_obj;
    }

    stats.runtime_ms = start.elapsed().as_millis() as u64;
    Ok(SolveResult { best_solution: best, stats })
}
