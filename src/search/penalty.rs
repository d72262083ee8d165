//! Adaptive penalty weights: nudges the three violation penalties toward a
//! target feasibility rate by watching a rolling window of recent solutions.

use crate::cost::CostEvaluator;
use crate::problem::ProblemData;
use crate::solution::Solution;
use crate::types::Cost;

#[derive(Clone, Copy, Debug)]
pub struct PenaltyParams {
    pub solutions_between_updates: usize,
    pub penalty_increase: f64,
    pub penalty_decrease: f64,
    pub target_feasible: f64,
    pub feas_tolerance: f64,
    pub min_penalty: Cost,
    pub max_penalty: Cost,
}

impl Default for PenaltyParams {
    fn default() -> Self {
        PenaltyParams {
            solutions_between_updates: 500,
            penalty_increase: 1.25,
            penalty_decrease: 0.85,
            target_feasible: 0.65,
            feas_tolerance: 0.05,
            min_penalty: 1,
            max_penalty: 100_000,
        }
    }
}

pub struct PenaltyManager {
    params: PenaltyParams,
    num_dimensions: usize,
    load_penalty: Vec<Cost>,
    tw_penalty: Cost,
    dist_penalty: Cost,
    load_feas: Vec<Vec<bool>>,
    tw_feas: Vec<bool>,
    dist_feas: Vec<bool>,
}

impl PenaltyManager {
    pub fn new(num_dimensions: usize, params: PenaltyParams) -> Self {
        PenaltyManager {
            params,
            num_dimensions,
            load_penalty: vec![params.max_penalty; num_dimensions],
            tw_penalty: params.min_penalty,
            dist_penalty: params.min_penalty,
            load_feas: vec![Vec::with_capacity(params.solutions_between_updates); num_dimensions],
            tw_feas: Vec::with_capacity(params.solutions_between_updates),
            dist_feas: Vec::with_capacity(params.solutions_between_updates),
        }
    }

    /// Seeds the initial penalty weights from the instance's average edge
    /// costs, so the first few iterations already price violations sensibly
    /// instead of starting from an arbitrary constant.
    pub fn init_from(problem: &ProblemData, params: PenaltyParams) -> Self {
        let mut manager = PenaltyManager::new(problem.num_dimensions, params);

        let mut dist_sum: i64 = 0;
        let mut dur_sum: i64 = 0;
        let mut n = 0i64;
        for profile in 0..problem.num_profiles.max(1) {
            let profile = crate::types::ProfileIdx::new(profile);
            for i in 0..problem.num_locations() {
                for j in 0..problem.num_locations() {
                    if i == j {
                        continue;
                    }
                    let a = crate::types::LocationIdx::new(i);
                    let b = crate::types::LocationIdx::new(j);
                    let d = problem.distance(profile, a, b);
                    let t = problem.duration(profile, a, b);
                    if d < crate::types::UNREACHABLE {
                        dist_sum += d;
                        dur_sum += t;
                        n += 1;
                    }
                }
            }
        }
        let avg_edge_cost = if n > 0 { dist_sum / n.max(1) } else { 1 };
        let avg_edge_duration = if n > 0 { (dur_sum / n.max(1)).max(1) } else { 1 };
        let avg_edge_distance = avg_edge_cost.max(1);

        manager.tw_penalty = (avg_edge_cost / avg_edge_duration).max(params.min_penalty);
        manager.dist_penalty = (avg_edge_cost / avg_edge_distance).max(params.min_penalty);

        let max_prize = problem.locations.iter().map(|l| l.prize).max().unwrap_or(0);
        if max_prize > 0 {
            manager.tw_penalty = manager.tw_penalty.max(max_prize / 60);
        }

        manager.tw_penalty = manager.tw_penalty.min(params.max_penalty);
        manager.dist_penalty = manager.dist_penalty.min(params.max_penalty);
        manager
    }

    pub fn cost_evaluator(&self) -> CostEvaluator {
        CostEvaluator::new(&self.load_penalty, self.tw_penalty, self.dist_penalty)
    }

    pub fn max_cost_evaluator(&self) -> CostEvaluator {
        CostEvaluator::new(&vec![self.params.max_penalty; self.num_dimensions], self.params.max_penalty, self.params.max_penalty)
    }

    /// Appends `solution`'s per-dimension feasibility flags; updates weights
    /// (and clears the windows) once any window fills. Returns `true` if any
    /// weight changed, so the caller knows to rebuild its `CostEvaluator`.
    pub fn register(&mut self, solution: &Solution) -> bool {
        let mut changed = false;

        self.tw_feas.push(solution.tw_feasible);
        self.dist_feas.push(solution.dist_feasible);
        for d in 0..self.num_dimensions {
            self.load_feas[d].push(solution.load_feasible.get(d).copied().unwrap_or(true));
        }

        if self.tw_feas.len() >= self.params.solutions_between_updates {
            changed |= Self::update_weight(&mut self.tw_penalty, &self.tw_feas, &self.params);
            self.tw_feas.clear();
        }
        if self.dist_feas.len() >= self.params.solutions_between_updates {
            changed |= Self::update_weight(&mut self.dist_penalty, &self.dist_feas, &self.params);
            self.dist_feas.clear();
        }
        for d in 0..self.num_dimensions {
            if self.load_feas[d].len() >= self.params.solutions_between_updates {
                changed |= Self::update_weight(&mut self.load_penalty[d], &self.load_feas[d], &self.params);
                self.load_feas[d].clear();
            }
        }

        changed
    }

    fn update_weight(weight: &mut Cost, window: &[bool], params: &PenaltyParams) -> bool {
        let rate = window.iter().filter(|&&f| f).count() as f64 / window.len() as f64;
        let before = *weight;

        if rate < params.target_feasible - params.feas_tolerance {
            *weight = ((*weight as f64) * params.penalty_increase).round() as Cost;
        } else if rate > params.target_feasible + params.feas_tolerance {
            *weight = ((*weight as f64) * params.penalty_decrease).round() as Cost;
        }
        *weight = (*weight).clamp(params.min_penalty, params.max_penalty);

        *weight != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PenaltyParams {
        PenaltyParams { solutions_between_updates: 4, ..PenaltyParams::default() }
    }

    fn feasible_solution() -> Solution {
        Solution { routes: vec![], unassigned: vec![], distance: 0, duration: 0, is_feasible: true, tw_feasible: true, dist_feasible: true, load_feasible: vec![true] }
    }

    fn infeasible_solution() -> Solution {
        Solution { routes: vec![], unassigned: vec![], distance: 0, duration: 0, is_feasible: false, tw_feasible: false, dist_feasible: false, load_feasible: vec![false] }
    }

    #[test]
    fn all_feasible_decreases_penalty_toward_min() {
        let mut mgr = PenaltyManager::new(1, params());
        let before = mgr.tw_penalty;
        for _ in 0..4 {
            mgr.register(&feasible_solution());
        }
        assert!(mgr.tw_penalty <= before);
    }

    #[test]
    fn all_infeasible_increases_penalty_toward_max() {
        let mut mgr = PenaltyManager::new(1, params());
        mgr.tw_penalty = 10;
        for _ in 0..4 {
            mgr.register(&infeasible_solution());
        }
        assert!(mgr.tw_penalty > 10);
    }
}
