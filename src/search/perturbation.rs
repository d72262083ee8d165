//! Random perturbation between outer ILS iterations: removes a handful of
//! small contiguous segments of clients from random routes and reinserts
//! them, to knock the search out of the local optimum it just converged to.

use crate::cost::CostEvaluator;
use crate::neighbourhood::Neighbourhood;
use crate::problem::ProblemData;
use crate::solution::search::SearchSolution;
use crate::types::*;
use rand::Rng;
use rand_xoshiro::Xoshiro128PlusPlus;

#[derive(Clone, Copy, Debug)]
pub struct PerturbationParams {
    pub min_perturbations: u32,
    pub max_perturbations: u32,
    /// Upper bound on the length of each removed segment; the actual length
    /// is also capped by how many clients remain to be pulled this call and
    /// by the trip the segment starts in.
    pub max_segment_length: u32,
}

impl Default for PerturbationParams {
    fn default() -> Self {
        PerturbationParams { min_perturbations: 1, max_perturbations: 25, max_segment_length: 3 }
    }
}

pub struct PerturbationManager {
    params: PerturbationParams,
    target: u32,
}

impl PerturbationManager {
    pub fn new(params: PerturbationParams) -> Self {
        PerturbationManager { target: params.min_perturbations, params }
    }

    pub fn num_perturbations(&self) -> u32 {
        self.target
    }

    pub fn shuffle(&mut self, rng: &mut Xoshiro128PlusPlus) {
        self.target = rng.random_range(self.params.min_perturbations..=self.params.max_perturbations);
    }

    /// Repeatedly picks a random non-empty route and pulls out one small
    /// contiguous segment of clients starting at a random position in it
    /// (stopping early at a depot, so a segment never spans across a
    /// reload), until `num_perturbations()` clients have been removed in
    /// total, then reinserts every removed client greedily.
    pub fn perturb(
        &self,
        problem: &ProblemData,
        cost_eval: &CostEvaluator,
        neighbourhoods: &[Neighbourhood],
        solution: &mut SearchSolution,
        rng: &mut Xoshiro128PlusPlus,
    ) {
        let mut removed = Vec::new();
        let mut remaining = self.target;

        while remaining > 0 {
            let non_empty: Vec<RouteIdx> =
                (0..solution.routes().len()).map(RouteIdx::new).filter(|&r| !solution.route(r).is_empty()).collect();
            let Some(&route_idx) = non_empty.get(if non_empty.is_empty() { 0 } else { rng.random_range(0..non_empty.len()) }) else {
                break;
            };

            let client_positions: Vec<usize> =
                (1..solution.route(route_idx).size() - 1).filter(|&i| solution.route(route_idx).node_at(i).client().is_some()).collect();
            if client_positions.is_empty() {
                break;
            }
            let start_pos = client_positions[rng.random_range(0..client_positions.len())];

            let max_len = self.params.max_segment_length.min(remaining).max(1) as usize;
            let route = solution.route(route_idx);
            let mut segment = Vec::with_capacity(max_len);
            let mut pos = start_pos;
            while segment.len() < max_len && pos < route.size() - 1 {
                match route.node_at(pos).client() {
                    Some(client) => {
                        segment.push(client);
                        pos += 1;
                    }
                    None => break,
                }
            }
            if segment.is_empty() {
                break;
            }

            let remove_at = solution.position_of(segment[0]).expect("segment client is assigned");
            for _ in 0..segment.len() {
                solution.route_mut(route_idx).remove(remove_at);
            }
            solution.route_mut(route_idx).update(problem);
            solution.reindex();

            remaining = remaining.saturating_sub(segment.len() as u32);
            removed.extend(segment);
        }

        for client in removed {
            crate::search::local_search::insert_greedy(problem, cost_eval, neighbourhoods, solution, client, problem.client_location(client).required);
        }
    }
}
