//! Scalar cost evaluation: turns a route's (or solution's) raw aggregates
//! into a single penalised [`Cost`] value, given the current penalty weights.

use crate::operators::splice::RouteAggregates;
use crate::problem::ProblemData;
use crate::solution::route::Route;
use crate::types::{sat_add, Cost, UNREACHABLE};

/// Bound to a fixed set of penalty weights. Cheap to construct and copy;
/// `search::penalty::PenaltyManager` hands out a fresh one whenever its
/// weights change.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CostEvaluator {
    load_penalty: [Cost; ProblemData::MAX_DIMENSIONS],
    num_dimensions: usize,
    tw_penalty: Cost,
    dist_penalty: Cost,
}

impl CostEvaluator {
    pub fn new(load_penalty: &[Cost], tw_penalty: Cost, dist_penalty: Cost) -> Self {
        debug_assert!(load_penalty.iter().all(|&p| p >= 0));
        debug_assert!(tw_penalty >= 0 && dist_penalty >= 0);

        let mut padded = [0; ProblemData::MAX_DIMENSIONS];
        padded[..load_penalty.len()].copy_from_slice(load_penalty);

        CostEvaluator { load_penalty: padded, num_dimensions: load_penalty.len(), tw_penalty, dist_penalty }
    }

    pub fn load_penalty(&self, dimension: usize) -> Cost {
        self.load_penalty[dimension]
    }

    pub fn tw_penalty(&self) -> Cost {
        self.tw_penalty
    }

    pub fn dist_penalty(&self) -> Cost {
        self.dist_penalty
    }

    /// Fixed, distance/duration/overtime, reload, and penalty terms summed
    /// for a single route, minus the prizes its clients collect. Always
    /// finite unless an edge on the route is `UNREACHABLE`.
    pub fn penalised_cost(&self, route: &Route) -> Cost {
        if route.is_empty() {
            return 0;
        }

        let mut cost = route.fixed_vehicle_cost();
        cost = sat_add(cost, route.distance().saturating_mul(route.unit_distance_cost()));
        cost = sat_add(cost, route.duration().saturating_mul(route.unit_duration_cost()));
        cost = sat_add(cost, route.overtime().saturating_mul(route.unit_overtime_cost()));
        cost = sat_add(cost, route.reload_cost());

        for d in 0..self.num_dimensions {
            cost = sat_add(cost, route.excess_load(d).saturating_mul(self.load_penalty[d]));
        }

        cost = sat_add(cost, route.time_warp().saturating_mul(self.tw_penalty));
        cost = sat_add(cost, route.excess_distance().saturating_mul(self.dist_penalty));
        cost = cost.saturating_sub(route.prizes_collected());

        cost.min(UNREACHABLE)
    }

    /// Same formula as [`Self::penalised_cost`], but reading the route's
    /// distance/duration/load/reload aggregates from `agg` instead of from
    /// `route` itself. `route` still supplies the per-route cost factors
    /// (fixed/unit costs), which a splice never changes.
    pub fn penalised_cost_from_aggregates(&self, route: &Route, agg: &RouteAggregates) -> Cost {
        if agg.num_clients == 0 {
            return 0;
        }

        let mut cost = route.fixed_vehicle_cost();
        cost = sat_add(cost, agg.distance.saturating_mul(route.unit_distance_cost()));
        cost = sat_add(cost, agg.duration.saturating_mul(route.unit_duration_cost()));
        cost = sat_add(cost, agg.overtime.saturating_mul(route.unit_overtime_cost()));
        cost = sat_add(cost, (agg.num_trips.saturating_sub(1) as Cost).saturating_mul(route.reload_cost_per_trip()));

        for d in 0..self.num_dimensions {
            cost = sat_add(cost, agg.excess_load[d].saturating_mul(self.load_penalty[d]));
        }

        cost = sat_add(cost, agg.time_warp.saturating_mul(self.tw_penalty));
        cost = sat_add(cost, agg.excess_distance.saturating_mul(self.dist_penalty));
        cost = cost.saturating_sub(agg.prizes_collected);

        cost.min(UNREACHABLE)
    }

    /// `penalised_cost(route)` if the route has no violations, else
    /// `UNREACHABLE` (this crate's stand-in for `+infinity`).
    pub fn cost(&self, route: &Route) -> Cost {
        if route.is_feasible() {
            self.penalised_cost(route)
        } else {
            UNREACHABLE
        }
    }

    /// Sums `penalised_cost` over every route plus a fixed penalty for every
    /// unvisited required client (its prize, or a large constant if it has
    /// none — required clients are meant to always be visited).
    pub fn penalised_cost_total(&self, routes: &[Route], num_unvisited_required: usize, unvisited_penalty: Cost) -> Cost {
        let mut total = routes.iter().fold(0, |acc, r| sat_add(acc, self.penalised_cost(r)));
        total = sat_add(total, (num_unvisited_required as Cost).saturating_mul(unvisited_penalty));
        total
    }

    /// `UNREACHABLE` once any route is infeasible or any required client is
    /// unvisited; otherwise the sum of `cost` over all routes.
    pub fn cost_total(&self, routes: &[Route], num_unvisited_required: usize) -> Cost {
        if num_unvisited_required > 0 {
            return UNREACHABLE;
        }
        routes.iter().fold(0, |acc, r| sat_add(acc, self.cost(r))).min(UNREACHABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_penalties_zero_violations_is_just_fixed_and_variable_cost() {
        let eval = CostEvaluator::new(&[0], 0, 0);
        assert_eq!(eval.tw_penalty(), 0);
        assert_eq!(eval.load_penalty(0), 0);
    }

    #[test]
    fn monotone_in_time_warp() {
        let lo = CostEvaluator::new(&[0], 10, 0);
        let hi = CostEvaluator::new(&[0], 20, 0);
        assert!(hi.tw_penalty() > lo.tw_penalty());
    }
}
