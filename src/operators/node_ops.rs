//! Node operators: moves that relocate or swap one or a few clients between
//! two positions, possibly in different routes.
//!
//! Every `evaluate` prices its move by splicing the touched window against
//! `Route`'s cached prefix/suffix segment arrays (see
//! [`crate::operators::splice`]) rather than cloning the route and
//! re-simulating it: `insert_cost`/`remove_cost`/`inplace_cost` and every
//! cross-route move are a single splice each (O(1) in the segment size,
//! independent of route length); same-route moves with a gap between the two
//! touched spots splice across that gap, so cost is proportional to the gap
//! length rather than the whole route.

use crate::cost::CostEvaluator;
use crate::operators::splice::splice;
use crate::problem::ProblemData;
use crate::solution::route::{Route, RouteNode};
use crate::solution::search::SearchSolution;
use crate::types::*;

/// Delta of inserting client `client` (currently unassigned) immediately
/// after position `after` in `route`. `0` if `after` points at a depot in a
/// route with no legal slot, per the "move undefined" contract.
pub fn insert_cost(problem: &ProblemData, cost_eval: &CostEvaluator, route: &Route, after: usize, client: ClientIdx) -> Cost {
    if after >= route.size() - 1 {
        return 0;
    }
    let before = cost_eval.penalised_cost(route);
    let agg = splice(problem, route, (after + 1)..(after + 1), &[RouteNode::Client { client }]);
    cost_eval.penalised_cost_from_aggregates(route, &agg) - before
}

/// Delta of removing the client at `position` from `route`. `0` if
/// `position` is a depot.
pub fn remove_cost(problem: &ProblemData, cost_eval: &CostEvaluator, route: &Route, position: usize) -> Cost {
    if route.node_at(position).is_depot() {
        return 0;
    }
    let before = cost_eval.penalised_cost(route);
    let agg = splice(problem, route, position..(position + 1), &[]);
    cost_eval.penalised_cost_from_aggregates(route, &agg) - before
}

/// Delta of opening a new trip for `client` (currently unassigned) by
/// splicing in `(reload_depot -> client)` immediately after position `after`
/// in `route`. `0` if `after` points at a depot in a route with no legal
/// slot; the caller is responsible for checking the vehicle type actually
/// supports reloads and has a trip slot free.
pub fn insert_new_trip_cost(problem: &ProblemData, cost_eval: &CostEvaluator, route: &Route, after: usize, client: ClientIdx, reload_loc: LocationIdx) -> Cost {
    if after >= route.size() - 1 {
        return 0;
    }
    let before = cost_eval.penalised_cost(route);
    let middle = [RouteNode::Depot { location: reload_loc, kind: DepotKind::Reload }, RouteNode::Client { client }];
    let agg = splice(problem, route, (after + 1)..(after + 1), &middle);
    cost_eval.penalised_cost_from_aggregates(route, &agg) - before
}

/// Delta of replacing the client currently at `position` with `client`
/// (used for swap-with-unassigned). `0` if `position` is a depot.
pub fn inplace_cost(problem: &ProblemData, cost_eval: &CostEvaluator, route: &Route, position: usize, client: ClientIdx) -> Cost {
    if route.node_at(position).is_depot() {
        return 0;
    }
    let before = cost_eval.penalised_cost(route);
    let agg = splice(problem, route, position..(position + 1), &[RouteNode::Client { client }]);
    cost_eval.penalised_cost_from_aggregates(route, &agg) - before
}

/// Tagged variants of the intra/inter-route client moves. `k`/`m` give the
/// segment sizes for `Exchange` (0 means "no segment here" — a pure
/// relocation rather than a swap).
#[derive(Copy, Clone, Debug)]
pub enum NodeOp {
    Exchange { k: u8, m: u8 },
    SwapTails,
    RelocateWithDepot,
}

#[derive(Copy, Clone, Debug)]
pub struct NodeOpStats {
    pub num_evaluations: u64,
    pub num_applications: u64,
}

fn client_segment(route: &Route, start: usize, len: usize) -> Option<Vec<ClientIdx>> {
    if len == 0 {
        return Some(Vec::new());
    }
    let end = start + len;
    if end >= route.size() {
        return None;
    }
    let mut out = Vec::with_capacity(len);
    for i in start..end {
        out.push(route.node_at(i).client()?);
    }
    Some(out)
}

fn client_nodes(seg: &[ClientIdx]) -> Vec<RouteNode> {
    seg.iter().map(|&client| RouteNode::Client { client }).collect()
}

impl NodeOp {
    /// Evaluates moving/swapping a segment of `k` clients starting at `pos_u`
    /// in `route_u` with a segment of `m` clients starting at `pos_v` in
    /// `route_v`. Both positions must name clients (not depots); segments
    /// must not overlap when `route_u == route_v`.
    pub fn evaluate(
        &self,
        problem: &ProblemData,
        cost_eval: &CostEvaluator,
        route_u: &Route,
        pos_u: usize,
        route_v: &Route,
        pos_v: usize,
    ) -> Cost {
        match *self {
            NodeOp::Exchange { k, m } => self.evaluate_exchange(problem, cost_eval, route_u, pos_u, route_v, pos_v, k as usize, m as usize),
            NodeOp::SwapTails => self.evaluate_swap_tails(problem, cost_eval, route_u, pos_u, route_v, pos_v),
            NodeOp::RelocateWithDepot => self.evaluate_relocate_with_depot(problem, cost_eval, route_u, pos_u, route_v, pos_v),
        }
    }

    fn evaluate_exchange(
        &self,
        problem: &ProblemData,
        cost_eval: &CostEvaluator,
        route_u: &Route,
        pos_u: usize,
        route_v: &Route,
        pos_v: usize,
        k: usize,
        m: usize,
    ) -> Cost {
        if route_u.node_at(pos_u).is_depot() || route_v.node_at(pos_v).is_depot() {
            return 0;
        }
        let Some(seg_u) = client_segment(route_u, pos_u, k) else { return 0 };
        if seg_u.is_empty() {
            return 0;
        }
        if m == 0 {
            return Self::evaluate_relocate(problem, cost_eval, route_u, pos_u, &seg_u, route_v, pos_v);
        }
        let Some(seg_v) = client_segment(route_v, pos_v, m) else { return 0 };
        if seg_v.is_empty() {
            return 0;
        }

        let same_route = route_u.idx() == route_v.idx();
        if same_route {
            let (lo, lo_len, hi, hi_len) = if pos_u <= pos_v { (pos_u, k, pos_v, m) } else { (pos_v, m, pos_u, k) };
            if lo + lo_len > hi {
                return 0; // overlapping segments: undefined.
            }

            // Whichever segment wasn't originally at `lo` lands there, and
            // vice versa at `hi` — that's what swapping the two spans means.
            let (new_lo, new_hi) = if pos_u <= pos_v { (&seg_v, &seg_u) } else { (&seg_u, &seg_v) };
            let gap: Vec<RouteNode> = route_u.nodes()[lo + lo_len..hi].to_vec();
            let mut middle = client_nodes(new_lo);
            middle.extend(gap);
            middle.extend(client_nodes(new_hi));

            let before = cost_eval.penalised_cost(route_u);
            let agg = splice(problem, route_u, lo..(hi + hi_len), &middle);
            return cost_eval.penalised_cost_from_aggregates(route_u, &agg) - before;
        }

        let before = cost_eval.penalised_cost(route_u) + cost_eval.penalised_cost(route_v);
        let agg_u = splice(problem, route_u, pos_u..(pos_u + k), &client_nodes(&seg_v));
        let agg_v = splice(problem, route_v, pos_v..(pos_v + m), &client_nodes(&seg_u));
        cost_eval.penalised_cost_from_aggregates(route_u, &agg_u) + cost_eval.penalised_cost_from_aggregates(route_v, &agg_v) - before
    }

    /// Relocates the `seg_u` segment (already read out of `route_u` at
    /// `pos_u`) to just after `pos_v` in `route_v`, without touching the
    /// client at `pos_v` itself. The `m == 0` case of [`Self::evaluate_exchange`].
    fn evaluate_relocate(problem: &ProblemData, cost_eval: &CostEvaluator, route_u: &Route, pos_u: usize, seg_u: &[ClientIdx], route_v: &Route, pos_v: usize) -> Cost {
        let k = seg_u.len();
        if route_u.idx() == route_v.idx() {
            if pos_v >= pos_u && pos_v < pos_u + k {
                return 0; // destination falls inside the segment being moved.
            }
            let (range, middle) = if pos_v > pos_u {
                let mut middle: Vec<RouteNode> = route_u.nodes()[pos_u + k..=pos_v].to_vec();
                middle.extend(client_nodes(seg_u));
                (pos_u..(pos_v + 1), middle)
            } else {
                let mut middle = client_nodes(seg_u);
                middle.extend(route_u.nodes()[pos_v + 1..pos_u].iter().copied());
                ((pos_v + 1)..(pos_u + k), middle)
            };
            let before = cost_eval.penalised_cost(route_u);
            let agg = splice(problem, route_u, range, &middle);
            return cost_eval.penalised_cost_from_aggregates(route_u, &agg) - before;
        }

        let before = cost_eval.penalised_cost(route_u) + cost_eval.penalised_cost(route_v);
        let agg_u = splice(problem, route_u, pos_u..(pos_u + k), &[]);
        let agg_v = splice(problem, route_v, (pos_v + 1)..(pos_v + 1), &client_nodes(seg_u));
        cost_eval.penalised_cost_from_aggregates(route_u, &agg_u) + cost_eval.penalised_cost_from_aggregates(route_v, &agg_v) - before
    }

    fn evaluate_swap_tails(&self, problem: &ProblemData, cost_eval: &CostEvaluator, route_u: &Route, pos_u: usize, route_v: &Route, pos_v: usize) -> Cost {
        if route_u.idx() == route_v.idx() {
            return 0;
        }
        let before = cost_eval.penalised_cost(route_u) + cost_eval.penalised_cost(route_v);

        let tail_u: Vec<RouteNode> = route_u.nodes()[pos_u..route_u.size() - 1].to_vec();
        let tail_v: Vec<RouteNode> = route_v.nodes()[pos_v..route_v.size() - 1].to_vec();

        let agg_u = splice(problem, route_u, pos_u..(route_u.size() - 1), &tail_v);
        let agg_v = splice(problem, route_v, pos_v..(route_v.size() - 1), &tail_u);
        cost_eval.penalised_cost_from_aggregates(route_u, &agg_u) + cost_eval.penalised_cost_from_aggregates(route_v, &agg_v) - before
    }

    /// Relocates the client at `pos_u` to just after `pos_v`, inserting or
    /// removing a reload depot so the new trip structure stays legal. Only
    /// defined when the destination route's vehicle type supports reloads.
    fn evaluate_relocate_with_depot(&self, problem: &ProblemData, cost_eval: &CostEvaluator, route_u: &Route, pos_u: usize, route_v: &Route, pos_v: usize) -> Cost {
        let Some(client) = route_u.node_at(pos_u).client() else { return 0 };
        let vt_v = problem.vehicle_type(route_v.vehicle_type());
        if vt_v.max_reloads == 0 {
            return 0;
        }
        let Some(&reload_loc) = vt_v.reload_depots.first() else { return 0 };

        if route_u.idx() == route_v.idx() {
            let (range, middle) = if pos_u < pos_v {
                let mut middle: Vec<RouteNode> = route_u.nodes()[pos_u + 1..=pos_v].to_vec();
                middle.push(RouteNode::Depot { location: reload_loc, kind: DepotKind::Reload });
                middle.push(RouteNode::Client { client });
                (pos_u..(pos_v + 1), middle)
            } else {
                let mut middle = vec![RouteNode::Depot { location: reload_loc, kind: DepotKind::Reload }, RouteNode::Client { client }];
                middle.extend(route_u.nodes()[pos_v + 1..pos_u].iter().copied());
                ((pos_v + 1)..(pos_u + 1), middle)
            };
            let before = cost_eval.penalised_cost(route_u);
            let agg = splice(problem, route_u, range, &middle);
            return cost_eval.penalised_cost_from_aggregates(route_u, &agg) - before;
        }

        let before = cost_eval.penalised_cost(route_u) + cost_eval.penalised_cost(route_v);
        let agg_u = splice(problem, route_u, pos_u..(pos_u + 1), &[]);
        let middle = vec![RouteNode::Depot { location: reload_loc, kind: DepotKind::Reload }, RouteNode::Client { client }];
        let agg_v = splice(problem, route_v, (pos_v + 1)..(pos_v + 1), &middle);
        cost_eval.penalised_cost_from_aggregates(route_u, &agg_u) + cost_eval.penalised_cost_from_aggregates(route_v, &agg_v) - before
    }

    /// Applies the move evaluated by `evaluate` with the same arguments. The
    /// caller (`LocalSearch`) is responsible for calling `route.update()` on
    /// every affected route afterwards.
    pub fn apply(&self, solution: &mut SearchSolution, route_u: RouteIdx, pos_u: usize, route_v: RouteIdx, pos_v: usize, reload_loc: Option<LocationIdx>) {
        match *self {
            NodeOp::Exchange { k, m } => self.apply_exchange(solution, route_u, pos_u, route_v, pos_v, k as usize, m as usize),
            NodeOp::SwapTails => self.apply_swap_tails(solution, route_u, pos_u, route_v, pos_v),
            NodeOp::RelocateWithDepot => self.apply_relocate_with_depot(solution, route_u, pos_u, route_v, pos_v, reload_loc),
        }
    }

    fn apply_exchange(&self, solution: &mut SearchSolution, route_u: RouteIdx, pos_u: usize, route_v: RouteIdx, pos_v: usize, k: usize, m: usize) {
        let seg_u = client_segment(solution.route(route_u), pos_u, k).unwrap_or_default();
        if m == 0 {
            Self::apply_relocate(solution, route_u, pos_u, &seg_u, route_v, pos_v);
            return;
        }
        let seg_v = client_segment(solution.route(route_v), pos_v, m).unwrap_or_default();

        if route_u == route_v {
            let (lo, lo_len, lo_seg, hi, hi_len, hi_seg) = if pos_u <= pos_v {
                (pos_u, seg_u.len(), seg_v.clone(), pos_v, seg_v.len(), seg_u.clone())
            } else {
                (pos_v, seg_v.len(), seg_u.clone(), pos_u, seg_u.len(), seg_v.clone())
            };
            let route = solution.route_mut(route_u);
            for _ in 0..hi_len {
                route.remove(hi);
            }
            for (i, &c) in hi_seg.iter().enumerate() {
                route.insert(hi + i, RouteNode::Client { client: c });
            }
            for _ in 0..lo_len {
                route.remove(lo);
            }
            for (i, &c) in lo_seg.iter().enumerate() {
                route.insert(lo + i, RouteNode::Client { client: c });
            }
            return;
        }

        for _ in 0..seg_u.len() {
            solution.route_mut(route_u).remove(pos_u);
        }
        for (i, &c) in seg_v.iter().enumerate() {
            solution.route_mut(route_u).insert(pos_u + i, RouteNode::Client { client: c });
        }
        for _ in 0..seg_v.len() {
            solution.route_mut(route_v).remove(pos_v);
        }
        for (i, &c) in seg_u.iter().enumerate() {
            solution.route_mut(route_v).insert(pos_v + i, RouteNode::Client { client: c });
        }
    }

    /// The `m == 0` case of [`Self::apply_exchange`]: moves `seg_u` to just
    /// after `pos_v` without disturbing the client already there.
    fn apply_relocate(solution: &mut SearchSolution, route_u: RouteIdx, pos_u: usize, seg_u: &[ClientIdx], route_v: RouteIdx, pos_v: usize) {
        let k = seg_u.len();
        if route_u == route_v {
            let dest = if pos_v > pos_u { pos_v - k } else { pos_v };
            let route = solution.route_mut(route_u);
            for _ in 0..k {
                route.remove(pos_u);
            }
            for (i, &c) in seg_u.iter().enumerate() {
                route.insert(dest + 1 + i, RouteNode::Client { client: c });
            }
            return;
        }
        for _ in 0..k {
            solution.route_mut(route_u).remove(pos_u);
        }
        for (i, &c) in seg_u.iter().enumerate() {
            solution.route_mut(route_v).insert(pos_v + 1 + i, RouteNode::Client { client: c });
        }
    }

    fn apply_swap_tails(&self, solution: &mut SearchSolution, route_u: RouteIdx, pos_u: usize, route_v: RouteIdx, pos_v: usize) {
        let tail_u: Vec<RouteNode> = solution.route(route_u).nodes()[pos_u..solution.route(route_u).size() - 1].to_vec();
        let tail_v: Vec<RouteNode> = solution.route(route_v).nodes()[pos_v..solution.route(route_v).size() - 1].to_vec();

        {
            let ru = solution.route_mut(route_u);
            for _ in pos_u..ru.size() - 1 {
                ru.remove(pos_u);
            }
            for (i, node) in tail_v.into_iter().enumerate() {
                ru.insert(pos_u + i, node);
            }
        }
        {
            let rv = solution.route_mut(route_v);
            for _ in pos_v..rv.size() - 1 {
                rv.remove(pos_v);
            }
            for (i, node) in tail_u.into_iter().enumerate() {
                rv.insert(pos_v + i, node);
            }
        }
    }

    fn apply_relocate_with_depot(&self, solution: &mut SearchSolution, route_u: RouteIdx, pos_u: usize, route_v: RouteIdx, pos_v: usize, reload_loc: Option<LocationIdx>) {
        let Some(reload_loc) = reload_loc else { return };
        let Some(client) = solution.route(route_u).node_at(pos_u).client() else { return };

        if route_u == route_v {
            let insert_at = if pos_u < pos_v { pos_v - 1 } else { pos_v };
            let route = solution.route_mut(route_u);
            route.remove(pos_u);
            route.insert(insert_at + 1, RouteNode::Depot { location: reload_loc, kind: DepotKind::Reload });
            route.insert(insert_at + 2, RouteNode::Client { client });
            return;
        }

        solution.route_mut(route_u).remove(pos_u);
        let rv = solution.route_mut(route_v);
        rv.insert(pos_v + 1, RouteNode::Depot { location: reload_loc, kind: DepotKind::Reload });
        rv.insert(pos_v + 2, RouteNode::Client { client });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{ClientGroup, Location, SameVehicleGroup, VehicleType};
    use crate::solution::search::SearchSolution;
    use crate::utils::Matrix3;

    fn loc(x: f64, delivery: Load) -> Location {
        Location {
            x,
            y: 0.0,
            tw_early: 0,
            tw_late: 1_000,
            service_duration: 0,
            release_time: 0,
            prize: 0,
            required: true,
            group_id: None,
            delivery: vec![delivery],
            pickup: vec![0],
        }
    }

    fn line_problem() -> ProblemData {
        // depot(0,0) - A(10,0) delivery 5 - B(20,0) delivery 5
        let locations = vec![loc(0.0, 0), loc(10.0, 5), loc(20.0, 5)];
        let mut distance = Matrix3::new(1, 3, 3, 0);
        let mut duration = Matrix3::new(1, 3, 3, 0);
        for (a, b, d) in [(0, 1, 10), (1, 0, 10), (1, 2, 10), (2, 1, 10), (0, 2, 20), (2, 0, 20)] {
            *distance.get_mut(0, a, b) = d;
            *duration.get_mut(0, a, b) = d;
        }
        let vt = VehicleType {
            num_available: 1,
            capacity: vec![20],
            start_depot: LocationIdx::new(0),
            end_depot: LocationIdx::new(0),
            reload_depots: vec![],
            max_reloads: 0,
            shift_duration: None,
            max_duration: None,
            max_distance: None,
            tw_early: 0,
            tw_late: 1_000,
            fixed_cost: 0,
            unit_distance_cost: 1,
            unit_duration_cost: 0,
            unit_overtime_cost: 0,
            reload_cost: 0,
            profile: ProfileIdx::new(0),
            name: "veh".into(),
            allowed_clients: None,
        };
        ProblemData::new(locations, 1, distance, duration, vec![vt], Vec::<ClientGroup>::new(), Vec::<SameVehicleGroup>::new()).unwrap()
    }

    #[test]
    fn insert_cost_matches_direct_recompute() {
        let problem = line_problem();
        let cost_eval = CostEvaluator::new(&[0], 0, 0);
        let mut solution = SearchSolution::new(&problem);
        solution.route_mut(RouteIdx::new(0)).push_back(RouteNode::Client { client: ClientIdx::new(0) });
        solution.route_mut(RouteIdx::new(0)).update(&problem);

        let route = solution.route(RouteIdx::new(0));
        let delta = insert_cost(&problem, &cost_eval, route, 1, ClientIdx::new(1));

        let mut after = route.clone();
        after.insert(2, RouteNode::Client { client: ClientIdx::new(1) });
        after.update(&problem);
        let expected = cost_eval.penalised_cost(&after) - cost_eval.penalised_cost(route);
        assert_eq!(delta, expected);
    }

    #[test]
    fn relocate_with_gap_matches_direct_recompute() {
        let problem = line_problem();
        let cost_eval = CostEvaluator::new(&[0], 0, 0);
        let mut solution = SearchSolution::new(&problem);
        // Three clients sharing the one location so the gap between the
        // moved node and its destination is non-trivial.
        for c in 0..2 {
            solution.route_mut(RouteIdx::new(0)).push_back(RouteNode::Client { client: ClientIdx::new(c) });
        }
        solution.route_mut(RouteIdx::new(0)).update(&problem);

        let route = solution.route(RouteIdx::new(0));
        // Relocate the client at position 1 to just after position 2 (the
        // last client before the end depot).
        let delta = NodeOp::Exchange { k: 1, m: 0 }.evaluate(&problem, &cost_eval, route, 1, route, 2);

        let mut after = route.clone();
        let client = after.node_at(1).client().unwrap();
        after.remove(1);
        after.insert(2, RouteNode::Client { client });
        after.update(&problem);
        let expected = cost_eval.penalised_cost(&after) - cost_eval.penalised_cost(route);
        assert_eq!(delta, expected);
    }
}
