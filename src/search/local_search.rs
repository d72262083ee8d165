//! Granular-neighbourhood local search: repeatedly sweeps clients and route
//! pairs, applying the first strictly-improving move it finds, until a pass
//! completes with nothing applied.

use crate::cost::CostEvaluator;
use crate::neighbourhood::Neighbourhood;
use crate::operators::node_ops::{self, NodeOp};
use crate::operators::route_ops::{RouteOp, SwapStarCache};
use crate::operators::OperatorParams;
use crate::problem::ProblemData;
use crate::search::perturbation::PerturbationManager;
use crate::solution::route::RouteNode;
use crate::solution::search::SearchSolution;
use crate::types::*;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro128PlusPlus;

/// Finds the client's best legal insertion slot across compatible routes and
/// performs it if `required` or the move is strictly improving. Restricted
/// to the route of an already-inserted same-vehicle-group member, if any.
pub fn insert_greedy(
    problem: &ProblemData,
    cost_eval: &CostEvaluator,
    neighbourhoods: &[Neighbourhood],
    solution: &mut SearchSolution,
    client: ClientIdx,
    required: bool,
) -> bool {
    let candidate_routes: Vec<RouteIdx> = match same_vehicle_group_anchor(problem, solution, client) {
        Some(anchor_route) => {
            let anchor_name = &problem.vehicle_type(solution.route(anchor_route).vehicle_type()).name;
            (0..solution.routes().len())
                .map(RouteIdx::new)
                .filter(|&r| problem.vehicle_type(solution.route(r).vehicle_type()).name == *anchor_name)
                .collect()
        }
        None => (0..solution.routes().len())
            .map(RouteIdx::new)
            .filter(|&r| problem.vehicle_type(solution.route(r).vehicle_type()).allows(client))
            .collect(),
    };

    let mut best: Option<(RouteIdx, usize, Cost)> = None;
    for r in candidate_routes {
        let route = solution.route(r);
        let mut positions = vec![0usize];
        if !route.is_empty() {
            for &nb in neighbourhoods[route.profile().index()].of(client) {
                if let Some(pos) = route.position_of(nb) {
                    positions.push(pos);
                }
            }
        }
        for pos in positions {
            let delta = node_ops::insert_cost(problem, cost_eval, route, pos, client);
            let better = match best {
                Some((_, _, b)) => delta < b,
                None => true,
            };
            if better {
                best = Some((r, pos, delta));
            }
        }
    }

    match best {
        Some((r, pos, delta)) if required || delta < 0 => {
            solution.route_mut(r).insert(pos + 1, RouteNode::Client { client });
            solution.route_mut(r).update(problem);
            solution.reindex();
            solution.mark_promising(client);
            true
        }
        _ => false,
    }
}

fn same_vehicle_group_anchor(problem: &ProblemData, solution: &SearchSolution, client: ClientIdx) -> Option<RouteIdx> {
    let group = problem.same_vehicle_groups.iter().find(|g| g.clients.contains(&client))?;
    group.clients.iter().filter(|&&c| c != client).find_map(|&c| solution.route_of(c))
}

/// True iff moving `client` onto `target` would split a same-vehicle group
/// across routes of differently-named vehicle types.
fn would_violate_same_vehicle(problem: &ProblemData, solution: &SearchSolution, client: ClientIdx, target: RouteIdx) -> bool {
    let Some(group) = problem.same_vehicle_groups.iter().find(|g| g.clients.contains(&client)) else { return false };
    let Some(current) = solution.route_of(client) else { return false };
    if current == target {
        return false;
    }
    let current_name = &problem.vehicle_type(solution.route(current).vehicle_type()).name;
    let target_name = &problem.vehicle_type(solution.route(target).vehicle_type()).name;
    if current_name == target_name {
        return false;
    }
    group.clients.iter().any(|&other| other != client && solution.route_of(other) == Some(current))
}

pub struct LocalSearch {
    neighbourhoods: Vec<Neighbourhood>,
    params: OperatorParams,
    node_ops: Vec<NodeOp>,
    route_ops: Vec<RouteOp>,
    rng: Xoshiro128PlusPlus,
    last_tested: Vec<u64>,
    last_updated: Vec<u64>,
    num_updates: u64,
    perturbation: PerturbationManager,
    swap_star_cache: SwapStarCache,
}

impl LocalSearch {
    pub fn new(problem: &ProblemData, params: OperatorParams, rng: Xoshiro128PlusPlus, perturbation: PerturbationManager) -> Self {
        let neighbourhoods = (0..problem.num_profiles.max(1)).map(|p| Neighbourhood::build(problem, ProfileIdx::new(p), params.granular_k)).collect();

        let mut node_ops = vec![
            NodeOp::Exchange { k: 1, m: 0 },
            NodeOp::Exchange { k: 1, m: 1 },
            NodeOp::Exchange { k: 2, m: 0 },
            NodeOp::Exchange { k: 3, m: 0 },
            NodeOp::SwapTails,
        ];
        for k in 2..=params.max_exchange_segment {
            for m in 1..=k {
                node_ops.push(NodeOp::Exchange { k, m });
            }
        }
        if problem.vehicle_types.iter().any(|vt| vt.max_reloads > 0) {
            node_ops.push(NodeOp::RelocateWithDepot);
        }

        LocalSearch {
            neighbourhoods,
            params,
            node_ops,
            route_ops: vec![RouteOp::SwapStar, RouteOp::SwapRoutes],
            rng,
            last_tested: vec![0; problem.num_clients],
            last_updated: vec![0; problem.num_vehicles],
            num_updates: 0,
            perturbation,
            swap_star_cache: SwapStarCache::new(problem.num_vehicles, problem.num_clients),
        }
    }

    /// Loads `solution`, sweeps node operators plus a one-shot multi-trip
    /// insertion pass, unloads.
    pub fn search(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, mut solution: SearchSolution) -> SearchSolution {
        solution.mark_all_promising();
        self.node_sweep(problem, cost_eval, &mut solution);
        self.multi_trip_insertion_pass(problem, cost_eval, &mut solution);
        solution
    }

    /// Loads `solution`, runs the route-operator sweep only.
    pub fn intensify(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, mut solution: SearchSolution) -> SearchSolution {
        self.route_sweep(problem, cost_eval, &mut solution);
        solution
    }

    /// Optionally perturbs, then alternates `search`/`intensify` to a fixed
    /// point where `intensify` stops finding improvements.
    pub fn operator(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, mut solution: SearchSolution, exhaustive: bool) -> SearchSolution {
        if !exhaustive {
            self.perturbation.shuffle(&mut self.rng);
            self.perturbation.perturb(problem, cost_eval, &self.neighbourhoods, &mut solution, &mut self.rng);
        }

        loop {
            solution = self.search(problem, cost_eval, solution);
            let before = Self::total_cost(problem, cost_eval, &solution);
            solution = self.intensify(problem, cost_eval, solution);
            let after = Self::total_cost(problem, cost_eval, &solution);
            if after >= before {
                break;
            }
        }
        solution
    }

    fn total_cost(problem: &ProblemData, cost_eval: &CostEvaluator, solution: &SearchSolution) -> Cost {
        let num_unvisited_required = (0..problem.num_clients).filter(|&i| problem.client_location(ClientIdx::new(i)).required && !solution.is_assigned(ClientIdx::new(i))).count();
        cost_eval.penalised_cost_total(solution.routes(), num_unvisited_required, cost_eval.tw_penalty().max(1) * 1000)
    }

    fn node_sweep(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, solution: &mut SearchSolution) {
        let mut client_order: Vec<ClientIdx> = (0..problem.num_clients).map(ClientIdx::new).collect();
        client_order.shuffle(&mut self.rng);

        let mut step = 0u64;
        loop {
            let mut applied_any = false;

            for &u in &client_order {
                if !solution.is_promising(u) {
                    continue;
                }
                self.last_tested[u.index()] = self.num_updates;

                self.apply_optional_client_moves(problem, cost_eval, solution, u);
                self.apply_group_moves(problem, cost_eval, solution, u);

                let Some(ru) = solution.route_of(u) else { continue };
                let Some(pu) = solution.position_of(u) else { continue };

                self.apply_depot_removal_neighbours(problem, cost_eval, solution, ru, pu);

                let mut moved = false;
                let neighbours: Vec<ClientIdx> = self.neighbourhoods[solution.route(ru).profile().index()].of(u).to_vec();
                for v in neighbours {
                    let Some(rv) = solution.route_of(v) else { continue };
                    if self.last_updated[ru.index()] < self.last_tested[u.index()] && self.last_updated[rv.index()] < self.last_tested[u.index()] {
                        continue;
                    }
                    if self.try_node_ops(problem, cost_eval, solution, u, v) {
                        moved = true;
                        applied_any = true;
                        break;
                    }
                }
                if moved {
                    continue;
                }

                if step > 0 && self.apply_empty_route_moves(problem, cost_eval, solution, u) {
                    applied_any = true;
                }
            }

            if !applied_any {
                break;
            }
            step += 1;
        }
    }

    /// Iterates vehicle types in a random order; for each, finds the first
    /// empty route and attempts to relocate `u` onto it, just after its
    /// start depot. Deferred to passes after the first so the sweep doesn't
    /// activate idle vehicles before settling non-empty routes.
    fn apply_empty_route_moves(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, solution: &mut SearchSolution, u: ClientIdx) -> bool {
        let Some(ru) = solution.route_of(u) else { return false };
        let Some(pu) = solution.position_of(u) else { return false };

        let mut vt_order: Vec<usize> = (0..problem.vehicle_types.len()).collect();
        vt_order.shuffle(&mut self.rng);

        for vt_idx in vt_order {
            let vt_idx = VehicleTypeIdx::new(vt_idx);
            if !problem.vehicle_type(vt_idx).allows(u) {
                continue;
            }
            let Some(rv) = (0..solution.routes().len())
                .map(RouteIdx::new)
                .find(|&r| solution.route(r).vehicle_type() == vt_idx && solution.route(r).is_empty() && r != ru)
            else {
                continue;
            };
            if would_violate_same_vehicle(problem, solution, u, rv) {
                continue;
            }

            let remove_delta = node_ops::remove_cost(problem, cost_eval, solution.route(ru), pu);
            let insert_delta = node_ops::insert_cost(problem, cost_eval, solution.route(rv), 0, u);
            if remove_delta + insert_delta < 0 {
                solution.route_mut(ru).remove(pu);
                solution.route_mut(ru).update(problem);
                solution.route_mut(rv).insert(1, RouteNode::Client { client: u });
                solution.route_mut(rv).update(problem);
                solution.reindex();
                self.num_updates += 1;
                self.last_updated[ru.index()] = self.num_updates;
                self.last_updated[rv.index()] = self.num_updates;
                solution.mark_promising(u);
                return true;
            }
        }
        false
    }

    fn apply_optional_client_moves(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, solution: &mut SearchSolution, u: ClientIdx) {
        let required = problem.client_location(u).required;
        let assigned = solution.is_assigned(u);

        if required && !assigned {
            insert_greedy(problem, cost_eval, &self.neighbourhoods, solution, u, true);
            return;
        }
        if !assigned {
            insert_greedy(problem, cost_eval, &self.neighbourhoods, solution, u, false);
            return;
        }

        if !required {
            let Some(route) = solution.route_of(u) else { return };
            let Some(pos) = solution.position_of(u) else { return };
            let delta = node_ops::remove_cost(problem, cost_eval, solution.route(route), pos);
            if delta < 0 && !would_violate_same_vehicle(problem, solution, u, route) {
                solution.route_mut(route).remove(pos);
                solution.route_mut(route).update(problem);
                solution.reindex();
                self.num_updates += 1;
                self.last_updated[route.index()] = self.num_updates;
            }
        }
    }

    fn apply_group_moves(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, solution: &mut SearchSolution, u: ClientIdx) {
        let Some(group_idx) = problem.client_location(u).group_id else { return };
        let group = problem.client_group(group_idx);
        if !group.mutually_exclusive {
            return;
        }

        let present: Vec<ClientIdx> = group.clients.iter().copied().filter(|&c| solution.is_assigned(c)).collect();
        if present.is_empty() {
            insert_greedy(problem, cost_eval, &self.neighbourhoods, solution, u, group.required);
            return;
        }

        let mut by_remove_cost: Vec<(ClientIdx, Cost)> = present
            .iter()
            .map(|&c| {
                let route = solution.route_of(c).unwrap();
                let pos = solution.position_of(c).unwrap();
                (c, node_ops::remove_cost(problem, cost_eval, solution.route(route), pos))
            })
            .collect();
        by_remove_cost.sort_by_key(|&(_, cost)| cost);

        // Keep the member cheapest to remove (largest improvement if later
        // swapped out); remove every other present member.
        for &(c, _) in by_remove_cost.iter().skip(1) {
            let route = solution.route_of(c).unwrap();
            let pos = solution.position_of(c).unwrap();
            solution.route_mut(route).remove(pos);
            solution.route_mut(route).update(problem);
        }
        solution.reindex();

        if !solution.is_assigned(u) {
            if let Some((kept, _)) = by_remove_cost.first() {
                if let (Some(route), Some(pos)) = (solution.route_of(*kept), solution.position_of(*kept)) {
                    let delta = node_ops::inplace_cost(problem, cost_eval, solution.route(route), pos, u);
                    if delta < 0 {
                        solution.route_mut(route).remove(pos);
                        solution.route_mut(route).insert(pos, RouteNode::Client { client: u });
                        solution.route_mut(route).update(problem);
                        solution.reindex();
                    }
                }
            }
        }
    }

    fn apply_depot_removal_neighbours(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, solution: &mut SearchSolution, route: RouteIdx, position: usize) {
        for pos in [position.checked_sub(1), Some(position + 1)].into_iter().flatten() {
            if pos == 0 || pos >= solution.route(route).size() - 1 {
                continue;
            }
            if solution.route(route).node_at(pos).is_reload_depot() {
                let delta = node_ops::remove_cost(problem, cost_eval, solution.route(route), pos);
                if delta <= 0 {
                    solution.route_mut(route).remove(pos);
                    solution.route_mut(route).update(problem);
                    solution.reindex();
                }
            }
        }
    }

    fn try_node_ops(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, solution: &mut SearchSolution, u: ClientIdx, v: ClientIdx) -> bool {
        let Some(ru) = solution.route_of(u) else { return false };
        let Some(rv) = solution.route_of(v) else { return false };
        let Some(pu) = solution.position_of(u) else { return false };
        let Some(pv) = solution.position_of(v) else { return false };

        if would_violate_same_vehicle(problem, solution, u, rv) || would_violate_same_vehicle(problem, solution, v, ru) {
            return false;
        }

        for op in self.node_ops.clone() {
            let route_u = solution.route(ru).clone();
            let route_v = solution.route(rv).clone();
            let delta = op.evaluate(problem, cost_eval, &route_u, pu, &route_v, pv);
            if delta < 0 {
                let reload_loc = problem.vehicle_type(route_v.vehicle_type()).reload_depots.first().copied();
                op.apply(solution, ru, pu, rv, pv, reload_loc);
                solution.route_mut(ru).update(problem);
                solution.route_mut(rv).update(problem);
                solution.reindex();
                self.num_updates += 1;
                self.last_updated[ru.index()] = self.num_updates;
                self.last_updated[rv.index()] = self.num_updates;
                solution.mark_promising(u);
                solution.mark_promising(v);
                return true;
            }
        }
        false
    }

    fn route_sweep(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, solution: &mut SearchSolution) {
        loop {
            let non_empty: Vec<RouteIdx> = (0..solution.routes().len()).map(RouteIdx::new).filter(|&r| !solution.route(r).is_empty()).collect();
            let mut applied = false;

            'pairs: for (i, &ru) in non_empty.iter().enumerate() {
                for &rv in &non_empty[i + 1..] {
                    if !solution.route(ru).overlaps_with(solution.route(rv), self.params.overlap_tolerance) {
                        continue;
                    }
                    for op in self.route_ops.clone() {
                        let (improving, swap_star_move) = match op {
                            RouteOp::SwapStar => {
                                let mv = RouteOp::best_swap_star(
                                    problem,
                                    cost_eval,
                                    solution.route(ru),
                                    ru,
                                    solution.route(rv),
                                    rv,
                                    &mut self.swap_star_cache,
                                    &self.last_updated,
                                );
                                (mv.is_some_and(|m| m.delta < 0), mv)
                            }
                            RouteOp::SwapRoutes => (op.evaluate(problem, cost_eval, solution.route(ru), solution.route(rv)).is_some_and(|d| d < 0), None),
                        };
                        if improving {
                            match op {
                                RouteOp::SwapStar => {
                                    if let Some(mv) = swap_star_move {
                                        RouteOp::apply_swap_star(solution, ru, rv, mv);
                                    }
                                }
                                RouteOp::SwapRoutes => RouteOp::apply_swap_routes(solution, ru, rv),
                            }
                            solution.route_mut(ru).update(problem);
                            solution.route_mut(rv).update(problem);
                            solution.reindex();
                            self.num_updates += 1;
                            self.last_updated[ru.index()] = self.num_updates;
                            self.last_updated[rv.index()] = self.num_updates;
                            applied = true;
                            break 'pairs;
                        }
                    }
                }
            }

            if !applied {
                break;
            }
        }
    }

    /// One-shot pass offering unassigned, positive-prize clients a new trip:
    /// inserts a reload depot followed by the client, opening a fresh trip
    /// bracketed by that reload depot and whatever boundary already follows
    /// (another reload depot or the route's end depot), wherever legal and
    /// improving. Not iterated, to avoid oscillating with the node sweep.
    fn multi_trip_insertion_pass(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, solution: &mut SearchSolution) {
        for i in 0..problem.num_clients {
            let client = ClientIdx::new(i);
            if solution.is_assigned(client) {
                continue;
            }
            let loc = problem.client_location(client);
            if loc.prize <= 0 {
                continue;
            }

            let mut best: Option<(RouteIdx, usize, LocationIdx, Cost)> = None;
            for r in 0..solution.routes().len() {
                let route_idx = RouteIdx::new(r);
                let route = solution.route(route_idx);
                let vt = problem.vehicle_type(route.vehicle_type());
                if vt.max_reloads == 0 || route.num_trips() >= route.max_trips(problem) {
                    continue;
                }
                let Some(&reload_loc) = vt.reload_depots.first() else { continue };
                // Gate only on whether the client alone fits capacity, per
                // the documented conservative-but-possibly-suboptimal rule.
                if (0..problem.num_dimensions).any(|d| loc.delivery[d].max(loc.pickup[d]) > vt.capacity[d]) {
                    continue;
                }

                for pos in 1..route.size() - 1 {
                    // `insert_new_trip_cost` already prices the new trip's
                    // extra distance/duration/reload cost against the
                    // client's own prize (penalised cost subtracts prizes
                    // collected), so a strictly negative delta is exactly
                    // the spec's "prize - extra_distance*unit_dist > 0" gate
                    // — and, unlike that simplified gate, also accounts for
                    // duration/reload cost instead of distance alone.
                    let delta = node_ops::insert_new_trip_cost(problem, cost_eval, route, pos, client, reload_loc);
                    if delta >= 0 {
                        continue;
                    }
                    let improves = match best {
                        Some((_, _, _, b)) => delta < b,
                        None => true,
                    };
                    if improves {
                        best = Some((route_idx, pos, reload_loc, delta));
                    }
                }
            }

            if let Some((r, pos, reload_loc, delta)) = best {
                debug_assert!(delta < 0, "multi-trip insertion must only apply strictly improving trips");
                solution.route_mut(r).insert(pos + 1, RouteNode::Depot { location: reload_loc, kind: DepotKind::Reload });
                solution.route_mut(r).insert(pos + 2, RouteNode::Client { client });
                solution.route_mut(r).update(problem);
                solution.reindex();
            }
        }
    }
}
