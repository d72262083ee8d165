//! Route-level operators: moves that restructure two whole routes at once
//! rather than a handful of nodes.

use crate::cost::CostEvaluator;
use crate::operators::node_ops::{insert_cost, remove_cost};
use crate::problem::ProblemData;
use crate::solution::route::{Route, RouteNode};
use crate::solution::search::SearchSolution;
use crate::types::*;

#[derive(Copy, Clone, Debug)]
pub enum RouteOp {
    SwapStar,
    SwapRoutes,
}

/// The cheapest way found to swap one client from `route_u` with one client
/// from `route_v`, each reinserted at its best position in the other route.
#[derive(Copy, Clone, Debug)]
pub struct SwapStarMove {
    pub client_u: ClientIdx,
    pub pos_u: usize,
    pub client_v: ClientIdx,
    pub pos_v: usize,
    pub insert_after_in_v: usize,
    pub insert_after_in_u: usize,
    pub delta: Cost,
}

/// One cached candidate insertion slot: inserting a client right after the
/// node at position `after` costs `cost`.
#[derive(Copy, Clone, Debug)]
struct InsertSlot {
    after: usize,
    cost: Cost,
}

/// The three cheapest insertion slots found for one (route, client) pair,
/// kept sorted cheapest-first. Mirrors `ThreeBestInserts` in
/// `martsime-hybridcvrp`'s `local_search.rs`.
#[derive(Clone, Debug, Default)]
struct ThreeBestInserts {
    slots: [Option<InsertSlot>; 3],
}

impl ThreeBestInserts {
    fn add(&mut self, slot: InsertSlot) {
        if self.slots[0].map_or(true, |s| slot.cost < s.cost) {
            self.slots = [Some(slot), self.slots[0], self.slots[1]];
        } else if self.slots[1].map_or(true, |s| slot.cost < s.cost) {
            self.slots = [self.slots[0], Some(slot), self.slots[1]];
        } else if self.slots[2].map_or(true, |s| slot.cost < s.cost) {
            self.slots[2] = Some(slot);
        }
    }

    /// The cheapest cached slot that doesn't touch `removed_pos` — a slot
    /// anchored at the node about to be removed, or anchored right before
    /// it, is priced against a route shape that's about to change.
    fn best_excluding(&self, removed_pos: usize) -> Option<InsertSlot> {
        self.slots.iter().flatten().filter(|s| s.after != removed_pos && s.after + 1 != removed_pos).min_by_key(|s| s.cost).copied()
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    inserts: ThreeBestInserts,
    last_calculated: u64,
}

/// Per-(route, client) cache of the three cheapest insertion slots, keyed by
/// route index and client index and invalidated against the route's
/// `last_updated` generation counter the same way `LocalSearch` invalidates
/// `last_tested`/`last_updated`. Recomputing these top-3 lists once per
/// route generation (instead of rescanning the whole route for every
/// candidate pair) is what makes [`RouteOp::best_swap_star`] O(n) per route
/// pair instead of O(n^2).
pub struct SwapStarCache {
    num_clients: usize,
    entries: Vec<Option<CacheEntry>>,
}

impl SwapStarCache {
    pub fn new(num_vehicles: usize, num_clients: usize) -> Self {
        SwapStarCache { num_clients: num_clients.max(1), entries: vec![None; num_vehicles.max(1) * num_clients.max(1)] }
    }

    fn index(&self, route: RouteIdx, client: ClientIdx) -> usize {
        route.index() * self.num_clients + client.index()
    }

    fn refresh(&mut self, problem: &ProblemData, cost_eval: &CostEvaluator, route: &Route, route_idx: RouteIdx, client: ClientIdx, generation: u64) {
        let idx = self.index(route_idx, client);
        let stale = match &self.entries[idx] {
            Some(entry) => entry.last_calculated < generation,
            None => true,
        };
        if !stale {
            return;
        }

        let mut inserts = ThreeBestInserts::default();
        for after in 0..route.size() - 1 {
            inserts.add(InsertSlot { after, cost: insert_cost(problem, cost_eval, route, after, client) });
        }
        self.entries[idx] = Some(CacheEntry { inserts, last_calculated: generation });
    }

    fn best_excluding(&self, route: RouteIdx, client: ClientIdx, removed_pos: usize) -> Option<(usize, Cost)> {
        self.entries[self.index(route, client)].as_ref()?.inserts.best_excluding(removed_pos).map(|s| (s.after, s.cost))
    }
}

impl RouteOp {
    /// `route_u` and `route_v` must be different routes. `SwapStar` has no
    /// stateless form of this query (its whole point is the cross-call
    /// insertion-slot cache) — this ad hoc path builds a cache that's
    /// always fresh for one call, costing what the uncached version used
    /// to cost every time. Callers in a hot loop (`LocalSearch::route_sweep`)
    /// should call [`RouteOp::best_swap_star`] directly with their own
    /// persistent [`SwapStarCache`] instead.
    pub fn evaluate(&self, problem: &ProblemData, cost_eval: &CostEvaluator, route_u: &Route, route_v: &Route) -> Option<Cost> {
        match *self {
            RouteOp::SwapStar => {
                let mut cache = SwapStarCache::new(2, problem.num_clients);
                Self::best_swap_star(problem, cost_eval, route_u, RouteIdx::new(0), route_v, RouteIdx::new(1), &mut cache, &[0, 0]).map(|m| m.delta)
            }
            RouteOp::SwapRoutes => {
                if route_u.vehicle_type() != route_v.vehicle_type() {
                    return None;
                }
                Some(Self::evaluate_swap_routes(problem, cost_eval, route_u, route_v))
            }
        }
    }

    /// Searches every (client in `route_u`, client in `route_v`) pair and,
    /// for each, the cheapest reinsertion slot of the swapped-in client in
    /// the other route, reading those slots from `cache` (recomputed only
    /// when the owning route has changed since the cache's `generation`
    /// snapshot in `last_updated`). O(n_u * n_v) for the pair scan plus
    /// O(n_u + n_v) amortised for the cache refreshes, versus the O(n_u *
    /// n_v * (n_u + n_v)) a from-scratch rescan per pair would cost.
    /// Intended to be called only on route pairs that already passed
    /// [`Route::overlaps_with`].
    pub fn best_swap_star(
        problem: &ProblemData,
        cost_eval: &CostEvaluator,
        route_u: &Route,
        ru: RouteIdx,
        route_v: &Route,
        rv: RouteIdx,
        cache: &mut SwapStarCache,
        last_updated: &[u64],
    ) -> Option<SwapStarMove> {
        let mut best: Option<SwapStarMove> = None;
        let gen_u = last_updated.get(ru.index()).copied().unwrap_or(0);
        let gen_v = last_updated.get(rv.index()).copied().unwrap_or(0);

        for pos_u in 1..route_u.size() - 1 {
            let Some(client_u) = route_u.node_at(pos_u).client() else { continue };
            if !problem.vehicle_type(route_v.vehicle_type()).allows(client_u) {
                continue;
            }
            let remove_u = remove_cost(problem, cost_eval, route_u, pos_u);
            cache.refresh(problem, cost_eval, route_v, rv, client_u, gen_v);

            for pos_v in 1..route_v.size() - 1 {
                let Some(client_v) = route_v.node_at(pos_v).client() else { continue };
                if !problem.vehicle_type(route_u.vehicle_type()).allows(client_v) {
                    continue;
                }
                let remove_v = remove_cost(problem, cost_eval, route_v, pos_v);
                cache.refresh(problem, cost_eval, route_u, ru, client_v, gen_u);

                let Some((insert_after_in_v, insert_v)) = cache.best_excluding(rv, client_u, pos_v) else { continue };
                let Some((insert_after_in_u, insert_u)) = cache.best_excluding(ru, client_v, pos_u) else { continue };

                let delta = remove_u + remove_v + insert_v + insert_u;
                let improves = match best {
                    Some(m) => delta < m.delta,
                    None => true,
                };
                if improves {
                    best = Some(SwapStarMove { client_u, pos_u, client_v, pos_v, insert_after_in_v, insert_after_in_u, delta });
                }
            }
        }

        best
    }

    /// Swaps every client of `route_u` with every client of `route_v`; since
    /// the move touches every node on both routes there's no cached window
    /// to splice against, so this stays a full clone-and-recompute.
    fn evaluate_swap_routes(problem: &ProblemData, cost_eval: &CostEvaluator, route_u: &Route, route_v: &Route) -> Cost {
        let before = cost_eval.penalised_cost(route_u) + cost_eval.penalised_cost(route_v);

        let mut su = route_u.clone();
        let mut sv = route_v.clone();
        let clients_u: Vec<ClientIdx> = route_u.nodes().iter().filter_map(|n| n.client()).collect();
        let clients_v: Vec<ClientIdx> = route_v.nodes().iter().filter_map(|n| n.client()).collect();

        while su.size() > 2 {
            su.remove(1);
        }
        while sv.size() > 2 {
            sv.remove(1);
        }
        for (i, &c) in clients_v.iter().enumerate() {
            su.insert(1 + i, RouteNode::Client { client: c });
        }
        for (i, &c) in clients_u.iter().enumerate() {
            sv.insert(1 + i, RouteNode::Client { client: c });
        }
        su.update(problem);
        sv.update(problem);

        cost_eval.penalised_cost(&su) + cost_eval.penalised_cost(&sv) - before
    }

    pub fn apply_swap_star(solution: &mut SearchSolution, route_u: RouteIdx, route_v: RouteIdx, mv: SwapStarMove) {
        {
            let ru = solution.route_mut(route_u);
            ru.remove(mv.pos_u);
        }
        {
            let rv = solution.route_mut(route_v);
            rv.remove(mv.pos_v);
        }
        let insert_after_in_v = if mv.insert_after_in_v > mv.pos_v { mv.insert_after_in_v - 1 } else { mv.insert_after_in_v };
        let insert_after_in_u = if mv.insert_after_in_u > mv.pos_u { mv.insert_after_in_u - 1 } else { mv.insert_after_in_u };
        solution.route_mut(route_v).insert(insert_after_in_v + 1, RouteNode::Client { client: mv.client_u });
        solution.route_mut(route_u).insert(insert_after_in_u + 1, RouteNode::Client { client: mv.client_v });
    }

    pub fn apply_swap_routes(solution: &mut SearchSolution, route_u: RouteIdx, route_v: RouteIdx) {
        let clients_u: Vec<ClientIdx> = solution.route(route_u).nodes().iter().filter_map(|n| n.client()).collect();
        let clients_v: Vec<ClientIdx> = solution.route(route_v).nodes().iter().filter_map(|n| n.client()).collect();

        {
            let ru = solution.route_mut(route_u);
            while ru.size() > 2 {
                ru.remove(1);
            }
            for (i, &c) in clients_v.iter().enumerate() {
                ru.insert(1 + i, RouteNode::Client { client: c });
            }
        }
        {
            let rv = solution.route_mut(route_v);
            while rv.size() > 2 {
                rv.remove(1);
            }
            for (i, &c) in clients_u.iter().enumerate() {
                rv.insert(1 + i, RouteNode::Client { client: c });
            }
        }
    }
}
