//! The mutable search-view `Solution`: owns every [`Route`] plus a free-node
//! pool, and converts to/from the immutable [`crate::solution::value::Solution`].

use crate::problem::ProblemData;
use crate::solution::route::{Route, RouteNode};
use crate::solution::value::{Solution, SolutionRoute};
use crate::types::*;

/// Where a client currently sits, if anywhere.
#[derive(Copy, Clone, Debug, Default)]
struct ClientState {
    route: Option<RouteIdx>,
    position: u32,
}

/// Owns every route for the duration of a solve and a promising-client
/// bitset. Reused across outer ILS iterations via [`SearchSolution::load`]/
/// [`SearchSolution::unload`] rather than rebuilt from scratch.
#[derive(Clone)]
pub struct SearchSolution {
    routes: Vec<Route>,
    clients: Vec<ClientState>,
    promising: Vec<bool>,
}

impl SearchSolution {
    pub fn new(problem: &ProblemData) -> Self {
        let mut routes = Vec::with_capacity(problem.num_vehicles);
        for vehicle in 0..problem.num_vehicles {
            let vt = problem.vehicle_type_of(VehicleIdx::new(vehicle));
            routes.push(Route::new(RouteIdx::new(vehicle), vt, problem));
        }

        SearchSolution {
            routes,
            clients: vec![ClientState::default(); problem.num_clients],
            promising: vec![true; problem.num_clients],
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn routes_mut(&mut self) -> &mut [Route] {
        &mut self.routes
    }

    pub fn route(&self, idx: RouteIdx) -> &Route {
        &self.routes[idx.index()]
    }

    pub fn route_mut(&mut self, idx: RouteIdx) -> &mut Route {
        &mut self.routes[idx.index()]
    }

    pub fn route_of(&self, client: ClientIdx) -> Option<RouteIdx> {
        self.clients[client.index()].route
    }

    pub fn position_of(&self, client: ClientIdx) -> Option<usize> {
        self.clients[client.index()].route.map(|_| self.clients[client.index()].position as usize)
    }

    pub fn is_assigned(&self, client: ClientIdx) -> bool {
        self.clients[client.index()].route.is_some()
    }

    pub fn mark_promising(&mut self, client: ClientIdx) {
        self.promising[client.index()] = true;
    }

    pub fn clear_promising(&mut self, client: ClientIdx) {
        self.promising[client.index()] = false;
    }

    pub fn is_promising(&self, client: ClientIdx) -> bool {
        self.promising[client.index()]
    }

    pub fn mark_all_promising(&mut self) {
        self.promising.iter_mut().for_each(|p| *p = true);
    }

    /// Populates this mutable view from an immutable solution value,
    /// discarding any prior route contents.
    pub fn load(&mut self, problem: &ProblemData, solution: &Solution) {
        for client in &mut self.clients {
            *client = ClientState::default();
        }

        for (vehicle, route) in self.routes.iter_mut().enumerate() {
            route.clear(problem);
            if let Some(src) = solution.routes.get(vehicle) {
                for (trip_idx, trip) in src.trips.iter().enumerate() {
                    for &client in trip {
                        route.push_back(RouteNode::Client { client });
                    }
                    if trip_idx + 1 < src.trips.len() {
                        let vt = problem.vehicle_type(route.vehicle_type());
                        if let Some(&reload) = vt.reload_depots.get(trip_idx) {
                            let pos = route.size() - 1;
                            route.insert(pos, RouteNode::Depot { location: reload, kind: DepotKind::Reload });
                        }
                    }
                }
            }
            route.update(problem);
        }

        self.reindex();
        self.mark_all_promising();
    }

    /// Re-derives `self.clients` from the current route contents. Called
    /// after `load` and after any operator applies a structural move.
    pub fn reindex(&mut self) {
        for state in &mut self.clients {
            *state = ClientState::default();
        }
        for route in &self.routes {
            for (position, node) in route.nodes().iter().enumerate() {
                if let Some(client) = node.client() {
                    self.clients[client.index()] = ClientState { route: Some(route.idx()), position: position as u32 };
                }
            }
        }
    }

    /// Materialises this mutable view into an immutable value, recomputing
    /// every aggregate from the client sequences.
    pub fn unload(&self, problem: &ProblemData) -> Solution {
        let mut assigned = vec![false; problem.num_clients];
        let routes = self
            .routes
            .iter()
            .map(|route| {
                let mut trips = vec![Vec::new()];
                for node in route.nodes() {
                    match node {
                        RouteNode::Client { client } => {
                            assigned[client.index()] = true;
                            trips.last_mut().unwrap().push(*client);
                        }
                        RouteNode::Depot { kind: DepotKind::Reload, .. } => trips.push(Vec::new()),
                        RouteNode::Depot { .. } => {}
                    }
                }
                SolutionRoute { vehicle_type: route.vehicle_type(), trips }
            })
            .collect();

        let unassigned = (0..problem.num_clients).filter(|&i| !assigned[i]).map(ClientIdx::new).collect();

        Solution::new(problem, routes, unassigned)
    }
}
