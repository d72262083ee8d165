//! The mutable, search-view representation of a single vehicle's tour:
//! an ordered sequence of nodes with cached prefix/suffix segment arrays so
//! operators can price candidate moves in O(1) instead of re-simulating the
//! whole route.

use crate::problem::ProblemData;
use crate::segments::{DurationSegment, LoadSegment};
use crate::types::*;

/// One stop on a route. Depot nodes are synthesized per-route (the same
/// depot location can anchor many different routes at once, so depots are
/// not shared node instances the way clients are tracked in
/// [`crate::solution::search::SearchSolution`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RouteNode {
    Depot { location: LocationIdx, kind: DepotKind },
    Client { client: ClientIdx },
}

impl RouteNode {
    pub fn is_depot(self) -> bool {
        matches!(self, RouteNode::Depot { .. })
    }

    pub fn is_reload_depot(self) -> bool {
        matches!(self, RouteNode::Depot { kind: DepotKind::Reload, .. })
    }

    pub fn client(self) -> Option<ClientIdx> {
        match self {
            RouteNode::Client { client } => Some(client),
            RouteNode::Depot { .. } => None,
        }
    }

    pub fn location(self, problem: &ProblemData) -> LocationIdx {
        match self {
            RouteNode::Depot { location, .. } => location,
            RouteNode::Client { client } => LocationIdx::from_client(client, problem.num_depots),
        }
    }
}

/// A vehicle's tour: one or more trips separated by reload-depot stops.
#[derive(Clone, Debug)]
pub struct Route {
    idx: RouteIdx,
    vehicle_type: VehicleTypeIdx,
    profile: ProfileIdx,
    nodes: Vec<RouteNode>,

    /// `load_prefix[d][i]` summarises dimension `d` over `nodes[0..=i]`.
    load_prefix: Vec<Vec<LoadSegment>>,
    load_suffix: Vec<Vec<LoadSegment>>,
    dur_prefix: Vec<DurationSegment>,
    dur_suffix: Vec<DurationSegment>,
    dist_before: Vec<Distance>,
    dist_after: Vec<Distance>,

    distance: Distance,
    duration: Duration,
    time_warp: Duration,
    overtime: Duration,
    excess_distance: Distance,
    load: Vec<Load>,
    excess_load: Vec<Load>,
    num_clients: usize,
    num_trips: usize,
    centroid: (f64, f64),
    max_extent: f64,
    prizes_collected: Cost,

    fixed_cost: Cost,
    unit_distance_cost: Cost,
    unit_duration_cost: Cost,
    unit_overtime_cost: Cost,
    reload_cost_per_trip: Cost,
}

impl Route {
    pub fn new(idx: RouteIdx, vehicle_type: VehicleTypeIdx, problem: &ProblemData) -> Self {
        let vt = problem.vehicle_type(vehicle_type);
        let mut route = Route {
            idx,
            vehicle_type,
            profile: vt.profile,
            nodes: Vec::new(),
            load_prefix: vec![Vec::new(); problem.num_dimensions],
            load_suffix: vec![Vec::new(); problem.num_dimensions],
            dur_prefix: Vec::new(),
            dur_suffix: Vec::new(),
            dist_before: Vec::new(),
            dist_after: Vec::new(),
            distance: 0,
            duration: 0,
            time_warp: 0,
            overtime: 0,
            excess_distance: 0,
            load: vec![0; problem.num_dimensions],
            excess_load: vec![0; problem.num_dimensions],
            num_clients: 0,
            num_trips: 1,
            centroid: (0.0, 0.0),
            max_extent: 0.0,
            prizes_collected: 0,
            fixed_cost: 0,
            unit_distance_cost: 0,
            unit_duration_cost: 0,
            unit_overtime_cost: 0,
            reload_cost_per_trip: 0,
        };
        route.clear(problem);
        route
    }

    pub fn reserve(&mut self, n: usize) {
        self.nodes.reserve(n);
        for dim in &mut self.load_prefix {
            dim.reserve(n);
        }
        for dim in &mut self.load_suffix {
            dim.reserve(n);
        }
        self.dur_prefix.reserve(n);
        self.dur_suffix.reserve(n);
        self.dist_before.reserve(n);
        self.dist_after.reserve(n);
    }

    /// Resets to an empty route: just `[start_depot, end_depot]`.
    pub fn clear(&mut self, problem: &ProblemData) {
        let vt = problem.vehicle_type(self.vehicle_type);
        self.nodes.clear();
        self.nodes.push(RouteNode::Depot { location: vt.start_depot, kind: DepotKind::Start });
        self.nodes.push(RouteNode::Depot { location: vt.end_depot, kind: DepotKind::End });
        self.update(problem);
    }

    pub fn push_back(&mut self, node: RouteNode) {
        // Clients go just before the end depot; a caller inserting a depot
        // (e.g. a reload) is responsible for choosing a legal position via
        // `insert` instead.
        let end = self.nodes.len() - 1;
        self.nodes.insert(end, node);
    }

    pub fn insert(&mut self, idx: usize, node: RouteNode) {
        debug_assert!(idx > 0 && idx < self.nodes.len(), "cannot insert at a depot position");
        self.nodes.insert(idx, node);
    }

    pub fn remove(&mut self, idx: usize) -> RouteNode {
        debug_assert!(idx > 0 && idx < self.nodes.len() - 1, "cannot remove a route's anchor depots");
        self.nodes.remove(idx)
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        debug_assert!(i > 0 && i < self.nodes.len() - 1);
        debug_assert!(j > 0 && j < self.nodes.len() - 1);
        self.nodes.swap(i, j);
    }

    pub fn idx(&self) -> RouteIdx {
        self.idx
    }

    pub fn vehicle_type(&self) -> VehicleTypeIdx {
        self.vehicle_type
    }

    pub fn profile(&self) -> ProfileIdx {
        self.profile
    }

    pub fn node_at(&self, position: usize) -> RouteNode {
        self.nodes[position]
    }

    pub fn nodes(&self) -> &[RouteNode] {
        &self.nodes
    }

    pub fn position_of(&self, client: ClientIdx) -> Option<usize> {
        self.nodes.iter().position(|n| n.client() == Some(client))
    }

    /// Recomputes every cached segment array and aggregate from scratch.
    /// Must be called after any sequence of `insert`/`remove`/`swap` before
    /// any query below is read.
    pub fn update(&mut self, problem: &ProblemData) {
        let n = self.nodes.len();
        let vt = problem.vehicle_type(self.vehicle_type);
        self.profile = vt.profile;
        self.fixed_cost = vt.fixed_cost;
        self.unit_distance_cost = vt.unit_distance_cost;
        self.unit_duration_cost = vt.unit_duration_cost;
        self.unit_overtime_cost = vt.unit_overtime_cost;
        self.reload_cost_per_trip = vt.reload_cost;

        for dim in self.load_prefix.iter_mut().chain(self.load_suffix.iter_mut()) {
            dim.clear();
            dim.resize(n, LoadSegment::EMPTY);
        }
        self.dur_prefix.clear();
        self.dur_prefix.resize(n, DurationSegment::IDENTITY);
        self.dur_suffix.clear();
        self.dur_suffix.resize(n, DurationSegment::IDENTITY);
        self.dist_before.clear();
        self.dist_before.resize(n, 0);
        self.dist_after.clear();
        self.dist_after.resize(n, 0);

        let locations: Vec<LocationIdx> = self.nodes.iter().map(|node| node.location(problem)).collect();
        let node_loads: Vec<Vec<LoadSegment>> = (0..problem.num_dimensions)
            .map(|d| {
                self.nodes
                    .iter()
                    .map(|node| match node {
                        RouteNode::Client { client } => {
                            let loc = problem.client_location(*client);
                            LoadSegment::for_client(loc.delivery[d], loc.pickup[d])
                        }
                        RouteNode::Depot { .. } => LoadSegment::EMPTY,
                    })
                    .collect()
            })
            .collect();
        let node_durs: Vec<DurationSegment> = self
            .nodes
            .iter()
            .map(|node| {
                let loc = problem.location(node.location(problem));
                DurationSegment::for_node(loc.tw_early, loc.tw_late, loc.service_duration, loc.release_time)
            })
            .collect();

        // Prefix pass, left to right.
        let mut cap_for_dim: Vec<Load> = vt.capacity.clone();
        self.num_trips = 1;
        for i in 0..n {
            if i == 0 {
                for d in 0..problem.num_dimensions {
                    self.load_prefix[d][0] = node_loads[d][0];
                }
                self.dur_prefix[0] = node_durs[0];
                self.dist_before[0] = 0;
            } else {
                let edge_dist = problem.distance(self.profile, locations[i - 1], locations[i]);
                let edge_dur = problem.duration(self.profile, locations[i - 1], locations[i]);
                self.dist_before[i] = sat_add(self.dist_before[i - 1], edge_dist);

                for d in 0..problem.num_dimensions {
                    let merged = LoadSegment::merge(self.load_prefix[d][i - 1], node_loads[d][i]);
                    self.load_prefix[d][i] = merged;
                }
                let merged_dur = DurationSegment::merge(edge_dur, &self.dur_prefix[i - 1], &node_durs[i]);
                self.dur_prefix[i] = merged_dur;

                if self.nodes[i].is_reload_depot() {
                    self.num_trips += 1;
                    let loc = problem.location(locations[i]);
                    for d in 0..problem.num_dimensions {
                        self.load_prefix[d][i] = self.load_prefix[d][i].finalise(cap_for_dim[d]);
                    }
                    self.dur_prefix[i] = self.dur_prefix[i].finalise_back(loc.tw_early, loc.tw_late);
                    cap_for_dim = vt.capacity.clone();
                }
            }
        }

        // Suffix pass, right to left.
        for i in (0..n).rev() {
            if i == n - 1 {
                for d in 0..problem.num_dimensions {
                    self.load_suffix[d][i] = node_loads[d][i];
                }
                self.dur_suffix[i] = node_durs[i];
                self.dist_after[i] = 0;
            } else {
                let edge_dist = problem.distance(self.profile, locations[i], locations[i + 1]);
                let edge_dur = problem.duration(self.profile, locations[i], locations[i + 1]);
                self.dist_after[i] = sat_add(self.dist_after[i + 1], edge_dist);

                for d in 0..problem.num_dimensions {
                    self.load_suffix[d][i] = LoadSegment::merge(node_loads[d][i], self.load_suffix[d][i + 1]);
                }
                self.dur_suffix[i] = DurationSegment::merge(edge_dur, &node_durs[i], &self.dur_suffix[i + 1]);

                if self.nodes[i].is_reload_depot() {
                    let loc = problem.location(locations[i]);
                    for d in 0..problem.num_dimensions {
                        self.load_suffix[d][i] = self.load_suffix[d][i].finalise(vt.capacity[d]);
                    }
                    self.dur_suffix[i] = self.dur_suffix[i].finalise_front(loc.tw_early, loc.tw_late);
                }
            }
        }

        self.distance = self.dist_before[n - 1];
        let full_dur = &self.dur_prefix[n - 1];
        self.duration = full_dur.cum_duration + full_dur.duration;
        self.time_warp = full_dur.cum_time_warp + full_dur.time_warp(None);
        self.overtime = match vt.max_duration {
            Some(max_dur) => (self.duration - max_dur).max(0),
            None => 0,
        };
        self.excess_distance = match vt.max_distance {
            Some(max_dist) => (self.distance - max_dist).max(0),
            None => 0,
        };

        for d in 0..problem.num_dimensions {
            let full = &self.load_prefix[d][n - 1];
            self.excess_load[d] = full.excess_load(cap_for_dim[d]);
            self.load[d] = full.load;
        }

        self.num_clients = self.nodes.iter().filter(|node| node.client().is_some()).count();

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut prizes = 0;
        for node in &self.nodes {
            if let RouteNode::Client { client } = node {
                let loc = problem.client_location(*client);
                sum_x += loc.x;
                sum_y += loc.y;
                min_x = min_x.min(loc.x);
                max_x = max_x.max(loc.x);
                min_y = min_y.min(loc.y);
                max_y = max_y.max(loc.y);
                prizes += loc.prize;
            }
        }
        self.prizes_collected = prizes;
        if self.num_clients > 0 {
            self.centroid = (sum_x / self.num_clients as f64, sum_y / self.num_clients as f64);
            self.max_extent = ((max_x - min_x).powi(2) + (max_y - min_y).powi(2)).sqrt();
        } else {
            self.centroid = (0.0, 0.0);
            self.max_extent = 0.0;
        }

        debug_assert!(
            !(1..n).any(|i| self.nodes[i].is_reload_depot() && self.nodes[i - 1].is_reload_depot()),
            "two consecutive reload depots"
        );
        debug_assert!(vt.max_reloads > 0 || self.num_trips == 1, "reload on a vehicle without reload support");
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_clients == 0
    }

    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    pub fn num_trips(&self) -> usize {
        self.num_trips
    }

    pub fn max_trips(&self, problem: &ProblemData) -> usize {
        problem.vehicle_type(self.vehicle_type).max_trips()
    }

    pub fn is_feasible(&self) -> bool {
        !self.has_time_warp() && !self.has_excess_distance() && (0..self.excess_load.len()).all(|d| self.excess_load[d] == 0) && self.overtime == 0
    }

    pub fn has_excess_load(&self, dimension: usize) -> bool {
        self.excess_load[dimension] > 0
    }

    pub fn has_time_warp(&self) -> bool {
        self.time_warp > 0
    }

    pub fn has_excess_distance(&self) -> bool {
        self.excess_distance > 0
    }

    pub fn load(&self, dimension: usize) -> Load {
        self.load[dimension]
    }

    pub fn excess_load(&self, dimension: usize) -> Load {
        self.excess_load[dimension]
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    pub fn overtime(&self) -> Duration {
        self.overtime
    }

    pub fn excess_distance(&self) -> Distance {
        self.excess_distance
    }

    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }

    pub fn prizes_collected(&self) -> Cost {
        self.prizes_collected
    }

    pub fn dist_before(&self, i: usize) -> Distance {
        self.dist_before[i]
    }

    pub fn dist_after(&self, i: usize) -> Distance {
        self.dist_after[i]
    }

    pub fn dist_between(&self, i: usize, j: usize) -> Distance {
        debug_assert!(i <= j);
        self.distance - self.dist_before[i] - self.dist_after[j]
    }

    pub fn load_prefix(&self, dimension: usize, i: usize) -> LoadSegment {
        self.load_prefix[dimension][i]
    }

    pub fn load_suffix(&self, dimension: usize, i: usize) -> LoadSegment {
        self.load_suffix[dimension][i]
    }

    pub fn dur_prefix(&self, i: usize) -> DurationSegment {
        self.dur_prefix[i]
    }

    pub fn dur_suffix(&self, i: usize) -> DurationSegment {
        self.dur_suffix[i]
    }

    /// `true` if this route's centroid lies within `tolerance * max_route_extent`
    /// of `other`'s, used to prune SWAP* to nearby route pairs.
    pub fn overlaps_with(&self, other: &Route, tolerance: f64) -> bool {
        let dx = self.centroid.0 - other.centroid.0;
        let dy = self.centroid.1 - other.centroid.1;
        let centroid_dist = (dx * dx + dy * dy).sqrt();
        let extent = self.max_extent.max(other.max_extent);
        centroid_dist <= tolerance * extent
    }

    // --- Cost-evaluator accessors, cached from the vehicle type table at
    // the last `update()` so `CostEvaluator` doesn't need a `ProblemData`
    // reference at evaluation time. ---

    pub fn fixed_vehicle_cost(&self) -> Cost {
        self.fixed_cost
    }

    pub fn unit_distance_cost(&self) -> Cost {
        self.unit_distance_cost
    }

    pub fn unit_duration_cost(&self) -> Cost {
        self.unit_duration_cost
    }

    pub fn unit_overtime_cost(&self) -> Cost {
        self.unit_overtime_cost
    }

    pub fn reload_cost(&self) -> Cost {
        (self.num_trips.saturating_sub(1)) as Cost * self.reload_cost_per_trip
    }

    pub fn reload_cost_per_trip(&self) -> Cost {
        self.reload_cost_per_trip
    }
}
