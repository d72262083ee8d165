//! The immutable result of a solve: a plain value type, independent of the
//! mutable search-view representation in [`crate::solution::route`].

use crate::problem::ProblemData;
use crate::segments::{DurationSegment, LoadSegment};
use crate::types::*;

/// One vehicle's tour, split into trips (sub-sequences between depots).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolutionRoute {
    pub vehicle_type: VehicleTypeIdx,
    pub trips: Vec<Vec<ClientIdx>>,
}

impl SolutionRoute {
    pub fn is_empty(&self) -> bool {
        self.trips.iter().all(|trip| trip.is_empty())
    }

    pub fn num_clients(&self) -> usize {
        self.trips.iter().map(|t| t.len()).sum()
    }

    pub fn clients(&self) -> impl Iterator<Item = ClientIdx> + '_ {
        self.trips.iter().flatten().copied()
    }
}

/// The result of a search: an ordered list of routes plus the clients left
/// unassigned. Immutable once built; every aggregate here is derivable from
/// the client sequences and [`ProblemData`], and is recomputed by
/// [`Solution::new`] rather than trusted from the search view.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub routes: Vec<SolutionRoute>,
    pub unassigned: Vec<ClientIdx>,
    pub distance: Distance,
    pub duration: Duration,
    /// `true` iff every check below holds, plus every required client is
    /// assigned. The aggregate the caller usually wants.
    pub is_feasible: bool,
    /// `true` iff no route has live time-warp (a real arrival-time/
    /// time-window violation, not just an overtime-capped duration).
    pub tw_feasible: bool,
    /// `true` iff no route exceeds its vehicle type's `max_distance`.
    pub dist_feasible: bool,
    /// Per-dimension: `true` iff no trip on any route exceeds that
    /// dimension's capacity.
    pub load_feasible: Vec<bool>,
}

impl Solution {
    pub fn new(problem: &ProblemData, routes: Vec<SolutionRoute>, unassigned: Vec<ClientIdx>) -> Self {
        let mut distance = 0;
        let mut duration = 0;
        let mut is_feasible = true;
        let mut tw_feasible = true;
        let mut dist_feasible = true;
        let mut load_feasible = vec![true; problem.num_dimensions];

        for route in &routes {
            let vt = problem.vehicle_type(route.vehicle_type);
            let mut prev = vt.start_depot;
            let mut route_distance: Distance = 0;

            let start_loc = problem.location(vt.start_depot);
            let mut dur = DurationSegment::for_node(start_loc.tw_early, start_loc.tw_late, start_loc.service_duration, start_loc.release_time);
            let mut loads: Vec<LoadSegment> = vec![LoadSegment::EMPTY; problem.num_dimensions];

            for (trip_idx, trip) in route.trips.iter().enumerate() {
                for &client in trip {
                    let loc_idx = LocationIdx::from_client(client, problem.num_depots);
                    let loc = problem.client_location(client);

                    let edge_dist = problem.distance(vt.profile, prev, loc_idx);
                    let edge_dur = problem.duration(vt.profile, prev, loc_idx);
                    route_distance = sat_add(route_distance, edge_dist);

                    let node_seg = DurationSegment::for_node(loc.tw_early, loc.tw_late, loc.service_duration, loc.release_time);
                    dur = DurationSegment::merge(edge_dur, &dur, &node_seg);

                    for d in 0..problem.num_dimensions {
                        loads[d] = LoadSegment::merge(loads[d], LoadSegment::for_client(loc.delivery[d], loc.pickup[d]));
                    }

                    prev = loc_idx;
                }

                let next_depot = if trip_idx + 1 < route.trips.len() {
                    vt.reload_depots.get(trip_idx).copied().unwrap_or(vt.end_depot)
                } else {
                    vt.end_depot
                };
                let next_loc = problem.location(next_depot);
                let edge_dist = problem.distance(vt.profile, prev, next_depot);
                let edge_dur = problem.duration(vt.profile, prev, next_depot);
                route_distance = sat_add(route_distance, edge_dist);

                let depot_seg = DurationSegment::for_node(next_loc.tw_early, next_loc.tw_late, next_loc.service_duration, next_loc.release_time);
                dur = DurationSegment::merge(edge_dur, &dur, &depot_seg);

                if trip_idx + 1 < route.trips.len() {
                    dur = dur.finalise_back(next_loc.tw_early, next_loc.tw_late);
                    for d in 0..problem.num_dimensions {
                        if loads[d].load > vt.capacity[d] {
                            is_feasible = false;
                            load_feasible[d] = false;
                        }
                        loads[d] = LoadSegment::EMPTY;
                    }
                }

                prev = next_depot;
            }

            for d in 0..problem.num_dimensions {
                if loads[d].load > vt.capacity[d] {
                    is_feasible = false;
                    load_feasible[d] = false;
                }
            }

            let route_duration = dur.cum_duration + dur.duration;
            let route_time_warp = dur.cum_time_warp + dur.time_warp(None);
            if route_time_warp > 0 {
                is_feasible = false;
                tw_feasible = false;
            }
            if let Some(max_dur) = vt.max_duration {
                if route_duration > max_dur {
                    is_feasible = false;
                }
            }
            if let Some(max_dist) = vt.max_distance {
                if route_distance > max_dist {
                    is_feasible = false;
                    dist_feasible = false;
                }
            }

            distance = sat_add(distance, route_distance);
            duration = sat_add(duration, route_duration);
        }

        if !unassigned.is_empty() && unassigned.iter().any(|&c| problem.client_location(c).required) {
            is_feasible = false;
        }

        Solution { routes, unassigned, distance, duration, is_feasible, tw_feasible, dist_feasible, load_feasible }
    }

    pub fn num_routes(&self) -> usize {
        self.routes.iter().filter(|r| !r.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{ClientGroup, Location, SameVehicleGroup, VehicleType};
    use crate::utils::Matrix3;

    fn depot() -> Location {
        Location {
            x: 0.0,
            y: 0.0,
            tw_early: 0,
            tw_late: 1_000,
            service_duration: 0,
            release_time: 0,
            prize: 0,
            required: true,
            group_id: None,
            delivery: vec![0],
            pickup: vec![0],
        }
    }

    fn client(x: f64, y: f64, delivery: Load) -> Location {
        Location { delivery: vec![delivery], pickup: vec![0], required: true, ..depot() }
        .with_xy(x, y)
    }

    impl Location {
        fn with_xy(mut self, x: f64, y: f64) -> Self {
            self.x = x;
            self.y = y;
            self
        }
    }

    fn tiny_problem() -> ProblemData {
        let locations = vec![depot(), client(10.0, 0.0, 5), client(0.0, 10.0, 5)];
        let mut distance = Matrix3::new(1, 3, 3, 0);
        let mut duration = Matrix3::new(1, 3, 3, 0);
        let dists = [(0, 1, 10), (1, 0, 10), (0, 2, 10), (2, 0, 10), (1, 2, 14), (2, 1, 14)];
        for (a, b, d) in dists {
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
    fn single_route_distance_matches_manual_sum() {
        let problem = tiny_problem();
        let route = SolutionRoute { vehicle_type: VehicleTypeIdx::new(0), trips: vec![vec![ClientIdx::new(0), ClientIdx::new(1)]] };
        let solution = Solution::new(&problem, vec![route], vec![]);
        assert_eq!(solution.distance, 10 + 14 + 10);
        assert!(solution.is_feasible);
    }

    #[test]
    fn unassigned_required_client_is_infeasible() {
        let problem = tiny_problem();
        let solution = Solution::new(&problem, vec![], vec![ClientIdx::new(0)]);
        assert!(!solution.is_feasible);
    }
}
