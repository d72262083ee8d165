//! Segment-merge evaluation: recomputes a route's aggregates after replacing
//! a window of nodes, by folding `dur_prefix(before) ⊕ middle ⊕ dur_suffix(after)`
//! (and the equivalent for load/distance) instead of re-simulating the whole
//! route. The untouched prefix/suffix on either side of the window are read
//! straight out of `Route`'s cached arrays, so cost is proportional to the
//! size of the window (and the moved segment), not to the route length.

use crate::problem::ProblemData;
use crate::segments::{DurationSegment, LoadSegment};
use crate::solution::route::{Route, RouteNode};
use crate::types::*;
use std::ops::Range;

/// Everything `CostEvaluator` needs to price a route, recomputed for the
/// hypothetical route obtained by replacing `nodes[range]` with `middle`.
pub struct RouteAggregates {
    pub distance: Distance,
    pub duration: Duration,
    pub time_warp: Duration,
    pub overtime: Duration,
    pub excess_distance: Distance,
    pub excess_load: Vec<Load>,
    pub num_trips: usize,
    pub num_clients: usize,
    pub prizes_collected: Cost,
}

/// Recomputes [`RouteAggregates`] for `route` with `nodes[range]` replaced by
/// `middle`. `range` must sit strictly inside the route's anchor depots:
/// `range.start >= 1` and `range.end <= route.size() - 1`. An empty range is
/// a pure insertion; an empty `middle` is a pure removal.
pub fn splice(problem: &ProblemData, route: &Route, range: Range<usize>, middle: &[RouteNode]) -> RouteAggregates {
    debug_assert!(range.start >= 1 && range.end <= route.size() - 1 && range.start <= range.end);

    let vt = problem.vehicle_type(route.vehicle_type());
    let before_idx = range.start - 1;
    let after_idx = range.end;
    let before_loc = route.node_at(before_idx).location(problem);
    let after_loc = route.node_at(after_idx).location(problem);

    // Distance: cached prefix up to `before_idx`, the new edges through
    // `middle`, then the cached suffix from `after_idx`.
    let mut distance = route.dist_before(before_idx);
    let mut prev_loc = before_loc;
    for node in middle {
        let loc = node.location(problem);
        distance = sat_add(distance, problem.distance(route.profile(), prev_loc, loc));
        prev_loc = loc;
    }
    distance = sat_add(distance, problem.distance(route.profile(), prev_loc, after_loc));
    distance = sat_add(distance, route.dist_after(after_idx));

    // Duration/time-warp: fold `middle`'s own per-node segments into the
    // cached prefix, finalising at any reload depot exactly as `Route::update`
    // would, then merge the result with the cached suffix.
    let mut dur = route.dur_prefix(before_idx);
    let mut prev_loc = before_loc;
    for node in middle {
        let loc = node.location(problem);
        let edge = problem.duration(route.profile(), prev_loc, loc);
        let node_loc = problem.location(loc);
        let node_seg = DurationSegment::for_node(node_loc.tw_early, node_loc.tw_late, node_loc.service_duration, node_loc.release_time);
        dur = DurationSegment::merge(edge, &dur, &node_seg);
        if node.is_reload_depot() {
            dur = dur.finalise_back(node_loc.tw_early, node_loc.tw_late);
        }
        prev_loc = loc;
    }
    let edge = problem.duration(route.profile(), prev_loc, after_loc);
    dur = DurationSegment::merge(edge, &dur, &route.dur_suffix(after_idx));

    let duration = dur.cum_duration + dur.duration;
    let time_warp = dur.cum_time_warp + dur.time_warp(None);

    let mut excess_load = vec![0; problem.num_dimensions];
    for d in 0..problem.num_dimensions {
        let mut load = route.load_prefix(d, before_idx);
        for node in middle {
            let node_seg = match node {
                RouteNode::Client { client } => {
                    let loc = problem.client_location(*client);
                    LoadSegment::for_client(loc.delivery[d], loc.pickup[d])
                }
                RouteNode::Depot { .. } => LoadSegment::EMPTY,
            };
            load = LoadSegment::merge(load, node_seg);
            if node.is_reload_depot() {
                load = load.finalise(vt.capacity[d]);
            }
        }
        load = LoadSegment::merge(load, route.load_suffix(d, after_idx));
        excess_load[d] = load.excess_load(vt.capacity[d]);
    }

    let overtime = match vt.max_duration {
        Some(max_dur) => (duration - max_dur).max(0),
        None => 0,
    };
    let excess_distance = match vt.max_distance {
        Some(max_dist) => (distance - max_dist).max(0),
        None => 0,
    };

    let removed = &route.nodes()[range.clone()];
    let removed_trips = removed.iter().filter(|n| n.is_reload_depot()).count();
    let inserted_trips = middle.iter().filter(|n| n.is_reload_depot()).count();
    let num_trips = route.num_trips() + inserted_trips - removed_trips;

    let removed_clients = removed.iter().filter(|n| n.client().is_some()).count();
    let inserted_clients = middle.iter().filter(|n| n.client().is_some()).count();
    let num_clients = route.num_clients() + inserted_clients - removed_clients;

    let removed_prizes: Cost = removed.iter().filter_map(|n| n.client()).map(|c| problem.client_location(c).prize).sum();
    let inserted_prizes: Cost = middle.iter().filter_map(|n| n.client()).map(|c| problem.client_location(c).prize).sum();
    let prizes_collected = route.prizes_collected() - removed_prizes + inserted_prizes;

    RouteAggregates { distance, duration, time_warp, overtime, excess_distance, excess_load, num_trips, num_clients, prizes_collected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostEvaluator;
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
    fn splice_insert_matches_direct_recompute() {
        let problem = line_problem();
        let cost_eval = CostEvaluator::new(&[0], 0, 0);
        let mut solution = SearchSolution::new(&problem);
        solution.route_mut(RouteIdx::new(0)).push_back(RouteNode::Client { client: ClientIdx::new(0) });
        solution.route_mut(RouteIdx::new(0)).update(&problem);

        let route = solution.route(RouteIdx::new(0));
        let agg = splice(&problem, route, 1..1, &[RouteNode::Client { client: ClientIdx::new(1) }]);

        let mut after = route.clone();
        after.insert(1, RouteNode::Client { client: ClientIdx::new(1) });
        after.update(&problem);

        assert_eq!(agg.distance, after.distance());
        assert_eq!(agg.duration, after.duration());
        assert_eq!(agg.excess_load[0], after.excess_load(0));
        assert_eq!(cost_eval.penalised_cost_from_aggregates(route, &agg), cost_eval.penalised_cost(&after));
    }

    #[test]
    fn splice_remove_matches_direct_recompute() {
        let problem = line_problem();
        let cost_eval = CostEvaluator::new(&[0], 0, 0);
        let mut solution = SearchSolution::new(&problem);
        solution.route_mut(RouteIdx::new(0)).push_back(RouteNode::Client { client: ClientIdx::new(0) });
        solution.route_mut(RouteIdx::new(0)).push_back(RouteNode::Client { client: ClientIdx::new(1) });
        solution.route_mut(RouteIdx::new(0)).update(&problem);

        let route = solution.route(RouteIdx::new(0));
        let agg = splice(&problem, route, 1..2, &[]);

        let mut after = route.clone();
        after.remove(1);
        after.update(&problem);

        assert_eq!(agg.distance, after.distance());
        assert_eq!(cost_eval.penalised_cost_from_aggregates(route, &agg), cost_eval.penalised_cost(&after));
    }
}
