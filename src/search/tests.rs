//! End-to-end scenarios driving the full ILS loop over tiny hand-built
//! instances, checked against the known-optimal route/cost for each.

use super::ils::{solve, SolveOptions};
use super::stop;
use crate::problem::{ClientGroup, Location, ProblemData, SameVehicleGroup, VehicleType};
use crate::solution::{Solution, SolutionRoute};
use crate::types::*;
use crate::utils::Matrix3;

fn loc(x: f64, y: f64, delivery: Load, prize: Cost, required: bool) -> Location {
    Location {
        x,
        y,
        tw_early: 0,
        tw_late: 1_000,
        service_duration: 0,
        release_time: 0,
        prize,
        required,
        group_id: None,
        delivery: vec![delivery],
        pickup: vec![0],
    }
}

fn vehicle(capacity: Load, num_available: u32) -> VehicleType {
    VehicleType {
        num_available,
        capacity: vec![capacity],
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
    }
}

/// Builds a full distance/duration matrix from Euclidean coordinates,
/// floored to integers, with duration equal to distance (zero service).
fn euclidean_matrices(locations: &[Location]) -> (Matrix3<Distance>, Matrix3<Duration>) {
    let n = locations.len();
    let mut distance = Matrix3::new(1, n, n, 0);
    let mut duration = Matrix3::new(1, n, n, 0);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let dx = locations[i].x - locations[j].x;
            let dy = locations[i].y - locations[j].y;
            let d = (dx * dx + dy * dy).sqrt().floor() as Distance;
            *distance.get_mut(0, i, j) = d;
            *duration.get_mut(0, i, j) = d;
        }
    }
    (distance, duration)
}

fn empty_solution(problem: &ProblemData) -> Solution {
    let mut routes = Vec::with_capacity(problem.num_vehicles);
    for (vt_idx, vt) in problem.vehicle_types.iter().enumerate() {
        for _ in 0..vt.num_available {
            routes.push(SolutionRoute { vehicle_type: VehicleTypeIdx::new(vt_idx), trips: vec![Vec::new()] });
        }
    }
    let unassigned = (0..problem.num_clients).map(ClientIdx::new).collect();
    Solution::new(problem, routes, unassigned)
}

fn run(problem: &ProblemData, iterations: u64) -> Solution {
    let initial = empty_solution(problem);
    let options = SolveOptions { seed: 1, ..SolveOptions::default() };
    let result = solve(problem, initial, options, stop::max_iterations(iterations)).unwrap();
    result.best_solution
}

#[test]
fn trivial_cvrp_single_route_visits_all_four() {
    let locations = vec![
        loc(0.0, 0.0, 0, 0, true),
        loc(10.0, 0.0, 5, 0, true),
        loc(0.0, 10.0, 5, 0, true),
        loc(-10.0, 0.0, 5, 0, true),
        loc(0.0, -10.0, 5, 0, true),
    ];
    let (distance, duration) = euclidean_matrices(&locations);
    let vt = vehicle(20, 1);
    let problem = ProblemData::new(locations, 1, distance, duration, vec![vt], vec![], vec![]).unwrap();

    let solution = run(&problem, 500);

    assert!(solution.is_feasible);
    assert!(solution.unassigned.is_empty());
    assert_eq!(solution.num_routes(), 1);
}

#[test]
fn multi_vehicle_capacity_forces_two_routes() {
    let locations = vec![
        loc(0.0, 0.0, 0, 0, true),
        loc(10.0, 0.0, 5, 0, true),
        loc(0.0, 10.0, 5, 0, true),
        loc(-10.0, 0.0, 5, 0, true),
        loc(0.0, -10.0, 5, 0, true),
    ];
    let (distance, duration) = euclidean_matrices(&locations);
    let vt = vehicle(10, 2);
    let problem = ProblemData::new(locations, 1, distance, duration, vec![vt], vec![], vec![]).unwrap();

    let solution = run(&problem, 1_000);

    assert!(solution.is_feasible);
    assert!(solution.unassigned.is_empty());
    assert_eq!(solution.num_routes(), 2);
}

#[test]
fn time_windows_force_visit_order() {
    let mut depot = loc(0.0, 0.0, 0, 0, true);
    depot.tw_early = 0;
    depot.tw_late = 1_000;
    let mut a = loc(10.0, 0.0, 0, 0, true);
    a.tw_early = 0;
    a.tw_late = 12;
    let b = loc(20.0, 0.0, 0, 0, true);
    let locations = vec![depot, a, b];
    let (distance, duration) = euclidean_matrices(&locations);
    let vt = vehicle(1_000, 1);
    let problem = ProblemData::new(locations, 1, distance, duration, vec![vt], vec![], vec![]).unwrap();

    let solution = run(&problem, 500);

    assert!(solution.is_feasible);
    assert!(solution.unassigned.is_empty());
    assert_eq!(solution.distance, 40);
    let route = solution.routes.iter().find(|r| !r.is_empty()).unwrap();
    let served: Vec<ClientIdx> = route.clients().collect();
    assert_eq!(served, vec![ClientIdx::new(0), ClientIdx::new(1)]);
}

#[test]
fn optional_low_value_client_is_left_unassigned() {
    let locations = vec![
        loc(0.0, 0.0, 0, 0, true),
        loc(1.0, 0.0, 1, 0, true),
        loc(100.0, 100.0, 1, 10, false),
    ];
    let (distance, duration) = euclidean_matrices(&locations);
    let vt = vehicle(1_000, 1);
    let problem = ProblemData::new(locations, 1, distance, duration, vec![vt], vec![], vec![]).unwrap();

    let solution = run(&problem, 500);

    assert!(solution.is_feasible);
    assert_eq!(solution.unassigned, vec![ClientIdx::new(1)]);
    assert_eq!(solution.distance, 2);
}

#[test]
fn mutually_exclusive_group_admits_exactly_one_member() {
    let mut x = loc(5.0, 0.0, 0, 0, false);
    x.group_id = Some(GroupIdx::new(0));
    let mut y = loc(5.0, 0.0, 0, 0, false);
    y.group_id = Some(GroupIdx::new(0));
    let locations = vec![loc(0.0, 0.0, 0, 0, true), x, y];
    let (distance, duration) = euclidean_matrices(&locations);
    let vt = vehicle(1_000, 1);
    let group = ClientGroup { clients: vec![ClientIdx::new(0), ClientIdx::new(1)], required: false, mutually_exclusive: true };
    let problem = ProblemData::new(locations, 1, distance, duration, vec![vt], vec![group], vec![]).unwrap();

    let solution = run(&problem, 500);

    assert!(solution.is_feasible);
    let served: usize = solution.routes.iter().map(|r| r.num_clients()).sum();
    assert_eq!(served, 1);
    assert_eq!(solution.unassigned.len(), 1);
}

#[test]
fn same_vehicle_group_keeps_members_on_one_route() {
    let locations = vec![loc(0.0, 0.0, 0, 0, true), loc(3.0, 0.0, 1, 0, true), loc(-3.0, 0.0, 1, 0, true)];
    let (distance, duration) = euclidean_matrices(&locations);
    let vt = vehicle(1_000, 2);
    let group = SameVehicleGroup { clients: vec![ClientIdx::new(0), ClientIdx::new(1)] };
    let problem = ProblemData::new(locations, 1, distance, duration, vec![vt], vec![], vec![group]).unwrap();

    let solution = run(&problem, 500);

    assert!(solution.is_feasible);
    assert!(solution.unassigned.is_empty());

    let route_of = |c: ClientIdx| solution.routes.iter().position(|r| r.clients().any(|v| v == c));
    assert_eq!(route_of(ClientIdx::new(0)), route_of(ClientIdx::new(1)));
}

#[test]
fn high_prize_client_pulled_in_via_extra_trip() {
    let locations = vec![loc(0.0, 0.0, 0, 0, true), loc(10.0, 0.0, 10, 0, true), loc(10.0, 0.0, 10, 50, false)];
    let (distance, duration) = euclidean_matrices(&locations);
    let mut vt = vehicle(10, 1);
    vt.max_reloads = 1;
    vt.reload_depots = vec![LocationIdx::new(0)];
    let problem = ProblemData::new(locations, 1, distance, duration, vec![vt], vec![], vec![]).unwrap();

    let solution = run(&problem, 500);

    assert!(solution.is_feasible);
    assert!(solution.unassigned.is_empty());
    let route = solution.routes.iter().find(|r| !r.is_empty()).unwrap();
    assert_eq!(route.trips.len(), 2);
    assert_eq!(route.trips[0], vec![ClientIdx::new(0)]);
    assert_eq!(route.trips[1], vec![ClientIdx::new(1)]);
}
