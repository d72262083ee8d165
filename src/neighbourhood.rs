//! Granular neighbourhoods: for each client, a short list of other clients
//! worth trying as an insertion/swap partner, ranked by a proximity measure
//! combining edge cost, minimum forced wait, and minimum forced time warp.
//! Restricting operator scans to these lists is what keeps local search
//! close to linear in instance size instead of quadratic.

use crate::problem::ProblemData;
use crate::types::*;

pub struct Neighbourhood {
    /// `neighbours[client]` is sorted nearest-first, capped at `k`.
    neighbours: Vec<Vec<ClientIdx>>,
}

impl Neighbourhood {
    /// Builds the top-`k` neighbour list for every client, for the given
    /// profile (granularity is per-profile since travel cost depends on it).
    pub fn build(problem: &ProblemData, profile: ProfileIdx, k: usize) -> Self {
        let num_clients = problem.num_clients;
        let mut neighbours = Vec::with_capacity(num_clients);

        for i in 0..num_clients {
            let u = ClientIdx::new(i);
            let u_loc = LocationIdx::from_client(u, problem.num_depots);

            let mut scored: Vec<(i64, ClientIdx)> = (0..num_clients)
                .filter(|&j| j != i)
                .map(|j| {
                    let v = ClientIdx::new(j);
                    let v_loc = LocationIdx::from_client(v, problem.num_depots);
                    let proximity = Self::proximity(problem, profile, u_loc, v_loc);
                    (proximity, v)
                })
                .collect();

            scored.sort_by_key(|&(score, v)| (score, v));
            scored.truncate(k);

            neighbours.push(scored.into_iter().map(|(_, v)| v).collect());
        }

        Neighbourhood { neighbours }
    }

    /// Combines the (directionless) edge cost with the minimum forced wait
    /// or time warp implied by the two locations' time windows, so tightly
    /// windowed clients that happen to be far apart still rank as close.
    fn proximity(problem: &ProblemData, profile: ProfileIdx, a: LocationIdx, b: LocationIdx) -> i64 {
        let dist = problem.distance(profile, a, b).min(problem.distance(profile, b, a));
        let dur = problem.duration(profile, a, b).min(problem.duration(profile, b, a));

        let loc_a = problem.location(a);
        let loc_b = problem.location(b);
        let arrival = loc_a.tw_early + loc_a.service_duration + dur;
        let forced_wait = (loc_b.tw_early - arrival).max(0);
        let forced_warp = (arrival - loc_b.tw_late).max(0);

        dist + forced_wait.min(forced_warp)
    }

    pub fn of(&self, client: ClientIdx) -> &[ClientIdx] {
        &self.neighbours[client.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{ClientGroup, Location, SameVehicleGroup, VehicleType};
    use crate::utils::Matrix3;

    fn loc(x: f64, y: f64) -> Location {
        Location {
            x,
            y,
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

    #[test]
    fn nearest_neighbour_ranks_first() {
        // depot, A at distance 10 from B, C far from B.
        let locations = vec![loc(0.0, 0.0), loc(0.0, 0.0), loc(1.0, 0.0), loc(100.0, 0.0)];
        let mut distance = Matrix3::new(1, 4, 4, 0);
        let mut duration = Matrix3::new(1, 4, 4, 0);
        for (a, b, d) in [(1, 2, 1), (2, 1, 1), (1, 3, 100), (3, 1, 100), (2, 3, 99), (3, 2, 99)] {
            *distance.get_mut(0, a, b) = d;
            *duration.get_mut(0, a, b) = d;
        }
        let vt = VehicleType {
            num_available: 1,
            capacity: vec![10],
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
        let problem =
            ProblemData::new(locations, 1, distance, duration, vec![vt], Vec::<ClientGroup>::new(), Vec::<SameVehicleGroup>::new()).unwrap();

        let nb = Neighbourhood::build(&problem, ProfileIdx::new(0), 1);
        assert_eq!(nb.of(ClientIdx::new(0))[0], ClientIdx::new(1));
    }
}
