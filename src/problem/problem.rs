use crate::problem::index::ProblemIndex;
use crate::problem::loader::LoaderError;
use crate::types::*;
use crate::utils::Matrix3;
use std::fmt;

/// One depot or client location.
#[derive(Debug, Clone)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub tw_early: Duration,
    pub tw_late: Duration,
    pub service_duration: Duration,
    pub release_time: Duration,
    pub prize: Cost,
    pub required: bool,
    pub group_id: Option<GroupIdx>,
    /// Demand delivered to the client, one entry per load dimension.
    pub delivery: Vec<Load>,
    /// Demand picked up from the client, one entry per load dimension.
    pub pickup: Vec<Load>,
}

/// A class of interchangeable vehicles. Vehicle types sharing a `name`
/// represent the same physical vehicle across shifts: a same-vehicle-group
/// client may be served by any route whose vehicle type carries that name.
#[derive(Debug, Clone)]
pub struct VehicleType {
    pub num_available: u32,
    pub capacity: Vec<Load>,
    pub start_depot: LocationIdx,
    pub end_depot: LocationIdx,
    pub reload_depots: Vec<LocationIdx>,
    pub max_reloads: u32,
    pub shift_duration: Option<Duration>,
    pub max_duration: Option<Duration>,
    pub max_distance: Option<Distance>,
    pub tw_early: Duration,
    pub tw_late: Duration,
    pub fixed_cost: Cost,
    pub unit_distance_cost: Cost,
    pub unit_duration_cost: Cost,
    pub unit_overtime_cost: Cost,
    pub reload_cost: Cost,
    pub profile: ProfileIdx,
    pub name: String,
    /// `None` means every client is allowed.
    pub allowed_clients: Option<Vec<ClientIdx>>,
}

impl VehicleType {
    pub fn max_trips(&self) -> usize {
        self.max_reloads as usize + 1
    }

    pub fn allows(&self, client: ClientIdx) -> bool {
        match &self.allowed_clients {
            None => true,
            Some(allowed) => allowed.contains(&client),
        }
    }
}

/// A set of clients with a shared membership rule.
#[derive(Debug, Clone)]
pub struct ClientGroup {
    pub clients: Vec<ClientIdx>,
    pub required: bool,
    /// At most one member of a mutually-exclusive group may be visited.
    pub mutually_exclusive: bool,
}

/// Clients whose visited members must share a route (or a route whose
/// vehicle type carries the same `name` — i.e. the same physical vehicle
/// across shifts).
#[derive(Debug, Clone)]
pub struct SameVehicleGroup {
    pub clients: Vec<ClientIdx>,
}

#[derive(Debug)]
pub enum ProblemError {
    NoVehicleTypes,
    EmptyDimensions,
    NegativeCapacity { vehicle_type: usize, dimension: usize },
    DepotOutOfRange { vehicle_type: usize },
}

impl fmt::Display for ProblemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemError::NoVehicleTypes => write!(f, "problem has no vehicle types"),
            ProblemError::EmptyDimensions => write!(f, "problem has zero load dimensions"),
            ProblemError::NegativeCapacity { vehicle_type, dimension } => {
                write!(f, "vehicle type {vehicle_type}: negative capacity in dimension {dimension}")
            }
            ProblemError::DepotOutOfRange { vehicle_type } => {
                write!(f, "vehicle type {vehicle_type}: start/end depot index out of range")
            }
        }
    }
}

impl std::error::Error for ProblemError {}

impl From<LoaderError> for ProblemError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::NoVehicleTypes => ProblemError::NoVehicleTypes,
            _ => ProblemError::EmptyDimensions,
        }
    }
}

/// The immutable instance description consumed by a solve call. Built by an
/// external model-builder and shared read-only with every search component.
pub struct ProblemData {
    pub num_depots: usize,
    pub num_clients: usize,
    pub num_profiles: usize,
    pub num_dimensions: usize,
    pub locations: Vec<Location>,
    /// `distance.get(profile, from, to)`.
    pub distance: Matrix3<Distance>,
    /// `duration.get(profile, from, to)`.
    pub duration: Matrix3<Duration>,
    pub vehicle_types: Vec<VehicleType>,
    pub client_groups: Vec<ClientGroup>,
    pub same_vehicle_groups: Vec<SameVehicleGroup>,
    pub num_vehicles: usize,
    index: ProblemIndex,
}

impl ProblemData {
    /// Upper bound on load dimensions a [`crate::cost::CostEvaluator`] can
    /// carry inline without heap allocation.
    pub const MAX_DIMENSIONS: usize = 4;

    pub fn new(
        locations: Vec<Location>,
        num_depots: usize,
        distance: Matrix3<Distance>,
        duration: Matrix3<Duration>,
        vehicle_types: Vec<VehicleType>,
        client_groups: Vec<ClientGroup>,
        same_vehicle_groups: Vec<SameVehicleGroup>,
    ) -> Result<Self, ProblemError> {
        if vehicle_types.is_empty() {
            return Err(ProblemError::NoVehicleTypes);
        }
        let num_dimensions = vehicle_types[0].capacity.len();
        if num_dimensions == 0 {
            return Err(ProblemError::EmptyDimensions);
        }
        let num_locations = locations.len();
        for (i, vt) in vehicle_types.iter().enumerate() {
            if vt.start_depot.index() >= num_locations || vt.end_depot.index() >= num_locations {
                return Err(ProblemError::DepotOutOfRange { vehicle_type: i });
            }
            for (d, &cap) in vt.capacity.iter().enumerate() {
                if cap < 0 {
                    return Err(ProblemError::NegativeCapacity { vehicle_type: i, dimension: d });
                }
            }
        }

        let num_vehicles = vehicle_types.iter().map(|vt| vt.num_available as usize).sum();
        let num_clients = num_locations - num_depots;
        let index = ProblemIndex::new(&locations[num_depots..], &vehicle_types);

        Ok(ProblemData {
            num_depots,
            num_clients,
            num_profiles: distance.dim1(),
            num_dimensions,
            locations,
            distance,
            duration,
            vehicle_types,
            client_groups,
            same_vehicle_groups,
            num_vehicles,
            index,
        })
    }

    pub fn num_locations(&self) -> usize {
        self.locations.len()
    }

    pub fn location(&self, idx: LocationIdx) -> &Location {
        &self.locations[idx.index()]
    }

    pub fn client_location(&self, client: ClientIdx) -> &Location {
        &self.locations[LocationIdx::from_client(client, self.num_depots).index()]
    }

    pub fn distance(&self, profile: ProfileIdx, from: LocationIdx, to: LocationIdx) -> Distance {
        *self.distance.get(profile.index(), from.index(), to.index())
    }

    pub fn duration(&self, profile: ProfileIdx, from: LocationIdx, to: LocationIdx) -> Duration {
        *self.duration.get(profile.index(), from.index(), to.index())
    }

    pub fn vehicle_type(&self, idx: VehicleTypeIdx) -> &VehicleType {
        &self.vehicle_types[idx.index()]
    }

    /// Vehicle type indices allowed to serve this client, precomputed at
    /// construction time.
    pub fn compatible_vehicle_types(&self, client: ClientIdx) -> &[VehicleTypeIdx] {
        self.index.compatible_vehicle_types(client)
    }

    pub fn client_group(&self, idx: GroupIdx) -> &ClientGroup {
        &self.client_groups[idx.index()]
    }

    /// `vehicle_type` for the `vehicle`-th vehicle in solve order (vehicle
    /// indices are assigned consecutively within each vehicle type).
    pub fn vehicle_type_of(&self, vehicle: VehicleIdx) -> VehicleTypeIdx {
        let mut remaining = vehicle.index();
        for (i, vt) in self.vehicle_types.iter().enumerate() {
            if remaining < vt.num_available as usize {
                return VehicleTypeIdx::new(i);
            }
            remaining -= vt.num_available as usize;
        }
        unreachable!("vehicle index out of range")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Matrix3;

    fn tiny_location(x: f64, y: f64) -> Location {
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
    fn rejects_empty_vehicle_types() {
        let locations = vec![tiny_location(0.0, 0.0)];
        let distance = Matrix3::new(1, 1, 1, 0);
        let duration = Matrix3::new(1, 1, 1, 0);
        let err = ProblemData::new(locations, 1, distance, duration, vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, ProblemError::NoVehicleTypes));
    }

    #[test]
    fn num_vehicles_sums_across_types() {
        let locations = vec![tiny_location(0.0, 0.0), tiny_location(1.0, 1.0)];
        let distance = Matrix3::new(1, 2, 2, 0);
        let duration = Matrix3::new(1, 2, 2, 0);
        let vt = VehicleType {
            num_available: 3,
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
            name: "a".into(),
            allowed_clients: None,
        };
        let problem = ProblemData::new(locations, 1, distance, duration, vec![vt], vec![], vec![]).unwrap();
        assert_eq!(problem.num_vehicles, 3);
        assert_eq!(problem.vehicle_type_of(VehicleIdx::new(2)).index(), 0);
    }
}
