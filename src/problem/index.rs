use crate::problem::problem::{Location, VehicleType};
use crate::types::*;

/// Precomputed per-client lookups derived from [`crate::problem::ProblemData`].
#[derive(Default)]
pub(super) struct ProblemIndex {
    /// For each client, the vehicle type indices allowed to serve it.
    compatible_vehicle_types: Vec<Vec<VehicleTypeIdx>>,
}

impl ProblemIndex {
    pub fn new(client_locations: &[Location], vehicle_types: &[VehicleType]) -> Self {
        let compatible_vehicle_types = client_locations
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let client = ClientIdx::new(i);
                vehicle_types
                    .iter()
                    .enumerate()
                    .filter(|(_, vt)| vt.allows(client))
                    .map(|(vt_idx, _)| VehicleTypeIdx::new(vt_idx))
                    .collect()
            })
            .collect();

        ProblemIndex { compatible_vehicle_types }
    }

    #[inline(always)]
    pub fn compatible_vehicle_types(&self, client: ClientIdx) -> &[VehicleTypeIdx] {
        &self.compatible_vehicle_types[client.index()]
    }
}
