mod index;
mod loader;
mod problem;

pub use loader::LoaderError;
pub use problem::{ClientGroup, Location, ProblemData, ProblemError, SameVehicleGroup, VehicleType};
