pub mod ils;
pub mod local_search;
pub mod penalty;
pub mod perturbation;
pub mod ring_buffer;
pub mod stop;

#[cfg(test)]
mod tests;

pub use ils::{solve, solve_with_metrics, ConfigError, IlsParams, SolveOptions, SolveResult, SolveStats};
pub use local_search::LocalSearch;
pub use penalty::{PenaltyManager, PenaltyParams};
pub use perturbation::{PerturbationManager, PerturbationParams};
pub use ring_buffer::RingBuffer;
