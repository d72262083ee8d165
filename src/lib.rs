//! A granular-neighbourhood metaheuristic core for the Vehicle Routing
//! Problem: an Iterated Local Search driver around a local search that prices
//! move candidates by splicing composable segment summaries around the
//! touched window — O(1) for single-client moves, proportional to the
//! touched span for segment/tail moves — instead of re-simulating whole
//! routes, with an adaptive penalty manager steering the search between
//! feasible and infeasible space.
//!
//! The entry point is [`search::solve`]; everything else is the supporting
//! machinery it's built from. `problem` and `solution` hold the data model,
//! `segments`/`cost` hold the cost-evaluation primitives, `operators` and
//! `search` hold the search itself.

pub mod cost;
pub mod metrics;
pub mod neighbourhood;
pub mod operators;
pub mod problem;
pub mod search;
pub mod solution;
pub mod types;
pub mod utils;
