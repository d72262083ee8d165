pub mod node_ops;
pub mod params;
pub mod route_ops;
pub mod splice;

pub use node_ops::{NodeOp, NodeOpStats};
pub use params::OperatorParams;
pub use route_ops::{RouteOp, SwapStarCache, SwapStarMove};
pub use splice::{splice, RouteAggregates};
