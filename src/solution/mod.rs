pub mod route;
pub mod search;
pub mod value;

pub use route::Route;
pub use search::SearchSolution;
pub use value::{Solution, SolutionRoute};
