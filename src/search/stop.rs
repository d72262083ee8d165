//! Composable stop predicates: the driver calls `stop_fn(best_cost)` once
//! after every outer iteration and halts as soon as it returns `true`.

use crate::types::Cost;
use std::time::Instant;

pub type StopFn = Box<dyn FnMut(Cost) -> bool + Send>;

pub fn max_iterations(n: u64) -> StopFn {
    let mut count = 0u64;
    Box::new(move |_| {
        count += 1;
        count >= n
    })
}

/// Starts its clock on the first call, not at construction time.
pub fn max_runtime(seconds: f64) -> StopFn {
    let mut start: Option<Instant> = None;
    Box::new(move |_| {
        let start = start.get_or_insert_with(Instant::now);
        start.elapsed().as_secs_f64() >= seconds
    })
}

/// Stops after `n` consecutive calls where `best_cost` did not strictly
/// decrease relative to the previous call.
pub fn no_improvement(n: u64) -> StopFn {
    let mut last: Option<Cost> = None;
    let mut stagnant = 0u64;
    Box::new(move |best_cost| {
        match last {
            Some(prev) if best_cost < prev => stagnant = 0,
            _ => stagnant += 1,
        }
        last = Some(best_cost);
        stagnant >= n
    })
}

/// Stops the first time `best_cost` is finite (below `UNREACHABLE`).
pub fn first_feasible() -> StopFn {
    Box::new(|best_cost| best_cost < crate::types::UNREACHABLE)
}

/// Logical OR over a set of predicates: stops once any fires. Every
/// predicate is still queried each call so its internal state stays current.
pub fn multiple_criteria(mut predicates: Vec<StopFn>) -> StopFn {
    Box::new(move |best_cost| {
        let mut stop = false;
        for p in &mut predicates {
            stop |= p(best_cost);
        }
        stop
    })
}

/// Logical AND: stops only once every predicate has fired. Every predicate
/// is still queried each call, as in `multiple_criteria`, so e.g. a
/// `max_runtime` further down the list still starts its clock on the first
/// call instead of only once everything before it has already fired.
pub fn all(mut predicates: Vec<StopFn>) -> StopFn {
    Box::new(move |best_cost| {
        let mut stop = true;
        for p in &mut predicates {
            stop &= p(best_cost);
        }
        stop
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_iterations_fires_after_n_calls() {
        let mut stop = max_iterations(3);
        assert!(!stop(0));
        assert!(!stop(0));
        assert!(stop(0));
    }

    #[test]
    fn no_improvement_resets_on_strict_decrease() {
        let mut stop = no_improvement(2);
        assert!(!stop(100));
        assert!(!stop(100)); // stagnant=1
        assert!(!stop(90)); // improved, resets to 0
        assert!(!stop(90)); // stagnant=1
        assert!(stop(90)); // stagnant=2
    }

    #[test]
    fn multiple_criteria_is_or() {
        let mut stop = multiple_criteria(vec![max_iterations(5), first_feasible()]);
        assert!(stop(0));
    }

    #[test]
    fn all_is_and() {
        let mut stop = all(vec![max_iterations(2), first_feasible()]);
        assert!(!stop(crate::types::UNREACHABLE));
        assert!(stop(0));
    }
}
