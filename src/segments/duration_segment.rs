use crate::types::Duration;

/// A composable summary of the schedule along one profile over a contiguous
/// span of route nodes.
///
/// `start_early`/`start_late` bound the window of times the segment may begin
/// service without incurring *avoidable* time warp; `duration` is the total
/// time elapsed (travel + service + unavoidable waiting) when the segment
/// starts at `start_early`; `time_warp` is the minimum unavoidable time-window
/// violation. `merge` is associative but not commutative: concatenation order
/// matters because travel direction matters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DurationSegment {
    pub duration: Duration,
    pub time_warp: Duration,
    pub start_early: Duration,
    pub start_late: Duration,
    pub release_time: Duration,
    /// Duration accumulated on earlier, finalised trips of the same route.
    pub cum_duration: Duration,
    /// Time warp accumulated on earlier, finalised trips of the same route.
    pub cum_time_warp: Duration,
    /// `start_late` of the node immediately preceding this segment, cached so
    /// `finalise_front`/`finalise_back` can re-seed a trip boundary without
    /// re-reading the route.
    pub prev_end_late: Duration,
}

impl DurationSegment {
    /// The segment for a single node: zero travel, just its own service time
    /// and time window.
    pub fn for_node(tw_early: Duration, tw_late: Duration, service: Duration, release_time: Duration) -> Self {
        DurationSegment {
            duration: service,
            time_warp: 0,
            start_early: tw_early,
            start_late: tw_late,
            release_time,
            cum_duration: 0,
            cum_time_warp: 0,
            prev_end_late: tw_late,
        }
    }

    /// Identity element for `merge` (travelling through nothing, for zero
    /// time, with no window constraint).
    pub const IDENTITY: DurationSegment = DurationSegment {
        duration: 0,
        time_warp: 0,
        start_early: 0,
        start_late: Duration::MAX / 4,
        release_time: 0,
        cum_duration: 0,
        cum_time_warp: 0,
        prev_end_late: Duration::MAX / 4,
    };

    /// Merges `first` (earlier) and `second` (later), connected by an edge of
    /// `edge_duration` travel time. This is the concatenation formula from
    /// Vidal et al.'s time-window propagation: `delta` is the time elapsed
    /// from the start of `first` to arrival at `second` absent extra waiting;
    /// `delta_wait`/`delta_tw` are the extra wait/time-warp forced by that
    /// arrival falling outside `second`'s window.
    pub fn merge(edge_duration: Duration, first: &DurationSegment, second: &DurationSegment) -> DurationSegment {
        // `delta` is the wall-clock elapsed from the start of `first` to
        // arrival at `second`. Time warp already teleported the clock
        // backward within `first`, so it must be subtracted back out here —
        // using `first.duration` alone double-counts it as real elapsed time.
        let delta = first.duration - first.time_warp + edge_duration;
        let delta_wait = (second.start_early - delta - first.start_early).max(0);
        let delta_tw = (first.start_early + delta - second.start_late).max(0);

        DurationSegment {
            duration: first.duration + edge_duration + second.duration + delta_wait,
            time_warp: first.time_warp + second.time_warp + delta_tw,
            start_early: first.start_early.max(second.start_early - delta) - delta_wait,
            start_late: first.start_late.min(second.start_late - delta) + delta_tw,
            release_time: first.release_time.max(second.release_time),
            cum_duration: first.cum_duration + second.cum_duration,
            cum_time_warp: first.cum_time_warp + second.cum_time_warp,
            prev_end_late: first.prev_end_late,
        }
    }

    /// Duration including a release-time hold at the very start of the
    /// segment (only meaningful when this segment represents the whole
    /// route, or the start of a trip).
    pub fn duration_at_release(&self) -> Duration {
        self.duration + (self.release_time - self.start_early).max(0)
    }

    /// Time warp, optionally bounded by a `max_duration` shift cap. Per the
    /// design note in DESIGN.md, Route's cached aggregate always calls this
    /// with `None` (the base, unbounded value) and tracks overtime as an
    /// independent aggregate; the `Some` form exists for ad hoc operator
    /// queries that want the two folded together.
    pub fn time_warp(&self, max_duration: Option<Duration>) -> Duration {
        let mut tw = self.time_warp;
        if let Some(max_dur) = max_duration {
            tw += (self.duration - max_dur).max(0);
        }
        tw
    }

    /// Moves the current trip into the cumulative fields and re-seeds the
    /// trip summary as an empty segment anchored at `next_early`/`next_late`,
    /// as happens when finalising the trip ending at a reload depot.
    pub fn finalise_back(&self, next_early: Duration, next_late: Duration) -> DurationSegment {
        DurationSegment {
            duration: 0,
            time_warp: 0,
            start_early: next_early,
            start_late: next_late,
            release_time: self.release_time,
            cum_duration: self.cum_duration + self.duration,
            cum_time_warp: self.cum_time_warp + self.time_warp,
            prev_end_late: self.start_late,
        }
    }

    /// Symmetric counterpart used when building a suffix array back-to-front:
    /// folds `self`'s trip into cumulative fields, re-seeding with the
    /// predecessor's window.
    pub fn finalise_front(&self, prev_early: Duration, prev_late: Duration) -> DurationSegment {
        self.finalise_back(prev_early, prev_late)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(early: Duration, late: Duration, service: Duration) -> DurationSegment {
        DurationSegment::for_node(early, late, service, 0)
    }

    #[test]
    fn identity_is_left_and_right_identity() {
        let a = node(0, 100, 5);
        let left = DurationSegment::merge(0, &DurationSegment::IDENTITY, &a);
        let right = DurationSegment::merge(0, &a, &DurationSegment::IDENTITY);
        assert_eq!(left.duration, a.duration);
        assert_eq!(left.time_warp, a.time_warp);
        assert_eq!(right.duration, a.duration);
        assert_eq!(right.time_warp, a.time_warp);
    }

    #[test]
    fn merge_is_associative_for_any_edge_split() {
        let a = node(0, 100, 5);
        let b = node(10, 50, 3);
        let c = node(20, 60, 2);

        let ab = DurationSegment::merge(4, &a, &b);
        let left = DurationSegment::merge(6, &ab, &c);

        let bc = DurationSegment::merge(6, &b, &c);
        let right = DurationSegment::merge(4, &a, &bc);

        assert_eq!(left.duration, right.duration);
        assert_eq!(left.time_warp, right.time_warp);
    }

    #[test]
    fn tight_window_forces_time_warp() {
        // a's window closes at 10; travelling 20 to b means we arrive at 20,
        // violating a's own window is impossible (a comes first), but b's
        // window [0, 5] is violated by 15 units once we chain through a.
        let a = node(0, 10, 0);
        let b = node(0, 5, 0);
        let merged = DurationSegment::merge(20, &a, &b);
        assert!(merged.time_warp > 0);
    }

    #[test]
    fn no_warp_when_windows_are_generous() {
        let a = node(0, 1000, 5);
        let b = node(0, 1000, 5);
        let merged = DurationSegment::merge(10, &a, &b);
        assert_eq!(merged.time_warp, 0);
    }
}
