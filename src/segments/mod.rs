//! Composable, associative summaries over contiguous spans of route nodes.
//!
//! Both [`LoadSegment`] and [`DurationSegment`] exist so that an operator can
//! price a candidate move by merging O(1) cached prefix/suffix segments
//! instead of re-simulating the whole route (see `Route`'s cached segment
//! arrays in `crate::solution::route`).

mod duration_segment;
mod load_segment;

pub use duration_segment::DurationSegment;
pub use load_segment::LoadSegment;
