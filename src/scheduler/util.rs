use crate::slots::minutes_of_day;
use chrono::NaiveTime;

/// Closed-interval overlap in minutes since midnight: touching edges count.
pub(super) fn overlaps_inclusive(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start <= b_end && b_start <= a_end
}

pub(super) fn span(start: NaiveTime, end: NaiveTime) -> (i64, i64) {
    (minutes_of_day(start), minutes_of_day(end))
}
