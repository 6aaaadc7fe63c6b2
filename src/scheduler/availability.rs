use super::{util, DayAvailability, StaffAvailability};
use crate::config::SchedulingConfig;
use crate::model::{BlockKind, ScheduleBlock, Staff, StaffStatus};
use crate::slots::{format_time, weekday_index, weekday_name};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

const BLOCK_PLACEHOLDER: &str = "Blocked on the schedule";

fn join_days(days: &[u8]) -> String {
    let names: Vec<&str> = days.iter().map(|d| weekday_name(*d)).collect();
    match names.as_slice() {
        [] => String::new(),
        [one] => (*one).to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn off_day_reason(staff: &Staff, weekday: u8) -> String {
    let worked: Vec<u8> = staff.work_days.iter().copied().collect();
    match worked.as_slice() {
        [] => format!("{} has no scheduled work days", staff.name),
        [only] => format!(
            "{} only works on {}s, not {}s",
            staff.name,
            weekday_name(*only),
            weekday_name(weekday)
        ),
        _ => {
            let off: Vec<u8> = (0..7u8).filter(|d| !staff.works_on(*d)).collect();
            format!(
                "{} does not work on {}s (days off: {})",
                staff.name,
                weekday_name(weekday),
                join_days(&off)
            )
        }
    }
}

/// Niveau journée uniquement : jours travaillés.
pub fn staff_day_availability(staff: &Staff, date: NaiveDate) -> DayAvailability {
    let weekday = weekday_index(date);
    if staff.works_on(weekday) {
        DayAvailability {
            is_available: true,
            reason: None,
        }
    } else {
        DayAvailability {
            is_available: false,
            reason: Some(off_day_reason(staff, weekday)),
        }
    }
}

/// Working window for `date`: the staff member's own hours when stored,
/// business hours otherwise.
pub fn working_window(
    staff: &Staff,
    date: NaiveDate,
    config: &SchedulingConfig,
) -> (NaiveTime, NaiveTime) {
    staff
        .hours_on(weekday_index(date))
        .map(|h| (h.start, h.end))
        .unwrap_or((config.open, config.close))
}

fn status_reason(
    staff: &Staff,
    date: NaiveDate,
    start: NaiveTime,
    now: NaiveDateTime,
) -> Option<String> {
    match staff.current_status {
        StaffStatus::Working => None,
        StaffStatus::Off if date == now.date() => {
            Some(format!("{} is off today", staff.name))
        }
        StaffStatus::Off => None,
        StaffStatus::OnCall => {
            let notice = Duration::hours(i64::from(staff.default_advance_notice_hours));
            if NaiveDateTime::new(date, start) < now + notice {
                Some(format!(
                    "{} is on call and needs {} hours notice",
                    staff.name, staff.default_advance_notice_hours
                ))
            } else {
                None
            }
        }
    }
}

fn block_reason(staff: &Staff, block: &ScheduleBlock, start: NaiveTime, end: NaiveTime) -> Option<String> {
    let why = block.reason.as_deref().unwrap_or(BLOCK_PLACEHOLDER);
    match &block.kind {
        BlockKind::FullDay => Some(format!("{} is unavailable all day: {}", staff.name, why)),
        BlockKind::TimeRange {
            start_time,
            end_time,
        } => {
            let (bs, be) = util::span(*start_time, *end_time);
            let (rs, re) = util::span(start, end);
            util::overlaps_inclusive(bs, be, rs, re).then(|| {
                format!(
                    "{} is unavailable {}-{}: {}",
                    staff.name,
                    format_time(*start_time),
                    format_time(*end_time),
                    why
                )
            })
        }
    }
}

/// Évaluation en couches ; la première règle qui échoue arrête l'évaluation.
///
/// `blocks` may contain blocks for other staff members or dates; only those
/// belonging to `staff` and covering `date` are considered.
pub fn check_staff_availability(
    staff: &Staff,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    blocks: &[ScheduleBlock],
    now: NaiveDateTime,
    config: &SchedulingConfig,
) -> StaffAvailability {
    if !staff.is_active {
        return StaffAvailability::unavailable(format!("{} is inactive", staff.name));
    }

    let day = staff_day_availability(staff, date);
    if !day.is_available {
        let reason = day
            .reason
            .unwrap_or_else(|| format!("{} is not working that day", staff.name));
        return StaffAvailability::unavailable(reason);
    }

    if let Some(reason) = status_reason(staff, date, start, now) {
        return StaffAvailability::unavailable(reason);
    }

    let (work_start, work_end) = working_window(staff, date, config);
    if start < work_start || end > work_end {
        return StaffAvailability::unavailable(format!(
            "{} works {}-{} on {}s; requested {}-{}",
            staff.name,
            format_time(work_start),
            format_time(work_end),
            weekday_name(weekday_index(date)),
            format_time(start),
            format_time(end)
        ));
    }

    let reasons: Vec<String> = blocks
        .iter()
        .filter(|b| b.staff_id == staff.id && b.covers(date))
        .filter_map(|b| block_reason(staff, b, start, end))
        .take(1)
        .collect();
    if reasons.is_empty() {
        StaffAvailability::available()
    } else {
        StaffAvailability {
            available: false,
            reasons,
        }
    }
}
