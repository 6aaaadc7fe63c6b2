//! Arithmétique horaire : génération des créneaux, heure de fin, fenêtre d'ouverture.
//!
//! Les helpers « chaîne » (`calculate_end_time`, `can_accommodate_service`) ne
//! paniquent jamais : une entrée invalide donne un résultat neutre. Les variantes
//! typées (`parse_time`, `try_end_time`) renvoient un `Result` et sont celles
//! qu'utilise le reste de la crate.

use crate::config::SchedulingConfig;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("duration must be positive, got {0} minutes")]
    NonPositiveDuration(i64),
}

/// Accepte `HH:MM` ou `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, TimeError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| TimeError::InvalidTime(raw.to_string()))
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Minutes elapsed since midnight; `HH:MM` can exceed 24h for overflowing ends.
pub(crate) fn format_minutes(minutes: i64) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn minutes_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

fn time_from_minutes(minutes: i64) -> Option<NaiveTime> {
    if !(0..MINUTES_PER_DAY).contains(&minutes) {
        return None;
    }
    NaiveTime::from_hms_opt((minutes / 60) as u32, (minutes % 60) as u32, 0)
}

/// `start + minutes`, modulo a day.
pub fn try_end_time(start: NaiveTime, minutes: i64) -> Result<NaiveTime, TimeError> {
    if minutes <= 0 {
        return Err(TimeError::NonPositiveDuration(minutes));
    }
    Ok(start.overflowing_add_signed(Duration::minutes(minutes)).0)
}

/// Fail-soft: returns `start` unchanged when it cannot be parsed or when
/// `minutes <= 0`. Callers compare the result with their input to detect it.
pub fn calculate_end_time(start: &str, minutes: i64) -> String {
    match parse_time(start).and_then(|t| try_end_time(t, minutes)) {
        Ok(end) => format_time(end),
        Err(_) => start.to_string(),
    }
}

/// Inverse de `try_end_time`.
pub fn subtract_minutes(time: NaiveTime, minutes: i64) -> NaiveTime {
    time.overflowing_sub_signed(Duration::minutes(minutes)).0
}

/// Business-hour violations for an appointment starting at `start`, empty when it fits.
pub fn accommodation_errors(
    start: NaiveTime,
    duration_minutes: u32,
    include_buffer: bool,
    config: &SchedulingConfig,
) -> Vec<String> {
    let mut errors = Vec::new();
    let start_m = minutes_of_day(start);

    if start_m < config.open_minutes() {
        errors.push(format!(
            "Start time {} is before opening ({})",
            format_time(start),
            format_time(config.open)
        ));
    }
    if start_m > config.last_start_minutes() {
        errors.push(format!(
            "Latest start time is {} ({} minutes before closing)",
            format_minutes(config.last_start_minutes()),
            config.last_booking_offset_minutes
        ));
    }

    let end_m = start_m + i64::from(duration_minutes);
    let buffer = if include_buffer {
        i64::from(config.buffer_minutes)
    } else {
        0
    };
    if end_m + buffer > config.close_minutes() {
        if buffer > 0 {
            errors.push(format!(
                "Appointment ending at {} plus the {}-minute buffer runs past closing ({})",
                format_minutes(end_m),
                buffer,
                format_time(config.close)
            ));
        } else {
            errors.push(format!(
                "Appointment ending at {} runs past closing ({})",
                format_minutes(end_m),
                format_time(config.close)
            ));
        }
    }
    errors
}

/// Malformed start or zero duration gives `false`.
pub fn can_accommodate_service(
    start: &str,
    duration_minutes: u32,
    include_buffer: bool,
    config: &SchedulingConfig,
) -> bool {
    match parse_time(start) {
        Ok(t) if duration_minutes > 0 => {
            accommodation_errors(t, duration_minutes, include_buffer, config).is_empty()
        }
        _ => false,
    }
}

/// Règle de préavis minimal : le créneau doit être au moins `min_notice_hours` après `now`.
pub fn is_far_enough_ahead(
    date: NaiveDate,
    time: NaiveTime,
    now: NaiveDateTime,
    config: &SchedulingConfig,
) -> bool {
    NaiveDateTime::new(date, time) >= now + Duration::hours(i64::from(config.min_notice_hours))
}

/// Créneaux `HH:MM` de l'ouverture au dernier départ légal, par pas de granularité.
///
/// With a duration the latest start is `close - (duration + buffer)`, otherwise
/// `close - last_booking_offset`. `consider_last_booking` additionally caps a
/// duration-based bound at the last-booking offset so that every slot produced
/// also passes [`can_accommodate_service`].
pub fn generate_time_slots(
    date: NaiveDate,
    service_duration: Option<u32>,
    consider_last_booking: bool,
    now: NaiveDateTime,
    config: &SchedulingConfig,
) -> Vec<String> {
    let mut latest = match service_duration {
        Some(d) => config.close_minutes() - i64::from(d) - i64::from(config.buffer_minutes),
        None => config.last_start_minutes(),
    };
    if consider_last_booking {
        latest = latest.min(config.last_start_minutes());
    }

    let step = i64::from(config.slot_granularity_minutes.max(1));
    let mut slots = Vec::new();
    let mut cursor = config.open_minutes();
    while cursor <= latest {
        if let Some(time) = time_from_minutes(cursor) {
            if is_far_enough_ahead(date, time, now, config) {
                slots.push(format_time(time));
            }
        }
        cursor += step;
    }
    slots
}

/// Sunday = 0.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn weekday_name(index: u8) -> &'static str {
    match index {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "unknown day",
    }
}
