use super::availability::check_staff_availability;
use super::conflicts::{check_booking_conflicts, ProposedBooking};
use super::rooms::optimal_room;
use super::ValidationResult;
use crate::config::SchedulingConfig;
use crate::model::{Booking, BookingGroupId, BookingId, Room, ScheduleBlock, Service, Staff};
use crate::slots::{
    accommodation_errors, format_time, minutes_of_day, parse_time, try_end_time, weekday_index,
    weekday_name,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::slice;

/// Demande de réservation telle que saisie ; tout champ absent est une erreur bloquante.
#[derive(Debug, Clone, Default)]
pub struct BookingRequest<'a> {
    pub service: Option<&'a Service>,
    pub staff: Option<&'a Staff>,
    pub room: Option<&'a Room>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<&'a str>,
    pub add_on_minutes: u32,
    pub booking_group_id: Option<BookingGroupId>,
    pub replaces: Option<BookingId>,
}

/// Everything the validator reads besides the request. `now` is injected so
/// that no check depends on the wall clock.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub config: &'a SchedulingConfig,
    pub now: NaiveDateTime,
    pub schedule_blocks: &'a [ScheduleBlock],
    pub existing_bookings: &'a [Booking],
    /// Full room list; when empty, no "better room" warning is produced.
    pub rooms: &'a [Room],
}

fn missing_fields(request: &BookingRequest<'_>) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if request.service.is_none() {
        missing.push("service");
    }
    if request.staff.is_none() {
        missing.push("staff");
    }
    if request.room.is_none() {
        missing.push("room");
    }
    if request.date.is_none() {
        missing.push("date");
    }
    if request.start_time.map_or(true, |s| s.trim().is_empty()) {
        missing.push("start time");
    }
    missing
}

/// Toutes les étapes s'exécutent et accumulent leurs erreurs, sauf les
/// entrées manquantes ou illisibles qui arrêtent tout de suite.
pub fn validate_booking_request(
    request: &BookingRequest<'_>,
    ctx: &ValidationContext<'_>,
) -> ValidationResult {
    let missing = missing_fields(request);
    let (Some(service), Some(staff), Some(room), Some(date), Some(start_raw), true) = (
        request.service,
        request.staff,
        request.room,
        request.date,
        request.start_time,
        missing.is_empty(),
    ) else {
        return ValidationResult::rejected(vec![format!(
            "Missing required booking details: {}",
            missing.join(", ")
        )]);
    };

    let Some(duration) = service.duration_minutes.checked_add(request.add_on_minutes) else {
        return ValidationResult::rejected(vec![format!(
            "Appointment length of {} + {} minutes is out of range",
            service.duration_minutes, request.add_on_minutes
        )]);
    };
    let (start, end) = match parse_time(start_raw)
        .and_then(|start| try_end_time(start, i64::from(duration)).map(|end| (start, end)))
    {
        Ok(span) => span,
        Err(err) => return ValidationResult::rejected(vec![err.to_string()]),
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    time_policy(date, start, duration, ctx, &mut errors, &mut warnings);

    if !service.is_active {
        errors.push(format!("{} is no longer offered", service.name));
    }
    if !staff.is_active {
        errors.push(format!("{} is not currently active", staff.name));
    } else {
        if !staff.can_perform(service.category) {
            errors.push(format!(
                "{} is not qualified to perform {} services",
                staff.name, service.category
            ));
        }
        let availability =
            check_staff_availability(staff, date, start, end, ctx.schedule_blocks, ctx.now, ctx.config);
        if !availability.available {
            errors.extend(availability.reasons);
        }
    }

    room_cross_check(service, staff, room, ctx, &mut errors, &mut warnings);

    let proposed = ProposedBooking {
        staff_id: staff.id.clone(),
        room_id: room.id.clone(),
        date,
        start,
        end,
        booking_group_id: request.booking_group_id.clone(),
        replaces: request.replaces.clone(),
    };
    let conflicts = check_booking_conflicts(&proposed, ctx.existing_bookings, true, ctx.config);
    errors.extend(conflicts.iter().map(|c| c.message.clone()));

    ValidationResult::new(errors, warnings, conflicts)
}

fn time_policy(
    date: NaiveDate,
    start: NaiveTime,
    duration: u32,
    ctx: &ValidationContext<'_>,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let config = ctx.config;
    let today = ctx.now.date();

    if date < today {
        errors.push("Cannot book appointments in the past".to_string());
    } else if date == today {
        let lead = minutes_of_day(start) - minutes_of_day(ctx.now.time());
        if lead < 0 {
            errors.push(format!("Start time {} has already passed", format_time(start)));
        } else if lead < i64::from(config.same_day_warning_minutes) {
            warnings.push(format!(
                "Same-day appointment starts in less than {} minutes",
                config.same_day_warning_minutes
            ));
        }
    }

    if date > today + Duration::days(i64::from(config.max_advance_days)) {
        errors.push(format!(
            "Appointments can only be booked up to {} days in advance",
            config.max_advance_days
        ));
    }

    errors.extend(accommodation_errors(start, duration, true, config));

    let weekday = weekday_index(date);
    if config.reduced_staffing_days.contains(&weekday) {
        warnings.push(format!(
            "{}s run with reduced staffing; availability may be limited",
            weekday_name(weekday)
        ));
    }
}

/// Le résolveur tourne sur la seule cabine proposée : ses erreurs sont bloquantes.
/// Une meilleure cabine ailleurs n'est qu'un avertissement.
fn room_cross_check(
    service: &Service,
    staff: &Staff,
    room: &Room,
    ctx: &ValidationContext<'_>,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    if !room.is_active {
        errors.push(format!("{} is not available for bookings", room.name));
        return;
    }

    let proposed = optimal_room(service, slice::from_ref(room), Some(staff));
    if proposed.room.is_none() {
        errors.extend(proposed.errors);
        return;
    }

    if ctx.rooms.is_empty() {
        return;
    }
    let recommended = optimal_room(service, ctx.rooms, Some(staff));
    if let Some(best) = recommended.room {
        if best.id != room.id {
            warnings.push(format!(
                "{} is recommended instead of {} ({})",
                best.name, room.name, recommended.reason
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceCategory;
    use rust_decimal::Decimal;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn fixtures() -> (Service, Staff, Room) {
        let service = Service::new("Hydrafacial", ServiceCategory::Facial, 30, Decimal::new(90, 0)).unwrap();
        let staff = Staff::new("Ana", [ServiceCategory::Facial], 0..7);
        let room = Room::new("Room 1", 1).unwrap();
        (service, staff, room)
    }

    fn ctx(config: &SchedulingConfig) -> ValidationContext<'_> {
        ValidationContext {
            config,
            now: NaiveDate::from_ymd_opt(2025, 5, 30).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            schedule_blocks: &[],
            existing_bookings: &[],
            rooms: &[],
        }
    }

    #[test]
    fn missing_inputs_short_circuit() {
        let config = SchedulingConfig::default();
        let (service, _, _) = fixtures();
        let request = BookingRequest {
            service: Some(&service),
            start_time: Some("  "),
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &ctx(&config));
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["Missing required booking details: staff, room, date, start time".to_string()]
        );
    }

    #[test]
    fn unparseable_start_is_rejected() {
        let config = SchedulingConfig::default();
        let (service, staff, room) = fixtures();
        let request = BookingRequest {
            service: Some(&service),
            staff: Some(&staff),
            room: Some(&room),
            date: Some(monday()),
            start_time: Some("ten"),
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &ctx(&config));
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn clean_request_passes() {
        let config = SchedulingConfig::default();
        let (service, staff, room) = fixtures();
        let request = BookingRequest {
            service: Some(&service),
            staff: Some(&staff),
            room: Some(&room),
            date: Some(monday()),
            start_time: Some("10:00"),
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &ctx(&config));
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn errors_accumulate_across_checks() {
        let config = SchedulingConfig::default();
        let (service, mut staff, room) = fixtures();
        staff.capabilities.clear();
        let request = BookingRequest {
            service: Some(&service),
            staff: Some(&staff),
            room: Some(&room),
            date: Some(monday()),
            start_time: Some("18:30"),
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &ctx(&config));
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.starts_with("Latest start time")));
        assert!(result.errors.iter().any(|e| e.contains("not qualified")));
    }

    #[test]
    fn add_ons_extend_the_appointment() {
        let config = SchedulingConfig::default();
        let (service, staff, room) = fixtures();
        let request = BookingRequest {
            service: Some(&service),
            staff: Some(&staff),
            room: Some(&room),
            date: Some(monday()),
            start_time: Some("18:00"),
            add_on_minutes: 30,
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &ctx(&config));
        assert!(result.errors.iter().any(|e| e.contains("runs past closing")));
    }

    #[test]
    fn overflowing_add_on_is_rejected() {
        let config = SchedulingConfig::default();
        let (service, staff, room) = fixtures();
        let request = BookingRequest {
            service: Some(&service),
            staff: Some(&staff),
            room: Some(&room),
            date: Some(monday()),
            start_time: Some("10:00"),
            add_on_minutes: u32::MAX,
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &ctx(&config));
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].ends_with("is out of range"));
    }

    #[test]
    fn past_date_is_an_error() {
        let config = SchedulingConfig::default();
        let (service, staff, room) = fixtures();
        // la veille de `now`, un jeudi à effectif réduit
        let yesterday = NaiveDate::from_ymd_opt(2025, 5, 29).unwrap();
        let request = BookingRequest {
            service: Some(&service),
            staff: Some(&staff),
            room: Some(&room),
            date: Some(yesterday),
            start_time: Some("10:00"),
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &ctx(&config));
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Cannot book appointments in the past".to_string()]);
    }

    #[test]
    fn same_day_start_before_now_is_an_error() {
        let config = SchedulingConfig::default();
        let (service, staff, room) = fixtures();
        let context = ValidationContext {
            now: monday().and_hms_opt(11, 0, 0).unwrap(),
            ..ctx(&config)
        };
        let request = BookingRequest {
            service: Some(&service),
            staff: Some(&staff),
            room: Some(&room),
            date: Some(monday()),
            start_time: Some("10:00"),
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &context);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Start time 10:00 has already passed".to_string()]);
    }

    #[test]
    fn reduced_staffing_and_same_day_are_warnings() {
        let config = SchedulingConfig::default();
        let (service, staff, room) = fixtures();
        let tuesday = monday().succ_opt().unwrap();
        let context = ValidationContext {
            now: tuesday.and_hms_opt(9, 30, 0).unwrap(),
            ..ctx(&config)
        };
        let request = BookingRequest {
            service: Some(&service),
            staff: Some(&staff),
            room: Some(&room),
            date: Some(tuesday),
            start_time: Some("10:00"),
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &context);
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn better_room_is_only_a_warning() {
        let config = SchedulingConfig::default();
        let (service, staff, _) = fixtures();
        let small = Room::new("Room 1", 1).unwrap();
        let big = Room::new("Room 2", 2).unwrap();
        let rooms = vec![small, big.clone()];
        let context = ValidationContext {
            rooms: &rooms,
            ..ctx(&config)
        };
        let request = BookingRequest {
            service: Some(&service),
            staff: Some(&staff),
            room: Some(&big),
            date: Some(monday()),
            start_time: Some("10:00"),
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &context);
        assert!(result.is_valid);
        assert!(result.warnings[0].starts_with("Room 1 is recommended instead of Room 2"));
    }

    #[test]
    fn body_scrub_in_plain_room_is_an_error() {
        let config = SchedulingConfig::default();
        let (_, mut staff, room) = fixtures();
        staff.capabilities.insert(ServiceCategory::BodyScrub);
        let scrub = Service::new("Salt scrub", ServiceCategory::BodyScrub, 30, Decimal::new(65, 0)).unwrap();
        let request = BookingRequest {
            service: Some(&scrub),
            staff: Some(&staff),
            room: Some(&room),
            date: Some(monday()),
            start_time: Some("10:00"),
            ..BookingRequest::default()
        };
        let result = validate_booking_request(&request, &ctx(&config));
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("Body scrub services can only be booked"));
    }
}
