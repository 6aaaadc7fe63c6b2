use super::availability::staff_day_availability;
use super::conflicts::{check_booking_conflicts, ProposedBooking};
use super::rooms::optimal_room;
use super::validate::{validate_booking_request, BookingRequest, ValidationContext};
use super::{BookingConflict, BookingDraft, SchedError, Scheduler, ValidationResult};
use crate::model::{
    Booking, BookingGroupId, BookingId, Room, RoomId, Service, ServiceId, Staff, StaffId,
};
use crate::slots::generate_time_slots;
use crate::store::{BookingStore, ConflictCriteria, ScheduleBlockStore};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::slice;
use tracing::debug;

/// Conflit relevé par l'audit entre deux rendez-vous enregistrés.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub booking: BookingId,
    pub conflict: BookingConflict,
}

/// One validation run, with every entity already resolved.
pub(super) struct Check<'a> {
    pub service: &'a Service,
    pub staff: &'a Staff,
    pub room: &'a Room,
    pub date: NaiveDate,
    pub start_time: &'a str,
    pub add_on_minutes: u32,
    pub booking_group_id: Option<BookingGroupId>,
    pub replaces: Option<BookingId>,
}

impl Scheduler {
    pub(super) fn service(&self, id: &ServiceId) -> Result<&Service, SchedError> {
        self.spa
            .find_service(id)
            .ok_or_else(|| SchedError::UnknownService(id.to_string()))
    }

    pub(super) fn staff_member(&self, id: &StaffId) -> Result<&Staff, SchedError> {
        self.spa
            .find_staff(id)
            .ok_or_else(|| SchedError::UnknownStaff(id.to_string()))
    }

    pub(super) fn room(&self, id: &RoomId) -> Result<&Room, SchedError> {
        self.spa
            .find_room(id)
            .ok_or_else(|| SchedError::UnknownRoom(id.to_string()))
    }

    /// Fetches blocks and bookings from the stores, then validates.
    pub(super) fn run_check(&self, check: &Check<'_>, now: NaiveDateTime) -> ValidationResult {
        let blocks = self.spa.schedule_blocks(&check.staff.id, check.date);
        let criteria = ConflictCriteria::on(check.date)
            .staff(&check.staff.id)
            .room(&check.room.id);
        let existing = self.spa.bookings_for_conflict_check(&criteria);
        let ctx = ValidationContext {
            config: &self.config,
            now,
            schedule_blocks: &blocks,
            existing_bookings: &existing,
            rooms: &self.spa.rooms,
        };
        let request = BookingRequest {
            service: Some(check.service),
            staff: Some(check.staff),
            room: Some(check.room),
            date: Some(check.date),
            start_time: Some(check.start_time),
            add_on_minutes: check.add_on_minutes,
            booking_group_id: check.booking_group_id.clone(),
            replaces: check.replaces.clone(),
        };
        let result = validate_booking_request(&request, &ctx);
        debug!(
            staff = %check.staff.name,
            room = %check.room.name,
            date = %check.date,
            start = check.start_time,
            valid = result.is_valid,
            errors = result.errors.len(),
            "booking request validated"
        );
        result
    }

    /// Rooms the resolver accepts for this service, its recommendation first.
    pub(super) fn candidate_rooms(&self, service: &Service, staff: &Staff) -> Vec<&Room> {
        let best = optimal_room(service, &self.spa.rooms, Some(staff))
            .room
            .map(|r| r.id);
        let mut rooms: Vec<&Room> = self
            .spa
            .rooms
            .iter()
            .filter(|r| {
                r.is_active
                    && optimal_room(service, slice::from_ref(*r), Some(staff))
                        .room
                        .is_some()
            })
            .collect();
        rooms.sort_by_key(|r| best.as_ref() != Some(&r.id));
        rooms
    }

    /// Premier local où la demande passe ; à défaut, le verdict du local recommandé.
    pub(super) fn pick_room<'a>(
        &'a self,
        check: Check<'a>,
        now: NaiveDateTime,
    ) -> Result<(&'a Room, ValidationResult), SchedError> {
        let candidates = self.candidate_rooms(check.service, check.staff);
        let Some(first) = candidates.first().copied() else {
            let mut errors = optimal_room(check.service, &self.spa.rooms, Some(check.staff)).errors;
            if errors.is_empty() {
                errors.push(format!("No room can host {}", check.service.name));
            }
            return Err(SchedError::Rejected(ValidationResult::rejected(errors)));
        };

        let mut fallback = None;
        for room in candidates {
            let result = self.run_check(&Check { room, ..check.clone_ids() }, now);
            if result.is_valid {
                return Ok((room, result));
            }
            if fallback.is_none() {
                fallback = Some(result);
            }
        }
        let result = fallback.unwrap_or_else(|| ValidationResult::rejected(Vec::new()));
        Ok((first, result))
    }
}

impl<'a> Check<'a> {
    fn clone_ids(&self) -> Check<'a> {
        Check {
            service: self.service,
            staff: self.staff,
            room: self.room,
            date: self.date,
            start_time: self.start_time,
            add_on_minutes: self.add_on_minutes,
            booking_group_id: self.booking_group_id.clone(),
            replaces: self.replaces.clone(),
        }
    }
}

pub(super) fn validate(
    scheduler: &Scheduler,
    draft: &BookingDraft,
    now: NaiveDateTime,
) -> Result<ValidationResult, SchedError> {
    let service = scheduler.service(&draft.service_id)?;
    let staff = scheduler.staff_member(&draft.staff_id)?;
    match &draft.room_id {
        Some(room_id) => {
            let room = scheduler.room(room_id)?;
            Ok(scheduler.run_check(&draft.check(service, staff, room), now))
        }
        None => {
            let Some(seed) = scheduler.spa.rooms.first() else {
                return Ok(ValidationResult::rejected(vec!["No rooms are configured".to_string()]));
            };
            match scheduler.pick_room(draft.check(service, staff, seed), now) {
                Ok((_, result)) => Ok(result),
                Err(SchedError::Rejected(result)) => Ok(result),
                Err(err) => Err(err),
            }
        }
    }
}

/// Créneaux réellement réservables : horaires, disponibilité, cabines et conflits.
pub(super) fn available_slots(
    scheduler: &Scheduler,
    service_id: &ServiceId,
    staff_id: &StaffId,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Result<Vec<String>, SchedError> {
    let service = scheduler.service(service_id)?;
    let staff = scheduler.staff_member(staff_id)?;
    if !staff.is_active || !staff_day_availability(staff, date).is_available {
        return Ok(Vec::new());
    }

    let rooms = scheduler.candidate_rooms(service, staff);
    let slots = generate_time_slots(
        date,
        Some(service.duration_minutes),
        true,
        now,
        &scheduler.config,
    );
    Ok(slots
        .into_iter()
        .filter(|slot| {
            rooms.iter().any(|room| {
                let check = Check {
                    service,
                    staff,
                    room,
                    date,
                    start_time: slot,
                    add_on_minutes: 0,
                    booking_group_id: None,
                    replaces: None,
                };
                scheduler.run_check(&check, now).is_valid
            })
        })
        .collect())
}

pub(super) fn available_staff<'a>(
    scheduler: &'a Scheduler,
    service_id: &ServiceId,
    date: NaiveDate,
    start_time: &str,
    now: NaiveDateTime,
) -> Result<Vec<&'a Staff>, SchedError> {
    let service = scheduler.service(service_id)?;
    Ok(scheduler
        .spa
        .staff
        .iter()
        .filter(|staff| staff.is_active && staff.can_perform(service.category))
        .filter(|staff| {
            scheduler.candidate_rooms(service, staff).into_iter().any(|room| {
                let check = Check {
                    service,
                    staff,
                    room,
                    date,
                    start_time,
                    add_on_minutes: 0,
                    booking_group_id: None,
                    replaces: None,
                };
                scheduler.run_check(&check, now).is_valid
            })
        })
        .collect())
}

/// Audit par paires des rendez-vous non annulés déjà enregistrés.
pub(super) fn audit_conflicts(scheduler: &Scheduler, include_buffer: bool) -> Vec<AuditEntry> {
    let active: Vec<&Booking> = scheduler
        .spa
        .bookings
        .iter()
        .filter(|b| !b.is_cancelled())
        .collect();

    let mut out = Vec::new();
    for (idx, a) in active.iter().enumerate() {
        let candidate = ProposedBooking::from_booking(a);
        for b in active.iter().skip(idx + 1) {
            let found = check_booking_conflicts(
                &candidate,
                slice::from_ref(*b),
                include_buffer,
                &scheduler.config,
            );
            out.extend(found.into_iter().map(|conflict| AuditEntry {
                booking: a.id.clone(),
                conflict,
            }));
        }
    }
    out
}
