use super::query::Check;
use super::{SchedError, Scheduler};
use crate::model::{
    BlockId, BlockKind, Booking, BookingGroupId, BookingId, BookingStatus, BookingType,
    CustomerId, Room, RoomId, ScheduleBlock, Service, ServiceId, Staff, StaffId,
};
use crate::slots::{format_time, parse_time, try_end_time};
use crate::store::{BookingStore, ScheduleBlockStore};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

/// Demande de réservation par identifiants (parcours client ou console admin).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    /// `None` lets the resolver pick a room.
    pub room_id: Option<RoomId>,
    pub customer_id: CustomerId,
    pub date: NaiveDate,
    pub start_time: String,
    pub add_on_minutes: u32,
}

impl BookingDraft {
    pub(super) fn check<'a>(
        &'a self,
        service: &'a Service,
        staff: &'a Staff,
        room: &'a Room,
    ) -> Check<'a> {
        Check {
            service,
            staff,
            room,
            date: self.date,
            start_time: &self.start_time,
            add_on_minutes: self.add_on_minutes,
            booking_group_id: None,
            replaces: None,
        }
    }
}

/// Deux soins simultanés dans la même cabine, un(e) praticien(ne) par client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouplesDraft {
    pub service_id: ServiceId,
    pub staff_ids: [StaffId; 2],
    pub customer_ids: [CustomerId; 2],
    pub room_id: Option<RoomId>,
    pub date: NaiveDate,
    pub start_time: String,
}

/// Client sans rendez-vous : la séance commence maintenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkInDraft {
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub room_id: Option<RoomId>,
    pub customer_id: CustomerId,
    pub add_on_minutes: u32,
}

fn reject(result: super::ValidationResult) -> SchedError {
    warn!(errors = ?result.errors, "booking rejected by validation");
    SchedError::Rejected(result)
}

/// Validates then builds the booking; nothing is written.
fn prepare(
    scheduler: &Scheduler,
    draft: &BookingDraft,
    booking_type: BookingType,
    now: NaiveDateTime,
) -> Result<Booking, SchedError> {
    let service = scheduler.service(&draft.service_id)?;
    let staff = scheduler.staff_member(&draft.staff_id)?;
    let (room, result) = match &draft.room_id {
        Some(room_id) => {
            let room = scheduler.room(room_id)?;
            (room, scheduler.run_check(&draft.check(service, staff, room), now))
        }
        None => {
            let seed = scheduler
                .spa
                .rooms
                .first()
                .ok_or(SchedError::InvalidBooking("no rooms are configured"))?;
            scheduler.pick_room(draft.check(service, staff, seed), now)?
        }
    };
    if !result.is_valid {
        return Err(reject(result));
    }

    let start = parse_time(&draft.start_time)?;
    let minutes = i64::from(service.duration_minutes) + i64::from(draft.add_on_minutes);
    let end = try_end_time(start, minutes)?;
    Ok(Booking {
        id: BookingId::random(),
        service_id: service.id.clone(),
        staff_id: staff.id.clone(),
        room_id: room.id.clone(),
        customer_id: draft.customer_id.clone(),
        appointment_date: draft.date,
        start_time: start,
        end_time: end,
        status: BookingStatus::Confirmed,
        booking_type,
        booking_group_id: None,
    })
}

fn commit(scheduler: &mut Scheduler, booking: Booking) -> Result<BookingId, SchedError> {
    let summary = format!(
        "{} {}-{}",
        booking.appointment_date,
        format_time(booking.start_time),
        format_time(booking.end_time)
    );
    match scheduler.spa.commit_booking(booking) {
        Ok(id) => {
            info!(booking = %id, slot = %summary, "booking committed");
            Ok(id)
        }
        Err(err) => {
            warn!(error = %err, slot = %summary, "commit rejected by store");
            Err(err.into())
        }
    }
}

pub(super) fn book(
    scheduler: &mut Scheduler,
    draft: &BookingDraft,
    now: NaiveDateTime,
) -> Result<BookingId, SchedError> {
    let booking = prepare(scheduler, draft, BookingType::Single, now)?;
    commit(scheduler, booking)
}

pub(super) fn walk_in(
    scheduler: &mut Scheduler,
    draft: &WalkInDraft,
    now: NaiveDateTime,
) -> Result<BookingId, SchedError> {
    let draft = BookingDraft {
        service_id: draft.service_id.clone(),
        staff_id: draft.staff_id.clone(),
        room_id: draft.room_id.clone(),
        customer_id: draft.customer_id.clone(),
        date: now.date(),
        start_time: format_time(now.time()),
        add_on_minutes: draft.add_on_minutes,
    };
    let booking = prepare(scheduler, &draft, BookingType::WalkIn, now)?;
    commit(scheduler, booking)
}

pub(super) fn book_couples(
    scheduler: &mut Scheduler,
    draft: &CouplesDraft,
    now: NaiveDateTime,
) -> Result<(BookingId, BookingId), SchedError> {
    let group = BookingGroupId::random();
    let pair = {
        let service = scheduler.service(&draft.service_id)?;
        if !service.is_couples_service {
            return Err(SchedError::InvalidBooking("service is not a couples service"));
        }
        if draft.staff_ids[0] == draft.staff_ids[1] {
            return Err(SchedError::InvalidBooking(
                "couples bookings need two different staff members",
            ));
        }
        let room = match &draft.room_id {
            Some(id) => scheduler.room(id)?,
            None => {
                let assignment = super::optimal_room(service, &scheduler.spa.rooms, None);
                let Some(picked) = assignment.room else {
                    return Err(reject(super::ValidationResult::rejected(assignment.errors)));
                };
                scheduler.room(&picked.id)?
            }
        };
        let start = parse_time(&draft.start_time)?;
        let end = try_end_time(start, i64::from(service.duration_minutes))?;

        let mut pair = Vec::with_capacity(2);
        for (staff_id, customer_id) in draft.staff_ids.iter().zip(draft.customer_ids.iter()) {
            let staff = scheduler.staff_member(staff_id)?;
            let check = Check {
                service,
                staff,
                room,
                date: draft.date,
                start_time: &draft.start_time,
                add_on_minutes: 0,
                booking_group_id: Some(group.clone()),
                replaces: None,
            };
            let result = scheduler.run_check(&check, now);
            if !result.is_valid {
                return Err(reject(result));
            }
            pair.push(Booking {
                id: BookingId::random(),
                service_id: service.id.clone(),
                staff_id: staff.id.clone(),
                room_id: room.id.clone(),
                customer_id: customer_id.clone(),
                appointment_date: draft.date,
                start_time: start,
                end_time: end,
                status: BookingStatus::Confirmed,
                booking_type: BookingType::Couple,
                booking_group_id: Some(group.clone()),
            });
        }
        pair
    };

    let mut ids = Vec::with_capacity(2);
    for booking in pair {
        match commit(scheduler, booking) {
            Ok(id) => ids.push(id),
            Err(err) => {
                // rollback de la première moitié
                scheduler.spa.bookings.retain(|b| !ids.contains(&b.id));
                return Err(err);
            }
        }
    }
    match <[BookingId; 2]>::try_from(ids) {
        Ok([a, b]) => Ok((a, b)),
        Err(_) => Err(SchedError::InvalidBooking("couples booking incomplete")),
    }
}

fn live_booking(scheduler: &Scheduler, booking_id: &BookingId) -> Result<Booking, SchedError> {
    let booking = scheduler
        .spa
        .find_booking(booking_id)
        .ok_or_else(|| SchedError::UnknownBooking(booking_id.to_string()))?;
    if booking.is_cancelled() {
        return Err(SchedError::InvalidBooking("booking is cancelled"));
    }
    Ok(booking.clone())
}

/// `booking` suivi des autres moitiés actives de son groupe duo.
fn with_partners(scheduler: &Scheduler, booking: Booking) -> Vec<Booking> {
    let partners: Vec<Booking> = match &booking.booking_group_id {
        Some(group) => scheduler
            .spa
            .bookings
            .iter()
            .filter(|b| b.id != booking.id && !b.is_cancelled())
            .filter(|b| b.booking_group_id.as_ref() == Some(group))
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    std::iter::once(booking).chain(partners).collect()
}

/// Replays validation for an edited copy of `original`; nothing is written.
fn revised(
    scheduler: &Scheduler,
    original: &Booking,
    now: NaiveDateTime,
    edit: impl FnOnce(&mut Booking),
) -> Result<Booking, SchedError> {
    let mut updated = original.clone();
    edit(&mut updated);

    let service = scheduler.service(&updated.service_id)?;
    let staff = scheduler.staff_member(&updated.staff_id)?;
    let room = scheduler.room(&updated.room_id)?;
    // conserve la durée des options ajoutées au rendez-vous d'origine
    let booked = u32::try_from(original.duration_minutes()).unwrap_or(0);
    let add_on_minutes = booked.saturating_sub(service.duration_minutes);
    let start_time = format_time(updated.start_time);
    let check = Check {
        service,
        staff,
        room,
        date: updated.appointment_date,
        start_time: &start_time,
        add_on_minutes,
        booking_group_id: updated.booking_group_id.clone(),
        replaces: Some(updated.id.clone()),
    };
    let result = scheduler.run_check(&check, now);
    if !result.is_valid {
        return Err(reject(result));
    }
    updated.end_time = try_end_time(
        updated.start_time,
        i64::from(service.duration_minutes) + i64::from(add_on_minutes),
    )?;
    Ok(updated)
}

/// Writes every revision or none: a store refusal restores the halves
/// already written.
fn store_all(
    scheduler: &mut Scheduler,
    updated: Vec<Booking>,
    originals: &[Booking],
) -> Result<(), SchedError> {
    for (written, booking) in updated.into_iter().enumerate() {
        let id = booking.id.clone();
        if let Err(err) = scheduler.spa.update_booking(booking) {
            warn!(booking = %id, error = %err, "update rejected by store");
            for original in &originals[..written] {
                if let Some(slot) = scheduler.spa.bookings.iter_mut().find(|b| b.id == original.id) {
                    *slot = original.clone();
                }
            }
            return Err(err.into());
        }
        info!(booking = %id, "booking updated");
    }
    Ok(())
}

/// Les deux moitiés d'un duo se déplacent ensemble.
pub(super) fn reschedule(
    scheduler: &mut Scheduler,
    booking_id: &BookingId,
    date: NaiveDate,
    start_time: &str,
    now: NaiveDateTime,
) -> Result<(), SchedError> {
    let start = parse_time(start_time)?;
    let originals = with_partners(scheduler, live_booking(scheduler, booking_id)?);
    let updated = originals
        .iter()
        .map(|original| {
            revised(scheduler, original, now, |b| {
                b.appointment_date = date;
                b.start_time = start;
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    store_all(scheduler, updated, &originals)
}

pub(super) fn reassign(
    scheduler: &mut Scheduler,
    booking_id: &BookingId,
    staff_id: &StaffId,
    now: NaiveDateTime,
) -> Result<(), SchedError> {
    scheduler.staff_member(staff_id)?;
    let original = live_booking(scheduler, booking_id)?;
    let updated = revised(scheduler, &original, now, |b| b.staff_id = staff_id.clone())?;
    store_all(scheduler, vec![updated], &[original])
}

/// Annuler une moitié d'un duo annule aussi l'autre.
pub(super) fn cancel(scheduler: &mut Scheduler, booking_id: &BookingId) -> Result<(), SchedError> {
    let booking = scheduler
        .spa
        .find_booking(booking_id)
        .cloned()
        .ok_or_else(|| SchedError::UnknownBooking(booking_id.to_string()))?;
    for mut booking in with_partners(scheduler, booking) {
        booking.status = BookingStatus::Cancelled;
        let id = booking.id.clone();
        scheduler.spa.update_booking(booking)?;
        info!(booking = %id, "booking cancelled");
    }
    Ok(())
}

pub(super) fn block_time(
    scheduler: &mut Scheduler,
    block: ScheduleBlock,
) -> Result<BlockId, SchedError> {
    scheduler.staff_member(&block.staff_id)?;
    if block.last_date() < block.start_date {
        return Err(SchedError::InvalidBlock("end date before start date"));
    }
    if let BlockKind::TimeRange {
        start_time,
        end_time,
    } = &block.kind
    {
        if end_time <= start_time {
            return Err(SchedError::InvalidBlock("time range must end after it starts"));
        }
    }
    let staff = block.staff_id.clone();
    let id = scheduler.spa.add_block(block);
    info!(block = %id, staff = %staff, "schedule block added");
    Ok(id)
}

pub(super) fn remove_block(
    scheduler: &mut Scheduler,
    block_id: &BlockId,
) -> Result<ScheduleBlock, SchedError> {
    let removed = scheduler
        .spa
        .remove_block(block_id)
        .ok_or_else(|| SchedError::UnknownBlock(block_id.to_string()))?;
    info!(block = %block_id, "schedule block removed");
    Ok(removed)
}
