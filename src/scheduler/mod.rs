mod availability;
mod conflicts;
mod mutate;
mod query;
mod rooms;
mod types;
mod util;
mod validate;

pub use availability::{check_staff_availability, staff_day_availability, working_window};
pub use conflicts::{check_booking_conflicts, intervals_conflict, ProposedBooking};
pub use mutate::{BookingDraft, CouplesDraft, WalkInDraft};
pub use query::AuditEntry;
pub use rooms::optimal_room;
pub use types::{
    BookingConflict, ConflictKind, DayAvailability, RoomAssignment, SchedError,
    StaffAvailability, ValidationResult,
};
pub use validate::{validate_booking_request, BookingRequest, ValidationContext};

use crate::config::SchedulingConfig;
use crate::model::{
    BlockId, BookingId, Room, ScheduleBlock, Service, ServiceId, Spa, Staff, StaffId,
};
use chrono::{NaiveDate, NaiveDateTime};

/// Scheduler : encapsule le catalogue du spa et la configuration horaire.
///
/// Every time-dependent operation takes `now` explicitly.
#[derive(Debug, Default)]
pub struct Scheduler {
    spa: Spa,
    config: SchedulingConfig,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(spa: Spa, config: SchedulingConfig) -> Self {
        Self { spa, config }
    }

    pub fn spa(&self) -> &Spa {
        &self.spa
    }
    pub fn spa_mut(&mut self) -> &mut Spa {
        &mut self.spa
    }
    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    pub fn add_services(&mut self, services: Vec<Service>) {
        self.spa.services.extend(services);
    }
    pub fn add_staff(&mut self, staff: Vec<Staff>) {
        self.spa.staff.extend(staff);
    }
    /// Refuse tout le lot si la spa se retrouverait avec deux cabines gommage.
    pub fn add_rooms(&mut self, rooms: Vec<Room>) -> Result<(), SchedError> {
        let equipped = self
            .spa
            .rooms
            .iter()
            .chain(&rooms)
            .filter(|r| r.body_scrub_equipped)
            .count();
        if equipped > 1 {
            return Err(SchedError::InvalidRoom("only one room can be body scrub equipped"));
        }
        self.spa.rooms.extend(rooms);
        Ok(())
    }

    /// Dry run of [`Scheduler::book`].
    pub fn validate(
        &self,
        draft: &BookingDraft,
        now: NaiveDateTime,
    ) -> Result<ValidationResult, SchedError> {
        query::validate(self, draft, now)
    }

    pub fn available_slots(
        &self,
        service_id: &ServiceId,
        staff_id: &StaffId,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<String>, SchedError> {
        query::available_slots(self, service_id, staff_id, date, now)
    }

    pub fn available_staff(
        &self,
        service_id: &ServiceId,
        date: NaiveDate,
        start_time: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<&Staff>, SchedError> {
        query::available_staff(self, service_id, date, start_time, now)
    }

    pub fn audit_conflicts(&self, include_buffer: bool) -> Vec<AuditEntry> {
        query::audit_conflicts(self, include_buffer)
    }

    pub fn book(&mut self, draft: &BookingDraft, now: NaiveDateTime) -> Result<BookingId, SchedError> {
        mutate::book(self, draft, now)
    }

    pub fn book_couples(
        &mut self,
        draft: &CouplesDraft,
        now: NaiveDateTime,
    ) -> Result<(BookingId, BookingId), SchedError> {
        mutate::book_couples(self, draft, now)
    }

    pub fn walk_in(&mut self, draft: &WalkInDraft, now: NaiveDateTime) -> Result<BookingId, SchedError> {
        mutate::walk_in(self, draft, now)
    }

    pub fn reschedule(
        &mut self,
        booking_id: &BookingId,
        date: NaiveDate,
        start_time: &str,
        now: NaiveDateTime,
    ) -> Result<(), SchedError> {
        mutate::reschedule(self, booking_id, date, start_time, now)
    }

    pub fn reassign(
        &mut self,
        booking_id: &BookingId,
        staff_id: &StaffId,
        now: NaiveDateTime,
    ) -> Result<(), SchedError> {
        mutate::reassign(self, booking_id, staff_id, now)
    }

    pub fn cancel(&mut self, booking_id: &BookingId) -> Result<(), SchedError> {
        mutate::cancel(self, booking_id)
    }

    pub fn block_time(&mut self, block: ScheduleBlock) -> Result<BlockId, SchedError> {
        mutate::block_time(self, block)
    }

    pub fn remove_block(&mut self, block_id: &BlockId) -> Result<ScheduleBlock, SchedError> {
        mutate::remove_block(self, block_id)
    }
}
