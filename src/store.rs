//! Stores consultés par le planificateur, implémentés en mémoire par [`Spa`].
//!
//! The validator is a pre-filter working on a snapshot. `commit_booking` and
//! `update_booking` re-check overlaps at write time and are the final arbiter,
//! the way a range-exclusion constraint would be in a database.

use crate::model::{
    Booking, BookingGroupId, BookingId, BlockId, RoomId, ScheduleBlock, Spa, StaffId,
};
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("staff member {staff} is already booked at that time (booking {existing})")]
    StaffOverlap { staff: StaffId, existing: BookingId },
    #[error("room {room} is already occupied at that time (booking {existing})")]
    RoomOverlap { room: RoomId, existing: BookingId },
    #[error("booking {0} already exists")]
    Duplicate(BookingId),
    #[error("unknown booking: {0}")]
    UnknownBooking(BookingId),
    #[error("booking {0} must end after it starts")]
    InvalidTimeRange(BookingId),
}

/// Critères de présélection des rendez-vous pour la détection de conflits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictCriteria {
    pub date: NaiveDate,
    pub staff_id: Option<StaffId>,
    pub room_id: Option<RoomId>,
}

impl ConflictCriteria {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date,
            staff_id: None,
            room_id: None,
        }
    }

    pub fn staff(mut self, id: &StaffId) -> Self {
        self.staff_id = Some(id.clone());
        self
    }

    pub fn room(mut self, id: &RoomId) -> Self {
        self.room_id = Some(id.clone());
        self
    }

    /// Non-cancelled, same date, and matching the staff member or the room
    /// when either is given.
    pub fn matches(&self, booking: &Booking) -> bool {
        if booking.is_cancelled() || booking.appointment_date != self.date {
            return false;
        }
        match (&self.staff_id, &self.room_id) {
            (None, None) => true,
            (staff, room) => {
                staff.as_ref() == Some(&booking.staff_id) || room.as_ref() == Some(&booking.room_id)
            }
        }
    }
}

pub trait ScheduleBlockStore {
    /// Blocks of `staff_id` whose date range contains `date`.
    fn schedule_blocks(&self, staff_id: &StaffId, date: NaiveDate) -> Vec<ScheduleBlock>;
    fn add_block(&mut self, block: ScheduleBlock) -> BlockId;
    fn remove_block(&mut self, id: &BlockId) -> Option<ScheduleBlock>;
}

pub trait BookingStore {
    fn bookings_for_conflict_check(&self, criteria: &ConflictCriteria) -> Vec<Booking>;
    fn find_booking(&self, id: &BookingId) -> Option<&Booking>;
    /// Atomic create; rejects any overlap for the same staff member or room.
    fn commit_booking(&mut self, booking: Booking) -> Result<BookingId, CommitError>;
    /// Replaces a stored booking, re-checking overlaps against every other one.
    fn update_booking(&mut self, booking: Booking) -> Result<(), CommitError>;
}

fn overlaps_strict(a: (NaiveTime, NaiveTime), b: (NaiveTime, NaiveTime)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

fn same_group(a: &Option<BookingGroupId>, b: &Option<BookingGroupId>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// Half-open ranges, no buffer: back-to-back bookings are legal at this level.
fn exclusion_check(bookings: &[Booking], candidate: &Booking) -> Result<(), CommitError> {
    if candidate.end_time <= candidate.start_time {
        return Err(CommitError::InvalidTimeRange(candidate.id.clone()));
    }
    if candidate.is_cancelled() {
        return Ok(());
    }
    let span = (candidate.start_time, candidate.end_time);
    for other in bookings.iter().filter(|b| {
        b.id != candidate.id && !b.is_cancelled() && b.appointment_date == candidate.appointment_date
    }) {
        if !overlaps_strict(span, (other.start_time, other.end_time)) {
            continue;
        }
        if other.staff_id == candidate.staff_id {
            return Err(CommitError::StaffOverlap {
                staff: candidate.staff_id.clone(),
                existing: other.id.clone(),
            });
        }
        if other.room_id == candidate.room_id
            && !same_group(&other.booking_group_id, &candidate.booking_group_id)
        {
            return Err(CommitError::RoomOverlap {
                room: candidate.room_id.clone(),
                existing: other.id.clone(),
            });
        }
    }
    Ok(())
}

impl ScheduleBlockStore for Spa {
    fn schedule_blocks(&self, staff_id: &StaffId, date: NaiveDate) -> Vec<ScheduleBlock> {
        self.blocks
            .iter()
            .filter(|b| &b.staff_id == staff_id && b.covers(date))
            .cloned()
            .collect()
    }

    fn add_block(&mut self, block: ScheduleBlock) -> BlockId {
        let id = block.id.clone();
        self.blocks.push(block);
        id
    }

    fn remove_block(&mut self, id: &BlockId) -> Option<ScheduleBlock> {
        let pos = self.blocks.iter().position(|b| &b.id == id)?;
        Some(self.blocks.remove(pos))
    }
}

impl BookingStore for Spa {
    fn bookings_for_conflict_check(&self, criteria: &ConflictCriteria) -> Vec<Booking> {
        self.bookings
            .iter()
            .filter(|b| criteria.matches(b))
            .cloned()
            .collect()
    }

    fn find_booking(&self, id: &BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| &b.id == id)
    }

    fn commit_booking(&mut self, booking: Booking) -> Result<BookingId, CommitError> {
        if self.find_booking(&booking.id).is_some() {
            return Err(CommitError::Duplicate(booking.id));
        }
        exclusion_check(&self.bookings, &booking)?;
        let id = booking.id.clone();
        self.bookings.push(booking);
        Ok(id)
    }

    fn update_booking(&mut self, booking: Booking) -> Result<(), CommitError> {
        let Some(pos) = self.bookings.iter().position(|b| b.id == booking.id) else {
            return Err(CommitError::UnknownBooking(booking.id));
        };
        exclusion_check(&self.bookings, &booking)?;
        self.bookings[pos] = booking;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookingStatus, BookingType, CustomerId, ServiceId};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn booking(staff: &str, room: &str, start: NaiveTime, end: NaiveTime) -> Booking {
        Booking {
            id: BookingId::random(),
            service_id: ServiceId::new("svc"),
            staff_id: StaffId::new(staff),
            room_id: RoomId::new(room),
            customer_id: CustomerId::new("cust"),
            appointment_date: day(),
            start_time: start,
            end_time: end,
            status: BookingStatus::Confirmed,
            booking_type: BookingType::Single,
            booking_group_id: None,
        }
    }

    #[test]
    fn commit_rejects_overlaps_but_allows_back_to_back() {
        let mut spa = Spa::default();
        spa.commit_booking(booking("x", "r1", t(10, 0), t(11, 0))).unwrap();
        let err = spa
            .commit_booking(booking("x", "r2", t(10, 30), t(11, 30)))
            .unwrap_err();
        assert!(matches!(err, CommitError::StaffOverlap { .. }));
        let err = spa
            .commit_booking(booking("y", "r1", t(10, 30), t(11, 30)))
            .unwrap_err();
        assert!(matches!(err, CommitError::RoomOverlap { .. }));
        spa.commit_booking(booking("x", "r1", t(11, 0), t(12, 0))).unwrap();
        assert_eq!(spa.bookings.len(), 2);
    }

    #[test]
    fn couples_group_shares_a_room() {
        let mut spa = Spa::default();
        let group = BookingGroupId::random();
        let mut a = booking("x", "r3", t(10, 0), t(11, 0));
        a.booking_group_id = Some(group.clone());
        let mut b = booking("y", "r3", t(10, 0), t(11, 0));
        b.booking_group_id = Some(group);
        spa.commit_booking(a).unwrap();
        spa.commit_booking(b).unwrap();
    }

    #[test]
    fn update_ignores_itself_and_cancelled() {
        let mut spa = Spa::default();
        let mut first = booking("x", "r1", t(10, 0), t(11, 0));
        spa.commit_booking(first.clone()).unwrap();
        first.start_time = t(10, 30);
        first.end_time = t(11, 30);
        spa.update_booking(first.clone()).unwrap();

        first.status = BookingStatus::Cancelled;
        spa.update_booking(first).unwrap();
        spa.commit_booking(booking("x", "r1", t(10, 30), t(11, 30))).unwrap();
    }

    #[test]
    fn criteria_select_staff_or_room() {
        let mut spa = Spa::default();
        spa.commit_booking(booking("x", "r1", t(10, 0), t(11, 0))).unwrap();
        spa.commit_booking(booking("y", "r2", t(10, 0), t(11, 0))).unwrap();
        spa.commit_booking(booking("z", "r3", t(10, 0), t(11, 0))).unwrap();
        let criteria = ConflictCriteria::on(day()).staff(&StaffId::new("x")).room(&RoomId::new("r2"));
        assert_eq!(spa.bookings_for_conflict_check(&criteria).len(), 2);
        assert_eq!(spa.bookings_for_conflict_check(&ConflictCriteria::on(day())).len(), 3);
    }

    #[test]
    fn blocks_filtered_by_staff_and_range() {
        let mut spa = Spa::default();
        let staff = StaffId::new("x");
        let week = ScheduleBlock::full_day(staff.clone(), day(), Some(day() + chrono::Duration::days(6)));
        let id = spa.add_block(week);
        assert_eq!(spa.schedule_blocks(&staff, day() + chrono::Duration::days(3)).len(), 1);
        assert!(spa.schedule_blocks(&StaffId::new("y"), day()).is_empty());
        assert!(spa.remove_block(&id).is_some());
        assert!(spa.schedule_blocks(&staff, day()).is_empty());
    }
}
