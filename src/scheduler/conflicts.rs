use super::{util, BookingConflict, ConflictKind};
use crate::config::SchedulingConfig;
use crate::model::{Booking, BookingGroupId, BookingId, RoomId, StaffId};
use crate::slots::format_time;
use chrono::{NaiveDate, NaiveTime};

/// Créneau candidat soumis à la détection de conflits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedBooking {
    pub staff_id: StaffId,
    pub room_id: RoomId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Couples partner bookings share the room legitimately.
    pub booking_group_id: Option<BookingGroupId>,
    /// Existing booking being moved; never conflicts with itself.
    pub replaces: Option<BookingId>,
}

impl ProposedBooking {
    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            staff_id: booking.staff_id.clone(),
            room_id: booking.room_id.clone(),
            date: booking.appointment_date,
            start: booking.start_time,
            end: booking.end_time,
            booking_group_id: booking.booking_group_id.clone(),
            replaces: Some(booking.id.clone()),
        }
    }
}

/// Both intervals grow by `buffer_minutes` on each side; touching edges conflict.
pub fn intervals_conflict(
    a: (NaiveTime, NaiveTime),
    b: (NaiveTime, NaiveTime),
    buffer_minutes: u32,
) -> bool {
    let pad = i64::from(buffer_minutes);
    let (a_start, a_end) = util::span(a.0, a.1);
    let (b_start, b_end) = util::span(b.0, b.1);
    util::overlaps_inclusive(a_start - pad, a_end + pad, b_start - pad, b_end + pad)
}

fn same_group(candidate: &ProposedBooking, existing: &Booking) -> bool {
    matches!(
        (&candidate.booking_group_id, &existing.booking_group_id),
        (Some(a), Some(b)) if a == b
    )
}

/// Staff and room conflicts are additive: one existing booking can yield both.
pub fn check_booking_conflicts(
    candidate: &ProposedBooking,
    existing: &[Booking],
    include_buffer: bool,
    config: &SchedulingConfig,
) -> Vec<BookingConflict> {
    let buffer = if include_buffer { config.buffer_minutes } else { 0 };
    let mut out = Vec::new();

    for booking in existing {
        if booking.is_cancelled()
            || booking.appointment_date != candidate.date
            || candidate.replaces.as_ref() == Some(&booking.id)
        {
            continue;
        }
        if !intervals_conflict(
            (candidate.start, candidate.end),
            (booking.start_time, booking.end_time),
            buffer,
        ) {
            continue;
        }

        let range = format!(
            "{}-{}",
            format_time(booking.start_time),
            format_time(booking.end_time)
        );
        if booking.staff_id == candidate.staff_id {
            out.push(BookingConflict {
                kind: ConflictKind::Staff,
                message: format!(
                    "Staff member is already booked {range} on {} (booking {})",
                    booking.appointment_date, booking.id
                ),
                booking: booking.id.clone(),
            });
        }
        if booking.room_id == candidate.room_id && !same_group(candidate, booking) {
            out.push(BookingConflict {
                kind: ConflictKind::Room,
                message: format!(
                    "Room is already occupied {range} on {} (booking {})",
                    booking.appointment_date, booking.id
                ),
                booking: booking.id.clone(),
            });
        }
    }

    out
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

    fn existing(staff: &str, room: &str, start: NaiveTime, end: NaiveTime) -> Booking {
        Booking {
            id: BookingId::random(),
            service_id: ServiceId::new("facial"),
            staff_id: StaffId::new(staff),
            room_id: RoomId::new(room),
            customer_id: CustomerId::new("c"),
            appointment_date: day(),
            start_time: start,
            end_time: end,
            status: BookingStatus::Confirmed,
            booking_type: BookingType::Single,
            booking_group_id: None,
        }
    }

    fn candidate(staff: &str, room: &str, start: NaiveTime, end: NaiveTime) -> ProposedBooking {
        ProposedBooking {
            staff_id: StaffId::new(staff),
            room_id: RoomId::new(room),
            date: day(),
            start,
            end,
            booking_group_id: None,
            replaces: None,
        }
    }

    #[test]
    fn back_to_back_conflicts_only_with_buffer() {
        let cfg = SchedulingConfig::default();
        let ex = vec![existing("x", "r1", t(10, 0), t(10, 30))];
        let next = candidate("x", "r2", t(10, 30), t(11, 0));
        assert_eq!(check_booking_conflicts(&next, &ex, true, &cfg).len(), 1);
        // sans buffer, les bornes qui se touchent restent un conflit
        assert_eq!(check_booking_conflicts(&next, &ex, false, &cfg).len(), 1);
        let later = candidate("x", "r2", t(10, 45), t(11, 15));
        assert!(check_booking_conflicts(&later, &ex, false, &cfg).is_empty());
        assert_eq!(check_booking_conflicts(&later, &ex, true, &cfg).len(), 1);
    }

    #[test]
    fn other_dates_and_cancelled_are_ignored() {
        let cfg = SchedulingConfig::default();
        let mut cancelled = existing("x", "r1", t(10, 0), t(11, 0));
        cancelled.status = BookingStatus::Cancelled;
        let mut tomorrow = existing("x", "r1", t(10, 0), t(11, 0));
        tomorrow.appointment_date = day().succ_opt().unwrap();
        let c = candidate("x", "r1", t(10, 0), t(11, 0));
        assert!(check_booking_conflicts(&c, &[cancelled, tomorrow], true, &cfg).is_empty());
    }

    #[test]
    fn moved_booking_ignores_itself() {
        let cfg = SchedulingConfig::default();
        let b = existing("x", "r1", t(10, 0), t(11, 0));
        let mut moved = ProposedBooking::from_booking(&b);
        moved.start = t(10, 30);
        moved.end = t(11, 30);
        assert!(check_booking_conflicts(&moved, &[b], true, &cfg).is_empty());
    }

    #[test]
    fn couples_partner_shares_room() {
        let cfg = SchedulingConfig::default();
        let group = BookingGroupId::random();
        let mut partner = existing("y", "r3", t(10, 0), t(11, 0));
        partner.booking_group_id = Some(group.clone());
        let mut c = candidate("x", "r3", t(10, 0), t(11, 0));
        c.booking_group_id = Some(group);
        assert!(check_booking_conflicts(&c, &[partner], true, &cfg).is_empty());
    }

    #[test]
    fn message_names_the_time_range() {
        let cfg = SchedulingConfig::default();
        let ex = vec![existing("x", "r1", t(10, 0), t(10, 30))];
        let out = check_booking_conflicts(&candidate("x", "r1", t(10, 15), t(11, 15)), &ex, true, &cfg);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.message.contains("10:00-10:30")));
        assert_eq!(out[0].booking, ex[0].id);
    }
}
