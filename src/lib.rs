#![forbid(unsafe_code)]
//! Medspa : moteur de planification pour la réservation d'un spa médical.
//!
//! - Créneaux et horaires d'ouverture configurables.
//! - Disponibilité des praticien(ne)s, blocages de planning.
//! - Attribution des cabines (body scrub, soins en duo).
//! - Détection de conflits avec temps de battement, validation des demandes.
//! - Stockage fichier (JSON/CSV) ; le magasin rejette lui-même les chevauchements.

pub mod config;
pub mod io;
pub mod model;
pub mod scheduler;
pub mod slots;
pub mod storage;
pub mod store;

pub use config::SchedulingConfig;
pub use model::{
    BlockId, BlockKind, Booking, BookingGroupId, BookingId, BookingStatus, BookingType,
    CustomerId, DailyHours, Room, RoomId, ScheduleBlock, Service, ServiceCategory, ServiceId, Spa,
    Staff, StaffId, StaffStatus,
};
pub use scheduler::{
    check_booking_conflicts, check_staff_availability, optimal_room, staff_day_availability,
    validate_booking_request, BookingConflict, BookingDraft, BookingRequest, ConflictKind,
    CouplesDraft, ProposedBooking, RoomAssignment, SchedError, Scheduler, StaffAvailability,
    ValidationContext, ValidationResult, WalkInDraft,
};
pub use slots::{calculate_end_time, can_accommodate_service, generate_time_slots, TimeError};
pub use storage::{JsonStorage, Storage};
pub use store::{BookingStore, CommitError, ConflictCriteria, ScheduleBlockStore};
