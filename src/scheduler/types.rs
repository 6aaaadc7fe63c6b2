use crate::model::{BookingId, Room};
use crate::slots::TimeError;
use crate::store::CommitError;
use serde::Serialize;
use thiserror::Error;

/// Réponse « le/la praticien(ne) travaille-t-il/elle ce jour-là ? ».
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub is_available: bool,
    pub reason: Option<String>,
}

/// Verdict du contrôle de disponibilité ; `reasons` n'est jamais vide si indisponible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffAvailability {
    pub available: bool,
    pub reasons: Vec<String>,
}

impl StaffAvailability {
    pub(crate) fn available() -> Self {
        Self {
            available: true,
            reasons: Vec::new(),
        }
    }

    pub(crate) fn unavailable(reason: String) -> Self {
        Self {
            available: false,
            reasons: vec![reason],
        }
    }
}

/// Room picked by the resolver. `reason` is filled on success and on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomAssignment {
    pub room: Option<Room>,
    pub reason: String,
    pub errors: Vec<String>,
}

impl RoomAssignment {
    pub(crate) fn assigned(room: &Room, reason: String) -> Self {
        Self {
            room: Some(room.clone()),
            reason,
            errors: Vec::new(),
        }
    }

    pub(crate) fn failed(reason: String, errors: Vec<String>) -> Self {
        Self {
            room: None,
            reason,
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Staff,
    Room,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Staff => "staff",
            ConflictKind::Room => "room",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingConflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub message: String,
    /// The existing booking this one collides with.
    pub booking: BookingId,
}

/// Contrat consommé par l'interface : les erreurs bloquent, les avertissements informent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub conflicts: Vec<BookingConflict>,
}

impl ValidationResult {
    /// `is_valid` is derived here and nowhere else.
    pub fn new(
        errors: Vec<String>,
        warnings: Vec<String>,
        conflicts: Vec<BookingConflict>,
    ) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            conflicts,
        }
    }

    pub fn rejected(errors: Vec<String>) -> Self {
        Self::new(errors, Vec::new(), Vec::new())
    }
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("unknown service: {0}")]
    UnknownService(String),
    #[error("unknown staff member: {0}")]
    UnknownStaff(String),
    #[error("unknown room: {0}")]
    UnknownRoom(String),
    #[error("unknown booking: {0}")]
    UnknownBooking(String),
    #[error("unknown schedule block: {0}")]
    UnknownBlock(String),
    #[error("booking rejected: {}", .0.errors.join("; "))]
    Rejected(ValidationResult),
    #[error("invalid schedule block: {0}")]
    InvalidBlock(&'static str),
    #[error("invalid booking: {0}")]
    InvalidBooking(&'static str),
    #[error("invalid room: {0}")]
    InvalidRoom(&'static str),
    #[error(transparent)]
    Time(#[from] TimeError),
    #[error(transparent)]
    Commit(#[from] CommitError),
}
