use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: AsRef<str>>(s: S) -> Self {
                Self(s.as_ref().to_owned())
            }
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifiant fort pour Service
    ServiceId
);
string_id!(
    /// Identifiant fort pour Staff
    StaffId
);
string_id!(
    /// Identifiant fort pour Room
    RoomId
);
string_id!(CustomerId);
string_id!(BookingId);
string_id!(BlockId);
string_id!(
    /// Shared by the two halves of a couples booking.
    BookingGroupId
);

/// Catégorie de prestation. Closed set: category-specific rules match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Facial,
    Massage,
    BodyTreatment,
    BodyScrub,
    Waxing,
    Package,
    Membership,
    Consultation,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 8] = [
        ServiceCategory::Facial,
        ServiceCategory::Massage,
        ServiceCategory::BodyTreatment,
        ServiceCategory::BodyScrub,
        ServiceCategory::Waxing,
        ServiceCategory::Package,
        ServiceCategory::Membership,
        ServiceCategory::Consultation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Facial => "facial",
            ServiceCategory::Massage => "massage",
            ServiceCategory::BodyTreatment => "body_treatment",
            ServiceCategory::BodyScrub => "body_scrub",
            ServiceCategory::Waxing => "waxing",
            ServiceCategory::Package => "package",
            ServiceCategory::Membership => "membership",
            ServiceCategory::Consultation => "consultation",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        ServiceCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown service category: {s}"))
    }
}

fn yes() -> bool {
    true
}

/// Prestation proposée à la réservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub category: ServiceCategory,
    pub duration_minutes: u32,
    pub price: Decimal,
    /// Needs the body-scrub equipped room.
    #[serde(default)]
    pub requires_room_3: bool,
    #[serde(default)]
    pub is_couples_service: bool,
    #[serde(default = "yes")]
    pub is_active: bool,
}

impl Service {
    /// Crée une prestation en validant durée et prix.
    pub fn new<N: Into<String>>(
        name: N,
        category: ServiceCategory,
        duration_minutes: u32,
        price: Decimal,
    ) -> Result<Self, String> {
        if duration_minutes == 0 {
            return Err("service duration must be positive".to_string());
        }
        if price.is_sign_negative() {
            return Err("service price cannot be negative".to_string());
        }
        Ok(Self {
            id: ServiceId::random(),
            name: name.into(),
            category,
            duration_minutes,
            price,
            requires_room_3: category == ServiceCategory::BodyScrub,
            is_couples_service: false,
            is_active: true,
        })
    }

    pub fn couples(mut self) -> Self {
        self.is_couples_service = true;
        self
    }

    pub fn needs_body_scrub_room(&self) -> bool {
        self.requires_room_3 || self.category == ServiceCategory::BodyScrub
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffStatus {
    #[default]
    Working,
    OnCall,
    Off,
}

/// Working window for one weekday (Sunday = 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyHours {
    pub weekday: u8,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Praticien(ne)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub name: String,
    #[serde(default)]
    pub capabilities: BTreeSet<ServiceCategory>,
    /// Weekday indexes, Sunday = 0.
    #[serde(default)]
    pub work_days: BTreeSet<u8>,
    #[serde(default)]
    pub default_room_id: Option<RoomId>,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub current_status: StaffStatus,
    /// Only consulted while `current_status` is on call.
    #[serde(default)]
    pub default_advance_notice_hours: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hours: Vec<DailyHours>,
}

impl Staff {
    pub fn new<N: Into<String>>(
        name: N,
        capabilities: impl IntoIterator<Item = ServiceCategory>,
        work_days: impl IntoIterator<Item = u8>,
    ) -> Self {
        Self {
            id: StaffId::random(),
            name: name.into(),
            capabilities: capabilities.into_iter().collect(),
            work_days: work_days.into_iter().filter(|d| *d < 7).collect(),
            default_room_id: None,
            is_active: true,
            current_status: StaffStatus::Working,
            default_advance_notice_hours: 0,
            hours: Vec::new(),
        }
    }

    pub fn can_perform(&self, category: ServiceCategory) -> bool {
        self.capabilities.contains(&category)
    }

    pub fn works_on(&self, weekday: u8) -> bool {
        self.work_days.contains(&weekday)
    }

    pub fn hours_on(&self, weekday: u8) -> Option<&DailyHours> {
        self.hours.iter().find(|h| h.weekday == weekday)
    }
}

/// Cabine de soin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,
    /// Empty set accepts every category.
    #[serde(default)]
    pub capabilities: BTreeSet<ServiceCategory>,
    #[serde(default)]
    pub body_scrub_equipped: bool,
    #[serde(default = "yes")]
    pub is_active: bool,
}

impl Room {
    pub fn new<N: Into<String>>(name: N, capacity: u32) -> Result<Self, String> {
        if capacity == 0 {
            return Err("room capacity must be at least 1".to_string());
        }
        Ok(Self {
            id: RoomId::random(),
            name: name.into(),
            capacity,
            capabilities: BTreeSet::new(),
            body_scrub_equipped: false,
            is_active: true,
        })
    }

    pub fn accepts(&self, category: ServiceCategory) -> bool {
        self.capabilities.is_empty() || self.capabilities.contains(&category)
    }

    pub fn is_couples_capable(&self) -> bool {
        self.capacity >= 2
    }
}

/// Portée d'un blocage de planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "block_type", rename_all = "snake_case")]
pub enum BlockKind {
    FullDay,
    TimeRange {
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
}

/// Exception saisie par l'admin : retire la disponibilité d'un(e) praticien(ne).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: BlockId,
    pub staff_id: StaffId,
    #[serde(flatten)]
    pub kind: BlockKind,
    pub start_date: NaiveDate,
    /// Inclusive; `None` means a single day.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ScheduleBlock {
    pub fn full_day(staff_id: StaffId, start_date: NaiveDate, end_date: Option<NaiveDate>) -> Self {
        Self {
            id: BlockId::random(),
            staff_id,
            kind: BlockKind::FullDay,
            start_date,
            end_date,
            reason: None,
        }
    }

    pub fn time_range(
        staff_id: StaffId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id: BlockId::random(),
            staff_id,
            kind: BlockKind::TimeRange {
                start_time,
                end_time,
            },
            start_date: date,
            end_date: None,
            reason: None,
        }
    }

    pub fn with_reason<R: Into<String>>(mut self, reason: R) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn last_date(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.last_date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Confirmed,
    Pending,
    Completed,
    Cancelled,
    NoShow,
    InProgress,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Pending => "pending",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
            BookingStatus::InProgress => "in_progress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    #[default]
    Single,
    Couple,
    Buffer,
    WalkIn,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Single => "single",
            BookingType::Couple => "couple",
            BookingType::Buffer => "buffer",
            BookingType::WalkIn => "walk_in",
        }
    }
}

/// Rendez-vous
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub room_id: RoomId,
    pub customer_id: CustomerId,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub booking_type: BookingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_group_id: Option<BookingGroupId>,
}

impl Booking {
    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Durée en minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Catalogue complet du spa : données de référence + rendez-vous.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Spa {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub staff: Vec<Staff>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub blocks: Vec<ScheduleBlock>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

impl Spa {
    pub fn find_service(&self, id: &ServiceId) -> Option<&Service> {
        self.services.iter().find(|s| &s.id == id)
    }
    pub fn find_staff(&self, id: &StaffId) -> Option<&Staff> {
        self.staff.iter().find(|s| &s.id == id)
    }
    pub fn find_staff_by_name<'a>(&'a self, name: &str) -> Option<&'a Staff> {
        self.staff.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }
    pub fn find_room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| &r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_loose_spellings() {
        assert_eq!("Body Scrub".parse::<ServiceCategory>(), Ok(ServiceCategory::BodyScrub));
        assert_eq!("body-treatment".parse::<ServiceCategory>(), Ok(ServiceCategory::BodyTreatment));
        assert!("sauna".parse::<ServiceCategory>().is_err());
    }

    #[test]
    fn block_defaults_to_single_day() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let block = ScheduleBlock::full_day(StaffId::new("s1"), d, None);
        assert!(block.covers(d));
        assert!(!block.covers(d.succ_opt().unwrap()));
    }

    #[test]
    fn block_serializes_with_type_tag() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        let block = ScheduleBlock::time_range(StaffId::new("s1"), d, t(12), t(13));
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["block_type"], "time_range");
        let back: ScheduleBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn body_scrub_service_needs_room_3() {
        let s = Service::new("Sea salt scrub", ServiceCategory::BodyScrub, 30, Decimal::new(65, 0))
            .unwrap();
        assert!(s.needs_body_scrub_room());
        assert!(Service::new("x", ServiceCategory::Facial, 0, Decimal::ZERO).is_err());
    }
}
