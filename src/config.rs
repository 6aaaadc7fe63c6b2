//! Horaires et règles métier, source unique injectée dans chaque composant.

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Opening time, hours and minutes.
pub const DEFAULT_OPEN: (u32, u32) = (9, 0);
/// Closing time, hours and minutes.
pub const DEFAULT_CLOSE: (u32, u32) = (19, 0);
pub const SLOT_GRANULARITY_MINUTES: u32 = 15;
/// Turnover gap enforced around every appointment, for staff and room alike.
pub const BUFFER_MINUTES: u32 = 15;
/// No appointment may start later than this before closing.
pub const LAST_BOOKING_OFFSET_MINUTES: u32 = 60;
pub const MAX_ADVANCE_DAYS: u32 = 30;
pub const MIN_NOTICE_HOURS: u32 = 2;
pub const SAME_DAY_WARNING_MINUTES: u32 = 60;
/// Tuesday and Thursday (Sunday = 0).
pub const REDUCED_STAFFING_DAYS: [u8; 2] = [2, 4];

fn hm((h, m): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub slot_granularity_minutes: u32,
    pub buffer_minutes: u32,
    pub last_booking_offset_minutes: u32,
    pub max_advance_days: u32,
    pub min_notice_hours: u32,
    pub same_day_warning_minutes: u32,
    pub reduced_staffing_days: Vec<u8>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            open: hm(DEFAULT_OPEN),
            close: hm(DEFAULT_CLOSE),
            slot_granularity_minutes: SLOT_GRANULARITY_MINUTES,
            buffer_minutes: BUFFER_MINUTES,
            last_booking_offset_minutes: LAST_BOOKING_OFFSET_MINUTES,
            max_advance_days: MAX_ADVANCE_DAYS,
            min_notice_hours: MIN_NOTICE_HOURS,
            same_day_warning_minutes: SAME_DAY_WARNING_MINUTES,
            reduced_staffing_days: REDUCED_STAFFING_DAYS.to_vec(),
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.close <= self.open {
            bail!("closing time must be after opening time");
        }
        if self.slot_granularity_minutes == 0 {
            bail!("slot_granularity_minutes must be > 0");
        }
        if self.reduced_staffing_days.iter().any(|d| *d > 6) {
            bail!("reduced_staffing_days must use weekday indexes 0-6 (Sunday = 0)");
        }
        Ok(())
    }

    /// Charge une configuration JSON ; les champs absents gardent leur valeur par défaut.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: SchedulingConfig = serde_json::from_slice(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Minutes since midnight of the opening time.
    pub fn open_minutes(&self) -> i64 {
        crate::slots::minutes_of_day(self.open)
    }

    pub fn close_minutes(&self) -> i64 {
        crate::slots::minutes_of_day(self.close)
    }

    /// Latest start allowed by the last-booking offset, in minutes since midnight.
    pub fn last_start_minutes(&self) -> i64 {
        self.close_minutes() - i64::from(self.last_booking_offset_minutes)
    }
}
