use crate::model::{Room, Service, ServiceCategory, Spa, Staff, StaffStatus};
use anyhow::{bail, Context};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

fn field<'a>(rec: &'a StringRecord, idx: usize) -> Option<&'a str> {
    rec.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "oui" => Ok(true),
        "false" | "0" | "no" | "n" | "non" => Ok(false),
        _ => bail!("expected boolean"),
    }
}

/// Liste séparée par `;` : `facial;massage`.
fn parse_categories(raw: &str) -> anyhow::Result<BTreeSet<ServiceCategory>> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<ServiceCategory>().map_err(anyhow::Error::msg))
        .collect()
}

/// `0;1;3` or day names (`sun;mon;wed`), Sunday = 0.
fn parse_work_days(raw: &str) -> anyhow::Result<BTreeSet<u8>> {
    const NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if let Ok(n) = s.parse::<u8>() {
                if n < 7 {
                    return Ok(n);
                }
                bail!("weekday index out of range: {n}");
            }
            let lower = s.to_ascii_lowercase();
            NAMES
                .iter()
                .position(|name| lower.starts_with(name))
                .map(|i| i as u8)
                .with_context(|| format!("unknown weekday: {s}"))
        })
        .collect()
}

fn parse_status(raw: &str) -> anyhow::Result<StaffStatus> {
    match raw.to_ascii_lowercase().replace('-', "_").as_str() {
        "working" => Ok(StaffStatus::Working),
        "on_call" | "oncall" => Ok(StaffStatus::OnCall),
        "off" => Ok(StaffStatus::Off),
        _ => bail!("unknown staff status: {raw}"),
    }
}

/// Import de prestations : header `name,category,duration_minutes,price[,requires_room_3][,is_couples_service]`
pub fn import_services_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Service>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let name = field(&rec, 0).context("missing name")?;
        let category: ServiceCategory = field(&rec, 1)
            .context("missing category")?
            .parse()
            .map_err(anyhow::Error::msg)?;
        let duration: u32 = field(&rec, 2)
            .context("missing duration_minutes")?
            .parse()
            .with_context(|| format!("invalid duration for service {name}"))?;
        let price: Decimal = field(&rec, 3)
            .context("missing price")?
            .parse()
            .with_context(|| format!("invalid price for service {name}"))?;
        let mut service =
            Service::new(name, category, duration, price).map_err(anyhow::Error::msg)?;
        if let Some(flag) = field(&rec, 4) {
            service.requires_room_3 = parse_bool(flag)
                .with_context(|| format!("invalid requires_room_3 value for service {name}"))?;
        }
        if let Some(flag) = field(&rec, 5) {
            service.is_couples_service = parse_bool(flag)
                .with_context(|| format!("invalid is_couples_service value for service {name}"))?;
        }
        out.push(service);
    }
    Ok(out)
}

/// Import de cabines : header `name,capacity[,capabilities][,body_scrub_equipped]`
pub fn import_rooms_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Room>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let name = field(&rec, 0).context("missing name")?;
        let capacity: u32 = field(&rec, 1)
            .context("missing capacity")?
            .parse()
            .with_context(|| format!("invalid capacity for room {name}"))?;
        let mut room = Room::new(name, capacity).map_err(anyhow::Error::msg)?;
        if let Some(caps) = field(&rec, 2) {
            room.capabilities = parse_categories(caps)
                .with_context(|| format!("invalid capabilities for room {name}"))?;
        }
        if let Some(flag) = field(&rec, 3) {
            room.body_scrub_equipped = parse_bool(flag)
                .with_context(|| format!("invalid body_scrub_equipped value for room {name}"))?;
        }
        out.push(room);
    }
    Ok(out)
}

/// Import du personnel : header
/// `name,capabilities,work_days[,default_room][,status][,advance_notice_hours]`.
/// `default_room` is a room name looked up in `rooms`.
pub fn import_staff_csv<P: AsRef<Path>>(path: P, rooms: &[Room]) -> anyhow::Result<Vec<Staff>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let name = field(&rec, 0).context("missing name")?;
        let capabilities = parse_categories(field(&rec, 1).unwrap_or(""))
            .with_context(|| format!("invalid capabilities for {name}"))?;
        let work_days = parse_work_days(field(&rec, 2).unwrap_or(""))
            .with_context(|| format!("invalid work_days for {name}"))?;
        let mut staff = Staff::new(name, capabilities, work_days);
        if let Some(room_name) = field(&rec, 3) {
            let room = rooms
                .iter()
                .find(|r| r.name.eq_ignore_ascii_case(room_name))
                .with_context(|| format!("unknown default room {room_name} for {name}"))?;
            staff.default_room_id = Some(room.id.clone());
        }
        if let Some(status) = field(&rec, 4) {
            staff.current_status = parse_status(status)?;
        }
        if let Some(hours) = field(&rec, 5) {
            staff.default_advance_notice_hours = hours
                .parse()
                .with_context(|| format!("invalid advance_notice_hours for {name}"))?;
        }
        out.push(staff);
    }
    Ok(out)
}

/// Export JSON du catalogue (jolie mise en forme)
pub fn export_spa_json<P: AsRef<Path>>(path: P, spa: &Spa) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(spa)?;
    fs::write(path, s)?;
    Ok(())
}

/// Export CSV du planning :
/// header `id,date,start,end,service,staff,room,customer,status,type,group`
pub fn export_bookings_csv<P: AsRef<Path>>(path: P, spa: &Spa) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record([
        "id", "date", "start", "end", "service", "staff", "room", "customer", "status", "type",
        "group",
    ])?;
    let mut bookings: Vec<_> = spa.bookings.iter().collect();
    bookings.sort_by_key(|b| (b.appointment_date, b.start_time));
    for b in bookings {
        let service = spa.find_service(&b.service_id).map(|s| s.name.as_str()).unwrap_or("");
        let staff = spa.find_staff(&b.staff_id).map(|s| s.name.as_str()).unwrap_or("");
        let room = spa.find_room(&b.room_id).map(|r| r.name.as_str()).unwrap_or("");
        let date = b.appointment_date.to_string();
        let start = b.start_time.format("%H:%M").to_string();
        let end = b.end_time.format("%H:%M").to_string();
        w.write_record([
            b.id.as_str(),
            date.as_str(),
            start.as_str(),
            end.as_str(),
            service,
            staff,
            room,
            b.customer_id.as_str(),
            b.status.as_str(),
            b.booking_type.as_str(),
            b.booking_group_id.as_ref().map(|g| g.as_str()).unwrap_or(""),
        ])?;
    }
    w.flush()?;
    Ok(())
}
