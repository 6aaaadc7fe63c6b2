#![forbid(unsafe_code)]
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use medspa::{
    io, BookingDraft, CustomerId, JsonStorage, Room, ScheduleBlock, Scheduler, SchedulingConfig,
    Service, ServiceCategory, Spa, Staff, Storage,
};
use rust_decimal::Decimal;
use tempfile::tempdir;

fn sample_scheduler() -> Scheduler {
    let facial = Service::new("Hydrafacial", ServiceCategory::Facial, 30, Decimal::new(12050, 2)).unwrap();
    let maya = Staff::new("Maya", [ServiceCategory::Facial], 0..7);
    let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    let now = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
    );

    let mut s = Scheduler::with_config(Spa::default(), SchedulingConfig::default());
    s.add_services(vec![facial.clone()]);
    s.add_rooms(vec![Room::new("Room 1", 1).unwrap()]).unwrap();
    s.add_staff(vec![maya.clone()]);
    s.block_time(
        ScheduleBlock::time_range(
            maya.id.clone(),
            date,
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        )
        .with_reason("Lunch"),
    )
    .unwrap();
    s.book(
        &BookingDraft {
            service_id: facial.id,
            staff_id: maya.id,
            room_id: None,
            customer_id: CustomerId::new("ana"),
            date,
            start_time: "10:00".into(),
            add_on_minutes: 0,
        },
        now,
    )
    .unwrap();
    s
}

#[test]
fn save_and_load_spa_roundtrip() {
    let dir = tempdir().unwrap();
    let storage = JsonStorage::open(dir.path().join("spa.json")).unwrap();
    assert!(!storage.exists());

    let scheduler = sample_scheduler();
    storage.save(scheduler.spa()).unwrap();
    assert!(storage.exists());

    let loaded = storage.load().unwrap();
    assert_eq!(loaded.bookings, scheduler.spa().bookings);
    assert_eq!(loaded.blocks, scheduler.spa().blocks);
    assert_eq!(loaded.services[0].price, Decimal::new(12050, 2));
}

#[test]
fn price_is_stored_as_string() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("export.json");
    io::export_spa_json(&path, sample_scheduler().spa()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["services"][0]["price"], "120.50");
    assert_eq!(json["blocks"][0]["block_type"], "time_range");
}

#[test]
fn bookings_csv_names_staff_and_room() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bookings.csv");
    io::export_bookings_csv(&path, sample_scheduler().spa()).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("id,date,start,end,service,staff,room,customer,status,type,group")
    );
    let row = lines.next().unwrap();
    assert!(row.contains("2025-03-05,10:00,10:30,Hydrafacial,Maya,Room 1,ana,confirmed,single,"));
}
