#![forbid(unsafe_code)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const NOW: &str = "2025-03-01T08:00";

fn cli(spa: &Path) -> Command {
    let mut cmd = Command::cargo_bin("medspa-cli").unwrap();
    cmd.arg("--spa").arg(spa).arg("--now").arg(NOW);
    cmd
}

fn seed(dir: &Path) -> std::path::PathBuf {
    let spa = dir.join("spa.json");
    fs::write(
        dir.join("rooms.csv"),
        "name,capacity,capabilities,body_scrub_equipped\nRoom 1,1,,\nRoom 3,2,,yes\n",
    )
    .unwrap();
    fs::write(
        dir.join("services.csv"),
        "name,category,duration_minutes,price\nHydrafacial,facial,30,120\n",
    )
    .unwrap();
    fs::write(
        dir.join("staff.csv"),
        "name,capabilities,work_days\nMaya,facial,0;1;2;3;4;5;6\nSelma,facial,sun;mon;wed;fri;sat\n",
    )
    .unwrap();

    for (cmd, file) in [
        ("import-rooms", "rooms.csv"),
        ("import-services", "services.csv"),
        ("import-staff", "staff.csv"),
    ] {
        cli(&spa)
            .arg(cmd)
            .arg("--csv")
            .arg(dir.join(file))
            .assert()
            .success();
    }
    spa
}

#[test]
fn book_then_check_reports_no_conflict() {
    let dir = tempdir().unwrap();
    let spa = seed(dir.path());

    cli(&spa)
        .args(["book", "--service", "Hydrafacial", "--staff", "Maya"])
        .args(["--date", "2025-03-05", "--time", "10:00"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("booked "));

    cli(&spa)
        .args(["list", "--date", "2025-03-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10:00 → 10:30 | Maya | Room 1 | confirmed"));

    cli(&spa)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("OK: no conflicts"));
}

#[test]
fn double_booking_exits_with_code_2() {
    let dir = tempdir().unwrap();
    let spa = seed(dir.path());
    let book = |time: &str| {
        let mut cmd = cli(&spa);
        cmd.args(["book", "--service", "Hydrafacial", "--staff", "Maya"])
            .args(["--date", "2025-03-05", "--time", time]);
        cmd
    };

    book("10:00").assert().success();
    book("10:15")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already booked"));
}

#[test]
fn validate_prints_json_and_flags_day_off() {
    let dir = tempdir().unwrap();
    let spa = seed(dir.path());

    // 2025-03-04 est un mardi
    cli(&spa)
        .args(["validate", "--service", "Hydrafacial", "--staff", "Selma"])
        .args(["--date", "2025-03-04", "--time", "10:00"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"is_valid\": false"))
        .stdout(predicate::str::contains("Selma does not work on Tuesdays"));
}

#[test]
fn slots_lists_opening_time_first() {
    let dir = tempdir().unwrap();
    let spa = seed(dir.path());

    cli(&spa)
        .args(["slots", "--service", "Hydrafacial", "--staff", "Maya", "--date", "2025-03-05"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("09:00\n09:15\n"));
}

#[test]
fn unknown_staff_is_an_error() {
    let dir = tempdir().unwrap();
    let spa = seed(dir.path());

    cli(&spa)
        .args(["slots", "--service", "Hydrafacial", "--staff", "Nobody", "--date", "2025-03-05"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown staff member"));
}

#[test]
fn reimporting_the_scrub_room_is_refused() {
    let dir = tempdir().unwrap();
    let spa = seed(dir.path());

    cli(&spa)
        .arg("import-rooms")
        .arg("--csv")
        .arg(dir.path().join("rooms.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("only one room can be body scrub equipped"));
}
