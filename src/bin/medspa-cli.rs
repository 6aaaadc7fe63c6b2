#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use medspa::{
    io,
    model::{BookingId, CustomerId, RoomId, ScheduleBlock, Service, Spa, Staff},
    scheduler::{BookingDraft, CouplesDraft, SchedError, Scheduler, ValidationResult, WalkInDraft},
    slots::parse_time,
    storage::{JsonStorage, Storage},
    SchedulingConfig,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de planification du spa (catalogue JSON local)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du catalogue
    #[arg(long, global = true, default_value = "spa.json")]
    spa: String,

    /// Configuration horaire JSON (défauts 09:00-19:00 sinon)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Horloge injectée, `YYYY-MM-DDTHH:MM` (heure locale par défaut)
    #[arg(long, global = true)]
    now: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Importer des prestations depuis un CSV
    ImportServices {
        #[arg(long)]
        csv: String,
    },

    /// Importer des cabines depuis un CSV
    ImportRooms {
        #[arg(long)]
        csv: String,
    },

    /// Importer le personnel depuis un CSV (après les cabines)
    ImportStaff {
        #[arg(long)]
        csv: String,
    },

    /// Créneaux réservables pour une prestation et un(e) praticien(ne)
    Slots {
        #[arg(long)]
        service: String,
        #[arg(long)]
        staff: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
    },

    /// Praticien(ne)s disponibles pour un créneau
    StaffFor {
        #[arg(long)]
        service: String,
        #[arg(long)]
        date: String,
        /// HH:MM
        #[arg(long)]
        time: String,
    },

    /// Valider une demande sans l'enregistrer
    Validate {
        #[command(flatten)]
        booking: BookingArgs,
    },

    /// Réserver
    Book {
        #[command(flatten)]
        booking: BookingArgs,
    },

    /// Réserver un soin en duo (deux praticien(ne)s, une cabine)
    Couples {
        #[arg(long)]
        service: String,
        #[arg(long)]
        staff: String,
        #[arg(long)]
        with: String,
        #[arg(long)]
        customer: String,
        #[arg(long)]
        partner: String,
        #[arg(long)]
        room: Option<String>,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
    },

    /// Client sans rendez-vous, à partir de maintenant
    WalkIn {
        #[arg(long)]
        service: String,
        #[arg(long)]
        staff: String,
        #[arg(long)]
        room: Option<String>,
        #[arg(long)]
        customer: String,
        #[arg(long, default_value_t = 0)]
        add_on: u32,
    },

    /// Déplacer un rendez-vous
    Reschedule {
        #[arg(long)]
        booking: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
    },

    /// Confier un rendez-vous à un(e) autre praticien(ne)
    Reassign {
        #[arg(long)]
        booking: String,
        #[arg(long)]
        staff: String,
    },

    /// Annuler un rendez-vous
    Cancel {
        #[arg(long)]
        booking: String,
    },

    /// Bloquer un jour (ou une plage horaire avec --from/--to)
    Block {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        date: String,
        /// Dernier jour inclus
        #[arg(long)]
        until: Option<String>,
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Supprimer un blocage
    Unblock {
        #[arg(long)]
        block: String,
    },

    /// Lister le planning et optionnellement exporter
    List {
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Vérifier les conflits entre rendez-vous enregistrés
    Check {
        /// Ignorer le temps de battement
        #[arg(long)]
        no_buffer: bool,
        /// Export CSV des conflits (optionnel)
        #[arg(long)]
        report: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct BookingArgs {
    #[arg(long)]
    service: String,
    #[arg(long)]
    staff: String,
    /// Choisie automatiquement si absente
    #[arg(long)]
    room: Option<String>,
    #[arg(long, default_value = "walk-up")]
    customer: String,
    #[arg(long)]
    date: String,
    #[arg(long)]
    time: String,
    /// Minutes d'options ajoutées
    #[arg(long, default_value_t = 0)]
    add_on: u32,
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

fn parse_now(raw: Option<&str>) -> Result<NaiveDateTime> {
    match raw {
        Some(s) => NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M")
            .with_context(|| format!("invalid --now value: {s}")),
        None => Ok(Local::now().naive_local()),
    }
}

fn service_by_key<'a>(spa: &'a Spa, key: &str) -> Result<&'a Service> {
    spa.services
        .iter()
        .find(|s| s.id.as_str() == key || s.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| anyhow::anyhow!("unknown service: {}", key))
}

fn staff_by_key<'a>(spa: &'a Spa, key: &str) -> Result<&'a Staff> {
    spa.staff
        .iter()
        .find(|s| s.id.as_str() == key)
        .or_else(|| spa.find_staff_by_name(key))
        .ok_or_else(|| anyhow::anyhow!("unknown staff member: {}", key))
}

fn room_by_key(spa: &Spa, key: &str) -> Result<RoomId> {
    spa.rooms
        .iter()
        .find(|r| r.id.as_str() == key || r.name.eq_ignore_ascii_case(key))
        .map(|r| r.id.clone())
        .ok_or_else(|| anyhow::anyhow!("unknown room: {}", key))
}

fn draft_from(spa: &Spa, args: &BookingArgs) -> Result<BookingDraft> {
    Ok(BookingDraft {
        service_id: service_by_key(spa, &args.service)?.id.clone(),
        staff_id: staff_by_key(spa, &args.staff)?.id.clone(),
        room_id: args.room.as_deref().map(|r| room_by_key(spa, r)).transpose()?,
        customer_id: CustomerId::new(&args.customer),
        date: parse_date(&args.date)?,
        start_time: args.time.clone(),
        add_on_minutes: args.add_on,
    })
}

fn print_result(result: &ValidationResult) {
    for e in &result.errors {
        eprintln!("error: {e}");
    }
    for w in &result.warnings {
        eprintln!("warning: {w}");
    }
}

/// Refus métier → code 2 ; autres erreurs propagées.
fn outcome<T>(res: Result<T, SchedError>, on_ok: impl FnOnce(T)) -> Result<i32> {
    match res {
        Ok(v) => {
            on_ok(v);
            Ok(0)
        }
        Err(SchedError::Rejected(result)) => {
            print_result(&result);
            Ok(2)
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let config = match &cli.config {
        Some(path) => SchedulingConfig::from_file(path)?,
        None => SchedulingConfig::default(),
    };
    let now = parse_now(cli.now.as_deref())?;

    let storage = JsonStorage::open(&cli.spa)?;
    let spa = if storage.exists() { storage.load()? } else { Spa::default() };
    let mut scheduler = Scheduler::with_config(spa, config);

    let code = match cli.cmd {
        Commands::ImportServices { csv } => {
            let services = io::import_services_csv(csv)?;
            println!("imported {} service(s)", services.len());
            scheduler.add_services(services);
            storage.save(scheduler.spa())?;
            0
        }
        Commands::ImportRooms { csv } => {
            let rooms = io::import_rooms_csv(csv)?;
            let count = rooms.len();
            scheduler.add_rooms(rooms)?;
            println!("imported {count} room(s)");
            storage.save(scheduler.spa())?;
            0
        }
        Commands::ImportStaff { csv } => {
            let staff = io::import_staff_csv(csv, &scheduler.spa().rooms)?;
            println!("imported {} staff member(s)", staff.len());
            scheduler.add_staff(staff);
            storage.save(scheduler.spa())?;
            0
        }
        Commands::Slots {
            service,
            staff,
            date,
        } => {
            let service_id = service_by_key(scheduler.spa(), &service)?.id.clone();
            let staff_id = staff_by_key(scheduler.spa(), &staff)?.id.clone();
            let slots = scheduler.available_slots(&service_id, &staff_id, parse_date(&date)?, now)?;
            if slots.is_empty() {
                println!("no slot available");
            }
            for slot in slots {
                println!("{slot}");
            }
            0
        }
        Commands::StaffFor {
            service,
            date,
            time,
        } => {
            parse_time(&time)?;
            let service_id = service_by_key(scheduler.spa(), &service)?.id.clone();
            let staff = scheduler.available_staff(&service_id, parse_date(&date)?, &time, now)?;
            for s in &staff {
                println!("{} | {}", s.id, s.name);
            }
            0
        }
        Commands::Validate { booking } => {
            let draft = draft_from(scheduler.spa(), &booking)?;
            let result = scheduler.validate(&draft, now)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.is_valid {
                0
            } else {
                2
            }
        }
        Commands::Book { booking } => {
            let draft = draft_from(scheduler.spa(), &booking)?;
            let code = outcome(scheduler.book(&draft, now), |id| println!("booked {id}"))?;
            storage.save(scheduler.spa())?;
            code
        }
        Commands::Couples {
            service,
            staff,
            with,
            customer,
            partner,
            room,
            date,
            time,
        } => {
            let spa = scheduler.spa();
            let draft = CouplesDraft {
                service_id: service_by_key(spa, &service)?.id.clone(),
                staff_ids: [
                    staff_by_key(spa, &staff)?.id.clone(),
                    staff_by_key(spa, &with)?.id.clone(),
                ],
                customer_ids: [CustomerId::new(customer), CustomerId::new(partner)],
                room_id: room.as_deref().map(|r| room_by_key(spa, r)).transpose()?,
                date: parse_date(&date)?,
                start_time: time,
            };
            let code = outcome(scheduler.book_couples(&draft, now), |(a, b)| {
                println!("booked {a} and {b}")
            })?;
            storage.save(scheduler.spa())?;
            code
        }
        Commands::WalkIn {
            service,
            staff,
            room,
            customer,
            add_on,
        } => {
            let spa = scheduler.spa();
            let draft = WalkInDraft {
                service_id: service_by_key(spa, &service)?.id.clone(),
                staff_id: staff_by_key(spa, &staff)?.id.clone(),
                room_id: room.as_deref().map(|r| room_by_key(spa, r)).transpose()?,
                customer_id: CustomerId::new(customer),
                add_on_minutes: add_on,
            };
            let code = outcome(scheduler.walk_in(&draft, now), |id| println!("walk-in {id}"))?;
            storage.save(scheduler.spa())?;
            code
        }
        Commands::Reschedule {
            booking,
            date,
            time,
        } => {
            let id = BookingId::new(booking);
            let res = scheduler.reschedule(&id, parse_date(&date)?, &time, now);
            let code = outcome(res, |()| println!("rescheduled {id}"))?;
            storage.save(scheduler.spa())?;
            code
        }
        Commands::Reassign { booking, staff } => {
            let id = BookingId::new(booking);
            let staff_id = staff_by_key(scheduler.spa(), &staff)?.id.clone();
            let code = outcome(scheduler.reassign(&id, &staff_id, now), |()| {
                println!("reassigned {id}")
            })?;
            storage.save(scheduler.spa())?;
            code
        }
        Commands::Cancel { booking } => {
            scheduler.cancel(&BookingId::new(&booking))?;
            storage.save(scheduler.spa())?;
            println!("cancelled {booking}");
            0
        }
        Commands::Block {
            staff,
            date,
            until,
            from,
            to,
            reason,
        } => {
            let staff_id = staff_by_key(scheduler.spa(), &staff)?.id.clone();
            let start_date = parse_date(&date)?;
            let mut block = match (from, to) {
                (Some(from), Some(to)) => {
                    ScheduleBlock::time_range(staff_id, start_date, parse_time(&from)?, parse_time(&to)?)
                }
                _ => ScheduleBlock::full_day(staff_id, start_date, None),
            };
            block.end_date = until.as_deref().map(parse_date).transpose()?;
            block.reason = reason;
            let id = scheduler.block_time(block)?;
            storage.save(scheduler.spa())?;
            println!("block {id}");
            0
        }
        Commands::Unblock { block } => {
            scheduler.remove_block(&medspa::BlockId::new(block))?;
            storage.save(scheduler.spa())?;
            0
        }
        Commands::List {
            date,
            out_json,
            out_csv,
        } => {
            if let Some(path) = out_json {
                io::export_spa_json(path, scheduler.spa())?;
            }
            if let Some(path) = out_csv {
                io::export_bookings_csv(path, scheduler.spa())?;
            }
            let date = date.as_deref().map(parse_date).transpose()?;
            let spa = scheduler.spa();
            let mut bookings: Vec<_> = spa
                .bookings
                .iter()
                .filter(|b| date.map_or(true, |d| b.appointment_date == d))
                .collect();
            bookings.sort_by_key(|b| (b.appointment_date, b.start_time));
            // impression compacte
            for b in bookings {
                let staff = spa.find_staff(&b.staff_id).map(|s| s.name.as_str()).unwrap_or("-");
                let room = spa.find_room(&b.room_id).map(|r| r.name.as_str()).unwrap_or("-");
                println!(
                    "{} | {} {} → {} | {} | {} | {}",
                    b.id,
                    b.appointment_date,
                    b.start_time.format("%H:%M"),
                    b.end_time.format("%H:%M"),
                    staff,
                    room,
                    b.status.as_str()
                );
            }
            0
        }
        Commands::Check { no_buffer, report } => {
            let entries = scheduler.audit_conflicts(!no_buffer);
            if entries.is_empty() {
                println!("OK: no conflicts");
                0
            } else {
                eprintln!("Found {} conflict(s)", entries.len());
                if let Some(path) = report {
                    let mut w = csv::Writer::from_path(path)?;
                    w.write_record(["booking", "conflicts_with", "type", "message"])?;
                    for e in &entries {
                        w.write_record([
                            e.booking.as_str(),
                            e.conflict.booking.as_str(),
                            e.conflict.kind.as_str(),
                            e.conflict.message.as_str(),
                        ])?;
                    }
                    w.flush()?;
                }
                // Code 2 = WARNING/INCOMPLETE
                2
            }
        }
    };

    std::process::exit(code);
}
