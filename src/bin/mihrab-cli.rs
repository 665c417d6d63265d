#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use mihrab::{
    clock::{Clock, FixedClock, SystemClock},
    geo::{format_coordinates, QiblaInfo},
    io,
    location::StaticLocationSource,
    model::{CalculationMethod, Coordinate, Madhab},
    notification::JsonOutboxBackend,
    prayer::{format_prayer_time, TimetableCalculator},
    scheduler::{MidnightRefresh, PassReport, SchedError},
    session::PrayerSession,
    storage::JsonKvStore,
};
use std::sync::Arc;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Heures de prière, Qibla et rappels locaux
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON d'état (réglages, position, marqueur)
    #[arg(long, global = true, default_value = "mihrab-state.json")]
    state: String,

    /// File JSON des notifications en attente
    #[arg(long, global = true, default_value = "mihrab-outbox.json")]
    outbox: String,

    /// Horaire CSV `date,fajr,sunrise,dhuhr,asr,maghrib,isha[,asr_hanafi]`
    #[arg(long, global = true)]
    timetable: Option<String>,

    /// Décalage civil en minutes (défaut : celui de l'hôte)
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// Fige l'horloge (RFC3339)
    #[arg(long, global = true)]
    now: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Afficher les prières d'une journée
    Times {
        /// YYYY-MM-DD (défaut : aujourd'hui)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Prochaine prière et compte à rebours
    Next,

    /// Direction et distance de la Qibla
    Qibla {
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
    },

    /// Gérer la position
    Location {
        #[command(subcommand)]
        cmd: LocationCmd,
    },

    /// Choisir la méthode de calcul
    Method { method: CalculationMethod },

    /// Choisir le madhab (Asr)
    Madhab { madhab: Madhab },

    /// Gérer les notifications
    Notify {
        #[command(subcommand)]
        cmd: NotifyCmd,
    },

    /// Planifier les rappels du jour (si périmés, ou toujours avec --force)
    Schedule {
        #[arg(long)]
        force: bool,
    },

    /// Lister les notifications en attente
    Pending {
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Rester actif et replanifier à chaque minuit local
    Watch,
}

#[derive(Subcommand, Debug)]
enum LocationCmd {
    /// Position manuelle
    Set {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Oublier la position manuelle
    Detect,
    Show,
}

#[derive(Subcommand, Debug)]
enum NotifyCmd {
    On,
    Off,
    /// Minutes de rappel avant la prière (5..=60)
    Timing { minutes: u32 },
    Status,
}

fn build_clock(cli: &Cli) -> Result<Arc<dyn Clock>> {
    let offset = match cli.utc_offset {
        Some(minutes) => Some(
            FixedOffset::east_opt(minutes * 60)
                .with_context(|| format!("invalid utc offset: {minutes} minutes"))?,
        ),
        None => None,
    };
    if let Some(raw) = &cli.now {
        let at: DateTime<FixedOffset> =
            DateTime::parse_from_rfc3339(raw).with_context(|| format!("invalid --now {raw}"))?;
        let at = offset.map(|o| at.with_timezone(&o)).unwrap_or(at);
        return Ok(Arc::new(FixedClock::new(at)));
    }
    Ok(Arc::new(match offset {
        Some(o) => SystemClock::with_offset(o),
        None => SystemClock::new(),
    }))
}

fn print_report(report: Option<PassReport>) {
    match report {
        Some(r) => println!(
            "Scheduled {} notification(s) for {} ({} in the past, {} failed)",
            r.scheduled, r.date, r.dropped_past, r.failed
        ),
        None => println!("Nothing to schedule"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let clock = build_clock(&cli)?;
    let offset = *clock.now().offset();
    let calculator = match &cli.timetable {
        Some(path) => io::import_timetable_csv(path, offset)?,
        None => TimetableCalculator::empty(offset),
    };
    let store = Arc::new(JsonKvStore::open(&cli.state)?);
    let backend = Arc::new(JsonOutboxBackend::open(&cli.outbox));
    let session = Arc::new(PrayerSession::new(
        Arc::new(calculator),
        store,
        backend,
        Arc::new(StaticLocationSource::default()),
        clock.clone(),
    ));
    session.start().await?;

    let code = match cli.cmd {
        Commands::Times {
            date,
            out_json,
            out_csv,
        } => {
            let date = match date {
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .with_context(|| format!("invalid date {raw}"))?,
                None => clock.today(),
            };
            let set = session.set_for(date).await?;
            if let Some(path) = out_json {
                io::export_daily_set_json(path, &set)?;
            }
            if let Some(path) = out_csv {
                io::export_daily_set_csv(path, &set)?;
            }
            for e in &set.events {
                println!(
                    "{:<9} {:<7} {}",
                    e.name.as_str(),
                    format_prayer_time(Some(e.instant), offset),
                    e.arabic_name
                );
            }
            0
        }
        Commands::Next => match session.next_prayer().await? {
            Some(next) => {
                println!(
                    "{} at {}{} (in {})",
                    next.event.name,
                    format_prayer_time(Some(next.event.instant), offset),
                    if next.tomorrow { " tomorrow" } else { "" },
                    next.countdown
                );
                0
            }
            None => {
                println!("No upcoming prayer");
                2
            }
        },
        Commands::Qibla { lat, lon } => {
            let info = match (lat, lon) {
                (Some(lat), Some(lon)) => QiblaInfo::from_coordinate(Some(Coordinate::new(lat, lon)?)),
                _ => session.qibla().await,
            };
            println!(
                "Qibla {:.2}° {} ({})",
                info.bearing, info.compass, info.formatted_distance
            );
            0
        }
        Commands::Location { cmd } => {
            match cmd {
                LocationCmd::Set { lat, lon } => {
                    print_report(session.set_manual_location(Coordinate::new(lat, lon)?).await?);
                }
                LocationCmd::Detect => {
                    print_report(session.detect_location().await?);
                }
                LocationCmd::Show => {}
            }
            let resolved = session.location().await?;
            println!(
                "{} ({:?})",
                format_coordinates(resolved.coordinate),
                resolved.origin
            );
            0
        }
        Commands::Method { method } => {
            print_report(session.set_method(method).await?);
            0
        }
        Commands::Madhab { madhab } => {
            print_report(session.set_madhab(madhab).await?);
            0
        }
        Commands::Notify { cmd } => {
            let scheduler = session.scheduler();
            match cmd {
                NotifyCmd::On => match scheduler.enable().await {
                    Ok(report) => {
                        println!("Notifications enabled");
                        print_report(report);
                        0
                    }
                    Err(SchedError::PermissionDenied) => {
                        eprintln!("Permission required to enable notifications.");
                        2
                    }
                    Err(err) => return Err(err.into()),
                },
                NotifyCmd::Off => {
                    scheduler.disable().await?;
                    println!("Notifications disabled");
                    0
                }
                NotifyCmd::Timing { minutes } => {
                    print_report(scheduler.set_reminder_minutes(minutes).await?);
                    0
                }
                NotifyCmd::Status => {
                    let settings = scheduler.settings().await;
                    let marker = scheduler.marker().await?;
                    println!(
                        "enabled={} reminder={}m state={:?} last_scheduled={}",
                        settings.enabled,
                        settings.reminder_minutes_before_prayer,
                        scheduler.state().await,
                        marker.map(|m| m.encode()).unwrap_or_else(|| "-".to_string())
                    );
                    0
                }
            }
        }
        Commands::Schedule { force } => {
            let scheduler = session.scheduler();
            if !scheduler.settings().await.enabled {
                bail!("notifications are disabled (run `notify on`)");
            }
            let report = if force {
                Some(scheduler.reschedule().await?)
            } else {
                scheduler.ensure_current().await?
            };
            print_report(report);
            0
        }
        Commands::Pending { out_csv } => {
            let tasks = session.scheduler().pending().await?;
            if let Some(path) = out_csv {
                io::export_pending_csv(path, &tasks)?;
            }
            for t in &tasks {
                println!(
                    "{} | {:<8} | {:<9} | {}",
                    t.fires_at.with_timezone(&offset).to_rfc3339(),
                    t.prayer.as_str(),
                    t.channel.id(),
                    t.title
                );
            }
            0
        }
        Commands::Watch => {
            let refresh: MidnightRefresh = session.start_midnight_refresh();
            println!("Watching for midnight rollover (Ctrl-C to stop)");
            tokio::signal::ctrl_c().await?;
            refresh.stop().await;
            0
        }
    };

    std::process::exit(code);
}
