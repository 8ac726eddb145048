use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use hunger_map::config::AppConfig;
use hunger_map::data;
use hunger_map::error::SubmitError;
use hunger_map::filter::{FilterState, KindSelector, SeveritySelector};
use hunger_map::geolocation::{FixedPosition, Locator};
use hunger_map::intake::{parse_lat_lng, EntryPoint, LogSink, RecentReports, ReportDraft};
use hunger_map::render::GeoJsonSurface;
use hunger_map::server::{self, AppState};
use hunger_map::session::{MapSession, SessionSettings};
use hunger_map::types::{Category, Coordinates, Severity, Urgency};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the map API for a single session
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write the visible markers as a GeoJSON FeatureCollection
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, default_value = "all")]
        severity: SeveritySelector,
        #[arg(long = "type", default_value = "all")]
        kind: KindSelector,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a report and print the resulting record
    Submit {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, default_value = "")]
        location: String,
        /// Report placed by a map click at "lat,lng"
        #[arg(long, value_name = "LAT,LNG")]
        click: Option<String>,
        #[arg(long, default_value = "medium")]
        severity: Severity,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        affected: String,
        #[arg(long, default_value = "")]
        contact: String,
        #[arg(long, default_value = "normal")]
        urgency: Urgency,
        #[arg(long, default_value = "food")]
        category: Category,
    },
}

fn new_session(config: &AppConfig, recent: bool) -> Result<MapSession<GeoJsonSurface>> {
    let store = data::seed_store(config)?;
    let settings = SessionSettings::from_config(config)?;
    let sink: Box<dyn hunger_map::intake::ReportSink> = if recent {
        Box::new(RecentReports::new(config.intake.recent_reports))
    } else {
        Box::new(LogSink)
    };
    Ok(MapSession::new(store, GeoJsonSurface::new(), settings, sink))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let app_config = AppConfig::load_or_default(&config)?;
            let session = new_session(&app_config, true)?;

            let locator = match &app_config.geolocation.device {
                Some(device) => Some(Mutex::new(Locator::new(
                    FixedPosition::at(device.coordinates()?),
                    app_config.geolocation.options(),
                ))),
                None => None,
            };

            let state = Arc::new(AppState {
                session: Mutex::new(session),
                locator,
            });
            server::start_server(app_config, state).await?;
        }
        Commands::Export {
            config,
            severity,
            kind,
            output,
        } => {
            let app_config = AppConfig::load_or_default(&config)?;
            let mut session = new_session(&app_config, false)?;
            session.set_filters(FilterState { severity, kind });

            let collection = session.layer().surface().feature_collection();
            let body = serde_json::to_string_pretty(&collection)?;
            match output {
                Some(path) => {
                    fs::write(&path, body)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Wrote {} markers to {:?}", collection.features.len(), path);
                }
                None => println!("{}", body),
            }
        }
        Commands::Submit {
            config,
            location,
            click,
            severity,
            description,
            affected,
            contact,
            urgency,
            category,
        } => {
            let app_config = AppConfig::load_or_default(&config)?;
            let mut session = new_session(&app_config, false)?;

            let entry = match click {
                Some(text) => {
                    let (lat, lng) = parse_lat_lng(&text)
                        .ok_or_else(|| anyhow!("--click expects \"lat,lng\", got {:?}", text))?;
                    let at = Coordinates::new(lat, lng)
                        .ok_or_else(|| anyhow!("--click position {}, {} is out of range", lat, lng))?;
                    EntryPoint::MapClick(at)
                }
                None => EntryPoint::Manual,
            };

            let mut draft = session.report_draft(entry);
            if !location.is_empty() {
                draft.location = location;
            }
            draft = ReportDraft {
                severity,
                description,
                affected_count: affected,
                contact_info: contact,
                urgency,
                category,
                ..draft
            };

            match session.submit_report(&draft, entry) {
                Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                Err(SubmitError::Invalid(errors)) => {
                    for error in errors.iter() {
                        eprintln!("{}: {}", error.field(), error);
                    }
                    return Err(anyhow!("report rejected with {} problem(s)", errors.len()));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
