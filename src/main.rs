//! fleetmap CLI
//!
//! Entry point for the `fleetmap` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fleetmap::mock::{MockCrm, MockGeoFetch};
use fleetmap::{
    AppConfig, CrmApi, Dispatcher, GeoFetch, HttpCrm, Job, JobStatus, NominatimFetch,
    SnapshotCache,
};

#[derive(Parser)]
#[command(name = "fleetmap")]
#[command(about = "Dispatcher dashboard core: CRM fetch, classification, geocoding", version)]
struct Cli {
    /// Path to config file (default: fleetmap.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Use seeded mock backends instead of live services
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cached snapshot, then run a full refresh
    Refresh {
        /// Output the job list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the cached snapshot without any network activity
    Cached {
        /// Output the job list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Advance a job to its type-specific done phase
    Advance {
        /// Job id
        id: u64,
    },

    /// Correct a job's address and re-geocode it
    SetAddress {
        /// Job id
        id: u64,
        /// New address
        address: String,
    },

    /// Generate driver advisory text for a job
    Advise {
        /// Job id
        id: u64,
    },

    /// Validate the configuration and echo the effective keyword sets
    Verify,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };
    config.apply_env();
    if cli.mock {
        config.mock = true;
    }

    if let Commands::Verify = cli.command {
        run_verify(&config);
        return;
    }

    let cache = SnapshotCache::new(config.snapshot_path());

    let code = if config.mock {
        let dispatcher = Dispatcher::new(config, MockCrm::seeded(), MockGeoFetch::seeded(), cache);
        run_command(cli.command, dispatcher).await
    } else {
        let crm = match HttpCrm::new(
            config.crm_base_url.clone(),
            config.api_token.clone(),
            config.custom_address_field.clone(),
            config.http_timeout(),
        ) {
            Ok(crm) => crm,
            Err(e) => {
                eprintln!("Could not build CRM client: {e}");
                process::exit(1);
            }
        };
        let geo = match NominatimFetch::new(
            config.geocoder_base_url.clone(),
            config.country_codes.clone(),
            config.http_timeout(),
        ) {
            Ok(geo) => geo,
            Err(e) => {
                eprintln!("Could not build geocoder client: {e}");
                process::exit(1);
            }
        };
        let dispatcher = Dispatcher::new(config, crm, geo, cache);
        run_command(cli.command, dispatcher).await
    };

    process::exit(code);
}

async fn run_command<C: CrmApi, F: GeoFetch>(
    command: Commands,
    mut dispatcher: Dispatcher<C, F>,
) -> i32 {
    match command {
        Commands::Refresh { json } => {
            let cached = dispatcher.load_cached();
            if cached > 0 && !json {
                println!("Cached snapshot ({cached} jobs, possibly stale):");
                print_jobs(dispatcher.jobs(), false);
                println!();
                println!("Refreshing from live services...");
            }

            match dispatcher.refresh().await {
                Ok(jobs) => {
                    if !json {
                        println!("Refresh complete ({} jobs):", jobs.len());
                    }
                    print_jobs(dispatcher.jobs(), json);
                    0
                }
                Err(e) => {
                    eprintln!("Refresh failed: {e}");
                    if cached > 0 {
                        eprintln!("The cached snapshot above remains valid.");
                    }
                    10
                }
            }
        }

        Commands::Cached { json } => match dispatcher.cached_snapshot() {
            Some(jobs) => {
                if !json {
                    println!("Cached snapshot ({} jobs):", jobs.len());
                }
                print_jobs(&jobs, json);
                0
            }
            None => {
                eprintln!("No cached snapshot. Run `fleetmap refresh` first.");
                1
            }
        },

        Commands::Advance { id } => {
            if dispatcher.load_cached() == 0 {
                eprintln!("No cached snapshot. Run `fleetmap refresh` first.");
                return 1;
            }
            match dispatcher.advance_stage(id).await {
                Ok(()) => {
                    println!("Job {id} advanced and removed from the snapshot.");
                    0
                }
                Err(e) => {
                    eprintln!("Advance failed: {e}");
                    20
                }
            }
        }

        Commands::SetAddress { id, address } => {
            if dispatcher.load_cached() == 0 {
                eprintln!("No cached snapshot. Run `fleetmap refresh` first.");
                return 1;
            }
            match dispatcher.update_address(id, &address).await {
                Ok(()) => {
                    println!("Address updated and re-geocoded for job {id}.");
                    0
                }
                Err(e) => {
                    eprintln!("Address update failed: {e}");
                    30
                }
            }
        }

        Commands::Advise { id } => {
            if dispatcher.load_cached() == 0 {
                eprintln!("No cached snapshot. Run `fleetmap refresh` first.");
                return 1;
            }
            match dispatcher.advice_for(id).await {
                Ok(text) => {
                    println!("{text}");
                    0
                }
                Err(e) => {
                    eprintln!("Advisory failed: {e}");
                    1
                }
            }
        }

        // Handled before dispatcher construction
        Commands::Verify => 0,
    }
}

fn run_verify(config: &AppConfig) {
    println!("Configuration valid.");
    println!();
    println!("  CRM base URL: {}", config.crm_base_url);
    println!("  Geocoder: {} (countries: {})", config.geocoder_base_url, config.country_codes);
    println!("  Record limit: {}", config.record_limit);
    println!("  Snapshot: {}", config.snapshot_path().display());
    println!();
    println!("  Transport boards: {}", config.classify.transport.board_keywords.join(", "));
    println!(
        "  Transport active phases: {}",
        config.classify.transport.active_phase_keywords.join(", ")
    );
    println!("  Service boards: {}", config.classify.service.board_keywords.join(", "));
    println!(
        "  Service active phases: {}",
        config.classify.service.active_phase_keywords.join(", ")
    );
    println!();
    println!(
        "  Transport done phase: {} (board: {})",
        config.advance.transport.phase_keywords.join(", "),
        config.advance.transport.board_keywords.join(", ")
    );
    println!(
        "  Service done phase: {} (board: {})",
        config.advance.service.phase_keywords.join(", "),
        config.advance.service.board_keywords.join(", ")
    );
}

fn print_jobs(jobs: &[Job], json: bool) {
    if json {
        match serde_json::to_string_pretty(jobs) {
            Ok(out) => println!("{out}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
        return;
    }

    for job in jobs {
        println!("  [{}] {} ({})", job.id, job.title, job.job_type);
        println!(
            "    Client: {}{}",
            job.client_name,
            job.phone.as_deref().map(|p| format!(" ({p})")).unwrap_or_default()
        );
        if !job.address.is_empty() {
            println!("    Address: {}", job.address);
        }
        println!("    Phase: {}", job.phase_name);
        match (&job.coordinates, &job.status) {
            (Some(point), _) => println!("    Coords: {:.4}, {:.4}", point.lat, point.lng),
            (None, JobStatus::GeocodingError) => {
                println!("    Coords: UNRESOLVED (fix with `fleetmap set-address {} ...`)", job.id)
            }
            (None, _) => println!("    Coords: none"),
        }
    }
}
