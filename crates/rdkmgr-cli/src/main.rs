//! rdkmgr - radio station and program catalog CLI.

/// Application configuration (TOML).
mod config;
/// Terminal UI components.
mod tui;

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Timelike};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, resolve_config_path, resolve_enabled_path};
use crate::tui::run_station_selector;
use crate::tui::state::StationEntry;
use rdkmgr_db::{
    Program, ProgramListing, Station, load_airing, load_airing_for_station,
    load_enabled_stations, load_station, load_stations, open_db, reset_db,
    save_enabled_stations, search_programs, upsert_programs, upsert_stations,
};
use rdkmgr_radish::{
    InvocationContract, ProgramRow, RadishProbe, ScanProgress, StationRef, StationRow,
    fetch_program_table, fetch_station_list, find_playing_station, scan_stations,
    start_playback, stop_playback,
};

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config/data directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Local database operations.
    Db(DbCommand),
    /// Station catalog and enabled-station list.
    Stations(StationsCommand),
    /// Program schedule queries.
    Programs(ProgramsCommand),
    /// Start background playback of a station.
    Play(PlayArgs),
    /// Stop playback.
    Stop,
    /// Show the program on the station being played.
    NowPlaying(AtArgs),
    /// Print a shell completion script.
    Completions(CompletionsArgs),
}

/// Arguments for the `db` subcommand.
#[derive(clap::Args)]
struct DbCommand {
    /// Db subcommand to run.
    #[command(subcommand)]
    command: DbSubcommands,
}

/// Available database subcommands.
#[derive(Subcommand)]
enum DbSubcommands {
    /// Drop and recreate all tables.
    Init(DbInitArgs),
    /// Import the station list from the play script.
    ImportStations,
    /// Import the program schedule from the schedule command.
    ImportPrograms,
}

/// Arguments for the `db init` subcommand.
#[derive(clap::Args)]
struct DbInitArgs {
    /// Skip the confirmation prompt.
    #[arg(short, long)]
    force: bool,
}

/// Arguments for the `stations` subcommand.
#[derive(clap::Args)]
struct StationsCommand {
    /// Stations subcommand to run.
    #[command(subcommand)]
    command: StationsSubcommands,
}

/// Available stations subcommands.
#[derive(Subcommand)]
enum StationsSubcommands {
    /// List catalog stations.
    List(StationsListArgs),
    /// Probe stations and rewrite the enabled list with the reachable ones.
    Scan(ScanArgs),
    /// Show the enabled-station list.
    Enabled,
    /// Interactively edit the enabled-station list via TUI.
    Select,
}

/// Arguments for the `stations list` subcommand.
#[derive(clap::Args)]
struct StationsListArgs {
    /// Service to list (default: the configured service).
    #[arg(long)]
    service: Option<String>,
}

/// Arguments for the `stations scan` subcommand.
#[derive(clap::Args)]
struct ScanArgs {
    /// Maximum concurrent probes (default: `probe.max_workers`).
    #[arg(long)]
    workers: Option<usize>,

    /// Per-probe timeout in seconds (default: `probe.timeout_secs`).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Probe the stations in the local catalog instead of the live station list.
    #[arg(long)]
    from_db: bool,
}

/// Arguments for the `programs` subcommand.
#[derive(clap::Args)]
struct ProgramsCommand {
    /// Programs subcommand to run.
    #[command(subcommand)]
    command: ProgramsSubcommands,
}

/// Available programs subcommands.
#[derive(Subcommand)]
enum ProgramsSubcommands {
    /// Programs on air now on the enabled stations.
    Now(AtArgs),
    /// Search titles, personalities and descriptions.
    Search(SearchArgs),
}

/// Wall-clock override shared by the "on air" queries.
#[derive(clap::Args)]
struct AtArgs {
    /// Query time instead of now.
    /// Formats: "2024-01-01 09:15", "2024-01-01T09:15:30".
    #[arg(long, value_parser = parse_at)]
    at: Option<NaiveDateTime>,
}

/// Arguments for the `programs search` subcommand.
#[derive(clap::Args)]
struct SearchArgs {
    /// Keyword (substring match).
    keyword: String,
}

/// Arguments for the `play` subcommand.
#[derive(clap::Args)]
struct PlayArgs {
    /// Station ID (e.g. "TBS").
    station_id: String,
}

/// Arguments for the `completions` subcommand.
#[derive(clap::Args)]
struct CompletionsArgs {
    /// Target shell.
    shell: Shell,
}

/// Parses an `--at` value.
fn parse_at(s: &str) -> std::result::Result<NaiveDateTime, String> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("invalid time {s:?}: expected YYYY-MM-DD HH:MM[:SS]"))
}

/// Resolves the query time: `--at` or the local wall clock, at second granularity.
fn resolve_now(at: Option<NaiveDateTime>) -> NaiveDateTime {
    let now = at.unwrap_or_else(|| chrono::Local::now().naive_local());
    now.with_nanosecond(0).unwrap_or(now)
}

/// Loads the config for `dir`.
fn load_config(dir: Option<&Path>) -> Result<AppConfig> {
    let config_path = resolve_config_path(dir).context("failed to resolve config path")?;
    AppConfig::load(&config_path).context("failed to load config")
}

/// Converts a station-list row to a catalog row.
fn to_station(row: StationRow) -> Station {
    Station {
        station_id: row.station_id,
        service: row.service,
        name: row.name,
    }
}

/// Converts a schedule row to a catalog row.
fn to_program(row: ProgramRow) -> Program {
    Program {
        station_id: row.station_id,
        prog_id: row.prog_id,
        date: row.date,
        weekday: row.weekday,
        start_time: row.start_time,
        duration_min: row.duration_min,
        title: row.title,
        url: row.url,
        personality: row.personality,
        info: row.info,
    }
}

/// Formats the `HH:MM-HH:MM` air slot of a program.
fn slot_label(program: &Program) -> String {
    program.air_window().map_or_else(
        || program.start_label(),
        |(start, end)| format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
    )
}

/// Logs one "on air" row.
fn log_listing(listing: &ProgramListing) {
    let p = &listing.program;
    tracing::info!(
        "{}\t{}\t{}\t{}\t{}",
        p.station_id,
        listing.station_name,
        slot_label(p),
        p.title,
        p.personality,
    );
}

/// Asks a y/N question on stdin. Anything but `y`/`yes` is a no.
fn confirm(prompt: &str) -> Result<bool> {
    tracing::info!("{prompt} [y/N]");
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read answer")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Runs the `db init` subcommand.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or reset.
#[instrument(skip_all)]
fn run_db_init(args: &DbInitArgs, dir: Option<&Path>) -> Result<()> {
    if !args.force
        && !confirm("This deletes every imported station and program. Continue?")?
    {
        tracing::info!("Aborted");
        return Ok(());
    }

    let conn = open_db(dir).context("failed to open database")?;
    reset_db(&conn).context("failed to reset database")?;
    tracing::info!("Database initialized");
    Ok(())
}

/// Runs the `db import-stations` subcommand.
///
/// # Errors
///
/// Returns an error if the station-list command fails or the database
/// cannot be written.
#[instrument(skip_all)]
async fn run_db_import_stations(dir: Option<&Path>) -> Result<()> {
    let config = load_config(dir)?;
    let radish = config.radish_config();

    tracing::info!("Fetching station list ({})...", radish.service);
    let list = fetch_station_list(&radish)
        .await
        .context("failed to fetch station list")?;
    if list.skipped > 0 {
        tracing::warn!(skipped = list.skipped, "Skipped malformed station lines");
    }

    let stations: Vec<Station> = list.stations.into_iter().map(to_station).collect();
    let conn = open_db(dir).context("failed to open database")?;
    let report = upsert_stations(&conn, &stations).context("failed to upsert stations")?;

    tracing::info!(
        "Imported {} stations ({} skipped, {} other services, {} failed)",
        report.upserted,
        list.skipped,
        list.filtered,
        report.failed,
    );
    Ok(())
}

/// Runs the `db import-programs` subcommand.
///
/// # Errors
///
/// Returns an error if the schedule command fails, its header is invalid,
/// or the database cannot be written.
#[instrument(skip_all)]
async fn run_db_import_programs(dir: Option<&Path>) -> Result<()> {
    let config = load_config(dir)?;
    let radish = config.radish_config();

    tracing::info!("Fetching program schedule...");
    let table = fetch_program_table(&radish)
        .await
        .context("failed to import programs")?;

    let programs: Vec<Program> = table.programs.into_iter().map(to_program).collect();
    let conn = open_db(dir).context("failed to open database")?;
    let report = upsert_programs(&conn, &programs).context("failed to upsert programs")?;

    tracing::info!(
        "Imported {} programs ({} skipped, {} errors, {} failed)",
        report.upserted,
        table.skipped,
        table.errors,
        report.failed,
    );
    Ok(())
}

/// Runs the `stations list` subcommand.
///
/// # Errors
///
/// Returns an error if config or DB operations fail.
#[instrument(skip_all)]
fn run_stations_list(args: &StationsListArgs, dir: Option<&Path>) -> Result<()> {
    let config = load_config(dir)?;
    let service = args
        .service
        .clone()
        .unwrap_or_else(|| config.radish.service.clone());

    let conn = open_db(dir).context("failed to open database")?;
    let stations = load_stations(&conn, Some(&service)).context("failed to load stations")?;

    if stations.is_empty() {
        tracing::info!("No {service} stations in database. Run `db import-stations` first.");
        return Ok(());
    }

    tracing::info!("ID\t\tName");
    for s in &stations {
        tracing::info!("{:<12}\t{}", s.station_id, s.name);
    }
    tracing::info!("Total: {} stations", stations.len());
    Ok(())
}

/// Collects the stations to probe, from the catalog or the live list.
async fn scan_targets(
    from_db: bool,
    config: &AppConfig,
    dir: Option<&Path>,
) -> Result<Vec<StationRef>> {
    if from_db {
        let conn = open_db(dir).context("failed to open database")?;
        let stations = load_stations(&conn, Some(&config.radish.service))
            .context("failed to load stations")?;
        return Ok(stations
            .into_iter()
            .map(|s| StationRef {
                station_id: s.station_id,
                name: s.name,
            })
            .collect());
    }

    let list = fetch_station_list(&config.radish_config())
        .await
        .context("failed to fetch station list")?;
    Ok(list
        .stations
        .into_iter()
        .map(|s| StationRef {
            station_id: s.station_id,
            name: s.name,
        })
        .collect())
}

/// Logs one scan progress event.
fn log_progress(progress: &ScanProgress) {
    let next = progress
        .submitted
        .as_ref()
        .map_or_else(String::new, |s| format!(" (next: {} {})", s.station_id, s.name));
    tracing::info!(
        "[{}/{}] {} {}: {}{}",
        progress.completed,
        progress.total,
        progress.finished.station_id,
        progress.finished.name,
        progress.outcome.label(),
        next,
    );
}

/// Runs the `stations scan` subcommand.
///
/// Ctrl-C stops the scan; the enabled list is only rewritten when the scan
/// ran to completion.
///
/// # Errors
///
/// Returns an error if the station list cannot be obtained or the enabled
/// list cannot be written.
#[instrument(skip_all)]
async fn run_stations_scan(args: &ScanArgs, dir: Option<&Path>) -> Result<()> {
    let config = load_config(dir)?;
    let mut probe_config = config.probe_config();
    if let Some(workers) = args.workers {
        probe_config.max_workers = workers;
    }
    if let Some(secs) = args.timeout_secs {
        probe_config.timeout = Duration::from_secs(secs);
    }
    let workers = probe_config.max_workers;

    let targets = scan_targets(args.from_db, &config, dir).await?;
    if targets.is_empty() {
        tracing::warn!("No stations to probe");
        return Ok(());
    }

    tracing::info!(
        "Probing {} stations ({} at a time, {}s timeout)...",
        targets.len(),
        workers,
        probe_config.timeout.as_secs(),
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping probes...");
                cancel.cancel();
            }
        })
    };

    let probe = Arc::new(RadishProbe::new(config.radish_config(), probe_config));
    let report = scan_stations(probe, targets, workers, &cancel, log_progress).await;
    interrupt.abort();

    if cancel.is_cancelled() {
        tracing::warn!("Scan cancelled; enabled list left unchanged");
        return Ok(());
    }

    let path = resolve_enabled_path(dir)?;
    save_enabled_stations(&path, &report.reachable)?;
    tracing::info!(
        "Found {} reachable of {} stations; saved to {}",
        report.reachable.len(),
        report.outcomes.len(),
        path.display()
    );
    Ok(())
}

/// Runs the `stations enabled` subcommand.
///
/// # Errors
///
/// Returns an error if the enabled list or the database cannot be read.
#[instrument(skip_all)]
fn run_stations_enabled(dir: Option<&Path>) -> Result<()> {
    let path = resolve_enabled_path(dir)?;
    let ids = load_enabled_stations(&path)?;
    if ids.is_empty() {
        tracing::info!("No enabled stations. Run `stations scan` or `stations select` first.");
        return Ok(());
    }

    let conn = open_db(dir).context("failed to open database")?;
    tracing::info!("Enabled stations ({}):", ids.len());
    for id in &ids {
        let name = load_station(&conn, id)?.map_or_else(|| String::from("(unknown)"), |s| s.name);
        tracing::info!("  {:<12}  {}", id, name);
    }
    Ok(())
}

/// Runs the `stations select` subcommand.
///
/// # Errors
///
/// Returns an error if config, DB, TUI or file operations fail.
#[instrument(skip_all)]
fn run_stations_select(dir: Option<&Path>) -> Result<()> {
    let config = load_config(dir)?;
    let conn = open_db(dir).context("failed to open database")?;
    let stations =
        load_stations(&conn, Some(&config.radish.service)).context("failed to load stations")?;
    if stations.is_empty() {
        tracing::info!("No stations in database. Run `db import-stations` first.");
        return Ok(());
    }

    let path = resolve_enabled_path(dir)?;
    let initial: BTreeSet<String> = load_enabled_stations(&path)?.into_iter().collect();
    let entries: Vec<StationEntry> = stations
        .into_iter()
        .map(|s| StationEntry {
            station_id: s.station_id,
            name: s.name,
        })
        .collect();

    tracing::info!("Loaded {} stations. Launching TUI...", entries.len());

    let result = run_station_selector(entries, initial).context("station selector TUI failed")?;

    if let Some(selected) = result {
        save_enabled_stations(&path, &selected)?;
        tracing::info!(
            "Saved {} enabled station(s) to {}",
            selected.len(),
            path.display()
        );
    } else {
        tracing::info!("Selection cancelled");
    }
    Ok(())
}

/// Runs the `programs now` subcommand.
///
/// # Errors
///
/// Returns an error if the enabled list or the database cannot be read.
#[instrument(skip_all)]
fn run_programs_now(args: &AtArgs, dir: Option<&Path>) -> Result<()> {
    let now = resolve_now(args.at);
    let ids = load_enabled_stations(&resolve_enabled_path(dir)?)?;
    if ids.is_empty() {
        tracing::info!("No enabled stations. Run `stations scan` first.");
        return Ok(());
    }

    let conn = open_db(dir).context("failed to open database")?;
    let airing = load_airing(&conn, &ids, now).context("failed to load programs")?;

    if airing.is_empty() {
        tracing::info!("No programs on air at {}", now.format("%Y-%m-%d %H:%M:%S"));
        return Ok(());
    }

    tracing::info!("On air at {}:", now.format("%Y-%m-%d %H:%M:%S"));
    for listing in &airing {
        log_listing(listing);
    }
    Ok(())
}

/// Runs the `programs search` subcommand.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
fn run_programs_search(args: &SearchArgs, dir: Option<&Path>) -> Result<()> {
    let conn = open_db(dir).context("failed to open database")?;
    let results = search_programs(&conn, &args.keyword).context("failed to search programs")?;

    if results.is_empty() {
        tracing::info!("No programs match {:?}", args.keyword);
        return Ok(());
    }

    for listing in &results {
        let p = &listing.program;
        tracing::info!(
            "{} {}\t{}\t{}\t{}\t{}",
            p.date_label(),
            p.weekday,
            slot_label(p),
            listing.station_name,
            p.title,
            p.personality,
        );
    }
    tracing::info!("Total: {} programs", results.len());
    Ok(())
}

/// Runs the `play` subcommand.
///
/// # Errors
///
/// Returns an error if the play script cannot be launched.
#[instrument(skip_all)]
fn run_play(args: &PlayArgs, dir: Option<&Path>) -> Result<()> {
    let config = load_config(dir)?;

    let name = open_db(dir)
        .ok()
        .and_then(|conn| load_station(&conn, &args.station_id).ok().flatten())
        .map(|s| s.name);
    if name.is_none() {
        tracing::warn!(station_id = %args.station_id, "Station is not in the catalog");
    }

    let pid = start_playback(&config.radish_config(), &args.station_id)
        .with_context(|| format!("failed to start playback of {}", args.station_id))?;
    tracing::info!(
        "Playing {} {} (pid {pid})",
        args.station_id,
        name.unwrap_or_default()
    );
    Ok(())
}

/// Runs the `stop` subcommand.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded.
#[instrument(skip_all)]
fn run_stop(dir: Option<&Path>) -> Result<()> {
    let config = load_config(dir)?;
    let player = config.player_config();
    let stopped = stop_playback(&player);
    if stopped == 0 {
        tracing::info!("Nothing is playing");
    } else {
        tracing::info!("Stopped {stopped} {} process(es)", player.process_name);
    }
    Ok(())
}

/// Runs the `now-playing` subcommand.
///
/// # Errors
///
/// Returns an error if the config or database cannot be read.
#[instrument(skip_all)]
fn run_now_playing(args: &AtArgs, dir: Option<&Path>) -> Result<()> {
    let config = load_config(dir)?;
    let contract = InvocationContract::for_script(&config.radish.play_script);
    let Some(station_id) = find_playing_station(&contract) else {
        tracing::info!("Nothing is playing");
        return Ok(());
    };

    let now = resolve_now(args.at);
    let conn = open_db(dir).context("failed to open database")?;
    match load_airing_for_station(&conn, &station_id, now).context("failed to load programs")? {
        Some(listing) => log_listing(&listing),
        None => tracing::info!("Playing {station_id}; no program information"),
    }
    Ok(())
}

/// Writes a completion script for `shell` to stdout.
fn run_completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    clap_complete::generate(args.shell, &mut cmd, "rdkmgr", &mut std::io::stdout());
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    let dir = cli.dir.as_deref();
    match cli.command {
        Commands::Db(db) => match db.command {
            DbSubcommands::Init(args) => run_db_init(&args, dir),
            DbSubcommands::ImportStations => run_db_import_stations(dir).await,
            DbSubcommands::ImportPrograms => run_db_import_programs(dir).await,
        },
        Commands::Stations(st) => match st.command {
            StationsSubcommands::List(args) => run_stations_list(&args, dir),
            StationsSubcommands::Scan(args) => run_stations_scan(&args, dir).await,
            StationsSubcommands::Enabled => run_stations_enabled(dir),
            StationsSubcommands::Select => run_stations_select(dir),
        },
        Commands::Programs(pr) => match pr.command {
            ProgramsSubcommands::Now(args) => run_programs_now(&args, dir),
            ProgramsSubcommands::Search(args) => run_programs_search(&args, dir),
        },
        Commands::Play(args) => run_play(&args, dir),
        Commands::Stop => run_stop(dir),
        Commands::NowPlaying(args) => run_now_playing(&args, dir),
        Commands::Completions(args) => {
            run_completions(&args);
            Ok(())
        }
    }
}
