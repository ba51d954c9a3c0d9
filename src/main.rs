//! ramp-delay - departure delay attribution from ramp exports
//!
//! # Usage
//!
//! ```bash
//! # Summary for the first day in the data
//! ramp-delay --ramp 2025_01_RAMP.csv --ramp 2025_02_RAMP.csv
//!
//! # All *RAMP*.csv in a directory, statistical policy, one hour as JSON
//! ramp-delay --ramp data/ --policy sigma-gated --date 2025-01-14 --hour 8 --json
//!
//! # Place flights on stands
//! ramp-delay --ramp data/ --stands rksi_stands.csv --date 2025-01-14 --hour 8
//!
//! # Hourly departures next to AMOS weather and snow observations
//! ramp-delay --ramp data/ --weather AMOS_RKSI_2025.csv --snow snow_AMOS_RKSI_2025.csv --date 2025-01-14
//! ```
//!
//! # Environment Variables
//!
//! - `RAMP_DELAY_CONFIG`: Path to config TOML (default: ./ramp_delay.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use ramp_delay::config::{self, defaults::DEFAULT_LOG_FILTER, PipelineConfig};
use ramp_delay::ingest;
use ramp_delay::report::{self, CauseBreakdown, HourlyProfile, TimeBasis};
use ramp_delay::stands::{join_stands, StandTable};
use ramp_delay::weather::{DayConditions, WeatherObservation};
use ramp_delay::{BatchOutput, ClassificationPolicy, FlightRecord, Pipeline};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "ramp-delay")]
#[command(about = "Attribute departure delays to gate or taxiway from ramp exports")]
#[command(version)]
struct CliArgs {
    /// Ramp export CSV, or a directory scanned for *RAMP*.csv (repeatable)
    #[arg(long, value_name = "CSV", required = true, num_args = 1..)]
    ramp: Vec<PathBuf>,

    /// Stand table CSV with Stand_ID, Zone, Lat, Lon columns
    #[arg(long, value_name = "CSV")]
    stands: Option<PathBuf>,

    /// Hourly AMOS weather observations CSV (일시, 풍속(KT), 시정(m), ...)
    #[arg(long, value_name = "CSV")]
    weather: Option<PathBuf>,

    /// Snow observations CSV with an 일시 column
    #[arg(long, value_name = "CSV", requires = "weather")]
    snow: Option<PathBuf>,

    /// Config TOML (overrides RAMP_DELAY_CONFIG and ./ramp_delay.toml)
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,

    /// Classification policy: dual-threshold, total-delay-primary, sigma-gated
    #[arg(long)]
    policy: Option<ClassificationPolicy>,

    /// Day to report (default: first day in the data)
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    /// Hour of the day to list flights for
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
    hour: Option<u32>,

    /// Timestamp used to place flights on the timeline
    #[arg(long, default_value = "scheduled")]
    basis: TimeBasis,

    /// Print the selected records as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut pipeline_config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::load(),
    };
    if let Some(policy) = args.policy {
        pipeline_config.classification.policy = policy;
    }
    info!(
        airport = %pipeline_config.airport.icao,
        policy = %pipeline_config.classification.policy,
        "Configuration ready"
    );
    config::init(pipeline_config);

    let files = expand_inputs(&args.ramp)?;
    let rows = ingest::load_files(&files).context("No ramp data loaded")?;

    let output = Pipeline::from_global().run(&rows);

    let Some((first_day, last_day)) = report::date_range(&output.records) else {
        warn!("No record has a usable schedule date; nothing to report");
        return print_summary_only(&output, args.json);
    };
    let day = args.date.unwrap_or(first_day);
    if day < first_day || day > last_day {
        warn!(%day, %first_day, %last_day, "Selected day is outside the data range");
    }

    let selected: Vec<&FlightRecord> = match args.hour {
        Some(hour) => report::select_hour(&output.records, day, hour, args.basis),
        None => report::select_day(&output.records, day, args.basis),
    };

    let stands = args
        .stands
        .as_deref()
        .map(load_stands)
        .transpose()?;

    let conditions = match &args.weather {
        Some(path) => {
            let weather = load_observations(path, "weather")?;
            let snow = match &args.snow {
                Some(snow_path) => load_observations(snow_path, "snow")?,
                None => Vec::new(),
            };
            let day_records = report::select_day(&output.records, day, args.basis);
            let profile = HourlyProfile::build(day_records.iter().copied(), args.basis);
            let conditions = DayConditions::align(day, &profile, &weather, &snow);
            if !conditions.has_weather() {
                warn!(%day, "No weather observations for the selected day");
            }
            Some(conditions)
        }
        None => None,
    };

    if args.json {
        let records = match &stands {
            Some(table) => serde_json::to_value(join_stands(selected.iter().copied(), table)),
            None => serde_json::to_value(&selected),
        }
        .context("Failed to serialize records")?;
        let json = match &conditions {
            Some(conditions) => serde_json::json!({ "records": records, "conditions": conditions }),
            None => records,
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    print_batch(&output);
    match &conditions {
        Some(conditions) => print_conditions(&output.records, conditions),
        None => print_day(&output.records, day, args.basis),
    }

    if let Some(hour) = args.hour {
        println!();
        println!("Flights at {day} {hour:02}:00 ({} basis): {}", args.basis, selected.len());
        for r in &selected {
            println!(
                "  {:<8} stand {:<5} {:<4} ramp {:>6.1}  taxi {:>6.1}  total {:>6.1}  {}",
                r.flight_id(),
                r.stand_id(),
                r.status(),
                r.metrics.ramp_delay_minutes,
                r.metrics.taxi_time_minutes,
                r.metrics.total_delay_minutes,
                r.delay_cause
            );
        }
    }

    if let Some(table) = &stands {
        let placed = join_stands(selected.iter().copied(), table);
        let mut by_zone: BTreeMap<&str, CauseBreakdown> = BTreeMap::new();
        for p in &placed {
            by_zone.entry(p.stand.zone.as_str()).or_default().add(p.record.delay_cause);
        }
        println!();
        println!("Placed on stands: {} of {}", placed.len(), selected.len());
        for (zone, breakdown) in by_zone {
            println!("  {zone:<10} {breakdown}");
        }
    }

    Ok(())
}

/// Directories expand to the `*RAMP*.csv` files they contain.
fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = ingest::find_ramp_files(input)?;
            if found.is_empty() {
                warn!(dir = %input.display(), "No *RAMP*.csv files in directory");
            }
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn load_stands(path: &Path) -> Result<StandTable> {
    let rows = ingest::load_table(path)
        .with_context(|| format!("Failed to load stand table {}", path.display()))?;
    let table = StandTable::from_rows(&rows);
    info!(stands = table.len(), "Stand table loaded");
    Ok(table)
}

fn load_observations(path: &Path, kind: &str) -> Result<Vec<WeatherObservation>> {
    let observations = ingest::load_weather(path)
        .with_context(|| format!("Failed to load {kind} observations {}", path.display()))?;
    info!(kind, observations = observations.len(), "Observations loaded");
    Ok(observations)
}

fn print_summary_only(output: &BatchOutput, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&output.summary)?);
    } else {
        print_batch(output);
    }
    Ok(())
}

fn print_batch(output: &BatchOutput) {
    println!("{}", output.summary);
    println!();
    println!("Monthly taxi baselines (default limit {:.1} min):", output.baseline.default_taxi_limit());
    for stats in output.baseline.iter() {
        match (stats.std_minutes, stats.sigma1_limit) {
            (Some(std), Some(limit)) => println!(
                "  {}  n={:<6} mean {:>6.1}  σ {:>6.1}  limit {:>6.1}  median {:>6.1}",
                stats.month, stats.sample_count, stats.mean_minutes, std, limit, stats.median_minutes
            ),
            _ => println!(
                "  {}  n={:<6} mean {:>6.1}  (too few samples, default limit applies)",
                stats.month, stats.sample_count, stats.mean_minutes
            ),
        }
    }
}

fn print_day(records: &[FlightRecord], day: NaiveDate, basis: TimeBasis) {
    let day_records = report::select_day(records, day, basis);
    let breakdown = CauseBreakdown::from_records(day_records.iter().copied());
    let profile = HourlyProfile::build(day_records.iter().copied(), basis);

    println!();
    println!("{day} ({basis} basis): {} flights", day_records.len());
    println!("  {breakdown}");
    println!("  hour  flights  DLA  ATD-RAM");
    for bucket in profile.active() {
        println!(
            "  {:02}    {:>7}  {:>3}  {:>7}",
            bucket.hour,
            bucket.flights,
            bucket.delayed,
            fmt_opt(bucket.mean_atd_ram_minutes, 1)
        );
    }
}

fn print_conditions(records: &[FlightRecord], conditions: &DayConditions) {
    let day_records = report::select_day(records, conditions.date, conditions.basis);
    let breakdown = CauseBreakdown::from_records(day_records.iter().copied());

    println!();
    println!("{} ({} basis): {} flights", conditions.date, conditions.basis, day_records.len());
    println!("  {breakdown}");
    if conditions.snow_hours.is_empty() {
        println!("  No snow observed");
    } else {
        let hours: Vec<String> = conditions.snow_hours.iter().map(|h| format!("{h:02}")).collect();
        println!("  Snow observed at hours: {}", hours.join(", "));
    }
    println!("  hour  flights  DLA  ATD-RAM  wind kt  vis m   temp C  precip mm  snow");
    for h in conditions.active() {
        let w = h.weather.as_ref();
        println!(
            "  {:02}    {:>7}  {:>3}  {:>7}  {:>7}  {:>6}  {:>6}  {:>9}  {}",
            h.hour,
            h.flights,
            h.delayed,
            fmt_opt(h.mean_atd_ram_minutes, 1),
            fmt_opt(w.and_then(|w| w.wind_speed_kt), 1),
            fmt_opt(w.and_then(|w| w.visibility_m), 0),
            fmt_opt(w.and_then(|w| w.temperature_c), 1),
            fmt_opt(w.and_then(|w| w.precipitation_mm), 1),
            if h.snow { "*" } else { "" }
        );
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}
