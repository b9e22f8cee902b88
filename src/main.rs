//! CLI entry point for the transit delay pipeline.
//!
//! Provides subcommands for merging raw traffic and weather snapshots into
//! canonical datasets and for printing analysis results as JSON.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_delays::analyzers::aggregate::{
    delay_stats_by_timestamp, delay_stats_for_category, summarize_by, weather_by_day_type,
};
use transit_delays::analyzers::analyzer::{
    annotate_day_types, load_canonical_traffic, load_canonical_weather,
};
use transit_delays::analyzers::correlation::build_correlation_matrix;
use transit_delays::analyzers::day_type::PolishHolidays;
use transit_delays::analyzers::regression::{fit_linear_model, regression_frame};
use transit_delays::config::AppConfig;
use transit_delays::merge::{merge_traffic, merge_weather};
use transit_delays::normalize::parse_timestamp;
use transit_delays::output::to_json;
use transit_delays::records::{TrafficRecord, WeatherRecord};
use transit_delays::schema::{Metric, TrafficCategory};

#[derive(Parser)]
#[command(name = "transit_delays")]
#[command(about = "Merge and analyse public transport delays against the weather", long_about = None)]
struct Cli {
    /// Canonical traffic dataset (defaults to the configured merged path)
    #[arg(long, global = true)]
    traffic: Option<PathBuf>,

    /// Canonical weather dataset (defaults to the configured merged path)
    #[arg(long, global = true)]
    weather: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge hourly traffic snapshots into one dataset
    MergeTraffic {
        /// First hour to include, e.g. "2024-12-08 00:00"
        #[arg(long, value_parser = parse_hour)]
        start: Option<NaiveDateTime>,

        /// Last hour to include
        #[arg(long, value_parser = parse_hour)]
        end: Option<NaiveDateTime>,

        /// Root of the YYYY/MM/DD/delays-HH.csv tree
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge every weather CSV below a directory into one dataset
    MergeWeather {
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delay distribution per value of a category
    Summary {
        #[arg(long, value_enum)]
        by: TrafficCategory,
    },
    /// Delay and weather distributions per type of day
    DayTypes,
    /// Correlation matrix of weather and hourly delay statistics
    Correlate,
    /// Least squares fit of an hourly delay metric on the weather
    Predict {
        #[arg(long, value_enum, default_value = "mean")]
        metric: Metric,

        /// Restrict the delays to one category value
        #[arg(long, value_enum, requires = "value")]
        category: Option<TrafficCategory>,

        #[arg(long, requires = "category")]
        value: Option<String>,
    },
}

fn parse_hour(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_timestamp(raw).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_delays.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_delays.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;

    let traffic_path = cli
        .traffic
        .clone()
        .unwrap_or_else(|| config.traffic.merged_path.clone());
    let weather_path = cli
        .weather
        .clone()
        .unwrap_or_else(|| config.weather.merged_path.clone());

    match cli.command {
        Commands::MergeTraffic {
            start,
            end,
            raw_dir,
            output,
        } => {
            let raw_dir = raw_dir.unwrap_or(config.traffic.raw_dir);
            let output = output.unwrap_or(traffic_path);
            let summary = merge_traffic(
                &raw_dir,
                start.unwrap_or(config.traffic.start),
                end.unwrap_or(config.traffic.end),
                &output,
                &config.schema,
            )
            .with_context(|| format!("merging traffic snapshots from {}", raw_dir.display()))?;
            print_json(&summary)?;
        }
        Commands::MergeWeather { raw_dir, output } => {
            let raw_dir = raw_dir.unwrap_or(config.weather.raw_dir);
            let output = output.unwrap_or(weather_path);
            let summary = merge_weather(&raw_dir, &output, &config.schema)
                .with_context(|| format!("merging weather snapshots from {}", raw_dir.display()))?;
            print_json(&summary)?;
        }
        Commands::Summary { by } => {
            let (traffic, _) = load_annotated(&traffic_path, &weather_path)?;
            print_json(&summarize_by(&traffic, by))?;
        }
        Commands::DayTypes => {
            let (traffic, weather) = load_annotated(&traffic_path, &weather_path)?;
            print_json(&DayTypeReport {
                traffic: summarize_by(&traffic, TrafficCategory::DayType),
                weather: weather_by_day_type(&weather),
            })?;
        }
        Commands::Correlate => {
            let (traffic, weather) = load_annotated(&traffic_path, &weather_path)?;
            let stats = delay_stats_by_timestamp(&traffic);
            let matrix = build_correlation_matrix(&weather, &stats)?;
            info!(observations = matrix.observations, "Correlation matrix built");
            print_json(&matrix)?;
        }
        Commands::Predict {
            metric,
            category,
            value,
        } => {
            let (traffic, weather) = load_annotated(&traffic_path, &weather_path)?;
            let stats = match (category, value.as_deref()) {
                (Some(category), Some(value)) => delay_stats_for_category(&traffic, category, value),
                _ => delay_stats_by_timestamp(&traffic),
            };
            let frame = regression_frame(&weather, &stats, metric)?;
            let fit = fit_linear_model(&frame.covariates, &frame.target);
            info!(
                metric = metric.canonical_name(),
                observations = fit.observations,
                "Linear model fitted"
            );

            let rows = frame
                .timestamps
                .iter()
                .zip(&frame.target)
                .zip(&fit.predictions)
                .map(|((timestamp, actual), fitted)| FittedRow {
                    timestamp: *timestamp,
                    actual: *actual,
                    fitted: *fitted,
                })
                .collect();
            print_json(&PredictReport {
                metric,
                trend_level: fit.trend_level(),
                coefficients: fit.coefficients,
                intercept: fit.intercept,
                observations: fit.observations,
                rows,
            })?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct DayTypeReport {
    traffic: Vec<transit_delays::analyzers::types::CategorySummary>,
    weather: Vec<transit_delays::analyzers::types::WeatherDayTypeSummary>,
}

#[derive(Serialize)]
struct FittedRow {
    timestamp: NaiveDateTime,
    actual: Option<f64>,
    fitted: Option<f64>,
}

#[derive(Serialize)]
struct PredictReport {
    metric: Metric,
    coefficients: Option<[f64; 5]>,
    intercept: Option<f64>,
    trend_level: Option<f64>,
    observations: usize,
    rows: Vec<FittedRow>,
}

/// Loads both canonical datasets and classifies their days.
fn load_annotated(
    traffic_path: &Path,
    weather_path: &Path,
) -> Result<(Vec<TrafficRecord>, Vec<WeatherRecord>)> {
    let mut traffic = load_canonical_traffic(traffic_path)
        .with_context(|| format!("loading {}", traffic_path.display()))?;
    let mut weather = load_canonical_weather(weather_path)
        .with_context(|| format!("loading {}", weather_path.display()))?;
    let holidays = annotate_day_types(&mut traffic, &mut weather, &PolishHolidays);
    info!(holidays = holidays.len(), "Day types annotated");
    Ok((traffic, weather))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}
