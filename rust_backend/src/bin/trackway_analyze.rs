//! Trackway analysis command-line tool.
//!
//! Reads the detection log named in the configuration file and prints the
//! requested analysis as JSON on stdout.
//!
//! # Usage
//!
//! ```bash
//! trackway-analyze analyze [--config FILE] [START] [END]
//! trackway-analyze compare [--config FILE] START1 END1 START2 END2 [GRID.asc]
//! trackway-analyze habitat [--config FILE] [START] [END]
//! trackway-analyze similarity [--config FILE] REFERENCE.geojson [START] [END]
//! trackway-analyze export [--config FILE] OUTPUT.geojson [START] [END]
//! ```
//!
//! Without `--config`, `trackways.toml` is looked up in the current
//! directory, `rust_backend/` and the parent directory.
//!
//! Timestamps accept RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare date. Use `-`
//! to leave a bound open. `export` writes to stdout when OUTPUT is `-`.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)

use std::env;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use trackway_analysis::config::AnalysisConfig;
use trackway_analysis::core::domain::TimeWindow;
use trackway_analysis::io::{
    export_trackways_geojson, load_reference_trackways, trackways_geojson_string,
    write_intensity_grid,
};
use trackway_analysis::services::monitoring::temporal_analysis_of_snapshot;
use trackway_analysis::services::similarity::calculate_similarity;
use trackway_analysis::services::TrackwayAnalyzer;
use trackway_analysis::store::{CsvDetectionStore, DetectionSnapshot, DetectionStore};
use trackway_analysis::time::parse_time_window;

const USAGE: &str =
    "usage: trackway-analyze <analyze|compare|habitat|similarity|export> [--config FILE] [args...]";

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        bail!(USAGE);
    };
    let (config, rest) = match args.get(1).map(String::as_str) {
        Some("--config") => {
            let Some(path) = args.get(2) else {
                bail!("--config needs a file\n{}", USAGE);
            };
            let config = AnalysisConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path))?;
            info!("Loaded configuration from {}", path);
            (config, &args[3..])
        }
        _ => {
            let config = AnalysisConfig::from_default_location()
                .context("Failed to load trackways.toml from the default locations")?;
            info!("Loaded configuration from the default location");
            (config, &args[1..])
        }
    };

    match command {
        "analyze" => analyze(&config, rest),
        "compare" => compare(&config, rest),
        "habitat" => habitat(&config, rest),
        "similarity" => similarity(&config, rest),
        "export" => export(&config, rest),
        other => bail!("Unknown command '{}'\n{}", other, USAGE),
    }
}

fn bound(arg: Option<&String>) -> Option<&str> {
    arg.map(String::as_str).filter(|s| *s != "-")
}

fn window(start: Option<&String>, end: Option<&String>) -> Result<TimeWindow> {
    parse_time_window(bound(start), bound(end)).map_err(|e| anyhow::anyhow!(e))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Snapshot the detection log and check it against the loaded rasters.
fn read_snapshot(config: &AnalysisConfig, analyzer: &TrackwayAnalyzer) -> Result<DetectionSnapshot> {
    info!("Reading detections from {}", config.store.detections_path.display());
    let snapshot = CsvDetectionStore::new(&config.store.detections_path)
        .snapshot()
        .context("Failed to read detection log")?;
    analyzer.check_coverage(&snapshot)?;
    Ok(snapshot)
}

fn analyze(config: &AnalysisConfig, args: &[String]) -> Result<()> {
    let window = window(args.first(), args.get(1))?;
    let analyzer = TrackwayAnalyzer::from_settings(config).context("Failed to prepare analyzer")?;
    let snapshot = read_snapshot(config, &analyzer)?;

    let analysis = analyzer.analyze(&snapshot, &window);
    info!(
        "{} trackways accepted, {} candidates rejected",
        analysis.trackways.len(),
        analysis.stats.rejected()
    );
    print_json(&json!({
        "snapshot_checksum": snapshot.checksum,
        "analysis": analysis,
    }))
}

fn compare(config: &AnalysisConfig, args: &[String]) -> Result<()> {
    if args.len() < 4 {
        bail!("compare needs START1 END1 START2 END2\n{}", USAGE);
    }
    let window1 = window(args.first(), args.get(1))?;
    let window2 = window(args.get(2), args.get(3))?;

    let analyzer = TrackwayAnalyzer::from_settings(config).context("Failed to prepare analyzer")?;
    let snapshot = read_snapshot(config, &analyzer)?;
    let result = temporal_analysis_of_snapshot(&analyzer, &snapshot, &window1, &window2, config);
    if let Some(grid) = &result.intensity_grid {
        info!(
            "Intensity grid {}x{}: {} cells gained, {} lost",
            grid.width,
            grid.height,
            grid.gained_cells(),
            grid.lost_cells()
        );
    }

    if let Some(path) = args.get(4) {
        match &result.intensity_grid {
            Some(grid) => write_intensity_grid(grid, path)
                .with_context(|| format!("Failed to write intensity grid to {}", path))?,
            None => info!("No intensity grid to write"),
        }
    }
    print_json(&result)
}

fn habitat(config: &AnalysisConfig, args: &[String]) -> Result<()> {
    let window = window(args.first(), args.get(1))?;
    let analyzer = TrackwayAnalyzer::from_settings(config).context("Failed to prepare analyzer")?;
    let Some(correlator) = analyzer.habitat() else {
        bail!("habitat.habitat_raster must be set for the habitat command");
    };
    let snapshot = read_snapshot(config, &analyzer)?;
    let analysis = analyzer.analyze(&snapshot, &window);

    let impact = correlator.impact(&analysis.trackways);
    let pressure = if config.habitat.degradation_raster.is_some() {
        Some(correlator.pressure(&analysis.trackways)?)
    } else {
        None
    };
    print_json(&json!({
        "habitat_areas": correlator.areas(),
        "impact": impact,
        "ecological_pressure": pressure,
    }))
}

fn similarity(config: &AnalysisConfig, args: &[String]) -> Result<()> {
    let Some(reference_path) = args.first() else {
        bail!("similarity needs a reference GeoJSON file\n{}", USAGE);
    };
    let window = window(args.get(1), args.get(2))?;
    let reference = load_reference_trackways(reference_path)
        .with_context(|| format!("Failed to load reference trackways from {}", reference_path))?;

    let analyzer = TrackwayAnalyzer::from_settings(config).context("Failed to prepare analyzer")?;
    let snapshot = read_snapshot(config, &analyzer)?;
    let analysis = analyzer.analyze(&snapshot, &window);
    let detected: Vec<_> = analysis
        .trackways
        .iter()
        .map(|t| (t.id, t.polyline()))
        .collect();

    print_json(&calculate_similarity(
        &detected,
        &reference,
        config.monitoring.buffer_distance,
    ))
}

fn export(config: &AnalysisConfig, args: &[String]) -> Result<()> {
    let Some(output) = args.first() else {
        bail!("export needs an output path (or - for stdout)\n{}", USAGE);
    };
    let window = window(args.get(1), args.get(2))?;
    let analyzer = TrackwayAnalyzer::from_settings(config).context("Failed to prepare analyzer")?;
    let snapshot = read_snapshot(config, &analyzer)?;
    let analysis = analyzer.analyze(&snapshot, &window);

    if output == "-" {
        println!("{}", trackways_geojson_string(&analysis.trackways)?);
    } else {
        export_trackways_geojson(&analysis.trackways, output)
            .with_context(|| format!("Failed to export trackways to {}", output))?;
    }
    Ok(())
}
