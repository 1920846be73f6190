/// Live tests against the FDSN station service and the DQA metrics service.
///
/// These tests verify:
/// 1. The station query for the configured network returns parseable text
/// 2. The DQA catalog lists stations and metrics
/// 3. A full pipeline run reaches `Ready` with real responses
///
/// Prerequisites:
/// - Internet connectivity to service.iris.edu and the DQA host
///
/// Run with: cargo test --test live_services -- --ignored --test-threads=1
///
/// Note: These tests make real API calls and may be slow or fail if the
/// services are down, rate-limiting, or the network has been retired.

use std::time::Duration;

use chrono::Utc;

use gsn_monitor::config::Config;
use gsn_monitor::display::LogPresenter;
use gsn_monitor::ingest::dqa::{self, CatalogRow};
use gsn_monitor::ingest::fdsn::{self, StationTextParser};
use gsn_monitor::ingest::http::HttpFetcher;
use gsn_monitor::pipeline::{Pipeline, PipelineState};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(60)).expect("HTTP client should build")
}

// ---------------------------------------------------------------------------
// FDSN station service
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Requires network access
fn test_live_station_list_parses() {
    let config = Config::default();
    let body = fdsn::fetch_station_text(&fetcher(), &config.stations, Utc::now().date_naive())
        .expect("station service should answer");

    let mut parser = StationTextParser::new();
    let rows: Vec<_> = parser.rows(&body).expect("response should carry a header").collect();

    println!("Station rows: {}", rows.len());
    assert!(!rows.is_empty(), "network {} should have open stations", config.stations.network);

    for (line, result) in rows {
        let station = result.unwrap_or_else(|e| panic!("row '{}' failed: {}", line, e));
        assert_eq!(station.network, config.stations.network);
        assert!(!station.name().is_empty());
    }
}

// ---------------------------------------------------------------------------
// DQA metrics service
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Requires network access
fn test_live_catalog_lists_stations_and_metrics() {
    let config = Config::default();
    let body = dqa::fetch_catalog_text(&fetcher(), &config.metrics).expect("catalog should answer");

    let mut stations = 0;
    let mut metrics = 0;
    for (_, result) in dqa::catalog_rows(&body) {
        match result {
            Ok(CatalogRow::Station { .. }) => stations += 1,
            Ok(CatalogRow::Metric { .. }) => metrics += 1,
            _ => {}
        }
    }

    println!("Catalog: {} stations, {} metrics", stations, metrics);
    assert!(stations > 0);
    assert!(metrics > 0);
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Requires network access
fn test_live_pipeline_reaches_ready() {
    let mut pipeline = Pipeline::new(Config::default(), fetcher(), LogPresenter::new());
    let state = pipeline.run();

    println!("{}", pipeline.report().to_json().unwrap());
    assert_eq!(state, PipelineState::Ready);
    assert!(pipeline.presenter().marker_count() > 0);
    assert!(!pipeline.presenter().options().is_empty());
}
