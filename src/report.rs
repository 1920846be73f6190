//! Run Report Module
//!
//! Tallies what each pipeline stage loaded, skipped, and failed on, so a
//! run can be judged at a glance from the console summary or from the JSON
//! file written by the binary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::error::Error;
use std::path::Path;

use crate::logging::classify_fetch_failure;
use crate::model::{FetchError, StationId};
use crate::pipeline::{PipelineState, Stage};

// ============================================================================
// Report structures
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub timestamp: String,
    pub final_state: PipelineState,
    pub locations: LocationSummary,
    pub catalog: CatalogSummary,
    pub metrics: MetricSummary,
    pub failures: Vec<StageFailure>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LocationSummary {
    pub rows_loaded: usize,
    pub rows_rejected: usize,
    pub heatmap_points: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogSummary {
    pub stations: usize,
    /// Catalog stations that matched a station from the location list.
    pub stations_stamped: usize,
    pub metrics: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub rows_ignored: usize,
    pub rows_rejected: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricSummary {
    pub requests: usize,
    pub rows_applied: usize,
    pub rows_rejected: usize,
    pub unresolved_station_ids: Vec<StationId>,
    pub responses_superseded: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    /// EXPECTED / UNEXPECTED / UNKNOWN
    pub classification: String,
    pub message: String,
}

impl RunReport {
    pub fn new(started: DateTime<Utc>) -> RunReport {
        RunReport {
            timestamp: started.to_rfc3339(),
            final_state: PipelineState::Idle,
            locations: LocationSummary::default(),
            catalog: CatalogSummary::default(),
            metrics: MetricSummary::default(),
            failures: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, stage: Stage, err: &FetchError) {
        self.failures.push(StageFailure {
            stage,
            classification: classify_fetch_failure(err).to_string(),
            message: err.to_string(),
        });
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

// ============================================================================
// Console summary
// ============================================================================

pub fn print_summary(report: &RunReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 GSN STATION QUALITY SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Final state:      {:?}", report.final_state);
    println!(
        "Stations:         {} loaded  ({} rows rejected, {} on heatmap)",
        report.locations.rows_loaded,
        report.locations.rows_rejected,
        report.locations.heatmap_points
    );
    println!(
        "Catalog:          {} stations ({} matched), {} metrics  ({} ignored, {} rejected)",
        report.catalog.stations,
        report.catalog.stations_stamped,
        report.catalog.metrics,
        report.catalog.rows_ignored,
        report.catalog.rows_rejected
    );
    if let (Some(first), Some(last)) = (report.catalog.first_date, report.catalog.last_date) {
        println!("Catalog dates:    {} to {}", first, last);
    }
    println!(
        "Metric values:    {} applied over {} request(s)  ({} rejected, {} unresolved, {} superseded)",
        report.metrics.rows_applied,
        report.metrics.requests,
        report.metrics.rows_rejected,
        report.metrics.unresolved_station_ids.len(),
        report.metrics.responses_superseded
    );

    if !report.failures.is_empty() {
        println!();
        println!("❌ FAILURES ({}):", report.failures.len());
        for failure in &report.failures {
            println!("   - {} [{}]: {}", failure.stage, failure.classification, failure.message);
        }
    }
    println!("═══════════════════════════════════════════════════════════");
}
