//! GSN station quality monitor.
//!
//! Fetches Global Seismographic Network station metadata from the FDSN
//! station service, joins it with data-quality metrics from the DQA
//! service, and reports per-station marker colors for the selected metric.
//!
//! Module map:
//! - `model`     — Station, MetricReading, and the error types.
//! - `config`    — TOML + environment configuration.
//! - `logging`   — structured console/file logging and failure classification.
//! - `ingest`    — HTTP transport and the two services' decoders.
//! - `registry`  — the in-memory station registry and id tables.
//! - `display`   — the Presenter seam, marker colors, details fragment.
//! - `pipeline`  — the three-stage fetch-and-join state machine.
//! - `report`    — run summary for the console and JSON.

pub mod config;
pub mod display;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod report;
