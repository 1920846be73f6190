//! Station, MetricReading, FetchError, DecodeError
//! core data structures and error handling
//!
//! Core data types for the GSN station quality monitor.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no I/O and no network access, only types and the positional
//! station constructor.

use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Numeric station identifier assigned by the DQA catalog (`S` rows).
pub type StationId = u32;

/// Numeric metric identifier assigned by the DQA catalog (`M` rows).
/// The DQA service calls these "metrics" in the catalog and uses the same
/// id as the `metric.` component of a stationgrid request.
pub type ChannelId = u32;

// ---------------------------------------------------------------------------
// Header field names
// ---------------------------------------------------------------------------

/// Field names produced by the FDSN text header after first-letter
/// lowercasing, e.g. `SiteName` -> `siteName`.
pub const FIELD_NETWORK: &str = "network";
pub const FIELD_STATION: &str = "station";
pub const FIELD_LATITUDE: &str = "latitude";
pub const FIELD_LONGITUDE: &str = "longitude";
pub const FIELD_ELEVATION: &str = "elevation";
pub const FIELD_SITE_NAME: &str = "siteName";
pub const FIELD_START_TIME: &str = "startTime";
pub const FIELD_END_TIME: &str = "endTime";

// ---------------------------------------------------------------------------
// Metric types
// ---------------------------------------------------------------------------

/// Latest value reported by the DQA stationgrid query for one station and
/// one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricReading {
    pub value: f64,
    /// Percentage in the documented 0–100 range. Values outside it are kept
    /// as reported; the color mapping decides what to do with them.
    pub percentage: f64,
}

// ---------------------------------------------------------------------------
// Station
// ---------------------------------------------------------------------------

/// One seismic monitoring site.
///
/// Metadata fields are kept as the trimmed strings the FDSN service sent;
/// `latitude` is `"34.9"`, not `34.9`. Numeric interpretation happens at
/// the presentation edge (see `display::heatmap_points`).
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub network: String,
    station: String,
    pub latitude: String,
    pub longitude: String,
    pub elevation: String,
    pub site_name: String,
    pub start_time: String,
    pub end_time: String,
    /// Header columns the service sent that are not part of the fixed set.
    pub extra: BTreeMap<String, String>,
    id: Option<StationId>,
    metrics: BTreeMap<ChannelId, MetricReading>,
}

impl Station {
    /// Builds a station from a header row and a data row of equal length.
    ///
    /// Values are trimmed and assigned positionally. Fails if the rows
    /// differ in length or if the header has no `station` column.
    pub fn from_fields<K, V>(keys: &[K], values: &[V]) -> Result<Station, DecodeError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if keys.len() != values.len() {
            return Err(DecodeError::FieldCountMismatch {
                expected: keys.len(),
                found: values.len(),
            });
        }

        let mut network = String::new();
        let mut station = None;
        let mut latitude = String::new();
        let mut longitude = String::new();
        let mut elevation = String::new();
        let mut site_name = String::new();
        let mut start_time = String::new();
        let mut end_time = String::new();
        let mut extra = BTreeMap::new();

        for (key, value) in keys.iter().zip(values) {
            let value = value.as_ref().trim().to_string();
            match key.as_ref() {
                FIELD_NETWORK => network = value,
                FIELD_STATION => station = Some(value),
                FIELD_LATITUDE => latitude = value,
                FIELD_LONGITUDE => longitude = value,
                FIELD_ELEVATION => elevation = value,
                FIELD_SITE_NAME => site_name = value,
                FIELD_START_TIME => start_time = value,
                FIELD_END_TIME => end_time = value,
                other => {
                    extra.insert(other.to_string(), value);
                }
            }
        }

        let station = station.ok_or(DecodeError::MissingField(FIELD_STATION))?;

        Ok(Station {
            network,
            station,
            latitude,
            longitude,
            elevation,
            site_name,
            start_time,
            end_time,
            extra,
            id: None,
            metrics: BTreeMap::new(),
        })
    }

    /// Station code, the registry's primary key. Fixed at construction.
    pub fn name(&self) -> &str {
        &self.station
    }

    /// DQA catalog id, once Stage 2 has stamped it.
    pub fn id(&self) -> Option<StationId> {
        self.id
    }

    /// Stamps the catalog id. A later catalog run overwrites it.
    pub fn assign_id(&mut self, id: StationId) {
        self.id = Some(id);
    }

    /// Overwrites the reading for `channel_id`.
    pub fn record_metric(&mut self, channel_id: ChannelId, reading: MetricReading) {
        self.metrics.insert(channel_id, reading);
    }

    pub fn metric(&self, channel_id: ChannelId) -> Option<&MetricReading> {
        self.metrics.get(&channel_id)
    }

    /// All recorded readings, in ascending channel id order.
    pub fn metrics(&self) -> impl Iterator<Item = (ChannelId, &MetricReading)> {
        self.metrics.iter().map(|(id, reading)| (*id, reading))
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failure taxonomy for one network request against either service.
///
/// Every stage catches these at its boundary; none is retried.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The service could not be reached at all.
    Connectivity(String),
    /// HTTP 404. The FDSN service returns this (as configured by `nodata`)
    /// when the query matches no stations.
    NotFound,
    /// HTTP 5xx from the service.
    ServerError(u16),
    /// The response arrived but its body could not be read or interpreted.
    Malformed(String),
    /// The request exceeded the configured timeout.
    Timeout,
    /// The request was superseded by a newer one before it could be applied.
    Aborted,
    /// Anything else, including unexpected non-2xx statuses.
    Unknown(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Connectivity(msg) => write!(f, "Connectivity error: {}", msg),
            FetchError::NotFound => write!(f, "Not found [404]"),
            FetchError::ServerError(code) => write!(f, "Server error [{}]", code),
            FetchError::Malformed(msg) => write!(f, "Malformed response: {}", msg),
            FetchError::Timeout => write!(f, "Request timed out"),
            FetchError::Aborted => write!(f, "Request aborted (superseded)"),
            FetchError::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Errors raised while decoding a single row of a service response.
///
/// Row-level errors are logged and the row skipped; they never abort the
/// batch the row belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The station text response had no header line.
    MissingHeader,
    /// A data row's arity differs from the header's.
    FieldCountMismatch { expected: usize, found: usize },
    /// A required column or positional field is absent.
    MissingField(&'static str),
    /// A field that must be numeric could not be parsed.
    InvalidNumber { field: &'static str, raw: String },
    /// A catalog date was not `YYYY-MM-DD`.
    InvalidDate(String),
    /// The row had no content after trimming.
    EmptyRow,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::MissingHeader => write!(f, "Response has no header line"),
            DecodeError::FieldCountMismatch { expected, found } => {
                write!(f, "Expected {} fields, found {}", expected, found)
            }
            DecodeError::MissingField(field) => write!(f, "Missing field: {}", field),
            DecodeError::InvalidNumber { field, raw } => {
                write!(f, "Invalid number for {}: '{}'", field, raw)
            }
            DecodeError::InvalidDate(raw) => write!(f, "Invalid date: '{}'", raw),
            DecodeError::EmptyRow => write!(f, "Empty row"),
        }
    }
}

impl std::error::Error for DecodeError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
