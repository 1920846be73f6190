//! DQA (Data Quality Analyzer) metrics client (Stages 2 and 3)
//!
//! The DQA CGI is a single endpoint driven by a `cmd` parameter. Two
//! commands are used here:
//!
//! - `groups_dates_stations_metrics`: the catalog. One comma-delimited row
//!   per entity, tagged by its first field.
//! - `stationgrid`: one `StationID, value, percentage` row per station for
//!   the metric and date range named in `param`.
//!
//! ```text
//! DS, YYYY-MM-DD                          first date with data
//! DE, YYYY-MM-DD                          last date with data
//! T, GroupTypeID, GroupTypeName, Groups…  group type (Network, Country…)
//! G, GroupID, GroupName, GroupTypeID      group (IU, CU, Asia…)
//! S, StationID, NetworkID, StationName, GroupIDs…
//! C, ChannelID, ChannelName, LocationName, StationID
//! M, MetricID, MetricName
//! ```

use chrono::NaiveDate;

use crate::config::MetricServiceConfig;
use crate::ingest::http::Fetcher;
use crate::model::{ChannelId, DecodeError, FetchError, MetricReading, StationId};

/// Field delimiter of both response formats.
pub const DELIMITER: char = ',';

// ============================================================================
// Catalog rows
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogRow {
    DateStart(NaiveDate),
    DateEnd(NaiveDate),
    GroupType { id: u32, name: String },
    Group { id: u32, name: String, group_type_id: Option<u32> },
    Station { id: StationId, network: String, name: String },
    Channel { id: u32, name: String, location: String, station_id: Option<StationId> },
    Metric { id: ChannelId, name: String },
    /// A tag this client does not interpret.
    Other(String),
}

/// Decodes one catalog line.
pub fn parse_catalog_row(line: &str) -> Result<CatalogRow, DecodeError> {
    let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
    let tag = fields.first().copied().unwrap_or_default();

    match tag {
        "" => Err(DecodeError::EmptyRow),
        "DS" => Ok(CatalogRow::DateStart(date_field(&fields, 1)?)),
        "DE" => Ok(CatalogRow::DateEnd(date_field(&fields, 1)?)),
        "T" => Ok(CatalogRow::GroupType {
            id: id_field(&fields, 1, "group type id")?,
            name: text_field(&fields, 2, "group type name")?,
        }),
        "G" => Ok(CatalogRow::Group {
            id: id_field(&fields, 1, "group id")?,
            name: text_field(&fields, 2, "group name")?,
            group_type_id: fields.get(3).and_then(|raw| raw.parse().ok()),
        }),
        "S" => Ok(CatalogRow::Station {
            id: id_field(&fields, 1, "station id")?,
            network: fields.get(2).map(|s| s.to_string()).unwrap_or_default(),
            name: text_field(&fields, 3, "station name")?,
        }),
        "C" => Ok(CatalogRow::Channel {
            id: id_field(&fields, 1, "channel id")?,
            name: text_field(&fields, 2, "channel name")?,
            location: fields.get(3).map(|s| s.to_string()).unwrap_or_default(),
            station_id: fields.get(4).and_then(|raw| raw.parse().ok()),
        }),
        "M" => Ok(CatalogRow::Metric {
            id: id_field(&fields, 1, "metric id")?,
            name: text_field(&fields, 2, "metric name")?,
        }),
        other => Ok(CatalogRow::Other(other.to_string())),
    }
}

/// Lazily decodes every non-blank line of a catalog response.
pub fn catalog_rows(body: &str) -> impl Iterator<Item = (&str, Result<CatalogRow, DecodeError>)> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| (line, parse_catalog_row(line)))
}

fn text_field(fields: &[&str], index: usize, name: &'static str) -> Result<String, DecodeError> {
    match fields.get(index) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(DecodeError::MissingField(name)),
    }
}

fn id_field(fields: &[&str], index: usize, name: &'static str) -> Result<u32, DecodeError> {
    let raw = text_field(fields, index, name)?;
    raw.parse().map_err(|_| DecodeError::InvalidNumber { field: name, raw })
}

fn date_field(fields: &[&str], index: usize) -> Result<NaiveDate, DecodeError> {
    let raw = text_field(fields, index, "date")?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| DecodeError::InvalidDate(raw))
}

// ============================================================================
// Stationgrid rows
// ============================================================================

/// One `StationID, value, percentage` row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRow {
    pub station_id: StationId,
    pub reading: MetricReading,
}

/// Decodes one stationgrid line. A missing or empty value or percentage
/// is read as zero.
pub fn parse_metric_row(line: &str) -> Result<MetricRow, DecodeError> {
    let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
    let station_id = id_field(&fields, 0, "station id")?;

    Ok(MetricRow {
        station_id,
        reading: MetricReading {
            value: number_or_zero(&fields, 1, "value")?,
            percentage: number_or_zero(&fields, 2, "percentage")?,
        },
    })
}

/// Lazily decodes every non-blank line of a stationgrid response.
pub fn metric_rows(body: &str) -> impl Iterator<Item = (&str, Result<MetricRow, DecodeError>)> {
    body.trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| (line, parse_metric_row(line)))
}

fn number_or_zero(fields: &[&str], index: usize, name: &'static str) -> Result<f64, DecodeError> {
    match fields.get(index) {
        None => Ok(0.0),
        Some(raw) if raw.is_empty() => Ok(0.0),
        Some(raw) => raw.parse().map_err(|_| DecodeError::InvalidNumber {
            field: name,
            raw: raw.to_string(),
        }),
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Query for the combined groups/dates/stations/metrics catalog.
pub fn build_catalog_query(config: &MetricServiceConfig) -> Vec<(&'static str, String)> {
    vec![("cmd", config.catalog_cmd.clone())]
}

/// `param` value of a stationgrid request:
/// `station.<id>-<id>…_metric.<id>_dates.<YYYYMMDD>.<YYYYMMDD>`.
pub fn build_grid_param(
    station_ids: &[StationId],
    channel_id: ChannelId,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let ids: Vec<String> = station_ids.iter().map(|id| id.to_string()).collect();
    format!(
        "station.{}_metric.{}_dates.{}.{}",
        ids.join("-"),
        channel_id,
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

pub fn build_grid_query(
    config: &MetricServiceConfig,
    station_ids: &[StationId],
    channel_id: ChannelId,
) -> Vec<(&'static str, String)> {
    vec![
        ("cmd", config.grid_cmd.clone()),
        (
            "param",
            build_grid_param(station_ids, channel_id, config.start_date, config.end_date),
        ),
    ]
}

pub fn fetch_catalog_text(fetcher: &dyn Fetcher, config: &MetricServiceConfig) -> Result<String, FetchError> {
    fetcher.get_text(&config.url, &build_catalog_query(config))
}

pub fn fetch_grid_text(
    fetcher: &dyn Fetcher,
    config: &MetricServiceConfig,
    station_ids: &[StationId],
    channel_id: ChannelId,
) -> Result<String, FetchError> {
    fetcher.get_text(&config.url, &build_grid_query(config, station_ids, channel_id))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // --- Catalog ------------------------------------------------------------

    #[test]
    fn test_station_row_with_trailing_comma() {
        assert_eq!(
            parse_catalog_row("S,101,II,ANMO,"),
            Ok(CatalogRow::Station {
                id: 101,
                network: "II".to_string(),
                name: "ANMO".to_string(),
            })
        );
    }

    #[test]
    fn test_metric_row() {
        assert_eq!(
            parse_catalog_row("M,3,AvailabilityMetric"),
            Ok(CatalogRow::Metric { id: 3, name: "AvailabilityMetric".to_string() })
        );
    }

    #[test]
    fn test_date_rows() {
        assert_eq!(
            parse_catalog_row("DS,2012-01-01"),
            Ok(CatalogRow::DateStart(NaiveDate::from_ymd_opt(2012, 1, 1).unwrap()))
        );
        assert_eq!(
            parse_catalog_row("DE, 2015-06-10"),
            Ok(CatalogRow::DateEnd(NaiveDate::from_ymd_opt(2015, 6, 10).unwrap()))
        );
        assert_eq!(
            parse_catalog_row("DE,June"),
            Err(DecodeError::InvalidDate("June".to_string()))
        );
    }

    #[test]
    fn test_group_and_channel_rows() {
        assert_eq!(
            parse_catalog_row("T,1,Network Code,2,3"),
            Ok(CatalogRow::GroupType { id: 1, name: "Network Code".to_string() })
        );
        assert_eq!(
            parse_catalog_row("G,2,IU,1"),
            Ok(CatalogRow::Group { id: 2, name: "IU".to_string(), group_type_id: Some(1) })
        );
        assert_eq!(
            parse_catalog_row("C,77,BHZ,00,101"),
            Ok(CatalogRow::Channel {
                id: 77,
                name: "BHZ".to_string(),
                location: "00".to_string(),
                station_id: Some(101),
            })
        );
    }

    #[test]
    fn test_unknown_tag_is_other() {
        assert_eq!(parse_catalog_row("X,1,2"), Ok(CatalogRow::Other("X".to_string())));
    }

    #[test]
    fn test_non_numeric_station_id_is_rejected() {
        assert_eq!(
            parse_catalog_row("S,abc,II,ANMO"),
            Err(DecodeError::InvalidNumber { field: "station id", raw: "abc".to_string() })
        );
    }

    #[test]
    fn test_station_row_without_name_is_rejected() {
        assert_eq!(
            parse_catalog_row("S,101,II"),
            Err(DecodeError::MissingField("station name"))
        );
    }

    #[test]
    fn test_catalog_rows_skip_blank_lines() {
        let body = "DS,2012-01-01\n\nS,101,II,ANMO,\nM,3,Availability\n";
        let rows: Vec<_> = catalog_rows(body).map(|(_, r)| r).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(Result::is_ok));
    }

    // --- Stationgrid --------------------------------------------------------

    #[test]
    fn test_metric_triple() {
        assert_eq!(
            parse_metric_row("101,5,42.5"),
            Ok(MetricRow {
                station_id: 101,
                reading: MetricReading { value: 5.0, percentage: 42.5 },
            })
        );
    }

    #[test]
    fn test_missing_value_and_percentage_default_to_zero() {
        let row = parse_metric_row("101").expect("id alone is enough");
        assert_eq!(row.reading, MetricReading { value: 0.0, percentage: 0.0 });

        let row = parse_metric_row("101,,").expect("empty fields are zero");
        assert_eq!(row.reading, MetricReading { value: 0.0, percentage: 0.0 });
    }

    #[test]
    fn test_garbage_percentage_is_rejected() {
        assert_eq!(
            parse_metric_row("101,5,n/a"),
            Err(DecodeError::InvalidNumber { field: "percentage", raw: "n/a".to_string() })
        );
    }

    #[test]
    fn test_metric_rows_trim_body() {
        let rows: Vec<_> = metric_rows("\n101,5,42.5\n102,1,99\n\n").map(|(_, r)| r).collect();
        assert_eq!(rows.len(), 2);
    }

    // --- Requests -----------------------------------------------------------

    #[test]
    fn test_grid_param_format() {
        let param = build_grid_param(
            &[101, 102, 250],
            3,
            NaiveDate::from_ymd_opt(2015, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2015, 6, 10).unwrap(),
        );
        assert_eq!(param, "station.101-102-250_metric.3_dates.20150601.20150610");
    }

    #[test]
    fn test_grid_query_uses_configured_command_and_dates() {
        let config = MetricServiceConfig::default();
        let query = build_grid_query(&config, &[101], 7);
        assert_eq!(query[0], ("cmd", "stationgrid".to_string()));
        assert_eq!(query[1], ("param", "station.101_metric.7_dates.20150601.20150610".to_string()));
    }

    #[test]
    fn test_catalog_query() {
        let config = MetricServiceConfig::default();
        assert_eq!(
            build_catalog_query(&config),
            vec![("cmd", "groups_dates_stations_metrics".to_string())]
        );
    }
}
