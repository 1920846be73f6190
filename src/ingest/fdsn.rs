//! FDSN station web service client (Stage 1)
//!
//! Retrieves station metadata for one network in the service's
//! pipe-delimited text format:
//!
//! ```text
//! #Network | Station | Latitude | Longitude | Elevation | SiteName | StartTime | EndTime
//! II|AAK|42.6375|74.4942|1633.1|Ala Archa, Kyrgyzstan|2007-05-18T00:00:00|
//! ```
//!
//! API Documentation: https://service.iris.edu/fdsnws/station/1/

use chrono::NaiveDate;

use crate::config::StationServiceConfig;
use crate::ingest::http::Fetcher;
use crate::model::{DecodeError, FetchError, Station};

/// Field delimiter of the text format.
pub const DELIMITER: char = '|';

// ============================================================================
// Request
// ============================================================================

/// Query parameters for the station request. `today` is the station
/// `starttime`, so only stations operating today are returned.
pub fn build_station_query(config: &StationServiceConfig, today: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("net", config.network.clone()),
        ("format", config.format.clone()),
        ("starttime", today.format("%Y-%m-%d").to_string()),
        ("nodata", config.nodata.clone()),
    ]
}

/// Fetch the raw station text for `today`.
pub fn fetch_station_text(
    fetcher: &dyn Fetcher,
    config: &StationServiceConfig,
    today: NaiveDate,
) -> Result<String, FetchError> {
    fetcher.get_text(&config.url, &build_station_query(config, today))
}

// ============================================================================
// Header
// ============================================================================

/// Column names of a station text response.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    fields: Vec<String>,
}

impl Header {
    /// Parses the `#`-prefixed header line. Tokens are trimmed and their
    /// first character lowercased: `SiteName` becomes `siteName`.
    pub fn parse(line: &str) -> Result<Header, DecodeError> {
        let line = line.trim();
        let line = line.strip_prefix('#').ok_or(DecodeError::MissingHeader)?;

        let fields = line.split(DELIMITER).map(lowercase_first).collect();
        Ok(Header { fields })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decodes one data line against this header.
    pub fn decode(&self, line: &str) -> Result<Station, DecodeError> {
        let values: Vec<&str> = line.split(DELIMITER).collect();
        Station::from_fields(&self.fields, &values)
    }
}

fn lowercase_first(token: &str) -> String {
    let token = token.trim();
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Decodes station text responses.
///
/// The header is taken from the first response seen and reused for every
/// later one; each response still has its own first line dropped.
#[derive(Debug, Default)]
pub struct StationTextParser {
    header: Option<Header>,
}

impl StationTextParser {
    pub fn new() -> StationTextParser {
        StationTextParser::default()
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Splits `body` into station rows.
    ///
    /// Fails only if the body has no header line and no header is cached.
    /// Row-level problems are yielded as `Err` items so the caller can skip
    /// them and continue.
    pub fn rows<'a>(&'a mut self, body: &'a str) -> Result<StationRows<'a>, DecodeError> {
        let mut lines = body.trim().lines();
        let first = lines.next().filter(|l| !l.trim().is_empty());

        let first = match first {
            Some(line) => line,
            None => return Err(DecodeError::MissingHeader),
        };

        if self.header.is_none() {
            self.header = Some(Header::parse(first)?);
        }

        match self.header.as_ref() {
            Some(header) => Ok(StationRows { header, lines }),
            None => Err(DecodeError::MissingHeader),
        }
    }
}

/// Lazy iterator over the data lines of one response.
pub struct StationRows<'a> {
    header: &'a Header,
    lines: std::str::Lines<'a>,
}

impl<'a> Iterator for StationRows<'a> {
    /// The raw line travels with the result for diagnostics.
    type Item = (&'a str, Result<Station, DecodeError>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            if line.trim().is_empty() {
                continue;
            }
            return Some((line, self.header.decode(line)));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ANMO_RESPONSE: &str = "#network | station | latitude | longitude | elevation | siteName | startTime | endTime\n\
                                 II|ANMO|34.9|-106.4|1850|Albuquerque|2000-01-01|2020-01-01";

    const SERVICE_RESPONSE: &str = "#Network | Station | Latitude | Longitude | Elevation | SiteName | StartTime | EndTime\n\
        II|AAK|42.6375|74.4942|1633.1|Ala Archa, Kyrgyzstan|2007-05-18T00:00:00|\n\
        II|ABKT|37.9304|58.1189|678.0|Alibek, Turkmenistan|2010-07-14T00:00:00|\n\
        \n\
        II|ALE|82.5033|-62.35|60.0|Alert, N.W.T., Canada|2014-08-20T00:00:00|\n";

    fn collect(parser: &mut StationTextParser, body: &str) -> Vec<Result<Station, DecodeError>> {
        parser
            .rows(body)
            .expect("header should parse")
            .map(|(_, result)| result)
            .collect()
    }

    #[test]
    fn test_header_lowercases_first_character_and_trims() {
        let header = Header::parse("#Network | Station | SiteName | StartTime").unwrap();
        assert_eq!(header.fields(), ["network", "station", "siteName", "startTime"]);
    }

    #[test]
    fn test_header_without_hash_is_rejected() {
        assert_eq!(
            Header::parse("II|ANMO|34.9"),
            Err(DecodeError::MissingHeader)
        );
    }

    #[test]
    fn test_single_row_response_yields_anmo() {
        let mut parser = StationTextParser::new();
        let stations = collect(&mut parser, ANMO_RESPONSE);

        assert_eq!(stations.len(), 1);
        let anmo = stations[0].as_ref().expect("row should decode");
        assert_eq!(anmo.name(), "ANMO");
        assert_eq!(anmo.latitude, "34.9");
        assert_eq!(anmo.site_name, "Albuquerque");
    }

    #[test]
    fn test_service_response_with_blank_lines_and_empty_end_time() {
        let mut parser = StationTextParser::new();
        let stations: Vec<Station> = collect(&mut parser, SERVICE_RESPONSE)
            .into_iter()
            .map(|r| r.expect("every row should decode"))
            .collect();

        let names: Vec<&str> = stations.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["AAK", "ABKT", "ALE"]);
        assert_eq!(stations[0].site_name, "Ala Archa, Kyrgyzstan");
        assert_eq!(stations[0].end_time, "");
    }

    #[test]
    fn test_short_row_is_reported_and_others_still_decode() {
        let body = "#network | station | latitude\nII|AAK|42.6\nII|BAD\nII|ALE|82.5";
        let mut parser = StationTextParser::new();
        let rows: Vec<(&str, Result<Station, DecodeError>)> =
            parser.rows(body).expect("header should parse").collect();

        assert_eq!(rows.len(), 3);
        assert!(rows[0].1.is_ok());
        assert_eq!(rows[1].0, "II|BAD");
        assert_eq!(
            rows[1].1,
            Err(DecodeError::FieldCountMismatch { expected: 3, found: 2 })
        );
        assert!(rows[2].1.is_ok());
    }

    #[test]
    fn test_header_is_set_once_and_reused() {
        let mut parser = StationTextParser::new();
        collect(&mut parser, "#network | station\nII|AAK");

        // The second response's own header line is dropped, not re-parsed.
        let second = collect(&mut parser, "#net | sta | extra\nIU|ANMO");
        assert_eq!(parser.header().unwrap().fields(), ["network", "station"]);
        assert_eq!(second[0].as_ref().unwrap().name(), "ANMO");
    }

    #[test]
    fn test_empty_body_is_missing_header() {
        let mut parser = StationTextParser::new();
        assert!(matches!(parser.rows("  \n "), Err(DecodeError::MissingHeader)));
    }

    #[test]
    fn test_station_query_uses_today_as_starttime() {
        let config = StationServiceConfig::default();
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let query = build_station_query(&config, today);

        assert_eq!(
            query,
            vec![
                ("net", "II".to_string()),
                ("format", "text".to_string()),
                ("starttime", "2024-05-01".to_string()),
                ("nodata", "404".to_string()),
            ]
        );
    }
}
