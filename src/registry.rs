//! Station registry for the GSN quality monitor.
//!
//! The single owner of every `Station` built from the FDSN response, plus
//! the tables that translate DQA's numeric ids back to station and metric
//! names. All pipeline stages read and write through here; the registry is
//! owned by the pipeline and passed by reference, never shared globally.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::ingest::dqa::MetricRow;
use crate::logging::{self, DataSource};
use crate::model::{ChannelId, Station, StationId};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// What `record_channel` did to the metric catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelChange {
    New,
    Renamed,
    Unchanged,
}

/// Date range the DQA catalog says it holds data for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogDates {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Stamp carried by one metric-values request. Only the most recently
/// issued ticket may write results into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricTicket {
    generation: u64,
    channel_id: ChannelId,
}

impl MetricTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The metric the request was issued for. Results are stored under this
    /// id even if the active channel has changed since.
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }
}

/// A response arrived for a ticket that has since been superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleTicket {
    pub ticket_generation: u64,
    pub latest_generation: u64,
}

/// Outcome of applying one batch of metric rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricBatchSummary {
    /// Names of stations whose reading was updated, in row order.
    pub updated: Vec<String>,
    /// Station ids that did not resolve to a known station.
    pub unresolved: Vec<StationId>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Registry {
    stations_by_name: BTreeMap<String, Station>,
    id_to_name: BTreeMap<StationId, String>,
    channel_id_to_name: BTreeMap<ChannelId, String>,
    active_channel_id: ChannelId,
    catalog_dates: CatalogDates,
    metric_generation: u64,
}

impl Registry {
    /// An empty registry with `initial_channel` selected.
    pub fn new(initial_channel: ChannelId) -> Registry {
        Registry {
            stations_by_name: BTreeMap::new(),
            id_to_name: BTreeMap::new(),
            channel_id_to_name: BTreeMap::new(),
            active_channel_id: initial_channel,
            catalog_dates: CatalogDates::default(),
            metric_generation: 0,
        }
    }

    // --- Stations -----------------------------------------------------------

    /// Adds a station keyed by its name. A station already registered under
    /// that name is replaced and returned.
    pub fn insert_station(&mut self, station: Station) -> Option<Station> {
        self.stations_by_name.insert(station.name().to_string(), station)
    }

    /// Looks up a station by name. Returns `None` if not found.
    pub fn station(&self, name: &str) -> Option<&Station> {
        self.stations_by_name.get(name)
    }

    /// Looks up a station through its catalog id.
    pub fn station_by_id(&self, id: StationId) -> Option<&Station> {
        self.id_to_name.get(&id).and_then(|name| self.stations_by_name.get(name))
    }

    /// All stations, ordered by name.
    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations_by_name.values()
    }

    pub fn station_count(&self) -> usize {
        self.stations_by_name.len()
    }

    // --- Catalog ------------------------------------------------------------

    /// Records a catalog `S` row and stamps the id onto the station if it is
    /// already registered. Returns whether a station was stamped.
    pub fn record_station_id(&mut self, id: StationId, name: &str) -> bool {
        self.id_to_name.insert(id, name.to_string());
        match self.stations_by_name.get_mut(name) {
            Some(station) => {
                station.assign_id(id);
                true
            }
            None => false,
        }
    }

    /// Records a catalog `M` row.
    pub fn record_channel(&mut self, id: ChannelId, name: &str) -> ChannelChange {
        match self.channel_id_to_name.insert(id, name.to_string()) {
            None => ChannelChange::New,
            Some(previous) if previous != name => ChannelChange::Renamed,
            Some(_) => ChannelChange::Unchanged,
        }
    }

    pub fn station_name_for_id(&self, id: StationId) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn channel_name(&self, id: ChannelId) -> Option<&str> {
        self.channel_id_to_name.get(&id).map(String::as_str)
    }

    pub fn id_to_name(&self) -> &BTreeMap<StationId, String> {
        &self.id_to_name
    }

    pub fn channel_id_to_name(&self) -> &BTreeMap<ChannelId, String> {
        &self.channel_id_to_name
    }

    /// Every catalog station id, ascending. This is the id list sent with a
    /// stationgrid request.
    pub fn station_ids(&self) -> Vec<StationId> {
        self.id_to_name.keys().copied().collect()
    }

    pub fn set_catalog_start(&mut self, date: NaiveDate) {
        self.catalog_dates.start = Some(date);
    }

    pub fn set_catalog_end(&mut self, date: NaiveDate) {
        self.catalog_dates.end = Some(date);
    }

    pub fn catalog_dates(&self) -> CatalogDates {
        self.catalog_dates
    }

    // --- Metric selection ---------------------------------------------------

    pub fn active_channel_id(&self) -> ChannelId {
        self.active_channel_id
    }

    pub fn set_active_channel(&mut self, channel_id: ChannelId) {
        self.active_channel_id = channel_id;
    }

    /// Issues a ticket for a new metric-values request on the active
    /// channel. Every earlier ticket becomes stale.
    pub fn begin_metric_request(&mut self) -> MetricTicket {
        self.metric_generation += 1;
        MetricTicket {
            generation: self.metric_generation,
            channel_id: self.active_channel_id,
        }
    }

    pub fn is_current(&self, ticket: &MetricTicket) -> bool {
        ticket.generation == self.metric_generation
    }

    /// Writes a batch of metric rows under the ticket's channel.
    ///
    /// Rows whose id is unknown, or whose name has no registered station,
    /// are logged and skipped; the rest of the batch still applies. The
    /// whole batch is refused if the ticket has been superseded.
    pub fn apply_metrics<I>(&mut self, ticket: &MetricTicket, rows: I) -> Result<MetricBatchSummary, StaleTicket>
    where
        I: IntoIterator<Item = MetricRow>,
    {
        if !self.is_current(ticket) {
            return Err(StaleTicket {
                ticket_generation: ticket.generation,
                latest_generation: self.metric_generation,
            });
        }

        let mut summary = MetricBatchSummary::default();

        for row in rows {
            let name = self.id_to_name.get(&row.station_id);
            let station = name.and_then(|n| self.stations_by_name.get_mut(n));

            match station {
                Some(station) => {
                    station.record_metric(ticket.channel_id, row.reading);
                    summary.updated.push(station.name().to_string());
                }
                None => {
                    logging::warn(
                        DataSource::Registry,
                        name.map(String::as_str),
                        &format!(
                            "Station id:{} name: {} does not exist",
                            row.station_id,
                            name.map(String::as_str).unwrap_or("<unknown>")
                        ),
                    );
                    summary.unresolved.push(row.station_id);
                }
            }
        }

        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
